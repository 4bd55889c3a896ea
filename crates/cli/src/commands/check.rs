use std::sync::Arc;

use carepath_core::domain::status::{EntityKind, Status};
use carepath_core::lifecycle::{StatusRegistry, TransitionValidator};

use crate::commands::{invalid_input, load_config, to_data, CommandResult};

const COMMAND: &str = "check";

pub fn run(kind: &str, from: &str, to: &str) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let registry = match config.lifecycle.build_registry() {
        Ok(registry) => registry,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };

    evaluate(registry, kind, from, to)
}

/// Exit code 0 when the transition is allowed, 1 when it is denied.
pub fn evaluate(registry: StatusRegistry, kind: &str, from: &str, to: &str) -> CommandResult {
    let kind = match EntityKind::parse(kind) {
        Ok(kind) => kind,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let validator = TransitionValidator::new(Arc::new(registry));
    let decision = Status::parse(kind, from)
        .and_then(|from| Ok((from, Status::parse(kind, to)?)))
        .and_then(|(from, to)| validator.decide(kind, from, to));
    let decision = match decision {
        Ok(decision) => decision,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let data = match to_data(COMMAND, &decision) {
        Ok(data) => data,
        Err(failure) => return failure,
    };
    let message = format!(
        "{kind} `{}` -> `{}`: {}",
        decision.from.as_str(),
        decision.to.as_str(),
        decision.reason
    );

    if decision.allowed {
        CommandResult::success_with_data(COMMAND, message, data)
    } else {
        CommandResult::negative(COMMAND, message, data)
    }
}
