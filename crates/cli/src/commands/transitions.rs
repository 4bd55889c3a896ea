use carepath_core::domain::status::{EntityKind, Status};
use carepath_core::lifecycle::StatusRegistry;
use serde_json::json;

use crate::commands::{invalid_input, load_config, to_data, CommandResult};

const COMMAND: &str = "transitions";

pub fn run(kind: &str, from: Option<&str>) -> CommandResult {
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

    describe(&registry, kind, from)
}

pub fn describe(registry: &StatusRegistry, kind: &str, from: Option<&str>) -> CommandResult {
    let kind = match EntityKind::parse(kind) {
        Ok(kind) => kind,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };
    let table = match registry.table(kind) {
        Ok(table) => table,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let Some(from) = from else {
        return match to_data(COMMAND, &table.export()) {
            Ok(data) => CommandResult::success_with_data(
                COMMAND,
                format!("{kind} transition table"),
                data,
            ),
            Err(failure) => failure,
        };
    };

    let lookup = Status::parse(kind, from).and_then(|status| {
        let allowed = table.allowed_transitions(status)?;
        let terminal = table.is_terminal(status)?;
        Ok((status, allowed, terminal))
    });
    match lookup {
        Ok((status, allowed, terminal)) => {
            let targets: Vec<&str> = allowed.iter().map(Status::as_str).collect();
            CommandResult::success_with_data(
                COMMAND,
                format!("{} target(s) from {kind} `{}`", targets.len(), status.as_str()),
                json!({
                    "kind": kind.as_str(),
                    "from": status.as_str(),
                    "terminal": terminal,
                    "allowed": targets,
                }),
            )
        }
        Err(error) => invalid_input(COMMAND, error.to_string()),
    }
}
