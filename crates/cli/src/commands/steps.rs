use carepath_core::errors::DomainError;
use carepath_core::workflow::{WorkflowStep, WorkflowStepTracker};
use serde_json::json;

use crate::commands::{invalid_input, to_data, CommandResult};

const COMMAND: &str = "steps";

/// Lists the booking-creation sequence, or describes one step given by slug or number.
pub fn run(from: Option<&str>) -> CommandResult {
    let tracker: WorkflowStepTracker = WorkflowStepTracker::default();

    let Some(from) = from else {
        let steps = tracker.all_steps();
        return match to_data(COMMAND, &steps) {
            Ok(data) => CommandResult::success_with_data(
                COMMAND,
                format!("{} steps in {}", steps.len(), tracker.sequence_name()),
                data,
            ),
            Err(failure) => failure,
        };
    };

    let step = match parse_step(from) {
        Ok(step) => step,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let advance = match to_data(COMMAND, &tracker.advance(step)) {
        Ok(data) => data,
        Err(failure) => return failure,
    };
    let current = match to_data(COMMAND, &tracker.step_metadata(step)) {
        Ok(data) => data,
        Err(failure) => return failure,
    };

    CommandResult::success_with_data(
        COMMAND,
        format!("step {} of {}", step.number(), WorkflowStep::ALL.len()),
        json!({
            "current": current,
            "next": tracker.next_step(step).map(|next| next.slug()),
            "previous": tracker.previous_step(step).map(|previous| previous.slug()),
            "progress_percent": tracker.progress_percent(step),
            "advance": advance,
        }),
    )
}

fn parse_step(value: &str) -> Result<WorkflowStep, DomainError> {
    match value.trim().parse::<u8>() {
        Ok(number) => WorkflowStep::from_number(number),
        Err(_) => WorkflowStep::from_slug(value),
    }
}
