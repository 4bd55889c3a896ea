use std::str::FromStr;

use carepath_core::audit::{AuditContext, NoopAuditSink};
use carepath_core::domain::add_on::{AddOn, AddOnCategory};
use carepath_core::errors::DomainError;
use carepath_core::estimation::DeterministicCostEngine;
use rust_decimal::Decimal;

use crate::commands::{invalid_input, load_config, to_data, CommandResult};

const COMMAND: &str = "estimate";

pub fn run(base: &str, add_ons: &[String], tax: Option<&str>) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let base_price = match parse_amount("base", base) {
        Ok(amount) => amount,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };
    let tax_percent = match tax {
        Some(raw) => match parse_amount("tax", raw) {
            Ok(amount) => amount,
            Err(error) => return invalid_input(COMMAND, error.to_string()),
        },
        None => config.estimation.default_tax_percent,
    };
    let selected = match add_ons
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_add_on(index, raw))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(selected) => selected,
        Err(error) => return invalid_input(COMMAND, error.to_string()),
    };

    let engine = DeterministicCostEngine::new(config.estimation.settings());
    let estimate = engine.estimate_with_audit(
        base_price,
        &selected,
        tax_percent,
        &NoopAuditSink,
        &AuditContext::system("cli"),
    );

    match estimate {
        Ok(estimate) => match to_data(COMMAND, &estimate) {
            Ok(data) => CommandResult::success_with_data(
                COMMAND,
                format!("{} {}", estimate.final_estimate, estimate.currency),
                data,
            ),
            Err(failure) => failure,
        },
        Err(error @ DomainError::AddOnLimitExceeded { .. }) => {
            CommandResult::failure(COMMAND, "add_on_limit", error.to_string(), 2)
        }
        Err(error) => invalid_input(COMMAND, error.to_string()),
    }
}

/// Parses `category:price`, e.g. `visa:150.00`.
fn parse_add_on(index: usize, raw: &str) -> Result<AddOn, DomainError> {
    let (category, price) = raw.split_once(':').ok_or_else(|| {
        DomainError::InvalidEstimateInput(format!("add-on `{raw}` must look like category:price"))
    })?;
    let category = AddOnCategory::parse(category)?;
    let price = parse_amount("add-on price", price)?;

    Ok(AddOn::new(format!("cli-{}", index + 1), category, format!("{category} add-on"), price))
}

fn parse_amount(field: &str, raw: &str) -> Result<Decimal, DomainError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| DomainError::InvalidEstimateInput(format!("{field} `{raw}` is not a number")))
}
