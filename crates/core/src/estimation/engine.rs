use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::add_on::{AddOn, AddOnCategory};
use crate::errors::DomainError;

pub const MAX_ADD_ONS_ALLOWED: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationSettings {
    pub currency: String,
    pub min_range: Decimal,
    pub max_range: Decimal,
    pub max_add_ons: usize,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            currency: "USD".to_owned(),
            min_range: Decimal::from(10_000),
            max_range: Decimal::from(20_000),
            max_add_ons: MAX_ADD_ONS_ALLOWED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: AddOnCategory,
    pub count: usize,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

/// Result of one estimate. `min_range`/`max_range` are the configured display bounds;
/// `final_estimate` is never clamped to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub base_price: Decimal,
    pub add_ons_total: Decimal,
    pub subtotal: Decimal,
    pub tax_percent: Decimal,
    pub tax_amount: Decimal,
    pub final_estimate: Decimal,
    pub min_range: Decimal,
    pub max_range: Decimal,
    pub currency: String,
    pub breakdown: Vec<CategoryTotal>,
    pub trace: Vec<EstimateTraceStep>,
}

impl CostEstimate {
    pub fn within_range(&self) -> bool {
        self.final_estimate >= self.min_range && self.final_estimate <= self.max_range
    }
}

pub trait CostEstimationEngine: Send + Sync {
    fn settings(&self) -> &EstimationSettings;

    fn estimate(
        &self,
        base_price: Decimal,
        add_ons: &[AddOn],
        tax_percent: Decimal,
    ) -> Result<CostEstimate, DomainError>;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicCostEngine {
    settings: EstimationSettings,
}

impl DeterministicCostEngine {
    pub fn new(settings: EstimationSettings) -> Self {
        Self { settings }
    }

    pub fn estimate_with_audit<S>(
        &self,
        base_price: Decimal,
        add_ons: &[AddOn],
        tax_percent: Decimal,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<CostEstimate, DomainError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.estimate(base_price, add_ons, tax_percent);
        let event = match &result {
            Ok(estimate) => AuditEvent::from_context(
                audit,
                "pricing.estimate_calculated",
                AuditCategory::Pricing,
                AuditOutcome::Success,
            )
            .with_metadata("final_estimate", estimate.final_estimate.to_string())
            .with_metadata("within_range", estimate.within_range().to_string()),
            Err(error) => AuditEvent::from_context(
                audit,
                "pricing.estimate_rejected",
                AuditCategory::Pricing,
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        };
        sink.emit(event.with_metadata("add_on_count", add_ons.len().to_string()));
        result
    }
}

impl CostEstimationEngine for DeterministicCostEngine {
    fn settings(&self) -> &EstimationSettings {
        &self.settings
    }

    fn estimate(
        &self,
        base_price: Decimal,
        add_ons: &[AddOn],
        tax_percent: Decimal,
    ) -> Result<CostEstimate, DomainError> {
        estimate(&self.settings, base_price, add_ons, tax_percent)
    }
}

pub fn estimate(
    settings: &EstimationSettings,
    base_price: Decimal,
    add_ons: &[AddOn],
    tax_percent: Decimal,
) -> Result<CostEstimate, DomainError> {
    if add_ons.len() > settings.max_add_ons {
        return Err(DomainError::AddOnLimitExceeded {
            count: add_ons.len(),
            max: settings.max_add_ons,
        });
    }
    if base_price < Decimal::ZERO {
        return Err(DomainError::InvalidEstimateInput(format!(
            "base price must not be negative (got {base_price})"
        )));
    }
    if let Some(add_on) = add_ons.iter().find(|add_on| add_on.price < Decimal::ZERO) {
        return Err(DomainError::InvalidEstimateInput(format!(
            "add-on `{}` has negative price {}",
            add_on.id.0, add_on.price
        )));
    }
    if tax_percent < Decimal::ZERO || tax_percent > Decimal::from(100) {
        return Err(DomainError::InvalidEstimateInput(format!(
            "tax percent must be within 0..=100 (got {tax_percent})"
        )));
    }

    let add_ons_total = add_ons
        .iter()
        .try_fold(Decimal::ZERO, |total, add_on| total.checked_add(add_on.price))
        .ok_or_else(overflow)?;
    let subtotal = base_price.checked_add(add_ons_total).ok_or_else(overflow)?;
    let tax_amount = subtotal
        .checked_mul(tax_percent)
        .and_then(|scaled| scaled.checked_div(Decimal::from(100)))
        .ok_or_else(overflow)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let final_estimate = subtotal.checked_add(tax_amount).ok_or_else(overflow)?;

    let mut by_category: BTreeMap<AddOnCategory, (usize, Decimal)> = BTreeMap::new();
    for add_on in add_ons {
        let entry = by_category.entry(add_on.category).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += add_on.price;
    }
    let breakdown = by_category
        .into_iter()
        .map(|(category, (count, total))| CategoryTotal { category, count, total })
        .collect();

    let trace = vec![
        trace_step("base_price", "selected package", base_price),
        trace_step("add_ons", format!("sum of {} add-on prices", add_ons.len()), add_ons_total),
        trace_step("subtotal", "base_price + add_ons", subtotal),
        trace_step("tax", format!("subtotal * {tax_percent}%"), tax_amount),
        trace_step("final_estimate", "subtotal + tax", final_estimate),
    ];

    debug!(
        event_name = "pricing.estimate_calculated",
        add_on_count = add_ons.len(),
        final_estimate = %final_estimate,
        currency = settings.currency.as_str(),
        "cost estimate calculated"
    );

    Ok(CostEstimate {
        base_price,
        add_ons_total,
        subtotal,
        tax_percent,
        tax_amount,
        final_estimate,
        min_range: settings.min_range,
        max_range: settings.max_range,
        currency: settings.currency.clone(),
        breakdown,
        trace,
    })
}

fn overflow() -> DomainError {
    DomainError::InvalidEstimateInput("amount overflow".to_owned())
}

fn trace_step(stage: &str, detail: impl Into<String>, amount: Decimal) -> EstimateTraceStep {
    EstimateTraceStep { stage: stage.to_owned(), detail: detail.into(), amount }
}
