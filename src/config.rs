use std::fs;
use std::path::Path;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amortization::LoanTerms;
use crate::errors::EngineResult;
use crate::optimizer::{AdjustmentDirection, RepaymentAdjustment, RepaymentRateBounds};
use crate::rates::RateConvention;

/// Caller-level defaults for the engine. Every field is optional in JSON.
///
/// ```json
/// {
///   "rate_convention": "nominal",
///   "repayment_adjustment": { "shorten_factor": "1.5", "lengthen_factor": "0.7" },
///   "repayment_bounds": { "min_rate": "1", "max_rate": "10" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Convention applied to loan terms built with [`EngineConfig::loan_terms`].
    pub rate_convention: RateConvention,
    /// Factors used to shorten or lengthen a repayment plan.
    pub repayment_adjustment: RepaymentAdjustment,
    /// Range adjusted repayment rates are clamped into.
    pub repayment_bounds: RepaymentRateBounds,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(json).context("Failed to parse engine config")?;
        config.validate().context("Invalid engine config")?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config from {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.repayment_adjustment.validate()?;
        self.repayment_bounds.validate()
    }

    /// Builds loan terms using the configured rate convention.
    pub fn loan_terms(
        &self,
        principal: Decimal,
        annual_interest_rate: Decimal,
        term_months: u32,
    ) -> EngineResult<LoanTerms> {
        Ok(LoanTerms::new(principal, annual_interest_rate, term_months)?
            .with_rate_convention(self.rate_convention))
    }

    pub fn adjust_repayment_rate(
        &self,
        current_rate: Decimal,
        direction: AdjustmentDirection,
    ) -> EngineResult<Decimal> {
        self.repayment_adjustment
            .apply(current_rate, direction, &self.repayment_bounds)
    }
}
