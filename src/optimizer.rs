use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, EngineResult};
use crate::rates::{RateConvention, monthly_rate, product};

/// Number of months needed to repay a loan at a fixed payment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TermSolution {
    /// Fractional months from the closed-form solution.
    pub exact_months: Decimal,
}

impl TermSolution {
    /// Payments actually required: the exact term rounded up. Fractions below 1/10000 of a
    /// month are logarithm noise and do not add a payment.
    pub fn whole_months(&self) -> u32 {
        self.exact_months
            .round_dp(4)
            .ceil()
            .to_u32()
            .unwrap_or(u32::MAX)
    }

    pub fn years(&self) -> Decimal {
        self.exact_months / dec!(12)
    }
}

/// Which way to move the repayment rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    /// Repay faster with a higher rate.
    Shorten,
    /// Repay slower with a lower rate.
    Lengthen,
}

/// Allowed range for an initial repayment rate, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepaymentRateBounds {
    /// Lowest rate an adjustment may produce.
    pub min_rate: Decimal,
    /// Highest rate an adjustment may produce.
    pub max_rate: Decimal,
}

impl Default for RepaymentRateBounds {
    fn default() -> Self {
        RepaymentRateBounds {
            min_rate: dec!(1),
            max_rate: dec!(10),
        }
    }
}

impl RepaymentRateBounds {
    pub fn new(min_rate: Decimal, max_rate: Decimal) -> EngineResult<Self> {
        let bounds = RepaymentRateBounds { min_rate, max_rate };
        bounds.validate()?;
        Ok(bounds)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.min_rate < Decimal::ZERO {
            return Err(EngineError::invalid("min_rate", "must not be negative"));
        }
        if self.min_rate > self.max_rate {
            return Err(EngineError::invalid("max_rate", "must not be below min_rate"));
        }
        Ok(())
    }

    pub fn clamp(&self, rate: Decimal) -> Decimal {
        rate.max(self.min_rate).min(self.max_rate)
    }
}

/// Multipliers applied to the repayment rate when shortening or lengthening a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepaymentAdjustment {
    /// Multiplier above 1 used to repay faster.
    pub shorten_factor: Decimal,
    /// Multiplier between 0 and 1 used to repay slower.
    pub lengthen_factor: Decimal,
}

impl Default for RepaymentAdjustment {
    fn default() -> Self {
        RepaymentAdjustment {
            shorten_factor: dec!(1.5),
            lengthen_factor: dec!(0.7),
        }
    }
}

impl RepaymentAdjustment {
    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.shorten_factor <= Decimal::ONE {
            return Err(EngineError::invalid("shorten_factor", "must be greater than 1"));
        }
        if self.lengthen_factor <= Decimal::ZERO || self.lengthen_factor >= Decimal::ONE {
            return Err(EngineError::invalid("lengthen_factor", "must be between 0 and 1"));
        }
        Ok(())
    }

    /// Scales `current_rate` by the factor for `direction` and clamps it into `bounds`.
    ///
    /// The term is monotonic in the repayment rate, so one step is enough.
    pub fn apply(
        &self,
        current_rate: Decimal,
        direction: AdjustmentDirection,
        bounds: &RepaymentRateBounds,
    ) -> EngineResult<Decimal> {
        debug!(%current_rate, ?direction, "adjusting repayment rate");
        if current_rate < Decimal::ZERO {
            return Err(EngineError::invalid("current_rate", "must not be negative"));
        }
        self.validate()?;
        bounds.validate()?;

        let factor = match direction {
            AdjustmentDirection::Shorten => self.shorten_factor,
            AdjustmentDirection::Lengthen => self.lengthen_factor,
        };
        Ok(bounds.clamp(product(current_rate, factor, "current_rate")?))
    }
}

/// Key figures of an annuity loan defined by its initial repayment rate (Tilgungssatz).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentPlan {
    /// The loan amount.
    pub principal: Decimal,
    /// The annual interest rate as a percentage.
    pub annual_interest_rate: Decimal,
    /// Share of the principal repaid in the first year, as a percentage.
    pub initial_repayment_rate: Decimal,
    /// Fixed monthly payment, interest and repayment combined.
    pub monthly_payment: Decimal,
    /// Months until the loan is repaid.
    pub term: TermSolution,
    /// `monthly_payment * term.exact_months`.
    pub total_paid: Decimal,
    /// `total_paid - principal`.
    pub total_interest: Decimal,
}

/// Solves the annuity formula for the term given a fixed monthly payment.
///
/// `n = ln(payment / (payment - principal * r)) / ln(1 + r)`, or `principal / payment`
/// when the rate is zero.
///
/// # Errors
///
/// Returns `InvalidInput` for a non-positive principal or payment or a negative rate, and
/// `Unsolvable` when the payment does not exceed the monthly interest.
pub fn find_term_for_target_payment(
    principal: Decimal,
    annual_interest_rate: Decimal,
    target_monthly_payment: Decimal,
) -> EngineResult<TermSolution> {
    debug!(%principal, %annual_interest_rate, %target_monthly_payment, "solving term for payment");
    if principal <= Decimal::ZERO {
        return Err(EngineError::invalid("principal", "must be greater than zero"));
    }
    if target_monthly_payment <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "target_monthly_payment",
            "must be greater than zero",
        ));
    }
    let rate = monthly_rate(annual_interest_rate, RateConvention::Nominal)?;

    if rate.is_zero() {
        return Ok(TermSolution {
            exact_months: principal / target_monthly_payment,
        });
    }

    let monthly_interest = product(principal, rate, "principal")?;
    if target_monthly_payment <= monthly_interest {
        return Err(EngineError::Unsolvable(format!(
            "payment {} does not cover the monthly interest of {}",
            target_monthly_payment.round_dp(2),
            monthly_interest.round_dp(2)
        )));
    }

    let numerator = (target_monthly_payment / (target_monthly_payment - monthly_interest))
        .checked_ln()
        .ok_or_else(|| EngineError::Unsolvable("payment ratio has no logarithm".to_string()))?;
    let denominator = (Decimal::ONE + rate)
        .checked_ln()
        .ok_or_else(|| EngineError::Unsolvable("rate has no logarithm".to_string()))?;

    Ok(TermSolution {
        exact_months: numerator / denominator,
    })
}

/// Moves a repayment rate with the default factors (1.5 to shorten, 0.7 to lengthen).
pub fn adjust_repayment_rate(
    current_rate: Decimal,
    direction: AdjustmentDirection,
    bounds: &RepaymentRateBounds,
) -> EngineResult<Decimal> {
    RepaymentAdjustment::default().apply(current_rate, direction, bounds)
}

/// Evaluates a loan whose monthly payment is `principal * (interest + repayment) / 100 / 12`.
///
/// # Arguments
///
/// * `principal` - The loan amount.
/// * `annual_interest_rate` - The annual interest rate as a percentage.
/// * `initial_repayment_rate` - The first-year repayment as a percentage of the principal.
///
/// # Errors
///
/// Returns `InvalidInput` for a non-positive principal or repayment rate, a negative interest
/// rate, or amounts that overflow.
pub fn evaluate_repayment_plan(
    principal: Decimal,
    annual_interest_rate: Decimal,
    initial_repayment_rate: Decimal,
) -> EngineResult<RepaymentPlan> {
    debug!(%principal, %annual_interest_rate, %initial_repayment_rate, "evaluating repayment plan");
    if principal <= Decimal::ZERO {
        return Err(EngineError::invalid("principal", "must be greater than zero"));
    }
    if initial_repayment_rate <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "initial_repayment_rate",
            "must be greater than zero",
        ));
    }
    if annual_interest_rate < Decimal::ZERO {
        return Err(EngineError::invalid("annual_interest_rate", "must not be negative"));
    }

    let monthly_payment = product(
        principal,
        (annual_interest_rate + initial_repayment_rate) / dec!(1200),
        "principal",
    )?;
    let term = find_term_for_target_payment(principal, annual_interest_rate, monthly_payment)?;
    let total_paid = product(monthly_payment, term.exact_months, "principal")?;

    Ok(RepaymentPlan {
        principal,
        annual_interest_rate,
        initial_repayment_rate,
        monthly_payment,
        term,
        total_paid,
        total_interest: total_paid - principal,
    })
}
