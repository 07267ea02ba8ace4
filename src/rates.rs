use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};

/// How an annual percentage rate is turned into a monthly rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateConvention {
    /// `annual / 100 / 12`, the usual convention for German annuity loans.
    #[default]
    Nominal,
    /// `(1 + annual / 100)^(1/12) - 1`, compounding to exactly the annual rate.
    Effective,
}

/// Converts an annual interest rate percentage (e.g. 5 for 5%) to a monthly decimal rate.
///
/// # Errors
///
/// Returns `InvalidInput` if the annual rate is negative.
pub fn monthly_rate(annual_interest_rate: Decimal, convention: RateConvention) -> EngineResult<Decimal> {
    if annual_interest_rate < Decimal::ZERO {
        return Err(EngineError::invalid(
            "annual_interest_rate",
            "must not be negative",
        ));
    }

    let percent = annual_interest_rate / dec!(100);
    match convention {
        RateConvention::Nominal => Ok(percent / dec!(12)),
        RateConvention::Effective => {
            if percent.is_zero() {
                return Ok(Decimal::ZERO);
            }
            let base = Decimal::ONE + percent;
            let power_result = base
                .checked_powd(Decimal::ONE / dec!(12))
                .ok_or_else(|| EngineError::invalid("annual_interest_rate", "rate is out of range"))?;
            Ok(power_result - Decimal::ONE)
        }
    }
}

/// `(1 + rate)^periods` without panicking on overflow.
pub(crate) fn growth_factor(rate: Decimal, periods: u32, field: &str) -> EngineResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(periods.into())
        .ok_or_else(|| EngineError::invalid(field, "compounded value overflows"))
}

/// `a * b`, reporting overflow as `InvalidInput` on `field`.
pub(crate) fn product(a: Decimal, b: Decimal, field: &str) -> EngineResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| EngineError::invalid(field, "value overflows"))
}
