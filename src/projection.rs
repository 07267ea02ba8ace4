use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amortization::{LoanTerms, balance_after};
use crate::errors::{EngineError, EngineResult};
use crate::rates::{growth_factor, product};

/// Growth assumptions for a multi-year equity projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionAssumption {
    /// Market value of the property at the start of year 1.
    pub initial_property_value: Decimal,
    /// Yearly change of the property value as a percentage.
    pub appreciation_rate_percent: Decimal,
    /// Yearly change of the rent as a percentage.
    pub rent_growth_rate_percent: Decimal,
    /// Number of years to project.
    pub horizon_years: u32,
    /// Cold rent of the first year, if the caller wants rent projected too.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_annual_rent: Option<Decimal>,
}

/// Projected figures at the end of one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityYear {
    /// 1-based year of the projection.
    pub year: u32,
    /// Property value after `year` years of appreciation.
    pub property_value: Decimal,
    /// Loan balance after `year * 12` payments.
    pub remaining_balance: Decimal,
    /// `property_value - remaining_balance`.
    pub equity: Decimal,
    /// Equity relative to the start: `equity - (initial_property_value - principal)`.
    pub equity_gain: Decimal,
    /// Rent for this year, present only when an initial rent was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_rent: Option<Decimal>,
}

/// Lazy year-by-year equity projection.
///
/// Every year is computed from the constant terms and assumption alone, so the sequence
/// can be cloned, restarted, or indexed with [`EquityProjection::year`].
#[derive(Debug, Clone)]
pub struct EquityProjection {
    terms: LoanTerms,
    assumption: ProjectionAssumption,
    monthly_rate: Decimal,
    initial_equity: Decimal,
    next_year: u32,
}

impl EquityProjection {
    pub fn initial_equity(&self) -> Decimal {
        self.initial_equity
    }

    pub fn restart(&mut self) {
        self.next_year = 1;
    }

    /// Figures for a single year, `1..=horizon_years`.
    pub fn year(&self, year: u32) -> EngineResult<EquityYear> {
        if year == 0 || year > self.assumption.horizon_years {
            return Err(EngineError::invalid("year", "outside the projection horizon"));
        }

        let appreciation = self.assumption.appreciation_rate_percent / dec!(100);
        let property_value = product(
            self.assumption.initial_property_value,
            growth_factor(appreciation, year, "horizon_years")?,
            "horizon_years",
        )?;

        let elapsed_months = year.saturating_mul(12);
        let remaining_balance = balance_after(
            self.terms.principal(),
            self.monthly_rate,
            self.terms.term_months(),
            elapsed_months,
        )?;

        // Rent grows from year 2 on; year 1 is the starting rent.
        let annual_rent = match self.assumption.initial_annual_rent {
            Some(rent) => {
                let growth = self.assumption.rent_growth_rate_percent / dec!(100);
                Some(product(
                    rent,
                    growth_factor(growth, year - 1, "horizon_years")?,
                    "horizon_years",
                )?)
            }
            None => None,
        };

        let equity = property_value - remaining_balance;
        Ok(EquityYear {
            year,
            property_value,
            remaining_balance,
            equity,
            equity_gain: equity
                .checked_sub(self.initial_equity)
                .ok_or_else(|| EngineError::invalid("horizon_years", "value overflows"))?,
            annual_rent,
        })
    }

    fn remaining(&self) -> usize {
        self.assumption.horizon_years.saturating_add(1).saturating_sub(self.next_year) as usize
    }
}

impl Iterator for EquityProjection {
    type Item = EquityYear;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_year > self.assumption.horizon_years {
            return None;
        }
        // Every year was checked for overflow when the projection was built.
        let item = self.year(self.next_year).ok()?;
        self.next_year += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for EquityProjection {}

/// Projects property value, loan balance and equity for years `1..=horizon_years`.
///
/// Years past the end of the loan report a zero balance.
///
/// # Arguments
///
/// * `terms` - The loan financing the property.
/// * `assumption` - Starting value, growth rates and horizon.
///
/// # Errors
///
/// Returns `InvalidInput` for a zero horizon, a non-positive property value, growth rates at or
/// below -100%, or values that overflow when compounded over the horizon.
pub fn project_equity(terms: &LoanTerms, assumption: &ProjectionAssumption) -> EngineResult<EquityProjection> {
    debug!(
        principal = %terms.principal(),
        initial_property_value = %assumption.initial_property_value,
        horizon_years = assumption.horizon_years,
        "projecting equity"
    );
    if assumption.horizon_years == 0 {
        return Err(EngineError::invalid("horizon_years", "must be greater than zero"));
    }
    if assumption.initial_property_value <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "initial_property_value",
            "must be greater than zero",
        ));
    }
    if assumption.appreciation_rate_percent <= dec!(-100) {
        return Err(EngineError::invalid(
            "appreciation_rate_percent",
            "must be greater than -100",
        ));
    }
    if assumption.rent_growth_rate_percent <= dec!(-100) {
        return Err(EngineError::invalid(
            "rent_growth_rate_percent",
            "must be greater than -100",
        ));
    }
    if assumption.initial_annual_rent.is_some_and(|rent| rent < Decimal::ZERO) {
        return Err(EngineError::invalid("initial_annual_rent", "must not be negative"));
    }

    let projection = EquityProjection {
        terms: terms.clone(),
        assumption: assumption.clone(),
        monthly_rate: terms.monthly_rate()?,
        initial_equity: assumption.initial_property_value - terms.principal(),
        next_year: 1,
    };
    // Compounding is monotonic in the exponent: if the last year fits, every year does.
    projection.year(assumption.horizon_years)?;
    Ok(projection)
}
