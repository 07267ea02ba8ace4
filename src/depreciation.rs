use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{CalculationWarning, EngineError, EngineResult};
use crate::rates::product;

/// Longest useful life the plan is built for. Lower rates would imply a longer life.
pub const MAX_USEFUL_LIFE_YEARS: u32 = 1000;

/// Statutory straight-line AfA rates for residential buildings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AfaCategory {
    /// Completed before 1925: 2.5% over 40 years.
    BuiltBefore1925,
    /// Completed 1925 through 2022: 2% over 50 years.
    Standard,
    /// Completed from 2023 onwards: 3% over 33 years.
    CompletedFrom2023,
}

impl AfaCategory {
    pub fn rate_percent(&self) -> Decimal {
        match self {
            AfaCategory::BuiltBefore1925 => dec!(2.5),
            AfaCategory::Standard => dec!(2),
            AfaCategory::CompletedFrom2023 => dec!(3),
        }
    }
}

/// Input parameters for straight-line depreciation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationInput {
    /// Total purchase price of the property, land included.
    pub purchase_price: Decimal,
    /// Share of the purchase price attributed to land, which never depreciates.
    pub land_value: Decimal,
    /// Yearly depreciation as a percentage of the building value (e.g., 2 for 2%).
    pub depreciation_rate_percent: Decimal,
}

impl DepreciationInput {
    pub fn for_category(purchase_price: Decimal, land_value: Decimal, category: AfaCategory) -> Self {
        DepreciationInput {
            purchase_price,
            land_value,
            depreciation_rate_percent: category.rate_percent(),
        }
    }

    /// `purchase_price - land_value`, never negative.
    pub fn building_value(&self) -> Decimal {
        (self.purchase_price - self.land_value).max(Decimal::ZERO)
    }
}

/// One year of the depreciation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationYear {
    /// 1-based year of ownership.
    pub year: u32,
    /// Depreciation booked this year.
    pub amount: Decimal,
    /// Building value not yet depreciated after this year.
    pub remaining_book_value: Decimal,
}

/// Result of a straight-line depreciation calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationSchedule {
    /// Depreciable base, `purchase_price - land_value` clamped at zero.
    pub building_value: Decimal,
    /// Depreciation per full year.
    pub annual_amount: Decimal,
    /// `annual_amount / 12`.
    pub monthly_amount: Decimal,
    /// `annual_amount * years`, never more than the building value.
    pub total_over_life: Decimal,
    /// Useful life, `round(100 / rate)`.
    pub years: u32,
    /// One row per year of the useful life.
    pub entries: Vec<DepreciationYear>,
    /// Non-fatal findings about the input.
    pub warnings: Vec<CalculationWarning>,
}

/// Straight-line depreciation of the building share of a property.
///
/// The useful life is `round(100 / rate)` years. When the land value consumes the whole
/// purchase price all amounts are zero and the result carries
/// [`CalculationWarning::LandValueConsumesPurchasePrice`].
///
/// # Arguments
///
/// * `input` - Purchase price, land value and depreciation rate.
///
/// # Errors
///
/// Returns `InvalidInput` for a non-positive purchase price, a negative land value, a rate
/// outside `(0, 100]`, or a rate so low the useful life exceeds [`MAX_USEFUL_LIFE_YEARS`].
pub fn compute_depreciation_schedule(input: &DepreciationInput) -> EngineResult<DepreciationSchedule> {
    debug!(
        purchase_price = %input.purchase_price,
        land_value = %input.land_value,
        rate = %input.depreciation_rate_percent,
        "computing depreciation schedule"
    );
    validate(input)?;

    let mut warnings = Vec::new();
    if input.land_value >= input.purchase_price {
        let warning = CalculationWarning::LandValueConsumesPurchasePrice;
        warn!(
            purchase_price = %input.purchase_price,
            land_value = %input.land_value,
            "{}",
            warning.message()
        );
        warnings.push(warning);
    }

    let building_value = input.building_value();
    let annual_amount = product(building_value, input.depreciation_rate_percent / dec!(100), "purchase_price")?;
    let years = (dec!(100) / input.depreciation_rate_percent)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .filter(|years| *years <= MAX_USEFUL_LIFE_YEARS)
        .ok_or_else(|| {
            EngineError::invalid(
                "depreciation_rate_percent",
                format!("useful life must not exceed {MAX_USEFUL_LIFE_YEARS} years"),
            )
        })?;
    let total_over_life = product(annual_amount, Decimal::from(years), "purchase_price")?.min(building_value);

    let mut remaining_book_value = building_value;
    let mut entries = Vec::with_capacity(years as usize);
    for year in 1..=years {
        let amount = annual_amount.min(remaining_book_value);
        remaining_book_value -= amount;
        entries.push(DepreciationYear {
            year,
            amount,
            remaining_book_value,
        });
    }

    Ok(DepreciationSchedule {
        building_value,
        annual_amount,
        monthly_amount: annual_amount / dec!(12),
        total_over_life,
        years,
        entries,
        warnings,
    })
}

fn validate(input: &DepreciationInput) -> EngineResult<()> {
    if input.purchase_price <= Decimal::ZERO {
        return Err(EngineError::invalid("purchase_price", "must be greater than zero"));
    }
    if input.land_value < Decimal::ZERO {
        return Err(EngineError::invalid("land_value", "must not be negative"));
    }
    if input.depreciation_rate_percent <= Decimal::ZERO {
        return Err(EngineError::invalid(
            "depreciation_rate_percent",
            "must be greater than zero",
        ));
    }
    if input.depreciation_rate_percent > dec!(100) {
        return Err(EngineError::invalid(
            "depreciation_rate_percent",
            "must not exceed 100",
        ));
    }
    Ok(())
}
