//! `immo_financial` is a Rust library for the financing math behind real estate investments.
//!
//! It consolidates the calculations an investor needs before buying a property:
//! - **Amortization**: fixed annuity payments (Annuitätendarlehen), remaining balances at any
//!   month, full repayment schedules, and constant-principal loans (Tilgungsdarlehen) for comparison.
//! - **Repayment optimization**: the term implied by a target payment or an initial repayment
//!   rate (Tilgungssatz), and stepwise adjustment of that rate.
//! - **Depreciation (AfA)**: straight-line depreciation of the building share of the purchase price.
//! - **Projection**: property value, loan balance and equity year by year.
//!
//! All amounts are [`rust_decimal::Decimal`] and all rates are percentages (5 means 5%).
//! Invalid input fails with an [`EngineError`]; suspicious but valid input is reported as a
//! [`CalculationWarning`] on the result.
//!
//! ## Usage
//!
//! Add `immo_financial` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! immo_financial = "0.1.0"
//! rust_decimal = "1.39.0"
//! rust_decimal_macros = "1.39.0"
//! ```
//!
//! Then compute a payment and project the equity of the investment:
//!
//! ```rust
//! use immo_financial::{LoanTerms, ProjectionAssumption, compute_monthly_payment, project_equity};
//! use rust_decimal_macros::dec;
//!
//! fn main() -> Result<(), immo_financial::EngineError> {
//!     let payment = compute_monthly_payment(dec!(240000), dec!(5), 300)?;
//!     println!("Monthly payment: {:.2}", payment);
//!
//!     let terms = LoanTerms::new(dec!(240000), dec!(5), 300)?;
//!     let assumption = ProjectionAssumption {
//!         initial_property_value: dec!(300000),
//!         appreciation_rate_percent: dec!(3),
//!         rent_growth_rate_percent: dec!(2),
//!         horizon_years: 5,
//!         initial_annual_rent: None,
//!     };
//!
//!     for year in project_equity(&terms, &assumption)? {
//!         println!("Year {}: equity {:.2}", year.year, year.equity);
//!     }
//!     Ok(())
//! }
//! ```

pub mod amortization;
pub mod config;
pub mod depreciation;
pub mod errors;
pub mod optimizer;
pub mod projection;
pub mod rates;

pub use amortization::{
    AmortizationSchedule, LoanTerms, MAX_TERM_MONTHS, Period, RepaymentComparison, compare_repayment_styles,
    compute_monthly_payment, compute_remaining_balance, compute_total_interest,
    generate_constant_principal_schedule, generate_schedule,
};
pub use config::EngineConfig;
pub use depreciation::{
    AfaCategory, DepreciationInput, DepreciationSchedule, DepreciationYear, MAX_USEFUL_LIFE_YEARS,
    compute_depreciation_schedule,
};
pub use errors::{CalculationWarning, EngineError, EngineResult};
pub use optimizer::{
    AdjustmentDirection, RepaymentAdjustment, RepaymentPlan, RepaymentRateBounds, TermSolution,
    adjust_repayment_rate, evaluate_repayment_plan, find_term_for_target_payment,
};
pub use projection::{EquityProjection, EquityYear, ProjectionAssumption, project_equity};
pub use rates::{RateConvention, monthly_rate};
