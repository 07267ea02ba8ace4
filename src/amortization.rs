use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{EngineError, EngineResult};
use crate::rates::{RateConvention, growth_factor, monthly_rate, product};

/// Longest loan the engine accepts, 100 years of monthly payments.
pub const MAX_TERM_MONTHS: u32 = 1200;

/// Validated parameters of an amortizing loan.
///
/// Fields are private so a `LoanTerms` value is always valid; deserialization
/// goes through the same checks as [`LoanTerms::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLoanTerms")]
pub struct LoanTerms {
    principal: Decimal,
    annual_interest_rate: Decimal,
    term_months: u32,
    rate_convention: RateConvention,
}

#[derive(Deserialize)]
struct RawLoanTerms {
    principal: Decimal,
    annual_interest_rate: Decimal,
    term_months: u32,
    #[serde(default)]
    rate_convention: RateConvention,
}

impl TryFrom<RawLoanTerms> for LoanTerms {
    type Error = EngineError;

    fn try_from(raw: RawLoanTerms) -> EngineResult<Self> {
        Ok(LoanTerms::new(raw.principal, raw.annual_interest_rate, raw.term_months)?
            .with_rate_convention(raw.rate_convention))
    }
}

impl LoanTerms {
    /// # Errors
    ///
    /// Returns `InvalidInput` if the principal is not positive, the term is zero or longer than
    /// [`MAX_TERM_MONTHS`], or the rate is negative.
    pub fn new(principal: Decimal, annual_interest_rate: Decimal, term_months: u32) -> EngineResult<Self> {
        validate_loan(principal, annual_interest_rate, term_months)?;
        Ok(LoanTerms {
            principal,
            annual_interest_rate,
            term_months,
            rate_convention: RateConvention::Nominal,
        })
    }

    pub fn with_rate_convention(mut self, rate_convention: RateConvention) -> Self {
        self.rate_convention = rate_convention;
        self
    }

    pub fn principal(&self) -> Decimal {
        self.principal
    }

    /// Annual interest rate as a percentage.
    pub fn annual_interest_rate(&self) -> Decimal {
        self.annual_interest_rate
    }

    pub fn term_months(&self) -> u32 {
        self.term_months
    }

    pub fn rate_convention(&self) -> RateConvention {
        self.rate_convention
    }

    pub fn monthly_rate(&self) -> EngineResult<Decimal> {
        monthly_rate(self.annual_interest_rate, self.rate_convention)
    }

    pub fn monthly_payment(&self) -> EngineResult<Decimal> {
        annuity_payment(self.principal, self.monthly_rate()?, self.term_months)
    }

    /// Outstanding balance after `elapsed_months` regular payments.
    pub fn remaining_balance(&self, elapsed_months: u32) -> EngineResult<Decimal> {
        balance_after(self.principal, self.monthly_rate()?, self.term_months, elapsed_months)
    }
}

/// One month of an amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    /// 1-based month number.
    pub period_index: u32,
    /// Amount paid this month, interest plus principal.
    pub payment: Decimal,
    /// Interest charged on the balance carried into this month.
    pub interest_portion: Decimal,
    /// Part of the payment that reduces the loan.
    pub principal_portion: Decimal,
    /// Balance left after this payment.
    pub remaining_balance: Decimal,
}

/// Month-by-month breakdown of a loan until it is fully repaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    /// The regular monthly payment. For an annuity this is the fixed payment (the last period
    /// may differ by rounding drift); for a constant-principal loan it is the first and highest
    /// payment.
    pub payment: Decimal,
    /// One entry per month, in order.
    pub periods: Vec<Period>,
    /// Sum of all payments.
    pub total_paid: Decimal,
    /// Sum of all interest portions.
    pub total_interest: Decimal,
}

impl AmortizationSchedule {
    fn from_periods(payment: Decimal, periods: Vec<Period>) -> Self {
        let total_paid = periods.iter().map(|p| p.payment).sum();
        let total_interest = periods.iter().map(|p| p.interest_portion).sum();
        AmortizationSchedule {
            payment,
            periods,
            total_paid,
            total_interest,
        }
    }

    pub fn first_payment(&self) -> Decimal {
        self.periods.first().map(|p| p.payment).unwrap_or_default()
    }

    pub fn last_payment(&self) -> Decimal {
        self.periods.last().map(|p| p.payment).unwrap_or_default()
    }

    pub fn total_principal(&self) -> Decimal {
        self.periods.iter().map(|p| p.principal_portion).sum()
    }
}

/// Annuity and constant-principal schedules for the same loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentComparison {
    /// The loan both schedules were built from.
    pub terms: LoanTerms,
    /// Fixed payment each month (Annuitätendarlehen).
    pub annuity: AmortizationSchedule,
    /// Fixed principal portion each month, declining payments (Tilgungsdarlehen).
    pub constant_principal: AmortizationSchedule,
}

impl RepaymentComparison {
    /// Interest saved by choosing the constant-principal loan. Negative if the annuity is cheaper.
    pub fn interest_difference(&self) -> Decimal {
        self.annuity.total_interest - self.constant_principal.total_interest
    }
}

fn validate_loan(principal: Decimal, annual_interest_rate: Decimal, term_months: u32) -> EngineResult<()> {
    if principal <= Decimal::ZERO {
        return Err(EngineError::invalid("principal", "must be greater than zero"));
    }
    if annual_interest_rate < Decimal::ZERO {
        return Err(EngineError::invalid("annual_interest_rate", "must not be negative"));
    }
    if term_months == 0 {
        return Err(EngineError::invalid("term_months", "must be greater than zero"));
    }
    if term_months > MAX_TERM_MONTHS {
        return Err(EngineError::invalid(
            "term_months",
            format!("must not exceed {MAX_TERM_MONTHS}"),
        ));
    }
    Ok(())
}

/// PMT = P * r * [(1 + r)^n / ((1 + r)^n - 1)], or P / n without interest.
pub(crate) fn annuity_payment(principal: Decimal, rate: Decimal, term_months: u32) -> EngineResult<Decimal> {
    if rate.is_zero() {
        return Ok(principal / Decimal::from(term_months));
    }

    let factor = growth_factor(rate, term_months, "term_months")?;
    let annuity_factor = product(rate, factor / (factor - Decimal::ONE), "annual_interest_rate")?;
    product(principal, annuity_factor, "principal")
}

pub(crate) fn balance_after(
    principal: Decimal,
    rate: Decimal,
    term_months: u32,
    elapsed_months: u32,
) -> EngineResult<Decimal> {
    let elapsed_months = elapsed_months.min(term_months);
    let n = Decimal::from(term_months);
    let k = Decimal::from(elapsed_months);

    if rate.is_zero() {
        return Ok(principal * (Decimal::ONE - k / n));
    }

    let total_factor = growth_factor(rate, term_months, "term_months")?;
    let elapsed_factor = growth_factor(rate, elapsed_months, "elapsed_months")?;
    Ok(principal * ((total_factor - elapsed_factor) / (total_factor - Decimal::ONE)))
}

/// Fixed monthly payment of an annuity loan.
///
/// The annual rate is a percentage converted with the nominal convention (`rate / 100 / 12`).
/// A zero rate falls back to linear repayment, `principal / term_months`.
///
/// # Arguments
///
/// * `principal` - The loan amount.
/// * `annual_interest_rate` - The annual interest rate as a percentage (e.g., 5 for 5%).
/// * `term_months` - The number of monthly payments, at most [`MAX_TERM_MONTHS`].
///
/// # Errors
///
/// Returns `InvalidInput` if `principal` or `term_months` is out of range, the rate is negative,
/// or the payment overflows.
pub fn compute_monthly_payment(
    principal: Decimal,
    annual_interest_rate: Decimal,
    term_months: u32,
) -> EngineResult<Decimal> {
    debug!(%principal, %annual_interest_rate, term_months, "computing monthly payment");
    validate_loan(principal, annual_interest_rate, term_months)?;
    let rate = monthly_rate(annual_interest_rate, RateConvention::Nominal)?;
    annuity_payment(principal, rate, term_months)
}

/// Outstanding balance after `elapsed_months` payments, using the closed form.
///
/// `elapsed_months` is clamped to the term, so any value past the end yields zero.
///
/// # Arguments
///
/// * `principal` - The loan amount.
/// * `annual_interest_rate` - The annual interest rate as a percentage.
/// * `term_months` - The number of monthly payments.
/// * `elapsed_months` - Payments already made.
pub fn compute_remaining_balance(
    principal: Decimal,
    annual_interest_rate: Decimal,
    term_months: u32,
    elapsed_months: u32,
) -> EngineResult<Decimal> {
    debug!(%principal, %annual_interest_rate, term_months, elapsed_months, "computing remaining balance");
    validate_loan(principal, annual_interest_rate, term_months)?;
    let rate = monthly_rate(annual_interest_rate, RateConvention::Nominal)?;
    balance_after(principal, rate, term_months, elapsed_months)
}

/// Interest paid over the whole term: `payment * term_months - principal`.
pub fn compute_total_interest(
    principal: Decimal,
    annual_interest_rate: Decimal,
    term_months: u32,
) -> EngineResult<Decimal> {
    let payment = compute_monthly_payment(principal, annual_interest_rate, term_months)?;
    Ok(product(payment, Decimal::from(term_months), "principal")? - principal)
}

/// Builds the period-by-period breakdown of an annuity loan.
///
/// Each month pays `balance * r` interest and the rest of the fixed payment as principal.
/// The final period repays whatever balance is left, so the schedule always ends at exactly zero.
pub fn generate_schedule(terms: &LoanTerms) -> EngineResult<AmortizationSchedule> {
    debug!(
        principal = %terms.principal,
        annual_interest_rate = %terms.annual_interest_rate,
        term_months = terms.term_months,
        "generating annuity schedule"
    );
    let rate = terms.monthly_rate()?;
    let regular_payment = annuity_payment(terms.principal, rate, terms.term_months)?;

    let mut current_balance = terms.principal;
    let mut periods = Vec::with_capacity(terms.term_months as usize);

    for period_index in 1..=terms.term_months {
        let interest_portion = product(current_balance, rate, "principal")?;
        let (payment, principal_portion) = if period_index == terms.term_months {
            (interest_portion + current_balance, current_balance)
        } else {
            (regular_payment, regular_payment - interest_portion)
        };
        current_balance -= principal_portion;
        periods.push(Period {
            period_index,
            payment,
            interest_portion,
            principal_portion,
            remaining_balance: current_balance.max(dec!(0)),
        });
    }

    Ok(AmortizationSchedule::from_periods(regular_payment, periods))
}

/// Builds the schedule of a loan that repays a constant `principal / term_months` every month.
///
/// Interest is charged on the outstanding balance, so payments decline over time.
pub fn generate_constant_principal_schedule(terms: &LoanTerms) -> EngineResult<AmortizationSchedule> {
    debug!(
        principal = %terms.principal,
        annual_interest_rate = %terms.annual_interest_rate,
        term_months = terms.term_months,
        "generating constant principal schedule"
    );
    let rate = terms.monthly_rate()?;
    let fixed_principal = terms.principal / Decimal::from(terms.term_months);

    let mut current_balance = terms.principal;
    let mut periods = Vec::with_capacity(terms.term_months as usize);

    for period_index in 1..=terms.term_months {
        let interest_portion = product(current_balance, rate, "principal")?;
        let principal_portion = if period_index == terms.term_months {
            current_balance
        } else {
            fixed_principal
        };
        let payment = principal_portion
            .checked_add(interest_portion)
            .ok_or_else(|| EngineError::invalid("principal", "value overflows"))?;
        current_balance -= principal_portion;
        periods.push(Period {
            period_index,
            payment,
            interest_portion,
            principal_portion,
            remaining_balance: current_balance.max(dec!(0)),
        });
    }

    let first_payment = periods.first().map(|p| p.payment).unwrap_or_default();
    Ok(AmortizationSchedule::from_periods(first_payment, periods))
}

/// Runs both repayment styles over the same terms.
pub fn compare_repayment_styles(terms: &LoanTerms) -> EngineResult<RepaymentComparison> {
    debug!(
        principal = %terms.principal,
        annual_interest_rate = %terms.annual_interest_rate,
        term_months = terms.term_months,
        "comparing repayment styles"
    );
    Ok(RepaymentComparison {
        terms: terms.clone(),
        annuity: generate_schedule(terms)?,
        constant_principal: generate_constant_principal_schedule(terms)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn relative_diff(a: Decimal, b: Decimal) -> Decimal {
        if b.is_zero() {
            a.abs()
        } else {
            ((a - b) / b).abs()
        }
    }

    #[test]
    fn test_monthly_payment_standard_mortgage() {
        let payment = compute_monthly_payment(dec!(240000), dec!(5), 300).unwrap();
        assert_eq!(payment.round_dp(2), dec!(1403.02));
    }

    #[test]
    fn test_monthly_payment_zero_rate_is_linear() {
        let payment = compute_monthly_payment(dec!(300000), dec!(0), 240).unwrap();
        assert_eq!(payment, dec!(1250));
    }

    #[rstest]
    #[case(dec!(0), dec!(5), 300, "principal")]
    #[case(dec!(-100), dec!(5), 300, "principal")]
    #[case(dec!(100000), dec!(-0.5), 300, "annual_interest_rate")]
    #[case(dec!(100000), dec!(5), 0, "term_months")]
    fn test_invalid_loan_inputs(
        #[case] principal: Decimal,
        #[case] rate: Decimal,
        #[case] term: u32,
        #[case] expected_field: &str,
    ) {
        match compute_monthly_payment(principal, rate, term) {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert!(LoanTerms::new(principal, rate, term).is_err());
    }

    #[rstest]
    #[case(dec!(240000), dec!(5), 300)]
    #[case(dec!(300000), dec!(0), 240)]
    #[case(dec!(12000), dec!(12), 12)]
    #[case(dec!(500000), dec!(3.75), 360)]
    fn test_remaining_balance_endpoints(#[case] principal: Decimal, #[case] rate: Decimal, #[case] term: u32) {
        assert_eq!(compute_remaining_balance(principal, rate, term, 0).unwrap(), principal);
        let at_end = compute_remaining_balance(principal, rate, term, term).unwrap();
        assert!(at_end.abs() < dec!(0.000001) * principal);
        assert_eq!(compute_remaining_balance(principal, rate, term, term + 12).unwrap(), at_end);
    }

    #[test]
    fn test_remaining_balance_matches_schedule() {
        let terms = LoanTerms::new(dec!(240000), dec!(5), 300).unwrap();
        let schedule = generate_schedule(&terms).unwrap();
        let closed_form = compute_remaining_balance(dec!(240000), dec!(5), 300, 120).unwrap();
        assert!((schedule.periods[119].remaining_balance - closed_form).abs() < dec!(0.0001));
    }

    #[rstest]
    #[case(dec!(240000), dec!(5), 300)]
    #[case(dec!(300000), dec!(0), 240)]
    #[case(dec!(75000), dec!(9.9), 84)]
    fn test_schedule_invariants(#[case] principal: Decimal, #[case] rate: Decimal, #[case] term: u32) {
        let terms = LoanTerms::new(principal, rate, term).unwrap();
        let schedule = generate_schedule(&terms).unwrap();

        assert_eq!(schedule.periods.len(), term as usize);
        assert!(relative_diff(schedule.total_principal(), principal) < dec!(0.000001));
        assert_eq!(schedule.periods.last().unwrap().remaining_balance, Decimal::ZERO);

        let mut previous = principal;
        for period in &schedule.periods {
            assert!(period.remaining_balance < previous);
            assert!((period.interest_portion + period.principal_portion - period.payment).abs() < dec!(0.000000001));
            previous = period.remaining_balance;
        }
    }

    #[test]
    fn test_schedule_totals() {
        let terms = LoanTerms::new(dec!(12000), dec!(12), 12).unwrap();
        let schedule = generate_schedule(&terms).unwrap();
        assert_eq!(schedule.payment.round_dp(2), dec!(1066.19));
        assert_eq!(schedule.payment, compute_monthly_payment(dec!(12000), dec!(12), 12).unwrap());
        assert_eq!(schedule.first_payment(), schedule.payment);
        assert_eq!(schedule.total_paid.round_dp(2), dec!(12794.23));
        assert_eq!(schedule.total_interest.round_dp(2), dec!(794.23));
    }

    #[test]
    fn test_large_principal_does_not_overflow_intermediate_product() {
        // principal * r * (1 + r)^n would exceed Decimal::MAX before the division
        let principal = dec!(10000000000000000000000000);
        let payment = compute_monthly_payment(principal, dec!(60), 360).unwrap();
        assert!(payment > principal * dec!(0.05));
        assert!(payment < principal * dec!(0.0501));
    }

    #[test]
    fn test_payment_overflow_is_invalid_input() {
        // 1% a month over a single month pays 1.01 * principal
        match compute_monthly_payment(Decimal::MAX, dec!(12), 1) {
            Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "principal"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        let terms = LoanTerms::new(Decimal::MAX, dec!(12), 1).unwrap();
        assert!(generate_schedule(&terms).is_err());
        assert!(generate_constant_principal_schedule(&terms).is_err());
    }

    #[rstest]
    #[case(dec!(0))]
    #[case(dec!(5))]
    fn test_term_above_maximum_rejected(#[case] rate: Decimal) {
        assert!(LoanTerms::new(dec!(100000), rate, MAX_TERM_MONTHS).is_ok());
        for term in [MAX_TERM_MONTHS + 1, u32::MAX] {
            match LoanTerms::new(dec!(100000), rate, term) {
                Err(EngineError::InvalidInput { field, .. }) => assert_eq!(field, "term_months"),
                other => panic!("expected InvalidInput, got {other:?}"),
            }
            assert!(compute_monthly_payment(dec!(100000), rate, term).is_err());
            assert!(compute_remaining_balance(dec!(100000), rate, term, 12).is_err());
        }
    }

    #[test]
    fn test_longest_term_schedule() {
        let terms = LoanTerms::new(dec!(100000), dec!(0), MAX_TERM_MONTHS).unwrap();
        let schedule = generate_schedule(&terms).unwrap();
        assert_eq!(schedule.periods.len(), MAX_TERM_MONTHS as usize);
        assert_eq!(schedule.periods.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_total_interest() {
        let interest = compute_total_interest(dec!(300000), dec!(0), 240).unwrap();
        assert_eq!(interest, Decimal::ZERO);
    }

    #[rstest]
    #[case(dec!(1), dec!(2))]
    #[case(dec!(2), dec!(4.5))]
    #[case(dec!(0), dec!(0.1))]
    fn test_payment_increases_with_rate(#[case] lower: Decimal, #[case] higher: Decimal) {
        let low = compute_monthly_payment(dec!(200000), lower, 240).unwrap();
        let high = compute_monthly_payment(dec!(200000), higher, 240).unwrap();
        assert!(low < high);
    }

    #[rstest]
    #[case(120, 180)]
    #[case(240, 360)]
    fn test_payment_decreases_with_term(#[case] shorter: u32, #[case] longer: u32) {
        for rate in [dec!(0), dec!(3.5)] {
            let short = compute_monthly_payment(dec!(200000), rate, shorter).unwrap();
            let long = compute_monthly_payment(dec!(200000), rate, longer).unwrap();
            assert!(short > long);
        }
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let terms = LoanTerms::new(dec!(180000), dec!(4.2), 180).unwrap();
        assert_eq!(generate_schedule(&terms).unwrap(), generate_schedule(&terms).unwrap());
        assert_eq!(
            compute_monthly_payment(dec!(180000), dec!(4.2), 180).unwrap(),
            compute_monthly_payment(dec!(180000), dec!(4.2), 180).unwrap()
        );
    }

    #[test]
    fn test_constant_principal_schedule() {
        let terms = LoanTerms::new(dec!(12000), dec!(12), 12).unwrap();
        let schedule = generate_constant_principal_schedule(&terms).unwrap();

        assert_eq!(schedule.periods[0].principal_portion, dec!(1000));
        assert_eq!(schedule.payment, schedule.first_payment());
        assert_eq!(schedule.first_payment().round_dp(2), dec!(1120.00));
        assert_eq!(schedule.last_payment().round_dp(2), dec!(1010.00));
        assert_eq!(schedule.total_paid.round_dp(2), dec!(12780.00));
        assert_eq!(schedule.periods.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_effective_convention_matches_price_table() {
        let terms = LoanTerms::new(dec!(12000), dec!(12), 12)
            .unwrap()
            .with_rate_convention(RateConvention::Effective);
        assert_eq!(terms.monthly_payment().unwrap().round_dp(2), dec!(1062.74));
    }

    #[test]
    fn test_compare_repayment_styles() {
        let terms = LoanTerms::new(dec!(360000), dec!(10.5), 420).unwrap();
        let comparison = compare_repayment_styles(&terms).unwrap();

        assert!(comparison.constant_principal.first_payment() > comparison.annuity.first_payment());
        assert!(comparison.constant_principal.last_payment() < comparison.annuity.last_payment());
        assert!(comparison.interest_difference() > Decimal::ZERO);
    }

    #[test]
    fn test_loan_terms_deserialize_validates() {
        let terms: LoanTerms = serde_json::from_str(
            r#"{"principal": "240000", "annual_interest_rate": "5", "term_months": 300}"#,
        )
        .unwrap();
        assert_eq!(terms.rate_convention(), RateConvention::Nominal);
        assert_eq!(terms.term_months(), 300);

        let invalid = serde_json::from_str::<LoanTerms>(
            r#"{"principal": "240000", "annual_interest_rate": "5", "term_months": 0}"#,
        );
        assert!(invalid.is_err());
    }
}
