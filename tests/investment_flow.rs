use immo_financial::{
    AdjustmentDirection, CalculationWarning, DepreciationInput, EngineConfig, EngineError,
    ProjectionAssumption, RateConvention, RepaymentRateBounds, adjust_repayment_rate,
    compute_depreciation_schedule, compute_monthly_payment, compute_remaining_balance,
    evaluate_repayment_plan, find_term_for_target_payment, generate_schedule, project_equity,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn test_buy_and_hold_what_if() {
    let config = EngineConfig::default();
    let terms = config.loan_terms(dec!(400000), dec!(3.8), 360).unwrap();

    let payment = compute_monthly_payment(dec!(400000), dec!(3.8), 360).unwrap();
    let schedule = generate_schedule(&terms).unwrap();
    assert_eq!(schedule.first_payment(), payment);
    assert_eq!(schedule.periods.len(), 360);

    // Ten-year fixed interest period: what is left to refinance?
    let balance_after_fixed_period = compute_remaining_balance(dec!(400000), dec!(3.8), 360, 120).unwrap();
    assert!((schedule.periods[119].remaining_balance - balance_after_fixed_period).abs() < dec!(0.0001));

    let depreciation = compute_depreciation_schedule(&DepreciationInput {
        purchase_price: dec!(500000),
        land_value: dec!(100000),
        depreciation_rate_percent: dec!(2),
    })
    .unwrap();
    assert_eq!(depreciation.annual_amount, dec!(8000));

    let projection: Vec<_> = project_equity(
        &terms,
        &ProjectionAssumption {
            initial_property_value: dec!(500000),
            appreciation_rate_percent: dec!(2),
            rent_growth_rate_percent: dec!(1.5),
            horizon_years: 10,
            initial_annual_rent: Some(dec!(21600)),
        },
    )
    .unwrap()
    .collect();

    let year_ten = &projection[9];
    assert_eq!(year_ten.remaining_balance, balance_after_fixed_period);
    assert!(year_ten.equity > dec!(100000));
    assert!(projection.windows(2).all(|w| w[1].equity > w[0].equity));
}

#[test]
fn test_optimizer_round_trip_through_public_api() {
    let payment = compute_monthly_payment(dec!(240000), dec!(5), 300).unwrap();
    assert_eq!(payment.round_dp(2), dec!(1403.02));

    let solution = find_term_for_target_payment(dec!(240000), dec!(5), payment).unwrap();
    assert_eq!(solution.whole_months(), 300);
    assert!((solution.years() - dec!(25)).abs() < dec!(0.001));
}

#[test]
fn test_lengthening_plan_until_bounds() {
    let bounds = RepaymentRateBounds::new(dec!(1), dec!(4)).unwrap();
    let mut rate = dec!(3);
    let mut terms_in_months = Vec::new();

    for _ in 0..4 {
        let plan = evaluate_repayment_plan(dec!(300000), dec!(3.5), rate).unwrap();
        terms_in_months.push(plan.term.whole_months());
        rate = adjust_repayment_rate(rate, AdjustmentDirection::Lengthen, &bounds).unwrap();
    }

    assert_eq!(rate, dec!(1));
    assert!(terms_in_months.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_interest_only_payment_is_reported() {
    let err = find_term_for_target_payment(dec!(240000), dec!(5), dec!(1000)).unwrap_err();
    assert!(matches!(err, EngineError::Unsolvable(_)));
}

#[test]
fn test_land_only_purchase_warns() {
    let schedule = compute_depreciation_schedule(&DepreciationInput {
        purchase_price: dec!(500000),
        land_value: dec!(500000),
        depreciation_rate_percent: dec!(2),
    })
    .unwrap();

    assert_eq!(schedule.total_over_life, Decimal::ZERO);
    assert_eq!(schedule.warnings, vec![CalculationWarning::LandValueConsumesPurchasePrice]);
}

#[test]
fn test_effective_convention_from_config() {
    let config = EngineConfig::from_json_str(r#"{"rate_convention": "effective"}"#).unwrap();
    let effective = config.loan_terms(dec!(12000), dec!(12), 12).unwrap();
    assert_eq!(effective.rate_convention(), RateConvention::Effective);
    assert_eq!(effective.monthly_payment().unwrap().round_dp(2), dec!(1062.74));
}
