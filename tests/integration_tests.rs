use chrono::NaiveDate;
use ledger_analytics::engine::validate_horizon;
use ledger_analytics::utils::last_day_of_month;
use ledger_analytics::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

fn household_year(income: &str, expense: &str) -> Vec<FinancialRecord> {
    (1..=12)
        .flat_map(|month| {
            let date = format!("2024-{:02}-01", month);
            vec![
                FinancialRecord::new(format!("sal-{}", month), "Salary", income, "income", date.clone()),
                FinancialRecord::new(format!("exp-{}", month), "Living costs", expense, "expense", date),
            ]
        })
        .collect()
}

fn entries_of(records: &[FinancialRecord]) -> Vec<LedgerEntry> {
    let report = normalize_records(records);
    assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    report.entries
}

fn history(values: &[(f64, f64)]) -> Vec<ForecastPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, (income, expenses))| {
            let year = 2023 + (i / 12) as i32;
            let month = (i % 12) as u32 + 1;
            ForecastPoint::new(last_day_of_month(year, month), *income, *expenses, 0.8)
        })
        .collect()
}

#[test]
fn test_steady_household_is_stable_and_low_risk() -> anyhow::Result<()> {
    let request = AnalysisRequest::new(household_year("5000", "-3000"))
        .with_reference_date(reference())
        .with_seed(42);

    let report = analyze_records(&request)?;

    assert_eq!(report.forecast.historical.len(), 12);
    for point in &report.forecast.historical {
        assert!((point.income - 5000.0).abs() < 1e-9);
        assert!((point.expenses - 3000.0).abs() < 1e-9);
        assert!((point.net_cash_flow - 2000.0).abs() < 1e-9);
    }

    assert_eq!(report.forecast.trend, TrendDirection::Stable);
    assert_eq!(report.forecast.seasonality, Seasonality::None);
    assert_eq!(report.health.risk_level, RiskLevel::Low);
    assert_eq!(report.health.emergency_fund_status, EmergencyFundStatus::Good);
    assert!((report.health.savings_rate - 0.4).abs() < 1e-9);
    assert!(report.anomalies.is_empty());

    // a constant history carries no volatility, so the projection stays flat
    for point in &report.forecast.forecast {
        assert!((point.income - 5000.0).abs() < 1e-6);
        assert!((point.expenses - 3000.0).abs() < 1e-6);
    }
    Ok(())
}

#[test]
fn test_outlier_is_flagged_with_confidence() {
    let mut records: Vec<FinancialRecord> = (0..10)
        .map(|i| {
            let amount = if i % 2 == 0 { -95.0 } else { -105.0 };
            FinancialRecord::new(
                format!("d{}", i),
                format!("Dinner {}", i),
                amount,
                "dining",
                format!("2024-03-{:02}", i * 2 + 1),
            )
        })
        .collect();
    records.push(FinancialRecord::new("big", "Banquet", -1000.0, "dining", "2024-03-25"));

    let entries = entries_of(&records);
    let engine = AnalyticsEngine::default();
    let anomalies = engine.detect_anomalies(&entries, EntityContext::Individual, reference());

    let flagged: Vec<_> = anomalies
        .iter()
        .filter(|a| a.anomaly_type == AnomalyType::UnusualAmount)
        .collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].record_id, "big");
    assert!(flagged[0].confidence > 0.6);
    assert!(flagged[0].confidence <= 0.9);
}

#[test]
fn test_zero_horizon_returns_history_untouched() -> anyhow::Result<()> {
    let config = AnalyticsConfig::default();
    let engine = ForecastEngine::new(&config);
    let input = history(&[(4000.0, 2500.0), (4200.0, 2600.0), (3900.0, 2700.0), (4100.0, 2550.0)]);

    let result = engine.forecast(input.clone(), 0, &mut NoNoise)?;
    assert!(result.forecast.is_empty());
    assert_eq!(result.historical, input);
    Ok(())
}

#[test]
fn test_single_record_organization_uses_defaults() -> anyhow::Result<()> {
    let records = vec![FinancialRecord::new("r1", "First sale", "1,250.00", "Revenue", "2024-05-02")];
    let request = AnalysisRequest::new(records)
        .with_context(EntityContext::Organization)
        .with_reference_date(reference())
        .with_seed(3);

    let report = analyze_records(&request)?;
    let health = &report.health;
    let org = health.organization.as_ref().expect("organization metrics");

    assert_eq!(health.context, EntityContext::Organization);
    assert!((org.profit_margin - 10.0).abs() < 1e-9);
    assert!((org.expense_ratio - 90.0).abs() < 1e-9);
    assert!((org.cash_flow_ratio - 1.2).abs() < 1e-9);
    assert!((org.working_capital_ratio - 1.5).abs() < 1e-9);
    assert!((health.debt_to_income_ratio - 0.3).abs() < 1e-9);
    assert!((health.savings_rate - 0.1).abs() < 1e-9);
    assert!((health.spending_efficiency - 90.0).abs() < 1e-9);
    assert_eq!(health.emergency_fund_status, EmergencyFundStatus::Warning);
    assert_eq!(health.risk_level, RiskLevel::Medium);
    Ok(())
}

#[test]
fn test_forecast_stays_within_clamp_band() -> anyhow::Result<()> {
    let mut config = AnalyticsConfig::default();
    config.forecast.noise_scale = 3.0;
    let engine = ForecastEngine::new(&config);

    let histories = vec![
        history(&[(1000.0, 900.0), (3000.0, 400.0), (500.0, 2500.0), (2000.0, 1200.0)]),
        history(&[(800.0, 600.0)]),
        history(&[(100.0, 50.0), (9000.0, 7000.0)]),
        history(&(0..18).map(|i| (1000.0 + 150.0 * i as f64, 700.0 + 20.0 * i as f64)).collect::<Vec<_>>()),
    ];

    for (seed, input) in histories.into_iter().enumerate() {
        let last = input.last().cloned().expect("non-empty history");
        let mut noise = GaussianNoise::new(StdRng::seed_from_u64(seed as u64));
        let result = engine.forecast(input, 36, &mut noise)?;

        assert_eq!(result.forecast.len(), 36);
        for point in &result.forecast {
            assert!(point.income >= 0.5 * last.income - 1e-9, "income {} below band", point.income);
            assert!(point.income <= 2.5 * last.income + 1e-9, "income {} above band", point.income);
            assert!(point.expenses >= 0.5 * last.expenses - 1e-9);
            assert!(point.expenses <= 2.5 * last.expenses + 1e-9);
            assert!((point.net_cash_flow - (point.income - point.expenses)).abs() < 1e-9);
            assert!((0.3..=0.95).contains(&point.confidence));
        }
    }
    Ok(())
}

#[test]
fn test_confidence_never_increases_with_distance() -> anyhow::Result<()> {
    let config = AnalyticsConfig::default();
    let engine = ForecastEngine::new(&config);
    let input = history(&[(5000.0, 3000.0), (5200.0, 3100.0), (4800.0, 3300.0), (5100.0, 2900.0)]);

    let result = engine.forecast(input, 24, &mut NoNoise)?;
    for pair in result.forecast.windows(2) {
        assert!(pair[1].confidence <= pair[0].confidence);
    }
    assert!(result.forecast.last().unwrap().confidence >= 0.3);
    Ok(())
}

#[test]
fn test_sparse_forecast_is_not_flat() -> anyhow::Result<()> {
    let config = AnalyticsConfig::default();
    let engine = ForecastEngine::new(&config);
    let input = history(&[(2000.0, 1500.0), (2000.0, 1500.0)]);

    let result = engine.forecast(input, 6, &mut GaussianNoise::seeded(11))?;
    let incomes: Vec<f64> = result.forecast.iter().map(|p| p.income).collect();
    assert!(incomes.windows(2).any(|w| (w[0] - w[1]).abs() > 1e-6));
    Ok(())
}

#[test]
fn test_too_few_records_yield_empty_collections() {
    let records = vec![
        FinancialRecord::new("1", "Coffee", "-4.5", "food", "2024-01-02"),
        FinancialRecord::new("2", "Lottery", "-1000", "gambling", "2024-01-03"),
    ];
    let entries = entries_of(&records);
    let engine = AnalyticsEngine::default();

    assert!(engine
        .detect_anomalies(&entries, EntityContext::Individual, reference())
        .is_empty());
    assert!(engine.analyze_spending_patterns(&entries).is_empty());
}

#[test]
fn test_fewer_than_five_records_yield_no_insights() {
    let records: Vec<FinancialRecord> = (0..4)
        .map(|i| FinancialRecord::new(format!("{}", i), "Card", "-900", "expense", "2024-02-10"))
        .collect();
    let entries = entries_of(&records);
    let engine = AnalyticsEngine::default();
    let health = engine.assess_health(&entries, EntityContext::Individual);

    assert_eq!(health.risk_level, RiskLevel::High);
    assert!(engine.generate_insights(&entries, &[], &[], &health).is_empty());
}

#[test]
fn test_identical_amounts_are_never_unusual() {
    let records: Vec<FinancialRecord> = (0..25)
        .map(|i| {
            FinancialRecord::new(
                format!("sub-{}", i),
                format!("Subscription {}", i),
                "-12.99",
                "subscriptions",
                format!("2024-{:02}-05", i % 12 + 1),
            )
        })
        .collect();
    let entries = entries_of(&records);
    let anomalies = AnalyticsEngine::default().detect_anomalies(&entries, EntityContext::Individual, reference());

    assert!(anomalies
        .iter()
        .all(|a| a.anomaly_type != AnomalyType::UnusualAmount));
}

#[test]
fn test_aggregation_ignores_input_order() {
    let mut records = household_year("4000", "-2500");
    records.push(FinancialRecord::new("bonus", "Bonus", "750", "bonus", "2024-06-20"));
    let forward = entries_of(&records);
    let mut backward = forward.clone();
    backward.reverse();

    let engine = AnalyticsEngine::default();
    let a = engine.aggregate(&forward, reference());
    let b = engine.aggregate(&backward, reference());

    assert_eq!(a, b);
    assert_eq!(a.len(), 12);
    assert!((a[5].income - 4750.0).abs() < 1e-9);
}

#[test]
fn test_empty_input_synthesizes_default_bucket() -> anyhow::Result<()> {
    let request = AnalysisRequest::new(vec![])
        .with_reference_date(NaiveDate::from_ymd_opt(2024, 7, 14).unwrap())
        .with_horizon(3)
        .with_seed(5);
    let report = analyze_records(&request)?;

    assert_eq!(report.forecast.historical.len(), 1);
    let bucket = &report.forecast.historical[0];
    assert_eq!(bucket.month, NaiveDate::from_ymd_opt(2024, 7, 31).unwrap());
    assert!((bucket.income - 1000.0).abs() < 1e-9);
    assert!((bucket.expenses - 800.0).abs() < 1e-9);
    assert!((bucket.confidence - 0.3).abs() < 1e-9);
    assert_eq!(report.forecast.forecast.len(), 3);
    assert!(report.insights.is_empty());
    Ok(())
}

#[test]
fn test_horizon_contract() {
    assert!(validate_horizon(-1, 60).is_err());
    assert!(validate_horizon(61, 60).is_err());
    assert_eq!(validate_horizon(0, 60).unwrap(), 0);
    assert_eq!(validate_horizon(60, 60).unwrap(), 60);

    let request = AnalysisRequest::new(household_year("10", "-5")).with_horizon(-3);
    assert!(matches!(
        analyze_records(&request),
        Err(AnalyticsError::InvalidHorizon { months: -3, max: 60 })
    ));
}

#[test]
fn test_unusable_records_are_skipped() -> anyhow::Result<()> {
    let mut records = household_year("5000", "-3000");
    records.push(FinancialRecord::new("no-amount", "???", "n/a", "expense", "2024-04-04"));
    records.push(FinancialRecord::new("no-date", "Lunch", "-12", "food", "someday"));

    let report = analyze_records(
        &AnalysisRequest::new(records)
            .with_reference_date(reference())
            .with_seed(9),
    )?;

    let mut skipped: Vec<_> = report.issues.iter().map(|i| i.record_id.as_str()).collect();
    skipped.sort();
    assert_eq!(skipped, vec!["no-amount", "no-date"]);
    assert_eq!(report.forecast.historical.len(), 12);
    Ok(())
}

#[test]
fn test_duplicate_settlement_is_suspected() {
    let records = vec![
        FinancialRecord::new("1", "Groceries", "-82.10", "food", "2024-03-01"),
        FinancialRecord::new("2", "Gym", "-40", "fitness", "2024-03-02"),
        FinancialRecord::new("3", "groceries", "-82.10", "food", "2024-03-02"),
        FinancialRecord::new("4", "Groceries", "-82.10", "food", "2024-03-02")
            .with_kind(RecordKind::Correction),
    ];
    let entries = entries_of(&records);
    let anomalies = AnalyticsEngine::default().detect_anomalies(&entries, EntityContext::Individual, reference());

    let duplicates: Vec<_> = anomalies
        .iter()
        .filter(|a| a.anomaly_type == AnomalyType::DuplicateSuspicion)
        .map(|a| a.record_id.as_str())
        .collect();
    assert_eq!(duplicates, vec!["3"]);
}

#[test]
fn test_high_risk_household_gets_ranked_insights() -> anyhow::Result<()> {
    let mut records: Vec<FinancialRecord> = (1..=6)
        .flat_map(|month| {
            let date = format!("2024-{:02}-10", month);
            vec![
                FinancialRecord::new(format!("in-{}", month), "Wages", "2000", "income", date.clone()),
                FinancialRecord::new(
                    format!("out-{}", month),
                    "Bills",
                    format!("-{}", 1800 + 100 * month).as_str(),
                    "expense",
                    date,
                ),
            ]
        })
        .collect();
    records.push(FinancialRecord::new("loan", "Car loan", "9000", "liability", "2024-01-15"));

    let report = analyze_records(
        &AnalysisRequest::new(records)
            .with_reference_date(reference())
            .with_seed(21),
    )?;

    assert_eq!(report.health.risk_level, RiskLevel::High);
    assert!(!report.insights.is_empty());
    assert_eq!(report.insights[0].insight_type, InsightType::Risk);
    assert!(report
        .insights
        .iter()
        .any(|i| i.insight_type == InsightType::Trend && i.category.as_deref() == Some("expense")));
    assert!(report
        .insights
        .windows(2)
        .all(|w| w[0].severity >= w[1].severity));
    Ok(())
}

#[test]
fn test_config_from_partial_json() -> anyhow::Result<()> {
    let config = AnalyticsConfig::from_json_str(r#"{"forecast": {"default_horizon": 3}}"#)?;
    assert_eq!(config.forecast.default_horizon, 3);
    assert_eq!(config.forecast.max_horizon, 60);

    let report = analyze_with_config(
        config,
        &AnalysisRequest::new(household_year("3000", "-2000"))
            .with_reference_date(reference())
            .with_seed(1),
    )?;
    assert_eq!(report.forecast.forecast.len(), 3);

    assert!(AnalyticsConfig::from_json_str(r#"{"forecast": {"clamp_min_multiple": 3.0}}"#).is_err());
    Ok(())
}

#[test]
fn test_schema_generation() -> anyhow::Result<()> {
    let schema = AnalyticsConfig::schema_as_json()?;
    assert!(schema.contains("autocorrelation"));
    assert!(schema.contains("organization_defaults"));
    Ok(())
}
