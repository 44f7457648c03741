use chrono::NaiveDate;
use ledger_analytics::*;
use std::error::Error;

fn sample_records() -> Vec<FinancialRecord> {
    let mut records = Vec::new();

    for month in 1..=12u32 {
        let date = format!("2024-{:02}-01", month);
        records.push(FinancialRecord::new(
            format!("salary-{}", month),
            "Salary",
            "$4,800.00",
            "income",
            date.clone(),
        ));
        records.push(FinancialRecord::new(
            format!("rent-{}", month),
            "Rent",
            -1650.0,
            "expense",
            format!("2024-{:02}-03", month),
        ));
        // Groceries creep upwards through the year
        records.push(FinancialRecord::new(
            format!("food-{}", month),
            format!("Groceries week {}", month),
            -(380.0 + 18.0 * month as f64),
            "groceries",
            format!("2024-{:02}-12", month),
        ));
    }

    records.push(FinancialRecord::new("tv", "New television", "(2,400)", "groceries", "2024-11-28"));
    records.push(FinancialRecord::new("rent-dup", "Rent", -1650.0, "expense", "2024-06-04"));
    records.push(FinancialRecord::new("card", "Credit card balance", 3200.0, "liability", "2024-12-01"));
    records.push(
        FinancialRecord::new("fix", "Rent", -1600.0, "expense", "2024-06-04")
            .with_kind(RecordKind::Correction),
    );
    records.push(FinancialRecord::new("broken", "Imported row", "N/A", "expense", "2024-07-07"));

    records
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("📊 Ledger Analytics Dashboard Demo\n");

    let request = AnalysisRequest::new(sample_records())
        .with_context(EntityContext::Individual)
        .with_horizon(6)
        .with_reference_date(NaiveDate::from_ymd_opt(2024, 12, 31).ok_or("bad date")?)
        .with_seed(2024);

    let engine = AnalyticsEngine::default();
    let report = engine.analyze(&request)?;

    if !report.issues.is_empty() {
        println!("⚠️  Skipped records:");
        for issue in &report.issues {
            println!("  {}: {}", issue.record_id, issue.reason);
        }
        println!();
    }

    println!(
        "📈 Forecast (trend {}, seasonality {:?}, accuracy {:.0}%):",
        report.forecast.trend,
        report.forecast.seasonality,
        report.forecast.accuracy * 100.0
    );
    for (prediction, point) in report.cash_flow.iter().zip(&report.forecast.forecast) {
        println!(
            "  {}: income ${:>9.2}  expenses ${:>9.2}  net ${:>9.2}  ({:.0}% confidence)",
            prediction.month_label,
            prediction.predicted_income,
            prediction.predicted_expenses,
            prediction.net_cash_flow,
            point.confidence * 100.0
        );
    }

    let health = &report.health;
    println!("\n🩺 Financial health:");
    println!("  Debt to income:     {:.2}", health.debt_to_income_ratio);
    println!("  Savings rate:       {:.1}%", health.savings_rate * 100.0);
    println!("  Spending efficiency {:.1}", health.spending_efficiency);
    println!("  Emergency fund:     {:?}", health.emergency_fund_status);
    println!("  Risk level:         {}", health.risk_level);

    println!("\n🧾 Spending patterns:");
    for pattern in &report.patterns {
        println!(
            "  {:<10} avg ${:>8.2} over {:>2} records, {} (last {})",
            pattern.category,
            pattern.average_amount,
            pattern.frequency,
            pattern.trend,
            pattern.last_occurrence
        );
    }

    println!("\n🚨 Anomalies:");
    for anomaly in &report.anomalies {
        println!(
            "  [{}] {} ({:.0}%): {}",
            anomaly.anomaly_type.as_str(),
            anomaly.record_id,
            anomaly.confidence * 100.0,
            anomaly.explanation
        );
    }

    println!("\n💡 Insights:");
    for insight in &report.insights {
        println!("  [{}] {}: {}", insight.severity, insight.title, insight.description);
        if let Some(action) = &insight.action {
            println!("      → {}", action);
        }
    }

    Ok(())
}
