use crate::config::AggregationConfig;
use crate::schema::{ForecastPoint, LedgerEntry};
use crate::utils::month_end_of;
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct MonthBucket {
    income: f64,
    expenses: f64,
    records: usize,
}

/// Buckets ledger entries into chronological monthly points.
pub struct RecordAggregator<'a> {
    config: &'a AggregationConfig,
}

impl<'a> RecordAggregator<'a> {
    pub fn new(config: &'a AggregationConfig) -> Self {
        Self { config }
    }

    /// Deterministic: identical entries always produce identical points.
    /// `reference` only dates the synthesized bucket used for empty input.
    pub fn aggregate(&self, entries: &[LedgerEntry], reference: NaiveDate) -> Vec<ForecastPoint> {
        if entries.is_empty() {
            debug!("No usable records; synthesizing a default bucket");
            return vec![ForecastPoint::new(
                month_end_of(reference),
                self.config.empty_income,
                self.config.empty_expenses,
                self.config.empty_confidence,
            )];
        }

        let mut buckets: BTreeMap<NaiveDate, MonthBucket> = BTreeMap::new();

        for entry in entries {
            let bucket = buckets.entry(month_end_of(entry.date)).or_default();
            bucket.records += 1;

            if is_income(entry) {
                bucket.income += entry.amount.abs();
            } else if is_expense(entry) {
                bucket.expenses += entry.amount.abs();
            }
        }

        debug!(
            "Aggregated {} records into {} monthly buckets",
            entries.len(),
            buckets.len()
        );

        buckets
            .into_iter()
            .map(|(month, bucket)| {
                ForecastPoint::new(
                    month,
                    bucket.income,
                    bucket.expenses,
                    self.bucket_confidence(bucket.records),
                )
            })
            .collect()
    }

    pub fn bucket_confidence(&self, records: usize) -> f64 {
        let raw = self.config.base_confidence
            + (records as f64 / 10.0) * self.config.confidence_per_ten_records;
        raw.min(self.config.max_confidence)
    }
}

fn is_income(entry: &LedgerEntry) -> bool {
    entry.category == "income" || (entry.category != "expense" && entry.amount > 0.0)
}

fn is_expense(entry: &LedgerEntry) -> bool {
    entry.category == "expense" || entry.amount < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RecordKind;

    fn entry(id: &str, amount: f64, category: &str, date: (i32, u32, u32)) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            description: String::new(),
            amount,
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            kind: RecordKind::Original,
            notes: None,
            settlement_hash: None,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn test_buckets_by_month() {
        let config = AggregationConfig::default();
        let entries = vec![
            entry("1", 5000.0, "income", (2024, 2, 1)),
            entry("2", 1200.0, "expense", (2024, 1, 5)),
            entry("3", -300.0, "groceries", (2024, 1, 20)),
            entry("4", 4000.0, "income", (2024, 1, 31)),
        ];

        let points = RecordAggregator::new(&config).aggregate(&entries, reference());
        assert_eq!(points.len(), 2);

        let jan = &points[0];
        assert_eq!(jan.month, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(jan.income, 4000.0);
        assert_eq!(jan.expenses, 1500.0);
        assert_eq!(jan.net_cash_flow, 2500.0);
        assert!((jan.confidence - 0.775).abs() < 1e-9);

        assert_eq!(points[1].income, 5000.0);
    }

    #[test]
    fn test_expense_category_with_positive_sign() {
        let config = AggregationConfig::default();
        let entries = vec![entry("1", 250.0, "expense", (2024, 3, 3))];
        let points = RecordAggregator::new(&config).aggregate(&entries, reference());
        assert_eq!(points[0].income, 0.0);
        assert_eq!(points[0].expenses, 250.0);
    }

    #[test]
    fn test_empty_input_synthesizes_one_bucket() {
        let config = AggregationConfig::default();
        let points = RecordAggregator::new(&config).aggregate(&[], reference());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].month, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert!(points[0].income > 0.0);
        assert!(points[0].expenses > 0.0);
    }

    #[test]
    fn test_confidence_caps() {
        let config = AggregationConfig::default();
        let aggregator = RecordAggregator::new(&config);
        assert!((aggregator.bucket_confidence(0) - 0.7).abs() < 1e-9);
        assert!((aggregator.bucket_confidence(4) - 0.8).abs() < 1e-9);
        assert_eq!(aggregator.bucket_confidence(50), 0.95);
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let config = AggregationConfig::default();
        let entries = vec![
            entry("1", 100.0, "income", (2024, 1, 1)),
            entry("2", -40.0, "expense", (2024, 2, 1)),
        ];
        let aggregator = RecordAggregator::new(&config);
        assert_eq!(
            aggregator.aggregate(&entries, reference()),
            aggregator.aggregate(&entries, reference())
        );
    }
}
