use crate::config::AnomalyConfig;
use crate::ingestion::is_core_category;
use crate::schema::{AnomalyDetection, AnomalyType, EntityContext, LedgerEntry, RecordKind};
use crate::utils::{mean, std_dev};
use chrono::{Duration, NaiveDate};
use log::debug;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Copy)]
struct CategoryStats {
    mean: f64,
    std_dev: f64,
    count: usize,
}

/// Flags individual records whose amount, category, date or repetition is
/// out of line with the rest of the snapshot.
pub struct AnomalyDetector<'a> {
    config: &'a AnomalyConfig,
    context: EntityContext,
}

impl<'a> AnomalyDetector<'a> {
    pub fn new(config: &'a AnomalyConfig, context: EntityContext) -> Self {
        Self { config, context }
    }

    pub fn detect(&self, entries: &[LedgerEntry], reference: NaiveDate) -> Vec<AnomalyDetection> {
        if entries.len() < self.config.min_records {
            return Vec::new();
        }

        let stats = category_stats(entries);
        let mut anomalies = Vec::new();

        anomalies.extend(self.unusual_amounts(entries, &stats));
        anomalies.extend(self.unusual_categories(entries, &stats));
        anomalies.extend(self.duplicate_suspicions(entries));
        anomalies.extend(self.unusual_timing(entries, reference));

        debug!(
            "Detected {} anomalies across {} records in {} categories",
            anomalies.len(),
            entries.len(),
            stats.len()
        );
        anomalies
    }

    /// Standard-deviation threshold for a category with `count` samples.
    pub fn threshold_for(&self, category: &str, count: usize) -> f64 {
        let cfg = self.config;
        if is_core_category(self.context, category) && count < cfg.core_sample_limit {
            cfg.core_threshold
        } else if count < cfg.sparse_sample_limit {
            cfg.sparse_threshold
        } else if count > cfg.dense_sample_limit {
            cfg.dense_threshold
        } else {
            cfg.default_threshold
        }
    }

    fn unusual_amounts(
        &self,
        entries: &[LedgerEntry],
        stats: &BTreeMap<&str, CategoryStats>,
    ) -> Vec<AnomalyDetection> {
        let cfg = self.config;
        let mut found = Vec::new();

        for entry in entries {
            let Some(s) = stats.get(entry.category.as_str()) else {
                continue;
            };
            if s.std_dev < 1e-9 {
                continue;
            }

            let deviation = (entry.amount - s.mean).abs() / s.std_dev;
            let threshold = self.threshold_for(&entry.category, s.count);
            if deviation <= threshold {
                continue;
            }

            let confidence = (cfg.base_confidence + (deviation - threshold) * cfg.confidence_slope)
                .min(cfg.max_confidence)
                .clamp(0.0, 1.0);

            found.push(AnomalyDetection {
                record_id: entry.id.clone(),
                anomaly_type: AnomalyType::UnusualAmount,
                confidence,
                explanation: format!(
                    "{} of {:.2} is {:.1} standard deviations from the '{}' average of {:.2}",
                    describe(entry),
                    entry.amount,
                    deviation,
                    entry.category,
                    s.mean
                ),
                suggested_action: Some(
                    "Verify the amount against the source document or receipt".to_string(),
                ),
            });
        }

        found
    }

    fn unusual_categories(
        &self,
        entries: &[LedgerEntry],
        stats: &BTreeMap<&str, CategoryStats>,
    ) -> Vec<AnomalyDetection> {
        let cfg = self.config;
        let total = entries.len();
        let mut found = Vec::new();

        for entry in entries {
            let Some(s) = stats.get(entry.category.as_str()) else {
                continue;
            };
            let core = is_core_category(self.context, &entry.category);

            if !core && s.count == 1 {
                found.push(AnomalyDetection {
                    record_id: entry.id.clone(),
                    anomaly_type: AnomalyType::UnusualCategory,
                    confidence: cfg.rare_category_confidence,
                    explanation: format!(
                        "'{}' is the only record in category '{}'",
                        describe(entry),
                        entry.category
                    ),
                    suggested_action: Some(
                        "Confirm the category or merge it into an existing one".to_string(),
                    ),
                });
            } else if core
                && total > cfg.underrepresented_min_records
                && (s.count as f64 / total as f64) < cfg.underrepresented_share
            {
                found.push(AnomalyDetection {
                    record_id: entry.id.clone(),
                    anomaly_type: AnomalyType::UnusualCategory,
                    confidence: cfg.underrepresented_confidence,
                    explanation: format!(
                        "Category '{}' accounts for only {} of {} records",
                        entry.category, s.count, total
                    ),
                    suggested_action: None,
                });
            }
        }

        found
    }

    /// Flags the later of two original records with the same category,
    /// description and amount within the duplicate window.
    fn duplicate_suspicions(&self, entries: &[LedgerEntry]) -> Vec<AnomalyDetection> {
        let window = Duration::days(self.config.duplicate_window_days);

        let mut originals: Vec<&LedgerEntry> = entries
            .iter()
            .filter(|e| e.kind == RecordKind::Original && !e.description.is_empty())
            .collect();
        originals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let mut flagged: HashSet<usize> = HashSet::new();
        let mut found = Vec::new();

        for i in 0..originals.len() {
            let first = originals[i];
            for (j, second) in originals.iter().enumerate().skip(i + 1) {
                if second.date - first.date > window {
                    break;
                }
                if flagged.contains(&j) || !same_transaction(first, second) {
                    continue;
                }

                flagged.insert(j);
                found.push(AnomalyDetection {
                    record_id: second.id.clone(),
                    anomaly_type: AnomalyType::DuplicateSuspicion,
                    confidence: self.config.duplicate_confidence,
                    explanation: format!(
                        "'{}' for {:.2} on {} repeats record {} from {}",
                        second.description, second.amount, second.date, first.id, first.date
                    ),
                    suggested_action: Some(
                        "Check whether this transaction was recorded twice".to_string(),
                    ),
                });
            }
        }

        found
    }

    fn unusual_timing(&self, entries: &[LedgerEntry], reference: NaiveDate) -> Vec<AnomalyDetection> {
        let limit = reference + Duration::days(self.config.future_tolerance_days);

        entries
            .iter()
            .filter(|e| e.date > limit)
            .map(|e| AnomalyDetection {
                record_id: e.id.clone(),
                anomaly_type: AnomalyType::UnusualTiming,
                confidence: self.config.timing_confidence,
                explanation: format!(
                    "{} is dated {}, after the analysis date {}",
                    describe(e),
                    e.date,
                    reference
                ),
                suggested_action: Some("Confirm the transaction date".to_string()),
            })
            .collect()
    }
}

fn category_stats(entries: &[LedgerEntry]) -> BTreeMap<&str, CategoryStats> {
    let mut amounts: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        amounts
            .entry(entry.category.as_str())
            .or_default()
            .push(entry.amount);
    }

    amounts
        .into_iter()
        .map(|(category, values)| {
            (
                category,
                CategoryStats {
                    mean: mean(&values),
                    std_dev: std_dev(&values),
                    count: values.len(),
                },
            )
        })
        .collect()
}

fn same_transaction(a: &LedgerEntry, b: &LedgerEntry) -> bool {
    a.category == b.category
        && (a.amount - b.amount).abs() < 0.005
        && a.description.eq_ignore_ascii_case(&b.description)
}

fn describe(entry: &LedgerEntry) -> String {
    if entry.description.is_empty() {
        format!("Record {}", entry.id)
    } else {
        format!("'{}'", entry.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, desc: &str, amount: f64, category: &str, day: u32) -> LedgerEntry {
        LedgerEntry {
            id: id.to_string(),
            description: desc.to_string(),
            amount,
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            kind: RecordKind::Original,
            notes: None,
            settlement_hash: None,
        }
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_too_few_records() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let entries = vec![entry("1", "a", 10.0, "food", 1), entry("2", "b", 9000.0, "food", 2)];
        assert!(detector.detect(&entries, reference()).is_empty());
    }

    #[test]
    fn test_threshold_selection() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        assert_eq!(detector.threshold_for("income", 2), 4.0);
        assert_eq!(detector.threshold_for("dining", 2), 3.0);
        assert_eq!(detector.threshold_for("dining", 10), 2.0);
        assert_eq!(detector.threshold_for("dining", 21), 1.5);
        assert_eq!(detector.threshold_for("income", 4), 3.0);

        let org = AnomalyDetector::new(&config, EntityContext::Organization);
        assert_eq!(org.threshold_for("capital_expense", 1), 4.0);
        assert_eq!(org.threshold_for("income", 1), 3.0);
    }

    #[test]
    fn test_outlier_is_flagged() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let mut entries: Vec<LedgerEntry> = (1..=10)
            .map(|d| {
                let amount = if d % 2 == 0 { 95.0 } else { 105.0 };
                entry(&d.to_string(), &format!("Lunch {}", d), amount, "dining", d)
            })
            .collect();
        entries.push(entry("big", "Banquet", 1000.0, "dining", 15));

        let anomalies = detector.detect(&entries, reference());
        let amount_flags: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::UnusualAmount)
            .collect();
        assert_eq!(amount_flags.len(), 1);
        assert_eq!(amount_flags[0].record_id, "big");
        assert!(amount_flags[0].confidence > 0.6);
        assert!(amount_flags[0].confidence <= 0.9);
    }

    #[test]
    fn test_identical_amounts_never_flagged() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let entries: Vec<LedgerEntry> = (1..=6)
            .map(|d| entry(&d.to_string(), &format!("Rent {}", d), -1200.0, "expense", d))
            .collect();
        assert!(detector.detect(&entries, reference()).is_empty());
    }

    #[test]
    fn test_rare_non_core_category() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let entries = vec![
            entry("1", "Pay", 3000.0, "income", 1),
            entry("2", "Pay", 3000.0, "income", 15),
            entry("3", "Gym", -40.0, "expense", 3),
            entry("4", "Yacht", -400.0, "boats", 9),
        ];
        let anomalies = detector.detect(&entries, reference());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].record_id, "4");
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::UnusualCategory);
        assert_eq!(anomalies[0].confidence, 0.7);
    }

    #[test]
    fn test_underrepresented_core_category() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let mut entries: Vec<LedgerEntry> = (1..=24)
            .map(|d| entry(&d.to_string(), &format!("Spend {}", d), -50.0, "expense", d))
            .collect();
        entries.push(entry("inc", "Bonus", 900.0, "income", 25));

        let anomalies = detector.detect(&entries, reference());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].record_id, "inc");
        assert_eq!(anomalies[0].confidence, 0.5);
    }

    #[test]
    fn test_duplicate_suspicion() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let entries = vec![
            entry("1", "Netflix", -15.99, "expense", 5),
            entry("2", "netflix", -15.99, "expense", 5),
            entry("3", "Netflix", -15.99, "expense", 20),
        ];
        let anomalies = detector.detect(&entries, reference());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::DuplicateSuspicion);
        assert_eq!(anomalies[0].record_id, "2");
    }

    #[test]
    fn test_corrections_are_not_duplicates() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let mut correction = entry("2", "Netflix", -15.99, "expense", 5);
        correction.kind = RecordKind::Correction;
        let entries = vec![
            entry("1", "Netflix", -15.99, "expense", 5),
            correction,
            entry("3", "Rent", -900.0, "expense", 1),
        ];
        assert!(detector
            .detect(&entries, reference())
            .iter()
            .all(|a| a.anomaly_type != AnomalyType::DuplicateSuspicion));
    }

    #[test]
    fn test_future_dated_record() {
        let config = AnomalyConfig::default();
        let detector = AnomalyDetector::new(&config, EntityContext::Individual);
        let entries = vec![
            entry("1", "Salary", 3000.0, "income", 1),
            entry("2", "Bonus", 3000.0, "income", 2),
            entry("3", "Refund", 3000.0, "income", 30),
        ];
        let early = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let anomalies = detector.detect(&entries, early);
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::UnusualTiming);
        assert_eq!(anomalies[0].record_id, "3");
    }
}
