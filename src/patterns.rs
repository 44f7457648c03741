use crate::config::PatternConfig;
use crate::schema::{LedgerEntry, SpendingPattern, TrendDirection};
use crate::utils::{mean, safe_div};
use std::collections::BTreeMap;

/// Per-category average, frequency and direction, ordered by category name.
///
/// Amounts are compared by magnitude, so a category of growing outflows
/// reads as increasing regardless of sign convention.
pub fn analyze_spending_patterns(
    entries: &[LedgerEntry],
    config: &PatternConfig,
) -> Vec<SpendingPattern> {
    if entries.len() < config.min_records {
        return Vec::new();
    }

    let mut by_category: BTreeMap<&str, Vec<&LedgerEntry>> = BTreeMap::new();
    for entry in entries {
        by_category.entry(entry.category.as_str()).or_default().push(entry);
    }

    by_category
        .into_iter()
        .filter_map(|(category, mut group)| {
            group.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            let amounts: Vec<f64> = group.iter().map(|e| e.amount.abs()).collect();
            let last_occurrence = group.last()?.date;

            Some(SpendingPattern {
                category: category.to_string(),
                average_amount: mean(&amounts),
                frequency: amounts.len(),
                trend: category_trend(&amounts, config),
                last_occurrence,
            })
        })
        .collect()
}

/// Compares the mean of the most recent window against the earliest one.
/// `amounts` must be in chronological order.
fn category_trend(amounts: &[f64], config: &PatternConfig) -> TrendDirection {
    let window = config.trend_window;
    if amounts.len() < window {
        return TrendDirection::Stable;
    }

    let early = mean(&amounts[..window]);
    let recent = mean(&amounts[amounts.len() - window..]);
    let change = safe_div(recent - early, early.abs());

    if change > config.change_threshold {
        TrendDirection::Increasing
    } else if change < -config.change_threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}
