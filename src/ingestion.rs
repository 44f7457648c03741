use crate::schema::{EntityContext, FinancialRecord, LedgerEntry, RawAmount, RecordKind};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A record skipped during normalization and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizationReport {
    pub entries: Vec<LedgerEntry>,
    pub issues: Vec<RecordIssue>,
}

/// Converts raw records into strict entries. Unusable records are skipped
/// with a warning and reported in `issues`; they never abort the batch.
pub fn normalize_records(records: &[FinancialRecord]) -> NormalizationReport {
    let mut report = NormalizationReport::default();

    for record in records {
        match normalize_record(record) {
            Ok(entry) => report.entries.push(entry),
            Err(issue) => {
                warn!("Skipping record {}: {}", issue.record_id, issue.reason);
                report.issues.push(issue);
            }
        }
    }

    debug!(
        "Normalized {} of {} records ({} skipped)",
        report.entries.len(),
        records.len(),
        report.issues.len()
    );
    report
}

pub fn normalize_record(record: &FinancialRecord) -> Result<LedgerEntry, RecordIssue> {
    let issue = |reason: String| RecordIssue {
        record_id: record.id.clone(),
        reason,
    };

    if record.kind == RecordKind::Unknown {
        return Err(issue("unrecognized record status".to_string()));
    }
    if record.category.trim().is_empty() {
        return Err(issue("missing category".to_string()));
    }

    let amount = parse_amount(&record.amount)
        .ok_or_else(|| issue(format!("unparsable amount {:?}", record.amount)))?;

    let date = parse_record_date(&record.date, record.timestamp).ok_or_else(|| {
        issue(format!(
            "unparsable date '{}' (timestamp {:?})",
            record.date, record.timestamp
        ))
    })?;

    Ok(LedgerEntry {
        id: record.id.clone(),
        description: record.description.trim().to_string(),
        amount,
        category: normalize_category(&record.category),
        date,
        kind: record.kind,
        notes: record.notes.clone(),
        settlement_hash: record.settlement_hash.clone(),
    })
}

pub fn normalize_category(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Accepts plain numbers and text such as "-1,250.50", "$300" or "(75.00)".
pub fn parse_amount(amount: &RawAmount) -> Option<f64> {
    let value = match amount {
        RawAmount::Number(n) => *n,
        RawAmount::Text(text) => {
            let trimmed = text.trim();
            let (negated, body) = match trimmed
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
            {
                Some(inner) => (true, inner),
                None => (false, trimmed),
            };
            let cleaned: String = body
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' ' | '_'))
                .collect();
            let parsed = cleaned.parse::<f64>().ok()?;
            if negated {
                -parsed
            } else {
                parsed
            }
        }
        RawAmount::Other(_) => return None,
    };

    value.is_finite().then_some(value)
}

/// Prefers the epoch-millisecond timestamp; falls back to the date string.
pub fn parse_record_date(date: &str, timestamp_ms: Option<i64>) -> Option<NaiveDate> {
    if let Some(dt) = timestamp_ms.and_then(DateTime::from_timestamp_millis) {
        return Some(dt.date_naive());
    }

    let text = date.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(text, "%m/%d/%Y").ok()
}

/// Accounting class a category label resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerClass {
    Income,
    Expense,
    Asset,
    Liability,
    Equity,
    Other,
}

const INDIVIDUAL_CORE: &[&str] = &["income", "expense", "asset", "liability"];

const ORGANIZATION_CORE: &[&str] = &[
    "revenue",
    "cost",
    "asset",
    "liability",
    "equity",
    "investment",
    "operational_expense",
    "capital_expense",
];

const INDIVIDUAL_TERMS: &[(LedgerClass, &[&str])] = &[
    (LedgerClass::Income, &["income"]),
    (LedgerClass::Expense, &["expense"]),
    (LedgerClass::Asset, &["asset"]),
    (LedgerClass::Liability, &["liability"]),
    (LedgerClass::Equity, &["equity"]),
];

const ORGANIZATION_TERMS: &[(LedgerClass, &[&str])] = &[
    (LedgerClass::Income, &["revenue", "income", "sales", "earnings"]),
    (
        LedgerClass::Expense,
        &[
            "cost",
            "expense",
            "expenditure",
            "operational_expense",
            "capital_expense",
            "cogs",
            "payroll",
        ],
    ),
    (
        LedgerClass::Asset,
        &["asset", "cash", "receivable", "inventory", "investment"],
    ),
    (LedgerClass::Liability, &["liability", "debt", "loan", "payable"]),
    (LedgerClass::Equity, &["equity", "capital"]),
];

/// Categories treated leniently by anomaly detection and always eligible for trend insights.
pub fn core_categories(context: EntityContext) -> &'static [&'static str] {
    match context {
        EntityContext::Individual => INDIVIDUAL_CORE,
        EntityContext::Organization => ORGANIZATION_CORE,
    }
}

pub fn is_core_category(context: EntityContext, category: &str) -> bool {
    core_categories(context).contains(&category)
}

/// Category-to-class table built once per snapshot.
///
/// Individuals match exact labels only. Organizations resolve through a
/// synonym table: an exact synonym wins, otherwise the first class with a
/// synonym contained in the label. Labels containing synonyms of several
/// classes are logged, since substring matching cannot tell them apart.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    context: EntityContext,
    classes: HashMap<String, LedgerClass>,
}

impl CategoryResolver {
    pub fn build(context: EntityContext, entries: &[LedgerEntry]) -> Self {
        let mut classes = HashMap::new();
        for entry in entries {
            if !classes.contains_key(&entry.category) {
                let class = resolve_label(context, &entry.category);
                classes.insert(entry.category.clone(), class);
            }
        }
        Self { context, classes }
    }

    pub fn context(&self) -> EntityContext {
        self.context
    }

    pub fn class_of(&self, category: &str) -> LedgerClass {
        self.classes
            .get(category)
            .copied()
            .unwrap_or_else(|| resolve_label(self.context, category))
    }
}

fn resolve_label(context: EntityContext, label: &str) -> LedgerClass {
    let table = match context {
        EntityContext::Individual => INDIVIDUAL_TERMS,
        EntityContext::Organization => ORGANIZATION_TERMS,
    };

    for (class, terms) in table {
        if terms.contains(&label) {
            return *class;
        }
    }

    if context == EntityContext::Individual {
        return LedgerClass::Other;
    }

    let matches: Vec<LedgerClass> = table
        .iter()
        .filter(|(_, terms)| terms.iter().any(|t| label.contains(t)))
        .map(|(class, _)| *class)
        .collect();

    if matches.len() > 1 {
        warn!(
            "Category '{}' matches several classes {:?}; using {:?}",
            label, matches, matches[0]
        );
    }

    matches.first().copied().unwrap_or(LedgerClass::Other)
}
