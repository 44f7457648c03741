use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawAmount {
    #[schemars(description = "Signed numeric amount (negative for outflows)")]
    Number(f64),

    #[schemars(
        description = "Signed amount as text, e.g. \"-1,250.00\" or \"$300\". Parsed once at ingestion."
    )]
    Text(String),

    #[schemars(description = "Anything else (null, boolean, object). Reported as unparsable.")]
    Other(serde_json::Value),
}

impl Default for RawAmount {
    fn default() -> Self {
        RawAmount::Other(serde_json::Value::Null)
    }
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    #[serde(alias = "Original")]
    #[schemars(description = "First submission of a ledger entry")]
    Original,

    #[serde(alias = "Correction")]
    #[schemars(description = "A later entry restating fields of an original entry")]
    Correction,

    /// Any status label the ledger does not recognize
    #[serde(other)]
    Unknown,
}

/// Accepts string or integer ids (database row ids arrive as numbers).
fn loose_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(text)) => text,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A ledger record as supplied by the import/wallet layer.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinancialRecord {
    #[serde(default, deserialize_with = "loose_id")]
    #[schemars(description = "Stable identifier of the record")]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(description = "Free-text description (e.g. 'Office rent March')")]
    pub description: String,

    #[serde(default)]
    #[schemars(description = "Signed amount, either numeric or text")]
    pub amount: RawAmount,

    #[schemars(
        description = "Open category label. 'income', 'expense', 'asset' and 'liability' are core categories for individuals."
    )]
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(description = "Date string, YYYY-MM-DD preferred")]
    pub date: String,

    #[serde(default)]
    #[schemars(description = "Unix epoch milliseconds. Takes precedence over `date` when present.")]
    pub timestamp: Option<i64>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default, alias = "status", deserialize_with = "null_as_default")]
    pub kind: RecordKind,

    #[serde(default, alias = "transactionHash")]
    #[schemars(description = "Hash of the settlement transaction on the ledger, if anchored")]
    pub settlement_hash: Option<String>,
}

impl FinancialRecord {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        amount: impl Into<RawAmount>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            amount: amount.into(),
            category: category.into(),
            date: date.into(),
            timestamp: None,
            notes: None,
            kind: RecordKind::Original,
            settlement_hash: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(timestamp_ms);
        self
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Strict internal record produced once at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub description: String,
    pub amount: f64,
    /// Trimmed, lowercased category label
    pub category: String,
    pub date: NaiveDate,
    pub kind: RecordKind,
    pub notes: Option<String>,
    pub settlement_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityContext {
    #[default]
    Individual,
    Organization,
}

impl fmt::Display for EntityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityContext::Individual => write!(f, "individual"),
            EntityContext::Organization => write!(f, "organization"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    /// Month-end date identifying the bucket
    pub month: NaiveDate,
    pub income: f64,
    pub expenses: f64,
    pub net_cash_flow: f64,
    pub confidence: f64,
}

impl ForecastPoint {
    pub fn new(month: NaiveDate, income: f64, expenses: f64, confidence: f64) -> Self {
        Self {
            month,
            income,
            expenses,
            net_cash_flow: income - expenses,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Year-month key, e.g. "2024-03"
    pub fn month_key(&self) -> String {
        self.month.format("%Y-%m").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Stable => "stable",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Seasonality {
    None,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesForecast {
    pub historical: Vec<ForecastPoint>,
    pub forecast: Vec<ForecastPoint>,
    pub trend: TrendDirection,
    pub seasonality: Seasonality,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CashFlowPrediction {
    /// Display label, e.g. "Mar 2024"
    pub month_label: String,
    pub predicted_income: f64,
    pub predicted_expenses: f64,
    pub net_cash_flow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpendingPattern {
    pub category: String,
    pub average_amount: f64,
    pub frequency: usize,
    pub trend: TrendDirection,
    pub last_occurrence: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    UnusualAmount,
    UnusualCategory,
    UnusualTiming,
    DuplicateSuspicion,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::UnusualAmount => "unusual_amount",
            AnomalyType::UnusualCategory => "unusual_category",
            AnomalyType::UnusualTiming => "unusual_timing",
            AnomalyType::DuplicateSuspicion => "duplicate_suspicion",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnomalyType::UnusualAmount => "Unusual amount",
            AnomalyType::UnusualCategory => "Unusual category",
            AnomalyType::UnusualTiming => "Unusual timing",
            AnomalyType::DuplicateSuspicion => "Possible duplicate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnomalyDetection {
    pub record_id: String,
    pub anomaly_type: AnomalyType,
    pub confidence: f64,
    pub explanation: String,
    pub suggested_action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyFundStatus {
    Good,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrganizationMetrics {
    /// Assets over liabilities
    pub cash_flow_ratio: f64,
    pub working_capital_ratio: f64,
    /// Percent of revenue
    pub profit_margin: f64,
    /// Percent of revenue
    pub expense_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialHealth {
    pub debt_to_income_ratio: f64,
    pub savings_rate: f64,
    pub emergency_fund_status: EmergencyFundStatus,
    pub spending_efficiency: f64,
    pub risk_level: RiskLevel,
    pub context: EntityContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<OrganizationMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    Anomaly,
    Trend,
    Recommendation,
    Risk,
    Opportunity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsight {
    pub id: String,
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    pub actionable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<EntityContext>,
}
