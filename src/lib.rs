//! # Ledger Analytics
//!
//! A library for turning a snapshot of ledger transactions into forward-looking
//! forecasts, flagged anomalies, spending patterns, risk-scored health metrics
//! and actionable insights.
//!
//! ## Core Concepts
//!
//! - **Raw records**: loosely-typed dashboard records (string or numeric amounts, mixed date formats)
//!   that are normalized exactly once into strict [`LedgerEntry`] values
//! - **Monthly buckets**: entries aggregated into month-end [`ForecastPoint`]s with data-quality confidence
//! - **Forecast**: trend, seasonality and volatility feed an autocorrelated projection whose values
//!   stay within a fixed band around the last actual month
//! - **Entity context**: individual and organization ledgers use different category vocabularies
//!   and risk models
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_analytics::*;
//!
//! let records = vec![
//!     FinancialRecord::new("1", "Salary", "5000", "income", "2024-01-31"),
//!     FinancialRecord::new("2", "Rent", "-1500", "expense", "2024-01-03"),
//! ];
//!
//! let engine = AnalyticsEngine::default();
//! let report = engine.analyze(&AnalysisRequest::new(records).with_horizon(6))?;
//! println!("Risk level: {}", report.health.risk_level);
//! ```

pub mod aggregation;
pub mod anomaly;
pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod ingestion;
pub mod insights;
pub mod patterns;
pub mod schema;
pub mod seasonality;
pub mod trend;
pub mod utils;
pub mod volatility;

pub use aggregation::RecordAggregator;
pub use anomaly::AnomalyDetector;
pub use config::AnalyticsConfig;
pub use engine::{predict_cash_flow, ForecastEngine, GaussianNoise, NoNoise, NoiseSource};
pub use error::{AnalyticsError, Result};
pub use health::{reconcile_risk, FinancialHealthAssessor, LedgerTotals};
pub use ingestion::{normalize_records, CategoryResolver, NormalizationReport, RecordIssue};
pub use insights::InsightGenerator;
pub use patterns::analyze_spending_patterns;
pub use schema::*;
pub use seasonality::{SeasonalFactors, SeasonalityProfile};

use chrono::{NaiveDate, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// One analysis run over one snapshot of records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub records: Vec<FinancialRecord>,
    #[serde(default)]
    pub context: EntityContext,
    /// Months to project; `forecast.default_horizon` when absent.
    #[serde(default)]
    pub horizon: Option<i64>,
    /// Date used for the empty-input bucket and future-dated checks; today when absent.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
    /// Seeds forecast noise for reproducible output.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl AnalysisRequest {
    pub fn new(records: Vec<FinancialRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: EntityContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_horizon(mut self, months: i64) -> Self {
        self.horizon = Some(months);
        self
    }

    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub forecast: TimeSeriesForecast,
    pub cash_flow: Vec<CashFlowPrediction>,
    pub insights: Vec<AiInsight>,
    pub health: FinancialHealth,
    pub patterns: Vec<SpendingPattern>,
    pub anomalies: Vec<AnomalyDetection>,
    /// Records skipped during normalization.
    pub issues: Vec<RecordIssue>,
}

impl AnalysisReport {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Entry point tying the pipeline stages to one validated configuration.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn normalize(&self, records: &[FinancialRecord]) -> NormalizationReport {
        normalize_records(records)
    }

    pub fn aggregate(&self, entries: &[LedgerEntry], reference: NaiveDate) -> Vec<ForecastPoint> {
        RecordAggregator::new(&self.config.aggregation).aggregate(entries, reference)
    }

    pub fn forecast(
        &self,
        history: Vec<ForecastPoint>,
        months: i64,
        noise: &mut dyn NoiseSource,
    ) -> Result<TimeSeriesForecast> {
        let horizon = engine::validate_horizon(months, self.config.forecast.max_horizon)?;
        ForecastEngine::new(&self.config).forecast(history, horizon, noise)
    }

    pub fn detect_anomalies(
        &self,
        entries: &[LedgerEntry],
        context: EntityContext,
        reference: NaiveDate,
    ) -> Vec<AnomalyDetection> {
        AnomalyDetector::new(&self.config.anomaly, context).detect(entries, reference)
    }

    pub fn analyze_spending_patterns(&self, entries: &[LedgerEntry]) -> Vec<SpendingPattern> {
        analyze_spending_patterns(entries, &self.config.patterns)
    }

    pub fn assess_health(&self, entries: &[LedgerEntry], context: EntityContext) -> FinancialHealth {
        FinancialHealthAssessor::new(&self.config.health).assess(entries, context)
    }

    pub fn generate_insights(
        &self,
        entries: &[LedgerEntry],
        anomalies: &[AnomalyDetection],
        patterns: &[SpendingPattern],
        health: &FinancialHealth,
    ) -> Vec<AiInsight> {
        InsightGenerator::new(&self.config.insights).generate(entries, anomalies, patterns, health)
    }

    pub fn predict_cash_flow(&self, forecast: &TimeSeriesForecast) -> Vec<CashFlowPrediction> {
        predict_cash_flow(forecast)
    }

    /// Runs the whole pipeline over one normalized snapshot.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let months = request
            .horizon
            .unwrap_or(self.config.forecast.default_horizon as i64);
        engine::validate_horizon(months, self.config.forecast.max_horizon)?;

        let reference = request
            .reference_date
            .unwrap_or_else(|| Utc::now().date_naive());

        info!(
            "Analyzing {} records ({} context, {} month horizon)",
            request.records.len(),
            request.context,
            months
        );

        let NormalizationReport { entries, issues } = self.normalize(&request.records);

        let history = self.aggregate(&entries, reference);
        debug!("Aggregated into {} monthly buckets", history.len());

        let forecast = match request.seed {
            Some(seed) => self.forecast(history, months, &mut GaussianNoise::seeded(seed))?,
            None => self.forecast(history, months, &mut GaussianNoise::from_entropy())?,
        };
        let cash_flow = self.predict_cash_flow(&forecast);

        let anomalies = self.detect_anomalies(&entries, request.context, reference);
        let patterns = self.analyze_spending_patterns(&entries);
        let health = self.assess_health(&entries, request.context);
        let insights = self.generate_insights(&entries, &anomalies, &patterns, &health);

        info!(
            "Analysis complete: {} anomalies, {} patterns, {} insights, risk {}",
            anomalies.len(),
            patterns.len(),
            insights.len(),
            health.risk_level
        );

        Ok(AnalysisReport {
            forecast,
            cash_flow,
            insights,
            health,
            patterns,
            anomalies,
            issues,
        })
    }
}

pub fn analyze_records(request: &AnalysisRequest) -> Result<AnalysisReport> {
    AnalyticsEngine::default().analyze(request)
}

pub fn analyze_with_config(
    config: AnalyticsConfig,
    request: &AnalysisRequest,
) -> Result<AnalysisReport> {
    AnalyticsEngine::new(config)?.analyze(request)
}
