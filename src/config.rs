use crate::error::{AnalyticsError, Result};
use crate::seasonality::{validate_custom_factors, SeasonalityProfile};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable threshold of the analytics model.
///
/// Partial JSON is accepted: any missing section or field takes its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub aggregation: AggregationConfig,
    pub trend: TrendConfig,
    pub seasonality: SeasonalityConfig,
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub patterns: PatternConfig,
    pub health: HealthConfig,
    pub insights: InsightConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AggregationConfig {
    #[schemars(description = "Bucket confidence before any record is counted")]
    pub base_confidence: f64,
    #[schemars(description = "Confidence added per ten records in a bucket")]
    pub confidence_per_ten_records: f64,
    pub max_confidence: f64,
    #[schemars(description = "Income of the synthesized bucket used when no record is usable")]
    pub empty_income: f64,
    #[schemars(description = "Expenses of the synthesized bucket used when no record is usable")]
    pub empty_expenses: f64,
    pub empty_confidence: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            base_confidence: 0.7,
            confidence_per_ten_records: 0.25,
            max_confidence: 0.95,
            empty_income: 1000.0,
            empty_expenses: 800.0,
            empty_confidence: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TrendConfig {
    #[schemars(description = "Absolute mean-normalized slope below which a series is stable")]
    pub stable_slope_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            stable_slope_threshold: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SeasonalityConfig {
    #[schemars(description = "History length required to compute factors from data")]
    pub min_history_months: usize,
    #[schemars(description = "Prior used when history is too short")]
    pub prior: SeasonalityProfile,
    #[schemars(description = "Factor spread (max - min) below which computed seasonality is reported as none")]
    pub min_spread: f64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            min_history_months: 12,
            prior: SeasonalityProfile::Business,
            min_spread: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ForecastConfig {
    pub default_horizon: usize,
    pub max_horizon: usize,
    #[schemars(description = "Weight of the previous month's level in the next projected value")]
    pub autocorrelation: f64,
    pub trend_dampening: f64,
    pub noise_scale: f64,
    pub clamp_min_multiple: f64,
    pub clamp_max_multiple: f64,
    pub volatility_floor: f64,
    pub base_confidence: f64,
    #[schemars(description = "Confidence removed per month of distance from the last actual")]
    pub distance_penalty: f64,
    pub volatility_penalty: f64,
    pub data_quality_bonus: f64,
    #[schemars(description = "History length at which the full data-quality bonus applies")]
    pub data_quality_months: usize,
    pub min_confidence: f64,
    pub max_confidence: f64,
    #[schemars(description = "Histories shorter than this use the sparse forecast variant")]
    pub sparse_history_points: usize,
    pub sparse_min_volatility: f64,
    pub sparse_noise_multiplier: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            default_horizon: 6,
            max_horizon: 60,
            autocorrelation: 0.65,
            trend_dampening: 0.5,
            noise_scale: 0.1,
            clamp_min_multiple: 0.5,
            clamp_max_multiple: 2.5,
            volatility_floor: 0.1,
            base_confidence: 0.85,
            distance_penalty: 0.05,
            volatility_penalty: 0.2,
            data_quality_bonus: 0.1,
            data_quality_months: 24,
            min_confidence: 0.3,
            max_confidence: 0.95,
            sparse_history_points: 3,
            sparse_min_volatility: 0.15,
            sparse_noise_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnomalyConfig {
    pub min_records: usize,
    pub default_threshold: f64,
    pub sparse_threshold: f64,
    #[schemars(description = "Categories with fewer samples use the sparse threshold")]
    pub sparse_sample_limit: usize,
    pub dense_threshold: f64,
    #[schemars(description = "Categories with more samples use the dense threshold")]
    pub dense_sample_limit: usize,
    pub core_threshold: f64,
    #[schemars(description = "Core categories with fewer samples use the core threshold")]
    pub core_sample_limit: usize,
    pub base_confidence: f64,
    pub confidence_slope: f64,
    pub max_confidence: f64,
    pub rare_category_confidence: f64,
    pub underrepresented_share: f64,
    pub underrepresented_min_records: usize,
    pub underrepresented_confidence: f64,
    #[schemars(description = "Maximum day distance between two records suspected as duplicates")]
    pub duplicate_window_days: i64,
    pub duplicate_confidence: f64,
    #[schemars(description = "Days past the reference date a record may be dated before it is flagged")]
    pub future_tolerance_days: i64,
    pub timing_confidence: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            min_records: 3,
            default_threshold: 2.0,
            sparse_threshold: 3.0,
            sparse_sample_limit: 5,
            dense_threshold: 1.5,
            dense_sample_limit: 20,
            core_threshold: 4.0,
            core_sample_limit: 3,
            base_confidence: 0.6,
            confidence_slope: 0.1,
            max_confidence: 0.9,
            rare_category_confidence: 0.7,
            underrepresented_share: 0.05,
            underrepresented_min_records: 10,
            underrepresented_confidence: 0.5,
            duplicate_window_days: 1,
            duplicate_confidence: 0.75,
            future_tolerance_days: 1,
            timing_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PatternConfig {
    pub min_records: usize,
    #[schemars(description = "Number of earliest and most recent records compared for the trend")]
    pub trend_window: usize,
    #[schemars(description = "Relative change beyond which a category is increasing or decreasing")]
    pub change_threshold: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_records: 3,
            trend_window: 3,
            change_threshold: 0.10,
        }
    }
}

/// Two-step threshold band: crossing `warn` scores one risk point, crossing `severe` two.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskBand {
    pub warn: f64,
    pub severe: f64,
}

impl RiskBand {
    pub const fn new(warn: f64, severe: f64) -> Self {
        Self { warn, severe }
    }

    /// Points for a ratio where larger is worse.
    pub fn points_above(&self, value: f64) -> u32 {
        if value > self.severe {
            2
        } else if value > self.warn {
            1
        } else {
            0
        }
    }

    /// Points for a ratio where smaller is worse.
    pub fn points_below(&self, value: f64) -> u32 {
        if value < self.severe {
            2
        } else if value < self.warn {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OrganizationDefaults {
    pub profit_margin: f64,
    pub expense_ratio: f64,
    pub cash_flow_ratio: f64,
    pub working_capital_ratio: f64,
    pub debt_to_income_ratio: f64,
    pub savings_rate: f64,
    pub spending_efficiency: f64,
}

impl Default for OrganizationDefaults {
    fn default() -> Self {
        Self {
            profit_margin: 10.0,
            expense_ratio: 90.0,
            cash_flow_ratio: 1.2,
            working_capital_ratio: 1.5,
            debt_to_income_ratio: 0.3,
            savings_rate: 0.1,
            spending_efficiency: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HealthConfig {
    pub emergency_fund_months: f64,
    #[schemars(description = "Reserve coverage of the target below which the fund is critical")]
    pub critical_coverage: f64,
    #[schemars(description = "Reserve coverage of the target below which the fund is a warning")]
    pub warning_coverage: f64,
    pub debt_to_income: RiskBand,
    pub savings_rate: RiskBand,
    pub spending_efficiency: RiskBand,
    pub profit_margin: RiskBand,
    pub expense_ratio: RiskBand,
    pub cash_flow_ratio: RiskBand,
    pub working_capital_ratio: RiskBand,
    #[schemars(description = "Coverage ratio reported when there are neither assets nor liabilities")]
    pub neutral_coverage_ratio: f64,
    pub high_risk_points: u32,
    pub medium_risk_points: u32,
    #[schemars(description = "Organizations with fewer records fall back to the defaults")]
    pub organization_min_records: usize,
    pub organization_defaults: OrganizationDefaults,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            emergency_fund_months: 3.0,
            critical_coverage: 0.5,
            warning_coverage: 1.0,
            debt_to_income: RiskBand::new(0.2, 0.5),
            savings_rate: RiskBand::new(0.1, 0.0),
            spending_efficiency: RiskBand::new(80.0, 100.0),
            profit_margin: RiskBand::new(10.0, 0.0),
            expense_ratio: RiskBand::new(90.0, 100.0),
            cash_flow_ratio: RiskBand::new(1.5, 1.0),
            working_capital_ratio: RiskBand::new(1.2, 1.0),
            neutral_coverage_ratio: 1.5,
            high_risk_points: 4,
            medium_risk_points: 2,
            organization_min_records: 3,
            organization_defaults: OrganizationDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InsightConfig {
    pub min_records: usize,
    pub high_severity_confidence: f64,
    pub medium_severity_confidence: f64,
    pub trend_min_occurrences: usize,
    #[schemars(description = "Share of all records a non-core category needs for a trend insight")]
    pub trend_min_share: f64,
    pub trend_confidence: f64,
    pub risk_confidence: f64,
    pub opportunity_confidence: f64,
    pub savings_rate_guidance: f64,
    #[schemars(description = "Profit margin (percent) below which organizations get an opportunity insight")]
    pub profit_margin_guidance: f64,
    #[schemars(description = "Stable sort by severity, then confidence")]
    pub rank_by_severity: bool,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_records: 5,
            high_severity_confidence: 0.8,
            medium_severity_confidence: 0.6,
            trend_min_occurrences: 3,
            trend_min_share: 0.10,
            trend_confidence: 0.7,
            risk_confidence: 0.85,
            opportunity_confidence: 0.75,
            savings_rate_guidance: 0.2,
            profit_margin_guidance: 15.0,
            rank_by_severity: true,
        }
    }
}

impl AnalyticsConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalyticsConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalyticsConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::json_schema())
    }

    pub fn validate(&self) -> Result<()> {
        let agg = &self.aggregation;
        check_unit("aggregation.base_confidence", agg.base_confidence)?;
        check_unit("aggregation.max_confidence", agg.max_confidence)?;
        check_unit("aggregation.empty_confidence", agg.empty_confidence)?;
        if agg.empty_income <= 0.0 || agg.empty_expenses <= 0.0 {
            return Err(AnalyticsError::config(
                "aggregation.empty_income",
                "synthesized bucket values must be positive",
            ));
        }

        check_non_negative("trend.stable_slope_threshold", self.trend.stable_slope_threshold)?;

        if let SeasonalityProfile::Custom(factors) = &self.seasonality.prior {
            validate_custom_factors(factors)?;
        }

        let fc = &self.forecast;
        check_unit("forecast.autocorrelation", fc.autocorrelation)?;
        check_unit("forecast.trend_dampening", fc.trend_dampening)?;
        check_non_negative("forecast.noise_scale", fc.noise_scale)?;
        check_non_negative("forecast.volatility_floor", fc.volatility_floor)?;
        if fc.clamp_min_multiple <= 0.0 || fc.clamp_min_multiple > fc.clamp_max_multiple {
            return Err(AnalyticsError::config(
                "forecast.clamp_min_multiple",
                format!(
                    "clamp range [{}, {}] must be positive and ordered",
                    fc.clamp_min_multiple, fc.clamp_max_multiple
                ),
            ));
        }
        check_unit("forecast.min_confidence", fc.min_confidence)?;
        check_unit("forecast.max_confidence", fc.max_confidence)?;
        if fc.min_confidence > fc.max_confidence {
            return Err(AnalyticsError::config(
                "forecast.min_confidence",
                "confidence floor is above the ceiling",
            ));
        }
        check_non_negative("forecast.distance_penalty", fc.distance_penalty)?;
        if fc.default_horizon > fc.max_horizon {
            return Err(AnalyticsError::config(
                "forecast.default_horizon",
                format!("exceeds max_horizon {}", fc.max_horizon),
            ));
        }

        let an = &self.anomaly;
        for (field, value) in [
            ("anomaly.default_threshold", an.default_threshold),
            ("anomaly.sparse_threshold", an.sparse_threshold),
            ("anomaly.dense_threshold", an.dense_threshold),
            ("anomaly.core_threshold", an.core_threshold),
        ] {
            if value <= 0.0 {
                return Err(AnalyticsError::config(field, "threshold must be positive"));
            }
        }
        check_unit("anomaly.max_confidence", an.max_confidence)?;
        check_unit("anomaly.underrepresented_share", an.underrepresented_share)?;
        check_non_negative("anomaly.duplicate_window_days", an.duplicate_window_days as f64)?;

        if self.patterns.trend_window == 0 {
            return Err(AnalyticsError::config(
                "patterns.trend_window",
                "window must hold at least one record",
            ));
        }

        let health = &self.health;
        if health.critical_coverage > health.warning_coverage {
            return Err(AnalyticsError::config(
                "health.critical_coverage",
                "critical coverage must not exceed warning coverage",
            ));
        }
        if health.medium_risk_points > health.high_risk_points {
            return Err(AnalyticsError::config(
                "health.medium_risk_points",
                "medium bound must not exceed high bound",
            ));
        }

        let insights = &self.insights;
        check_unit("insights.trend_confidence", insights.trend_confidence)?;
        check_unit("insights.risk_confidence", insights.risk_confidence)?;
        check_unit("insights.opportunity_confidence", insights.opportunity_confidence)?;
        if insights.medium_severity_confidence > insights.high_severity_confidence {
            return Err(AnalyticsError::config(
                "insights.medium_severity_confidence",
                "medium band must not exceed high band",
            ));
        }

        Ok(())
    }
}

fn check_unit(field: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AnalyticsError::config(
            field,
            format!("{} is outside [0, 1]", value),
        ));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AnalyticsError::config(
            field,
            format!("{} must be a non-negative number", value),
        ));
    }
    Ok(())
}
