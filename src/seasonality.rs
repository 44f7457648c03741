use crate::config::SeasonalityConfig;
use crate::error::{AnalyticsError, Result};
use crate::schema::{ForecastPoint, Seasonality};
use crate::utils::mean;
use chrono::Datelike;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Twelve multiplicative factors (January first) averaging 1.0.
pub type MonthlyFactors = [f64; 12];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum SeasonalityProfile {
    #[default]
    #[schemars(
        description = "Typical business year: soft January/February, gradual build through the year, peak in December."
    )]
    Business,

    #[schemars(description = "No seasonal variation (every factor is 1.0).")]
    Flat,

    #[schemars(
        description = "Custom 12-value array of multiplicative factors, January first. Must be non-negative and average 1.0."
    )]
    Custom(Vec<f64>),
}

const BUSINESS_FACTORS: MonthlyFactors = [
    0.85, 0.88, 0.95, 0.98, 1.00, 1.02, 0.98, 0.97, 1.02, 1.05, 1.10, 1.20,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSource {
    /// Estimated from at least a year of history
    Computed,
    /// Taken from the configured prior profile
    Prior,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalFactors {
    pub income: MonthlyFactors,
    pub expenses: MonthlyFactors,
    pub source: FactorSource,
}

impl SeasonalFactors {
    /// Income factor for a 1-based calendar month.
    pub fn income_for(&self, month: u32) -> f64 {
        self.income[month_index(month)]
    }

    /// Expense factor for a 1-based calendar month.
    pub fn expenses_for(&self, month: u32) -> f64 {
        self.expenses[month_index(month)]
    }
}

fn month_index(month: u32) -> usize {
    (month.clamp(1, 12) - 1) as usize
}

pub fn get_profile_factors(profile: &SeasonalityProfile) -> Result<MonthlyFactors> {
    match profile {
        SeasonalityProfile::Business => Ok(BUSINESS_FACTORS),
        SeasonalityProfile::Flat => Ok([1.0; 12]),
        SeasonalityProfile::Custom(factors) => {
            validate_custom_factors(factors)?;
            let mut out = [1.0; 12];
            out.copy_from_slice(factors);
            Ok(out)
        }
    }
}

pub fn validate_custom_factors(factors: &[f64]) -> Result<()> {
    if factors.len() != 12 {
        return Err(AnalyticsError::InvalidSeasonalityFactors(format!(
            "Expected 12 factors, got {}",
            factors.len()
        )));
    }

    if factors.iter().any(|&f| !f.is_finite() || f < 0.0) {
        return Err(AnalyticsError::InvalidSeasonalityFactors(
            "All factors must be finite and non-negative".to_string(),
        ));
    }

    let avg = mean(factors);
    if (avg - 1.0).abs() > 0.01 {
        return Err(AnalyticsError::InvalidSeasonalityFactors(format!(
            "Factors must average 1.0 (got {})",
            avg
        )));
    }

    Ok(())
}

/// Computes per-calendar-month factors from history when at least
/// `min_history_months` points exist, otherwise falls back to the prior.
pub fn estimate_seasonality(
    history: &[ForecastPoint],
    config: &SeasonalityConfig,
) -> Result<SeasonalFactors> {
    if history.len() < config.min_history_months.max(1) {
        let prior = get_profile_factors(&config.prior)?;
        debug!(
            "Using {:?} seasonality prior ({} history points)",
            config.prior,
            history.len()
        );
        return Ok(SeasonalFactors {
            income: prior,
            expenses: prior,
            source: FactorSource::Prior,
        });
    }

    let income = monthly_factors(history, |p| p.income);
    let expenses = monthly_factors(history, |p| p.expenses);

    Ok(SeasonalFactors {
        income,
        expenses,
        source: FactorSource::Computed,
    })
}

fn monthly_factors(history: &[ForecastPoint], value: impl Fn(&ForecastPoint) -> f64) -> MonthlyFactors {
    let mut sums = [0.0; 12];
    let mut counts = [0usize; 12];

    for point in history {
        let idx = point.month.month0() as usize;
        sums[idx] += value(point);
        counts[idx] += 1;
    }

    let overall = mean(&history.iter().map(&value).collect::<Vec<_>>());
    if overall.abs() < 1e-9 {
        return [1.0; 12];
    }

    let mut factors = [1.0; 12];
    for idx in 0..12 {
        if counts[idx] > 0 {
            factors[idx] = (sums[idx] / counts[idx] as f64) / overall;
        }
    }
    factors
}

/// Labels the seasonal shape carried by the factors.
///
/// A prior always reports `Monthly`. Computed factors report `None` when flat,
/// `Quarterly` when quarter means carry at least half of the month-to-month
/// spread, and `Yearly` otherwise.
pub fn classify_seasonality(factors: &SeasonalFactors, config: &SeasonalityConfig) -> Seasonality {
    if factors.source == FactorSource::Prior {
        return Seasonality::Monthly;
    }

    let combined: Vec<f64> = factors
        .income
        .iter()
        .zip(factors.expenses.iter())
        .map(|(i, e)| (i + e) / 2.0)
        .collect();

    let month_spread = spread(&combined);
    if month_spread < config.min_spread {
        return Seasonality::None;
    }

    let quarters: Vec<f64> = combined.chunks(3).map(mean).collect();
    if spread(&quarters) >= month_spread * 0.5 {
        Seasonality::Quarterly
    } else {
        Seasonality::Yearly
    }
}

fn spread(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    let min = values.iter().cloned().fold(f64::MAX, f64::min);
    max - min
}
