use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};
use crate::schema::{CashFlowPrediction, ForecastPoint, TimeSeriesForecast};
use crate::seasonality::{classify_seasonality, estimate_seasonality, SeasonalFactors};
use crate::trend::analyze_trend;
use crate::utils::{linear_regression, mean, next_month_end};
use crate::volatility::coefficient_of_variation;
use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Source of standard-normal samples for forecast noise.
pub trait NoiseSource {
    fn next_standard_normal(&mut self) -> f64;
}

/// Gaussian noise drawn from any `rand` generator.
pub struct GaussianNoise<R: Rng> {
    rng: R,
}

impl<R: Rng> GaussianNoise<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl GaussianNoise<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NoiseSource for GaussianNoise<R> {
    fn next_standard_normal(&mut self) -> f64 {
        StandardNormal.sample(&mut self.rng)
    }
}

/// Disables stochastic noise entirely.
pub struct NoNoise;

impl NoiseSource for NoNoise {
    fn next_standard_normal(&mut self) -> f64 {
        0.0
    }
}

/// Rejects negative or oversized horizons; these are caller errors, not data issues.
pub fn validate_horizon(months: i64, max: usize) -> Result<usize> {
    if months < 0 || months as u64 > max as u64 {
        return Err(AnalyticsError::InvalidHorizon { months, max });
    }
    Ok(months as usize)
}

// Per-series inputs to the projection loop
struct SeriesModel {
    anchor: f64,
    slope: f64,
    volatility: f64,
}

#[derive(Clone, Copy)]
enum Series {
    Income,
    Expenses,
}

pub struct ForecastEngine<'a> {
    config: &'a AnalyticsConfig,
}

impl<'a> ForecastEngine<'a> {
    pub fn new(config: &'a AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Projects `horizon` months past the last historical point.
    ///
    /// `history` is returned unchanged as the historical half of the result.
    pub fn forecast(
        &self,
        history: Vec<ForecastPoint>,
        horizon: usize,
        noise: &mut dyn NoiseSource,
    ) -> Result<TimeSeriesForecast> {
        let fc = &self.config.forecast;
        if horizon > fc.max_horizon {
            return Err(AnalyticsError::InvalidHorizon {
                months: horizon as i64,
                max: fc.max_horizon,
            });
        }

        info!(
            "Forecasting {} months from {} historical points",
            horizon,
            history.len()
        );

        let net: Vec<f64> = history.iter().map(|p| p.net_cash_flow).collect();
        let trend = analyze_trend(&net, &self.config.trend).direction;
        let factors = estimate_seasonality(&history, &self.config.seasonality)?;
        let seasonality = classify_seasonality(&factors, &self.config.seasonality);
        let accuracy = self.backtest_accuracy(&history);

        let sparse = history.len() < fc.sparse_history_points;
        let income = self.series_model(&history, Series::Income, sparse);
        let expenses = self.series_model(&history, Series::Expenses, sparse);
        let noise_scale = if sparse {
            fc.noise_scale * fc.sparse_noise_multiplier
        } else {
            fc.noise_scale
        };

        debug!(
            "Forecast models: income slope {:.4} vol {:.4}, expenses slope {:.4} vol {:.4}, sparse={}",
            income.slope, income.volatility, expenses.slope, expenses.volatility, sparse
        );

        let mut forecast = Vec::with_capacity(horizon);
        if let Some(last) = history.last() {
            let volatility = (income.volatility + expenses.volatility) / 2.0;
            let mut month = last.month;
            let mut prev_income = income.anchor;
            let mut prev_expenses = expenses.anchor;

            for step in 1..=horizon {
                month = next_month_end(month);

                prev_income = self.project_step(
                    &income,
                    prev_income,
                    step,
                    factors_for(&factors, Series::Income, month),
                    noise_scale,
                    noise,
                );
                prev_expenses = self.project_step(
                    &expenses,
                    prev_expenses,
                    step,
                    factors_for(&factors, Series::Expenses, month),
                    noise_scale,
                    noise,
                );

                forecast.push(ForecastPoint::new(
                    month,
                    prev_income,
                    prev_expenses,
                    self.step_confidence(step, volatility, history.len()),
                ));
            }
        }

        Ok(TimeSeriesForecast {
            historical: history,
            forecast,
            trend,
            seasonality,
            accuracy,
        })
    }

    fn series_model(&self, history: &[ForecastPoint], series: Series, sparse: bool) -> SeriesModel {
        let fc = &self.config.forecast;
        let values: Vec<f64> = history.iter().map(|p| series_value(p, series)).collect();

        let volatility = coefficient_of_variation(&values, fc.volatility_floor);
        let (slope, volatility) = if sparse {
            (0.0, volatility.max(fc.sparse_min_volatility))
        } else {
            (analyze_trend(&values, &self.config.trend).normalized_slope, volatility)
        };

        SeriesModel {
            anchor: self.anchor_value(&values, series),
            slope,
            volatility,
        }
    }

    /// Last actual value when positive, else the series mean, else the
    /// configured default for the series.
    fn anchor_value(&self, values: &[f64], series: Series) -> f64 {
        if let Some(&last) = values.last() {
            if last > 0.0 {
                return last;
            }
        }
        let avg = mean(values);
        if avg > 0.0 {
            return avg;
        }
        match series {
            Series::Income => self.config.aggregation.empty_income,
            Series::Expenses => self.config.aggregation.empty_expenses,
        }
    }

    fn project_step(
        &self,
        model: &SeriesModel,
        previous: f64,
        step: usize,
        seasonal_factor: f64,
        noise_scale: f64,
        noise: &mut dyn NoiseSource,
    ) -> f64 {
        let fc = &self.config.forecast;
        let trend_factor = 1.0 + model.slope * step as f64 * fc.trend_dampening;
        let shock = noise.next_standard_normal() * model.volatility * noise_scale;
        let ac = fc.autocorrelation;

        let value = previous * (ac + (1.0 - ac) * trend_factor * seasonal_factor * (1.0 + shock));
        value.clamp(
            model.anchor * fc.clamp_min_multiple,
            model.anchor * fc.clamp_max_multiple,
        )
    }

    /// Non-increasing in `step` for fixed volatility and history length.
    pub fn step_confidence(&self, step: usize, volatility: f64, history_len: usize) -> f64 {
        let fc = &self.config.forecast;
        let quality =
            (history_len as f64 / fc.data_quality_months.max(1) as f64).min(1.0) * fc.data_quality_bonus;
        let raw = fc.base_confidence - fc.distance_penalty * step as f64
            - fc.volatility_penalty * volatility.min(1.0)
            + quality;
        raw.clamp(fc.min_confidence, fc.max_confidence)
    }

    /// In-sample fit quality of the regression line, scaled by how much the
    /// historical buckets can be trusted.
    fn backtest_accuracy(&self, history: &[ForecastPoint]) -> f64 {
        let trust = mean(&history.iter().map(|p| p.confidence).collect::<Vec<_>>());
        if history.len() < self.config.forecast.sparse_history_points {
            return (0.5 * trust).clamp(0.0, 1.0);
        }

        let errors: Vec<f64> = [Series::Income, Series::Expenses]
            .iter()
            .filter_map(|&series| {
                let values: Vec<f64> = history.iter().map(|p| series_value(p, series)).collect();
                mean_absolute_percentage_error(&values)
            })
            .collect();

        if errors.is_empty() {
            return (0.5 * trust).clamp(0.0, 1.0);
        }

        ((1.0 - mean(&errors)).clamp(0.0, 1.0) * trust).clamp(0.0, 1.0)
    }
}

fn series_value(point: &ForecastPoint, series: Series) -> f64 {
    match series {
        Series::Income => point.income,
        Series::Expenses => point.expenses,
    }
}

fn factors_for(factors: &SeasonalFactors, series: Series, month: NaiveDate) -> f64 {
    match series {
        Series::Income => factors.income_for(month.month()),
        Series::Expenses => factors.expenses_for(month.month()),
    }
}

fn mean_absolute_percentage_error(values: &[f64]) -> Option<f64> {
    let (slope, intercept) = linear_regression(values);
    let errors: Vec<f64> = values
        .iter()
        .enumerate()
        .filter(|(_, actual)| **actual > 1e-9)
        .map(|(i, actual)| ((intercept + slope * i as f64) - actual).abs() / actual)
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(mean(&errors))
    }
}

/// Flattens a forecast into display-ready monthly predictions.
pub fn predict_cash_flow(forecast: &TimeSeriesForecast) -> Vec<CashFlowPrediction> {
    forecast
        .forecast
        .iter()
        .map(|p| CashFlowPrediction {
            month_label: p.month.format("%b %Y").to_string(),
            predicted_income: p.income,
            predicted_expenses: p.expenses,
            net_cash_flow: p.net_cash_flow,
        })
        .collect()
}
