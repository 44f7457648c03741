use crate::config::TrendConfig;
use crate::schema::TrendDirection;
use crate::utils::{linear_regression, mean, safe_div};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAnalysis {
    /// Raw OLS slope, in series units per period
    pub slope: f64,
    /// Slope divided by the absolute series mean
    pub normalized_slope: f64,
    pub direction: TrendDirection,
}

/// Fits a least-squares line through `values` and classifies its slope
/// relative to the series level.
pub fn analyze_trend(values: &[f64], config: &TrendConfig) -> TrendAnalysis {
    let (slope, _) = linear_regression(values);
    let normalized_slope = safe_div(slope, mean(values).abs());

    let direction = if normalized_slope.abs() < config.stable_slope_threshold {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    };

    TrendAnalysis {
        slope,
        normalized_slope,
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_series_is_stable() {
        let trend = analyze_trend(&[2000.0; 12], &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Stable);
        assert_eq!(trend.slope, 0.0);
    }

    #[test]
    fn test_growing_series_is_increasing() {
        let values: Vec<f64> = (0..6).map(|i| 1000.0 + 100.0 * i as f64).collect();
        let trend = analyze_trend(&values, &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Increasing);
        assert!((trend.slope - 100.0).abs() < 1e-9);
        assert!((trend.normalized_slope - 100.0 / 1250.0).abs() < 1e-9);
    }

    #[test]
    fn test_shrinking_series_is_decreasing() {
        let trend = analyze_trend(&[900.0, 700.0, 500.0], &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn test_small_drift_is_stable() {
        let trend = analyze_trend(&[1000.0, 1005.0, 1010.0], &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_short_series() {
        assert_eq!(analyze_trend(&[], &TrendConfig::default()).direction, TrendDirection::Stable);
        assert_eq!(analyze_trend(&[5.0], &TrendConfig::default()).direction, TrendDirection::Stable);
    }
}
