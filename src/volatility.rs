use crate::utils::{mean, std_dev};

const NEAR_ZERO_MEAN: f64 = 1e-6;

/// Coefficient of variation (standard deviation over mean).
///
/// Returns `floor` for series shorter than two points or with a near-zero
/// mean, so forecasts never run with zero or unbounded noise.
pub fn coefficient_of_variation(values: &[f64], floor: f64) -> f64 {
    if values.len() < 2 {
        return floor;
    }

    let avg = mean(values);
    if avg.abs() < NEAR_ZERO_MEAN {
        return floor;
    }

    std_dev(values) / avg.abs()
}
