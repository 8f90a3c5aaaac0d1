//! Cohort baselines
//!
//! A channel score compares each student against the class: the baseline is the
//! mean and population standard deviation of the students' values, with the
//! instructor left out.

use crate::config::SCORE_CENTER;
use serde::{Deserialize, Serialize};

/// Mean and spread of one channel across the student cohort
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortBaseline {
    pub mean: f64,
    /// Population standard deviation (divides by `n`)
    pub stdev: f64,
}

impl CohortBaseline {
    /// Compute the baseline of `values`; `None` for an empty cohort
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            stdev: variance.sqrt(),
        })
    }

    /// Scale factor that keeps an average student near the score center.
    ///
    /// `100 / mean` when the mean is positive, otherwise `100`.
    pub fn adjustment(&self) -> f64 {
        if self.mean > 0.0 {
            SCORE_CENTER / self.mean
        } else {
            SCORE_CENTER
        }
    }

    /// 100-centered standard score of `value`.
    ///
    /// `epsilon` is added to the deviation so a uniform cohort does not divide
    /// by zero.
    pub fn score(&self, value: f64, epsilon: f64) -> f64 {
        ((value - self.mean) / (self.stdev + epsilon)) * self.adjustment() + SCORE_CENTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STDEV_EPSILON;

    #[test]
    fn test_population_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let baseline = CohortBaseline::from_values(&values).unwrap();
        assert!((baseline.mean - 5.0).abs() < 1e-12);
        assert!((baseline.stdev - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_cohort_has_no_baseline() {
        assert!(CohortBaseline::from_values(&[]).is_none());
    }

    #[test]
    fn test_adjustment_falls_back_for_zero_mean() {
        let zero = CohortBaseline::from_values(&[0.0, 0.0]).unwrap();
        assert_eq!(zero.adjustment(), 100.0);

        let positive = CohortBaseline::from_values(&[2.0, 6.0]).unwrap();
        assert_eq!(positive.adjustment(), 25.0);
    }

    #[test]
    fn test_mean_value_scores_center() {
        let baseline = CohortBaseline::from_values(&[2.0, 6.0]).unwrap();
        assert!((baseline.score(4.0, STDEV_EPSILON) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_formula() {
        // mean 4, stdev 2, adjustment 25: one deviation above is 125
        let baseline = CohortBaseline::from_values(&[2.0, 6.0]).unwrap();
        assert!((baseline.score(6.0, STDEV_EPSILON) - 125.0).abs() < 1e-5);
        assert!((baseline.score(2.0, STDEV_EPSILON) - 75.0).abs() < 1e-5);
    }

    #[test]
    fn test_uniform_cohort_is_finite() {
        let baseline = CohortBaseline::from_values(&[0.0, 0.0, 0.0]).unwrap();
        let score = baseline.score(0.0, STDEV_EPSILON);
        assert!(score.is_finite());
        assert_eq!(score, 100.0);
    }
}
