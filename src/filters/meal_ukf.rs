use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::config::{CovarianceSum, CrossCovariance, FilterVariants, MealDetectorConfig};
use crate::error::{ConfigError, FilterError};
use crate::filters::baseline::GlucoseBaseline;
use crate::filters::weights::UtWeights;

/// Every intermediate of one filter evaluation at index k.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub index: i64,
    pub prior_sigma_points: Vec<f64>,
    pub prior_state: f64,
    pub prior_covariance: f64,
    pub output_estimate: f64,
    pub innovation_covariance: f64,
    pub cross_covariance: f64,
    pub gain: f64,
    /// Observation model y(k) = G_b(k)
    pub observation: f64,
    pub updated_state: f64,
    pub updated_covariance: f64,
}

/// Unscented-Kalman-shaped meal detector over a fixed CGM series.
///
/// Each index is evaluated from the raw samples alone; nothing carries over
/// from k - 1 to k except what is re-derived from the series.
pub struct MealUkf<'a> {
    baseline: GlucoseBaseline<'a>,
    samples: &'a [f64],
    weights: UtWeights,
    variants: FilterVariants,
}

impl<'a> MealUkf<'a> {
    pub fn new(config: &'a MealDetectorConfig, samples: &'a [f64]) -> Result<Self, ConfigError> {
        Ok(Self {
            baseline: GlucoseBaseline::new(&config.baseline, samples)?,
            samples,
            weights: UtWeights::new(&config.unscented)?,
            variants: config.variants,
        })
    }

    pub fn weights(&self) -> &UtWeights {
        &self.weights
    }

    pub fn baseline(&self) -> &GlucoseBaseline<'a> {
        &self.baseline
    }

    fn sample(&self, k: i64) -> Result<f64, FilterError> {
        usize::try_from(k)
            .ok()
            .and_then(|i| self.samples.get(i).copied())
            .ok_or_else(|| FilterError::PreconditionViolation {
                index: k,
                reason: format!("sample index outside series of {} samples", self.samples.len()),
            })
    }

    /// Sigma point `idx` of the spread around the state estimate at k.
    ///
    /// The spread is gamma times the raw sample at k, not a covariance root.
    pub fn sigma_point(&self, k: i64, idx: usize) -> Result<f64, FilterError> {
        if k < 0 {
            return Ok(0.0);
        }

        let dim = self.weights.state_dim;
        if idx > 2 * dim {
            return Err(FilterError::PreconditionViolation {
                index: k,
                reason: format!("sigma point {} outside 0..={}", idx, 2 * dim),
            });
        }

        let estimate = self.baseline.state_model(k)?;
        if idx == 0 {
            return Ok(estimate);
        }

        let spread = self.weights.gamma * self.sample(k)?;
        if idx <= dim {
            Ok(estimate + spread)
        } else {
            Ok(estimate - spread)
        }
    }

    pub fn sigma_points(&self, k: i64) -> Result<Array1<f64>, FilterError> {
        let points = (0..self.weights.sigma_count())
            .map(|idx| self.sigma_point(k, idx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Array1::from_vec(points))
    }

    /// Prior sigma points at k, propagated from the sigma points at k - 1.
    ///
    /// `None` at k = 0: there is no earlier index to propagate from.
    pub fn prior_sigma_points(&self, k: i64) -> Result<Option<Array1<f64>>, FilterError> {
        if k == 0 {
            return Ok(None);
        }
        self.sigma_points(k - 1).map(Some)
    }

    /// Weighted mean with the mean weights.
    pub fn weighted_mean(&self, points: &Array1<f64>) -> f64 {
        self.weights.weights_mean.dot(points)
    }

    pub fn prior_covariance(&self, prior_points: &Array1<f64>, prior_state: f64) -> f64 {
        let deviations = prior_points - prior_state;
        match self.variants.covariance_sum {
            CovarianceSum::FirstTerm => self.weights.weights_cov[0] * deviations[0] * deviations[0],
            CovarianceSum::Full => self.weights.weights_cov.dot(&deviations.mapv(|d| d * d)),
        }
    }

    /// Output sigma points pass the prior sigma points through unchanged.
    pub fn output_sigma_points(&self, prior_points: &Array1<f64>) -> Array1<f64> {
        prior_points.clone()
    }

    pub fn innovation_covariance(&self, output_points: &Array1<f64>, output_estimate: f64) -> f64 {
        let deviations = output_points - output_estimate;
        self.weights.weights_cov.dot(&deviations.mapv(|d| d * d))
    }

    pub fn cross_covariance(
        &self,
        prior_points: &Array1<f64>,
        prior_state: f64,
        output_points: &Array1<f64>,
        output_estimate: f64,
    ) -> f64 {
        let output_dev = output_points - output_estimate;
        match self.variants.cross_covariance {
            CrossCovariance::Literal => {
                let w = &self.weights.weights_cov;
                let mut cross = w[0] * output_dev[0] * output_dev[0];
                for i in 1..output_dev.len() {
                    cross += w[i] * (prior_points[i] - output_estimate) * output_dev[i];
                }
                cross
            }
            CrossCovariance::Symmetric => {
                let prior_dev = prior_points - prior_state;
                self.weights.weights_cov.dot(&(&prior_dev * &output_dev))
            }
        }
    }

    /// Full evaluation chain at index k.
    pub fn evaluate(&self, k: i64) -> Result<FilterStep, FilterError> {
        if k < 0 {
            return Err(FilterError::PreconditionViolation {
                index: k,
                reason: "filter index must be non-negative".to_string(),
            });
        }

        let prior_points = self
            .prior_sigma_points(k)?
            .ok_or(FilterError::UndefinedValue { index: k })?;

        let prior_state = self.weighted_mean(&prior_points);
        let prior_covariance = self.prior_covariance(&prior_points, prior_state);

        let output_points = self.output_sigma_points(&prior_points);
        let output_estimate = self.weighted_mean(&output_points);
        let innovation_covariance = self.innovation_covariance(&output_points, output_estimate);
        let cross_covariance =
            self.cross_covariance(&prior_points, prior_state, &output_points, output_estimate);

        if innovation_covariance == 0.0 {
            return Err(FilterError::ArithmeticFailure {
                index: k,
                reason: "innovation covariance is zero".to_string(),
            });
        }
        let gain = cross_covariance / innovation_covariance;
        if !gain.is_finite() {
            return Err(FilterError::ArithmeticFailure {
                index: k,
                reason: format!("non-finite gain {}", gain),
            });
        }

        let observation = self.baseline.observation_model(k)?;
        let updated_state = prior_state + gain * (observation - output_estimate);
        let updated_covariance = prior_covariance - gain * innovation_covariance * gain;
        if !updated_state.is_finite() || !updated_covariance.is_finite() {
            return Err(FilterError::ArithmeticFailure {
                index: k,
                reason: format!(
                    "non-finite update (state {}, covariance {})",
                    updated_state, updated_covariance
                ),
            });
        }

        Ok(FilterStep {
            index: k,
            prior_sigma_points: prior_points.to_vec(),
            prior_state,
            prior_covariance,
            output_estimate,
            innovation_covariance,
            cross_covariance,
            gain,
            observation,
            updated_state,
            updated_covariance,
        })
    }

    /// Updated covariance at k, the value reported per result row.
    pub fn updated_covariance(&self, k: i64) -> Result<f64, FilterError> {
        self.evaluate(k).map(|step| step.updated_covariance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| 90.0 + 3.5 * i as f64 + (i % 7) as f64).collect()
    }

    #[test]
    fn test_sigma_point_layout() {
        let config = MealDetectorConfig::default();
        let samples = vec![150.0; 50];
        let ukf = MealUkf::new(&config, &samples).unwrap();

        // k = 20: estimate G_b(19) = 150, spread 2 * 150
        let points = ukf.sigma_points(20).unwrap();
        assert_eq!(points.to_vec(), vec![150.0, 450.0, 450.0, -150.0, -150.0]);
    }

    #[test]
    fn test_center_point_is_state_model() {
        let config = MealDetectorConfig::default();
        let samples = ramp(40);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        for k in 0..40 {
            assert_eq!(
                ukf.sigma_point(k, 0).unwrap(),
                ukf.baseline().state_model(k).unwrap()
            );
        }
    }

    #[test]
    fn test_negative_index_short_circuits() {
        let config = MealDetectorConfig::default();
        let samples = ramp(5);
        let ukf = MealUkf::new(&config, &samples).unwrap();
        assert_eq!(ukf.sigma_point(-1, 3).unwrap(), 0.0);
    }

    #[test]
    fn test_sigma_index_out_of_range() {
        let config = MealDetectorConfig::default();
        let samples = ramp(5);
        let ukf = MealUkf::new(&config, &samples).unwrap();
        assert!(matches!(
            ukf.sigma_point(1, 5),
            Err(FilterError::PreconditionViolation { index: 1, .. })
        ));
    }

    #[test]
    fn test_sample_past_end() {
        let config = MealDetectorConfig::default();
        let samples = ramp(5);
        let ukf = MealUkf::new(&config, &samples).unwrap();
        assert!(ukf.sigma_point(4, 1).is_ok());
        assert!(matches!(
            ukf.sigma_point(5, 1),
            Err(FilterError::PreconditionViolation { index: 5, .. })
        ));
    }

    #[test]
    fn test_no_prior_at_zero() {
        let config = MealDetectorConfig::default();
        let samples = vec![150.0];
        let ukf = MealUkf::new(&config, &samples).unwrap();

        assert_eq!(ukf.prior_sigma_points(0).unwrap(), None);
        assert_eq!(ukf.evaluate(0), Err(FilterError::UndefinedValue { index: 0 }));
    }

    #[test]
    fn test_negative_index_rejected() {
        let config = MealDetectorConfig::default();
        let samples = vec![150.0; 20];
        let ukf = MealUkf::new(&config, &samples).unwrap();

        assert!(matches!(
            ukf.evaluate(-1),
            Err(FilterError::PreconditionViolation { index: -1, .. })
        ));
        assert!(matches!(
            ukf.updated_covariance(-7),
            Err(FilterError::PreconditionViolation { index: -7, .. })
        ));
    }

    #[test]
    fn test_constant_series_step() {
        let config = MealDetectorConfig::default();
        let samples = vec![150.0; 50];
        let ukf = MealUkf::new(&config, &samples).unwrap();

        // Prior points spread around G_b(-1) = 100 by 2 * 150
        let step = ukf.evaluate(1).unwrap();
        assert_eq!(step.prior_sigma_points, vec![100.0, 400.0, 400.0, -200.0, -200.0]);
        assert_relative_eq!(step.prior_state, 100.0);
        assert_relative_eq!(step.prior_covariance, 0.0);
        assert_relative_eq!(step.output_estimate, 100.0);
        assert_relative_eq!(step.innovation_covariance, 45000.0);
        assert_relative_eq!(step.cross_covariance, 45000.0);
        assert_relative_eq!(step.gain, 1.0);
        assert_relative_eq!(step.observation, 100.0);
        assert_relative_eq!(step.updated_state, 100.0);
        assert_relative_eq!(step.updated_covariance, -45000.0);
    }

    #[test]
    fn test_first_term_covariance_tracks_previous_sample() {
        let config = MealDetectorConfig::default();
        let samples = ramp(60);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        // Symmetric spread keeps the prior state on the centre point, so only
        // the innovation term survives: -L * sample[k-1]^2.
        for k in 1..60 {
            let expected = -2.0 * samples[k as usize - 1].powi(2);
            assert_relative_eq!(
                ukf.updated_covariance(k).unwrap(),
                expected,
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_full_covariance_cancels_innovation() {
        let mut config = MealDetectorConfig::default();
        config.variants.covariance_sum = CovarianceSum::Full;
        let samples = ramp(60);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        for k in 1..60 {
            let step = ukf.evaluate(k).unwrap();
            assert_relative_eq!(step.prior_covariance, step.innovation_covariance, max_relative = 1e-12);
            assert!(step.updated_covariance.abs() <= 1e-9 * step.innovation_covariance);
        }
    }

    #[test]
    fn test_cross_covariance_variants_agree_on_pass_through() {
        let samples = ramp(40);
        let literal_config = MealDetectorConfig::default();
        let mut symmetric_config = MealDetectorConfig::default();
        symmetric_config.variants.cross_covariance = CrossCovariance::Symmetric;

        let literal = MealUkf::new(&literal_config, &samples).unwrap();
        let symmetric = MealUkf::new(&symmetric_config, &samples).unwrap();

        for k in 1..40 {
            let a = literal.evaluate(k).unwrap();
            let b = symmetric.evaluate(k).unwrap();
            assert_relative_eq!(a.cross_covariance, b.cross_covariance, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_literal_cross_covariance_uses_prior_points_off_center() {
        let config = MealDetectorConfig::default();
        let samples = ramp(5);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        let prior = Array1::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let output = Array1::from_vec(vec![2.0, 2.0, 2.0, 2.0, 2.0]);
        // centre: 2.5 * (2 - 1)^2, others: 0.125 * (prior_i - 1) * (2 - 1)
        let cross = ukf.cross_covariance(&prior, 0.0, &output, 1.0);
        assert_relative_eq!(cross, 2.5 + 0.125 * (1.0 + 2.0 + 3.0 + 4.0));
    }

    #[test]
    fn test_updated_state_follows_observation() {
        let config = MealDetectorConfig::default();
        let samples = ramp(60);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        for k in 1..60 {
            let step = ukf.evaluate(k).unwrap();
            // Unit gain moves the state onto the observation
            assert_relative_eq!(step.updated_state, step.observation, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_zero_sample_is_arithmetic_failure() {
        let config = MealDetectorConfig::default();
        let mut samples = vec![150.0; 20];
        samples[4] = 0.0;
        let ukf = MealUkf::new(&config, &samples).unwrap();

        assert!(ukf.evaluate(4).is_ok());
        assert!(matches!(
            ukf.evaluate(5),
            Err(FilterError::ArithmeticFailure { index: 5, .. })
        ));
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let config = MealDetectorConfig::default();
        let samples = ramp(30);
        let ukf = MealUkf::new(&config, &samples).unwrap();

        let first: Vec<_> = (1..30).map(|k| ukf.evaluate(k).unwrap()).collect();
        let second: Vec<_> = (1..30).rev().map(|k| ukf.evaluate(k).unwrap()).collect();
        assert!(first.iter().eq(second.iter().rev()));
    }
}
