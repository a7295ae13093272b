use ndarray::Array1;

use crate::config::UnscentedConfig;
use crate::error::ConfigError;

/// Scalar unscented-transform weights, computed once per run.
///
/// mu = alpha^2 (L + kappa)
/// W0(m) = mu / (L + mu), W0(c) = W0(m) + (1 - alpha^2 + beta)
/// Wi(m) = Wi(c) = 1 / (2 (L + mu)) for i = 1..2L
#[derive(Clone, Debug)]
pub struct UtWeights {
    pub state_dim: usize,
    pub mu: f64,
    /// Sigma-point spread, sqrt(L + mu)
    pub gamma: f64,
    pub weights_mean: Array1<f64>,
    pub weights_cov: Array1<f64>,
}

impl UtWeights {
    pub fn new(config: &UnscentedConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let l = config.state_dim as f64;
        let alpha_sq = config.alpha * config.alpha;
        let mu = alpha_sq * (l + config.kappa);
        let sigma_count = 2 * config.state_dim + 1;

        let mut weights_mean = Array1::<f64>::zeros(sigma_count);
        let mut weights_cov = Array1::<f64>::zeros(sigma_count);

        weights_mean[0] = mu / (l + mu);
        weights_cov[0] = mu / (l + mu) + (1.0 - alpha_sq + config.beta);

        for i in 1..sigma_count {
            weights_mean[i] = 1.0 / (2.0 * (l + mu));
            weights_cov[i] = 1.0 / (2.0 * (l + mu));
        }

        Ok(Self {
            state_dim: config.state_dim,
            mu,
            gamma: (l + mu).sqrt(),
            weights_mean,
            weights_cov,
        })
    }

    pub fn sigma_count(&self) -> usize {
        self.weights_mean.len()
    }
}
