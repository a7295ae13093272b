use crate::config::BaselineConfig;
use crate::error::{ConfigError, FilterError};

/// Basal plasma glucose estimate G_b over a fixed CGM series.
///
/// Before the warm-up window is filled the estimate is the configured
/// cold-start value. After it, G_b(k) is the trailing window
/// `[k - 2l/h + 1, k - l/h]` summed and scaled by h/l.
pub struct GlucoseBaseline<'a> {
    config: &'a BaselineConfig,
    samples: &'a [f64],
}

impl<'a> GlucoseBaseline<'a> {
    pub fn new(config: &'a BaselineConfig, samples: &'a [f64]) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, samples })
    }

    /// G_b(k). Negative k is inside the cold-start range.
    pub fn at(&self, k: i64) -> Result<f64, FilterError> {
        let warmup = self.config.warmup_samples() as i64;
        if k < warmup {
            return Ok(self.config.cold_start_value);
        }

        let start = k - warmup + 1;
        let end = k - self.config.window_samples() as i64;
        if end as usize >= self.samples.len() {
            return Err(FilterError::PreconditionViolation {
                index: k,
                reason: format!(
                    "baseline window [{}, {}] exceeds {} samples",
                    start,
                    end,
                    self.samples.len()
                ),
            });
        }

        let sum: f64 = self.samples[start as usize..=end as usize].iter().sum();
        Ok(sum * self.config.scale())
    }

    /// Nonlinear state model x(k) = G_b(k - 1).
    pub fn state_model(&self, k: i64) -> Result<f64, FilterError> {
        self.at(k - 1)
    }

    /// Nonlinear observation model y(k) = G_b(k).
    pub fn observation_model(&self, k: i64) -> Result<f64, FilterError> {
        self.at(k)
    }
}
