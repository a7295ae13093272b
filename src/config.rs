use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Baseline glucose window settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// CGM sampling interval [minutes]
    pub sampling_interval_min: u32,
    /// Length of the averaging window [minutes]
    pub window_length_min: u32,
    /// Value returned before the warm-up window is filled [mg/dL]
    pub cold_start_value: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            sampling_interval_min: 5,
            window_length_min: 30,
            cold_start_value: 100.0,
        }
    }
}

impl BaselineConfig {
    /// Samples per averaging window (l/h).
    pub fn window_samples(&self) -> usize {
        (self.window_length_min / self.sampling_interval_min) as usize
    }

    /// Indices below this return the cold-start value (2l/h).
    pub fn warmup_samples(&self) -> usize {
        2 * self.window_samples()
    }

    /// Scale applied to the window sum (h/l).
    pub fn scale(&self) -> f64 {
        self.sampling_interval_min as f64 / self.window_length_min as f64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling_interval_min == 0 {
            return Err(ConfigError::ZeroSamplingInterval);
        }
        if self.window_length_min == 0 || self.window_length_min % self.sampling_interval_min != 0 {
            return Err(ConfigError::UnalignedWindow {
                window: self.window_length_min,
                sampling: self.sampling_interval_min,
            });
        }
        Ok(())
    }
}

/// Unscented transform shaping parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnscentedConfig {
    /// Dimension L of the state vector; 2L+1 sigma points are used
    pub state_dim: usize,
    /// Spread of sigma points
    pub alpha: f64,
    /// Prior knowledge of the distribution (2.0 for Gaussian)
    pub beta: f64,
    /// Secondary scaling
    pub kappa: f64,
}

impl Default for UnscentedConfig {
    fn default() -> Self {
        Self {
            state_dim: 2,
            alpha: 1.0,
            beta: 2.0,
            kappa: 0.0,
        }
    }
}

impl UnscentedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.state_dim == 0 {
            return Err(ConfigError::ZeroStateDim);
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("kappa", self.kappa)] {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteParameter { name, value });
            }
        }
        let l = self.state_dim as f64;
        let mu = self.alpha * self.alpha * (l + self.kappa);
        if l + mu <= 0.0 {
            return Err(ConfigError::DegenerateScaling(l + mu));
        }
        Ok(())
    }
}

/// How the prior covariance accumulates over sigma points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CovarianceSum {
    /// Only the centre point contributes.
    #[default]
    FirstTerm,
    /// Weighted sum over all 2L+1 points.
    Full,
}

/// Which deviations enter the cross-covariance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CrossCovariance {
    /// Centre point: output deviation squared. Others: prior point minus
    /// output estimate, times output deviation.
    #[default]
    Literal,
    /// (prior_i - prior state) * (output_i - output estimate) for every point.
    Symmetric,
}

/// Which filter index feeds result row `i`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RowAlignment {
    /// Row i reports k = i + 1.
    #[default]
    Successor,
    /// Row i reports k = i; row 0 has no prior estimate.
    Same,
}

impl RowAlignment {
    pub fn filter_index(&self, row: usize) -> i64 {
        match self {
            RowAlignment::Successor => row as i64 + 1,
            RowAlignment::Same => row as i64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterVariants {
    pub covariance_sum: CovarianceSum,
    pub cross_covariance: CrossCovariance,
    pub row_alignment: RowAlignment,
}

/// Complete run configuration, built once and shared read-only.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealDetectorConfig {
    pub baseline: BaselineConfig,
    pub unscented: UnscentedConfig,
    pub variants: FilterVariants,
}

impl MealDetectorConfig {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.baseline.validate()?;
        self.unscented.validate()
    }
}
