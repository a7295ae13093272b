//! Meal detection on continuous glucose monitor (CGM) series using
//! Unscented-Kalman-shaped equations around a basal glucose estimate.
//!
//! Every index of the series is evaluated independently from the raw
//! samples: baseline, sigma points, prior and output stages, gain and
//! update. The reported value per sample is the updated covariance.

pub mod config;
pub mod error;
pub mod filters;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::MealDetectorConfig;
pub use error::{ConfigError, FilterError, PipelineError};
pub use pipeline::MealDetector;
