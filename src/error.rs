use thiserror::Error;

/// Failure of a single filter evaluation.
///
/// Every variant carries the filter index `k` it was raised for. None of them
/// is recoverable: the pipeline stops at the first one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A sample or sigma-point index outside the data it addresses.
    #[error("precondition violated at k={index}: {reason}")]
    PreconditionViolation { index: i64, reason: String },

    /// No prior estimate exists at this index (k = 0).
    #[error("no prior estimate at k={index}")]
    UndefinedValue { index: i64 },

    /// Division by zero or a non-finite intermediate.
    #[error("arithmetic failure at k={index}: {reason}")]
    ArithmeticFailure { index: i64, reason: String },
}

impl FilterError {
    pub fn index(&self) -> i64 {
        match self {
            FilterError::PreconditionViolation { index, .. }
            | FilterError::UndefinedValue { index }
            | FilterError::ArithmeticFailure { index, .. } => *index,
        }
    }
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sampling interval must be non-zero")]
    ZeroSamplingInterval,

    #[error("window length {window} min is not a non-zero multiple of the {sampling} min sampling interval")]
    UnalignedWindow { window: u32, sampling: u32 },

    #[error("state dimension must be at least 1")]
    ZeroStateDim,

    #[error("unscented parameter {name} must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("L + mu must be positive, got {0}")]
    DegenerateScaling(f64),
}

/// Failure of a whole run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("row {row}: {source}")]
    Filter {
        row: usize,
        #[source]
        source: FilterError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace serialization error: {0}")]
    Trace(#[from] serde_json::Error),
}
