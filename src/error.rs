// src/error.rs

/// Result type used throughout the pipetwin library
pub type TwinResult<T> = Result<T, TwinError>;

/// All possible errors that can occur in the pipetwin library
#[derive(thiserror::Error, Debug)]
pub enum TwinError {
    /// Malformed or out-of-range numeric input (negative rates, zero max-rate, ...)
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Unrecognized scheduling policy token
    #[error("Unknown scheduling policy '{policy}' (expected fifo, lifo or random)")]
    InvalidPolicy { policy: String },

    /// Forecast date range is inverted
    #[error("Invalid forecast range: {to} is before {from}")]
    InvalidRange { from: String, to: String },

    /// SLA evaluation or summary requested on a zero-length series
    #[error("Cannot evaluate an empty result series")]
    EmptySeries,

    /// Malformed serialized model (unknown discriminant tag, missing field, ...)
    #[error("Codec error: {message}")]
    Codec { message: String },

    /// Run was aborted between two time-steps
    #[error("Simulation cancelled after {completed_steps} steps")]
    Cancelled { completed_steps: usize },

    /// The external store failed or did not hold the requested entry
    #[error("Store error for '{key}': {message}")]
    Store { key: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Serialization errors outside the model codec
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Generic error for unexpected situations
    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

/// Helper methods for creating common errors
impl TwinError {
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn invalid_policy<S: Into<String>>(policy: S) -> Self {
        Self::InvalidPolicy {
            policy: policy.into(),
        }
    }

    pub fn invalid_range<F: ToString, T: ToString>(from: F, to: T) -> Self {
        Self::InvalidRange {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn codec<S: Into<String>>(message: S) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    pub fn store<K: Into<String>, S: Into<String>>(key: K, message: S) -> Self {
        Self::Store {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unexpected<S: Into<String>>(message: S) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }
}

/// Convert from a panicked or aborted batch worker
impl From<tokio::task::JoinError> for TwinError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Unexpected {
            message: format!("Simulation worker failed: {}", error),
        }
    }
}

/// Convert from TOML parse errors
#[cfg(feature = "config-toml")]
impl From<toml::de::Error> for TwinError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config {
            message: format!("Invalid TOML: {}", error),
        }
    }
}

/// Reject NaN, infinities and negative values
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> TwinResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(TwinError::invalid_parameter(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Reject NaN, infinities, zero and negative values
pub(crate) fn ensure_positive(name: &str, value: f64) -> TwinResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TwinError::invalid_parameter(format!(
            "{} must be a finite positive number, got {}",
            name, value
        )));
    }
    Ok(())
}
