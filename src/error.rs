//! Error types for the sbl crate

use thiserror::Error;

/// Main error type for the sbl crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid model variant '{input}' (expected one of: SP, AP, TP)")]
    InvalidModelVariant { input: String },

    #[error("model variant {variant} is not supported by the {learner}")]
    UnsupportedVariant { variant: String, learner: String },

    #[error("{what} has wrong dimension: expected {expected}, got {got}")]
    DimensionMismatch {
        what: String,
        expected: String,
        got: usize,
    },

    #[error("{name} must be a probability in [0, 1], got {value}")]
    InvalidProbability { name: String, value: f64 },

    #[error("transition row {context} of regime {regime} is not stochastic (sums to {sum})")]
    NonStochasticRow {
        regime: usize,
        context: usize,
        sum: f64,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("observation {observation} at t={t} is not binary")]
    NonBinaryObservation { t: usize, observation: u8 },

    #[error("sequence columns differ in length: hidden={hidden}, observations={observations}")]
    SequenceLengthMismatch { hidden: usize, observations: usize },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

impl Error {
    /// Whether this error stems from an invalid configuration rejected at construction.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidModelVariant { .. }
                | Error::UnsupportedVariant { .. }
                | Error::DimensionMismatch { .. }
                | Error::InvalidProbability { .. }
                | Error::NonStochasticRow { .. }
                | Error::InvalidConfiguration { .. }
                | Error::NonBinaryObservation { .. }
                | Error::SequenceLengthMismatch { .. }
        )
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_classified() {
        let err = Error::InvalidModelVariant {
            input: "XP".to_string(),
        };
        assert!(err.is_config_error());
        assert!(err.to_string().contains("XP"));

        let io = Error::from(std::io::Error::other("disk"));
        assert!(!io.is_config_error());
    }
}
