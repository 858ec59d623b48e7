//! Error taxonomy shared by every core component
//!
//! Errors are `Clone` so that a strategy whose load failed can hand the
//! recorded failure back to every later caller instead of retrying.

use thiserror::Error;

/// Result alias used throughout the core
pub type Result<T, E = ForecastError> = std::result::Result<T, E>;

/// Errors raised by the registry, encoders, assembler and strategies
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Unknown strategy name, store, or data segment
    #[error("{what} not found{}", format_available(.available))]
    NotFound { what: String, available: Vec<String> },

    /// Missing feature column or malformed request field
    #[error("Validation error: {0}")]
    Validation(String),

    /// No strategy name supplied and no default registered
    #[error("No default strategy set and no strategy name provided")]
    NotConfigured,

    /// Optional runtime for a strategy could not be initialized
    #[error("Strategy '{strategy}' is unavailable: {reason}")]
    Unavailable { strategy: String, reason: String },

    /// Required artifact missing, unreadable, or inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Runtime failure while scoring a loaded model
    #[error("Inference error: {0}")]
    Inference(String),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        String::new()
    } else {
        format!(". Available: [{}]", available.join(", "))
    }
}

impl ForecastError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            available: Vec::new(),
        }
    }

    pub fn not_found_among(what: impl Into<String>, available: Vec<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            available,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unavailable(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the request rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Validation(_) | Self::NotConfigured
        )
    }

    /// Stable machine-readable kind, used for metric labels and API error codes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::NotConfigured => "not_configured",
            Self::Unavailable { .. } => "unavailable",
            Self::Configuration(_) => "configuration",
            Self::Inference(_) => "inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_alternatives() {
        let err = ForecastError::not_found_among(
            "Strategy 'xgboost'",
            vec!["linear".to_string(), "dnn".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "Strategy 'xgboost' not found. Available: [linear, dnn]"
        );
    }

    #[test]
    fn test_not_found_without_alternatives() {
        let err = ForecastError::not_found("Store 99");
        assert_eq!(err.to_string(), "Store 99 not found");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ForecastError::NotConfigured.is_client_error());
        assert!(ForecastError::validation("bad week").is_client_error());
        assert!(!ForecastError::unavailable("dnn", "no runtime").is_client_error());
        assert!(!ForecastError::configuration("no folds").is_client_error());
    }
}
