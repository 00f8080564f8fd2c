use std::fmt;
use thiserror::Error;

/// Unified error type for local parameter processing
#[derive(Debug, Error)]
pub enum ParamError {
    /// A qualified or namespaced identifier does not resolve in the catalog
    #[error("Unknown parameter: {id}")]
    UnknownParameter { id: String },

    /// Single-value assignment against a parameter that is not locally sourced
    #[error("Invalid assignment to {parameter}: {reason}")]
    InvalidAssignment { parameter: String, reason: String },

    /// Supplied value cannot be represented in the declared type
    #[error("Type mismatch for {parameter}: expected {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    /// Partial update without a prior full value in the last value cache
    #[error("Received request to partially update {parameter} but it has no value in the cache")]
    MissingBaseValue { parameter: String },

    /// Member/element path that does not resolve against the declared structure
    #[error("Invalid path '{path}' for {parameter}: {reason}")]
    InvalidPath {
        parameter: String,
        path: String,
        reason: String,
    },

    /// Submission after the ordering lane has been shut down
    #[error("Ordering lane closed, cannot {operation}")]
    LaneClosed { operation: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    /// Link frame too short or otherwise undecodable
    #[error("Malformed frame on link {link}: {reason}")]
    MalformedFrame { link: String, reason: String },

    /// Serialization errors
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParamError {
    pub fn unknown_parameter(id: impl fmt::Display) -> Self {
        Self::UnknownParameter { id: id.to_string() }
    }

    pub fn invalid_assignment<P: Into<String>, R: Into<String>>(parameter: P, reason: R) -> Self {
        Self::InvalidAssignment {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    pub fn type_mismatch<P: Into<String>, E: Into<String>, A: Into<String>>(
        parameter: P,
        expected: E,
        actual: A,
    ) -> Self {
        Self::TypeMismatch {
            parameter: parameter.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_base_value<P: Into<String>>(parameter: P) -> Self {
        Self::MissingBaseValue {
            parameter: parameter.into(),
        }
    }

    pub fn invalid_path<P: Into<String>, T: Into<String>, R: Into<String>>(
        parameter: P,
        path: T,
        reason: R,
    ) -> Self {
        Self::InvalidPath {
            parameter: parameter.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn lane_closed<S: Into<String>>(operation: S) -> Self {
        Self::LaneClosed {
            operation: operation.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn malformed_frame<L: Into<String>, R: Into<String>>(link: L, reason: R) -> Self {
        Self::MalformedFrame {
            link: link.into(),
            reason: reason.into(),
        }
    }

    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether the caller can retry the same request unchanged
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Retrying makes sense once a full value has been sent
            Self::MissingBaseValue { .. } => true,
            Self::Io { .. } => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownParameter { .. } => "unknown_parameter",
            Self::InvalidAssignment { .. } => "invalid_assignment",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::MissingBaseValue { .. } => "missing_base_value",
            Self::InvalidPath { .. } => "invalid_path",
            Self::LaneClosed { .. } => "lane_closed",
            Self::Configuration { .. } => "configuration",
            Self::MalformedFrame { .. } => "malformed_frame",
            Self::Serialization { .. } => "serialization",
            Self::Io { .. } => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ParamError>;

impl From<std::io::Error> for ParamError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}

impl From<serde_json::Error> for ParamError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", err)
    }
}

impl From<serde_yaml::Error> for ParamError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::serialization("yaml", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ParamError::missing_base_value("/sys/Q");
        assert!(matches!(err, ParamError::MissingBaseValue { .. }));
        assert_eq!(err.category(), "missing_base_value");
        assert!(err.to_string().contains("/sys/Q"));
    }

    #[test]
    fn test_type_mismatch_message_carries_details() {
        let err = ParamError::type_mismatch("/sys/P", "integer(8 bits, signed)", "300");
        let msg = err.to_string();
        assert!(msg.contains("/sys/P"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("300"));
    }

    #[test]
    fn test_error_recoverability() {
        assert!(ParamError::missing_base_value("p").is_recoverable());
        assert!(!ParamError::invalid_assignment("p", "not local").is_recoverable());
        assert!(!ParamError::unknown_parameter("p").is_recoverable());
        assert!(!ParamError::configuration("bad").is_recoverable());
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: ParamError = yaml_err.into();
        assert_eq!(err.category(), "serialization");
    }
}
