//! Backend Error Types
//!
//! Every failure a backend can report while initializing or while
//! building a job invocation. All of them are fatal to the invocation
//! being built; retry policy belongs to the hosting engine.

use thiserror::Error;

use crate::runtime::CoercionError;

/// Errors raised by the cluster backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Invalid or missing required setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A declared runtime value has the wrong type.
    #[error(transparent)]
    TypeCoercion(#[from] CoercionError),

    /// The `extra_args` string of a scheduler section could not be split.
    #[error("malformed extra_args in [{section}] ({reason}): {value}")]
    MalformedExtraArgs {
        section: String,
        value: String,
        reason: String,
    },

    /// No backend is registered under the requested name.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("failed to parse configuration file: {0}")]
    ConfigParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for BackendError {
    fn from(err: serde_yaml::Error) -> Self {
        BackendError::ConfigParse(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::ConfigParse(err.to_string())
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message() {
        let err = BackendError::Configuration("image_cache is not writable".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: image_cache is not writable"
        );
    }

    #[test]
    fn test_coercion_is_transparent() {
        let inner = CoercionError::new("String", "Array");
        let expected = inner.to_string();
        let err: BackendError = inner.into();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_malformed_extra_args_message() {
        let err = BackendError::MalformedExtraArgs {
            section: "grid".to_string(),
            value: "-l 'h_vmem".to_string(),
            reason: "unterminated single quote".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("[grid]"));
        assert!(msg.contains("unterminated single quote"));
    }

    #[test]
    fn test_yaml_error_converts() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("{ not: [a list").unwrap_err();
        let err: BackendError = yaml_err.into();
        assert!(matches!(err, BackendError::ConfigParse(_)));
    }
}
