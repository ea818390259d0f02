//! Client error taxonomy
//!
//! Every fallible operation in this crate returns [`ClientError`]. The
//! variants map one-to-one onto the result codes of the C boundary
//! crate, which is why the split between `NotReady` (transient, retry)
//! and `InvalidData` (semantic rejection) is load-bearing.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors produced by data-link client operations
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not connected to a data hub")]
    NotConnected,

    #[error("Connection to '{host}' failed: {reason}")]
    ConnectionFailed { host: String, reason: String },

    #[error("No entry named '{0}' on the hub")]
    NotFound(String),

    #[error("'{name}' has not received a value yet")]
    NotReady { name: String },

    #[error("Invalid data for '{name}': {reason}")]
    InvalidData { name: String, reason: String },

    #[error("Change stream closed")]
    ChannelClosed,

    #[error("Configuration rejected")]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub fn not_ready(name: impl Into<String>) -> Self {
        ClientError::NotReady { name: name.into() }
    }

    pub fn invalid_data(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::InvalidData {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ClientError::NotConnected.to_string(),
            "Not connected to a data hub"
        );
        assert_eq!(
            ClientError::not_ready("aircraft.speed").to_string(),
            "'aircraft.speed' has not received a value yet"
        );
        assert_eq!(
            ClientError::invalid_data("gear", "expected bool, got text").to_string(),
            "Invalid data for 'gear': expected bool, got text"
        );
    }

    #[test]
    fn test_config_errors_keep_their_cause() {
        let cause = ConfigError::InvalidValue {
            field: "event_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        };
        let err = ClientError::from(cause);
        let source = std::error::Error::source(&err).expect("source retained");
        assert!(source.to_string().contains("event_capacity"));
    }
}
