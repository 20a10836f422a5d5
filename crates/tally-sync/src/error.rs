//! # Bridge Error Types
//!
//! Error types for switcher fetches, gateway commands and configuration.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bridge Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │    Network      │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  AuthenticationRejected │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  CommandRejected        │ │
//! │  │  ConfigLoad/Save│  │  HttpStatus     │  │  MalformedResponse      │ │
//! │  └─────────────────┘  └─────────────────┘  │  DigestChallenge        │ │
//! │                                             └─────────────────────────┘ │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │   Validation    │  │    Internal     │                              │
//! │  │  (tally-core)   │  │  CyclePanicked  │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is fatal to the running scheduler: a failed cycle becomes an
//! `Error: ...` status and the next tick tries again. Only configuration
//! errors at startup stop the process.

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge error type covering every failure the sync engine can observe.
#[derive(Debug, Error)]
pub enum BridgeError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid bridge configuration.
    #[error("Invalid bridge configuration: {0}")]
    InvalidConfig(String),

    /// Invalid switcher URL.
    #[error("Invalid switcher URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Network Errors
    // =========================================================================
    /// Could not reach the switcher or the gateway.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation did not finish in time.
    #[error("{operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u64 },

    /// Switcher answered with a non-success HTTP status.
    #[error("Switcher returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// Gateway refused the authentication request.
    #[error("Gateway rejected authentication: {0}")]
    AuthenticationRejected(String),

    /// Gateway replied to a function-value-change without confirming it.
    #[error("Gateway rejected command: {0}")]
    CommandRejected(String),

    /// A switcher document could not be parsed.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The digest challenge was missing or could not be answered.
    #[error("Digest authentication failed: {0}")]
    DigestChallenge(String),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Mapping or identifier input was malformed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A sync cycle panicked and was caught at the cycle boundary.
    #[error("Sync cycle panicked: {0}")]
    CyclePanicked(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for BridgeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => BridgeError::Validation(v),
            other => BridgeError::InvalidConfig(other.to_string()),
        }
    }
}

impl From<url::ParseError> for BridgeError {
    fn from(err: url::ParseError) -> Self {
        BridgeError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            BridgeError::HttpStatus {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            BridgeError::ConnectionFailed(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for BridgeError {
    fn from(err: quick_xml::Error) -> Self {
        BridgeError::MalformedResponse(err.to_string())
    }
}

impl From<digest_auth::Error> for BridgeError {
    fn from(err: digest_auth::Error) -> Self {
        BridgeError::DigestChallenge(err.to_string())
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for BridgeError {
    fn from(err: toml::de::Error) -> Self {
        BridgeError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for BridgeError {
    fn from(err: toml::ser::Error) -> Self {
        BridgeError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl BridgeError {
    /// Returns true if the next cycle may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::ConnectionFailed(_)
                | BridgeError::Timeout { .. }
                | BridgeError::HttpStatus { .. }
                | BridgeError::CommandRejected(_)
                | BridgeError::AuthenticationRejected(_)
                | BridgeError::MalformedResponse(_)
                | BridgeError::CyclePanicked(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BridgeError::InvalidConfig(_)
                | BridgeError::InvalidUrl(_)
                | BridgeError::ConfigLoadFailed(_)
                | BridgeError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if a peer answered in a way the protocol does not accept.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            BridgeError::AuthenticationRejected(_)
                | BridgeError::CommandRejected(_)
                | BridgeError::MalformedResponse(_)
                | BridgeError::DigestChallenge(_)
        )
    }

    pub(crate) fn timeout(operation: &str, duration: std::time::Duration) -> Self {
        BridgeError::Timeout {
            operation: operation.to_string(),
            millis: duration.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(BridgeError::ConnectionFailed("refused".into()).is_retryable());
        assert!(BridgeError::timeout("gateway read", std::time::Duration::from_secs(2))
            .is_retryable());
        assert!(BridgeError::CommandRejected("<nack/>".into()).is_retryable());

        assert!(!BridgeError::InvalidConfig("bad".into()).is_retryable());
        assert!(!BridgeError::InvalidUrl("nope".into()).is_retryable());
    }

    #[test]
    fn test_categories() {
        assert!(BridgeError::ConfigLoadFailed("x".into()).is_config_error());
        assert!(BridgeError::DigestChallenge("no nonce".into()).is_protocol_error());
        assert!(!BridgeError::ConnectionFailed("x".into()).is_protocol_error());
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::timeout("gateway read", std::time::Duration::from_millis(2000));
        assert_eq!(err.to_string(), "gateway read timed out after 2000 ms");

        let err = BridgeError::HttpStatus {
            status: 503,
            url: "http://switcher/v1/dictionary?key=tally".into(),
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_validation_error_is_transparent() {
        let err: BridgeError = ValidationError::Required {
            field: "unit id".into(),
        }
        .into();
        assert_eq!(err.to_string(), "unit id is required");
    }
}
