//! Error types for the enrollment client.
//!
//! This module defines every error that can occur while generating keys,
//! talking to certgen issuers, and persisting the results. Errors fall into
//! two groups: fatal errors that terminate an enrollment, and per-candidate
//! errors that the failover controller records and moves past.

use thiserror::Error;

use crate::types::CandidateFailure;

/// Result type alias using [`EnrollError`].
pub type Result<T> = std::result::Result<T, EnrollError>;

/// Errors that can occur during enrollment.
#[derive(Debug, Error)]
pub enum EnrollError {
    /// Configuration is missing, unparsable, or names no usable issuer.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key generation or key storage failed.
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    /// TLS configuration error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTP transport error (connect, timeout, read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login was rejected by the issuer.
    #[error("Login rejected with status {status}")]
    LoginRejected {
        /// HTTP status code.
        status: u16,
    },

    /// Login succeeded but the issuer did not hand out any session cookie.
    #[error("No session cookies in login response")]
    NoSessionTokens,

    /// The issuer returned a non-success status for a certificate request.
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error body from the issuer.
        message: String,
    },

    /// URL parsing or construction error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Every candidate issuer failed.
    #[error("Failed to get certificate from any of {} issuer(s)", failures.len())]
    Exhausted {
        /// One entry per attempted candidate, in the order attempted.
        failures: Vec<CandidateFailure>,
    },

    /// Writing the final certificate to disk failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnrollError {
    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a key generation error with the given message.
    pub fn key_generation(msg: impl Into<String>) -> Self {
        Self::KeyGeneration(msg.into())
    }

    /// Create a TLS error with the given message.
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a login rejected error.
    pub fn login_rejected(status: u16) -> Self {
        Self::LoginRejected { status }
    }

    /// Create a server error with status and message.
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }

    /// Create a persistence error with the given message.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Returns true if this error terminates the whole enrollment.
    ///
    /// Everything else is scoped to a single candidate issuer and is
    /// absorbed by the failover controller.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::KeyGeneration(_)
                | Self::Tls(_)
                | Self::Exhausted { .. }
                | Self::Persistence(_)
        )
    }

    /// Returns the per-candidate failures if this is an exhaustion error.
    pub fn failures(&self) -> Option<&[CandidateFailure]> {
        match self {
            Self::Exhausted { failures } => Some(failures),
            _ => None,
        }
    }
}
