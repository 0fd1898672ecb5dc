// SPDX-FileCopyrightText: 2026 Hookwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Hookwire gateway.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`HookwireError`], used by the HTTP layer to
/// pick a status code and by background tasks to decide whether to log loudly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller asked for something the current state does not allow.
    Caller,
    /// An I/O failure talking to storage, the protocol, the filesystem, or a webhook.
    Transient,
    /// Misconfiguration or a bug.
    Internal,
}

/// The primary error type used across all Hookwire crates.
#[derive(Debug, Error)]
pub enum HookwireError {
    /// Configuration errors detected at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Tenant store failures (connection, query, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Protocol client failures (connect, pairing, download, logout).
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound webhook delivery failures.
    #[error("webhook delivery failed: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local filesystem failures while persisting attachments or dumps.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No live session is registered for the tenant.
    #[error("No session")]
    NoSession,

    /// A live session already exists for the tenant.
    #[error("Already Connected")]
    AlreadyConnected,

    /// The session exists but the protocol connection is not open.
    #[error("Not connected")]
    NotConnected,

    /// The session exists but has no linked identity.
    #[error("Not logged in")]
    NotLoggedIn,

    /// Phone pairing was requested for an already linked session.
    #[error("Already paired")]
    AlreadyPaired,

    /// A pairing artifact was requested for an already linked session.
    #[error("Already Loggedin")]
    AlreadyLoggedIn,

    /// The operation is not valid for the session's current lifecycle state.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// A lifecycle transition that the state machine does not allow.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The bearer token did not resolve to a tenant.
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed caller input.
    #[error("{0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HookwireError {
    /// Shorthand for a protocol error without an underlying source.
    pub fn protocol(message: impl Into<String>) -> Self {
        HookwireError::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a delivery error without an underlying source.
    pub fn delivery(message: impl Into<String>) -> Self {
        HookwireError::Delivery {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an I/O error together with the path it concerned.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HookwireError::Io {
            path: path.into(),
            source,
        }
    }

    /// Classifies this error for callers that need to map it onto a response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HookwireError::NoSession
            | HookwireError::AlreadyConnected
            | HookwireError::NotConnected
            | HookwireError::NotLoggedIn
            | HookwireError::AlreadyPaired
            | HookwireError::AlreadyLoggedIn
            | HookwireError::InvalidState(_)
            | HookwireError::InvalidTransition { .. }
            | HookwireError::Unauthorized
            | HookwireError::Validation(_) => ErrorKind::Caller,
            HookwireError::Storage { .. }
            | HookwireError::Protocol { .. }
            | HookwireError::Delivery { .. }
            | HookwireError::Io { .. }
            | HookwireError::Timeout { .. } => ErrorKind::Transient,
            HookwireError::Config(_) | HookwireError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_classified_as_caller() {
        assert_eq!(HookwireError::NoSession.kind(), ErrorKind::Caller);
        assert_eq!(HookwireError::AlreadyPaired.kind(), ErrorKind::Caller);
        assert_eq!(
            HookwireError::InvalidTransition {
                from: "connected".into(),
                to: "awaiting_pairing".into(),
            }
            .kind(),
            ErrorKind::Caller
        );
    }

    #[test]
    fn io_failures_are_transient() {
        let err = HookwireError::io("/tmp/x", std::io::Error::other("disk full"));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.to_string().contains("/tmp/x"));
        assert_eq!(HookwireError::delivery("503").kind(), ErrorKind::Transient);
    }

    #[test]
    fn caller_messages_are_human_readable() {
        assert_eq!(HookwireError::NoSession.to_string(), "No session");
        assert_eq!(HookwireError::AlreadyLoggedIn.to_string(), "Already Loggedin");
        assert_eq!(
            HookwireError::Validation("Missing Phone in Payload".into()).to_string(),
            "Missing Phone in Payload"
        );
    }
}
