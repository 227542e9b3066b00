//! Orchestra Error Types
//!
//! This module defines a layered error hierarchy:
//! - `DomainError`: configuration and vocabulary failures
//! - `InfraError`: sockets, IO and JSON failures
//! - `OrchestraError`: top-level error that wraps both categories
//!
//! Datagram decode failures live in [`crate::protocol::DecodeError`] because the
//! ingestor always recovers from them locally.

use std::io;
use thiserror::Error;

/// Domain-level errors representing invalid input or configuration
#[derive(Debug, Error)]
pub enum DomainError {
    /// Configuration file not found at the specified path
    #[error("Config not found: {path}")]
    ConfigNotFound { path: String },
    /// Configuration validation failed
    #[error("Config invalid [{field}]: {reason}")]
    ConfigInvalid { field: String, reason: String },
    /// Configuration parsing failed
    #[error("Config parse error: {message}")]
    ConfigParse { message: String },
    /// Instrument name is not part of the vocabulary
    #[error("Unknown instrument: {name}")]
    UnknownInstrument { name: String },
}

/// Infrastructure-level errors representing socket and IO failures
#[derive(Debug, Error)]
pub enum InfraError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// A socket could not be bound at startup
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    /// Joining the multicast group failed at startup
    #[error("Failed to join multicast group {group}: {source}")]
    JoinMulticast {
        group: String,
        #[source]
        source: io::Error,
    },
    /// A socket that was working stopped being usable
    #[error("Socket {socket} is no longer usable: {source}")]
    SocketUnusable {
        socket: String,
        #[source]
        source: io::Error,
    },
}

impl InfraError {
    pub fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    pub fn join_multicast(group: impl Into<String>, source: io::Error) -> Self {
        Self::JoinMulticast {
            group: group.into(),
            source,
        }
    }

    pub fn socket_unusable(socket: impl Into<String>, source: io::Error) -> Self {
        Self::SocketUnusable {
            socket: socket.into(),
            source,
        }
    }
}

/// Top-level error type for Orchestra
///
/// Wraps domain and infrastructure errors so binaries can return one type
/// while callers can still match on the specific category.
#[derive(Debug, Error)]
pub enum OrchestraError {
    /// Configuration or vocabulary error
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Socket/IO error
    #[error(transparent)]
    Infra(#[from] InfraError),
    /// Generic error for edge cases
    #[error("Error: {0}")]
    Other(String),
}

// Convenience conversions from infrastructure error sources
impl From<io::Error> for OrchestraError {
    fn from(err: io::Error) -> Self {
        Self::Infra(InfraError::Io(err))
    }
}

impl From<serde_json::Error> for OrchestraError {
    fn from(err: serde_json::Error) -> Self {
        Self::Infra(InfraError::Json(err))
    }
}

impl OrchestraError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigNotFound { path: path.into() })
    }

    pub fn config_parse_error(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigParse {
            message: message.into(),
        })
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Domain(DomainError::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// True when the error came from a socket that failed after startup.
    ///
    /// Supervisors use this to tell a crashed loop apart from a bad deployment.
    pub fn is_runtime_failure(&self) -> bool {
        matches!(self, Self::Infra(InfraError::SocketUnusable { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_layers() {
        let err = OrchestraError::config_invalid("auditor.tcp_port", "must not be empty");
        assert_eq!(
            err.to_string(),
            "Config invalid [auditor.tcp_port]: must not be empty"
        );

        let io = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        let err: OrchestraError = InfraError::bind("0.0.0.0:2205", io).into();
        assert!(err.to_string().contains("Failed to bind 0.0.0.0:2205"));
        assert!(!err.is_runtime_failure());
    }

    #[test]
    fn test_runtime_failure_is_distinguishable() {
        let io = io::Error::new(io::ErrorKind::NotConnected, "closed");
        let err: OrchestraError = InfraError::socket_unusable("udp", io).into();
        assert!(err.is_runtime_failure());
    }
}
