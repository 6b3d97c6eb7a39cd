//! Error types for persona-core

use thiserror::Error;

use crate::validator::Violation;

pub type Result<T> = std::result::Result<T, PersonaError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigInvalid = 100,
    ConfigUnreadable = 101,

    // Consistency errors (2xx) - profile must not be published
    ProfileInconsistent = 200,

    // Transport errors (3xx) - consumer fails closed
    TransportDecode = 300,
    TransportEncode = 301,
    SchemaMismatch = 302,

    // Entropy errors (4xx)
    EntropyUnavailable = 400,
}

/// Main error type for the consistency engine
#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile is inconsistent after repair: {}", describe(.0))]
    Inconsistent(Vec<Violation>),

    #[error("Transport document could not be decoded: {0}")]
    TransportDecode(#[source] serde_json::Error),

    #[error("Transport document could not be encoded: {0}")]
    TransportEncode(#[source] serde_json::Error),

    #[error("Unsupported transport schema version {found} (expected {expected})")]
    SchemaMismatch { found: u32, expected: u32 },

    #[error("Entropy source unavailable: {0}")]
    Entropy(String),
}

fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PersonaError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            PersonaError::Config(_) => ErrorCode::ConfigInvalid,
            PersonaError::Io { .. } => ErrorCode::ConfigUnreadable,
            PersonaError::Inconsistent(_) => ErrorCode::ProfileInconsistent,
            PersonaError::TransportDecode(_) => ErrorCode::TransportDecode,
            PersonaError::TransportEncode(_) => ErrorCode::TransportEncode,
            PersonaError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            PersonaError::Entropy(_) => ErrorCode::EntropyUnavailable,
        }
    }

    /// Whether the session must not start.
    ///
    /// A self-contradictory profile or an undecodable transport document
    /// is worse than no profile at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PersonaError::Inconsistent(_)
                | PersonaError::TransportDecode(_)
                | PersonaError::SchemaMismatch { .. }
                | PersonaError::Entropy(_)
        )
    }

    /// Whether this error requires a configuration or override change
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            PersonaError::Config(_) | PersonaError::Io { .. } | PersonaError::Inconsistent(_)
        )
    }

    /// Violations carried by an inconsistency error, if any
    pub fn violations(&self) -> &[Violation] {
        match self {
            PersonaError::Inconsistent(v) => v,
            _ => &[],
        }
    }
}
