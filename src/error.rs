//! Error types for the persona sandbox
//!
//! Mirrors the engine's error taxonomy for JavaScript callers:
//! - Numeric error codes grouped by concern
//! - Fatal vs recoverable classification
//! - User-facing messages and recovery suggestions

use persona_core::PersonaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, DefenseError>;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigInvalid = 100,
    OptionsInvalid = 101,

    // Consistency errors (2xx) - FATAL
    ProfileInconsistent = 200,

    // Transport errors (3xx) - FATAL, sandbox fails closed
    TransportDecode = 300,
    TransportEncode = 301,
    SchemaMismatch = 302,

    // Entropy errors (4xx) - FATAL
    EntropyUnavailable = 400,

    // Browser API errors (5xx)
    ApiUnavailable = 500,
    InstallFailed = 501,
    AlreadyApplied = 502,

    // Internal errors (9xx)
    InternalError = 900,
}

/// Main error type for the sandbox
#[derive(Error, Debug)]
pub enum DefenseError {
    // ===== Engine Errors =====
    #[error(transparent)]
    Engine(#[from] PersonaError),

    // ===== Configuration Errors =====
    #[error("Invalid defense options: {0}")]
    Options(String),

    // ===== Browser API Errors =====
    #[error("Browser API unavailable: {0}")]
    ApiUnavailable(String),

    #[error("Failed to install {defense} defense: {reason}")]
    InstallFailed { defense: String, reason: String },

    #[error("A different profile is already applied to this page")]
    AlreadyApplied,

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DefenseError {
    /// Get the error code for programmatic handling
    pub fn code(&self) -> ErrorCode {
        match self {
            DefenseError::Engine(e) => match e.code() {
                persona_core::ErrorCode::ConfigInvalid
                | persona_core::ErrorCode::ConfigUnreadable => ErrorCode::ConfigInvalid,
                persona_core::ErrorCode::ProfileInconsistent => ErrorCode::ProfileInconsistent,
                persona_core::ErrorCode::TransportDecode => ErrorCode::TransportDecode,
                persona_core::ErrorCode::TransportEncode => ErrorCode::TransportEncode,
                persona_core::ErrorCode::SchemaMismatch => ErrorCode::SchemaMismatch,
                persona_core::ErrorCode::EntropyUnavailable => ErrorCode::EntropyUnavailable,
            },
            DefenseError::Options(_) => ErrorCode::OptionsInvalid,
            DefenseError::ApiUnavailable(_) => ErrorCode::ApiUnavailable,
            DefenseError::InstallFailed { .. } => ErrorCode::InstallFailed,
            DefenseError::AlreadyApplied => ErrorCode::AlreadyApplied,
            DefenseError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the sandbox must stay unpatched.
    ///
    /// A sandbox that cannot trust its transport document installs nothing.
    pub fn is_fatal(&self) -> bool {
        match self {
            DefenseError::Engine(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Whether installing again on this page, with different options, can
    /// succeed. Only errors raised before any API was patched qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DefenseError::Options(_) | DefenseError::ApiUnavailable(_)
        )
    }

    /// Get a user-friendly message for display
    pub fn user_message(&self) -> String {
        match self {
            DefenseError::Engine(e) => match e {
                PersonaError::Config(_) | PersonaError::Io { .. } => {
                    "The engine configuration is invalid. Please check your settings.".into()
                }
                PersonaError::Inconsistent(_) => {
                    "⚠️ The profile contradicts itself. Defenses were not installed.".into()
                }
                PersonaError::TransportDecode(_) | PersonaError::SchemaMismatch { .. } => {
                    "⚠️ The profile document could not be read. Defenses were not installed."
                        .into()
                }
                PersonaError::TransportEncode(_) => {
                    "The profile could not be serialized. Please report this bug.".into()
                }
                PersonaError::Entropy(_) => {
                    "⚠️ Random number generation failed. Do not continue!".into()
                }
            },
            DefenseError::Options(_) => {
                "Invalid defense options. Pass an object of boolean toggles.".into()
            }
            DefenseError::ApiUnavailable(_) => {
                "A required browser API is unavailable in this context.".into()
            }
            DefenseError::InstallFailed { defense, .. } => {
                format!("The {} defense could not be installed.", defense)
            }
            DefenseError::AlreadyApplied => {
                "This page already carries another profile.".into()
            }
            DefenseError::Internal(_) => {
                "An internal error occurred. Please report this bug.".into()
            }
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> String {
        match self {
            err if err.is_fatal() => {
                "Regenerate the profile document on the host and reload the page.".into()
            }
            DefenseError::Engine(PersonaError::Config(_)) => {
                "Fix the engine configuration and build the profile again.".into()
            }
            DefenseError::Options(_) => {
                "Use `{ canvas: true, webgl: false, ... }` with boolean values only.".into()
            }
            DefenseError::ApiUnavailable(_) => {
                "Disable the defense that needs this API and apply again.".into()
            }
            DefenseError::InstallFailed { defense, .. } => format!(
                "Reload the page, then apply with the {} defense disabled.",
                defense
            ),
            DefenseError::AlreadyApplied => {
                "Reload the page to switch profiles; a page keeps one profile for its lifetime.".into()
            }
            _ => "Please try again. If the problem persists, report a bug.".into(),
        }
    }

    /// Wrap a JavaScript exception raised while installing `defense`
    pub fn install(defense: &str, err: JsValue) -> Self {
        DefenseError::InstallFailed {
            defense: defense.to_string(),
            reason: describe_js(&err),
        }
    }
}

fn describe_js(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| js_sys::JSON::stringify(err).ok().and_then(|s| s.as_string()))
        .unwrap_or_else(|| "unknown".into())
}

impl From<JsValue> for DefenseError {
    fn from(err: JsValue) -> Self {
        DefenseError::Internal(describe_js(&err))
    }
}

impl From<DefenseError> for JsValue {
    fn from(err: DefenseError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Error information for JavaScript consumption
#[derive(Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: u32,
    pub message: String,
    pub user_message: String,
    pub recovery_suggestion: String,
    pub is_fatal: bool,
    pub is_retryable: bool,
}

impl From<&DefenseError> for ErrorInfo {
    fn from(err: &DefenseError) -> Self {
        ErrorInfo {
            code: err.code() as u32,
            message: err.to_string(),
            user_message: err.user_message(),
            recovery_suggestion: err.recovery_suggestion(),
            is_fatal: err.is_fatal(),
            is_retryable: err.is_retryable(),
        }
    }
}
