//! # Persona WASM Sandbox
//!
//! The in-page half of the fingerprint consistency engine, compiled to
//! WebAssembly.
//!
//! The host builds one `FingerprintProfile` per session with `persona-core`
//! and hands the page its transport document. This crate decodes that
//! document, refuses it if it does not validate, and installs API overrides
//! that answer every read from the same profile and the same noise streams
//! the host uses.
//!
//! ## Architecture
//!
//! ```text
//! Host (persona-core)
//!   ↓ transport document (JSON)
//! apply_fingerprint_profile (WASM)
//!   ↓ decode + validate, fail closed
//! fingerprint_defense::*  (navigator, screen, timezone, canvas, webgl,
//!                          audio, fonts, performance)
//!   ↓
//! persona_core::noise
//! ```

use persona_core::{
    build_profile, propagation, EngineConfig, ProfileOverrides, RootSeed,
};
use wasm_bindgen::prelude::*;

pub mod error;
pub mod fingerprint_defense;

pub use error::{DefenseError, ErrorCode, ErrorInfo, Result};
pub use fingerprint_defense::profile::DefenseConfig;

/// Initialize the sandbox
///
/// This sets up logging.
#[wasm_bindgen(start)]
pub fn init() {
    // A second module instance in the same realm already owns the logger.
    if console_log::init_with_level(log::Level::Info).is_ok() {
        log::info!("Persona WASM sandbox initialized");
    }
}

/// Build a transport document inside the page.
///
/// Used when the page itself plays the host role (standalone demos, workers
/// that spawn their own sandboxes). Omitting `seed` draws a fresh one from
/// the browser's entropy source.
///
/// ```javascript
/// const doc = build_profile_document(424242n, "DE", { locale: "de-AT" }, undefined);
/// apply_fingerprint_profile(doc);
/// ```
#[wasm_bindgen]
pub fn build_profile_document(
    seed: Option<u64>,
    geography: &str,
    overrides: JsValue,
    config: JsValue,
) -> std::result::Result<String, JsValue> {
    build_document(seed, geography, overrides, config).map_err(to_js_error)
}

fn build_document(
    seed: Option<u64>,
    geography: &str,
    overrides: JsValue,
    config: JsValue,
) -> Result<String> {
    let overrides: ProfileOverrides = from_optional(overrides)?;
    let config: EngineConfig = from_optional(config)?;
    config.validate()?;

    let root = match seed {
        Some(value) => RootSeed::from_u64(value),
        None => RootSeed::generate()?,
    };

    let build = build_profile(&root, geography, &overrides, &config)?;
    for event in &build.events {
        log::warn!("⚠️ {}", event);
    }
    Ok(propagation::encode(&build.profile)?)
}

fn from_optional<T>(value: JsValue) -> Result<T>
where
    T: Default + serde::de::DeserializeOwned,
{
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| DefenseError::Options(e.to_string()))
}

/// Describe an error for JavaScript as a plain `ErrorInfo` object.
pub(crate) fn to_js_error(err: DefenseError) -> JsValue {
    log::error!("❌ {}", err);
    serde_wasm_bindgen::to_value(&ErrorInfo::from(&err)).unwrap_or_else(|_| err.into())
}
