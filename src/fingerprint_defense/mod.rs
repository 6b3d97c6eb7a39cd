//! Rust/WASM Fingerprint Defense Module
//!
//! Installs the sandbox half of a persona. The page receives the host's
//! transport document, and every probing API then answers from that one
//! profile. Noise is drawn from the same sub-seeds, with the same algorithm,
//! as the host's own call sites.
//! All API overrides are WASM closures that natively return `"[native code]"`
//! from `Function.prototype.toString()`.
//!
//! ## Usage
//!
//! ```javascript
//! import init, { apply_fingerprint_profile } from './pkg/persona_wasm.js';
//! await init();
//! apply_fingerprint_profile(doc);                                  // Everything
//! apply_fingerprint_profile(doc, { canvas: true, audio: false });  // Selective
//! ```
//!
//! A document that fails to decode, carries another schema version, or does
//! not validate installs nothing: the call throws an `ErrorInfo` object and
//! the page keeps its real values.

use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use persona_core::{propagation, FingerprintProfile};
use wasm_bindgen::prelude::*;

use crate::error::DefenseError;

pub mod iframe_observer;
pub mod profile;
pub mod proxy_helpers;
pub mod tier1_canvas;
pub mod tier1_navigator;
pub mod tier1_screen;
pub mod tier1_webgl;
pub mod tier2_audio;
pub mod tier2_fonts;
pub mod tier2_performance;
pub mod tier2_timezone;

use profile::DefenseConfig;

/// Apply the defenses for a transport document. Each category can be
/// individually toggled.
///
/// Pass a JS object with boolean fields to selectively enable/disable defenses:
/// ```javascript
/// apply_fingerprint_profile(doc, { canvas: true, timezone: false });
/// ```
///
/// Returns `{ applied: string[], count: number, profile: object }`.
#[wasm_bindgen]
pub fn apply_fingerprint_profile(document: &str, options: JsValue) -> Result<JsValue, JsValue> {
    install(document, options).map_err(crate::to_js_error)
}

fn install(document: &str, options: JsValue) -> crate::Result<JsValue> {
    let config: DefenseConfig = if options.is_undefined() || options.is_null() {
        DefenseConfig::default()
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| DefenseError::Options(e.to_string()))?
    };

    // Fail closed: nothing is patched unless the document decodes and validates
    let profile = Rc::new(propagation::decode(document)?);

    if let profile::Admission::Repeat(active) = profile::admit(&profile, &config)? {
        return build_result(&active, &[]).map_err(DefenseError::from);
    }
    preflight(&config)?;

    let applied = install_defenses(&profile, &config).map_err(|err| {
        profile::mark_broken(&err);
        err
    })?;
    profile::publish(Rc::clone(&profile), config);

    log::info!(
        "🎭 Persona applied: {} / {} / {} ({} defenses)",
        profile.context.geography,
        profile.context.locale,
        profile.context.timezone,
        applied.len()
    );

    build_result(&profile, &applied).map_err(DefenseError::from)
}

/// Check the APIs an install cannot proceed without, before touching anything.
fn preflight(config: &DefenseConfig) -> crate::Result<()> {
    let global = js_sys::global();
    let require = |path: &[&str]| -> crate::Result<()> {
        let mut value: JsValue = global.clone().into();
        for name in path {
            value = Reflect::get(&value, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED);
            if proxy_helpers::is_missing(&value) {
                return Err(DefenseError::ApiUnavailable(path.join(".")));
            }
        }
        Ok(())
    };

    if config.timezone {
        require(&["Intl", "DateTimeFormat"])?;
    }
    if config.frames {
        require(&["document"])?;
        require(&["MutationObserver"])?;
    }
    Ok(())
}

fn install_defenses(profile: &Rc<FingerprintProfile>, config: &DefenseConfig) -> crate::Result<Vec<&'static str>> {
    let mut applied: Vec<&'static str> = Vec::new();

    // Tier 1: Identity
    if config.navigator {
        tier1_navigator::apply(profile).map_err(|e| DefenseError::install("navigator", e))?;
        applied.push("navigator");
    }
    if config.screen {
        tier1_screen::apply(profile).map_err(|e| DefenseError::install("screen", e))?;
        applied.push("screen");
    }
    if config.canvas {
        tier1_canvas::apply(profile).map_err(|e| DefenseError::install("canvas", e))?;
        applied.push("canvas");
    }
    if config.webgl {
        tier1_webgl::apply(profile).map_err(|e| DefenseError::install("webgl", e))?;
        applied.push("webgl");
    }

    // Tier 2: Derived signals
    if config.timezone {
        tier2_timezone::apply(profile).map_err(|e| DefenseError::install("timezone", e))?;
        applied.push("timezone");
    }
    if config.audio {
        tier2_audio::apply(profile).map_err(|e| DefenseError::install("audio", e))?;
        applied.push("audio");
    }
    if config.fonts {
        tier2_fonts::apply(profile).map_err(|e| DefenseError::install("fonts", e))?;
        applied.push("fonts");
    }
    if config.performance {
        tier2_performance::apply(profile).map_err(|e| DefenseError::install("performance", e))?;
        applied.push("performance");
    }

    // Same-origin frames
    if config.frames {
        iframe_observer::start_iframe_protection(profile, config)
            .map_err(|e| DefenseError::install("frames", e))?;
        applied.push("frames");
    }

    Ok(applied)
}

/// Verify defense status: compares live values with a transport document.
///
/// Returns an object of booleans; `valid` is false when the document itself
/// does not decode.
#[wasm_bindgen]
pub fn check_defense_status(document: &str) -> JsValue {
    let status = Object::new();
    let profile = match propagation::decode(document) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("⚠️ Status check on an unusable document: {}", e);
            let _ = Reflect::set(&status, &JsValue::from_str("valid"), &JsValue::FALSE);
            return status.into();
        }
    };
    let _ = Reflect::set(&status, &JsValue::from_str("valid"), &JsValue::TRUE);

    let set = |name: &str, ok: bool| {
        let _ = Reflect::set(&status, &JsValue::from_str(name), &JsValue::from_bool(ok));
    };

    let window = web_sys::window();

    // Navigator check
    if let Some(nav) = window.as_ref().map(|w| w.navigator()) {
        set(
            "navigator",
            nav.platform().ok().as_deref() == Some(profile.browser.platform.as_str())
                && nav.user_agent().ok().as_deref() == Some(profile.browser.user_agent.as_str())
                && nav.language().as_deref() == Some(profile.context.locale.as_str())
                && nav.hardware_concurrency() == profile.hardware.hardware_concurrency as f64
                && !wasm_bindgen::JsCast::unchecked_ref::<web_sys::NavigatorAutomationInformation>(&nav).webdriver(),
        );
    }

    // Screen check
    if let Some(screen) = window.as_ref().and_then(|w| w.screen().ok()) {
        set(
            "screen",
            screen.width().ok() == Some(profile.screen.width as i32)
                && screen.height().ok() == Some(profile.screen.height as i32)
                && screen.avail_height().ok() == Some(profile.screen.avail_height as i32),
        );
    }

    // Timezone check
    let tz = js_sys::eval("Intl.DateTimeFormat().resolvedOptions().timeZone").unwrap_or(JsValue::UNDEFINED);
    set("timezone", tz.as_string().as_deref() == Some(profile.context.timezone.as_str()));

    // WebGL check
    let renderer = js_sys::eval(
        "try { var c=document.createElement('canvas'); var g=c.getContext('webgl'); \
         var e=g && g.getExtension('WEBGL_debug_renderer_info'); \
         e ? g.getParameter(e.UNMASKED_RENDERER_WEBGL) : null } catch(e) { null }",
    )
    .unwrap_or(JsValue::NULL);
    set(
        "webgl",
        renderer.as_string().as_deref() == Some(profile.gpu.renderer.as_str()),
    );

    // Performance check: two reads never run backwards
    if let Some(perf) = window.as_ref().and_then(|w| w.performance()) {
        let first = perf.now();
        set("performance", perf.now() >= first);
    }

    // Anti-detection check
    let antidetect = js_sys::eval(
        "try { var d=Object.getOwnPropertyDescriptor(navigator,'platform'); \
         d && d.get ? d.get.toString().includes('[native code]') : false } catch(e) { false }",
    )
    .unwrap_or(JsValue::FALSE);
    set("antiDetection", antidetect.as_bool() == Some(true));

    status.into()
}

/// Transport document of the installed profile, or `undefined`.
#[wasm_bindgen]
pub fn get_active_profile() -> JsValue {
    profile::active_profile()
        .and_then(|p| propagation::encode(&p).ok())
        .map(|doc| JsValue::from_str(&doc))
        .unwrap_or(JsValue::UNDEFINED)
}

fn build_result(profile: &FingerprintProfile, applied: &[&str]) -> Result<JsValue, JsValue> {
    let result = Object::new();
    let applied_arr = Array::new();
    for name in applied {
        applied_arr.push(&JsValue::from_str(name));
    }
    Reflect::set(&result, &JsValue::from_str("applied"), &applied_arr)?;
    Reflect::set(
        &result,
        &JsValue::from_str("count"),
        &JsValue::from_f64(applied.len() as f64),
    )?;
    Reflect::set(&result, &JsValue::from_str("profile"), &build_summary_object(profile)?)?;

    Ok(result.into())
}

fn build_summary_object(profile: &FingerprintProfile) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    let strings: [(&str, &str); 7] = [
        ("geography", profile.context.geography.as_str()),
        ("locale", profile.context.locale.as_str()),
        ("timezone", profile.context.timezone.as_str()),
        ("platform", profile.platform().as_str()),
        ("userAgent", profile.browser.user_agent.as_str()),
        ("webglVendor", profile.gpu.vendor.as_str()),
        ("webglRenderer", profile.gpu.renderer.as_str()),
    ];
    for (key, value) in strings {
        Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_str(value))?;
    }
    Reflect::set(
        &obj,
        &JsValue::from_str("screenWidth"),
        &JsValue::from_f64(profile.screen.width as f64),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("screenHeight"),
        &JsValue::from_f64(profile.screen.height as f64),
    )?;
    Reflect::set(
        &obj,
        &JsValue::from_str("hardwareConcurrency"),
        &JsValue::from_f64(profile.hardware.hardware_concurrency as f64),
    )?;
    Ok(obj.into())
}
