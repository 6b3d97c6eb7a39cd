//! Screen and Window Dimensions (Tier 1: Identity)
//!
//! Reports the profile's display. Inner window dimensions follow the real
//! layout viewport and are left alone.

use persona_core::FingerprintProfile;
use wasm_bindgen::prelude::*;

use super::proxy_helpers;

pub fn apply(profile: &FingerprintProfile) -> Result<(), JsValue> {
    let global = js_sys::global();
    let screen = proxy_helpers::get_global("screen")?;

    if !proxy_helpers::is_missing(&screen) {
        apply_to_screen(&screen, profile)?;
    }

    apply_to_window(&global, profile)
}

/// Apply screen defenses to a specific screen object.
pub fn apply_to_screen(screen: &JsValue, profile: &FingerprintProfile) -> Result<(), JsValue> {
    let s = &profile.screen;
    let screen_props: [(&str, f64); 8] = [
        ("width", s.width as f64),
        ("height", s.height as f64),
        ("availWidth", s.avail_width as f64),
        ("availHeight", s.avail_height as f64),
        ("colorDepth", s.color_depth as f64),
        ("pixelDepth", s.color_depth as f64),
        ("availLeft", 0.0),
        ("availTop", 0.0),
    ];

    for (prop, value) in screen_props {
        proxy_helpers::patch_constant(screen, prop, JsValue::from_f64(value))?;
    }

    Ok(())
}

/// Apply window dimension defenses: a maximized window on the profile's screen.
pub fn apply_to_window(window: &JsValue, profile: &FingerprintProfile) -> Result<(), JsValue> {
    let s = &profile.screen;
    let window_props: [(&str, f64); 7] = [
        ("devicePixelRatio", s.pixel_ratio),
        ("outerWidth", s.avail_width as f64),
        ("outerHeight", s.avail_height as f64),
        ("screenX", 0.0),
        ("screenY", 0.0),
        ("screenLeft", 0.0),
        ("screenTop", 0.0),
    ];

    for (prop, value) in window_props {
        proxy_helpers::patch_constant(window, prop, JsValue::from_f64(value))?;
    }

    Ok(())
}
