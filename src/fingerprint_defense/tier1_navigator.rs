//! Navigator Identity (Tier 1: Identity)
//!
//! Answers navigator reads from the profile: browser identity, locale
//! chain, hardware and the automation flag. All getters are WASM closures →
//! native toString() automatically.

use persona_core::FingerprintProfile;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;

use super::proxy_helpers;

/// Chrome reports this vendor string on every platform.
const CHROME_VENDOR: &str = "Google Inc.";

pub fn apply(profile: &FingerprintProfile) -> Result<(), JsValue> {
    let navigator = proxy_helpers::get_global("navigator")?;
    if proxy_helpers::is_missing(&navigator) {
        return Ok(());
    }

    apply_to_navigator(&navigator, profile)
}

/// Apply navigator defenses to a specific navigator object.
/// Called by both the main apply() and the frame observer.
pub fn apply_to_navigator(navigator: &JsValue, profile: &FingerprintProfile) -> Result<(), JsValue> {
    let browser = &profile.browser;
    let hardware = &profile.hardware;

    let props: [(&str, JsValue); 8] = [
        ("userAgent", JsValue::from_str(&browser.user_agent)),
        ("appVersion", JsValue::from_str(&browser.app_version)),
        ("platform", JsValue::from_str(&browser.platform)),
        ("vendor", JsValue::from_str(CHROME_VENDOR)),
        ("language", JsValue::from_str(&profile.context.locale)),
        (
            "hardwareConcurrency",
            JsValue::from_f64(hardware.hardware_concurrency as f64),
        ),
        // The API caps what it reports; the profile keeps the installed amount.
        (
            "deviceMemory",
            JsValue::from_f64(hardware.reported_device_memory() as f64),
        ),
        ("webdriver", JsValue::from_bool(profile.webdriver)),
    ];

    for (prop, value) in props {
        proxy_helpers::patch_constant(navigator, prop, value)?;
    }

    // languages: one frozen array, identical on every read
    let languages = proxy_helpers::frozen_string_array(&profile.context.languages);
    proxy_helpers::patch_constant(navigator, "languages", languages)?;

    // userAgentData exists on Chromium only; keep its platform in step
    let ua_data = Reflect::get(navigator, &JsValue::from_str("userAgentData"))
        .unwrap_or(JsValue::UNDEFINED);
    if !proxy_helpers::is_missing(&ua_data) {
        proxy_helpers::patch_constant(
            &ua_data,
            "platform",
            JsValue::from_str(ua_data_platform(profile)),
        )?;
    }

    Ok(())
}

/// `navigator.userAgentData.platform` for the profile's platform family.
pub fn ua_data_platform(profile: &FingerprintProfile) -> &'static str {
    match profile.platform() {
        persona_core::PlatformFamily::Windows => "Windows",
        persona_core::PlatformFamily::Mac => "macOS",
        persona_core::PlatformFamily::Linux => "Linux",
    }
}
