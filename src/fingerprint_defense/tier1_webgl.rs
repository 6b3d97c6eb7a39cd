//! WebGL Identity (Tier 1: Identity)
//!
//! Reports the profile's GPU through the unmasked vendor/renderer
//! parameters. Pixel readback noise lives with the canvas defense.

use std::rc::Rc;

use js_sys::Array;
use persona_core::FingerprintProfile;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;

/// `WEBGL_debug_renderer_info.UNMASKED_VENDOR_WEBGL`
pub const UNMASKED_VENDOR_WEBGL: u32 = 0x9245;
/// `WEBGL_debug_renderer_info.UNMASKED_RENDERER_WEBGL`
pub const UNMASKED_RENDERER_WEBGL: u32 = 0x9246;
/// `GL_VENDOR`
pub const GL_VENDOR: u32 = 0x1F00;
/// `GL_RENDERER`
pub const GL_RENDERER: u32 = 0x1F01;

pub const GL_NAMES: [&str; 2] = ["WebGLRenderingContext", "WebGL2RenderingContext"];

pub fn apply(profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    install_in(&js_sys::global(), profile)
}

/// Patch both WebGL context prototypes of one realm.
pub fn install_in(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    for gl_name in GL_NAMES {
        let proto = proxy_helpers::prototype_in(global, gl_name)?;
        if proxy_helpers::is_missing(&proto) {
            continue;
        }
        apply_to_gl_proto(&proto, profile)?;
    }

    Ok(())
}

/// Answer for a `getParameter` call, or `None` to defer to the browser.
pub fn spoofed_parameter(profile: &FingerprintProfile, param: u32) -> Option<String> {
    match param {
        UNMASKED_VENDOR_WEBGL => Some(profile.gpu.vendor.clone()),
        UNMASKED_RENDERER_WEBGL => Some(profile.gpu.renderer.clone()),
        // Chrome masks the plain strings the same way on every GPU
        GL_VENDOR => Some("WebKit".into()),
        GL_RENDERER => Some("WebKit WebGL".into()),
        _ => None,
    }
}

fn apply_to_gl_proto(proto: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let profile = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        let args_arr: &Array = args.unchecked_ref();
        if args_arr.length() >= 1 {
            if let Some(param) = args_arr.get(0).as_f64() {
                if let Some(value) = spoofed_parameter(&profile, param as u32) {
                    return Ok(JsValue::from_str(&value));
                }
            }
        }
        proxy_helpers::call_function(&target, &this_arg, &args)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(proto, "getParameter", apply_trap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{build_profile, EngineConfig, ProfileOverrides, RootSeed};

    #[test]
    fn test_unmasked_parameters_follow_profile() {
        let build = build_profile(
            &RootSeed::from_u64(7),
            "US",
            &ProfileOverrides::default(),
            &EngineConfig::default(),
        )
        .unwrap();
        let profile = build.profile;

        assert_eq!(
            spoofed_parameter(&profile, UNMASKED_RENDERER_WEBGL),
            Some(profile.gpu.renderer.clone())
        );
        assert_eq!(
            spoofed_parameter(&profile, UNMASKED_VENDOR_WEBGL),
            Some(profile.gpu.vendor.clone())
        );
        assert_eq!(spoofed_parameter(&profile, GL_VENDOR).as_deref(), Some("WebKit"));
        // MAX_TEXTURE_SIZE
        assert_eq!(spoofed_parameter(&profile, 0x0D33), None);
    }
}
