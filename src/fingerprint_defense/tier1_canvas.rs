//! Canvas Fingerprinting Defense (Tier 1: Identity)
//!
//! Applies the profile's seeded RGBA noise to every pixel readback path.
//! The noise for a buffer depends only on the channel sub-seed and the
//! buffer length, so `getImageData`, `toDataURL` and `toBlob` of the same
//! canvas agree with each other and with the host's readbacks.
//!
//! The perturbation runs in WASM linear memory:
//! - Binary opacity (the noise logic is compiled)
//! - Near-native speed (no per-pixel FFI overhead)

use std::rc::Rc;

use js_sys::{Array, Reflect, Uint8Array, Uint8ClampedArray};
use persona_core::noise::{self, Discriminator, NoiseRequest};
use persona_core::{Channel, FingerprintProfile};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;
use super::tier1_webgl::GL_NAMES;

pub fn apply(profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    install_in(&js_sys::global(), profile)
}

/// Install the readback noise into one realm (the top window or a frame).
pub fn install_in(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    apply_canvas_2d(global, profile)?;
    apply_webgl_read_pixels(global, profile)?;

    Ok(())
}

/// Perturb an RGBA buffer in place for `channel`.
/// This is the hot path: runs entirely in compiled Rust.
pub fn perturb_pixels(data: &mut [u8], profile: &FingerprintProfile, channel: Channel) -> usize {
    NoiseRequest::for_profile(profile, channel, Discriminator::from_len(data.len()))
        .map_or(0, |req| noise::perturb_rgba(data, &req))
}

fn perturb_clamped(arr: &Uint8ClampedArray, profile: &FingerprintProfile) {
    let mut buffer = vec![0u8; arr.length() as usize];
    arr.copy_to(&mut buffer);
    if perturb_pixels(&mut buffer, profile, Channel::Canvas) > 0 {
        arr.copy_from(&buffer);
    }
}

fn apply_canvas_2d(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let ctx2d_proto = proxy_helpers::prototype_in(global, "CanvasRenderingContext2D")?;
    if proxy_helpers::is_missing(&ctx2d_proto) {
        return Ok(());
    }
    let canvas_proto = proxy_helpers::prototype_in(global, "HTMLCanvasElement")?;

    // --- getImageData ---
    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&target, &this_arg, &args)?;

        let data_val = Reflect::get(&result, &JsValue::from_str("data"))?;
        if let Ok(data_arr) = data_val.dyn_into::<Uint8ClampedArray>() {
            perturb_clamped(&data_arr, &p);
        }

        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(&ctx2d_proto, "getImageData", apply_trap)?;

    if proxy_helpers::is_missing(&canvas_proto) {
        return Ok(());
    }

    // --- toDataURL / toBlob ---
    // Serialize a noisy copy; the page's own canvas is never written to.
    for method_name in ["toDataURL", "toBlob"] {
        let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            match noisy_copy(&this_arg)? {
                Some(copy) => proxy_helpers::call_function(&target, &copy, &args),
                None => proxy_helpers::call_function(&target, &this_arg, &args),
            }
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
        proxy_helpers::wrap_method(&canvas_proto, method_name, apply_trap)?;
    }

    Ok(())
}

/// Draw `canvas` into a fresh canvas through the patched `getImageData`.
///
/// Returns `None` for empty canvases and for canvases without a 2D context
/// (WebGL canvases read back through `readPixels`).
fn noisy_copy(canvas: &JsValue) -> Result<Option<JsValue>, JsValue> {
    let width = Reflect::get(canvas, &JsValue::from_str("width"))?.as_f64().unwrap_or(0.0);
    let height = Reflect::get(canvas, &JsValue::from_str("height"))?.as_f64().unwrap_or(0.0);
    if width <= 0.0 || height <= 0.0 {
        return Ok(None);
    }

    let get_ctx = Reflect::get(canvas, &JsValue::from_str("getContext"))?;
    let ctx = proxy_helpers::call_function(&get_ctx, canvas, &Array::of1(&JsValue::from_str("2d")).into())?;
    if proxy_helpers::is_missing(&ctx) {
        return Ok(None);
    }

    let get_id = Reflect::get(&ctx, &JsValue::from_str("getImageData"))?;
    let image = proxy_helpers::call_function(
        &get_id,
        &ctx,
        &Array::of4(
            &JsValue::from_f64(0.0),
            &JsValue::from_f64(0.0),
            &JsValue::from_f64(width),
            &JsValue::from_f64(height),
        )
        .into(),
    )?;

    // The copy lives in the canvas's own realm
    let document = Reflect::get(canvas, &JsValue::from_str("ownerDocument"))?;
    if proxy_helpers::is_missing(&document) {
        return Ok(None);
    }
    let create = Reflect::get(&document, &JsValue::from_str("createElement"))?;
    let copy = proxy_helpers::call_function(&create, &document, &Array::of1(&JsValue::from_str("canvas")).into())?;
    Reflect::set(&copy, &JsValue::from_str("width"), &JsValue::from_f64(width))?;
    Reflect::set(&copy, &JsValue::from_str("height"), &JsValue::from_f64(height))?;

    let copy_get_ctx = Reflect::get(&copy, &JsValue::from_str("getContext"))?;
    let copy_ctx = proxy_helpers::call_function(&copy_get_ctx, &copy, &Array::of1(&JsValue::from_str("2d")).into())?;
    if proxy_helpers::is_missing(&copy_ctx) {
        return Ok(None);
    }
    let put_id = Reflect::get(&copy_ctx, &JsValue::from_str("putImageData"))?;
    proxy_helpers::call_function(
        &put_id,
        &copy_ctx,
        &Array::of3(&image, &JsValue::from_f64(0.0), &JsValue::from_f64(0.0)).into(),
    )?;

    Ok(Some(copy))
}

fn apply_webgl_read_pixels(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    for gl_name in GL_NAMES {
        let proto = proxy_helpers::prototype_in(global, gl_name)?;
        if proxy_helpers::is_missing(&proto) {
            continue;
        }

        let p = Rc::clone(profile);
        let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let result = proxy_helpers::call_function(&target, &this_arg, &args)?;

            // Output buffer is the 7th argument
            let args_arr: &Array = args.unchecked_ref();
            if args_arr.length() >= 7 {
                if let Ok(arr) = args_arr.get(6).dyn_into::<Uint8Array>() {
                    let mut buffer = vec![0u8; arr.length() as usize];
                    arr.copy_to(&mut buffer);
                    if perturb_pixels(&mut buffer, &p, Channel::Webgl) > 0 {
                        arr.copy_from(&buffer);
                    }
                }
            }

            Ok(result)
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
        proxy_helpers::wrap_method(&proto, "readPixels", apply_trap)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_core::{build_profile, EngineConfig, NoiseConfig, ProfileOverrides, RootSeed};

    fn profile(seed: u64) -> FingerprintProfile {
        build_profile(
            &RootSeed::from_u64(seed),
            "DE",
            &ProfileOverrides::default(),
            &EngineConfig::default(),
        )
        .unwrap()
        .profile
    }

    #[test]
    fn test_same_buffer_same_noise() {
        let p = profile(11);
        let mut a = vec![128u8; 64 * 64 * 4];
        let mut b = a.clone();
        perturb_pixels(&mut a, &p, Channel::Canvas);
        perturb_pixels(&mut b, &p, Channel::Canvas);
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_is_bounded() {
        let p = profile(12);
        let amplitude = NoiseConfig::default().canvas.amplitude as i16;
        let original = vec![128u8; 64 * 64 * 4];
        let mut noisy = original.clone();
        assert!(perturb_pixels(&mut noisy, &p, Channel::Canvas) > 0);
        for (i, (x, y)) in original.iter().zip(&noisy).enumerate() {
            let delta = (*x as i16 - *y as i16).abs();
            assert!(delta <= amplitude, "byte {} moved by {}", i, delta);
            if i % 4 == 3 {
                assert_eq!(x, y, "alpha byte {} changed", i);
            }
        }
    }
}
