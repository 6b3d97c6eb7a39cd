//! Audio Fingerprinting Defense (Tier 2: Derived signals)
//!
//! Injects the profile's audio-channel noise into AnalyserNode readouts and
//! rendered AudioBuffer data. Each AudioBuffer channel is perturbed once, in
//! place, on first access; later reads (and `copyFromChannel`) see the same
//! samples.

use std::rc::Rc;

use js_sys::{Array, Float32Array, Object, Reflect, Uint8Array, WeakSet};
use persona_core::noise::{self, Discriminator, NoiseParams, NoiseRequest};
use persona_core::{Channel, FingerprintProfile};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;

/// Rendered samples stay inside the nominal PCM range.
const SAMPLE_RANGE: (f32, f32) = (-1.0, 1.0);

pub fn apply(profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    install_in(&js_sys::global(), profile)
}

/// Install the audio noise into one realm (the top window or a frame).
pub fn install_in(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    apply_analyser_node(global, profile)?;
    apply_audio_buffer(global, profile)?;

    Ok(())
}

fn request(profile: &FingerprintProfile, len: usize) -> Option<NoiseRequest> {
    NoiseRequest::for_profile(profile, Channel::Audio, Discriminator::from_len(len))
}

/// Float readouts (dB spectra, time-domain samples).
pub fn perturb_float(samples: &mut [f32], profile: &FingerprintProfile, range: Option<(f32, f32)>) -> usize {
    request(profile, samples.len()).map_or(0, |req| noise::perturb_samples(samples, &req, range))
}

/// Byte readouts: one-step offsets at the audio channel's density.
pub fn perturb_byte_readout(bytes: &mut [u8], profile: &FingerprintProfile) -> usize {
    request(profile, bytes.len()).map_or(0, |req| {
        let req = NoiseRequest {
            params: NoiseParams::new(1.0, req.params.density),
            ..req
        };
        noise::perturb_bytes(bytes, &req)
    })
}

fn with_float_arg(args: &JsValue, f: impl FnOnce(&mut [f32]) -> usize) {
    let args_arr: &Array = args.unchecked_ref();
    if args_arr.length() < 1 {
        return;
    }
    if let Ok(arr) = args_arr.get(0).dyn_into::<Float32Array>() {
        let mut buffer = vec![0f32; arr.length() as usize];
        arr.copy_to(&mut buffer);
        if f(&mut buffer) > 0 {
            arr.copy_from(&buffer);
        }
    }
}

fn with_byte_arg(args: &JsValue, f: impl FnOnce(&mut [u8]) -> usize) {
    let args_arr: &Array = args.unchecked_ref();
    if args_arr.length() < 1 {
        return;
    }
    if let Ok(arr) = args_arr.get(0).dyn_into::<Uint8Array>() {
        let mut buffer = vec![0u8; arr.length() as usize];
        arr.copy_to(&mut buffer);
        if f(&mut buffer) > 0 {
            arr.copy_from(&buffer);
        }
    }
}

fn apply_analyser_node(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let proto = proxy_helpers::prototype_in(global, "AnalyserNode")?;
    if proxy_helpers::is_missing(&proto) {
        return Ok(());
    }

    // getFloatFrequencyData: dB values, unbounded below
    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        proxy_helpers::call_function(&target, &this_arg, &args)?;
        with_float_arg(&args, |buf| perturb_float(buf, &p, None));
        Ok(JsValue::UNDEFINED)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(&proto, "getFloatFrequencyData", apply_trap)?;

    // getFloatTimeDomainData: PCM samples
    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        proxy_helpers::call_function(&target, &this_arg, &args)?;
        with_float_arg(&args, |buf| perturb_float(buf, &p, Some(SAMPLE_RANGE)));
        Ok(JsValue::UNDEFINED)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(&proto, "getFloatTimeDomainData", apply_trap)?;

    // getByteFrequencyData / getByteTimeDomainData
    for method_name in ["getByteFrequencyData", "getByteTimeDomainData"] {
        let p = Rc::clone(profile);
        let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            proxy_helpers::call_function(&target, &this_arg, &args)?;
            with_byte_arg(&args, |buf| perturb_byte_readout(buf, &p));
            Ok(JsValue::UNDEFINED)
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
        proxy_helpers::wrap_method(&proto, method_name, apply_trap)?;
    }

    Ok(())
}

fn apply_audio_buffer(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let proto = proxy_helpers::prototype_in(global, "AudioBuffer")?;
    if proxy_helpers::is_missing(&proto) {
        return Ok(());
    }

    // Channel arrays already perturbed. getChannelData returns the same
    // Float32Array for a channel on every call.
    let seen = WeakSet::new();

    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        let result = proxy_helpers::call_function(&target, &this_arg, &args)?;
        if let Some(arr) = result.dyn_ref::<Float32Array>() {
            let key: &Object = arr.unchecked_ref();
            if !seen.has(key) {
                let mut buffer = vec![0f32; arr.length() as usize];
                arr.copy_to(&mut buffer);
                if perturb_float(&mut buffer, &p, Some(SAMPLE_RANGE)) > 0 {
                    arr.copy_from(&buffer);
                }
                seen.add(key);
            }
        }
        Ok(result)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(&proto, "getChannelData", apply_trap)?;

    // copyFromChannel reads the same storage; route it through getChannelData first
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
        let args_arr: &Array = args.unchecked_ref();
        if args_arr.length() >= 2 {
            let get = Reflect::get(&this_arg, &JsValue::from_str("getChannelData"))?;
            // An out-of-range channel throws here exactly as the original would
            proxy_helpers::call_function(&get, &this_arg, &Array::of1(&args_arr.get(1)).into())?;
        }
        proxy_helpers::call_function(&target, &this_arg, &args)
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(&proto, "copyFromChannel", apply_trap)?;

    Ok(())
}
