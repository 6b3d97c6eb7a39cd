//! Performance Timer Defense (Tier 2: Derived signals)
//!
//! `performance.now()` runs through a per-realm `MonotonicTimer`: quantized
//! to the profile's timer precision, jittered inside each step by the timing
//! sub-seed, and never decreasing. Entry timestamps and `timeOrigin` use the
//! same quantization without the monotonic state.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use persona_core::noise::{monotonic_jitter, MonotonicTimer};
use persona_core::{Channel, FingerprintProfile};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;

/// Entry fields that carry timestamps or durations.
const TIMING_FIELDS: [&str; 16] = [
    "startTime",
    "duration",
    "fetchStart",
    "domainLookupStart",
    "domainLookupEnd",
    "connectStart",
    "connectEnd",
    "secureConnectionStart",
    "requestStart",
    "responseStart",
    "responseEnd",
    "domInteractive",
    "domContentLoadedEventEnd",
    "domComplete",
    "loadEventStart",
    "loadEventEnd",
];

/// Stateless quantization for timestamps that are read, not ticked.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    precision: f64,
    amplitude: f64,
    sub_seed: persona_core::SubSeed,
}

impl Quantizer {
    pub fn for_profile(profile: &FingerprintProfile) -> Option<Self> {
        profile.channel(Channel::Timing).map(|c| Self {
            precision: profile.timer_precision_ms,
            amplitude: c.amplitude,
            sub_seed: c.sub_seed,
        })
    }

    pub fn apply(&self, t: f64) -> f64 {
        monotonic_jitter(t, self.precision, self.sub_seed, self.amplitude)
    }
}

pub fn apply(profile: &FingerprintProfile) -> Result<(), JsValue> {
    let performance = proxy_helpers::get_global("performance")?;
    if proxy_helpers::is_missing(&performance) {
        return Ok(());
    }

    apply_to_performance(&performance, profile)
}

/// Apply performance defenses. Used by both main apply() and the frame
/// observer; each call starts its own timer.
pub fn apply_to_performance(performance: &JsValue, profile: &FingerprintProfile) -> Result<(), JsValue> {
    let (timer, quantizer) = match (MonotonicTimer::for_profile(profile), Quantizer::for_profile(profile)) {
        (Some(t), Some(q)) => (Rc::new(RefCell::new(t)), q),
        _ => return Ok(()),
    };

    // performance.now()
    let perf_ref = performance.clone();
    let apply_trap = Closure::wrap(Box::new(move |target: JsValue, _this_arg: JsValue, _args: JsValue| -> Result<JsValue, JsValue> {
        let raw = proxy_helpers::call_function(&target, &perf_ref, &Array::new().into())?;
        let raw = raw.as_f64().unwrap_or(f64::NAN);
        Ok(JsValue::from_f64(timer.borrow_mut().next(raw)))
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
    proxy_helpers::wrap_method(performance, "now", apply_trap)?;

    // performance.timeOrigin
    let time_origin = Reflect::get(performance, &JsValue::from_str("timeOrigin"))?;
    if let Some(origin) = time_origin.as_f64() {
        proxy_helpers::patch_constant(performance, "timeOrigin", JsValue::from_f64(quantizer.apply(origin)))?;
    }

    // getEntries / getEntriesByType / getEntriesByName
    for method_name in ["getEntries", "getEntriesByType", "getEntriesByName"] {
        let perf_ref = performance.clone();
        let apply_trap = Closure::wrap(Box::new(move |target: JsValue, _this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let result = proxy_helpers::call_function(&target, &perf_ref, &args)?;
            let entries: &Array = result.unchecked_ref();
            let wrapped = Array::new();
            for entry in entries.iter() {
                wrapped.push(&quantized_entry(&entry, quantizer)?);
            }
            Ok(wrapped.into())
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
        proxy_helpers::wrap_method(performance, method_name, apply_trap)?;
    }

    Ok(())
}

fn quantized_entry(entry: &JsValue, quantizer: Quantizer) -> Result<JsValue, JsValue> {
    let get_trap = Closure::wrap(Box::new(move |target: JsValue, prop: JsValue, _receiver: JsValue| -> JsValue {
        let val = Reflect::get(&target, &prop).unwrap_or(JsValue::UNDEFINED);
        if let (Some(name), Some(v)) = (prop.as_string(), val.as_f64()) {
            if TIMING_FIELDS.contains(&name.as_str()) {
                return JsValue::from_f64(quantizer.apply(v));
            }
        }
        if val.is_function() {
            let func: &Function = val.unchecked_ref();
            return func.bind0(&target).into();
        }
        val
    }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

    proxy_helpers::proxy_object_with_get(entry, get_trap)
}
