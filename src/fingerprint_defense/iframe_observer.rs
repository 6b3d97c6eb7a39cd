//! Frame Protection via MutationObserver
//!
//! A fresh same-origin `<iframe>` is a separate realm with untouched
//! prototypes, and reading its navigator is the cheapest way to catch a
//! persona that only patched the top window. This observer installs the
//! enabled defenses into every such frame, from the same profile.

use std::rc::Rc;

use js_sys::{Array, Function, Object, Reflect, WeakSet};
use persona_core::FingerprintProfile;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::profile::DefenseConfig;
use super::proxy_helpers;
use super::{
    tier1_canvas, tier1_navigator, tier1_screen, tier1_webgl, tier2_audio, tier2_fonts,
    tier2_performance, tier2_timezone,
};

/// What a frame needs to patch its window.
struct FrameDefense {
    profile: Rc<FingerprintProfile>,
    config: DefenseConfig,
    /// Frame windows already patched
    patched: WeakSet,
    /// Frame elements with a load listener
    watched: WeakSet,
}

/// Start observing the DOM for frame insertions.
pub fn start_iframe_protection(profile: &Rc<FingerprintProfile>, config: &DefenseConfig) -> Result<(), JsValue> {
    let document = proxy_helpers::get_global("document")?;
    if proxy_helpers::is_missing(&document) {
        return Ok(());
    }

    let defense = Rc::new(FrameDefense {
        profile: Rc::clone(profile),
        config: config.clone(),
        patched: WeakSet::new(),
        watched: WeakSet::new(),
    });

    // Existing frames
    let query = Reflect::get(&document, &JsValue::from_str("querySelectorAll"))?;
    let existing = proxy_helpers::call_function(&query, &document, &Array::of1(&JsValue::from_str("iframe, frame")).into())?;
    for frame in Array::from(&existing).iter() {
        watch_frame(&frame, &defense);
    }

    // Future frames
    let d = Rc::clone(&defense);
    let observer_callback = Closure::wrap(Box::new(move |mutations: JsValue, _observer: JsValue| {
        let arr: &Array = mutations.unchecked_ref();
        for record in arr.iter() {
            let added = Reflect::get(&record, &JsValue::from_str("addedNodes")).unwrap_or(JsValue::UNDEFINED);
            if proxy_helpers::is_missing(&added) {
                continue;
            }
            for node in Array::from(&added).iter() {
                process_node(&node, &d);
            }
        }
    }) as Box<dyn FnMut(JsValue, JsValue)>);

    let create_observer: Function = js_sys::eval(
        "(function(callback) { \
            var obs = new MutationObserver(callback); \
            obs.observe(document.documentElement, { childList: true, subtree: true }); \
            return obs; \
        })",
    )?
    .unchecked_into();
    Reflect::apply(&create_observer, &JsValue::UNDEFINED, &Array::of1(observer_callback.as_ref()))?;
    observer_callback.forget();

    // Frames created but not yet inserted
    intercept_create_element(&document, &defense)
}

fn is_frame(node: &JsValue) -> bool {
    Reflect::get(node, &JsValue::from_str("nodeName"))
        .ok()
        .and_then(|v| v.as_string())
        .map(|n| n.eq_ignore_ascii_case("IFRAME") || n.eq_ignore_ascii_case("FRAME"))
        .unwrap_or(false)
}

fn process_node(node: &JsValue, defense: &Rc<FrameDefense>) {
    if proxy_helpers::is_missing(node) {
        return;
    }
    if is_frame(node) {
        watch_frame(node, defense);
    }

    let children = Reflect::get(node, &JsValue::from_str("childNodes")).unwrap_or(JsValue::UNDEFINED);
    if !proxy_helpers::is_missing(&children) {
        for child in Array::from(&children).iter() {
            process_node(&child, defense);
        }
    }
}

/// Patch the frame's current window now and again after every load.
fn watch_frame(frame: &JsValue, defense: &Rc<FrameDefense>) {
    patch_content_window(frame, defense);

    let element: &Object = frame.unchecked_ref();
    if defense.watched.has(element) {
        return;
    }
    defense.watched.add(element);

    let frame_clone = frame.clone();
    let d = Rc::clone(defense);
    let onload = Closure::wrap(Box::new(move |_event: JsValue| {
        patch_content_window(&frame_clone, &d);
    }) as Box<dyn FnMut(JsValue)>);

    if let Ok(ael) = Reflect::get(frame, &JsValue::from_str("addEventListener")) {
        if let Some(ael_fn) = ael.dyn_ref::<Function>() {
            let _ = ael_fn.call2(frame, &JsValue::from_str("load"), onload.as_ref());
        }
    }
    onload.forget();
}

fn patch_content_window(frame: &JsValue, defense: &FrameDefense) {
    // Cross-origin frames throw on access; they cannot be read either
    let window = match Reflect::get(frame, &JsValue::from_str("contentWindow")) {
        Ok(w) if w.is_object() => w,
        _ => return,
    };
    let key: &Object = window.unchecked_ref();
    if defense.patched.has(key) {
        return;
    }
    match patch_frame_window(&window, defense) {
        Ok(()) => {
            defense.patched.add(key);
        }
        Err(e) => log::warn!("⚠️ Frame defense not applied: {:?}", e),
    }
}

fn patch_frame_window(window: &JsValue, defense: &FrameDefense) -> Result<(), JsValue> {
    let profile = &defense.profile;
    let config = &defense.config;

    if config.navigator {
        let navigator = Reflect::get(window, &JsValue::from_str("navigator"))?;
        if !proxy_helpers::is_missing(&navigator) {
            tier1_navigator::apply_to_navigator(&navigator, profile)?;
        }
    }

    if config.screen {
        let screen = Reflect::get(window, &JsValue::from_str("screen"))?;
        if !proxy_helpers::is_missing(&screen) {
            tier1_screen::apply_to_screen(&screen, profile)?;
        }
        tier1_screen::apply_to_window(window, profile)?;
    }

    if config.timezone {
        tier2_timezone::apply_to_window(window, profile)?;
    }

    if config.performance {
        let performance = Reflect::get(window, &JsValue::from_str("performance"))?;
        if !proxy_helpers::is_missing(&performance) {
            tier2_performance::apply_to_performance(&performance, profile)?;
        }
    }

    if config.canvas {
        tier1_canvas::install_in(window, profile)?;
    }
    if config.webgl {
        tier1_webgl::install_in(window, profile)?;
    }
    if config.audio {
        tier2_audio::install_in(window, profile)?;
    }
    if config.fonts {
        tier2_fonts::install_in(window, profile)?;
    }

    Ok(())
}

fn intercept_create_element(document: &JsValue, defense: &Rc<FrameDefense>) -> Result<(), JsValue> {
    let doc_ref = document.clone();
    let d = Rc::clone(defense);

    let apply_trap = Closure::wrap(Box::new(
        move |target: JsValue, _this: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let result = proxy_helpers::call_function(&target, &doc_ref, &args)?;

            let args_arr: &Array = args.unchecked_ref();
            if let Some(tag) = args_arr.get(0).as_string() {
                if tag.eq_ignore_ascii_case("IFRAME") || tag.eq_ignore_ascii_case("FRAME") {
                    watch_frame(&result, &d);
                }
            }

            Ok(result)
        },
    )
        as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(document, "createElement", apply_trap)
}
