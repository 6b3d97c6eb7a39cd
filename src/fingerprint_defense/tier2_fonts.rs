//! Font Enumeration and Text Metrics (Tier 2: Derived signals)
//!
//! `document.fonts.check()` confirms exactly the profile's font bundle plus
//! the CSS generic families. `measureText()` measures families outside that
//! set with the browser's fallback, as if they were not installed, and adds
//! the profile's metric noise keyed by the measured text.

use std::rc::Rc;

use js_sys::{Array, Function, Reflect};
use persona_core::catalog::GENERIC_FONT_FAMILIES;
use persona_core::noise::{self, Discriminator, NoiseRequest};
use persona_core::{Channel, FingerprintProfile};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;

/// Family Chrome falls back to when none of the listed ones is installed.
const FALLBACK_FAMILY: &str = "serif";

/// A CSS `font` shorthand split into its size prefix and family list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontShorthand {
    /// Style, weight and size tokens, e.g. `"italic bold 16px/2"`
    pub prefix: String,
    /// Unquoted family names in order
    pub families: Vec<String>,
}

fn unquote(name: &str) -> String {
    name.trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim()
        .to_string()
}

fn is_size_token(token: &str) -> bool {
    const KEYWORDS: [&str; 9] = [
        "xx-small", "x-small", "small", "medium", "large", "x-large", "xx-large", "smaller",
        "larger",
    ];
    let size = token.split('/').next().unwrap_or(token);
    // Bare numbers are weights ("600"); sizes carry a unit
    let numeric = size.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && size.contains(|c: char| c.is_ascii_alphabetic() || c == '%');
    numeric
        || KEYWORDS.contains(&size.to_ascii_lowercase().as_str())
}

impl FontShorthand {
    /// Parse `"bold 16px 'My Font', Arial, sans-serif"`.
    ///
    /// Returns `None` when no size token is present.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split(',');
        let head = parts.next()?.trim();

        // The first family starts after the size token
        let mut offset = 0;
        let mut family_start = None;
        for token in head.split_whitespace() {
            let at = head[offset..].find(token)? + offset;
            offset = at + token.len();
            if is_size_token(token) {
                family_start = Some(offset);
                break;
            }
        }
        let family_start = family_start?;

        let mut families = vec![unquote(&head[family_start..])];
        families.extend(parts.map(unquote));
        families.retain(|f| !f.is_empty());
        if families.is_empty() {
            return None;
        }

        Some(Self {
            prefix: head[..family_start].trim().to_string(),
            families,
        })
    }

    /// The shorthand with only `installed` families left, or the fallback.
    pub fn restricted_to(&self, installed: impl Fn(&str) -> bool) -> Self {
        let mut families: Vec<String> = self
            .families
            .iter()
            .filter(|f| installed(f))
            .cloned()
            .collect();
        if families.is_empty() {
            families.push(FALLBACK_FAMILY.to_string());
        }
        Self {
            prefix: self.prefix.clone(),
            families,
        }
    }

    pub fn to_css(&self) -> String {
        let families: Vec<String> = self
            .families
            .iter()
            .map(|f| {
                if f.contains(' ') {
                    format!("\"{}\"", f)
                } else {
                    f.clone()
                }
            })
            .collect();
        format!("{} {}", self.prefix, families.join(", "))
    }
}

/// Whether `family` exists on the profile's machine.
pub fn is_installed(profile: &FingerprintProfile, family: &str) -> bool {
    GENERIC_FONT_FAMILIES
        .iter()
        .any(|g| g.eq_ignore_ascii_case(family))
        || profile.fonts.iter().any(|f| f.eq_ignore_ascii_case(family))
}

/// `measureText().width` with metric noise for `text`.
pub fn noisy_width(profile: &FingerprintProfile, text: &str, width: f64) -> f64 {
    NoiseRequest::for_profile(profile, Channel::Metrics, Discriminator::from_text(text))
        .map_or(width, |req| noise::perturb_scalar(width, &req))
}

pub fn apply(profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    install_in(&js_sys::global(), profile)
}

/// Install the font defenses into one realm (the top window or a frame).
pub fn install_in(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    apply_fonts_check(global, profile)?;
    apply_measure_text(global, profile)?;
    Ok(())
}

fn apply_fonts_check(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let document = Reflect::get(global, &JsValue::from_str("document"))?;
    if proxy_helpers::is_missing(&document) {
        return Ok(());
    }
    let fonts = Reflect::get(&document, &JsValue::from_str("fonts"))?;
    if proxy_helpers::is_missing(&fonts) {
        return Ok(());
    }

    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(
        move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let args_arr: &Array = args.unchecked_ref();
            if let Some(spec) = args_arr.get(0).as_string() {
                if let Some(font) = FontShorthand::parse(&spec) {
                    return Ok(JsValue::from_bool(
                        font.families.iter().all(|f| is_installed(&p, f)),
                    ));
                }
            }
            // Malformed specs throw the browser's own SyntaxError
            proxy_helpers::call_function(&target, &this_arg, &args)
        },
    )
        as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&fonts, "check", apply_trap)
}

fn apply_measure_text(global: &JsValue, profile: &Rc<FingerprintProfile>) -> Result<(), JsValue> {
    let proto = proxy_helpers::prototype_in(global, "CanvasRenderingContext2D")?;
    if proxy_helpers::is_missing(&proto) {
        return Ok(());
    }

    let p = Rc::clone(profile);
    let apply_trap = Closure::wrap(Box::new(
        move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            let font = Reflect::get(&this_arg, &JsValue::from_str("font"))?.as_string();
            let restricted = font
                .as_deref()
                .and_then(FontShorthand::parse)
                .map(|f| f.restricted_to(|family| is_installed(&p, family)));

            let result = match (&font, restricted) {
                (Some(saved), Some(restricted)) => {
                    let font_key = JsValue::from_str("font");
                    Reflect::set(&this_arg, &font_key, &JsValue::from_str(&restricted.to_css()))?;
                    let measured = proxy_helpers::call_function(&target, &this_arg, &args);
                    Reflect::set(&this_arg, &font_key, &JsValue::from_str(saved))?;
                    measured?
                }
                _ => proxy_helpers::call_function(&target, &this_arg, &args)?,
            };

            let args_arr: &Array = args.unchecked_ref();
            let text = args_arr.get(0).as_string().unwrap_or_default();
            let width = Reflect::get(&result, &JsValue::from_str("width"))?
                .as_f64()
                .unwrap_or(0.0);
            let spoofed = JsValue::from_f64(noisy_width(&p, &text, width));

            // TextMetrics is read-only; answer `width` through a proxy
            let get_trap = Closure::wrap(Box::new(
                move |target: JsValue, prop: JsValue, _receiver: JsValue| -> JsValue {
                    if prop.as_string().as_deref() == Some("width") {
                        return spoofed.clone();
                    }
                    let val = Reflect::get(&target, &prop).unwrap_or(JsValue::UNDEFINED);
                    if val.is_function() {
                        let func: &Function = val.unchecked_ref();
                        return func.bind0(&target).into();
                    }
                    val
                },
            )
                as Box<dyn FnMut(JsValue, JsValue, JsValue) -> JsValue>);

            proxy_helpers::proxy_object_with_get(&result, get_trap)
        },
    )
        as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);

    proxy_helpers::wrap_method(&proto, "measureText", apply_trap)
}
