//! Timezone Consistency (Tier 2: Derived signals)
//!
//! Moves every local-time view of `Date` and the default of
//! `Intl.DateTimeFormat` into the profile's timezone and locale. Offsets
//! (daylight saving included) come from the browser's own tz database via
//! `Intl`, so only the zone name crosses the transport.
//!
//! Local-time setters and the `Date` string parser keep the real zone.

use std::rc::Rc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use js_sys::{Array, Function, Object, Reflect};
use persona_core::FingerprintProfile;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use super::proxy_helpers;

/// Builds `(t) -> [year, month, day, hour, minute, second, zoneName]` for `tz`.
///
/// The formatters are created once, before `Intl.DateTimeFormat` is wrapped.
const WALL_CLOCK_FACTORY: &str = "(function(tz) { \
    var f = new Intl.DateTimeFormat('en-US', { timeZone: tz, hourCycle: 'h23', \
        year: 'numeric', month: 'numeric', day: 'numeric', \
        hour: 'numeric', minute: 'numeric', second: 'numeric' }); \
    var n = new Intl.DateTimeFormat('en-US', { timeZone: tz, timeZoneName: 'long' }); \
    return function(t) { \
        var p = {}; \
        f.formatToParts(t).forEach(function(x) { p[x.type] = x.value; }); \
        var name = ''; \
        n.formatToParts(t).forEach(function(x) { if (x.type === 'timeZoneName') name = x.value; }); \
        return [+p.year, +p.month, +p.day, +p.hour, +p.minute, +p.second, name]; \
    }; \
})";

/// Civil date and time of one instant in the profile timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct WallClock {
    pub local: NaiveDateTime,
    pub zone_name: String,
}

impl WallClock {
    pub fn new(local: NaiveDateTime, zone_name: impl Into<String>) -> Self {
        Self {
            local,
            zone_name: zone_name.into(),
        }
    }

    fn from_parts(parts: &Array) -> Option<Self> {
        let num = |i: u32| parts.get(i).as_f64().filter(|v| v.is_finite());
        let date = NaiveDate::from_ymd_opt(num(0)? as i32, num(1)? as u32, num(2)? as u32)?;
        // Some engines still print midnight as 24 under h23
        let local = date.and_hms_opt(num(3)? as u32 % 24, num(4)? as u32, num(5)? as u32)?;
        Some(Self::new(local, parts.get(6).as_string().unwrap_or_default()))
    }

    /// `Date.prototype.getTimezoneOffset` for the instant `t` (ms since epoch).
    pub fn offset_minutes(&self, t: f64) -> i64 {
        let whole_seconds = (t / 1000.0).floor() as i64 * 1000;
        (whole_seconds - self.local.and_utc().timestamp_millis()).div_euclid(60_000)
    }

    /// 0 = Sunday, as `Date.prototype.getDay`.
    pub fn weekday(&self) -> u32 {
        self.local.weekday().num_days_from_sunday()
    }

    /// `"Fri Oct 16 2026"`
    pub fn date_string(&self) -> String {
        self.local.format("%a %b %d %Y").to_string()
    }

    /// `"14:03:00 GMT+0200 (Central European Summer Time)"`
    pub fn time_string(&self, offset_minutes: i64) -> String {
        let east = -offset_minutes;
        let sign = if east >= 0 { '+' } else { '-' };
        let abs = east.abs();
        let mut s = format!(
            "{} GMT{}{:02}{:02}",
            self.local.format("%H:%M:%S"),
            sign,
            abs / 60,
            abs % 60
        );
        if !self.zone_name.is_empty() {
            s.push_str(&format!(" ({})", self.zone_name));
        }
        s
    }
}

/// Wall-clock source bound to one timezone.
struct ZoneClock {
    parts: Function,
}

impl ZoneClock {
    fn new(timezone: &str) -> Result<Self, JsValue> {
        let factory: Function = js_sys::eval(WALL_CLOCK_FACTORY)?.unchecked_into();
        let parts = Reflect::apply(&factory, &JsValue::UNDEFINED, &Array::of1(&JsValue::from_str(timezone)))?
            .dyn_into::<Function>()
            .map_err(|_| JsValue::from_str("wall clock factory did not return a function"))?;
        Ok(Self { parts })
    }

    /// `None` for invalid dates.
    fn at(&self, date: &JsValue) -> Result<Option<(f64, WallClock)>, JsValue> {
        let t = proxy_helpers::call_method0(date, "getTime")?.as_f64().unwrap_or(f64::NAN);
        if !t.is_finite() {
            return Ok(None);
        }
        let parts = self.parts.call1(&JsValue::UNDEFINED, &JsValue::from_f64(t))?;
        Ok(WallClock::from_parts(parts.unchecked_ref()).map(|w| (t, w)))
    }
}

type LocalView = fn(f64, &WallClock) -> JsValue;

const LOCAL_VIEWS: [(&str, LocalView); 10] = [
    ("getTimezoneOffset", |t, w| JsValue::from_f64(w.offset_minutes(t) as f64)),
    ("getFullYear", |_, w| JsValue::from_f64(w.local.year() as f64)),
    ("getMonth", |_, w| JsValue::from_f64(w.local.month0() as f64)),
    ("getDate", |_, w| JsValue::from_f64(w.local.day() as f64)),
    ("getDay", |_, w| JsValue::from_f64(w.weekday() as f64)),
    ("getHours", |_, w| JsValue::from_f64(w.local.hour() as f64)),
    ("getMinutes", |_, w| JsValue::from_f64(w.local.minute() as f64)),
    ("getSeconds", |_, w| JsValue::from_f64(w.local.second() as f64)),
    ("toDateString", |_, w| JsValue::from_str(&w.date_string())),
    ("toTimeString", |t, w| JsValue::from_str(&w.time_string(w.offset_minutes(t)))),
];

pub fn apply(profile: &FingerprintProfile) -> Result<(), JsValue> {
    apply_to_window(&js_sys::global(), profile)
}

/// Apply timezone defenses to the `Date` and `Intl` of one realm.
pub fn apply_to_window(global: &JsValue, profile: &FingerprintProfile) -> Result<(), JsValue> {
    let clock = Rc::new(ZoneClock::new(&profile.context.timezone)?);

    let date_proto = proxy_helpers::prototype_in(global, "Date")?;
    if !proxy_helpers::is_missing(&date_proto) {
        for (method_name, view) in LOCAL_VIEWS {
            let clock = Rc::clone(&clock);
            let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
                match clock.at(&this_arg)? {
                    Some((t, wall)) => Ok(view(t, &wall)),
                    None => proxy_helpers::call_function(&target, &this_arg, &args),
                }
            }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
            proxy_helpers::wrap_method(&date_proto, method_name, apply_trap)?;
        }

        // toString = toDateString + " " + toTimeString
        let clock = Rc::clone(&clock);
        let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
            match clock.at(&this_arg)? {
                Some((t, wall)) => Ok(JsValue::from_str(&format!(
                    "{} {}",
                    wall.date_string(),
                    wall.time_string(wall.offset_minutes(t))
                ))),
                None => proxy_helpers::call_function(&target, &this_arg, &args),
            }
        }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
        proxy_helpers::wrap_method(&date_proto, "toString", apply_trap)?;

        // toLocaleString / toLocaleDateString / toLocaleTimeString
        for method_name in ["toLocaleString", "toLocaleDateString", "toLocaleTimeString"] {
            let locale = profile.context.locale.clone();
            let timezone = profile.context.timezone.clone();
            let apply_trap = Closure::wrap(Box::new(move |target: JsValue, this_arg: JsValue, args: JsValue| -> Result<JsValue, JsValue> {
                let new_args = with_defaults(args.unchecked_ref(), &locale, &timezone)?;
                proxy_helpers::call_function(&target, &this_arg, &new_args.into())
            }) as Box<dyn FnMut(JsValue, JsValue, JsValue) -> Result<JsValue, JsValue>>);
            proxy_helpers::wrap_method(&date_proto, method_name, apply_trap)?;
        }
    }

    // Intl.DateTimeFormat: default locale and timeZone
    let intl = Reflect::get(global, &JsValue::from_str("Intl"))?;
    if !proxy_helpers::is_missing(&intl) {
        let dtf = Reflect::get(&intl, &JsValue::from_str("DateTimeFormat"))?;
        if dtf.is_function() {
            let locale = profile.context.locale.clone();
            let timezone = profile.context.timezone.clone();
            let proxied = proxy_helpers::proxy_constructor_with_args(&dtf, move |args| {
                with_defaults(args, &locale, &timezone)
            })?;
            Reflect::set(&intl, &JsValue::from_str("DateTimeFormat"), &proxied)?;
        }
    }

    Ok(())
}

/// `(locales, options)` with the profile's locale and timezone filled in
/// where the caller left them out.
fn with_defaults(args: &Array, locale: &str, timezone: &str) -> Result<Array, JsValue> {
    let locales = args.get(0);
    let locales = if proxy_helpers::is_missing(&locales) {
        JsValue::from_str(locale)
    } else {
        locales
    };

    let options = Object::new();
    Reflect::set(&options, &JsValue::from_str("timeZone"), &JsValue::from_str(timezone))?;
    let given = args.get(1);
    if given.is_object() {
        Object::assign(&options, given.unchecked_ref());
        if proxy_helpers::is_missing(&Reflect::get(&options, &JsValue::from_str("timeZone"))?) {
            Reflect::set(&options, &JsValue::from_str("timeZone"), &JsValue::from_str(timezone))?;
        }
    }

    Ok(Array::of2(&locales, &options))
}
