//! Context resolution: geography code plus overrides to a consistent
//! [`GeoContext`].
//!
//! Resolution never fails. Unknown geographies fall back to the configured
//! default and unusable overrides are dropped; both are reported as
//! [`ResolutionEvent`]s so callers can surface the degraded consistency.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{self, GeoCandidate, Geography, GEOGRAPHIES};
use crate::profile::PlatformFamily;
use crate::seed::SubSeed;

/// Resolved locale/timezone/platform context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoContext {
    pub geography: String,
    pub locale: String,
    pub timezone: String,
    /// Ordered; `languages[0] == locale`
    pub languages: Vec<String>,
    pub platform: PlatformFamily,
}

/// Caller-pinned context fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextOverrides {
    pub locale: Option<String>,
    pub timezone: Option<String>,
    pub languages: Option<Vec<String>>,
    pub platform: Option<PlatformFamily>,
}

impl ContextOverrides {
    pub fn is_empty(&self) -> bool {
        self.locale.is_none()
            && self.timezone.is_none()
            && self.languages.is_none()
            && self.platform.is_none()
    }

    fn matches(&self, c: &GeoCandidate) -> bool {
        self.locale.as_deref().map_or(true, |l| c.locale == l)
            && self.timezone.as_deref().map_or(true, |tz| c.timezone == tz)
            && self.languages.as_ref().map_or(true, |langs| {
                langs.len() == c.languages.len()
                    && langs.iter().zip(c.languages).all(|(a, b)| a == b)
            })
            && self.platform.map_or(true, |p| c.platform == p)
    }
}

/// Degraded-consistency notice produced during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolutionEvent {
    UnknownGeography { requested: String, fallback: String },
    DiscardedOverride {
        field: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ResolutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionEvent::UnknownGeography {
                requested,
                fallback,
            } => write!(f, "unknown geography '{}', using '{}'", requested, fallback),
            ResolutionEvent::DiscardedOverride {
                field,
                value,
                reason,
            } => write!(f, "discarded {} override '{}': {}", field, value, reason),
        }
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolution {
    pub context: GeoContext,
    /// Overrides that survived sanitizing; later stages treat only these
    /// as caller-owned.
    pub accepted: ContextOverrides,
    pub events: Vec<ResolutionEvent>,
}

/// Resolve a geography code and overrides into a context.
///
/// Candidates are filtered by every accepted override and drawn with
/// `navigator.pick(0, n)`. If no candidate satisfies all overrides the draw
/// is made over the full list and the overridden fields are written over the
/// drawn tuple; the validator decides whether that result holds together.
pub fn resolve(
    requested: &str,
    overrides: &ContextOverrides,
    navigator: SubSeed,
    default_geography: &str,
) -> Resolution {
    let mut events = Vec::new();

    let geo = match catalog::geography(requested) {
        Some(g) => g,
        None => {
            let fallback = fallback_geography(default_geography);
            log::warn!(
                "⚠️ Unknown geography '{}', falling back to '{}'",
                requested,
                fallback.code
            );
            events.push(ResolutionEvent::UnknownGeography {
                requested: requested.to_string(),
                fallback: fallback.code.to_string(),
            });
            fallback
        }
    };

    let accepted = sanitize(overrides, &mut events);

    let filtered: Vec<&GeoCandidate> = geo
        .candidates
        .iter()
        .filter(|c| accepted.matches(c))
        .collect();

    let context = if let Some(c) = navigator.choose(0, &filtered) {
        from_candidate(geo, c)
    } else {
        let drawn = navigator
            .choose(0, geo.candidates)
            .unwrap_or(&geo.candidates[0]);
        let mut ctx = from_candidate(geo, drawn);
        if let Some(locale) = &accepted.locale {
            ctx.locale = locale.clone();
        }
        if let Some(tz) = &accepted.timezone {
            ctx.timezone = tz.clone();
        }
        if let Some(langs) = &accepted.languages {
            ctx.languages = langs.clone();
        }
        if let Some(platform) = accepted.platform {
            ctx.platform = platform;
        }
        ctx
    };

    Resolution {
        context,
        accepted,
        events,
    }
}

fn fallback_geography(code: &str) -> &'static Geography {
    catalog::geography(code).unwrap_or(&GEOGRAPHIES[0])
}

fn from_candidate(geo: &Geography, c: &GeoCandidate) -> GeoContext {
    GeoContext {
        geography: geo.code.to_string(),
        locale: c.locale.to_string(),
        timezone: c.timezone.to_string(),
        languages: c.languages.iter().map(|l| l.to_string()).collect(),
        platform: c.platform,
    }
}

/// Drop overrides no geography could ever satisfy.
fn sanitize(overrides: &ContextOverrides, events: &mut Vec<ResolutionEvent>) -> ContextOverrides {
    let mut accepted = overrides.clone();
    let mut discard = |field: &str, value: String, reason: &str| {
        log::warn!("⚠️ Discarding {} override '{}': {}", field, value, reason);
        events.push(ResolutionEvent::DiscardedOverride {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        });
    };

    if let Some(tz) = &overrides.timezone {
        if catalog::geography_for_timezone(tz).is_none() {
            discard("timezone", tz.clone(), "not a timezone of any known geography");
            accepted.timezone = None;
        }
    }

    if let Some(locale) = &overrides.locale {
        if !is_well_formed_locale(locale) {
            discard("locale", locale.clone(), "malformed language tag");
            accepted.locale = None;
        }
    }

    if let Some(langs) = &overrides.languages {
        if langs.is_empty() || !langs.iter().all(|l| is_well_formed_locale(l)) {
            discard("languages", langs.join(","), "empty list or malformed tag");
            accepted.languages = None;
        }
    }

    accepted
}

/// Loose BCP 47 shape check: `ll[-Xxxx][-RR]`.
pub fn is_well_formed_locale(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary = match parts.next() {
        Some(p) => p,
        None => return false,
    };
    if !(2..=3).contains(&primary.len()) || !primary.bytes().all(|b| b.is_ascii_lowercase()) {
        return false;
    }
    parts.all(|p| (2..=8).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_alphanumeric()))
}

/// Language list a browser configured for `locale` would send.
///
/// `de-DE` gives `["de-DE", "de", "en"]`; `en-US` gives `["en-US", "en"]`.
pub fn languages_for_locale(locale: &str) -> Vec<String> {
    let primary = locale.split('-').next().unwrap_or(locale);
    let mut langs = vec![locale.to_string()];
    if primary != locale {
        langs.push(primary.to_string());
    }
    if primary != "en" {
        langs.push("en".to_string());
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{Channel, RootSeed};

    fn nav(seed: u64) -> SubSeed {
        RootSeed::from_u64(seed).derive(Channel::Navigator)
    }

    #[test]
    fn test_de_scenario() {
        let r = resolve("DE", &ContextOverrides::default(), nav(424242), "US");
        assert_eq!(r.context.locale, "de-DE");
        assert_eq!(r.context.timezone, "Europe/Berlin");
        assert_eq!(r.context.languages, vec!["de-DE", "de", "en"]);
        assert_eq!(r.context.platform, PlatformFamily::Windows);
        assert!(r.events.is_empty());
    }

    #[test]
    fn test_unknown_geography_falls_back() {
        let r = resolve("ZZ", &ContextOverrides::default(), nav(1), "GB");
        assert_eq!(r.context.geography, "GB");
        assert_eq!(
            r.events,
            vec![ResolutionEvent::UnknownGeography {
                requested: "ZZ".into(),
                fallback: "GB".into()
            }]
        );
    }

    #[test]
    fn test_code_is_normalized() {
        let a = resolve(" de", &ContextOverrides::default(), nav(9), "US");
        let b = resolve("DE", &ContextOverrides::default(), nav(9), "US");
        assert_eq!(a.context, b.context);
        assert!(a.events.is_empty());
    }

    #[test]
    fn test_overrides_filter_candidates() {
        let o = ContextOverrides {
            platform: Some(PlatformFamily::Mac),
            ..Default::default()
        };
        for seed in 0..50 {
            let r = resolve("DE", &o, nav(seed), "US");
            assert_eq!(r.context.platform, PlatformFamily::Mac);
            assert_eq!(r.context.languages, vec!["de-DE", "de"]);
        }
    }

    #[test]
    fn test_unsatisfiable_override_is_written_verbatim() {
        let o = ContextOverrides {
            timezone: Some("America/New_York".into()),
            ..Default::default()
        };
        let r = resolve("DE", &o, nav(424242), "US");
        assert_eq!(r.context.geography, "DE");
        assert_eq!(r.context.timezone, "America/New_York");
        assert!(r.events.is_empty());
    }

    #[test]
    fn test_unknown_timezone_is_discarded() {
        let o = ContextOverrides {
            timezone: Some("Mars/Olympus_Mons".into()),
            locale: Some("de_DE".into()),
            ..Default::default()
        };
        let r = resolve("DE", &o, nav(424242), "US");
        assert_eq!(r.context.timezone, "Europe/Berlin");
        assert!(r.accepted.is_empty());
        assert_eq!(r.events.len(), 2);
    }

    #[test]
    fn test_locale_shape() {
        assert!(is_well_formed_locale("de-DE"));
        assert!(is_well_formed_locale("en"));
        assert!(is_well_formed_locale("zh-Hant-TW"));
        assert!(!is_well_formed_locale("de_DE"));
        assert!(!is_well_formed_locale("DE-de"));
        assert!(!is_well_formed_locale(""));
    }

    #[test]
    fn test_languages_for_locale() {
        assert_eq!(languages_for_locale("de-DE"), vec!["de-DE", "de", "en"]);
        assert_eq!(languages_for_locale("en-US"), vec!["en-US", "en"]);
        assert_eq!(languages_for_locale("fr"), vec!["fr", "en"]);
    }
}
