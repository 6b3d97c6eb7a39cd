//! Defense configuration and the page's view of the session profile.
//!
//! The sandbox never chooses a value of its own. Every spoofed attribute
//! comes from the decoded `FingerprintProfile`; this module only decides
//! which interception points are installed.

use std::cell::RefCell;
use std::rc::Rc;

use persona_core::FingerprintProfile;
use serde::{Deserialize, Serialize};

use crate::error::{DefenseError, Result};

/// Configuration for which defenses to apply.
/// All defenses are enabled by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    // Tier 1: Identity
    pub navigator: bool,
    pub screen: bool,
    pub canvas: bool,
    pub webgl: bool,
    // Tier 2: Derived signals
    pub timezone: bool,
    pub audio: bool,
    pub fonts: bool,
    pub performance: bool,
    // Same-origin frames get every enabled defense too
    pub frames: bool,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            navigator: true,
            screen: true,
            canvas: true,
            webgl: true,
            timezone: true,
            audio: true,
            fonts: true,
            performance: true,
            frames: true,
        }
    }
}

/// What this page has had installed.
#[derive(Debug, Clone)]
enum PageState {
    Clean,
    Installed(Rc<FingerprintProfile>, DefenseConfig),
    /// An install failed part-way; some interception points may be live.
    Broken { defense: String, reason: String },
}

thread_local! {
    static PAGE: RefCell<PageState> = const { RefCell::new(PageState::Clean) };
}

/// Outcome of [`admit`] for a decoded profile.
#[derive(Debug)]
pub(crate) enum Admission {
    /// Nothing installed yet; go ahead
    Fresh,
    /// The same profile and config are already live
    Repeat(Rc<FingerprintProfile>),
}

/// Decide whether `profile` may be installed on this page.
///
/// A page holds at most one profile. A page whose install failed part-way
/// refuses everything: its defenses are neither absent nor complete.
pub(crate) fn admit(profile: &FingerprintProfile, config: &DefenseConfig) -> Result<Admission> {
    PAGE.with(|page| match &*page.borrow() {
        PageState::Clean => Ok(Admission::Fresh),
        PageState::Installed(active, active_config) => {
            if **active == *profile && active_config == config {
                Ok(Admission::Repeat(Rc::clone(active)))
            } else {
                Err(DefenseError::AlreadyApplied)
            }
        }
        PageState::Broken { defense, reason } => Err(DefenseError::InstallFailed {
            defense: defense.clone(),
            reason: reason.clone(),
        }),
    })
}

/// Profile the page's defenses were installed from, if any.
pub fn active_profile() -> Option<Rc<FingerprintProfile>> {
    PAGE.with(|page| match &*page.borrow() {
        PageState::Installed(p, _) => Some(Rc::clone(p)),
        _ => None,
    })
}

/// Config the page's defenses were installed with, if any.
pub fn active_config() -> Option<DefenseConfig> {
    PAGE.with(|page| match &*page.borrow() {
        PageState::Installed(_, c) => Some(c.clone()),
        _ => None,
    })
}

/// Record the installed profile once every defense is live.
///
/// Returns `false` unless the page was clean.
pub(crate) fn publish(profile: Rc<FingerprintProfile>, config: DefenseConfig) -> bool {
    PAGE.with(|page| {
        let mut state = page.borrow_mut();
        if !matches!(*state, PageState::Clean) {
            return false;
        }
        *state = PageState::Installed(profile, config);
        true
    })
}

/// Record a failed install. Later installs on this page are refused.
pub(crate) fn mark_broken(err: &DefenseError) {
    let (defense, reason) = match err {
        DefenseError::InstallFailed { defense, reason } => (defense.clone(), reason.clone()),
        other => ("install".to_string(), other.to_string()),
    };
    log::error!("❌ Page left with a partial persona: {} ({})", defense, reason);
    PAGE.with(|page| *page.borrow_mut() = PageState::Broken { defense, reason });
}

#[cfg(test)]
fn reset() {
    PAGE.with(|page| *page.borrow_mut() = PageState::Clean);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_options_keep_defaults() {
        let config: DefenseConfig = serde_json::from_str(r#"{"canvas": false}"#).unwrap();
        assert!(!config.canvas);
        assert!(config.navigator);
        assert!(config.frames);
    }

    #[test]
    fn test_unknown_toggle_is_ignored() {
        let config: DefenseConfig = serde_json::from_str(r#"{"webrtc": true}"#).unwrap();
        assert_eq!(config, DefenseConfig::default());
    }

    fn profile(seed: u64) -> Rc<FingerprintProfile> {
        use persona_core::{build_profile, EngineConfig, ProfileOverrides, RootSeed};
        let build = build_profile(
            &RootSeed::from_u64(seed),
            "DE",
            &ProfileOverrides::default(),
            &EngineConfig::default(),
        )
        .unwrap();
        Rc::new(build.profile)
    }

    #[test]
    fn test_one_profile_per_page() {
        reset();
        let p = profile(1);
        let config = DefenseConfig::default();
        assert!(matches!(admit(&p, &config), Ok(Admission::Fresh)));
        assert!(publish(Rc::clone(&p), config.clone()));

        assert!(matches!(admit(&p, &config), Ok(Admission::Repeat(_))));
        assert!(matches!(
            admit(&profile(2), &config),
            Err(DefenseError::AlreadyApplied)
        ));
        let fewer = DefenseConfig {
            audio: false,
            ..DefenseConfig::default()
        };
        assert!(matches!(admit(&p, &fewer), Err(DefenseError::AlreadyApplied)));
    }

    #[test]
    fn test_failed_install_refuses_retries() {
        reset();
        let p = profile(3);
        let config = DefenseConfig::default();
        mark_broken(&DefenseError::InstallFailed {
            defense: "webgl".into(),
            reason: "TypeError".into(),
        });

        // Neither a retry nor a repeat report success on a half-patched page
        let err = admit(&p, &config).unwrap_err();
        assert!(matches!(&err, DefenseError::InstallFailed { defense, .. } if defense == "webgl"));
        assert!(!err.is_retryable());
        assert!(!publish(Rc::clone(&p), config));
        assert!(active_profile().is_none());
    }
}
