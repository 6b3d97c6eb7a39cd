//! Profile construction: resolve, generate, validate, repair once, publish.

use std::collections::BTreeMap;

use crate::attributes::{self, ProfileOverrides};
use crate::config::EngineConfig;
use crate::context::{self, ResolutionEvent};
use crate::error::Result;
use crate::profile::{ChannelNoise, FingerprintProfile};
use crate::seed::{Channel, RootSeed};
use crate::validator::{self, RepairAction};

/// A published profile plus how it came to be.
#[derive(Debug, Clone)]
pub struct ProfileBuild {
    pub profile: FingerprintProfile,
    /// Degraded-consistency notices from resolution
    pub events: Vec<ResolutionEvent>,
    /// Empty unless the first draw needed repair
    pub repairs: Vec<RepairAction>,
}

/// One unvalidated draw.
#[derive(Debug, Clone)]
pub struct Assembly {
    pub profile: FingerprintProfile,
    /// Overrides left after resolution dropped unusable ones
    pub accepted: ProfileOverrides,
    pub events: Vec<ResolutionEvent>,
}

/// Resolve and generate without validating.
pub fn assemble(
    root: &RootSeed,
    geography: &str,
    overrides: &ProfileOverrides,
    config: &EngineConfig,
) -> Assembly {
    let resolution = context::resolve(
        geography,
        &overrides.context,
        root.derive(Channel::Navigator),
        &config.default_geography,
    );
    let accepted = ProfileOverrides {
        context: resolution.accepted,
        ..overrides.clone()
    };
    let attrs = attributes::generate(root, &resolution.context, &accepted);

    let channels: BTreeMap<Channel, ChannelNoise> = Channel::ALL
        .into_iter()
        .map(|channel| {
            let params = config.noise_params(channel);
            let noise = ChannelNoise {
                sub_seed: root.derive(channel),
                amplitude: params.amplitude,
                density: params.density,
            };
            (channel, noise)
        })
        .collect();

    let profile = FingerprintProfile {
        root_seed_echo: root.value(),
        context: resolution.context,
        hardware: attrs.hardware,
        screen: attrs.screen,
        gpu: attrs.gpu,
        fonts: attrs.fonts,
        browser: attrs.browser,
        webdriver: false,
        timer_precision_ms: config.timer_precision_ms,
        channels,
    };

    Assembly {
        profile,
        accepted,
        events: resolution.events,
    }
}

/// Build a validated profile.
///
/// A first draw that violates an invariant gets exactly one repair pass;
/// anything still wrong afterwards is [`crate::PersonaError::Inconsistent`].
pub fn build_profile(
    root: &RootSeed,
    geography: &str,
    overrides: &ProfileOverrides,
    config: &EngineConfig,
) -> Result<ProfileBuild> {
    let first = assemble(root, geography, overrides, config);
    let mut events = first.events;
    let validation = validator::validate(first.profile);
    if validation.is_consistent() {
        log_published(&validation.profile);
        return Ok(ProfileBuild {
            profile: validation.profile,
            events,
            repairs: Vec::new(),
        });
    }

    for v in &validation.violations {
        log::warn!("⚠️ Profile violation: {}", v);
    }
    let plan = validator::plan_repair(&validation, &first.accepted)?;
    for action in &plan.actions {
        log::info!("🔧 Repair: {}", action);
    }

    let second = assemble(root, &plan.geography, &plan.overrides, config);
    events.extend(second.events);
    let profile = validator::validate(second.profile).into_result()?;
    log_published(&profile);

    Ok(ProfileBuild {
        profile,
        events,
        repairs: plan.actions,
    })
}

fn log_published(p: &FingerprintProfile) {
    log::info!(
        "🎭 Profile ready: {} / {} / {} ({})",
        p.context.geography,
        p.context.locale,
        p.context.timezone,
        p.context.platform
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextOverrides;
    use crate::profile::PlatformFamily;
    use crate::PersonaError;

    fn build(seed: u64, geo: &str, o: &ProfileOverrides) -> Result<ProfileBuild> {
        build_profile(&RootSeed::from_u64(seed), geo, o, &EngineConfig::default())
    }

    #[test]
    fn test_clean_build_needs_no_repair() {
        let b = build(424242, "DE", &ProfileOverrides::default()).unwrap();
        assert!(b.repairs.is_empty());
        assert!(b.events.is_empty());
        assert_eq!(b.profile.root_seed_echo, 424242);
        assert_eq!(b.profile.channels.len(), Channel::ALL.len());
    }

    #[test]
    fn test_foreign_timezone_switches_geography() {
        let o = ProfileOverrides {
            context: ContextOverrides {
                timezone: Some("America/New_York".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let b = build(424242, "DE", &o).unwrap();
        assert_eq!(b.profile.context.geography, "US");
        assert_eq!(b.profile.context.timezone, "America/New_York");
        assert!(matches!(
            b.repairs.as_slice(),
            [RepairAction::SwitchGeography { .. }]
        ));
    }

    #[test]
    fn test_foreign_gpu_forces_platform() {
        let mac = &crate::catalog::gpus(PlatformFamily::Mac)[2];
        let o = ProfileOverrides {
            gpu_renderer: Some(mac.renderer.to_string()),
            ..Default::default()
        };
        for seed in 0..20 {
            let b = build(seed, "US", &o).unwrap();
            assert_eq!(b.profile.platform(), PlatformFamily::Mac);
            assert_eq!(b.profile.gpu.vendor, mac.vendor);
            assert_eq!(b.profile.browser.platform, "MacIntel");
        }
    }

    #[test]
    fn test_pinned_platform_and_foreign_gpu_is_hard_error() {
        let mac = &crate::catalog::gpus(PlatformFamily::Mac)[0];
        let o = ProfileOverrides {
            context: ContextOverrides {
                platform: Some(PlatformFamily::Windows),
                ..Default::default()
            },
            gpu_vendor: Some(mac.vendor.to_string()),
            gpu_renderer: Some(mac.renderer.to_string()),
            ..Default::default()
        };
        let err = build(1, "US", &o).unwrap_err();
        assert!(matches!(err, PersonaError::Inconsistent(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_off_list_hardware_is_hard_error() {
        let o = ProfileOverrides {
            hardware_concurrency: Some(3),
            ..Default::default()
        };
        let err = build(1, "US", &o).unwrap_err();
        assert!(err.to_string().contains("3 cores"));
    }
}
