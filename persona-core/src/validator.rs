//! Consistency validation and single-pass repair planning.

use std::fmt;

use serde::Serialize;

use crate::attributes::ProfileOverrides;
use crate::catalog;
use crate::context::languages_for_locale;
use crate::error::{PersonaError, Result};
use crate::profile::{FingerprintProfile, PlatformFamily};
use crate::seed::{Channel, MAX_SUB_SEED};

/// A broken cross-attribute invariant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    UnknownGeography {
        geography: String,
    },
    TimezoneOutsideGeography {
        timezone: String,
        geography: String,
    },
    LanguagesNotLedByLocale {
        locale: String,
        first: Option<String>,
    },
    HardwareNotEnumerated {
        hardware_concurrency: u32,
        device_memory: u32,
    },
    MemoryBelowCoreFloor {
        hardware_concurrency: u32,
        device_memory: u32,
        floor: u32,
    },
    ScreenNotVetted {
        width: u32,
        height: u32,
        platform: PlatformFamily,
    },
    ScreenAvailExceedsTotal,
    GpuNotVetted {
        vendor: String,
        renderer: String,
    },
    GpuPlatformMismatch {
        renderer: String,
        gpu_platform: PlatformFamily,
        platform: PlatformFamily,
    },
    FontsNotVetted {
        platform: PlatformFamily,
    },
    UserAgentMismatch {
        platform: PlatformFamily,
    },
    AutomationFlagPresent,
    TimerPrecisionInvalid {
        value: f64,
    },
    ChannelMissing {
        channel: Channel,
    },
    SubSeedOutOfRange {
        channel: Channel,
    },
    NoiseOutOfBounds {
        channel: Channel,
        amplitude: f64,
        density: f64,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnknownGeography { geography } => {
                write!(f, "geography '{}' is not in the catalog", geography)
            }
            Violation::TimezoneOutsideGeography {
                timezone,
                geography,
            } => write!(f, "timezone {} is not valid for {}", timezone, geography),
            Violation::LanguagesNotLedByLocale { locale, first } => write!(
                f,
                "languages start with {} but locale is {}",
                first.as_deref().unwrap_or("nothing"),
                locale
            ),
            Violation::HardwareNotEnumerated {
                hardware_concurrency,
                device_memory,
            } => write!(
                f,
                "{} cores / {} GiB is not an enumerated hardware configuration",
                hardware_concurrency, device_memory
            ),
            Violation::MemoryBelowCoreFloor {
                hardware_concurrency,
                device_memory,
                floor,
            } => write!(
                f,
                "{} GiB is below the {} GiB floor for {} cores",
                device_memory, floor, hardware_concurrency
            ),
            Violation::ScreenNotVetted {
                width,
                height,
                platform,
            } => write!(f, "screen {}x{} is not vetted for {}", width, height, platform),
            Violation::ScreenAvailExceedsTotal => {
                f.write_str("available screen area exceeds total")
            }
            Violation::GpuNotVetted { vendor, renderer } => {
                write!(f, "GPU pair '{}' / '{}' is not vetted", vendor, renderer)
            }
            Violation::GpuPlatformMismatch {
                renderer,
                gpu_platform,
                platform,
            } => write!(
                f,
                "GPU '{}' belongs to {} but platform is {}",
                renderer, gpu_platform, platform
            ),
            Violation::FontsNotVetted { platform } => {
                write!(f, "font list is not a vetted {} bundle", platform)
            }
            Violation::UserAgentMismatch { platform } => {
                write!(f, "browser identity does not match platform {}", platform)
            }
            Violation::AutomationFlagPresent => {
                f.write_str("automation flag (navigator.webdriver) is set")
            }
            Violation::TimerPrecisionInvalid { value } => {
                write!(f, "timer precision {} must be finite and positive", value)
            }
            Violation::ChannelMissing { channel } => write!(f, "channel {} is missing", channel),
            Violation::SubSeedOutOfRange { channel } => {
                write!(f, "sub-seed for {} exceeds 53 bits", channel)
            }
            Violation::NoiseOutOfBounds {
                channel,
                amplitude,
                density,
            } => write!(
                f,
                "noise bounds for {} out of range (amplitude {}, density {})",
                channel, amplitude, density
            ),
        }
    }
}

/// Profile together with everything wrong with it.
#[derive(Debug, Clone)]
pub struct Validation {
    pub profile: FingerprintProfile,
    pub violations: Vec<Violation>,
}

impl Validation {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }

    /// The profile if consistent, otherwise [`PersonaError::Inconsistent`].
    pub fn into_result(self) -> Result<FingerprintProfile> {
        if self.violations.is_empty() {
            Ok(self.profile)
        } else {
            Err(PersonaError::Inconsistent(self.violations))
        }
    }
}

pub fn validate(profile: FingerprintProfile) -> Validation {
    let violations = check(&profile);
    Validation {
        profile,
        violations,
    }
}

/// Collect every violation in `p`.
pub fn check(p: &FingerprintProfile) -> Vec<Violation> {
    let mut v = Vec::new();
    let ctx = &p.context;
    let platform = ctx.platform;

    match catalog::geography(&ctx.geography) {
        None => v.push(Violation::UnknownGeography {
            geography: ctx.geography.clone(),
        }),
        Some(g) if !g.has_timezone(&ctx.timezone) => {
            v.push(Violation::TimezoneOutsideGeography {
                timezone: ctx.timezone.clone(),
                geography: ctx.geography.clone(),
            })
        }
        Some(_) => {}
    }

    if ctx.languages.first() != Some(&ctx.locale) {
        v.push(Violation::LanguagesNotLedByLocale {
            locale: ctx.locale.clone(),
            first: ctx.languages.first().cloned(),
        });
    }

    let hw = &p.hardware;
    if !catalog::HARDWARE_CONCURRENCY.contains(&hw.hardware_concurrency)
        || !catalog::DEVICE_MEMORY.contains(&hw.device_memory)
    {
        v.push(Violation::HardwareNotEnumerated {
            hardware_concurrency: hw.hardware_concurrency,
            device_memory: hw.device_memory,
        });
    } else {
        let floor = catalog::memory_floor(hw.hardware_concurrency);
        if hw.device_memory < floor {
            v.push(Violation::MemoryBelowCoreFloor {
                hardware_concurrency: hw.hardware_concurrency,
                device_memory: hw.device_memory,
                floor,
            });
        }
    }

    let s = &p.screen;
    let vetted = catalog::screens(platform).iter().any(|c| {
        c.width == s.width
            && c.height == s.height
            && c.color_depth == s.color_depth
            && c.pixel_ratio == s.pixel_ratio
    });
    if !vetted {
        v.push(Violation::ScreenNotVetted {
            width: s.width,
            height: s.height,
            platform,
        });
    }
    if s.avail_width > s.width || s.avail_height > s.height {
        v.push(Violation::ScreenAvailExceedsTotal);
    }

    match catalog::gpu_platform(&p.gpu.vendor, &p.gpu.renderer) {
        None => v.push(Violation::GpuNotVetted {
            vendor: p.gpu.vendor.clone(),
            renderer: p.gpu.renderer.clone(),
        }),
        Some(gpu_platform) if gpu_platform != platform => v.push(Violation::GpuPlatformMismatch {
            renderer: p.gpu.renderer.clone(),
            gpu_platform,
            platform,
        }),
        Some(_) => {}
    }

    let fonts_vetted = catalog::font_bundles(platform).iter().any(|bundle| {
        bundle.len() == p.fonts.len() && bundle.iter().zip(&p.fonts).all(|(a, b)| *a == b.as_str())
    });
    if !fonts_vetted {
        v.push(Violation::FontsNotVetted { platform });
    }

    let b = &p.browser;
    let ua = catalog::user_agent(platform, b.major_version);
    if !catalog::CHROME_MAJOR_VERSIONS.contains(&b.major_version)
        || b.user_agent != ua
        || b.app_version != catalog::app_version(&ua)
        || b.platform != platform.navigator_platform()
    {
        v.push(Violation::UserAgentMismatch { platform });
    }

    if p.webdriver {
        v.push(Violation::AutomationFlagPresent);
    }

    if !p.timer_precision_ms.is_finite() || p.timer_precision_ms <= 0.0 {
        v.push(Violation::TimerPrecisionInvalid {
            value: p.timer_precision_ms,
        });
    }

    for channel in Channel::ALL {
        match p.channels.get(&channel) {
            None => v.push(Violation::ChannelMissing { channel }),
            Some(c) => {
                if c.sub_seed.value() > MAX_SUB_SEED {
                    v.push(Violation::SubSeedOutOfRange { channel });
                }
                let amplitude_ok = c.amplitude.is_finite() && c.amplitude >= 0.0;
                let density_ok = c.density.is_finite() && (0.0..=1.0).contains(&c.density);
                if !amplitude_ok || !density_ok {
                    v.push(Violation::NoiseOutOfBounds {
                        channel,
                        amplitude: c.amplitude,
                        density: c.density,
                    });
                }
            }
        }
    }

    v
}

/// Corrective step chosen for a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum RepairAction {
    SwitchGeography { from: String, to: String },
    DeriveLanguages { locale: String },
    AdoptLocale { locale: String },
    ForceGpuVendor { vendor: String },
    ForcePlatform { from: PlatformFamily, to: PlatformFamily },
    Regenerate { reason: String },
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepairAction::SwitchGeography { from, to } => {
                write!(f, "switch geography {} -> {}", from, to)
            }
            RepairAction::DeriveLanguages { locale } => {
                write!(f, "derive languages from locale {}", locale)
            }
            RepairAction::AdoptLocale { locale } => write!(f, "adopt locale {}", locale),
            RepairAction::ForceGpuVendor { vendor } => write!(f, "force GPU vendor {}", vendor),
            RepairAction::ForcePlatform { from, to } => {
                write!(f, "force platform {} -> {}", from, to)
            }
            RepairAction::Regenerate { reason } => write!(f, "regenerate ({})", reason),
        }
    }
}

/// Constraints for the single regeneration pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairPlan {
    /// Geography to resolve against
    pub geography: String,
    /// Caller overrides plus forced constraints
    pub overrides: ProfileOverrides,
    pub actions: Vec<RepairAction>,
}

/// Turn violations into forced constraints.
///
/// `user` holds the caller's accepted overrides. A conflicting value the
/// caller pinned is kept and the other side is re-resolved; if the caller
/// pinned both sides, or the pinned value has no vetted counterpart, the
/// profile cannot be repaired.
pub fn plan_repair(validation: &Validation, user: &ProfileOverrides) -> Result<RepairPlan> {
    let p = &validation.profile;
    let platform = p.context.platform;
    let mut plan = RepairPlan {
        geography: p.context.geography.clone(),
        overrides: user.clone(),
        actions: Vec::new(),
    };
    let mut unrepairable = Vec::new();

    let force_platform = |plan: &mut RepairPlan, to: PlatformFamily| -> bool {
        if user.context.platform.is_some() {
            return false;
        }
        match plan.overrides.context.platform {
            Some(existing) if existing != to => false,
            Some(_) => true,
            None => {
                plan.overrides.context.platform = Some(to);
                plan.actions.push(RepairAction::ForcePlatform { from: platform, to });
                true
            }
        }
    };

    for violation in &validation.violations {
        let repaired = match violation {
            Violation::TimezoneOutsideGeography { timezone, geography } => {
                match catalog::geography_for_timezone(timezone) {
                    Some(g) if user.context.timezone.is_some() => {
                        plan.geography = g.code.to_string();
                        plan.actions.push(RepairAction::SwitchGeography {
                            from: geography.clone(),
                            to: g.code.to_string(),
                        });
                        true
                    }
                    _ => false,
                }
            }
            Violation::LanguagesNotLedByLocale { locale, first } => {
                match (&user.context.locale, &user.context.languages) {
                    (Some(_), None) => {
                        plan.overrides.context.languages = Some(languages_for_locale(locale));
                        plan.actions.push(RepairAction::DeriveLanguages {
                            locale: locale.clone(),
                        });
                        true
                    }
                    (None, Some(_)) => match first {
                        Some(first) => {
                            plan.overrides.context.locale = Some(first.clone());
                            plan.actions.push(RepairAction::AdoptLocale {
                                locale: first.clone(),
                            });
                            true
                        }
                        None => false,
                    },
                    _ => false,
                }
            }
            Violation::MemoryBelowCoreFloor { .. } => {
                let both = user.hardware_concurrency.is_some() && user.device_memory.is_some();
                if !both {
                    plan.actions.push(RepairAction::Regenerate {
                        reason: violation.to_string(),
                    });
                }
                !both
            }
            Violation::ScreenNotVetted { width, height, .. } => {
                let candidates: Vec<PlatformFamily> = catalog::platforms_with_screen(*width, *height)
                    .into_iter()
                    .filter(|p| *p != platform)
                    .collect();
                match candidates.first() {
                    Some(to) if user.has_screen() => force_platform(&mut plan, *to),
                    _ => false,
                }
            }
            Violation::GpuNotVetted { vendor, renderer } => {
                match (&user.gpu_vendor, &user.gpu_renderer) {
                    (None, Some(_)) => match catalog::gpu_by_renderer(renderer) {
                        Some((owner, g)) => {
                            plan.overrides.gpu_vendor = Some(g.vendor.to_string());
                            plan.actions.push(RepairAction::ForceGpuVendor {
                                vendor: g.vendor.to_string(),
                            });
                            owner == platform || force_platform(&mut plan, owner)
                        }
                        None => false,
                    },
                    (Some(_), None) => {
                        let owner = PlatformFamily::ALL.into_iter().find(|p| {
                            *p != platform && catalog::gpus(*p).iter().any(|g| g.vendor == vendor.as_str())
                        });
                        match owner {
                            Some(owner) => force_platform(&mut plan, owner),
                            None => false,
                        }
                    }
                    _ => false,
                }
            }
            Violation::GpuPlatformMismatch { gpu_platform, .. } => {
                force_platform(&mut plan, *gpu_platform)
            }
            Violation::ScreenAvailExceedsTotal
            | Violation::FontsNotVetted { .. }
            | Violation::UserAgentMismatch { .. }
            | Violation::AutomationFlagPresent => {
                plan.actions.push(RepairAction::Regenerate {
                    reason: violation.to_string(),
                });
                true
            }
            Violation::UnknownGeography { .. }
            | Violation::HardwareNotEnumerated { .. }
            | Violation::TimerPrecisionInvalid { .. }
            | Violation::ChannelMissing { .. }
            | Violation::SubSeedOutOfRange { .. }
            | Violation::NoiseOutOfBounds { .. } => false,
        };
        if !repaired {
            unrepairable.push(violation.clone());
        }
    }

    if unrepairable.is_empty() {
        Ok(plan)
    } else {
        Err(PersonaError::Inconsistent(unrepairable))
    }
}
