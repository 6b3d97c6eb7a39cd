//! Attribute generation.
//!
//! One deterministic draw per family from the vetted tables in
//! [`crate::catalog`], after filtering by the resolved platform and by any
//! caller overrides.

use serde::{Deserialize, Serialize};

use crate::catalog::{self, GpuCandidate, ScreenCandidate};
use crate::context::{ContextOverrides, GeoContext};
use crate::profile::{
    BrowserDescriptor, GpuDescriptor, HardwareDescriptor, PlatformFamily, ScreenDescriptor,
};
use crate::seed::{Channel, RootSeed, SubSeed};

/// Per-field overrides for a whole profile.
///
/// A field set here wins over the seeded draw. When no vetted candidate
/// carries the value, it is written verbatim and the validator decides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileOverrides {
    #[serde(flatten)]
    pub context: ContextOverrides,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    pub color_depth: Option<u32>,
    pub hardware_concurrency: Option<u32>,
    pub device_memory: Option<u32>,
    pub gpu_vendor: Option<String>,
    pub gpu_renderer: Option<String>,
}

impl ProfileOverrides {
    pub fn has_screen(&self) -> bool {
        self.screen_width.is_some() || self.screen_height.is_some() || self.color_depth.is_some()
    }

    fn screen_matches(&self, s: &ScreenCandidate) -> bool {
        self.screen_width.map_or(true, |w| s.width == w)
            && self.screen_height.map_or(true, |h| s.height == h)
            && self.color_depth.map_or(true, |d| s.color_depth == d)
    }

    fn gpu_matches(&self, g: &GpuCandidate) -> bool {
        self.gpu_vendor.as_deref().map_or(true, |v| g.vendor == v)
            && self.gpu_renderer.as_deref().map_or(true, |r| g.renderer == r)
    }
}

/// Everything the generator produces for one context.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributes {
    pub hardware: HardwareDescriptor,
    pub screen: ScreenDescriptor,
    pub gpu: GpuDescriptor,
    pub fonts: Vec<String>,
    pub browser: BrowserDescriptor,
}

pub fn generate(root: &RootSeed, ctx: &GeoContext, overrides: &ProfileOverrides) -> Attributes {
    let platform = ctx.platform;
    Attributes {
        hardware: hardware(root.derive(Channel::Hardware), overrides),
        screen: screen(root.derive(Channel::Screen), platform, overrides),
        gpu: gpu(root.derive(Channel::Gpu), platform, overrides),
        fonts: fonts(root.derive(Channel::Fonts), platform),
        browser: browser(root.derive(Channel::Navigator), platform),
    }
}

/// Draw from `filtered` if it has anything, otherwise from `all`.
fn draw<T: Copy>(seed: SubSeed, slot: u64, filtered: &[T], all: &[T]) -> Option<(T, bool)> {
    if let Some(v) = seed.choose(slot, filtered) {
        return Some((*v, true));
    }
    seed.choose(slot, all).map(|v| (*v, false))
}

fn hardware(seed: SubSeed, o: &ProfileOverrides) -> HardwareDescriptor {
    let cores_filtered: Vec<u32> = catalog::HARDWARE_CONCURRENCY
        .iter()
        .copied()
        .filter(|c| o.hardware_concurrency.map_or(true, |v| *c == v))
        .filter(|c| o.device_memory.map_or(true, |m| catalog::memory_floor(*c) <= m))
        .collect();
    let hardware_concurrency = match o.hardware_concurrency {
        Some(v) if cores_filtered.is_empty() => v,
        _ => draw(seed, 0, &cores_filtered, catalog::HARDWARE_CONCURRENCY)
            .map_or(catalog::HARDWARE_CONCURRENCY[0], |(v, _)| v),
    };

    let floor = catalog::memory_floor(hardware_concurrency);
    let floored: Vec<u32> = catalog::DEVICE_MEMORY
        .iter()
        .copied()
        .filter(|m| *m >= floor)
        .collect();
    let memory_filtered: Vec<u32> = floored
        .iter()
        .copied()
        .filter(|m| o.device_memory.map_or(true, |v| *m == v))
        .collect();
    let device_memory = match o.device_memory {
        Some(v) if memory_filtered.is_empty() => v,
        _ => draw(seed, 1, &memory_filtered, &floored)
            .map_or(catalog::DEVICE_MEMORY[0], |(v, _)| v),
    };

    HardwareDescriptor {
        hardware_concurrency,
        device_memory,
    }
}

fn screen(seed: SubSeed, platform: PlatformFamily, o: &ProfileOverrides) -> ScreenDescriptor {
    let all = catalog::screens(platform);
    let filtered: Vec<ScreenCandidate> = all.iter().copied().filter(|s| o.screen_matches(s)).collect();
    let (mut s, matched) = draw(seed, 0, &filtered, all).unwrap_or((all[0], false));
    if !matched {
        s.width = o.screen_width.unwrap_or(s.width);
        s.height = o.screen_height.unwrap_or(s.height);
        s.color_depth = o.color_depth.unwrap_or(s.color_depth);
    }
    ScreenDescriptor {
        width: s.width,
        height: s.height,
        avail_width: s.width,
        avail_height: s.height.saturating_sub(catalog::chrome_height(platform)),
        color_depth: s.color_depth,
        pixel_ratio: s.pixel_ratio,
    }
}

fn gpu(seed: SubSeed, platform: PlatformFamily, o: &ProfileOverrides) -> GpuDescriptor {
    let all = catalog::gpus(platform);
    let filtered: Vec<GpuCandidate> = all.iter().copied().filter(|g| o.gpu_matches(g)).collect();
    let (g, matched) = draw(seed, 0, &filtered, all).unwrap_or((all[0], false));
    if matched {
        return GpuDescriptor {
            vendor: g.vendor.to_string(),
            renderer: g.renderer.to_string(),
        };
    }
    GpuDescriptor {
        vendor: o.gpu_vendor.clone().unwrap_or_else(|| g.vendor.to_string()),
        renderer: o
            .gpu_renderer
            .clone()
            .unwrap_or_else(|| g.renderer.to_string()),
    }
}

fn fonts(seed: SubSeed, platform: PlatformFamily) -> Vec<String> {
    let bundles = catalog::font_bundles(platform);
    seed.choose(0, bundles)
        .map(|b| b.iter().map(|f| f.to_string()).collect())
        .unwrap_or_default()
}

/// Browser identity. Shares the navigator channel with context resolution,
/// so it draws from slot 1.
fn browser(seed: SubSeed, platform: PlatformFamily) -> BrowserDescriptor {
    let major = seed
        .choose(1, catalog::CHROME_MAJOR_VERSIONS)
        .copied()
        .unwrap_or(catalog::CHROME_MAJOR_VERSIONS[0]);
    let user_agent = catalog::user_agent(platform, major);
    BrowserDescriptor {
        major_version: major,
        app_version: catalog::app_version(&user_agent),
        user_agent,
        platform: platform.navigator_platform().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{resolve, ContextOverrides};

    fn ctx(platform: PlatformFamily) -> GeoContext {
        GeoContext {
            geography: "US".into(),
            locale: "en-US".into(),
            timezone: "America/New_York".into(),
            languages: vec!["en-US".into(), "en".into()],
            platform,
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let root = RootSeed::from_u64(424242);
        let r = resolve("DE", &ContextOverrides::default(), root.derive(Channel::Navigator), "US");
        let a = generate(&root, &r.context, &ProfileOverrides::default());
        let b = generate(&root, &r.context, &ProfileOverrides::default());
        assert_eq!(a, b);
    }

    #[test]
    fn test_memory_respects_core_floor() {
        for seed in 0..500 {
            let hw = hardware(SubSeed::new(seed), &ProfileOverrides::default());
            assert!(catalog::HARDWARE_CONCURRENCY.contains(&hw.hardware_concurrency));
            assert!(hw.device_memory >= catalog::memory_floor(hw.hardware_concurrency));
        }
    }

    #[test]
    fn test_memory_override_limits_cores() {
        let o = ProfileOverrides {
            device_memory: Some(2),
            ..Default::default()
        };
        for seed in 0..200 {
            let hw = hardware(SubSeed::new(seed), &o);
            assert_eq!(hw.device_memory, 2);
            assert!(hw.hardware_concurrency <= 4);
        }
    }

    #[test]
    fn test_off_list_override_is_written_verbatim() {
        let o = ProfileOverrides {
            hardware_concurrency: Some(3),
            ..Default::default()
        };
        let hw = hardware(SubSeed::new(5), &o);
        assert_eq!(hw.hardware_concurrency, 3);
    }

    #[test]
    fn test_screen_avail_subtracts_platform_chrome() {
        let root = RootSeed::from_u64(7);
        for platform in PlatformFamily::ALL {
            let s = generate(&root, &ctx(platform), &ProfileOverrides::default()).screen;
            assert_eq!(s.avail_width, s.width);
            assert_eq!(s.avail_height + catalog::chrome_height(platform), s.height);
        }
    }

    #[test]
    fn test_screen_override_selects_vetted_tuple() {
        let o = ProfileOverrides {
            screen_width: Some(1536),
            ..Default::default()
        };
        let s = screen(SubSeed::new(11), PlatformFamily::Windows, &o);
        assert_eq!((s.width, s.height), (1536, 864));
        assert_eq!(s.pixel_ratio, 1.25);
    }

    #[test]
    fn test_gpu_is_vetted_for_platform() {
        for seed in 0..100 {
            for platform in PlatformFamily::ALL {
                let g = gpu(SubSeed::new(seed), platform, &ProfileOverrides::default());
                assert_eq!(catalog::gpu_platform(&g.vendor, &g.renderer), Some(platform));
            }
        }
    }

    #[test]
    fn test_foreign_renderer_is_written_verbatim() {
        let mac = &catalog::gpus(PlatformFamily::Mac)[0];
        let o = ProfileOverrides {
            gpu_renderer: Some(mac.renderer.to_string()),
            ..Default::default()
        };
        let g = gpu(SubSeed::new(3), PlatformFamily::Windows, &o);
        assert_eq!(g.renderer, mac.renderer);
        assert!(g.vendor.starts_with("Google Inc."));
    }

    #[test]
    fn test_browser_matches_platform() {
        let b = browser(SubSeed::new(99), PlatformFamily::Linux);
        assert_eq!(b.platform, "Linux x86_64");
        assert!(b.user_agent.contains("X11; Linux x86_64"));
        assert!(catalog::CHROME_MAJOR_VERSIONS.contains(&b.major_version));
    }

    #[test]
    fn test_overrides_deserialize_flat() {
        let o: ProfileOverrides =
            serde_json::from_str(r#"{"timezone":"Europe/Berlin","deviceMemory":8}"#).unwrap();
        assert_eq!(o.context.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(o.device_memory, Some(8));
    }
}
