//! Vetted candidate tables.
//!
//! Every value a profile can carry comes from here. Tables are ordered and
//! that order is part of the determinism contract: reordering an entry
//! changes which profile a given seed produces.

use crate::profile::PlatformFamily;

/// One known-consistent context tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoCandidate {
    pub locale: &'static str,
    pub timezone: &'static str,
    pub languages: &'static [&'static str],
    pub platform: PlatformFamily,
}

#[derive(Debug, Clone, Copy)]
pub struct Geography {
    pub code: &'static str,
    /// Every IANA zone a client in this region may legitimately report
    pub timezones: &'static [&'static str],
    pub candidates: &'static [GeoCandidate],
}

impl Geography {
    pub fn has_timezone(&self, tz: &str) -> bool {
        self.timezones.contains(&tz)
    }
}

const fn geo(
    locale: &'static str,
    timezone: &'static str,
    languages: &'static [&'static str],
    platform: PlatformFamily,
) -> GeoCandidate {
    GeoCandidate {
        locale,
        timezone,
        languages,
        platform,
    }
}

use PlatformFamily::{Linux, Mac, Windows};

pub static GEOGRAPHIES: &[Geography] = &[
    Geography {
        code: "US",
        timezones: &[
            "America/New_York",
            "America/Chicago",
            "America/Denver",
            "America/Phoenix",
            "America/Los_Angeles",
            "America/Anchorage",
            "Pacific/Honolulu",
        ],
        candidates: &[
            geo("en-US", "America/New_York", &["en-US", "en"], Windows),
            geo("en-US", "America/Chicago", &["en-US", "en"], Windows),
            geo("en-US", "America/Los_Angeles", &["en-US", "en"], Mac),
            geo("en-US", "America/New_York", &["en-US", "en"], Mac),
            geo("en-US", "America/Denver", &["en-US", "en"], Windows),
            geo("en-US", "America/Los_Angeles", &["en-US", "en"], Windows),
            geo("en-US", "America/Chicago", &["en-US", "en"], Linux),
            geo("es-US", "America/Los_Angeles", &["es-US", "es", "en"], Windows),
        ],
    },
    Geography {
        code: "CA",
        timezones: &[
            "America/Toronto",
            "America/Vancouver",
            "America/Edmonton",
            "America/Winnipeg",
            "America/Halifax",
        ],
        candidates: &[
            geo("en-CA", "America/Toronto", &["en-CA", "en"], Windows),
            geo("en-CA", "America/Vancouver", &["en-CA", "en"], Mac),
            geo("fr-CA", "America/Toronto", &["fr-CA", "fr", "en"], Windows),
            geo("en-CA", "America/Edmonton", &["en-CA", "en"], Windows),
        ],
    },
    Geography {
        code: "GB",
        timezones: &["Europe/London"],
        candidates: &[
            geo("en-GB", "Europe/London", &["en-GB", "en"], Windows),
            geo("en-GB", "Europe/London", &["en-GB", "en-US", "en"], Windows),
            geo("en-GB", "Europe/London", &["en-GB", "en"], Mac),
            geo("en-GB", "Europe/London", &["en-GB", "en"], Linux),
        ],
    },
    Geography {
        code: "IE",
        timezones: &["Europe/Dublin"],
        candidates: &[
            geo("en-IE", "Europe/Dublin", &["en-IE", "en-GB", "en"], Windows),
            geo("en-IE", "Europe/Dublin", &["en-IE", "en"], Mac),
        ],
    },
    Geography {
        code: "DE",
        timezones: &["Europe/Berlin", "Europe/Busingen"],
        candidates: &[
            geo("de-DE", "Europe/Berlin", &["de-DE", "de", "en-US", "en"], Windows),
            geo("de-DE", "Europe/Berlin", &["de-DE", "de"], Mac),
            geo("de-DE", "Europe/Berlin", &["de-DE", "de", "en"], Linux),
            geo("de-DE", "Europe/Berlin", &["de-DE", "de", "en"], Windows),
            geo("en-US", "Europe/Berlin", &["en-US", "en", "de"], Windows),
        ],
    },
    Geography {
        code: "AT",
        timezones: &["Europe/Vienna"],
        candidates: &[
            geo("de-AT", "Europe/Vienna", &["de-AT", "de", "en"], Windows),
            geo("de-AT", "Europe/Vienna", &["de-AT", "de"], Mac),
        ],
    },
    Geography {
        code: "CH",
        timezones: &["Europe/Zurich"],
        candidates: &[
            geo("de-CH", "Europe/Zurich", &["de-CH", "de", "en"], Windows),
            geo("fr-CH", "Europe/Zurich", &["fr-CH", "fr", "en"], Windows),
            geo("de-CH", "Europe/Zurich", &["de-CH", "de", "en"], Mac),
        ],
    },
    Geography {
        code: "FR",
        timezones: &["Europe/Paris"],
        candidates: &[
            geo("fr-FR", "Europe/Paris", &["fr-FR", "fr", "en-US", "en"], Windows),
            geo("fr-FR", "Europe/Paris", &["fr-FR", "fr"], Mac),
            geo("fr-FR", "Europe/Paris", &["fr-FR", "fr", "en"], Linux),
            geo("fr-FR", "Europe/Paris", &["fr-FR", "fr", "en"], Windows),
        ],
    },
    Geography {
        code: "ES",
        timezones: &["Europe/Madrid", "Atlantic/Canary", "Africa/Ceuta"],
        candidates: &[
            geo("es-ES", "Europe/Madrid", &["es-ES", "es"], Windows),
            geo("es-ES", "Europe/Madrid", &["es-ES", "es", "en"], Mac),
            geo("ca-ES", "Europe/Madrid", &["ca-ES", "ca", "es-ES", "es"], Windows),
            geo("es-ES", "Atlantic/Canary", &["es-ES", "es"], Windows),
        ],
    },
    Geography {
        code: "IT",
        timezones: &["Europe/Rome"],
        candidates: &[
            geo("it-IT", "Europe/Rome", &["it-IT", "it", "en-US", "en"], Windows),
            geo("it-IT", "Europe/Rome", &["it-IT", "it"], Mac),
            geo("it-IT", "Europe/Rome", &["it-IT", "it", "en"], Windows),
        ],
    },
    Geography {
        code: "NL",
        timezones: &["Europe/Amsterdam"],
        candidates: &[
            geo("nl-NL", "Europe/Amsterdam", &["nl-NL", "nl", "en-US", "en"], Windows),
            geo("nl-NL", "Europe/Amsterdam", &["nl-NL", "nl", "en"], Mac),
            geo("nl-NL", "Europe/Amsterdam", &["nl-NL", "nl", "en"], Linux),
        ],
    },
    Geography {
        code: "PL",
        timezones: &["Europe/Warsaw"],
        candidates: &[
            geo("pl-PL", "Europe/Warsaw", &["pl-PL", "pl", "en-US", "en"], Windows),
            geo("pl-PL", "Europe/Warsaw", &["pl-PL", "pl"], Windows),
            geo("pl-PL", "Europe/Warsaw", &["pl-PL", "pl", "en"], Linux),
        ],
    },
    Geography {
        code: "SE",
        timezones: &["Europe/Stockholm"],
        candidates: &[
            geo("sv-SE", "Europe/Stockholm", &["sv-SE", "sv", "en-US", "en"], Windows),
            geo("sv-SE", "Europe/Stockholm", &["sv-SE", "sv", "en"], Mac),
        ],
    },
    Geography {
        code: "BR",
        timezones: &[
            "America/Sao_Paulo",
            "America/Bahia",
            "America/Fortaleza",
            "America/Recife",
            "America/Manaus",
        ],
        candidates: &[
            geo("pt-BR", "America/Sao_Paulo", &["pt-BR", "pt", "en-US", "en"], Windows),
            geo("pt-BR", "America/Sao_Paulo", &["pt-BR", "pt"], Windows),
            geo("pt-BR", "America/Fortaleza", &["pt-BR", "pt", "en"], Windows),
            geo("pt-BR", "America/Sao_Paulo", &["pt-BR", "pt", "en"], Mac),
        ],
    },
    Geography {
        code: "MX",
        timezones: &[
            "America/Mexico_City",
            "America/Monterrey",
            "America/Tijuana",
            "America/Cancun",
        ],
        candidates: &[
            geo("es-MX", "America/Mexico_City", &["es-MX", "es"], Windows),
            geo("es-MX", "America/Monterrey", &["es-MX", "es", "en"], Windows),
            geo("es-MX", "America/Mexico_City", &["es-MX", "es", "en"], Mac),
        ],
    },
    Geography {
        code: "JP",
        timezones: &["Asia/Tokyo"],
        candidates: &[
            geo("ja-JP", "Asia/Tokyo", &["ja-JP", "ja", "en-US", "en"], Windows),
            geo("ja-JP", "Asia/Tokyo", &["ja-JP", "ja"], Mac),
            geo("ja-JP", "Asia/Tokyo", &["ja-JP", "ja", "en"], Windows),
        ],
    },
    Geography {
        code: "KR",
        timezones: &["Asia/Seoul"],
        candidates: &[
            geo("ko-KR", "Asia/Seoul", &["ko-KR", "ko", "en-US", "en"], Windows),
            geo("ko-KR", "Asia/Seoul", &["ko-KR", "ko"], Mac),
        ],
    },
    Geography {
        code: "IN",
        timezones: &["Asia/Kolkata"],
        candidates: &[
            geo("en-IN", "Asia/Kolkata", &["en-IN", "en-GB", "en"], Windows),
            geo("en-IN", "Asia/Kolkata", &["en-IN", "en"], Windows),
            geo("hi-IN", "Asia/Kolkata", &["hi-IN", "hi", "en"], Windows),
            geo("en-IN", "Asia/Kolkata", &["en-IN", "en"], Linux),
        ],
    },
    Geography {
        code: "AU",
        timezones: &[
            "Australia/Sydney",
            "Australia/Melbourne",
            "Australia/Brisbane",
            "Australia/Adelaide",
            "Australia/Perth",
        ],
        candidates: &[
            geo("en-AU", "Australia/Sydney", &["en-AU", "en"], Windows),
            geo("en-AU", "Australia/Melbourne", &["en-AU", "en"], Mac),
            geo("en-AU", "Australia/Brisbane", &["en-AU", "en"], Windows),
            geo("en-AU", "Australia/Perth", &["en-AU", "en-GB", "en"], Windows),
        ],
    },
];

/// Look up a geography by region code (case-insensitive, trimmed).
pub fn geography(code: &str) -> Option<&'static Geography> {
    let code = code.trim();
    GEOGRAPHIES.iter().find(|g| g.code.eq_ignore_ascii_case(code))
}

/// Reverse lookup: the geography whose valid set contains `tz`.
pub fn geography_for_timezone(tz: &str) -> Option<&'static Geography> {
    GEOGRAPHIES.iter().find(|g| g.has_timezone(tz))
}

// ---------------------------------------------------------------------------
// Hardware
// ---------------------------------------------------------------------------

pub const HARDWARE_CONCURRENCY: &[u32] = &[2, 4, 6, 8, 12, 16];

/// GiB
pub const DEVICE_MEMORY: &[u32] = &[2, 4, 8, 16, 32];

/// Smallest plausible memory for a core count.
pub fn memory_floor(cores: u32) -> u32 {
    match cores {
        0..=4 => 2,
        5..=8 => 4,
        _ => 8,
    }
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenCandidate {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
    pub color_depth: u32,
}

const fn scr(width: u32, height: u32, pixel_ratio: f64, color_depth: u32) -> ScreenCandidate {
    ScreenCandidate {
        width,
        height,
        pixel_ratio,
        color_depth,
    }
}

static WINDOWS_SCREENS: &[ScreenCandidate] = &[
    scr(1920, 1080, 1.0, 24),
    scr(1366, 768, 1.0, 24),
    scr(1536, 864, 1.25, 24),
    scr(2560, 1440, 1.0, 24),
    scr(1440, 900, 1.0, 24),
    scr(1600, 900, 1.0, 24),
    scr(1280, 720, 1.5, 24),
    scr(1920, 1200, 1.0, 24),
];

static MAC_SCREENS: &[ScreenCandidate] = &[
    scr(1440, 900, 2.0, 30),
    scr(1512, 982, 2.0, 30),
    scr(1728, 1117, 2.0, 30),
    scr(1470, 956, 2.0, 30),
    scr(1680, 1050, 2.0, 30),
    scr(1920, 1080, 1.0, 24),
    scr(2560, 1440, 1.0, 24),
];

static LINUX_SCREENS: &[ScreenCandidate] = &[
    scr(1920, 1080, 1.0, 24),
    scr(2560, 1440, 1.0, 24),
    scr(1366, 768, 1.0, 24),
    scr(1600, 900, 1.0, 24),
    scr(1920, 1200, 1.0, 24),
];

pub fn screens(platform: PlatformFamily) -> &'static [ScreenCandidate] {
    match platform {
        PlatformFamily::Windows => WINDOWS_SCREENS,
        PlatformFamily::Mac => MAC_SCREENS,
        PlatformFamily::Linux => LINUX_SCREENS,
    }
}

/// Vertical pixels taken by the taskbar / menu bar.
pub fn chrome_height(platform: PlatformFamily) -> u32 {
    match platform {
        PlatformFamily::Windows => 40,
        PlatformFamily::Mac => 25,
        PlatformFamily::Linux => 27,
    }
}

/// Platforms whose vetted screens include the given dimensions.
pub fn platforms_with_screen(width: u32, height: u32) -> Vec<PlatformFamily> {
    PlatformFamily::ALL
        .into_iter()
        .filter(|p| {
            screens(*p)
                .iter()
                .any(|s| s.width == width && s.height == height)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// GPUs
// ---------------------------------------------------------------------------

/// Unmasked WebGL vendor/renderer pair as Chrome reports it through ANGLE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuCandidate {
    pub vendor: &'static str,
    pub renderer: &'static str,
}

const fn gpu(vendor: &'static str, renderer: &'static str) -> GpuCandidate {
    GpuCandidate { vendor, renderer }
}

static WINDOWS_GPUS: &[GpuCandidate] = &[
    gpu(
        "Google Inc. (NVIDIA)",
        "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060 Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (NVIDIA)",
        "ANGLE (NVIDIA, NVIDIA GeForce GTX 1660 SUPER Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (NVIDIA)",
        "ANGLE (NVIDIA, NVIDIA GeForce RTX 4070 Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (AMD)",
        "ANGLE (AMD, AMD Radeon RX 6700 XT Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (AMD)",
        "ANGLE (AMD, AMD Radeon RX 580 Series Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (Intel)",
        "ANGLE (Intel, Intel(R) UHD Graphics 630 Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
    gpu(
        "Google Inc. (Intel)",
        "ANGLE (Intel, Intel(R) Iris(R) Xe Graphics Direct3D11 vs_5_0 ps_5_0, D3D11)",
    ),
];

static MAC_GPUS: &[GpuCandidate] = &[
    gpu(
        "Google Inc. (Apple)",
        "ANGLE (Apple, ANGLE Metal Renderer: Apple M1, Unspecified Version)",
    ),
    gpu(
        "Google Inc. (Apple)",
        "ANGLE (Apple, ANGLE Metal Renderer: Apple M1 Pro, Unspecified Version)",
    ),
    gpu(
        "Google Inc. (Apple)",
        "ANGLE (Apple, ANGLE Metal Renderer: Apple M2, Unspecified Version)",
    ),
    gpu(
        "Google Inc. (Apple)",
        "ANGLE (Apple, ANGLE Metal Renderer: Apple M3, Unspecified Version)",
    ),
    gpu(
        "Google Inc. (Intel Inc.)",
        "ANGLE (Intel Inc., Intel(R) Iris(TM) Plus Graphics 655, OpenGL 4.1)",
    ),
    gpu(
        "Google Inc. (AMD)",
        "ANGLE (AMD, AMD Radeon Pro 5500M OpenGL Engine, OpenGL 4.1)",
    ),
];

static LINUX_GPUS: &[GpuCandidate] = &[
    gpu(
        "Google Inc. (Intel)",
        "ANGLE (Intel, Mesa Intel(R) UHD Graphics 630 (CFL GT2), OpenGL 4.6)",
    ),
    gpu(
        "Google Inc. (Intel)",
        "ANGLE (Intel, Mesa Intel(R) Xe Graphics (TGL GT2), OpenGL 4.6)",
    ),
    gpu(
        "Google Inc. (AMD)",
        "ANGLE (AMD, AMD Radeon RX 6600 (radeonsi, navi23, LLVM 15.0.7, DRM 3.49, 6.1.0-18-amd64), OpenGL 4.6)",
    ),
    gpu(
        "Google Inc. (NVIDIA Corporation)",
        "ANGLE (NVIDIA Corporation, NVIDIA GeForce GTX 1080/PCIe/SSE2, OpenGL 4.5.0)",
    ),
];

pub fn gpus(platform: PlatformFamily) -> &'static [GpuCandidate] {
    match platform {
        PlatformFamily::Windows => WINDOWS_GPUS,
        PlatformFamily::Mac => MAC_GPUS,
        PlatformFamily::Linux => LINUX_GPUS,
    }
}

/// Find the vetted entry for a renderer string, on any platform.
///
/// Renderer strings are unique across the tables.
pub fn gpu_by_renderer(renderer: &str) -> Option<(PlatformFamily, &'static GpuCandidate)> {
    PlatformFamily::ALL.into_iter().find_map(|p| {
        gpus(p)
            .iter()
            .find(|g| g.renderer == renderer)
            .map(|g| (p, g))
    })
}

/// Platform owning the exact vendor/renderer pair.
pub fn gpu_platform(vendor: &str, renderer: &str) -> Option<PlatformFamily> {
    match gpu_by_renderer(renderer) {
        Some((p, g)) if g.vendor == vendor => Some(p),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Fonts
// ---------------------------------------------------------------------------

static WINDOWS_FONTS: &[&[&str]] = &[
    &[
        "Arial",
        "Calibri",
        "Cambria",
        "Consolas",
        "Courier New",
        "Georgia",
        "Segoe UI",
        "Tahoma",
        "Times New Roman",
        "Trebuchet MS",
        "Verdana",
    ],
    &[
        "Arial",
        "Bahnschrift",
        "Calibri",
        "Cambria",
        "Candara",
        "Consolas",
        "Courier New",
        "Franklin Gothic Medium",
        "Georgia",
        "Segoe UI",
        "Segoe UI Emoji",
        "Tahoma",
        "Times New Roman",
        "Trebuchet MS",
        "Verdana",
    ],
];

static MAC_FONTS: &[&[&str]] = &[
    &[
        "Arial",
        "Avenir",
        "Courier New",
        "Geneva",
        "Georgia",
        "Helvetica",
        "Helvetica Neue",
        "Menlo",
        "Monaco",
        "Times New Roman",
        "Verdana",
    ],
    &[
        "Arial",
        "Avenir",
        "Courier New",
        "Futura",
        "Geneva",
        "Georgia",
        "Gill Sans",
        "Helvetica",
        "Helvetica Neue",
        "Menlo",
        "Monaco",
        "Optima",
        "Palatino",
        "Times New Roman",
        "Verdana",
    ],
];

static LINUX_FONTS: &[&[&str]] = &[
    &[
        "DejaVu Sans",
        "DejaVu Sans Mono",
        "DejaVu Serif",
        "Liberation Mono",
        "Liberation Sans",
        "Liberation Serif",
        "Noto Sans",
        "Ubuntu",
    ],
    &[
        "Cantarell",
        "DejaVu Sans",
        "DejaVu Sans Mono",
        "DejaVu Serif",
        "Noto Sans",
        "Noto Serif",
    ],
];

pub fn font_bundles(platform: PlatformFamily) -> &'static [&'static [&'static str]] {
    match platform {
        PlatformFamily::Windows => WINDOWS_FONTS,
        PlatformFamily::Mac => MAC_FONTS,
        PlatformFamily::Linux => LINUX_FONTS,
    }
}

/// Generic CSS families every platform resolves.
pub const GENERIC_FONT_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
];

// ---------------------------------------------------------------------------
// Browser
// ---------------------------------------------------------------------------

pub const CHROME_MAJOR_VERSIONS: &[u32] = &[128, 129, 130, 131];

/// Reduced Chrome user agent for the platform.
pub fn user_agent(platform: PlatformFamily, major: u32) -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
        platform.user_agent_os(),
        major
    )
}

/// `navigator.appVersion`: the user agent minus its `Mozilla/` prefix.
pub fn app_version(user_agent: &str) -> String {
    user_agent
        .strip_prefix("Mozilla/")
        .unwrap_or(user_agent)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_geography_lookup_is_case_insensitive() {
        assert_eq!(geography(" de ").map(|g| g.code), Some("DE"));
        assert!(geography("XX").is_none());
    }

    #[test]
    fn test_candidates_are_internally_consistent() {
        for g in GEOGRAPHIES {
            assert!(!g.candidates.is_empty(), "{} has no candidates", g.code);
            for c in g.candidates {
                assert!(g.has_timezone(c.timezone), "{}: {}", g.code, c.timezone);
                assert_eq!(c.languages.first(), Some(&c.locale), "{}", g.code);
            }
        }
    }

    #[test]
    fn test_timezones_belong_to_one_geography() {
        let mut seen = HashSet::new();
        for g in GEOGRAPHIES {
            for tz in g.timezones {
                assert!(seen.insert(*tz), "{} listed twice", tz);
            }
        }
        assert_eq!(geography_for_timezone("Asia/Tokyo").map(|g| g.code), Some("JP"));
    }

    #[test]
    fn test_memory_floor() {
        assert_eq!(memory_floor(2), 2);
        assert_eq!(memory_floor(4), 2);
        assert_eq!(memory_floor(6), 4);
        assert_eq!(memory_floor(8), 4);
        assert_eq!(memory_floor(12), 8);
        assert_eq!(memory_floor(16), 8);
    }

    #[test]
    fn test_every_core_count_has_memory() {
        for cores in HARDWARE_CONCURRENCY {
            assert!(DEVICE_MEMORY.iter().any(|m| *m >= memory_floor(*cores)));
        }
    }

    #[test]
    fn test_renderers_are_unique() {
        let mut seen = HashSet::new();
        for p in PlatformFamily::ALL {
            for g in gpus(p) {
                assert!(seen.insert(g.renderer), "{} listed twice", g.renderer);
            }
        }
    }

    #[test]
    fn test_gpu_platform_requires_exact_pair() {
        let g = &gpus(PlatformFamily::Mac)[0];
        assert_eq!(gpu_platform(g.vendor, g.renderer), Some(PlatformFamily::Mac));
        assert_eq!(gpu_platform("Google Inc. (NVIDIA)", g.renderer), None);
    }

    #[test]
    fn test_user_agent_tracks_platform() {
        let ua = user_agent(PlatformFamily::Mac, 130);
        assert!(ua.contains("Macintosh"));
        assert!(ua.contains("Chrome/130.0.0.0"));
        assert!(app_version(&ua).starts_with("5.0 (Macintosh"));
    }

    #[test]
    fn test_screen_lookup_by_dimensions() {
        assert_eq!(platforms_with_screen(1512, 982), vec![PlatformFamily::Mac]);
        assert!(platforms_with_screen(1920, 1080).len() >= 2);
        assert!(platforms_with_screen(800, 600).is_empty());
    }
}
