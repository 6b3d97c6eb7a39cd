//! The assembled fingerprint profile.
//!
//! Built once per session by [`crate::pipeline`], immutable afterwards.
//! Consumers receive copies through [`crate::propagation`], never references.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::GeoContext;
use crate::seed::{Channel, SubSeed};

/// Operating-system family reported to pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Windows,
    Mac,
    Linux,
}

impl PlatformFamily {
    pub const ALL: [PlatformFamily; 3] = [
        PlatformFamily::Windows,
        PlatformFamily::Mac,
        PlatformFamily::Linux,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlatformFamily::Windows => "windows",
            PlatformFamily::Mac => "mac",
            PlatformFamily::Linux => "linux",
        }
    }

    /// Value of `navigator.platform`
    pub fn navigator_platform(self) -> &'static str {
        match self {
            PlatformFamily::Windows => "Win32",
            PlatformFamily::Mac => "MacIntel",
            PlatformFamily::Linux => "Linux x86_64",
        }
    }

    /// OS token inside the user agent parentheses
    pub fn user_agent_os(self) -> &'static str {
        match self {
            PlatformFamily::Windows => "Windows NT 10.0; Win64; x64",
            PlatformFamily::Mac => "Macintosh; Intel Mac OS X 10_15_7",
            PlatformFamily::Linux => "X11; Linux x86_64",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" | "win" | "win32" => Ok(PlatformFamily::Windows),
            "mac" | "macos" | "macintel" => Ok(PlatformFamily::Mac),
            "linux" => Ok(PlatformFamily::Linux),
            other => Err(format!("unknown platform family '{}'", other)),
        }
    }
}

/// CPU and memory as seen through `navigator`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareDescriptor {
    pub hardware_concurrency: u32,
    /// Installed memory in GiB
    pub device_memory: u32,
}

impl HardwareDescriptor {
    /// `navigator.deviceMemory` is capped at 8 by Chromium.
    pub fn reported_device_memory(&self) -> u32 {
        self.device_memory.min(8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDescriptor {
    pub width: u32,
    pub height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u32,
    pub pixel_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDescriptor {
    pub vendor: String,
    pub renderer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserDescriptor {
    pub major_version: u32,
    pub user_agent: String,
    pub app_version: String,
    /// `navigator.platform`
    pub platform: String,
}

/// Noise bounds requested by configuration for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub amplitude: f64,
    pub density: f64,
}

impl NoiseParams {
    pub const DISABLED: NoiseParams = NoiseParams {
        amplitude: 0.0,
        density: 0.0,
    };

    pub const fn new(amplitude: f64, density: f64) -> Self {
        Self { amplitude, density }
    }
}

/// Sub-seed plus noise bounds carried for one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelNoise {
    pub sub_seed: SubSeed,
    pub amplitude: f64,
    pub density: f64,
}

impl ChannelNoise {
    pub fn params(&self) -> NoiseParams {
        NoiseParams::new(self.amplitude, self.density)
    }
}

/// Complete, validated set of spoofed attributes for one session
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintProfile {
    /// Informational copy of the root seed
    pub root_seed_echo: u64,
    pub context: GeoContext,
    pub hardware: HardwareDescriptor,
    pub screen: ScreenDescriptor,
    pub gpu: GpuDescriptor,
    pub fonts: Vec<String>,
    pub browser: BrowserDescriptor,
    /// `navigator.webdriver`; must read false
    pub webdriver: bool,
    pub timer_precision_ms: f64,
    pub channels: BTreeMap<Channel, ChannelNoise>,
}

impl FingerprintProfile {
    pub fn platform(&self) -> PlatformFamily {
        self.context.platform
    }

    pub fn channel(&self, channel: Channel) -> Option<&ChannelNoise> {
        self.channels.get(&channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parsing() {
        assert_eq!("Windows".parse::<PlatformFamily>(), Ok(PlatformFamily::Windows));
        assert_eq!("macOS".parse::<PlatformFamily>(), Ok(PlatformFamily::Mac));
        assert!("android".parse::<PlatformFamily>().is_err());
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformFamily::Mac).unwrap();
        assert_eq!(json, "\"mac\"");
    }

    #[test]
    fn test_reported_memory_is_capped() {
        let hw = HardwareDescriptor {
            hardware_concurrency: 16,
            device_memory: 32,
        };
        assert_eq!(hw.reported_device_memory(), 8);
    }
}
