//! Transport document shared by the host and the script sandbox.
//!
//! Serialization is lossless: `decode(encode(p)) == p` for every published
//! profile. Decoding fails closed: unknown schema versions, unknown fields and
//! profiles that fail validation are all errors.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::context::GeoContext;
use crate::error::{PersonaError, Result};
use crate::profile::{
    BrowserDescriptor, ChannelNoise, FingerprintProfile, GpuDescriptor, HardwareDescriptor,
    PlatformFamily, ScreenDescriptor,
};
use crate::seed::Channel;
use crate::validator;

/// Name reported in I/O errors for transport streams.
const TRANSPORT_STREAM: &str = "<transport document>";

pub const SCHEMA_VERSION: u32 = 1;

/// Wire form of a [`FingerprintProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransportDocument {
    pub schema_version: u32,
    pub root_seed_echo: u64,
    pub geography: String,
    pub locale: String,
    pub timezone: String,
    pub languages: Vec<String>,
    pub platform_family: PlatformFamily,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
    pub screen: ScreenDescriptor,
    pub gpu: GpuDescriptor,
    pub fonts: Vec<String>,
    pub browser: BrowserDescriptor,
    pub webdriver: bool,
    pub timer_precision_ms: f64,
    pub channels: BTreeMap<Channel, ChannelNoise>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaHeader {
    schema_version: u32,
}

impl TransportDocument {
    pub fn from_profile(p: &FingerprintProfile) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            root_seed_echo: p.root_seed_echo,
            geography: p.context.geography.clone(),
            locale: p.context.locale.clone(),
            timezone: p.context.timezone.clone(),
            languages: p.context.languages.clone(),
            platform_family: p.context.platform,
            hardware_concurrency: p.hardware.hardware_concurrency,
            device_memory: p.hardware.device_memory,
            screen: p.screen,
            gpu: p.gpu.clone(),
            fonts: p.fonts.clone(),
            browser: p.browser.clone(),
            webdriver: p.webdriver,
            timer_precision_ms: p.timer_precision_ms,
            channels: p.channels.clone(),
        }
    }

    /// Rebuild the profile and re-run validation (no repair).
    pub fn into_profile(self) -> Result<FingerprintProfile> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(PersonaError::SchemaMismatch {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        let profile = FingerprintProfile {
            root_seed_echo: self.root_seed_echo,
            context: GeoContext {
                geography: self.geography,
                locale: self.locale,
                timezone: self.timezone,
                languages: self.languages,
                platform: self.platform_family,
            },
            hardware: HardwareDescriptor {
                hardware_concurrency: self.hardware_concurrency,
                device_memory: self.device_memory,
            },
            screen: self.screen,
            gpu: self.gpu,
            fonts: self.fonts,
            browser: self.browser,
            webdriver: self.webdriver,
            timer_precision_ms: self.timer_precision_ms,
            channels: self.channels,
        };
        validator::validate(profile).into_result()
    }
}

pub fn encode(profile: &FingerprintProfile) -> Result<String> {
    serde_json::to_string(&TransportDocument::from_profile(profile))
        .map_err(PersonaError::TransportEncode)
}

/// Parse, version-check and validate a transport document.
pub fn decode(json: &str) -> Result<FingerprintProfile> {
    let header: SchemaHeader = serde_json::from_str(json).map_err(PersonaError::TransportDecode)?;
    if header.schema_version != SCHEMA_VERSION {
        return Err(PersonaError::SchemaMismatch {
            found: header.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    let doc: TransportDocument =
        serde_json::from_str(json).map_err(PersonaError::TransportDecode)?;
    doc.into_profile()
}

/// Write the transport document for `profile` to `writer`.
pub fn write_to<W: Write>(mut writer: W, profile: &FingerprintProfile) -> Result<()> {
    let json = encode(profile)?;
    writer
        .write_all(json.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|source| PersonaError::Io {
            path: TRANSPORT_STREAM.into(),
            source,
        })?;
    log::info!("📝 Wrote transport document ({} bytes)", json.len());
    Ok(())
}

/// Read a whole transport document from `reader` and [`decode`] it.
///
/// A short or truncated stream fails like any other malformed document.
pub fn read_from<R: Read>(mut reader: R) -> Result<FingerprintProfile> {
    let mut json = String::new();
    reader
        .read_to_string(&mut json)
        .map_err(|source| PersonaError::Io {
            path: TRANSPORT_STREAM.into(),
            source,
        })?;
    decode(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ProfileOverrides;
    use crate::config::EngineConfig;
    use crate::pipeline::build_profile;
    use crate::seed::RootSeed;

    fn profile() -> FingerprintProfile {
        build_profile(
            &RootSeed::from_u64(424242),
            "DE",
            &ProfileOverrides::default(),
            &EngineConfig::default(),
        )
        .unwrap()
        .profile
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let p = profile();
        let json = encode(&p).unwrap();
        assert_eq!(decode(&json).unwrap(), p);
    }

    #[test]
    fn test_field_names_are_camel_case() {
        let json = encode(&profile()).unwrap();
        for key in [
            "\"schemaVersion\":1",
            "\"rootSeedEcho\":424242",
            "\"platformFamily\":\"windows\"",
            "\"availHeight\"",
            "\"timerPrecisionMs\"",
            "\"subSeed\"",
            "\"canvas\"",
        ] {
            assert!(json.contains(key), "missing {} in {}", key, json);
        }
    }

    #[test]
    fn test_schema_mismatch_fails_closed() {
        let json = encode(&profile())
            .unwrap()
            .replace("\"schemaVersion\":1", "\"schemaVersion\":2");
        let err = decode(&json).unwrap_err();
        assert!(matches!(err, PersonaError::SchemaMismatch { found: 2, expected: 1 }));
    }

    #[test]
    fn test_tampered_document_fails_closed() {
        let json = encode(&profile())
            .unwrap()
            .replace("\"webdriver\":false", "\"webdriver\":true");
        assert!(matches!(decode(&json), Err(PersonaError::Inconsistent(_))));
    }

    #[test]
    fn test_garbage_fails_closed() {
        assert!(matches!(decode("{"), Err(PersonaError::TransportDecode(_))));
        assert!(matches!(
            decode(r#"{"schemaVersion":1,"surprise":true}"#),
            Err(PersonaError::TransportDecode(_))
        ));
    }

    #[test]
    fn test_stream_round_trip() {
        let p = profile();
        let mut buf = Vec::new();
        write_to(&mut buf, &p).unwrap();
        assert_eq!(read_from(std::io::Cursor::new(&buf)).unwrap(), p);
    }

    #[test]
    fn test_truncated_stream_fails_closed() {
        let mut buf = Vec::new();
        write_to(&mut buf, &profile()).unwrap();
        let half = &buf[..buf.len() / 2];
        assert!(matches!(
            read_from(std::io::Cursor::new(half)),
            Err(PersonaError::TransportDecode(_))
        ));
    }

    #[test]
    fn test_unreadable_stream_is_io_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "gone"))
            }
        }
        assert!(matches!(read_from(Broken), Err(PersonaError::Io { .. })));
    }
}
