//! Seed derivation.
//!
//! One root seed per session, one independent sub-seed per channel:
//!
//! ```text
//! okm = HKDF-SHA256(salt = "persona/subseed/v1",
//!                   ikm  = root (8 bytes, little-endian),
//!                   info = u32_be(len(label)) || label)
//! sub = u64_le(okm[0..8]) & (2^53 - 1)
//! ```
//!
//! The length prefix keeps labels that are prefixes of each other apart.
//! Sub-seeds stay inside the 53-bit safe-integer range so JSON readers on
//! either side of the transport see the exact same integer.

use std::fmt;

use hkdf::Hkdf;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PersonaError, Result};
use crate::prng::mix64;

/// HKDF salt. Bumping the version changes every derived profile.
pub const DERIVATION_SALT: &[u8] = b"persona/subseed/v1";

/// Largest integer a JavaScript number represents exactly.
pub const MAX_SUB_SEED: u64 = (1 << 53) - 1;

/// Session-level seed. Wiped from memory when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RootSeed(u64);

impl RootSeed {
    /// Use a caller-supplied seed (profile continuity across runs).
    pub fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Draw a fresh seed from the OS entropy source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; 8];
        getrandom::getrandom(&mut bytes).map_err(|e| PersonaError::Entropy(e.to_string()))?;
        let seed = Self(u64::from_le_bytes(bytes));
        bytes.zeroize();
        Ok(seed)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Derive the sub-seed for one channel.
    pub fn derive(&self, channel: Channel) -> SubSeed {
        derive(self, channel.label())
    }
}

impl fmt::Debug for RootSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RootSeed(..)")
    }
}

/// Independent selection/noise domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    // Selection channels
    Navigator,
    Hardware,
    Screen,
    Gpu,
    Fonts,
    // Noise channels
    Canvas,
    Webgl,
    Audio,
    Metrics,
    Timing,
}

impl Channel {
    pub const ALL: [Channel; 10] = [
        Channel::Navigator,
        Channel::Hardware,
        Channel::Screen,
        Channel::Gpu,
        Channel::Fonts,
        Channel::Canvas,
        Channel::Webgl,
        Channel::Audio,
        Channel::Metrics,
        Channel::Timing,
    ];

    /// Label mixed into the derivation. Part of the wire contract.
    pub fn label(self) -> &'static str {
        match self {
            Channel::Navigator => "navigator",
            Channel::Hardware => "hardware",
            Channel::Screen => "screen",
            Channel::Gpu => "gpu",
            Channel::Fonts => "fonts",
            Channel::Canvas => "canvas",
            Channel::Webgl => "webgl",
            Channel::Audio => "audio",
            Channel::Metrics => "metrics",
            Channel::Timing => "timing",
        }
    }

    /// Whether the channel feeds the Noise Injector (as opposed to selection).
    pub fn is_noise(self) -> bool {
        matches!(
            self,
            Channel::Canvas | Channel::Webgl | Channel::Audio | Channel::Metrics | Channel::Timing
        )
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-channel descendant of the root seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubSeed(u64);

impl SubSeed {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// Index into a candidate list of length `len`.
    ///
    /// Slot 0 is exactly `subseed mod len`; further draws from the same
    /// family use distinct slots so they do not repeat slot 0's choice.
    pub fn pick(self, slot: u64, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let raw = if slot == 0 { self.0 } else { mix64(self.0, slot) };
        (raw % len as u64) as usize
    }

    /// Deterministically choose one element of `items`.
    pub fn choose<T>(self, slot: u64, items: &[T]) -> Option<&T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.pick(slot, items.len()))
        }
    }
}

/// `H(root, label)`: HKDF-SHA256 with a length-prefixed label as `info`.
pub fn derive(root: &RootSeed, label: &str) -> SubSeed {
    let mut ikm = root.0.to_le_bytes();
    let hk = Hkdf::<Sha256>::new(Some(DERIVATION_SALT), &ikm);
    ikm.zeroize();

    let mut info = Vec::with_capacity(4 + label.len());
    info.extend_from_slice(&(label.len() as u32).to_be_bytes());
    info.extend_from_slice(label.as_bytes());

    let mut okm = [0u8; 8];
    hk.expand(&info, &mut okm)
        .expect("8 bytes is a valid HKDF-SHA256 output length");
    SubSeed(u64::from_le_bytes(okm) & MAX_SUB_SEED)
}
