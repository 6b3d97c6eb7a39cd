//! persona-core: Platform-agnostic fingerprint consistency engine
//!
//! Derives a complete, internally consistent browser persona from one seed
//! and a geography, and provides the bounded noise functions both execution
//! contexts apply at their own call sites.
//!
//! ```text
//! RootSeed + geography
//!     -> context::resolve      (locale, timezone, languages, platform)
//!     -> attributes::generate  (hardware, screen, GPU, fonts, browser)
//!     -> validator             (one repair pass, then hard error)
//!     -> propagation           (transport document)
//!     -> host / sandbox consumers -> noise::*
//! ```
//!
//! This crate has no browser dependencies. The wasm sandbox wraps it.

pub mod attributes;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod noise;
pub mod pipeline;
pub mod prng;
pub mod profile;
pub mod propagation;
pub mod seed;
pub mod validator;

// Re-export everything for easy access
pub use attributes::ProfileOverrides;
pub use config::{EngineConfig, NoiseConfig};
pub use context::{ContextOverrides, GeoContext, ResolutionEvent};
pub use error::{ErrorCode, PersonaError, Result};
pub use host::{HostSession, PageClock, ProfileCell};
pub use noise::{Discriminator, MonotonicTimer, NoiseRequest};
pub use pipeline::{build_profile, ProfileBuild};
pub use profile::{ChannelNoise, FingerprintProfile, NoiseParams, PlatformFamily};
pub use propagation::{TransportDocument, SCHEMA_VERSION};
pub use seed::{Channel, RootSeed, SubSeed};
pub use validator::{RepairAction, Violation};
