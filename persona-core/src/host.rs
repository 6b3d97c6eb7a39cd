//! Host-side publication and noise entry points.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::Result;
use crate::noise::{self, Discriminator, MonotonicTimer, NoiseRequest};
use crate::profile::FingerprintProfile;
use crate::seed::Channel;

/// Once-only publication barrier for the session profile.
///
/// Concurrent first callers block until one build succeeds. A failed build
/// leaves the cell empty, so a later caller may try again.
#[derive(Debug, Default)]
pub struct ProfileCell {
    cell: OnceCell<Arc<FingerprintProfile>>,
}

impl ProfileCell {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get_or_build<F>(&self, build: F) -> Result<Arc<FingerprintProfile>>
    where
        F: FnOnce() -> Result<FingerprintProfile>,
    {
        self.cell
            .get_or_try_init(|| build().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn get(&self) -> Option<Arc<FingerprintProfile>> {
        self.cell.get().cloned()
    }

    pub fn is_published(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Read-only view of a published profile with the host's noise call sites.
#[derive(Debug, Clone)]
pub struct HostSession {
    profile: Arc<FingerprintProfile>,
}

impl HostSession {
    pub fn new(profile: Arc<FingerprintProfile>) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &FingerprintProfile {
        &self.profile
    }

    fn request(&self, channel: Channel, discriminator: Discriminator) -> Option<NoiseRequest> {
        NoiseRequest::for_profile(&self.profile, channel, discriminator)
    }

    /// Canvas `getImageData` / `toDataURL` pixels.
    pub fn canvas_pixels(&self, rgba: &mut [u8]) -> usize {
        self.request(Channel::Canvas, Discriminator::from_len(rgba.len()))
            .map_or(0, |req| noise::perturb_rgba(rgba, &req))
    }

    /// WebGL `readPixels` output.
    pub fn webgl_pixels(&self, rgba: &mut [u8]) -> usize {
        self.request(Channel::Webgl, Discriminator::from_len(rgba.len()))
            .map_or(0, |req| noise::perturb_rgba(rgba, &req))
    }

    /// Audio channel data, kept inside `[-1, 1]`.
    pub fn audio_samples(&self, samples: &mut [f32]) -> usize {
        self.request(Channel::Audio, Discriminator::from_len(samples.len()))
            .map_or(0, |req| noise::perturb_samples(samples, &req, Some((-1.0, 1.0))))
    }

    /// `measureText` width for `text`.
    pub fn text_width(&self, text: &str, width: f64) -> f64 {
        self.request(Channel::Metrics, Discriminator::from_text(text))
            .map_or(width, |req| noise::perturb_scalar(width, &req))
    }

    /// Fresh timer for one page.
    pub fn page_clock(&self) -> PageClock {
        PageClock {
            timer: MonotonicTimer::for_profile(&self.profile),
        }
    }
}

/// Per-page `performance.now()` source.
#[derive(Debug, Clone)]
pub struct PageClock {
    timer: Option<MonotonicTimer>,
}

impl PageClock {
    pub fn now(&mut self, raw_ms: f64) -> f64 {
        match &mut self.timer {
            Some(t) => t.next(raw_ms),
            None => raw_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::ProfileOverrides;
    use crate::config::EngineConfig;
    use crate::pipeline::build_profile;
    use crate::seed::RootSeed;
    use crate::PersonaError;

    fn build() -> Result<FingerprintProfile> {
        build_profile(
            &RootSeed::from_u64(99),
            "FR",
            &ProfileOverrides::default(),
            &EngineConfig::default(),
        )
        .map(|b| b.profile)
    }

    #[test]
    fn test_failed_build_leaves_cell_empty() {
        let cell = ProfileCell::new();
        let err = cell.get_or_build(|| Err(PersonaError::Entropy("test".into())));
        assert!(err.is_err());
        assert!(!cell.is_published());

        let p = cell.get_or_build(build).unwrap();
        assert!(cell.is_published());
        assert!(Arc::ptr_eq(&p, &cell.get().unwrap()));
    }

    #[test]
    fn test_later_builds_are_ignored() {
        let cell = ProfileCell::new();
        let first = cell.get_or_build(build).unwrap();
        let second = cell
            .get_or_build(|| Err(PersonaError::Config("unused".into())))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_session_noise_is_stable() {
        let session = HostSession::new(Arc::new(build().unwrap()));
        let mut a = vec![90u8; 4096];
        let mut b = vec![90u8; 4096];
        session.canvas_pixels(&mut a);
        session.canvas_pixels(&mut b);
        assert_eq!(a, b);
        assert_eq!(
            session.text_width("Hello, world", 77.5),
            session.text_width("Hello, world", 77.5)
        );
    }

    #[test]
    fn test_page_clock_is_monotonic() {
        let session = HostSession::new(Arc::new(build().unwrap()));
        let mut clock = session.page_clock();
        let a = clock.now(100.0);
        let b = clock.now(99.0);
        let c = clock.now(250.0);
        assert!(b >= a && c >= b);
    }
}
