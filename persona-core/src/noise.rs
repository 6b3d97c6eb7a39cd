//! Bounded, seeded perturbation.
//!
//! Every function here is pure in `(sub_seed, discriminator, params, input)`:
//! the same call on the host or in the sandbox yields the same output, and
//! repeating a call within a session yields the same output again. Invalid
//! parameters or inputs leave the input unchanged.

use std::hash::Hasher;

use fnv::{FnvHashSet, FnvHasher};

use crate::prng::NoiseStream;
use crate::profile::FingerprintProfile;
use crate::seed::{Channel, SubSeed};

pub use crate::profile::NoiseParams;

/// Largest per-byte offset buffer noise will apply.
pub const MAX_BYTE_AMPLITUDE: u8 = 127;

/// Distinguishes call sites sharing a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discriminator(u64);

impl Discriminator {
    /// Buffer length. Two reads of equal-sized buffers see the same noise.
    pub fn from_len(len: usize) -> Self {
        Self(len as u64)
    }

    /// FNV-1a 64 over the UTF-8 bytes.
    pub fn from_text(text: &str) -> Self {
        let mut hasher = FnvHasher::default();
        hasher.write(text.as_bytes());
        Self(hasher.finish())
    }

    pub fn from_bucket(bucket: i64) -> Self {
        Self(bucket as u64)
    }

    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// One noise call. Built at the call site, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRequest {
    pub channel: Channel,
    pub sub_seed: SubSeed,
    pub discriminator: Discriminator,
    pub params: NoiseParams,
}

impl NoiseRequest {
    pub fn new(
        channel: Channel,
        sub_seed: SubSeed,
        discriminator: Discriminator,
        params: NoiseParams,
    ) -> Self {
        Self {
            channel,
            sub_seed,
            discriminator,
            params,
        }
    }

    /// Request using the sub-seed and bounds a profile carries for `channel`.
    pub fn for_profile(
        profile: &FingerprintProfile,
        channel: Channel,
        discriminator: Discriminator,
    ) -> Option<Self> {
        profile
            .channel(channel)
            .map(|c| Self::new(channel, c.sub_seed, discriminator, c.params()))
    }

    fn stream(&self) -> NoiseStream {
        NoiseStream::new(self.sub_seed.value(), self.discriminator.value())
    }

    fn density_ok(&self) -> bool {
        let d = self.params.density;
        d.is_finite() && d > 0.0 && d <= 1.0
    }

    fn amplitude_ok(&self) -> bool {
        let a = self.params.amplitude;
        a.is_finite() && a > 0.0
    }
}

/// `round(density * len)` capped at `len`.
fn target_count(density: f64, len: usize) -> usize {
    ((density * len as f64).round() as usize).min(len)
}

/// Floyd's sampling of `k` distinct indices in `0..n`, in draw order.
///
/// Memory is O(k): only chosen indices are tracked.
fn select_positions(stream: &mut NoiseStream, n: usize, k: usize) -> Vec<usize> {
    let mut seen: FnvHashSet<usize> = FnvHashSet::with_capacity_and_hasher(k, Default::default());
    let mut out = Vec::with_capacity(k);
    for j in (n - k)..n {
        let t = stream.below(j as u64 + 1) as usize;
        let pick = if seen.contains(&t) { j } else { t };
        seen.insert(pick);
        out.push(pick);
    }
    out
}

/// Signed byte offset with magnitude in `1..=a`.
fn byte_offset(r: u64, a: u8) -> i16 {
    let magnitude = 1 + (r % a as u64) as i16;
    if (r >> 32) & 1 == 1 {
        magnitude
    } else {
        -magnitude
    }
}

fn apply_byte(v: u8, offset: i16) -> u8 {
    let v = v as i16;
    let mut out = v + offset;
    if !(0..=255).contains(&out) {
        out = v - offset;
    }
    out.clamp(0, 255) as u8
}

fn byte_amplitude(req: &NoiseRequest) -> Option<u8> {
    if !req.amplitude_ok() || !req.density_ok() {
        return None;
    }
    let a = req.params.amplitude.floor().min(MAX_BYTE_AMPLITUDE as f64) as u8;
    (a > 0).then_some(a)
}

/// Perturb `round(density * len)` bytes by at most `amplitude` each.
///
/// Returns the number of positions visited.
pub fn perturb_bytes(buf: &mut [u8], req: &NoiseRequest) -> usize {
    let a = match byte_amplitude(req) {
        Some(a) => a,
        None => return 0,
    };
    let k = target_count(req.params.density, buf.len());
    if k == 0 {
        return 0;
    }
    let mut stream = req.stream();
    let positions = select_positions(&mut stream, buf.len(), k);
    for p in &positions {
        buf[*p] = apply_byte(buf[*p], byte_offset(stream.next_u64(), a));
    }
    positions.len()
}

/// [`perturb_bytes`] for RGBA pixel data: only R, G and B are touched.
///
/// The target count is still `round(density * len)` over the whole buffer,
/// capped at the number of colour bytes.
pub fn perturb_rgba(buf: &mut [u8], req: &NoiseRequest) -> usize {
    let a = match byte_amplitude(req) {
        Some(a) => a,
        None => return 0,
    };
    let slots = buf.len() / 4 * 3;
    let k = target_count(req.params.density, buf.len()).min(slots);
    if k == 0 {
        return 0;
    }
    let mut stream = req.stream();
    let positions = select_positions(&mut stream, slots, k);
    for slot in &positions {
        let idx = slot / 3 * 4 + slot % 3;
        buf[idx] = apply_byte(buf[idx], byte_offset(stream.next_u64(), a));
    }
    positions.len()
}

/// Perturb float samples by `(2u - 1) * amplitude`.
///
/// With a `range`, offsets that would leave it are reflected and the result
/// clamped. Non-finite samples are skipped but still consume their draw.
pub fn perturb_samples(samples: &mut [f32], req: &NoiseRequest, range: Option<(f32, f32)>) -> usize {
    if !req.amplitude_ok() || !req.density_ok() {
        return 0;
    }
    let k = target_count(req.params.density, samples.len());
    if k == 0 {
        return 0;
    }
    let mut stream = req.stream();
    let positions = select_positions(&mut stream, samples.len(), k);
    for p in &positions {
        let offset = (2.0 * stream.next_unit() - 1.0) * req.params.amplitude;
        let v = samples[*p] as f64;
        if !v.is_finite() {
            continue;
        }
        let mut out = v + offset;
        if let Some((lo, hi)) = range {
            let (lo, hi) = (lo as f64, hi as f64);
            if out < lo || out > hi {
                out = v - offset;
            }
            out = out.clamp(lo, hi);
        }
        samples[*p] = out as f32;
    }
    positions.len()
}

/// One density-gated offset for a scalar (text metrics, rect sizes).
pub fn perturb_scalar(value: f64, req: &NoiseRequest) -> f64 {
    if !value.is_finite() || !req.amplitude_ok() || !req.density_ok() {
        return value;
    }
    let mut stream = req.stream();
    if stream.next_unit() >= req.params.density {
        return value;
    }
    value + (2.0 * stream.next_unit() - 1.0) * req.params.amplitude
}

/// Quantize `t` to `precision` and add a bucket-keyed jitter below one step.
///
/// `floor(t / p) * p + u(bucket) * min(amplitude, p)`. Non-decreasing in `t`.
pub fn monotonic_jitter(t: f64, precision: f64, sub_seed: SubSeed, amplitude: f64) -> f64 {
    if !t.is_finite() || !precision.is_finite() || precision <= 0.0 {
        return t;
    }
    if !amplitude.is_finite() || amplitude <= 0.0 {
        return t;
    }
    let bucket = (t / precision).floor();
    let u = NoiseStream::new(sub_seed.value(), Discriminator::from_bucket(bucket as i64).value())
        .next_unit();
    bucket * precision + u * amplitude.min(precision)
}

/// Stateful clock that never runs backwards.
#[derive(Debug, Clone)]
pub struct MonotonicTimer {
    sub_seed: SubSeed,
    precision: f64,
    amplitude: f64,
    last: f64,
}

impl MonotonicTimer {
    pub fn new(sub_seed: SubSeed, precision: f64, amplitude: f64) -> Self {
        Self {
            sub_seed,
            precision,
            amplitude,
            last: f64::NEG_INFINITY,
        }
    }

    /// Timer for the profile's timing channel.
    pub fn for_profile(profile: &FingerprintProfile) -> Option<Self> {
        profile.channel(Channel::Timing).map(|c| {
            Self::new(c.sub_seed, profile.timer_precision_ms, c.amplitude)
        })
    }

    pub fn next(&mut self, t: f64) -> f64 {
        let v = monotonic_jitter(t, self.precision, self.sub_seed, self.amplitude);
        if !v.is_finite() {
            return v;
        }
        if v > self.last {
            self.last = v;
        }
        self.last
    }

    pub fn last(&self) -> Option<f64> {
        self.last.is_finite().then_some(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(amplitude: f64, density: f64, disc: u64) -> NoiseRequest {
        NoiseRequest::new(
            Channel::Canvas,
            SubSeed::new(6_872_900_249_316_189),
            Discriminator::from_raw(disc),
            NoiseParams::new(amplitude, density),
        )
    }

    #[test]
    fn test_floyd_positions_are_distinct() {
        let mut s = NoiseStream::new(1, 2);
        let mut p = select_positions(&mut s, 100, 100);
        p.sort_unstable();
        assert_eq!(p, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_floyd_positions_match_dense_tracking() {
        // Reference Floyd with a dense bitmap over the whole range
        fn dense(stream: &mut NoiseStream, n: usize, k: usize) -> Vec<usize> {
            let mut seen = vec![false; n];
            let mut out = Vec::new();
            for j in (n - k)..n {
                let t = stream.below(j as u64 + 1) as usize;
                let pick = if seen[t] { j } else { t };
                seen[pick] = true;
                out.push(pick);
            }
            out
        }
        for (n, k) in [(10, 10), (1000, 37), (4096, 4000), (1, 1)] {
            let a = select_positions(&mut NoiseStream::new(9, n as u64), n, k);
            let b = dense(&mut NoiseStream::new(9, n as u64), n, k);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_floyd_sparse_over_huge_range() {
        // Color channels of a 4K frame; only k slots are tracked
        let n = 3840 * 2160 * 3;
        let mut s = NoiseStream::new(3, 4);
        let p = select_positions(&mut s, n, 64);
        assert_eq!(p.len(), 64);
        assert!(p.iter().all(|&i| i < n));
        let mut sorted = p.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 64);
    }

    #[test]
    fn test_bytes_bounded_and_counted() {
        let mut buf = vec![128u8; 1000];
        let visited = perturb_bytes(&mut buf, &req(2.0, 0.05, 1000));
        assert_eq!(visited, 50);
        let changed = buf.iter().filter(|b| **b != 128).count();
        assert_eq!(changed, 50);
        assert!(buf.iter().all(|b| (126..=130).contains(b)));
    }

    #[test]
    fn test_bytes_reflect_at_edges() {
        let mut buf = vec![0u8; 200];
        perturb_bytes(&mut buf, &req(3.0, 0.5, 200));
        assert!(buf.iter().all(|b| *b <= 3));
        let mut buf = vec![255u8; 200];
        perturb_bytes(&mut buf, &req(3.0, 0.5, 200));
        assert!(buf.iter().all(|b| *b >= 252));
    }

    #[test]
    fn test_noise_is_idempotent_per_input() {
        let mut a = vec![100u8; 256];
        let mut b = vec![100u8; 256];
        perturb_bytes(&mut a, &req(2.0, 0.1, 256));
        perturb_bytes(&mut b, &req(2.0, 0.1, 256));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rgba_leaves_alpha() {
        let mut buf = vec![200u8; 64 * 64 * 4];
        let len = buf.len() as u64;
        perturb_rgba(&mut buf, &req(2.0, 0.05, len));
        assert!(buf.iter().skip(3).step_by(4).all(|a| *a == 200));
        assert!(buf.iter().any(|v| *v != 200));
    }

    #[test]
    fn test_edge_cases_are_noops() {
        let mut buf = vec![7u8; 16];
        assert_eq!(perturb_bytes(&mut buf, &req(0.5, 0.5, 1)), 0);
        assert_eq!(perturb_bytes(&mut buf, &req(f64::NAN, 0.5, 1)), 0);
        assert_eq!(perturb_bytes(&mut buf, &req(2.0, 0.0, 1)), 0);
        assert_eq!(perturb_bytes(&mut buf, &req(2.0, 1.5, 1)), 0);
        assert_eq!(perturb_bytes(&mut buf, &req(2.0, 0.01, 1)), 0);
        assert_eq!(perturb_bytes(&mut [], &req(2.0, 0.5, 0)), 0);
        assert_eq!(perturb_rgba(&mut [1, 2, 3], &req(2.0, 1.0, 3)), 0);
        assert!(buf.iter().all(|b| *b == 7));
    }

    #[test]
    fn test_samples_bounded() {
        let mut s = vec![0.25f32; 4096];
        let amp = 1e-4;
        perturb_samples(&mut s, &req(amp, 0.1, 4096), Some((-1.0, 1.0)));
        for v in &s {
            assert!(((*v as f64) - 0.25).abs() <= amp + 1e-7);
        }
        assert!(s.iter().filter(|v| **v != 0.25).count() > 300);
    }

    #[test]
    fn test_samples_skip_non_finite() {
        let mut s = vec![f32::NAN; 8];
        perturb_samples(&mut s, &req(0.1, 1.0, 8), None);
        assert!(s.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_scalar_density_gate() {
        let full = req(0.5, 1.0, Discriminator::from_text("Hello").value());
        let v = perturb_scalar(100.0, &full);
        assert!((v - 100.0).abs() <= 0.5);
        assert_eq!(v, perturb_scalar(100.0, &full));
        assert_eq!(perturb_scalar(f64::INFINITY, &full), f64::INFINITY);
    }

    #[test]
    fn test_text_discriminator_is_fnv1a() {
        // FNV-1a 64 of the empty string is the offset basis
        assert_eq!(Discriminator::from_text("").value(), 0xcbf2_9ce4_8422_2325);
        assert_eq!(Discriminator::from_text("a").value(), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_monotonic_jitter_quantizes() {
        let sub = SubSeed::new(5);
        let v = monotonic_jitter(1234.5678, 0.1, sub, 0.02);
        assert!(v >= 1234.5 - 1e-9 && v < 1234.5 + 0.02 + 1e-9, "{}", v);
        assert_eq!(v, monotonic_jitter(1234.5612, 0.1, sub, 0.02));
    }

    #[test]
    fn test_monotonic_timer_never_decreases() {
        let mut timer = MonotonicTimer::new(SubSeed::new(77), 0.1, 0.05);
        let mut prev = f64::NEG_INFINITY;
        let mut t = 0.0;
        for i in 0..2000 {
            t += if i % 7 == 0 { -0.03 } else { 0.017 };
            let v = timer.next(t);
            assert!(v >= prev);
            prev = v;
        }
    }
}
