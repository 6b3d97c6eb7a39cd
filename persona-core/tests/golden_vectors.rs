//! Golden vectors
//!
//! Fixed seeds -> fixed outputs. Any other implementation of the derivation
//! and noise algorithms (the JavaScript sandbox build included) must produce
//! exactly these values.

use persona_core::noise::{self, monotonic_jitter};
use persona_core::prng::{mix64, NoiseStream};
use persona_core::{
    build_profile, Channel, Discriminator, EngineConfig, NoiseParams, NoiseRequest,
    PlatformFamily, ProfileOverrides, RootSeed, SubSeed,
};

const ROOT: u64 = 424242;

#[test]
fn test_mix64_vectors() {
    assert_eq!(mix64(0, 0), 16294208416658607535);
    assert_eq!(mix64(ROOT, 7), 8456422239380721839);
}

#[test]
fn test_stream_vectors() {
    let mut s = NoiseStream::new(ROOT, 7);
    assert_eq!(s.next_u64(), 9788452550566509358);
    assert_eq!(s.next_u64(), 14148535531337574129);
    assert_eq!(s.next_u64(), 11879495090340722547);
}

#[test]
fn test_sub_seed_vectors() {
    let root = RootSeed::from_u64(ROOT);
    let expected = [
        (Channel::Navigator, 1934826085216803u64),
        (Channel::Hardware, 359685494442684),
        (Channel::Screen, 1442619038199740),
        (Channel::Gpu, 8341742021780531),
        (Channel::Fonts, 8635699228090205),
        (Channel::Canvas, 6872900249316189),
        (Channel::Webgl, 5564299123632795),
        (Channel::Audio, 7521732090231710),
        (Channel::Metrics, 8338591573728568),
        (Channel::Timing, 5009906488147389),
    ];
    for (channel, value) in expected {
        assert_eq!(root.derive(channel).value(), value, "{}", channel);
    }
}

#[test]
fn test_de_profile_vector() {
    let build = build_profile(
        &RootSeed::from_u64(ROOT),
        "DE",
        &ProfileOverrides::default(),
        &EngineConfig::default(),
    )
    .unwrap();
    let p = build.profile;

    assert_eq!(p.context.locale, "de-DE");
    assert_eq!(p.context.timezone, "Europe/Berlin");
    assert_eq!(p.context.languages, vec!["de-DE", "de", "en"]);
    assert_eq!(p.context.platform, PlatformFamily::Windows);

    assert_eq!(p.hardware.hardware_concurrency, 2);
    assert_eq!(p.hardware.device_memory, 2);
    assert_eq!((p.screen.width, p.screen.height), (1440, 900));
    assert_eq!(p.screen.avail_height, 860);
    assert_eq!(
        p.gpu.renderer,
        "ANGLE (NVIDIA, NVIDIA GeForce RTX 3060 Direct3D11 vs_5_0 ps_5_0, D3D11)"
    );
    assert_eq!(p.fonts.len(), 15);
    assert_eq!(p.browser.major_version, 131);
    assert_eq!(p.browser.platform, "Win32");
}

#[test]
fn test_byte_noise_vector() {
    let req = NoiseRequest::new(
        Channel::Canvas,
        SubSeed::new(6872900249316189),
        Discriminator::from_len(64),
        NoiseParams::new(2.0, 0.1),
    );
    let mut buf = vec![128u8; 64];
    noise::perturb_bytes(&mut buf, &req);
    let changed: Vec<(usize, u8)> = buf
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != 128)
        .map(|(i, v)| (i, *v))
        .collect();
    assert_eq!(
        changed,
        vec![(8, 127), (11, 126), (18, 126), (45, 126), (49, 127), (51, 129)]
    );
}

#[test]
fn test_rgba_noise_vector() {
    let req = NoiseRequest::new(
        Channel::Canvas,
        SubSeed::new(6872900249316189),
        Discriminator::from_len(16384),
        NoiseParams::new(2.0, 0.001),
    );
    let mut buf = vec![128u8; 64 * 64 * 4];
    assert_eq!(noise::perturb_rgba(&mut buf, &req), 16);
    let changed: Vec<(usize, u8)> = buf
        .iter()
        .enumerate()
        .filter(|(_, v)| **v != 128)
        .map(|(i, v)| (i, *v))
        .collect();
    assert_eq!(
        changed,
        vec![
            (926, 127),
            (2074, 130),
            (2101, 126),
            (2221, 129),
            (3054, 126),
            (5177, 129),
            (6437, 127),
            (6860, 130),
            (8370, 130),
            (8710, 126),
            (9948, 127),
            (11836, 130),
            (12477, 130),
            (12828, 126),
            (15266, 129),
            (16133, 126),
        ]
    );
}

#[test]
fn test_scalar_noise_vector() {
    let req = NoiseRequest::new(
        Channel::Metrics,
        SubSeed::new(8338591573728568),
        Discriminator::from_text("Hello, world"),
        NoiseParams::new(0.01, 1.0),
    );
    let v = noise::perturb_scalar(100.0, &req);
    assert!((v - 99.99936056275463).abs() < 1e-12, "{}", v);
}

#[test]
fn test_monotonic_vector() {
    let v = monotonic_jitter(1234.5678, 0.1, SubSeed::new(5009906488147389), 0.02);
    assert!((v - 1234.508811366954).abs() < 1e-9, "{}", v);
}
