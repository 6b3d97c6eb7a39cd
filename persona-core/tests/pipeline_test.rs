//! End-to-end properties of the profile pipeline and the noise injector.

use persona_core::catalog::{self, GEOGRAPHIES};
use persona_core::noise;
use persona_core::propagation;
use persona_core::validator;
use persona_core::{
    build_profile, Channel, ContextOverrides, Discriminator, EngineConfig, NoiseParams,
    NoiseRequest, PersonaError, PlatformFamily, ProfileOverrides, RepairAction, ResolutionEvent,
    RootSeed, SubSeed,
};

fn config() -> EngineConfig {
    EngineConfig::default()
}

#[test]
fn test_same_seed_same_profile() {
    for seed in [0u64, 1, 424242, u64::MAX] {
        for geo in ["US", "DE", "JP", "BR"] {
            let a = build_profile(&RootSeed::from_u64(seed), geo, &ProfileOverrides::default(), &config())
                .unwrap();
            let b = build_profile(&RootSeed::from_u64(seed), geo, &ProfileOverrides::default(), &config())
                .unwrap();
            assert_eq!(a.profile, b.profile);
        }
    }
}

#[test]
fn test_every_geography_builds_consistent_profiles() {
    for g in GEOGRAPHIES {
        for seed in 0..40u64 {
            let root = RootSeed::from_u64(seed.wrapping_mul(0x2545_F491_4F6C_DD1D));
            let build = build_profile(&root, g.code, &ProfileOverrides::default(), &config())
                .unwrap_or_else(|e| panic!("{} / {}: {}", g.code, seed, e));
            assert!(build.repairs.is_empty(), "{}: {:?}", g.code, build.repairs);
            let p = &build.profile;
            assert!(g.has_timezone(&p.context.timezone));
            assert_eq!(p.context.languages[0], p.context.locale);
            assert!(p.screen.avail_height <= p.screen.height);
            assert_eq!(
                catalog::gpu_platform(&p.gpu.vendor, &p.gpu.renderer),
                Some(p.context.platform)
            );
            assert!(!p.webdriver);
        }
    }
}

#[test]
fn test_different_seeds_diverge() {
    let distinct: std::collections::HashSet<u64> = (0..200u64)
        .map(|s| {
            build_profile(&RootSeed::from_u64(s), "US", &ProfileOverrides::default(), &config())
                .unwrap()
                .profile
                .channels[&Channel::Canvas]
                .sub_seed
                .value()
        })
        .collect();
    assert_eq!(distinct.len(), 200);
}

#[test]
fn test_channel_independence() {
    // 10,000 roots, every channel pair: agreement of individual bits stays
    // near one half and the popcount of the XOR near 53 / 2.
    let roots: Vec<RootSeed> = (0..10_000u64).map(RootSeed::from_u64).collect();
    let pairs = [
        (Channel::Canvas, Channel::Webgl),
        (Channel::Navigator, Channel::Gpu),
        (Channel::Audio, Channel::Timing),
        (Channel::Metrics, Channel::Fonts),
    ];
    for (a, b) in pairs {
        let mut low_bit_agree = 0u32;
        let mut xor_bits = 0u64;
        for root in &roots {
            let x = root.derive(a).value();
            let y = root.derive(b).value();
            if x & 1 == y & 1 {
                low_bit_agree += 1;
            }
            xor_bits += (x ^ y).count_ones() as u64;
        }
        let agree = low_bit_agree as f64 / roots.len() as f64;
        let mean_xor = xor_bits as f64 / roots.len() as f64;
        assert!((0.47..0.53).contains(&agree), "{}/{}: {}", a, b, agree);
        assert!((25.5..27.5).contains(&mean_xor), "{}/{}: {}", a, b, mean_xor);
    }
}

#[test]
fn test_byte_noise_is_bounded() {
    for seed in 0..200u64 {
        let len = 100 + (seed as usize * 37) % 4000;
        let original: Vec<u8> = (0..len).map(|i| (i * 31 + seed as usize) as u8).collect();
        let mut buf = original.clone();
        let params = NoiseParams::new(3.0, 0.01 + (seed % 10) as f64 * 0.01);
        let req = NoiseRequest::new(
            Channel::Canvas,
            SubSeed::new(seed),
            Discriminator::from_len(len),
            params,
        );
        noise::perturb_bytes(&mut buf, &req);

        let expected = params.density * len as f64;
        let altered = buf.iter().zip(&original).filter(|(a, b)| a != b).count();
        assert!(
            (altered as f64 - expected).abs() <= 1.0,
            "altered {} expected {}",
            altered,
            expected
        );
        for (a, b) in buf.iter().zip(&original) {
            assert!((*a as i16 - *b as i16).abs() <= 3);
        }
    }
}

#[test]
fn test_rgba_scenario() {
    let root = RootSeed::from_u64(7);
    for variant in 0..20u64 {
        let req = NoiseRequest::new(
            Channel::Canvas,
            root.derive(Channel::Canvas),
            Discriminator::from_raw(variant),
            NoiseParams::new(2.0, 0.001),
        );
        let original: Vec<u8> = (0..64 * 64 * 4).map(|i| (i % 251) as u8).collect();
        let mut buf = original.clone();
        noise::perturb_rgba(&mut buf, &req);
        let altered = buf.iter().zip(&original).filter(|(a, b)| a != b).count();
        assert!((15..=17).contains(&altered), "altered {}", altered);
        for (i, (a, b)) in buf.iter().zip(&original).enumerate() {
            assert!((*a as i16 - *b as i16).abs() <= 2);
            if i % 4 == 3 {
                assert_eq!(a, b, "alpha touched at {}", i);
            }
        }
    }
}

#[test]
fn test_noise_is_idempotent() {
    let req = NoiseRequest::new(
        Channel::Audio,
        SubSeed::new(99),
        Discriminator::from_len(1024),
        NoiseParams::new(1e-4, 0.05),
    );
    let base: Vec<f32> = (0..1024).map(|i| (i as f32 / 1024.0).sin()).collect();
    let mut a = base.clone();
    let mut b = base.clone();
    noise::perturb_samples(&mut a, &req, Some((-1.0, 1.0)));
    noise::perturb_samples(&mut b, &req, Some((-1.0, 1.0)));
    assert_eq!(a, b);
    assert_ne!(a, base);
}

#[test]
fn test_round_trip_across_seeds() {
    for g in ["US", "DE", "FR", "JP", "AU"] {
        for seed in 0..25u64 {
            let p = build_profile(&RootSeed::from_u64(seed), g, &ProfileOverrides::default(), &config())
                .unwrap()
                .profile;
            let json = propagation::encode(&p).unwrap();
            assert_eq!(propagation::decode(&json).unwrap(), p);
        }
    }
}

#[test]
fn test_round_trip_keeps_configured_floats() {
    let mut cfg = config();
    cfg.noise.audio = NoiseParams::new(0.1 + 0.2, 1.0 / 3.0);
    let p = build_profile(&RootSeed::from_u64(3), "SE", &ProfileOverrides::default(), &cfg)
        .unwrap()
        .profile;
    let back = propagation::decode(&propagation::encode(&p).unwrap()).unwrap();
    assert_eq!(back.channels[&Channel::Audio].amplitude, 0.1 + 0.2);
    assert_eq!(back.channels[&Channel::Audio].density, 1.0 / 3.0);
}

#[test]
fn test_unknown_geography_degrades() {
    let build = build_profile(&RootSeed::from_u64(5), "Atlantis", &ProfileOverrides::default(), &config())
        .unwrap();
    assert_eq!(build.profile.context.geography, "US");
    assert!(matches!(
        build.events.as_slice(),
        [ResolutionEvent::UnknownGeography { .. }]
    ));
}

#[test]
fn test_discarded_override_degrades() {
    let o = ProfileOverrides {
        context: ContextOverrides {
            timezone: Some("Nowhere/Special".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let build = build_profile(&RootSeed::from_u64(5), "DE", &o, &config()).unwrap();
    assert_eq!(build.profile.context.timezone, "Europe/Berlin");
    assert!(matches!(
        build.events.as_slice(),
        [ResolutionEvent::DiscardedOverride { .. }]
    ));
}

#[test]
fn test_locale_override_repairs_languages() {
    let o = ProfileOverrides {
        context: ContextOverrides {
            locale: Some("pt-PT".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let build = build_profile(&RootSeed::from_u64(424242), "DE", &o, &config()).unwrap();
    assert_eq!(build.profile.context.locale, "pt-PT");
    assert_eq!(build.profile.context.languages, vec!["pt-PT", "pt", "en"]);
    assert!(build
        .repairs
        .iter()
        .any(|r| matches!(r, RepairAction::DeriveLanguages { .. })));
}

#[test]
fn test_languages_override_adopts_locale() {
    let o = ProfileOverrides {
        context: ContextOverrides {
            languages: Some(vec!["it-IT".into(), "it".into()]),
            ..Default::default()
        },
        ..Default::default()
    };
    let build = build_profile(&RootSeed::from_u64(8), "US", &o, &config()).unwrap();
    assert_eq!(build.profile.context.locale, "it-IT");
    assert_eq!(build.profile.context.languages, vec!["it-IT", "it"]);
}

#[test]
fn test_mac_only_screen_forces_platform() {
    let o = ProfileOverrides {
        screen_width: Some(1728),
        screen_height: Some(1117),
        ..Default::default()
    };
    for seed in 0..20u64 {
        let p = build_profile(&RootSeed::from_u64(seed), "GB", &o, &config())
            .unwrap()
            .profile;
        assert_eq!(p.context.platform, PlatformFamily::Mac);
        assert_eq!(p.screen.pixel_ratio, 2.0);
        assert_eq!(p.screen.avail_height, 1117 - 25);
    }
}

#[test]
fn test_pinned_conflict_is_hard_error() {
    let o = ProfileOverrides {
        context: ContextOverrides {
            platform: Some(PlatformFamily::Linux),
            ..Default::default()
        },
        screen_width: Some(1728),
        screen_height: Some(1117),
        ..Default::default()
    };
    let err = build_profile(&RootSeed::from_u64(1), "US", &o, &config()).unwrap_err();
    match err {
        PersonaError::Inconsistent(v) => {
            assert!(v
                .iter()
                .any(|v| matches!(v, validator::Violation::ScreenNotVetted { .. })));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_memory_and_cores_both_pinned_below_floor() {
    let o = ProfileOverrides {
        hardware_concurrency: Some(16),
        device_memory: Some(2),
        ..Default::default()
    };
    let err = build_profile(&RootSeed::from_u64(1), "US", &o, &config()).unwrap_err();
    assert!(err.requires_user_action());
    assert!(err.to_string().contains("floor"));
}
