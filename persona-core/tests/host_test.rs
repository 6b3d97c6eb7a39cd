//! Host publication barrier under concurrent first use.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use persona_core::{
    build_profile, EngineConfig, HostSession, PersonaError, ProfileCell, ProfileOverrides,
    RootSeed,
};

fn build(seed: u64) -> persona_core::Result<persona_core::FingerprintProfile> {
    build_profile(
        &RootSeed::from_u64(seed),
        "DE",
        &ProfileOverrides::default(),
        &EngineConfig::default(),
    )
    .map(|b| b.profile)
}

#[test]
fn test_concurrent_callers_share_one_build() {
    let cell = Arc::new(ProfileCell::new());
    let builds = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8u64)
        .map(|i| {
            let cell = Arc::clone(&cell);
            let builds = Arc::clone(&builds);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                cell.get_or_build(|| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    build(1000 + i)
                })
                .unwrap()
            })
        })
        .collect();

    let profiles: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    for p in &profiles {
        assert!(Arc::ptr_eq(p, &profiles[0]));
    }
}

#[test]
fn test_failed_first_build_allows_retry() {
    let cell = Arc::new(ProfileCell::new());

    let failing = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            cell.get_or_build(|| Err(PersonaError::Entropy("no entropy".into())))
                .is_err()
        })
    };
    assert!(failing.join().unwrap());
    assert!(cell.get().is_none());

    let p = cell.get_or_build(|| build(7)).unwrap();
    assert_eq!(p.root_seed_echo, 7);
}

#[test]
fn test_sessions_read_without_locking() {
    let cell = ProfileCell::new();
    let profile = cell.get_or_build(|| build(42)).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let session = HostSession::new(Arc::clone(&profile));
            thread::spawn(move || {
                let mut pixels = vec![200u8; 256 * 4];
                session.canvas_pixels(&mut pixels);
                let mut clock = session.page_clock();
                (pixels, clock.now(1000.0))
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results {
        assert_eq!(r, &results[0]);
    }
}
