//! METAR/TAF freshness windows and negative caching are exercised directly
//! against the pure helper functions in `chart_cache::weather`, since the
//! worker-side refresh talks to a real network endpoint that isn't
//! available in tests.

use chrono::Utc;
use chart_cache::weather::{is_fresh, WeatherKind, METAR_MAX_AGE, RETRY_SPACING, TAF_MAX_AGE};

#[test]
fn metar_expires_after_sixty_seconds() {
    let now = Utc::now();
    assert!(is_fresh(now - chrono::Duration::seconds(59), now, WeatherKind::Metar));
    assert!(!is_fresh(now - chrono::Duration::seconds(61), now, WeatherKind::Metar));
    assert_eq!(METAR_MAX_AGE, chrono::Duration::seconds(60));
}

#[test]
fn taf_expires_after_three_hundred_seconds() {
    let now = Utc::now();
    assert!(is_fresh(now - chrono::Duration::seconds(299), now, WeatherKind::Taf));
    assert!(!is_fresh(now - chrono::Duration::seconds(301), now, WeatherKind::Taf));
    assert_eq!(TAF_MAX_AGE, chrono::Duration::seconds(300));
}

#[test]
fn a_failed_refresh_rewinds_to_roughly_the_retry_spacing_not_the_full_window() {
    // On failure the refresh timestamp is rewound so the next call sees
    // staleness after ~RETRY_SPACING, not after the full
    // max_age window. This mirrors `loader::rewind_refresh_timestamp`
    // without needing the worker/network plumbing.
    let now = Utc::now();
    let rewound = now - (METAR_MAX_AGE - RETRY_SPACING);
    // Immediately after the rewind the cached value still reads fresh...
    assert!(is_fresh(rewound, now, WeatherKind::Metar));
    // ...but it goes stale again once another RETRY_SPACING elapses from
    // "now", i.e. roughly RETRY_SPACING after the failed attempt rather than
    // the full max_age window.
    assert!(!is_fresh(rewound, now + RETRY_SPACING, WeatherKind::Metar));
}
