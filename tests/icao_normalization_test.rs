//! 3-character non-ICAO identifiers are
//! resolved by prepending `K` only when `normalize_non_icao` is enabled.

mod common;

use std::sync::Arc;

use chart_cache::model::ChartType;
use chart_cache::ChartDatabase;
use common::{test_config, TestProvider};

#[tokio::test]
async fn normalize_enabled_resolves_three_letter_code() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KAUS", "Austin Bergstrom", "Austin", "TX");

    let mut config = test_config(tmp.path().to_path_buf());
    config.normalize_non_icao = true;
    let db = ChartDatabase::open(config, provider).await.unwrap();

    // Eager `init` installs the airport synchronously before `open`
    // returns, so this resolves immediately, not just "eventually".
    assert!(db.is_arpt_known("AUS"));
    assert!(db.is_arpt_known("KAUS"));
    // get_chart_names("AUS", ALL) resolves through the same normalization
    // path as is_arpt_known; an empty result here still means "matched,
    // discovery pending" not "unknown".
    let _ = db.get_chart_names("AUS", ChartType::ALL);

    db.close().await;
}

#[tokio::test]
async fn normalize_disabled_rejects_three_letter_code() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KAUS", "Austin Bergstrom", "Austin", "TX");

    let mut config = test_config(tmp.path().to_path_buf());
    config.normalize_non_icao = false;
    let db = ChartDatabase::open(config, provider).await.unwrap();

    assert!(!db.is_arpt_known("AUS"));
    assert!(db.is_arpt_known("KAUS"));
    assert_eq!(db.get_chart_names("AUS", ChartType::ALL), Vec::<String>::new());

    db.close().await;
}

#[tokio::test]
async fn lengths_other_than_three_or_four_never_resolve() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KAUS", "Austin Bergstrom", "Austin", "TX");
    let db = ChartDatabase::open(test_config(tmp.path().to_path_buf()), provider)
        .await
        .unwrap();

    assert!(!db.is_arpt_known("A"));
    assert!(!db.is_arpt_known("AUSTIN"));
    assert!(!db.is_arpt_known(""));

    db.close().await;
}
