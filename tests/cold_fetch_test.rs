//! Cold fetch against an empty cache directory: discovery, chart expansion,
//! and a first successful load all happen through the async loader.

mod common;

use std::sync::Arc;

use chart_cache::model::{Chart, ChartType};
use chart_cache::{ChartDatabase, ChartSurface};
use common::{poll_until, solid_png, test_config, TestProvider};

#[tokio::test]
async fn cold_fetch_discovers_then_loads_surface() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KXYZ", "Example Field", "Anytown", "TX");
    provider.seed_chart(
        "KXYZ",
        Chart::new("KXYZ", "10-9", ChartType::AIRPORT_DIAGRAM, "10-9.png"),
        solid_png(4, 4, [10, 20, 30, 255]),
        None,
    );

    let db = ChartDatabase::open(test_config(tmp.path().to_path_buf()), provider.clone())
        .await
        .unwrap();

    // Airport isn't eagerly discovered by this provider (it only expands
    // lazily through `lazy_load`), so the first call returns nothing and
    // queues expansion.
    assert_eq!(db.get_chart_names("KXYZ", ChartType::AIRPORT_DIAGRAM), Vec::<String>::new());

    let discovered = poll_until(
        || db.get_chart_names("KXYZ", ChartType::AIRPORT_DIAGRAM) == vec!["10-9".to_string()],
        50,
    )
    .await;
    assert!(discovered, "airport should be discovered and its chart listed");

    let ready = poll_until(
        || matches!(
            db.get_chart_surface("KXYZ", "10-9", 0, 1.0, false),
            Some(ChartSurface::Ready(_))
        ),
        100,
    )
    .await;
    assert!(ready, "surface should eventually become ready");

    match db.get_chart_surface("KXYZ", "10-9", 0, 1.0, false).unwrap() {
        ChartSurface::Ready(surface) => {
            assert_eq!(surface.width, 4);
            assert_eq!(surface.height, 4);
        }
        _ => panic!("expected Ready, got a different status"),
    }
    assert_eq!(db.get_chart_page_count("KXYZ", "10-9"), Some(1));

    db.close().await;
}
