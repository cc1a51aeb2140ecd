//! PDF tools are unconfigured, so a PDF chart's load fails permanently and
//! stays sticky without re-entering the queue.

mod common;

use std::sync::Arc;

use chart_cache::model::{Chart, ChartType};
use chart_cache::{ChartDatabase, ChartLoadError, ChartSurface};
use common::{poll_until, solid_png, test_config, TestProvider};

#[tokio::test]
async fn missing_pdf_tools_is_sticky_load_error() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KXYZ", "Example Field", "Anytown", "TX");
    // Filename ends in .pdf; the fixture's "PDF bytes" are just any bytes
    // the provider would hand back the PDF bridge is what's expected
    // to reject this, not the decode step.
    provider.seed_chart(
        "KXYZ",
        Chart::new("KXYZ", "10-9", ChartType::AIRPORT_DIAGRAM, "10-9.pdf"),
        b"%PDF-1.4 fixture body, never actually rasterized".to_vec(),
        None,
    );

    // No PdfTools configured (test_config's default).
    let db = ChartDatabase::open(test_config(tmp.path().to_path_buf()), provider)
        .await
        .unwrap();

    let discovered = poll_until(
        || db.get_chart_names("KXYZ", ChartType::ALL) == vec!["10-9".to_string()],
        50,
    )
    .await;
    assert!(discovered);

    let failed = poll_until(
        || matches!(db.get_chart_surface("KXYZ", "10-9", 0, 1.0, false), Some(ChartSurface::Failed(_))),
        100,
    )
    .await;
    assert!(failed, "load should hit the sticky load-error path");

    match db.get_chart_surface("KXYZ", "10-9", 0, 1.0, false).unwrap() {
        ChartSurface::Failed(ChartLoadError::ToolsMissing) => {}
        _ => panic!("expected ToolsMissing, got a different status or error"),
    }

    // Subsequent identical calls return the same sticky failure without
    // re-entering the queue (no new Pending/Loading flicker).
    for _ in 0..5 {
        assert!(matches!(
            db.get_chart_surface("KXYZ", "10-9", 0, 1.0, false),
            Some(ChartSurface::Failed(ChartLoadError::ToolsMissing))
        ));
    }

    db.close().await;
}

#[tokio::test]
async fn non_pdf_chart_unaffected_by_missing_tools() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = Arc::new(TestProvider::new(tmp.path().to_path_buf()));
    provider.seed_airport("KXYZ", "Example Field", "Anytown", "TX");
    provider.seed_chart(
        "KXYZ",
        Chart::new("KXYZ", "diagram", ChartType::AIRPORT_DIAGRAM, "diagram.png"),
        solid_png(2, 2, [1, 2, 3, 255]),
        None,
    );

    let db = ChartDatabase::open(test_config(tmp.path().to_path_buf()), provider)
        .await
        .unwrap();
    let _ = db.get_chart_names("KXYZ", ChartType::ALL);
    let ready = poll_until(
        || matches!(db.get_chart_surface("KXYZ", "diagram", 0, 1.0, false), Some(ChartSurface::Ready(_))),
        100,
    )
    .await;
    assert!(ready);

    db.close().await;
}
