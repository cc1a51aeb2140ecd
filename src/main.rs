//! Demo binary wiring the library up against the bundled `NullProvider`
//! fixture. This is not the intended embedding pattern (real callers link
//! `chart-cache` as a library and bring their own provider) it just
//! exercises `open`/`close` and the non-blocking facade end to end so the
//! crate has something runnable.

use std::sync::Arc;

use async_trait::async_trait;
use chart_cache::model::Chart;
use chart_cache::{ChartCacheConfig, ChartDatabase, ChartProvider, FetchedChart};
use tracing_subscriber::EnvFilter;

/// The minimum viable provider: exposes no charts, fails every fetch.
/// Useful as a starting point for a real provider implementation and for
/// exercising the database lifecycle without a network dependency.
struct NullProvider;

#[async_trait]
impl ChartProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn init(&self, _db: &ChartDatabase) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_chart(&self, chart: &Chart, _page: i32, _zoom: f32, _night: bool) -> anyhow::Result<FetchedChart> {
        anyhow::bail!("NullProvider has no charts for {}", chart.name)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .event_format(chart_cache::log_format::TargetFirstFormat)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ChartCacheConfig::from_env()?;
    let db = ChartDatabase::open(config, Arc::new(NullProvider)).await?;

    tracing::info!(
        known = db.is_arpt_known("KJFK"),
        "chart database opened against NullProvider"
    );

    db.close().await;
    Ok(())
}
