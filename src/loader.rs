//! Background loader: a single worker task that drains the airport
//! expansion queue and then the chart/weather/purge work queue, waking on a
//! `Notify` instead of an OS thread + condvar since the rest of this crate
//! is built on tokio throughout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::database::Inner;
use crate::disk_layout;
use crate::error::ChartLoadError;
use crate::model::{Chart, ChartKey, PixelFormat, Surface};
use crate::postprocess;
use crate::provider::FetchedChart;
use crate::state::WorkItem;
use crate::weather::{self, WeatherKind};

pub(crate) async fn run(inner: Arc<Inner>) {
    loop {
        let item = {
            let mut guard = inner.state.lock().unwrap();
            let picked = loop {
                if guard.closing {
                    return;
                }
                if let Some(icao) = guard.loader_arpt_queue.pop_front() {
                    break Some(Work::ExpandAirport(icao));
                }
                if let Some(item) = guard.loader_queue.pop_front() {
                    break Some(Work::Item(item));
                }
                break None;
            };
            crate::observability::record_queue_depth(guard.loader_queue.len(), guard.loader_arpt_queue.len());
            match picked {
                Some(work) => work,
                None => {
                    drop(guard);
                    inner.notify.notified().await;
                    continue;
                }
            }
        };

        match item {
            Work::ExpandAirport(icao) => expand_airport(&inner, &icao).await,
            Work::Item(WorkItem::Purge) => do_purge(&inner),
            Work::Item(WorkItem::Metar(icao)) => {
                refresh_weather(&inner, &icao, WeatherKind::Metar).await
            }
            Work::Item(WorkItem::Taf(icao)) => {
                refresh_weather(&inner, &icao, WeatherKind::Taf).await
            }
            Work::Item(WorkItem::Chart(key)) => load_chart(&inner, &key).await,
        }
    }
}

enum Work {
    ExpandAirport(String),
    Item(WorkItem),
}

async fn expand_airport(inner: &Arc<Inner>, icao: &str) {
    let airport = {
        let state = inner.state.lock().unwrap();
        state.airports.get(icao).map(|e| e.info.clone())
    };
    let Some(airport) = airport else {
        return;
    };
    let charts = inner.provider.lazy_load(&airport).await;
    {
        let mut state = inner.state.lock().unwrap();
        if let Some(entry) = state.airports.get_mut(icao) {
            entry.discovered = true;
        }
    }
    for chart in charts {
        let mut state = inner.state.lock().unwrap();
        state.add_chart(icao, chart);
    }
}

fn do_purge(inner: &Arc<Inner>) {
    let mut state = inner.state.lock().unwrap();
    state.purge();
    debug!("cache purged");
}

async fn refresh_weather(inner: &Arc<Inner>, icao: &str, kind: WeatherKind) {
    // Stamp the refresh timestamp to "now" before the fetch: this is what
    // lets a *failed* fetch still suppress a storm of retries (see the
    // rewind below) even though no text was obtained.
    let stamped_at = chrono::Utc::now();
    {
        let mut state = inner.state.lock().unwrap();
        let Some(entry) = state.airports.get_mut(icao) else {
            return;
        };
        match kind {
            WeatherKind::Metar => entry.metar_refreshed_at = Some(stamped_at),
            WeatherKind::Taf => entry.taf_refreshed_at = Some(stamped_at),
        }
    }

    let base_url = inner.config.weather_base_url.clone();
    let result = weather::fetch_report(&inner.http, &base_url, icao, kind).await;

    let mut state = inner.state.lock().unwrap();
    let Some(entry) = state.airports.get_mut(icao) else {
        return;
    };
    match kind {
        WeatherKind::Metar => entry.metar_queued = false,
        WeatherKind::Taf => entry.taf_queued = false,
    }
    match result {
        Ok(Some(text)) => {
            match kind {
                WeatherKind::Metar => entry.metar_text = Some(text),
                WeatherKind::Taf => entry.taf_text = Some(text),
            }
            crate::observability::record_fetch_outcome("weather", true);
        }
        Ok(None) => {
            debug!(icao, ?kind, "no report available from provider");
            rewind_refresh_timestamp(entry, kind, stamped_at);
        }
        Err(e) => {
            warn!(icao, ?kind, error = %e, "weather refresh failed, will retry");
            crate::observability::record_fetch_outcome("weather", false);
            rewind_refresh_timestamp(entry, kind, stamped_at);
        }
    }
}

/// Rewind a failed refresh's timestamp so freshness expires after roughly
/// [`weather::RETRY_SPACING`] rather than the full age window — without
/// this, a transient failure would otherwise look "freshly attempted" for
/// up to a full `max_age` before the facade tries again.
fn rewind_refresh_timestamp(
    entry: &mut crate::state::AirportEntry,
    kind: WeatherKind,
    stamped_at: chrono::DateTime<chrono::Utc>,
) {
    let rewound = stamped_at - (kind.max_age() - weather::RETRY_SPACING);
    match kind {
        WeatherKind::Metar => entry.metar_refreshed_at = Some(rewound),
        WeatherKind::Taf => entry.taf_refreshed_at = Some(rewound),
    }
}

/// The full chart surface load: page-count discovery, rasterization (or
/// direct PNG decode), night inversion, watermarking, and eviction
/// bookkeeping, all under the one database mutex except for the actual
/// subprocess/network/decode work.
async fn load_chart(inner: &Arc<Inner>, key: &ChartKey) {
    let Some(chart) = find_chart(inner, key) else {
        let mut state = inner.state.lock().unwrap();
        if let Some(cs) = state.chart_state_mut(key) {
            cs.queued = false;
        }
        return;
    };

    let (page, zoom, night, night_prev, refreshed, payload) = {
        let state = inner.state.lock().unwrap();
        match state.chart_state(key) {
            Some(cs) => (cs.load_page, cs.zoom, cs.night, cs.night_prev, cs.refreshed, cs.payload.clone()),
            None => (0, 1.0, false, false, false, None),
        }
    };

    let outcome = fetch_and_decode(inner, &chart, page, zoom, night, night_prev, refreshed, payload).await;

    let mut state = inner.state.lock().unwrap();
    let Some(cs) = state.chart_state_mut(key) else {
        return;
    };
    cs.queued = false;
    // Marked unconditionally on the first attempt, win or lose: a single
    // fetch failure is sticky for the rest of the session (only the stale
    // on-disk copy remains reachable) rather than retried on every
    // subsequent request.
    cs.refreshed = true;

    match outcome {
        Ok(LoadOutcome { surface, num_pages, payload }) => {
            cs.surface = surface.map(Arc::new);
            cs.payload = payload;
            cs.num_pages = num_pages;
            cs.cur_page = page;
            cs.night_prev = night;
            cs.load_error = None;
            crate::observability::record_fetch_outcome(inner.provider.name(), true);
        }
        Err(e) => {
            warn!(icao = %key.icao, name = %key.name, error = %e, "chart load failed");
            cs.load_error = Some(e);
            crate::observability::record_fetch_outcome(inner.provider.name(), false);
        }
    }

    state.touch_chart(key);
    state.recompute_lru_bytes();
    state.evict_over_budget();
}

fn find_chart(inner: &Arc<Inner>, key: &ChartKey) -> Option<Arc<Chart>> {
    let state = inner.state.lock().unwrap();
    state
        .airports
        .get(&key.icao)
        .and_then(|e| e.charts.get(&key.name))
        .cloned()
}

struct LoadOutcome {
    surface: Option<Surface>,
    num_pages: i32,
    payload: Option<Arc<[u8]>>,
}

/// Decide whether a provider (re)fetch is needed at all, and fall back to a
/// stale on-disk artifact if a needed fetch fails.
///
/// Caching-permitted: refetch iff this is the first attempt this session,
/// the expected file is missing, or a night-mode switch is requested that
/// the provider can't satisfy without a fresh file.
/// Caching-forbidden: refetch iff no payload is held, or a night switch is
/// requested and the provider *does* supply distinct night artifacts (a
/// provider lacking one is satisfied by local inversion, no refetch needed).
async fn fetch_and_decode(
    inner: &Arc<Inner>,
    chart: &Chart,
    page: i32,
    zoom: f32,
    night: bool,
    night_prev: bool,
    refreshed: bool,
    payload: Option<Arc<[u8]>>,
) -> Result<LoadOutcome, ChartLoadError> {
    if let Some(loader) = &chart.custom_loader {
        let surface = loader()?;
        return Ok(finish_surface(inner, chart, surface, night, Some(1)));
    }

    let caching_permitted = inner.provider.caching_permitted();
    let has_distinct_night = chart.has_distinct_night_file();
    let night_mismatch = night != night_prev;

    let bytes: Arc<[u8]> = if caching_permitted {
        let path = resolve_cache_path(inner, chart);
        let file_exists = tokio::fs::try_exists(&path).await.unwrap_or(false);
        let needs_fetch = !refreshed || !file_exists || (night_mismatch && has_distinct_night);

        if needs_fetch {
            match inner.provider.get_chart(chart, page, zoom, night).await {
                Ok(fetched) => read_fetched_bytes(fetched).await?,
                Err(e) if file_exists => {
                    warn!(
                        icao = %chart.icao, name = %chart.name, error = %e,
                        "provider fetch failed, falling back to stale on-disk artifact"
                    );
                    read_disk(&path).await?
                }
                Err(e) => return Err(ChartLoadError::FetchFailed(e.to_string())),
            }
        } else {
            read_disk(&path).await?
        }
    } else {
        let needs_fetch = payload.is_none() || (night_mismatch && has_distinct_night);
        if needs_fetch {
            let fetched = inner
                .provider
                .get_chart(chart, page, zoom, night)
                .await
                .map_err(|e| ChartLoadError::FetchFailed(e.to_string()))?;
            read_fetched_bytes(fetched).await?
        } else {
            payload.expect("needs_fetch is false only when payload is Some")
        }
    };

    if !chart.is_pdf() {
        let surface = decode_png(&bytes)?;
        let mut outcome = finish_surface(inner, chart, surface, night, None);
        if !caching_permitted {
            outcome.payload = Some(bytes);
        }
        return Ok(outcome);
    }

    let mut num_pages = -1;
    if inner.pdf.tools_configured() {
        match inner.pdf.count_pages(&bytes).await {
            Ok(n) => num_pages = n,
            Err(ChartLoadError::ToolsMissing) => {}
            Err(e) => return Err(e),
        }
    } else {
        return Err(ChartLoadError::ToolsMissing);
    }

    let png_bytes = inner.pdf.rasterize(&bytes, page, zoom).await?;
    let surface = decode_png(&png_bytes)?;
    let mut outcome = finish_surface(inner, chart, surface, night, Some(num_pages));
    if !caching_permitted {
        outcome.payload = Some(bytes);
    }
    Ok(outcome)
}

async fn read_fetched_bytes(fetched: FetchedChart) -> Result<Arc<[u8]>, ChartLoadError> {
    match fetched {
        FetchedChart::Disk { path } => read_disk(&path).await,
        FetchedChart::Payload { bytes } => Ok(bytes),
    }
}

async fn read_disk(path: &std::path::Path) -> Result<Arc<[u8]>, ChartLoadError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| ChartLoadError::FetchFailed(e.to_string()))?;
    Ok(Arc::from(data.into_boxed_slice()))
}

fn finish_surface(
    inner: &Arc<Inner>,
    chart: &Chart,
    mut surface: Surface,
    night: bool,
    num_pages: Option<i32>,
) -> LoadOutcome {
    if night && !chart.has_distinct_night_file() {
        postprocess::invert_night(&mut surface);
    }
    inner.provider.watermark(chart, &mut surface);
    LoadOutcome {
        surface: Some(surface),
        num_pages: num_pages.unwrap_or(1),
        payload: None,
    }
}

fn decode_png(bytes: &[u8]) -> Result<Surface, ChartLoadError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| ChartLoadError::DecodeFailed(e.to_string()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Surface::new(
        width as usize,
        height as usize,
        PixelFormat::Rgba8,
        rgba.into_raw(),
    ))
}

/// Resolve a cache path for a provider that permits on-disk caching;
/// otherwise the bytes travel only through memory and this is unused.
#[allow(dead_code)]
fn resolve_cache_path(inner: &Arc<Inner>, chart: &Chart) -> std::path::PathBuf {
    disk_layout::chart_path(
        &inner.config.cache_dir,
        inner.provider.name(),
        &inner.config.airac_cycle.to_string(),
        &chart.icao,
        &chart.filename,
        inner.provider.hierarchical_layout(),
    )
}

/// Retry spacing floor applied to weather refresh failures before the
/// facade is willing to re-enqueue.
pub const WEATHER_RETRY_SPACING: Duration = Duration::from_secs(30);
