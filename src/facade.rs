//! Public request surface: everything a viewer calls to resolve an
//! airport, enumerate its charts, and pull a chart surface or weather
//! report, triggering background work as needed rather than blocking on it.

use std::sync::Arc;

use crate::database::ChartDatabase;
use crate::error::ChartLoadError;
use crate::model::{Airport, Chart, ChartKey, ChartType, Surface};
use crate::weather::WeatherKind;

/// A chart's current load status, returned in place of blocking until the
/// surface is ready.
pub enum ChartSurface {
    /// No artifact has been requested yet; a load was just enqueued.
    Pending,
    /// A load is already in flight.
    Loading,
    /// The last load attempt failed; the error is sticky until the next
    /// successful load.
    Failed(ChartLoadError),
    /// Ready to display.
    Ready(Arc<Surface>),
}

impl ChartDatabase {
    /// Idempotent insert-if-absent, for providers populating their index
    /// eagerly during [`crate::ChartProvider::init`]. Returns the resident
    /// airport either way.
    pub fn add_airport(&self, icao: &str, name: &str, city: &str, state: &str) -> Arc<Airport> {
        self.inner.state.lock().unwrap().add_airport(icao, name, city, state)
    }

    /// Insert `chart` into `icao`'s chart set unless a chart with the same
    /// name is already present, for providers populating their index
    /// eagerly. Returns whether the insert occurred.
    pub fn add_chart(&self, icao: &str, chart: Chart) -> bool {
        self.inner.state.lock().unwrap().add_chart(icao, chart)
    }

    /// Resolve `icao` to an [`Airport`], consulting the naming index first
    /// and falling back to the provider's lazy discovery hook. Also queues
    /// the airport's chart list for background expansion on first sight.
    pub async fn find_airport(&self, icao: &str) -> Option<Arc<Airport>> {
        let normalize = self.inner.config.normalize_non_icao;
        if let Some(airport) = {
            let state = self.inner.state.lock().unwrap();
            state.find_airport(icao, normalize)
        } {
            self.ensure_expansion_queued(&airport.icao);
            return Some(airport);
        }

        let discovered = self.inner.provider.lazy_discover(icao).await?;
        let airport = {
            let mut state = self.inner.state.lock().unwrap();
            state.add_airport(&discovered.icao, &discovered.name, &discovered.city, &discovered.state)
        };
        self.ensure_expansion_queued(&airport.icao);
        Some(airport)
    }

    fn ensure_expansion_queued(&self, icao: &str) {
        let mut state = self.inner.state.lock().unwrap();
        let discovered = state.airports.get(icao).map(|e| e.discovered).unwrap_or(false);
        if discovered {
            return;
        }
        state.enqueue_airport_expansion(icao);
        drop(state);
        self.inner.notify.notify_one();
    }

    pub fn is_arpt_known(&self, icao: &str) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.is_arpt_known(icao, self.inner.config.normalize_non_icao)
    }

    pub fn get_airport_name(&self, icao: &str) -> Option<String> {
        self.with_airport(icao, |a| a.name.clone())
    }

    pub fn get_airport_city(&self, icao: &str) -> Option<String> {
        self.with_airport(icao, |a| a.city.clone())
    }

    pub fn get_airport_state(&self, icao: &str) -> Option<String> {
        self.with_airport(icao, |a| a.state.clone())
    }

    fn with_airport<T>(&self, icao: &str, f: impl FnOnce(&Airport) -> T) -> Option<T> {
        let state = self.inner.state.lock().unwrap();
        state
            .find_airport(icao, self.inner.config.normalize_non_icao)
            .map(|a| f(&a))
    }

    /// Chart names under `icao` whose type intersects `mask`, sorted.
    ///
    /// Returns empty while the airport's chart list is still being lazily
    /// discovered, queuing the expansion (and jumping it ahead of any
    /// pending chart loads) rather than blocking for it.
    pub fn get_chart_names(&self, icao: &str, mask: ChartType) -> Vec<String> {
        let normalize = self.inner.config.normalize_non_icao;
        let mut state = self.inner.state.lock().unwrap();
        let Some(airport) = state.find_airport(icao, normalize) else {
            return Vec::new();
        };
        let discovered = state
            .airports
            .get(&airport.icao)
            .map(|e| e.discovered)
            .unwrap_or(false);
        if !discovered {
            state.drop_pending_chart_work();
            state.enqueue_airport_expansion(&airport.icao);
            drop(state);
            self.inner.notify.notify_one();
            return Vec::new();
        }
        state.chart_names(icao, mask, normalize)
    }

    fn find_chart(&self, icao: &str, name: &str) -> Option<Arc<Chart>> {
        let state = self.inner.state.lock().unwrap();
        state.find_chart(icao, name, self.inner.config.normalize_non_icao)
    }

    pub fn get_chart_codename(&self, icao: &str, name: &str) -> Option<String> {
        self.find_chart(icao, name).and_then(|c| c.codename.clone())
    }

    pub fn get_chart_type(&self, icao: &str, name: &str) -> Option<ChartType> {
        self.find_chart(icao, name).map(|c| c.chart_type)
    }

    pub fn get_chart_georef(&self, icao: &str, name: &str) -> Option<crate::model::GeoRef> {
        self.find_chart(icao, name).and_then(|c| c.georef.clone())
    }

    pub fn get_chart_views(&self, icao: &str, name: &str) -> Option<crate::model::ChartViews> {
        self.find_chart(icao, name).and_then(|c| c.views)
    }

    pub fn get_chart_procs(&self, icao: &str, name: &str) -> Option<Vec<String>> {
        self.find_chart(icao, name).map(|c| c.procs.clone())
    }

    pub fn get_chart_page_count(&self, icao: &str, name: &str) -> Option<i32> {
        let chart = self.find_chart(icao, name)?;
        let key = ChartKey::new(chart.icao.clone(), name);
        let state = self.inner.state.lock().unwrap();
        state.chart_state(&key).map(|cs| cs.num_pages)
    }

    /// Request a chart's surface at `page`/`zoom`/`night`. Returns the
    /// surface immediately if it's already fresh for the requested
    /// parameters; otherwise enqueues a (re)load and returns the chart's
    /// current status without blocking.
    pub fn get_chart_surface(
        &self,
        icao: &str,
        name: &str,
        page: i32,
        zoom: f32,
        night: bool,
    ) -> Option<ChartSurface> {
        let Some(chart) = self.find_chart(icao, name) else {
            return None;
        };
        let key = ChartKey::new(chart.icao.clone(), name);

        let mut state = self.inner.state.lock().unwrap();
        let cs = state.chart_states.entry(key.clone()).or_default();

        if let Some(err) = &cs.load_error {
            if cs.refreshed && cs.cur_page == page && (cs.zoom - zoom).abs() < f32::EPSILON {
                return Some(ChartSurface::Failed(err.clone()));
            }
        }

        // Any night-mode mismatch reloads, regardless of whether the
        // provider supplies a distinct night artifact: a provider without
        // one still needs the surface re-decoded and locally inverted by
        // `finish_surface`, and a provider with one needs the night file
        // actually fetched (`fetch_and_decode` decides which).
        let needs_reload = cs.surface.is_none()
            || !cs.refreshed
            || cs.cur_page != page
            || (cs.zoom - zoom).abs() >= f32::EPSILON
            || night != cs.night_prev;

        cs.load_page = page;
        cs.zoom = zoom;
        cs.night = night;

        if needs_reload {
            let was_pending = cs.queued;
            drop(state);
            {
                let mut state = self.inner.state.lock().unwrap();
                // Jump-the-line: a parameter change drops other pending
                // chart work so this request's load is serviced next,
                // without interrupting anything already dequeued.
                state.drop_pending_chart_work();
                state.enqueue_chart(&key);
            }
            self.inner.notify.notify_one();
            return Some(if was_pending {
                ChartSurface::Loading
            } else {
                ChartSurface::Pending
            });
        }

        let surface = cs.surface.clone();
        let queued = cs.queued;
        crate::observability::record_surface_lookup(surface.is_some());
        match surface {
            Some(surface) => {
                state.touch_chart(&key);
                Some(ChartSurface::Ready(surface))
            }
            None if queued => Some(ChartSurface::Loading),
            None => Some(ChartSurface::Pending),
        }
    }

    fn weather_text(&self, icao: &str, kind: WeatherKind) -> Option<String> {
        let normalize = self.inner.config.normalize_non_icao;
        let icao = {
            let state = self.inner.state.lock().unwrap();
            state.find_airport(icao, normalize)?.icao.clone()
        };

        let mut state = self.inner.state.lock().unwrap();
        let entry = state.airports.get(&icao)?;
        let (text, refreshed_at) = match kind {
            WeatherKind::Metar => (entry.metar_text.clone(), entry.metar_refreshed_at),
            WeatherKind::Taf => (entry.taf_text.clone(), entry.taf_refreshed_at),
        };

        let fresh = refreshed_at.is_some_and(|at| crate::weather::is_fresh(at, chrono::Utc::now(), kind));

        if !fresh {
            match kind {
                WeatherKind::Metar => state.enqueue_metar(&icao),
                WeatherKind::Taf => state.enqueue_taf(&icao),
            }
            drop(state);
            self.inner.notify.notify_one();
        }

        text
    }

    pub fn get_metar(&self, icao: &str) -> Option<String> {
        self.weather_text(icao, WeatherKind::Metar)
    }

    pub fn get_taf(&self, icao: &str) -> Option<String> {
        self.weather_text(icao, WeatherKind::Taf)
    }

    /// Drop every cached surface and in-memory payload. Naming entries and
    /// weather caches are untouched.
    pub fn purge(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.enqueue_purge();
        drop(state);
        self.inner.notify.notify_one();
    }

    pub fn set_load_limit(&self, bytes: u64) {
        let bytes = crate::lru_accountant::clamp_budget(bytes);
        let mut state = self.inner.state.lock().unwrap();
        state.budget_bytes = bytes;
        state.evict_over_budget();
    }

    pub fn get_load_limit(&self) -> u64 {
        self.inner.state.lock().unwrap().budget_bytes
    }

    pub fn set_proxy(&self, proxy: Option<String>) {
        let mut state = self.inner.state.lock().unwrap();
        state.proxy = proxy;
    }

    pub fn get_proxy(&self) -> Option<String> {
        self.inner.state.lock().unwrap().proxy.clone()
    }

    pub async fn test_connection(&self) -> anyhow::Result<bool> {
        let proxy = self.get_proxy();
        self.inner.provider.test_connection(proxy.as_deref()).await
    }

    pub async fn pending_ext_account_setup(&self) -> bool {
        self.inner.provider.pending_ext_account_setup().await
    }

    /// Whether the database has finished provider `init` and is ready to
    /// serve lookups. `open` only returns after `init` succeeds, so this is
    /// always `true` for a live handle; kept for symmetry with the rest of
    /// the request surface and for callers that hold a handle across a
    /// `close`.
    pub fn is_ready(&self) -> bool {
        !self.inner.state.lock().unwrap().closing
    }
}
