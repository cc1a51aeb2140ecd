//! Everything protected by the database's single coarse mutex.
//!
//! The naming index, every mutable chart field, both load queues, the LRU
//! list, and the byte budget all live in [`State`], which `ChartDatabase`
//! wraps in exactly one `std::sync::Mutex`.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;

use crate::error::ChartLoadError;
use crate::model::{Airport, Chart, ChartKey, Surface};

/// Per-airport dynamic state: chart set, discovery flag, weather cache.
///
/// The weather text and its last-refresh timestamp are tracked as
/// independent slots, not a single optional struct: the worker-side refresh
/// stamps the timestamp to "now" *before* the fetch even if no text has ever
/// been obtained, then rewinds it on failure so the next retry happens after
/// roughly the retry interval rather than the full age window.
pub struct AirportEntry {
    pub info: Arc<Airport>,
    pub charts: BTreeMap<String, Arc<Chart>>,
    pub discovered: bool,
    pub metar_text: Option<String>,
    pub metar_refreshed_at: Option<DateTime<Utc>>,
    pub taf_text: Option<String>,
    pub taf_refreshed_at: Option<DateTime<Utc>>,
    pub metar_queued: bool,
    pub taf_queued: bool,
}

impl AirportEntry {
    fn new(info: Arc<Airport>) -> Self {
        Self {
            info,
            charts: BTreeMap::new(),
            discovered: false,
            metar_text: None,
            metar_refreshed_at: None,
            taf_text: None,
            taf_refreshed_at: None,
            metar_queued: false,
            taf_queued: false,
        }
    }
}

/// Per-chart dynamic state.
#[derive(Clone)]
pub struct ChartState {
    pub surface: Option<Arc<Surface>>,
    pub zoom: f32,
    pub cur_page: i32,
    pub load_page: i32,
    /// `-1` means "not yet known"; once non-negative it is final.
    pub num_pages: i32,
    pub load_error: Option<ChartLoadError>,
    pub night: bool,
    pub night_prev: bool,
    pub refreshed: bool,
    pub payload: Option<Arc<[u8]>>,
    /// "Active" loader-queue link: suppresses duplicate enqueues
    /// at most one provider fetch may be in flight per chart.
    pub queued: bool,
}

impl Default for ChartState {
    fn default() -> Self {
        Self {
            surface: None,
            zoom: 1.0,
            cur_page: 0,
            load_page: 0,
            num_pages: -1,
            load_error: None,
            night: false,
            night_prev: false,
            refreshed: false,
            payload: None,
            queued: false,
        }
    }
}

impl ChartState {
    pub fn byte_cost(&self) -> u64 {
        let surface_bytes = self.surface.as_ref().map(|s| s.byte_cost()).unwrap_or(0);
        let payload_bytes = self.payload.as_ref().map(|p| p.len() as u64).unwrap_or(0);
        surface_bytes + payload_bytes
    }
}

/// The tagged work item placed on the loader queue, replacing the C
/// original's pointer-identity sentinels.
#[derive(Clone)]
pub enum WorkItem {
    Purge,
    Metar(String),
    Taf(String),
    Chart(ChartKey),
}

/// Everything the database mutex guards.
pub struct State {
    pub airports: BTreeMap<String, AirportEntry>,
    pub chart_states: std::collections::HashMap<ChartKey, ChartState>,
    pub loader_queue: VecDeque<WorkItem>,
    pub loader_arpt_queue: VecDeque<String>,
    pub lru: LruCache<ChartKey, ()>,
    pub lru_bytes: u64,
    pub budget_bytes: u64,
    pub proxy: Option<String>,
    pub closing: bool,
}

impl State {
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            airports: BTreeMap::new(),
            chart_states: std::collections::HashMap::new(),
            loader_queue: VecDeque::new(),
            loader_arpt_queue: VecDeque::new(),
            lru: LruCache::unbounded(),
            lru_bytes: 0,
            budget_bytes,
            proxy: None,
            closing: false,
        }
    }

    pub fn chart_state(&self, key: &ChartKey) -> Option<&ChartState> {
        self.chart_states.get(key)
    }

    pub fn chart_state_mut(&mut self, key: &ChartKey) -> Option<&mut ChartState> {
        self.chart_states.get_mut(key)
    }

    /// Drop pending chart work items, preserving `Purge`/`Metar`/`Taf`
    /// sentinels; weather and purge sentinels are not drop-resistant and
    /// stay queued. Clears the dropped charts' "active" flag too, since a
    /// dropped item is no longer in flight and must be re-enqueueable.
    pub fn drop_pending_chart_work(&mut self) {
        let chart_states = &mut self.chart_states;
        self.loader_queue.retain(|item| {
            if let WorkItem::Chart(key) = item {
                if let Some(cs) = chart_states.get_mut(key) {
                    cs.queued = false;
                }
                false
            } else {
                true
            }
        });
    }

    /// Enqueue a chart load unless one is already in flight for this chart
    /// (the "active loader-queue link" invariant).
    pub fn enqueue_chart(&mut self, key: &ChartKey) {
        if let Some(cs) = self.chart_states.get_mut(key) {
            if cs.queued {
                return;
            }
            cs.queued = true;
        }
        self.loader_queue.push_back(WorkItem::Chart(key.clone()));
    }

    pub fn enqueue_metar(&mut self, icao: &str) {
        if let Some(entry) = self.airports.get_mut(icao) {
            if entry.metar_queued {
                return;
            }
            entry.metar_queued = true;
        }
        self.loader_queue.push_back(WorkItem::Metar(icao.to_string()));
    }

    pub fn enqueue_taf(&mut self, icao: &str) {
        if let Some(entry) = self.airports.get_mut(icao) {
            if entry.taf_queued {
                return;
            }
            entry.taf_queued = true;
        }
        self.loader_queue.push_back(WorkItem::Taf(icao.to_string()));
    }

    pub fn enqueue_purge(&mut self) {
        self.drop_pending_chart_work();
        self.loader_queue.push_back(WorkItem::Purge);
    }

    /// Queue `icao` for provider-driven expansion if it isn't already
    /// discovered or pending.
    pub fn enqueue_airport_expansion(&mut self, icao: &str) {
        if self.loader_arpt_queue.iter().any(|q| q == icao) {
            return;
        }
        self.loader_arpt_queue.push_back(icao.to_string());
    }
}
