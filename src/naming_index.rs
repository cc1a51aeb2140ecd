//! Two-level naming index: `ICAO -> Airport`, each airport owning an
//! ordered set of charts keyed by chart name. The ordered-map container
//! itself is treated as a given primitive: this module is
//! just the lookup/insert semantics layered on top of `BTreeMap`.

use std::sync::Arc;

use tracing::debug;

use crate::model::{Airport, Chart, ChartType};
use crate::state::{AirportEntry, ChartState, State};

impl State {
    /// Idempotent insert-if-absent. Returns the resident airport either way.
    pub fn add_airport(
        &mut self,
        icao: &str,
        name: &str,
        city: &str,
        state: &str,
    ) -> Arc<Airport> {
        if let Some(entry) = self.airports.get(icao) {
            return entry.info.clone();
        }
        let info = Arc::new(Airport::new(icao, name, city, state));
        self.airports
            .insert(icao.to_string(), AirportEntry::new(info.clone()));
        debug!(icao, "added airport to naming index");
        info
    }

    /// Insert `chart` into `icao`'s chart set unless a chart with the same
    /// name is already present. Sets the airport's `discovered` flag as a
    /// side effect regardless of whether the insert occurred.
    pub fn add_chart(&mut self, icao: &str, chart: Chart) -> bool {
        let Some(entry) = self.airports.get_mut(icao) else {
            return false;
        };
        entry.discovered = true;
        if entry.charts.contains_key(&chart.name) {
            return false;
        }
        let key = crate::model::ChartKey::new(icao, chart.name.clone());
        let name = chart.name.clone();
        entry.charts.insert(name, Arc::new(chart));
        self.chart_states.entry(key).or_default();
        true
    }

    /// Look up an airport by ICAO code. When `normalize_non_icao` is set and
    /// `icao` is exactly 3 characters, a leading `K` is prepended before
    /// lookup (handling US non-ICAO codes). Any length other than 3 or 4
    /// returns `None` immediately without touching the index.
    pub fn find_airport(&self, icao: &str, normalize_non_icao: bool) -> Option<Arc<Airport>> {
        let key = normalize_icao(icao, normalize_non_icao)?;
        self.airports.get(key.as_ref()).map(|e| e.info.clone())
    }

    pub fn find_chart(
        &self,
        icao: &str,
        name: &str,
        normalize_non_icao: bool,
    ) -> Option<Arc<Chart>> {
        let key = normalize_icao(icao, normalize_non_icao)?;
        self.airports
            .get(key.as_ref())
            .and_then(|e| e.charts.get(name))
            .cloned()
    }

    pub fn is_arpt_known(&self, icao: &str, normalize_non_icao: bool) -> bool {
        match normalize_icao(icao, normalize_non_icao) {
            Some(key) => self.airports.contains_key(key.as_ref()),
            None => false,
        }
    }

    /// Enumerate chart names under `icao` whose type matches `mask`,
    /// sorted by name (the `BTreeMap` ordering already gives us this).
    pub fn chart_names(&self, icao: &str, mask: ChartType, normalize_non_icao: bool) -> Vec<String> {
        let Some(key) = normalize_icao(icao, normalize_non_icao) else {
            return Vec::new();
        };
        let Some(entry) = self.airports.get(key.as_ref()) else {
            return Vec::new();
        };
        entry
            .charts
            .values()
            .filter(|c| c.chart_type.matches(mask))
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Normalize an ICAO/non-ICAO identifier for lookup. Returns `None` for any
/// length other than 3 or 4.
fn normalize_icao(icao: &str, normalize_non_icao: bool) -> Option<std::borrow::Cow<'_, str>> {
    match icao.len() {
        4 => Some(std::borrow::Cow::Borrowed(icao)),
        3 if normalize_non_icao => Some(std::borrow::Cow::Owned(format!("K{icao}"))),
        _ => None,
    }
}
