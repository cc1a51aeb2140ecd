//! LRU memory accountant: enforces a byte budget over decoded pixel
//! buffers and compressed payloads, evicting from the tail of a
//! most-recently-used list. Naming entries are never touched by eviction.

use tracing::debug;

use crate::model::ChartKey;
use crate::state::State;

/// Default load-limit budget floor.
pub const MIN_BUDGET_BYTES: u64 = 16 * 1024 * 1024;

/// Default load-limit budget ceiling used when deriving from physical RAM.
pub const DEFAULT_BUDGET_CEILING_BYTES: u64 = 256 * 1024 * 1024;

/// `min(physical_memory / 32, 256 MiB)`, floored at 16 MiB
/// the physical-memory-derived default.
pub fn default_budget(physical_memory_bytes: u64) -> u64 {
    (physical_memory_bytes / 32)
        .min(DEFAULT_BUDGET_CEILING_BYTES)
        .max(MIN_BUDGET_BYTES)
}

/// Raise `requested` to the 16 MiB floor if needed.
pub fn clamp_budget(requested: u64) -> u64 {
    requested.max(MIN_BUDGET_BYTES)
}

impl State {
    /// Move `key` to the head of the MRU list (inserting it if new). Call
    /// this once per successful load, after the chart's `ChartState` has
    /// been updated in place, then call [`State::recompute_lru_bytes`] to
    /// keep the running byte total in sync.
    pub fn touch_chart(&mut self, key: &ChartKey) {
        self.lru.put(key.clone(), ());
    }

    /// Recompute the running byte total from scratch and replace it. Used
    /// whenever a chart's contribution changes (load, eviction, or a
    /// surface replacement) to avoid the accounting drifting out of sync
    /// with actual `ChartState` contents.
    pub fn recompute_lru_bytes(&mut self) {
        self.lru_bytes = self
            .lru
            .iter()
            .filter_map(|(key, _)| self.chart_states.get(key))
            .map(|s| s.byte_cost())
            .sum();
    }

    /// Evict from the tail while more than one chart is tracked and the
    /// total exceeds budget. The most-recently-touched chart (the one just
    /// loaded) is therefore never evicted by its own load.
    pub fn evict_over_budget(&mut self) {
        while self.lru.len() > 1 && self.lru_bytes > self.budget_bytes {
            let Some((key, _)) = self.lru.pop_lru() else {
                break;
            };
            if let Some(cs) = self.chart_states.get_mut(&key) {
                self.lru_bytes = self.lru_bytes.saturating_sub(cs.byte_cost());
                cs.surface = None;
                cs.payload = None;
            }
            debug!(icao = %key.icao, chart = %key.name, "evicted chart surface/payload");
            metrics::counter!("chart_cache.lru.evictions").increment(1);
        }
    }

    /// Drop all evictable surfaces/payloads and clear the MRU list, without
    /// touching naming entries.
    pub fn purge(&mut self) {
        for (key, _) in self.lru.iter() {
            if let Some(cs) = self.chart_states.get_mut(key) {
                cs.surface = None;
                cs.payload = None;
            }
        }
        self.lru.clear();
        self.lru_bytes = 0;
        metrics::counter!("chart_cache.purge.count").increment(1);
    }
}
