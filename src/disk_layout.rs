//! Deterministic on-disk cache layout and obsolete-AIRAC sweep.
//!
//! Layout: `<cache>/<provider>/<AIRAC4>/...`, either a flat
//! namespace of chart files or `<AIRAC4>/<ICAO>/<chart-file>` for
//! hierarchical providers.
//!
//! Public so that out-of-tree [`crate::ChartProvider`] implementations can
//! resolve the same `<cache>/<provider>/...` paths the core uses internally
//! (§6.2): `chart_path` for the chart artifact itself, `index_cache_path` for
//! WebDAV-style per-airport index caches, and `refresh_timestamp_path` for
//! regional sub-systems' refresh markers.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::warn;

/// Minimum valid AIRAC cycle value accepted by the sweep.
const AIRAC_MIN: u32 = 1000;

/// Obsolete cycle directories older than this are swept.
const SWEEP_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Build the on-disk path for `chart.filename` under `provider`'s `airac`
/// cycle. `hierarchical` providers nest one `<ICAO>/` directory deeper.
pub fn chart_path(
    cache_root: &Path,
    provider: &str,
    airac: &str,
    icao: &str,
    filename: &str,
    hierarchical: bool,
) -> PathBuf {
    let mut path = cache_root.join(provider).join(airac);
    if hierarchical {
        path = path.join(icao);
    }
    path.join(filename)
}

/// Path to a WebDAV-style provider's per-airport index cache
/// layout: `<AIRAC4>/<ICAO>/<category>.xml`.
pub fn index_cache_path(cache_root: &Path, provider: &str, airac: &str, icao: &str, category: &str) -> PathBuf {
    cache_root
        .join(provider)
        .join(airac)
        .join(icao)
        .join(format!("{category}.xml"))
}

/// Path to a regional sub-system's refresh timestamp file
/// layout: `<country-code>/refresh.txt`.
pub fn refresh_timestamp_path(cache_root: &Path, provider: &str, country_code: &str) -> PathBuf {
    cache_root.join(provider).join(country_code).join("refresh.txt")
}

/// Remove obsolete-AIRAC-cycle subdirectories under `<cache_root>/<provider>/`.
///
/// A subdirectory is removed iff its name is exactly 4 ASCII digits parsing
/// to an integer in `[1000, current_airac)` *and* its modification time is
/// older than 30 days. All enumeration/stat failures are logged and
/// skipped rather than propagated: the sweep is best-effort and never
/// fails the caller.
pub fn sweep_obsolete_airac(cache_root: &Path, provider: &str, current_airac: u32) {
    let provider_root = cache_root.join(provider);
    let entries = match std::fs::read_dir(&provider_root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(provider, error = %e, "obsolete-AIRAC sweep: could not enumerate provider directory");
            return;
        }
    };

    let now = SystemTime::now();
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(provider, error = %e, "obsolete-AIRAC sweep: directory entry error");
                continue;
            }
        };
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_four_digit_cycle(name) {
            continue;
        }
        let cycle: u32 = match name.parse() {
            Ok(c) => c,
            Err(_) => continue,
        };
        if !(AIRAC_MIN..current_airac).contains(&cycle) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!(provider, cycle, error = %e, "obsolete-AIRAC sweep: stat failed");
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!(provider, cycle, error = %e, "obsolete-AIRAC sweep: mtime unavailable");
                continue;
            }
        };
        let age = match now.duration_since(modified) {
            Ok(age) => age,
            Err(_) => continue, // modified in the future; leave it alone
        };
        if age < SWEEP_MAX_AGE {
            continue;
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                metrics::counter!("chart_cache.sweep.removed_dirs").increment(1);
                tracing::info!(provider, cycle, "obsolete-AIRAC sweep: removed cycle directory");
            }
            Err(e) => {
                warn!(provider, cycle, error = %e, "obsolete-AIRAC sweep: removal failed");
            }
        }
    }
}

fn is_four_digit_cycle(name: &str) -> bool {
    name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit())
}
