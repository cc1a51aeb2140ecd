//! Provider port: the capability surface the core consumes from a
//! chart source. Concrete providers (Aeronav FAA, Autorouter webdav,
//! Navigraph OAuth) are external collaborators and out of scope
//! this crate only defines the trait and ships fixtures
//! used by its own tests.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Airport, Chart};

/// Everything a provider may contribute. Optional hooks default to "not
/// supported" so a minimal provider only needs `name`, `init`, `fini`, and
/// `get_chart`.
#[async_trait]
pub trait ChartProvider: Send + Sync {
    /// Provider name, used as the top-level cache directory segment.
    fn name(&self) -> &str;

    /// Whether on-disk caching of fetched artifacts is permitted by the
    /// provider's terms. When `false`, fetched bytes
    /// are held only in the chart's in-memory `payload`.
    fn caching_permitted(&self) -> bool {
        true
    }

    /// Whether this provider lays out charts as `<AIRAC>/<ICAO>/<file>`
    /// (`true`) or flat `<AIRAC>/<file>` (`false`).
    fn hierarchical_layout(&self) -> bool {
        false
    }

    /// Discover the provider-global index, eagerly or lazily. Must leave
    /// the provider ready to serve `get_chart` calls once it returns `Ok`.
    /// Eager providers call `db.add_airport`/`db.add_chart` here; lazy
    /// providers just record their credentials and defer to
    /// [`ChartProvider::lazy_discover`]/[`ChartProvider::lazy_load`].
    async fn init(&self, db: &crate::database::ChartDatabase) -> anyhow::Result<()>;

    /// Release provider-private state.
    async fn fini(&self) {}

    /// Fetch `chart`'s artifact onto disk (or into its in-memory payload if
    /// caching is forbidden). May also populate `georef`/`views`/`procs` on
    /// first fetch — not modeled here since those fields are immutable
    /// post-creation in this port; a provider that needs to set them should
    /// do so while constructing the `Chart` during discovery instead.
    async fn get_chart(&self, chart: &Chart, page: i32, zoom: f32, night: bool) -> anyhow::Result<FetchedChart>;

    /// Synthesize an airport that isn't in the eagerly-loaded index.
    async fn lazy_discover(&self, _icao: &str) -> Option<Airport> {
        None
    }

    /// Populate the chart list for an airport on demand. The caller inserts
    /// the returned charts into the naming index; a provider that discovers
    /// charts incrementally can return a partial list and rely on being
    /// called again on the next expansion.
    async fn lazy_load(&self, _airport: &Arc<Airport>) -> Vec<Chart> {
        Vec::new()
    }

    /// License-compliance watermark, applied after night inversion.
    fn watermark(&self, _chart: &Chart, _surface: &mut crate::model::Surface) {}

    async fn test_connection(&self, _proxy: Option<&str>) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Indicates an out-of-band authentication step is outstanding.
    async fn pending_ext_account_setup(&self) -> bool {
        false
    }
}

/// What a provider's `get_chart` call produced, as either PNG/PDF bytes on
/// disk or an in-memory payload.
pub enum FetchedChart {
    /// Bytes were written to `path` (caching permitted).
    Disk { path: std::path::PathBuf },
    /// Bytes are only available in memory (caching forbidden).
    Payload { bytes: Arc<[u8]> },
}
