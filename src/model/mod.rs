//! Data model: airports, charts, and the decoded-pixel surface they own.
//!
//! Mutable per-chart/per-airport state is not stored on these types
//! directly — it lives in [`crate::state::State`] behind the database's
//! single coarse mutex, so nothing here needs a second, competing lock.
//! These types hold only the identity/naming fields set once at creation.

mod airport;
mod chart;
mod surface;

pub use airport::Airport;
pub use chart::{Chart, ChartType, ChartView, ChartViews, GeoRef, InvalidInset};
pub use surface::{PixelFormat, Surface};

/// Key identifying a chart within the database: scoped by owning airport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartKey {
    pub icao: String,
    pub name: String,
}

impl ChartKey {
    pub fn new(icao: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            icao: icao.into(),
            name: name.into(),
        }
    }
}
