//! Sticky, cloneable error state for a chart's permanent load-error condition.
//!
//! Everything else in the crate uses `anyhow::Result`; this type exists only
//! because a load error must be stored on the chart and compared/cloned by
//! later callers, which `anyhow::Error` does not support.

use thiserror::Error;

/// A permanent (sticky) failure to produce a chart's surface.
///
/// Once a chart carries one of these, the facade returns it on every
/// subsequent surface request without re-entering the loader queue. It is
/// sticky until the next successful load clears it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChartLoadError {
    #[error("PDF tools are not configured")]
    ToolsMissing,
    #[error("PDF page count failed")]
    PageCountFailed,
    #[error("PDF rasterization failed (exit {0:?})")]
    RasterizeFailed(Option<i32>),
    #[error("image decode failed: {0}")]
    DecodeFailed(String),
    #[error("provider fetch failed: {0}")]
    FetchFailed(String),
}
