//! Subprocess-mediated PDF -> raster bridge.
//!
//! Both operations spawn an external tool, pump the PDF onto its stdin while
//! concurrently draining its stdout, and reap the child. The pump is a
//! `tokio::join!` of an async writer and an async reader so that a full
//! stdout pipe can never deadlock against a blocked stdin write
//! (the subprocess "must be prepared to yield when the child isn't
//! draining").

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use crate::error::ChartLoadError;

/// Paths to the two external PDF collaborators. Either being absent fails
/// PDF operations hard.
#[derive(Debug, Clone, Default)]
pub struct PdfTools {
    pub count_bin: Option<PathBuf>,
    pub raster_bin: Option<PathBuf>,
}

impl PdfTools {
    pub fn is_configured(&self) -> bool {
        self.count_bin.is_some() && self.raster_bin.is_some()
    }
}

/// Bridge to the external page-count and rasterize tools.
#[derive(Debug, Clone, Default)]
pub struct PdfBridge {
    tools: PdfTools,
}

impl PdfBridge {
    pub fn new(tools: PdfTools) -> Self {
        Self { tools }
    }

    pub fn tools_configured(&self) -> bool {
        self.tools.is_configured()
    }

    /// Count the pages in `pdf_bytes`. Returns `-1` on any failure rather
    /// than propagating an error: the caller treats `-1` as "still
    /// unknown", the one place in the bridge where a sentinel return value
    /// is more useful than `Result`.
    pub async fn count_pages(&self, pdf_bytes: &[u8]) -> Result<i32, ChartLoadError> {
        let Some(bin) = &self.tools.count_bin else {
            return Err(ChartLoadError::ToolsMissing);
        };

        let dylib_dir = bin.parent().map(|p| p.to_path_buf());
        let mut cmd = Command::new(bin);
        cmd.arg("fd://0")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &dylib_dir {
            augment_dylib_search_path(&mut cmd, dir);
        }

        let mut child = cmd.spawn().map_err(|_| ChartLoadError::PageCountFailed)?;
        let stdout_text = pump(&mut child, pdf_bytes)
            .await
            .map_err(|_| ChartLoadError::PageCountFailed)?;
        let status = child.wait().await.map_err(|_| ChartLoadError::PageCountFailed)?;
        if !status.success() {
            return Ok(-1);
        }

        Ok(parse_pages_line(&stdout_text).unwrap_or(-1))
    }

    /// Rasterize `page` (0-based) of `pdf_bytes` at `zoom`, clamped to
    /// `[0.1, 10.0]`. Returns the PNG bytes on success.
    pub async fn rasterize(
        &self,
        pdf_bytes: &[u8],
        page: i32,
        zoom: f32,
    ) -> Result<Vec<u8>, ChartLoadError> {
        let Some(bin) = &self.tools.raster_bin else {
            return Err(ChartLoadError::ToolsMissing);
        };
        let zoom = clamp_zoom(zoom);
        let resolution = (100.0 * zoom).round() as i32;
        let one_based_page = page + 1;

        let dylib_dir = bin.parent().map(|p| p.to_path_buf());
        let mut cmd = Command::new(bin);
        cmd.args([
            "-png",
            "-f",
            &one_based_page.to_string(),
            "-l",
            &one_based_page.to_string(),
            "-r",
            &resolution.to_string(),
            "-cropbox",
        ])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
        if let Some(dir) = &dylib_dir {
            augment_dylib_search_path(&mut cmd, dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|_| ChartLoadError::RasterizeFailed(None))?;
        let png_bytes = pump_bytes(&mut child, pdf_bytes)
            .await
            .map_err(|_| ChartLoadError::RasterizeFailed(None))?;
        let status = child
            .wait()
            .await
            .map_err(|_| ChartLoadError::RasterizeFailed(None))?;
        if !status.success() {
            return Err(ChartLoadError::RasterizeFailed(status.code()));
        }

        Ok(png_bytes)
    }
}

/// Extend `LD_LIBRARY_PATH`/`DYLD_LIBRARY_PATH` with the tool's own
/// directory so it can find colocated shared libraries.
fn augment_dylib_search_path(cmd: &mut Command, dir: &std::path::Path) {
    let var = if cfg!(target_os = "macos") {
        "DYLD_LIBRARY_PATH"
    } else {
        "LD_LIBRARY_PATH"
    };
    let existing = std::env::var(var).unwrap_or_default();
    let joined = if existing.is_empty() {
        dir.to_string_lossy().into_owned()
    } else {
        format!("{}:{}", dir.to_string_lossy(), existing)
    };
    cmd.env(var, joined);
}

/// Pump `input` to the child's stdin while concurrently draining stdout as
/// UTF-8 text (used by the page-count tool, which writes a text report).
async fn pump(child: &mut tokio::process::Child, input: &[u8]) -> anyhow::Result<String> {
    let bytes = pump_bytes(child, input).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Pump `input` to the child's stdin while concurrently draining stdout as
/// raw bytes (used by the rasterizer, which writes a PNG). Applies the
/// process-priority reduction right after spawn, best
/// effort only.
async fn pump_bytes(child: &mut tokio::process::Child, input: &[u8]) -> anyhow::Result<Vec<u8>> {
    lower_priority(child);

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow::anyhow!("child stdin not piped"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("child stdout not piped"))?;

    let input = input.to_vec();
    let write_fut = async move {
        // Closing stdin on drop signals EOF to the child even if the write
        // itself fails partway through (e.g. child exited early).
        let _ = stdin.write_all(&input).await;
        drop(stdin);
    };
    let read_fut = async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        buf
    };

    let (_, output) = tokio::join!(write_fut, read_fut);
    Ok(output)
}

#[cfg(unix)]
fn lower_priority(child: &tokio::process::Child) {
    if let Some(pid) = child.id() {
        unsafe {
            // Best-effort: a failure here must never abort the load.
            libc::setpriority(libc::PRIO_PROCESS, pid, 10);
        }
    }
}

#[cfg(not(unix))]
fn lower_priority(_child: &tokio::process::Child) {}

pub fn clamp_zoom(zoom: f32) -> f32 {
    zoom.clamp(0.1, 10.0)
}

fn parse_pages_line(text: &str) -> Option<i32> {
    text.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}
