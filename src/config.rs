//! Configuration: typed config assembled from environment variables via
//! `dotenvy::dotenv().ok()` followed by `std::env::var` lookups.

use std::path::PathBuf;

use sysinfo::System;

use crate::lru_accountant::default_budget;
use crate::pdf_bridge::PdfTools;

/// Default base URL for the weather text data service.
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://aviationweather.gov";

#[derive(Debug, Clone)]
pub struct ChartCacheConfig {
    pub cache_dir: PathBuf,
    pub pdf_tools: PdfTools,
    pub airac_cycle: u32,
    pub normalize_non_icao: bool,
    pub proxy: Option<String>,
    pub load_limit_bytes: u64,
    pub weather_base_url: String,
}

impl ChartCacheConfig {
    /// Load configuration from the process environment. `.env`, if present,
    /// is loaded first (`dotenvy::dotenv().ok()` — absence is not an
    /// error).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cache_dir = std::env::var("CHART_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./chart-cache"));

        let pdf_tools = PdfTools {
            count_bin: std::env::var("CHART_PDFINFO_BIN").ok().map(PathBuf::from),
            raster_bin: std::env::var("CHART_PDFTOPPM_BIN").ok().map(PathBuf::from),
        };

        let airac_cycle: u32 = std::env::var("CHART_AIRAC_CYCLE")
            .map_err(|_| anyhow::anyhow!("CHART_AIRAC_CYCLE must be set (e.g. \"2407\")"))?
            .parse()?;

        let normalize_non_icao = std::env::var("CHART_NORMALIZE_NON_ICAO")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let proxy = std::env::var("CHART_PROXY").ok();

        let weather_base_url = std::env::var("CHART_WEATHER_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_WEATHER_BASE_URL.to_string());

        let load_limit_bytes = match std::env::var("CHART_LOAD_LIMIT_BYTES") {
            Ok(v) => v.parse()?,
            Err(_) => {
                let mut sys = System::new();
                sys.refresh_memory();
                default_budget(sys.total_memory())
            }
        };

        Ok(Self {
            cache_dir,
            pdf_tools,
            airac_cycle,
            normalize_non_icao,
            proxy,
            load_limit_bytes: crate::lru_accountant::clamp_budget(load_limit_bytes),
            weather_base_url,
        })
    }
}
