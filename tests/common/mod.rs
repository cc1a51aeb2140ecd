//! In-memory provider fixture shared by the end-to-end scenario tests in
//! this directory. Not part of the public API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chart_cache::model::{Airport, Chart};
use chart_cache::{ChartCacheConfig, ChartProvider, FetchedChart};

/// A config pointed at `cache_dir` with no PDF tools configured and a
/// generous load limit; individual tests override fields as needed.
pub fn test_config(cache_dir: std::path::PathBuf) -> ChartCacheConfig {
    ChartCacheConfig {
        cache_dir,
        pdf_tools: chart_cache::pdf_bridge::PdfTools::default(),
        airac_cycle: 2407,
        normalize_non_icao: true,
        proxy: None,
        load_limit_bytes: 64 * 1024 * 1024,
        weather_base_url: "http://127.0.0.1:1".to_string(),
    }
}

/// A single fixture chart: day PNG bytes, optional distinct night PNG.
pub struct FixtureChart {
    pub chart: Chart,
    pub png_day: Vec<u8>,
    pub png_night: Option<Vec<u8>>,
}

/// In-memory provider: airports/charts are pre-seeded by the test, `init`
/// installs them eagerly (no lazy discovery unless the test opts in via
/// [`TestProvider::with_lazy_discovery`]).
pub struct TestProvider {
    pub name: String,
    pub cache_dir: PathBuf,
    airports: Mutex<HashMap<String, (Airport, Vec<FixtureChart>)>>,
    fail_next_fetch: Mutex<bool>,
    caching_permitted: bool,
    hierarchical: bool,
    lazy_discovery: bool,
}

impl TestProvider {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            name: "fixture".to_string(),
            cache_dir,
            airports: Mutex::new(HashMap::new()),
            fail_next_fetch: Mutex::new(false),
            caching_permitted: true,
            hierarchical: false,
            lazy_discovery: false,
        }
    }

    pub fn caching_forbidden(mut self) -> Self {
        self.caching_permitted = false;
        self
    }

    pub fn with_lazy_discovery(mut self) -> Self {
        self.lazy_discovery = true;
        self
    }

    pub fn seed_airport(&self, icao: &str, name: &str, city: &str, state: &str) {
        self.airports.lock().unwrap().insert(
            icao.to_string(),
            (Airport::new(icao, name, city, state), Vec::new()),
        );
    }

    pub fn seed_chart(&self, icao: &str, chart: Chart, png_day: Vec<u8>, png_night: Option<Vec<u8>>) {
        let mut airports = self.airports.lock().unwrap();
        let entry = airports
            .entry(icao.to_string())
            .or_insert_with(|| (Airport::new(icao, icao, icao, "ST"), Vec::new()));
        entry.1.push(FixtureChart { chart, png_day, png_night });
    }

    /// Make the next `get_chart` call fail once, regardless of which chart
    /// is requested used to exercise the stale-on-disk-fallback path.
    pub fn fail_next_fetch(&self) {
        *self.fail_next_fetch.lock().unwrap() = true;
    }

    fn chart_path(&self, icao: &str, filename: &str) -> PathBuf {
        let mut path = self.cache_dir.join(&self.name).join("2407");
        if self.hierarchical {
            path = path.join(icao);
        }
        path.join(filename)
    }
}

#[async_trait]
impl ChartProvider for TestProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn caching_permitted(&self) -> bool {
        self.caching_permitted
    }

    fn hierarchical_layout(&self) -> bool {
        self.hierarchical
    }

    async fn init(&self, db: &chart_cache::ChartDatabase) -> anyhow::Result<()> {
        if self.lazy_discovery {
            return Ok(());
        }
        // Eager mode: install every seeded airport into the naming index up
        // front, matching an eagerly-indexed provider like Aeronav FAA.
        // Chart lists still expand through `lazy_load` on first reference,
        // the same way a freshly discovered airport expands on first reference.
        let airports = self.airports.lock().unwrap();
        for (icao, (airport, _)) in airports.iter() {
            db.add_airport(icao, &airport.name, &airport.city, &airport.state);
        }
        Ok(())
    }

    async fn get_chart(&self, chart: &Chart, _page: i32, _zoom: f32, night: bool) -> anyhow::Result<FetchedChart> {
        let mut fail = self.fail_next_fetch.lock().unwrap();
        if *fail {
            *fail = false;
            anyhow::bail!("simulated transient provider failure");
        }
        drop(fail);

        let airports = self.airports.lock().unwrap();
        let (_, charts) = airports
            .get(&chart.icao)
            .ok_or_else(|| anyhow::anyhow!("unknown airport {}", chart.icao))?;
        let fixture = charts
            .iter()
            .find(|f| f.chart.name == chart.name)
            .ok_or_else(|| anyhow::anyhow!("unknown chart {}", chart.name))?;

        let bytes = if night {
            fixture.png_night.as_ref().unwrap_or(&fixture.png_day).clone()
        } else {
            fixture.png_day.clone()
        };

        if self.caching_permitted {
            let filename = if night && fixture.png_night.is_some() {
                chart.filename_night.clone().unwrap_or_else(|| chart.filename.clone())
            } else {
                chart.filename.clone()
            };
            let path = self.chart_path(&chart.icao, &filename);
            tokio::fs::create_dir_all(path.parent().unwrap()).await?;
            tokio::fs::write(&path, &bytes).await?;
            Ok(FetchedChart::Disk { path })
        } else {
            Ok(FetchedChart::Payload { bytes: Arc::from(bytes.into_boxed_slice()) })
        }
    }

    async fn lazy_discover(&self, icao: &str) -> Option<Airport> {
        if !self.lazy_discovery {
            return None;
        }
        self.airports.lock().unwrap().get(icao).map(|(a, _)| a.clone())
    }

    async fn lazy_load(&self, airport: &Arc<Airport>) -> Vec<Chart> {
        self.airports
            .lock()
            .unwrap()
            .get(&airport.icao)
            .map(|(_, charts)| charts.iter().map(|f| f.chart.clone()).collect())
            .unwrap_or_default()
    }
}

/// Encode a tiny solid-color RGBA PNG in memory, used as fixture chart
/// artifact bytes the `image` crate can decode back.
pub fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let mut img = image::RgbaImage::new(width, height);
    for pixel in img.pixels_mut() {
        *pixel = image::Rgba(rgba);
    }
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode fixture PNG");
    bytes
}

pub async fn poll_until<F>(mut predicate: F, attempts: u32) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..attempts {
        if predicate() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    predicate()
}
