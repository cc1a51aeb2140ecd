/// Maximum invalid-inset rectangles a georef may carry.
pub const MAX_INVALID_INSETS: usize = 16;

/// Maximum ARINC-424 procedure names a chart may link to.
pub const MAX_PROCS: usize = 24;

/// Chart type flag set. Query filters combine candidates by bitwise
/// intersection against a caller-supplied mask, so this is a bitmask rather
/// than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChartType(u16);

impl ChartType {
    pub const AIRPORT_DIAGRAM: ChartType = ChartType(1 << 0);
    pub const APPROACH: ChartType = ChartType(1 << 1);
    pub const DEPARTURE: ChartType = ChartType(1 << 2);
    pub const OBSTACLE_DEPARTURE: ChartType = ChartType(1 << 3);
    pub const ARRIVAL: ChartType = ChartType(1 << 4);
    pub const MINIMUMS: ChartType = ChartType(1 << 5);
    pub const AIRPORT_INFO: ChartType = ChartType(1 << 6);
    pub const UNKNOWN: ChartType = ChartType(1 << 7);
    pub const ALL: ChartType = ChartType(0xFFFF);

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        ChartType(bits)
    }

    pub fn matches(self, mask: ChartType) -> bool {
        self.0 & mask.0 != 0
    }

    pub fn union(self, other: ChartType) -> ChartType {
        ChartType(self.0 | other.0)
    }
}

/// Two-point pixel <-> geographic correspondence plus invalid regions.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRef {
    pub point_a: (f64, f64, f64, f64), // (pixel_x, pixel_y, lat, lon)
    pub point_b: (f64, f64, f64, f64),
    pub invalid_insets: Vec<InvalidInset>,
}

impl GeoRef {
    /// Construct a georef, silently truncating to [`MAX_INVALID_INSETS`]
    /// insets if the caller supplied more (providers are not trusted to
    /// respect the cap).
    pub fn new(
        point_a: (f64, f64, f64, f64),
        point_b: (f64, f64, f64, f64),
        mut invalid_insets: Vec<InvalidInset>,
    ) -> Self {
        invalid_insets.truncate(MAX_INVALID_INSETS);
        Self {
            point_a,
            point_b,
            invalid_insets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidInset {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartView {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChartViews {
    pub header: Option<ChartView>,
    pub planview: Option<ChartView>,
    pub profile: Option<ChartView>,
    pub minimums: Option<ChartView>,
}

/// Callback producing a surface directly, bypassing provider fetch and disk
/// I/O entirely used for purely in-memory synthesized charts. Boxed in an
/// `Arc` so `Chart` stays `Clone`.
pub type CustomLoader =
    std::sync::Arc<dyn Fn() -> Result<crate::model::Surface, crate::error::ChartLoadError> + Send + Sync>;

/// Identity and naming fields for a chart, set once at creation by a
/// provider during airport expansion and never mutated afterward
/// once built, only dynamic per-viewer state changes.
#[derive(Clone)]
pub struct Chart {
    pub icao: String,
    pub name: String,
    pub chart_type: ChartType,
    pub codename: Option<String>,
    pub filename: String,
    pub filename_night: Option<String>,
    pub georef: Option<GeoRef>,
    pub views: Option<ChartViews>,
    pub procs: Vec<String>,
    /// See [`CustomLoader`]. `None` for every provider-backed chart.
    pub custom_loader: Option<CustomLoader>,
}

impl std::fmt::Debug for Chart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart")
            .field("icao", &self.icao)
            .field("name", &self.name)
            .field("chart_type", &self.chart_type)
            .field("codename", &self.codename)
            .field("filename", &self.filename)
            .field("filename_night", &self.filename_night)
            .field("georef", &self.georef)
            .field("views", &self.views)
            .field("procs", &self.procs)
            .field("custom_loader", &self.custom_loader.is_some())
            .finish()
    }
}

impl Chart {
    pub fn new(icao: impl Into<String>, name: impl Into<String>, chart_type: ChartType, filename: impl Into<String>) -> Self {
        Self {
            icao: icao.into(),
            name: name.into(),
            chart_type,
            codename: None,
            filename: filename.into(),
            filename_night: None,
            georef: None,
            views: None,
            procs: Vec::new(),
            custom_loader: None,
        }
    }

    /// Attach a custom in-memory loader callback (see [`CustomLoader`]),
    /// bypassing provider fetch and disk I/O for this chart entirely.
    pub fn with_custom_loader(mut self, loader: CustomLoader) -> Self {
        self.custom_loader = Some(loader);
        self
    }

    /// Whether the provider supplies a distinct artifact for night mode.
    pub fn has_distinct_night_file(&self) -> bool {
        self.filename_night.is_some()
    }

    pub fn is_pdf(&self) -> bool {
        self.filename
            .rsplit('.')
            .next()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
    }

    /// Set procs, silently truncating to [`MAX_PROCS`] entries.
    pub fn with_procs(mut self, mut procs: Vec<String>) -> Self {
        procs.truncate(MAX_PROCS);
        self.procs = procs;
        self
    }
}
