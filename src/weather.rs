//! Weather sub-pipeline: async METAR/TAF retrieval with age-based
//! refresh and negative caching.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

/// METAR is considered fresh for 60s.
pub const METAR_MAX_AGE: chrono::Duration = chrono::Duration::seconds(60);
/// TAF is considered fresh for 300s.
pub const TAF_MAX_AGE: chrono::Duration = chrono::Duration::seconds(300);
/// Spacing between retries after a failed refresh.
pub const RETRY_SPACING: chrono::Duration = chrono::Duration::seconds(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Metar,
    Taf,
}

impl WeatherKind {
    pub fn max_age(self) -> chrono::Duration {
        match self {
            WeatherKind::Metar => METAR_MAX_AGE,
            WeatherKind::Taf => TAF_MAX_AGE,
        }
    }
}

/// Minimal wire shape for the aviationweather.gov-style XML document: a
/// `<response><data><METAR><raw_text>...</raw_text></METAR></data></response>`
/// (or `<TAF>`) wrapper. Only the field the core needs is modeled.
#[derive(Debug, Deserialize)]
struct Response {
    data: Data,
}

#[derive(Debug, Deserialize)]
struct Data {
    #[serde(rename = "METAR", default)]
    metar: Vec<Report>,
    #[serde(rename = "TAF", default)]
    taf: Vec<Report>,
}

#[derive(Debug, Deserialize)]
struct Report {
    raw_text: String,
}

/// Download and extract the raw-text report for `icao`. Returns `None` if
/// the endpoint has no current report for this station (not an error).
pub async fn fetch_report(
    client: &reqwest::Client,
    base_url: &str,
    icao: &str,
    kind: WeatherKind,
) -> anyhow::Result<Option<String>> {
    let data_type = match kind {
        WeatherKind::Metar => "metars",
        WeatherKind::Taf => "tafs",
    };
    let url = format!("{base_url}/cgi-bin/xml/dataserver.php");

    let resp = client
        .get(&url)
        .query(&[
            ("dataSource", data_type),
            ("requestType", "retrieve"),
            ("format", "xml"),
            ("stationString", icao),
            ("hoursBeforeNow", "3"),
        ])
        .timeout(std::time::Duration::from_secs(15))
        .send()
        .await?;

    let body = resp.text().await?;
    let parsed: Response = match quick_xml::de::from_str(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(icao, error = %e, "weather response did not parse as expected XML");
            return Ok(None);
        }
    };

    let report = match kind {
        WeatherKind::Metar => parsed.data.metar.into_iter().next(),
        WeatherKind::Taf => parsed.data.taf.into_iter().next(),
    };
    Ok(report.map(|r| r.raw_text))
}

/// Whether a cached value at `refreshed_at` is still fresh enough to
/// return without triggering a refresh.
pub fn is_fresh(refreshed_at: DateTime<Utc>, now: DateTime<Utc>, kind: WeatherKind) -> bool {
    now - refreshed_at < kind.max_age()
}
