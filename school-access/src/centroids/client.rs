//! ArcGIS REST client for SA1 centroids.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::ingest::CENTROIDS_FILE;

use super::error::CentroidError;

/// SA1 point layer of the ASGS 2021 map service.
pub const DEFAULT_QUERY_URL: &str =
    "https://geo.abs.gov.au/arcgis/rest/services/ASGS2021/SA1/MapServer/2/query";

/// ASGS state code of the ACT.
pub const ACT_STATE_CODE: &str = "8";

/// Largest page the service returns.
pub const DEFAULT_PAGE_SIZE: u32 = 2000;

/// Configuration for the centroid client.
#[derive(Debug, Clone)]
pub struct CentroidClientConfig {
    /// Layer query endpoint
    pub query_url: String,
    /// Only zones in this state are requested
    pub state_code: String,
    /// `resultRecordCount` per request
    pub page_size: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Pause between pages
    pub page_delay: Duration,
}

impl Default for CentroidClientConfig {
    fn default() -> Self {
        Self {
            query_url: DEFAULT_QUERY_URL.to_string(),
            state_code: ACT_STATE_CODE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 120,
            page_delay: Duration::from_millis(200),
        }
    }
}

impl CentroidClientConfig {
    /// Set a custom query URL (for testing).
    pub fn with_query_url(mut self, url: impl Into<String>) -> Self {
        self.query_url = url.into();
        self
    }

    pub fn with_state_code(mut self, code: impl Into<String>) -> Self {
        self.state_code = code.into();
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// One zone centroid, serialized as a row of the centroid CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CentroidPoint {
    #[serde(rename = "sa1_code_2021")]
    pub code: String,
    pub lon: f64,
    pub lat: f64,
}

/// Centroids parsed from one page of features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CentroidPage {
    /// Features on the page, usable or not.
    pub features: usize,
    pub points: Vec<CentroidPoint>,
    /// Features without a code or a readable point.
    pub skipped: usize,
}

fn code(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn xy(pair: &[Value]) -> Option<(f64, f64)> {
    Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
}

/// `(lon, lat)` of a Point, the first member of a MultiPoint, or an ArcGIS
/// `{x, y}` geometry.
fn geometry_xy(geometry: &Value) -> Option<(f64, f64)> {
    match geometry.get("coordinates").and_then(Value::as_array) {
        Some(items) => match items.first()?.as_array() {
            Some(first) => xy(first),
            None => xy(items),
        },
        None => Some((geometry.get("x")?.as_f64()?, geometry.get("y")?.as_f64()?)),
    }
}

fn feature_point(feature: &Value) -> Option<CentroidPoint> {
    let code = code(feature.get("properties")?.get("sa1_code_2021")?)?;
    let (lon, lat) = geometry_xy(feature.get("geometry")?)?;
    Some(CentroidPoint { code, lon, lat })
}

/// Parse one GeoJSON query response.
///
/// ArcGIS reports failures as a 200 response with an `error` object; those
/// become [`CentroidError::Api`]. A body without `features` is an empty page.
pub fn parse_page(body: &Value) -> Result<CentroidPage, CentroidError> {
    if let Some(error) = body.get("error") {
        return Err(CentroidError::Api {
            status: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    let features = body
        .get("features")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let points: Vec<CentroidPoint> = features.iter().filter_map(feature_point).collect();
    Ok(CentroidPage {
        features: features.len(),
        skipped: features.len() - points.len(),
        points,
    })
}

/// Client for the centroid layer's query endpoint.
#[derive(Debug, Clone)]
pub struct CentroidClient {
    http: reqwest::Client,
    config: CentroidClientConfig,
}

impl CentroidClient {
    pub fn new(config: CentroidClientConfig) -> Result<Self, CentroidError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// Query string of the page starting at `offset`.
    pub fn query_params(&self, offset: u32) -> Vec<(&'static str, String)> {
        vec![
            ("where", format!("state_code_2021='{}'", self.config.state_code)),
            ("outFields", "sa1_code_2021,state_code_2021".to_string()),
            ("returnGeometry", "true".to_string()),
            ("outSR", "4326".to_string()),
            ("f", "geojson".to_string()),
            ("resultRecordCount", self.config.page_size.to_string()),
            ("resultOffset", offset.to_string()),
        ]
    }

    async fn fetch_page(&self, offset: u32) -> Result<Value, CentroidError> {
        debug!(url = %self.config.query_url, offset, "fetching centroid page");
        let response = self
            .http
            .get(&self.config.query_url)
            .query(&self.query_params(offset))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CentroidError::Api {
                status: i64::from(status.as_u16()),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CentroidError::Json {
            message: format!(
                "{e}; body starts: {}",
                body.chars().take(300).collect::<String>()
            ),
        })
    }

    /// Fetch every centroid, page by page.
    ///
    /// Paging stops at the first empty or short page.
    pub async fn fetch_all(&self) -> Result<Vec<CentroidPoint>, CentroidError> {
        let mut points = Vec::new();
        let mut skipped = 0usize;
        let mut offset = 0u32;

        loop {
            let page = parse_page(&self.fetch_page(offset).await?)?;
            if page.features == 0 {
                break;
            }
            skipped += page.skipped;
            points.extend(page.points);
            if page.features < self.config.page_size as usize {
                break;
            }
            offset += page.features as u32;
            tokio::time::sleep(self.config.page_delay).await;
        }

        if skipped > 0 {
            warn!(features = skipped, "skipped centroid features without code or point");
        }
        Ok(points)
    }
}

/// Render centroids as CSV: `sa1_code_2021,lon,lat`.
pub fn centroids_csv(points: &[CentroidPoint]) -> Result<Vec<u8>, CentroidError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for point in points {
        writer.serialize(point)?;
    }
    writer
        .into_inner()
        .map_err(|e| CentroidError::Csv(e.into_error().into()))
}

/// Write centroids to `path`, creating its directory if needed.
pub async fn save_centroids(path: &Path, points: &[CentroidPoint]) -> Result<(), CentroidError> {
    let save_error = |message: String| CentroidError::Save {
        path: path.to_path_buf(),
        message,
    };

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| save_error(e.to_string()))?;
    }
    let bytes = centroids_csv(points)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| save_error(e.to_string()))
}

/// Download every centroid into `<data_dir>/manual/sa1_centroids.csv`.
pub async fn download_centroids(
    client: &CentroidClient,
    data_dir: &Path,
) -> Result<PathBuf, CentroidError> {
    let points = client.fetch_all().await?;
    if points.is_empty() {
        return Err(CentroidError::NoFeatures);
    }

    let path = data_dir.join(CENTROIDS_FILE);
    save_centroids(&path, &points).await?;
    info!(zones = points.len(), path = %path.display(), "downloaded zone centroids");
    Ok(path)
}
