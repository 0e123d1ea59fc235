//! SODA API client.

use std::path::{Path, PathBuf};

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info};

use crate::ingest::raw::RawRow;

use super::error::SocrataError;

/// ACT Government open-data portal.
pub const DEFAULT_DOMAIN: &str = "www.data.act.gov.au";

/// Row limit requested per dataset.
pub const DEFAULT_ROW_LIMIT: u32 = 500_000;

/// A dataset to download and the file stem it is saved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSpec {
    pub name: &'static str,
    pub id: &'static str,
}

/// Datasets the analysis reads.
pub const KNOWN_DATASETS: [DatasetSpec; 2] = [
    DatasetSpec {
        name: "school_bus_services",
        id: "p4rg-3jx2",
    },
    DatasetSpec {
        name: "students_distance_sa1",
        id: "3fd4-5fkk",
    },
];

/// Configuration for the portal client.
#[derive(Debug, Clone)]
pub struct SocrataClientConfig {
    /// Optional app token sent as `X-App-Token`; raises rate limits
    pub app_token: Option<String>,
    /// Base URL of the portal
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// `$limit` sent with every request
    pub row_limit: u32,
}

impl SocrataClientConfig {
    /// Create a config for the default portal.
    pub fn new(app_token: Option<String>) -> Self {
        Self {
            app_token,
            base_url: format!("https://{DEFAULT_DOMAIN}"),
            timeout_secs: 60,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Read the app token from `SOCRATA_APP_TOKEN`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let token = lookup("SOCRATA_APP_TOKEN").filter(|t| !t.trim().is_empty());
        Self::new(token)
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_row_limit(mut self, limit: u32) -> Self {
        self.row_limit = limit;
        self
    }
}

/// Client for the portal's SODA resource endpoints.
#[derive(Debug, Clone)]
pub struct SocrataClient {
    http: reqwest::Client,
    base_url: String,
    row_limit: u32,
}

impl SocrataClient {
    pub fn new(config: SocrataClientConfig) -> Result<Self, SocrataError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.app_token {
            let value = HeaderValue::from_str(token).map_err(|_| SocrataError::Api {
                status: 0,
                message: "Invalid app token format".to_string(),
            })?;
            headers.insert(HeaderName::from_static("x-app-token"), value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            row_limit: config.row_limit,
        })
    }

    /// Resource URL of a dataset, including the row limit.
    pub fn dataset_url(&self, dataset_id: &str) -> String {
        format!(
            "{}/resource/{}.json?$limit={}",
            self.base_url, dataset_id, self.row_limit
        )
    }

    /// Fetch every row of a dataset.
    pub async fn fetch_rows(&self, dataset_id: &str) -> Result<Vec<RawRow>, SocrataError> {
        let url = self.dataset_url(dataset_id);
        debug!(%url, "fetching dataset");

        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SocrataError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SocrataError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SocrataError::Json {
            message: e.to_string(),
        })
    }
}

/// Write downloaded rows to `<raw_dir>/<name>.json`.
///
/// Creates `raw_dir` if needed.
pub async fn save_rows(raw_dir: &Path, name: &str, rows: &[RawRow]) -> Result<PathBuf, SocrataError> {
    let save_error = |message: String| SocrataError::Save {
        dataset: name.to_string(),
        message,
    };

    tokio::fs::create_dir_all(raw_dir)
        .await
        .map_err(|e| save_error(format!("failed to create {}: {e}", raw_dir.display())))?;

    let path = raw_dir.join(format!("{name}.json"));
    let json = serde_json::to_vec(rows).map_err(|e| save_error(e.to_string()))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| save_error(format!("failed to write {}: {e}", path.display())))?;
    Ok(path)
}

/// Download every dataset in [`KNOWN_DATASETS`] into `raw_dir`.
pub async fn download_all(client: &SocrataClient, raw_dir: &Path) -> Result<Vec<PathBuf>, SocrataError> {
    let mut written = Vec::with_capacity(KNOWN_DATASETS.len());
    for dataset in KNOWN_DATASETS {
        let rows = client.fetch_rows(dataset.id).await?;
        let path = save_rows(raw_dir, dataset.name, &rows).await?;
        info!(
            dataset = dataset.name,
            rows = rows.len(),
            path = %path.display(),
            "downloaded dataset"
        );
        written.push(path);
    }
    Ok(written)
}
