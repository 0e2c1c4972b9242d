//! HTTP client for the random-profile REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use super::MatchSource;
use crate::error::{SyncError, SyncResult};
use crate::models::{MatchRecord, RemotePage};

// ============================================================================
// Constants
// ============================================================================

/// Default service root; the endpoint lives at `<base>/api/`.
pub const DEFAULT_BASE_URL: &str = "https://randomuser.me";

/// HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API client for the profile service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RandomUserClient {
    client: Client,
    base_url: String,
    seed: Option<String>,
}

impl RandomUserClient {
    /// Create a new API client against `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidRequest(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            seed: None,
        })
    }

    /// Pin the remote dataset so consecutive pages don't overlap.
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }

    /// Build `<base>/api/?page=<n>&results=<size>[&seed=<seed>]`.
    pub fn page_url(&self, page: u32, page_size: u32) -> SyncResult<Url> {
        let base = format!("{}/api/", self.base_url.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| SyncError::InvalidRequest(format!("{}: {}", base, e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            query.append_pair("results", &page_size.to_string());
            if let Some(ref seed) = self.seed {
                query.append_pair("seed", seed);
            }
        }
        Ok(url)
    }

    /// Decode a response body into canonical records.
    pub fn decode_page(body: &str) -> SyncResult<Vec<MatchRecord>> {
        let page: RemotePage = serde_json::from_str(body).map_err(|e| {
            warn!(error = %e, "Failed to decode profile page");
            SyncError::DecodingError
        })?;

        if let Some(ref info) = page.info {
            debug!(
                page = ?info.page,
                count = ?info.count,
                seed = ?info.seed,
                version = ?info.version,
                "Decoded profile page"
            );
        }
        Ok(page.to_match_records())
    }
}

#[async_trait]
impl MatchSource for RandomUserClient {
    async fn fetch_page(&self, page: u32, page_size: u32) -> SyncResult<Vec<MatchRecord>> {
        let url = self.page_url(page, page_size)?;
        debug!(url = %url, "Fetching profile page");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                warn!(page = page, error = %e, "Profile request failed");
                SyncError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %SyncError::truncate_body(&body),
                "Profile service returned an error"
            );
            return Err(SyncError::from_status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            warn!(page = page, error = %e, "Failed to read profile response body");
            SyncError::NoResponse
        })?;

        Self::decode_page(&body)
    }
}
