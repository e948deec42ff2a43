//! ClinicalTrials.gov v2 API client
//!
//! This module performs the raw HTTP calls against the registry and maps
//! transport failures and non-success statuses onto [`RegistryError`].
//! Pacing and caching live one layer up, in [`crate::service`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{error, info, warn};

use super::query::detail_query_params;
use super::{QueryParams, StudiesPage, Study};

/// Base URL for the studies endpoint of the API
pub const CLINICAL_TRIALS_BASE_URL: &str = "https://clinicaltrials.gov/api/v2/studies";

/// Overall timeout for a single outbound call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream error bodies are cut to this many bytes
const MAX_ERROR_BODY_BYTES: usize = 512;

/// Value of the `api` field on outbound call events
const API_NAME: &str = "clinicaltrials.gov";

/// Errors that can occur when talking to the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached, or the call timed out
    #[error("Failed to reach registry: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// The registry answered HTTP 429
    #[error("Rate limit exceeded: HTTP 429")]
    RateLimited,

    /// The registry answered a non-success status on a search
    #[error("Registry returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The registry's payload did not match the expected shape
    #[error("Failed to decode registry response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A single-study lookup failed, whatever the underlying status
    #[error("Trial not found: {0}")]
    NotFound(String),

    /// The request was rejected before reaching the registry
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A source of registry study documents
///
/// Implemented by [`ClinicalTrialsClient`]; the orchestrator only depends on
/// this trait.
#[async_trait]
pub trait StudySource: Send + Sync {
    /// Runs one search page against the registry
    async fn search_studies(&self, params: &QueryParams) -> Result<StudiesPage, RegistryError>;

    /// Fetches a single study by NCT identifier
    async fn fetch_study(&self, nct_id: &str) -> Result<Study, RegistryError>;
}

/// Status and body of a completed HTTP exchange
struct RawResponse {
    url: String,
    status: StatusCode,
    body: String,
    duration_ms: u64,
}

/// Client for the ClinicalTrials.gov v2 API
#[derive(Debug, Clone)]
pub struct ClinicalTrialsClient {
    http_client: Client,
    base_url: String,
}

impl ClinicalTrialsClient {
    /// Creates a client for the public registry with the default timeout
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_base_url(CLINICAL_TRIALS_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a client for a custom studies endpoint (mirrors, tests)
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RegistryError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds `<base_url>/<nct_id>` with the id encoded as one path segment
    fn study_url(&self, nct_id: &str) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            RegistryError::InvalidRequest(format!("Invalid registry URL {}: {}", self.base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                RegistryError::InvalidRequest(format!(
                    "Registry URL cannot take a path: {}",
                    self.base_url
                ))
            })?
            .push(nct_id);
        Ok(url)
    }

    /// Sends a GET and reads the whole body
    ///
    /// Only transport failures are errors here; status handling is left to
    /// the caller.
    async fn get(&self, url: &str, params: &QueryParams) -> Result<RawResponse, RegistryError> {
        let start = Instant::now();
        let request = self
            .http_client
            .get(url)
            .query(params.as_slice())
            .build()?;
        let url = request.url().to_string();

        let result = match self.http_client.execute(request).await {
            Ok(response) => {
                let status = response.status();
                response.text().await.map(|body| (status, body))
            }
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok((status, body)) => Ok(RawResponse {
                url,
                status,
                body,
                duration_ms,
            }),
            Err(e) => {
                error!(
                    api = API_NAME,
                    method = "GET",
                    url = %url,
                    duration_ms,
                    error = %e,
                    "External API call failed"
                );
                Err(RegistryError::Unavailable(e))
            }
        }
    }
}

#[async_trait]
impl StudySource for ClinicalTrialsClient {
    async fn search_studies(&self, params: &QueryParams) -> Result<StudiesPage, RegistryError> {
        let raw = self.get(&self.base_url, params).await?;

        if raw.status == StatusCode::TOO_MANY_REQUESTS {
            error!(
                api = API_NAME,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                "Rate limit exceeded from external API"
            );
            return Err(RegistryError::RateLimited);
        }

        if !raw.status.is_success() {
            let body = truncate_body(&raw.body);
            error!(
                api = API_NAME,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                response_body = %body,
                "External API returned error status"
            );
            return Err(RegistryError::Upstream {
                status: raw.status.as_u16(),
                body,
            });
        }

        let page: StudiesPage = serde_json::from_str(&raw.body).map_err(|e| {
            error!(
                api = API_NAME,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                error = %e,
                "Failed to decode external API response"
            );
            RegistryError::Decode(e)
        })?;

        info!(
            api = API_NAME,
            url = %raw.url,
            status_code = raw.status.as_u16(),
            duration_ms = raw.duration_ms,
            total_count = page.total_count,
            studies_returned = page.studies.len(),
            "External API call completed"
        );

        Ok(page)
    }

    async fn fetch_study(&self, nct_id: &str) -> Result<Study, RegistryError> {
        let url = self.study_url(nct_id)?;
        let raw = self.get(url.as_str(), &detail_query_params()).await?;

        if raw.status == StatusCode::TOO_MANY_REQUESTS {
            error!(
                api = API_NAME,
                nct_id,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                "Rate limit exceeded from external API"
            );
            return Err(RegistryError::RateLimited);
        }

        // Outages and genuinely missing studies are not told apart here
        if !raw.status.is_success() {
            warn!(
                api = API_NAME,
                nct_id,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                "Trial not found in external API"
            );
            return Err(RegistryError::NotFound(nct_id.to_string()));
        }

        // The single-study endpoint returns the document unwrapped
        let study: Study = serde_json::from_str(&raw.body).map_err(|e| {
            error!(
                api = API_NAME,
                nct_id,
                url = %raw.url,
                status_code = raw.status.as_u16(),
                duration_ms = raw.duration_ms,
                error = %e,
                "Failed to decode external API response"
            );
            RegistryError::Decode(e)
        })?;

        info!(
            api = API_NAME,
            nct_id,
            url = %raw.url,
            status_code = raw.status.as_u16(),
            duration_ms = raw.duration_ms,
            "External API call completed"
        );

        Ok(study)
    }
}

/// Cuts an error body to [`MAX_ERROR_BODY_BYTES`] on a UTF-8 boundary
fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.len() <= MAX_ERROR_BODY_BYTES {
        return body.to_string();
    }

    let mut boundary = MAX_ERROR_BODY_BYTES;
    while boundary > 0 && !body.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...", &body[..boundary])
}
