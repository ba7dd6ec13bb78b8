use crate::config::UpstreamConfig;
use crate::error::{Result, SpecServerError};
use crate::metrics::MetricsSink;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = concat!("otm-spec-server/", env!("CARGO_PKG_VERSION"));

/// Normalized outcome of any upstream call.
///
/// Transport failures (DNS, timeout, reset) are folded into a 502/504 status
/// so callers branch on the status alone.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: StatusCode,
    pub body: Bytes,
    pub headers: HeaderMap,
}

impl FetchResult {
    pub fn new(status: StatusCode, body: impl Into<Bytes>, headers: HeaderMap) -> Self {
        Self {
            status,
            body: body.into(),
            headers,
        }
    }

    fn transport_failure(error: &reqwest::Error) -> Self {
        let status = if error.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self {
            status,
            body: Bytes::from(format!("Failed to reach upstream: {}", error)),
            headers: HeaderMap::new(),
        }
    }

    /// Upstream counts 200 and 201 as usable content.
    pub fn is_success(&self) -> bool {
        matches!(self.status, StatusCode::OK | StatusCode::CREATED)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Body as text, lossy, for error messages.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP client for the tag API and the raw-content CDN
pub struct UpstreamClient {
    client: Client,
    api_base_url: String,
    raw_base_url: String,
    organization: String,
    project: String,
    token: Option<String>,
    metrics: Arc<dyn MetricsSink>,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(SpecServerError::Http)?;

        if config.token.is_none() {
            tracing::warn!(
                "No upstream token configured; tag requests are sent unauthenticated and may be rate limited"
            );
        }

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            raw_base_url: config.raw_base_url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
            project: config.project.clone(),
            token: config.token.clone(),
            metrics,
        })
    }

    pub fn tags_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/tags",
            self.api_base_url, self.organization, self.project
        )
    }

    pub fn raw_file_url(&self, reference: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base_url,
            self.organization,
            self.project,
            reference,
            path.trim_start_matches('/')
        )
    }

    /// GET the tag list. No retries.
    pub async fn fetch_version_tags(&self) -> FetchResult {
        let url = self.tags_url();
        tracing::debug!(url = %url, "Getting versions from upstream");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("token {}", token)) {
                Ok(value) => request = request.header(header::AUTHORIZATION, value),
                Err(_) => tracing::warn!("Upstream token is not a valid header value, sending without it"),
            }
        }

        let result = self.execute(request, &url).await;
        self.metrics
            .upstream_resource("tags", "versions", false, Some(result.status.as_u16()));
        result
    }

    /// GET `{reference}/{path}` from the raw-content CDN.
    pub async fn fetch_raw_file(&self, reference: &str, path: &str, version: &str) -> FetchResult {
        let url = self.raw_file_url(reference, path);
        tracing::debug!(url = %url, reference = %reference, path = %path, "Getting file from upstream");

        let result = self.execute(self.client.get(&url), &url).await;
        self.metrics
            .upstream_resource(path, version, false, Some(result.status.as_u16()));
        result
    }

    async fn execute(&self, request: reqwest::RequestBuilder, url: &str) -> FetchResult {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Upstream request failed");
                return FetchResult::transport_failure(&e);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(body) => {
                tracing::debug!(url = %url, status = %status, size = body.len(), "Upstream responded");
                FetchResult {
                    status,
                    body,
                    headers,
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to read upstream response body");
                FetchResult::transport_failure(&e)
            }
        }
    }
}
