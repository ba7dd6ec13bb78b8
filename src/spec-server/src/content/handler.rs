use crate::cache::ContentCache;
use crate::content::render::{
    self, index_template_source, INDEX_TEMPLATE_PATH, SPEC_DOCUMENT_PATH,
};
use crate::content::types::{self, resolve_content_type};
use crate::error::ContentError;
use crate::metrics::MetricsSink;
use crate::upstream::{FetchResult, UpstreamClient};
use crate::versions::{VersionMap, VersionResolver};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Reserved first path segment for local static assets
pub const STATIC_PREFIX: &str = "lib";

pub const HEALTH_PATH: &str = "health";
pub const FAVICON_PATH: &str = "favicon.ico";

/// Per-request payload, dropped once the response is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Artifact(ResolvedArtifact),
    /// 302 to the given location
    Redirect(String),
    /// Status with no body
    Empty(StatusCode),
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Reply::Artifact(artifact) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, artifact.content_type)],
                artifact.body,
            )
                .into_response(),
            Reply::Redirect(location) => {
                (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
            }
            Reply::Empty(status) => status.into_response(),
        }
    }
}

/// Serve the index template and/or spec document from disk.
#[derive(Debug, Clone, Default)]
pub struct LocalOverrides {
    pub html: bool,
    pub swagger: bool,
    pub root: PathBuf,
}

/// Resolves `(version, file)` to a reply.
pub struct ContentHandler {
    resolver: Arc<VersionResolver>,
    upstream: Arc<UpstreamClient>,
    files: ContentCache<(String, String), FetchResult>,
    local: LocalOverrides,
    static_dir: Option<PathBuf>,
    fallback_ref: String,
    metrics: Arc<dyn MetricsSink>,
}

impl ContentHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<VersionResolver>,
        upstream: Arc<UpstreamClient>,
        files_capacity: usize,
        files_ttl: Duration,
        local: LocalOverrides,
        static_dir: Option<PathBuf>,
        fallback_ref: String,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            resolver,
            upstream,
            files: ContentCache::new(files_capacity, files_ttl),
            local,
            static_dir,
            fallback_ref,
            metrics,
        }
    }

    pub fn resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Handle `GET /{version}/{file}`.
    pub async fn handle_get(&self, version: &str, file: &str) -> Result<Reply, ContentError> {
        // Browsers ask for this on every page; skip the upstream round trip
        if version == FAVICON_PATH {
            return Ok(Reply::Empty(StatusCode::NOT_FOUND));
        }

        if version == STATIC_PREFIX {
            if let Some(dir) = &self.static_dir {
                self.metrics.request("GET", Some("static"), None);
                return self.serve_static(dir, file).await;
            }
        }

        let map = self.resolver.resolve().await?;

        if version == HEALTH_PATH {
            return health(&map);
        }

        if version.is_empty() {
            let latest = map.latest_stable()?;
            tracing::debug!(latest = %latest, "Redirecting to latest stable version");
            return Ok(Reply::Redirect(format!("/{}", latest)));
        }

        if file.is_empty() {
            return Ok(Reply::Redirect(format!("/{}/index.html", version)));
        }

        let Some(tag) = map.get(version) else {
            // Not a tag: treat `{version}/{file}` as a path on the fallback branch
            self.metrics.request("GET", Some("fallback"), Some(version));
            let path = format!("{}/{}", version, file);
            return self.serve_raw(&self.fallback_ref, &path, version).await;
        };

        match file {
            "index.html" => {
                self.metrics.request("GET", Some("index.html"), Some(version));
                self.serve_index(&map, version).await
            }
            "swagger.yaml" => {
                self.metrics.request("GET", Some("swagger.yaml"), Some(version));
                self.serve_spec(&tag.commit_id, version).await
            }
            _ => {
                self.metrics
                    .request("GET", Some(types::file_extension(file)), Some(version));
                self.serve_raw(&tag.commit_id, file, version).await
            }
        }
    }

    /// Handle `HEAD *`: fixed reply, no routing.
    pub fn handle_head(&self) -> Response {
        self.metrics.request("HEAD", None, None);
        (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")]).into_response()
    }

    async fn serve_index(&self, map: &VersionMap, version: &str) -> Result<Reply, ContentError> {
        let source = index_template_source(map, version)
            .ok_or_else(|| ContentError::not_found("index.html"))?;
        if source.name != version {
            tracing::debug!(
                version = %version,
                source_tag = %source.name,
                "Rendering index from compatibility source tag"
            );
        }

        let template = self
            .load_source(self.local.html, &source.commit_id, INDEX_TEMPLATE_PATH, version, "index.html")
            .await?;
        let body = render::render_index(&template, map, version)?;
        Ok(artifact(types::HTML, body))
    }

    async fn serve_spec(&self, commit_id: &str, version: &str) -> Result<Reply, ContentError> {
        let document = self
            .load_source(self.local.swagger, commit_id, SPEC_DOCUMENT_PATH, version, "swagger.yaml")
            .await?;
        Ok(artifact(types::YAML, render::render_spec(&document, version)))
    }

    async fn serve_raw(&self, reference: &str, path: &str, version: &str) -> Result<Reply, ContentError> {
        if !is_safe_relative(path) {
            tracing::warn!(reference = %reference, path = %path, "Rejected upstream file path");
            return Err(ContentError::not_found(path));
        }
        let result = self.fetch_content(reference, path, version, path).await?;
        let content_type = resolve_content_type(path, result.content_type());
        Ok(artifact(&content_type, result.body))
    }

    async fn serve_static(&self, dir: &Path, file: &str) -> Result<Reply, ContentError> {
        if !is_safe_relative(file) {
            tracing::warn!(file = %file, "Rejected static asset path");
            return Err(ContentError::not_found(file));
        }
        let path = dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(artifact(&resolve_content_type(file, None), Bytes::from(body))),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Static asset not readable");
                Err(ContentError::not_found(file))
            }
        }
    }

    /// Read a template either from the local override root or from upstream.
    async fn load_source(
        &self,
        local: bool,
        commit_id: &str,
        path: &str,
        version: &str,
        requested: &str,
    ) -> Result<Bytes, ContentError> {
        if local {
            let local_path = self.local.root.join(path);
            tracing::info!(path = %local_path.display(), "Serving local file");
            return tokio::fs::read(&local_path)
                .await
                .map(Bytes::from)
                .map_err(|e| {
                    tracing::warn!(path = %local_path.display(), error = %e, "Local file not readable");
                    ContentError::not_found(requested)
                });
        }
        let result = self.fetch_content(commit_id, path, version, requested).await?;
        Ok(result.body)
    }

    /// Cached fetch that maps non-success statuses to errors.
    async fn fetch_content(
        &self,
        reference: &str,
        path: &str,
        version: &str,
        requested: &str,
    ) -> Result<FetchResult, ContentError> {
        let result = self.fetch_file(reference, path, version).await;
        if result.is_success() {
            return Ok(result);
        }
        if result.status == StatusCode::NOT_FOUND {
            let detail = format!("{}: {}", result.body_text().trim(), requested);
            return Err(ContentError::NotFound {
                file: requested.to_string(),
                detail,
            });
        }
        Err(ContentError::Upstream {
            status: result.status,
            body: result.body_text(),
        })
    }

    /// Raw file at `reference`, from the file cache when present. Only
    /// successful fetches are stored.
    pub async fn fetch_file(&self, reference: &str, path: &str, version: &str) -> FetchResult {
        let key = (reference.to_string(), path.to_string());
        if let Some(hit) = self.files.get(&key) {
            tracing::debug!(reference = %reference, path = %path, "File cache HIT");
            self.metrics.upstream_resource(path, version, true, None);
            return hit;
        }

        tracing::debug!(reference = %reference, path = %path, "File cache MISS");
        let result = self.upstream.fetch_raw_file(reference, path, version).await;
        if result.is_success() {
            self.files.set(key, result.clone());
        }
        result
    }
}

fn artifact(content_type: &str, body: Bytes) -> Reply {
    Reply::Artifact(ResolvedArtifact {
        content_type: content_type.to_string(),
        body,
    })
}

fn health(map: &VersionMap) -> Result<Reply, ContentError> {
    let snapshot = map
        .health_snapshot()
        .ok_or_else(|| ContentError::Unexpected("upstream returned an empty tag list".to_string()))?;
    let body = serde_json::to_vec_pretty(&snapshot)
        .map_err(|e| ContentError::Unexpected(format!("Failed to encode health payload: {}", e)))?;
    Ok(artifact(types::JSON, Bytes::from(body)))
}

/// Only plain relative segments. URL parsing treats `%2e` as `.` and `\` as
/// `/`, so both are checked on the raw string.
pub fn is_safe_relative(file: &str) -> bool {
    !file.is_empty()
        && !file.starts_with('/')
        && !file.contains('\\')
        && file.split('/').all(|segment| {
            let segment = segment.to_ascii_lowercase().replace("%2e", ".");
            segment != "." && segment != ".."
        })
}
