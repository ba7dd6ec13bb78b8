use crate::config::Config;
use crate::content::{ContentHandler, LocalOverrides};
use crate::error::{error_page, Result, SpecServerError};
use crate::metrics::{metrics_from_config, MetricsSink};
use crate::upstream::UpstreamClient;
use crate::versions::VersionResolver;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use regex::Regex;
use std::net::SocketAddr;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::error;

static REQUEST_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([0-9a-zA-Z\-.]+)/*(.*)$").expect("request path pattern is valid")
});

#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<ContentHandler>,
    pub metrics: Arc<dyn MetricsSink>,
}

impl AppState {
    /// Wire resolver, upstream client and handler from configuration.
    pub fn from_config(config: &Config, metrics: Arc<dyn MetricsSink>) -> Result<Self> {
        config.validate()?;

        let upstream = Arc::new(UpstreamClient::new(&config.upstream, metrics.clone())?);
        tracing::info!(
            organization = %config.upstream.organization,
            project = %config.upstream.project,
            tags_url = %upstream.tags_url(),
            "Configured upstream client"
        );

        let resolver = Arc::new(VersionResolver::new(
            upstream.clone(),
            config.cache.versions_capacity,
            Duration::from_secs(config.cache.versions_ttl_secs),
            config.content.hide_alpha,
        ));

        let local = LocalOverrides {
            html: config.content.local_html_file,
            swagger: config.content.local_swagger_file,
            root: config.content.local_root.clone(),
        };
        tracing::debug!(
            local_html_file = local.html,
            local_swagger_file = local.swagger,
            local_root = %local.root.display(),
            "Local override settings"
        );

        let handler = Arc::new(ContentHandler::new(
            resolver,
            upstream,
            config.cache.files_capacity,
            Duration::from_secs(config.cache.files_ttl_secs),
            local,
            config.content.static_dir.clone(),
            config.upstream.fallback_ref.clone(),
            metrics.clone(),
        ));

        Ok(Self { handler, metrics })
    }
}

/// Split a request path into `(version, file)`. A path that does not match
/// the grammar yields two empty strings.
pub fn parse_request_path(path: &str) -> (String, String) {
    match REQUEST_PATH.captures(path) {
        Some(caps) => (
            caps.get(1).map_or("", |m| m.as_str()).to_string(),
            caps.get(2).map_or("", |m| m.as_str()).to_string(),
        ),
        None => (String::new(), String::new()),
    }
}

async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    match method {
        Method::GET => {
            let path = uri.path();
            tracing::info!("GET {}", path);
            let (version, file) = parse_request_path(path);
            tracing::debug!(version = %version, file = %file, "Parsed request path");
            match state.handler.handle_get(&version, &file).await {
                Ok(reply) => reply.into_response(),
                Err(e) => e.into_response(),
            }
        }
        Method::HEAD => state.handler.handle_head(),
        _ => error_page(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new().fallback(dispatch).with_state(app_state)
}

/// A server that has bound its listener and is accepting connections.
pub struct RunningServer {
    pub local_addr: SocketAddr,
    pub handle: tokio::task::JoinHandle<()>,
    pub metrics: Arc<dyn MetricsSink>,
}

pub async fn start_server(config: Config) -> Result<RunningServer> {
    let metrics = metrics_from_config(&config.metrics);
    start_server_with_metrics(config, metrics).await
}

/// Like [`start_server`] with an explicit metrics sink.
pub async fn start_server_with_metrics(
    config: Config,
    metrics: Arc<dyn MetricsSink>,
) -> Result<RunningServer> {
    let app_state = AppState::from_config(&config, metrics.clone())?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        SpecServerError::Config(format!("Failed to bind to {}: {}", addr, e))
    })?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Successfully bound HTTP listener to {}", local_addr);

    let app = build_router(app_state);
    let handle = tokio::spawn(async move {
        tracing::info!("HTTP server is now listening and ready to accept connections");
        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error after startup: {}", e);
        } else {
            tracing::info!("HTTP server stopped");
        }
    });

    Ok(RunningServer {
        local_addr,
        handle,
        metrics,
    })
}
