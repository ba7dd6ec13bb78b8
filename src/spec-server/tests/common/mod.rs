//! Shared helpers: an in-process upstream that serves both the tag API and
//! the raw-content CDN, plus config/client builders.

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use otm_spec_server::Config;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ORG: &str = "opentripmodel";
pub const PROJECT: &str = "opentripmodel";

/// Newest first, like the upstream tag API.
pub const DEFAULT_TAGS: &[(&str, &str)] = &[
    ("5.0.0-rc1", "sha-500rc1"),
    ("4.2.0", "sha-420"),
    ("4.2.0-a1", "sha-420a1"),
    ("4.1.2", "sha-412"),
    ("4.1.1", "sha-411"),
    ("4.1.0", "sha-410"),
    ("4.0.1", "sha-401"),
    ("4.0.0", "sha-400"),
    ("4.0.0-b1", "sha-400b1"),
    ("3.0.0-alpha1", "sha-300a1"),
];

pub const INDEX_TEMPLATE: &str = "<html><select>{{VERSION_SELECT}}</select>\
<redoc spec-url='/api-docs'></redoc></html>";

pub const LEGACY_INDEX_TEMPLATE: &str = "<html><redoc spec-url='/api-docs'></redoc></html>";

pub const SPEC_DOCUMENT: &str = "openapi: 3.0.0\ninfo:\n  version: {{VERSION}}\n";

#[derive(Clone)]
struct MockFile {
    status: StatusCode,
    content_type: String,
    body: Vec<u8>,
    delay: Option<Duration>,
}

#[derive(Default)]
struct MockState {
    tags_status: Mutex<StatusCode>,
    tags_body: Mutex<String>,
    /// Keyed by `{ref}/{path}` under the project
    files: Mutex<HashMap<String, MockFile>>,
    /// Keyed by absolute request path, outside the project
    foreign: Mutex<HashMap<String, Vec<u8>>>,
    tag_requests: AtomicUsize,
    file_requests: Mutex<HashMap<String, usize>>,
    paths: Mutex<Vec<String>>,
    last_authorization: Mutex<Option<String>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Start a mock serving [`DEFAULT_TAGS`] and a template, spec document
    /// and a few raw files per commit.
    pub async fn start() -> Self {
        let mock = Self::start_empty().await;
        mock.set_tags(DEFAULT_TAGS);
        for (name, sha) in DEFAULT_TAGS {
            let legacy = otm_spec_server::content::render::is_legacy_index_version(name);
            let template = if legacy {
                LEGACY_INDEX_TEMPLATE
            } else {
                INDEX_TEMPLATE
            };
            mock.add_file(sha, "redoc/index.html", "text/plain; charset=utf-8", template);
            mock.add_file(sha, "api/swagger.yaml", "text/plain; charset=utf-8", SPEC_DOCUMENT);
        }
        mock.add_file("sha-420", "images/logo.png", "image/png", b"\x89PNG-bytes".to_vec());
        mock.add_file("sha-420", "LICENSE", "text/plain; charset=utf-8", "Apache License");
        mock.add_file("master", "drafts/notes.yaml", "text/plain; charset=utf-8", "notes: true\n");
        mock
    }

    pub async fn start_empty() -> Self {
        let state = Arc::new(MockState::default());
        *state.tags_status.lock().unwrap() = StatusCode::OK;
        *state.tags_body.lock().unwrap() = "[]".to_string();

        let app = Router::new().fallback(serve).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_tags(&self, tags: &[(&str, &str)]) {
        let body: Vec<serde_json::Value> = tags
            .iter()
            .map(|(name, sha)| {
                serde_json::json!({
                    "name": name,
                    "zipball_url": format!("https://example.invalid/zipball/{}", name),
                    "commit": { "sha": sha, "url": "https://example.invalid/commit" }
                })
            })
            .collect();
        *self.state.tags_body.lock().unwrap() = serde_json::to_string(&body).unwrap();
    }

    pub fn set_tags_response(&self, status: StatusCode, body: &str) {
        *self.state.tags_status.lock().unwrap() = status;
        *self.state.tags_body.lock().unwrap() = body.to_string();
    }

    pub fn add_file(
        &self,
        reference: &str,
        path: &str,
        content_type: &str,
        body: impl Into<Vec<u8>>,
    ) {
        self.insert_file(reference, path, StatusCode::OK, content_type, body.into(), None);
    }

    /// Answer `{reference}/{path}` with a non-success status and body.
    pub fn add_file_error(&self, reference: &str, path: &str, status: StatusCode, body: &str) {
        self.insert_file(reference, path, status, "text/plain", body.into(), None);
    }

    /// Serve `{reference}/{path}` only after `delay`.
    pub fn add_slow_file(&self, reference: &str, path: &str, body: &str, delay: Duration) {
        self.insert_file(reference, path, StatusCode::OK, "text/plain", body.into(), Some(delay));
    }

    /// Serve `body` at an absolute path outside the project.
    pub fn add_foreign_file(&self, path: &str, body: &str) {
        self.state
            .foreign
            .lock()
            .unwrap()
            .insert(path.to_string(), body.as_bytes().to_vec());
    }

    fn insert_file(
        &self,
        reference: &str,
        path: &str,
        status: StatusCode,
        content_type: &str,
        body: Vec<u8>,
        delay: Option<Duration>,
    ) {
        self.state.files.lock().unwrap().insert(
            format!("{}/{}", reference, path),
            MockFile {
                status,
                content_type: content_type.to_string(),
                body,
                delay,
            },
        );
    }

    /// Every request path the mock has seen, in order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.state.paths.lock().unwrap().clone()
    }

    pub fn tag_requests(&self) -> usize {
        self.state.tag_requests.load(Ordering::SeqCst)
    }

    pub fn file_requests(&self, reference: &str, path: &str) -> usize {
        self.state
            .file_requests
            .lock()
            .unwrap()
            .get(&format!("{}/{}", reference, path))
            .copied()
            .unwrap_or(0)
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.state.last_authorization.lock().unwrap().clone()
    }
}

async fn serve(State(state): State<Arc<MockState>>, headers: HeaderMap, uri: Uri) -> impl IntoResponse {
    let path = uri.path();
    state.paths.lock().unwrap().push(path.to_string());
    let tags_path = format!("/repos/{}/{}/tags", ORG, PROJECT);
    if path == tags_path {
        state.tag_requests.fetch_add(1, Ordering::SeqCst);
        *state.last_authorization.lock().unwrap() = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let status = *state.tags_status.lock().unwrap();
        let body = state.tags_body.lock().unwrap().clone();
        return (status, [(header::CONTENT_TYPE, "application/json".to_string())], body.into_bytes())
            .into_response();
    }

    let raw_prefix = format!("/{}/{}/", ORG, PROJECT);
    let Some(key) = path.strip_prefix(&raw_prefix) else {
        let foreign = state.foreign.lock().unwrap().get(path).cloned();
        return match foreign {
            Some(body) => (StatusCode::OK, body).into_response(),
            None => (StatusCode::NOT_FOUND, "404: Not Found").into_response(),
        };
    };
    *state
        .file_requests
        .lock()
        .unwrap()
        .entry(key.to_string())
        .or_insert(0) += 1;

    let file = state.files.lock().unwrap().get(key).cloned();
    match file {
        Some(file) => {
            if let Some(delay) = file.delay {
                tokio::time::sleep(delay).await;
            }
            (file.status, [(header::CONTENT_TYPE, file.content_type)], file.body).into_response()
        }
        None => (StatusCode::NOT_FOUND, "404: Not Found").into_response(),
    }
}

/// Config pointing both upstream endpoints at the mock, bound to an
/// ephemeral local port.
pub fn test_config(mock: &MockUpstream) -> Config {
    let mut config = Config::default();
    config.server.bind_address = "127.0.0.1".to_string();
    config.server.port = 0;
    config.upstream.api_base_url = mock.base_url();
    config.upstream.raw_base_url = mock.base_url();
    config.upstream.timeout_secs = 5;
    config.content.static_dir = None;
    config
}

/// Client that does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
