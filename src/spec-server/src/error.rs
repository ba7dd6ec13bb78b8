use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpecServerError>;

/// Setup-time failures (configuration, binding, client construction).
#[derive(Error, Debug)]
pub enum SpecServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a request that could not produce an artifact.
///
/// Every variant maps to an HTTP response; nothing past the content handler
/// sees a bare error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// The requested file does not exist at the target reference, or a
    /// local override is missing from disk.
    #[error("{detail}")]
    NotFound { file: String, detail: String },

    /// Upstream answered with a non-success status, or could not be reached.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("No stable version available")]
    NoStableVersion,

    /// Anything else that went wrong while assembling an artifact. The detail
    /// is logged but never sent to the client.
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl ContentError {
    pub fn not_found(file: impl Into<String>) -> Self {
        let file = file.into();
        let detail = format!("File not found: '{}'", file);
        ContentError::NotFound { file, detail }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ContentError::NotFound { .. } => StatusCode::NOT_FOUND,
            ContentError::Upstream { status, .. } => *status,
            ContentError::NoStableVersion | ContentError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown on the error page.
    pub fn public_message(&self) -> String {
        match self {
            ContentError::NotFound { detail, .. } => detail.clone(),
            ContentError::Upstream { body, .. } => body.clone(),
            ContentError::NoStableVersion => {
                "No stable version available: every published version is a prerelease".to_string()
            }
            ContentError::Unexpected(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ContentError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.public_message();
        match &self {
            ContentError::Unexpected(detail) => {
                tracing::error!(status = %status, detail = %detail, "Unexpected failure while serving request");
            }
            _ => {
                tracing::warn!(status = %status, message = %message, "Handling error");
            }
        }
        error_page(status, &message)
    }
}

/// Render the HTML error page used for every non-success response.
pub fn error_page(status: StatusCode, message: &str) -> Response {
    let message = escape_html(&message.replace(['\r', '\n'], ""));
    let code = status.as_u16();
    let content = format!(
        "<html><head><title>Error {0}</title></head>\n<body><h1>Error {0}</h1>\n<p>{1}</p>\n</body></html>\n",
        code, message
    );
    (status, [(header::CONTENT_TYPE, "text/html")], content).into_response()
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
