//! Extension to MIME type lookup.

pub const HTML: &str = "text/html; charset=utf-8";
pub const YAML: &str = "text/x-yaml; charset=utf-8";
pub const JSON: &str = "application/json";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Text after the last `.`; the whole name when there is none.
pub fn file_extension(file: &str) -> &str {
    file.rsplit('.').next().unwrap_or(file)
}

pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "html" | "htm" => HTML,
        "yaml" | "yml" => YAML,
        "json" => JSON,
        "css" => "text/css; charset=utf-8",
        "js" => "application/javascript; charset=utf-8",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => return None,
    };
    Some(content_type)
}

/// Content type for `file`, falling back to what upstream reported.
pub fn resolve_content_type(file: &str, upstream: Option<&str>) -> String {
    content_type_for_extension(file_extension(file))
        .or(upstream)
        .unwrap_or(OCTET_STREAM)
        .to_string()
}
