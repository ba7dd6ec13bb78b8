//! Placeholder substitution for the index page and the spec document.

use crate::error::{escape_html, ContentError};
use crate::versions::{VersionMap, VersionTag};
use bytes::Bytes;

pub const INDEX_TEMPLATE_PATH: &str = "redoc/index.html";
pub const SPEC_DOCUMENT_PATH: &str = "api/swagger.yaml";

pub const VERSION_SELECT_PLACEHOLDER: &str = "{{VERSION_SELECT}}";
pub const VERSION_PLACEHOLDER: &str = "{{VERSION}}";

const ABSOLUTE_SPEC_URL: &str = "spec-url='/api-docs'";
const RELATIVE_SPEC_URL: &str = "spec-url='swagger.yaml'";

/// Releases whose index page predates the version-select placeholder. Their
/// index is rendered from [`LEGACY_INDEX_SOURCE_TAG`] instead.
pub const LEGACY_INDEX_VERSIONS: [&str; 6] =
    ["4.0.0-b1", "4.0.0", "4.0.1", "4.1.0", "4.1.1", "4.1.2"];

pub const LEGACY_INDEX_SOURCE_TAG: &str = "4.2.0-a1";

pub fn is_legacy_index_version(version: &str) -> bool {
    LEGACY_INDEX_VERSIONS.contains(&version)
}

/// Tag whose `redoc/index.html` should be rendered for `version`.
pub fn index_template_source<'a>(map: &'a VersionMap, version: &str) -> Option<&'a VersionTag> {
    if is_legacy_index_version(version) {
        match map.lookup_any(LEGACY_INDEX_SOURCE_TAG) {
            Some(tag) => return Some(tag),
            None => tracing::warn!(
                version = %version,
                source_tag = LEGACY_INDEX_SOURCE_TAG,
                "Legacy index source tag missing, rendering the version's own template"
            ),
        }
    }
    map.get(version)
}

/// `<option>` list for every version, the requested one marked selected.
pub fn version_select<'a, I>(versions: I, selected: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .map(|v| {
            format!(
                "<option value=\"{0}\" {1}>{0}</option>",
                escape_html(v),
                if v == selected { "selected" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_index(template: &[u8], map: &VersionMap, version: &str) -> Result<Bytes, ContentError> {
    let template = std::str::from_utf8(template).map_err(|e| {
        ContentError::Unexpected(format!("Index template is not valid UTF-8: {}", e))
    })?;
    let rendered = template
        .replace(ABSOLUTE_SPEC_URL, RELATIVE_SPEC_URL)
        .replace(VERSION_SELECT_PLACEHOLDER, &version_select(map.names(), version));
    Ok(Bytes::from(rendered))
}

pub fn render_spec(document: &[u8], version: &str) -> Bytes {
    Bytes::from(replace_bytes(
        document,
        VERSION_PLACEHOLDER.as_bytes(),
        version.as_bytes(),
    ))
}

fn replace_bytes(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            out.extend_from_slice(replacement);
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}
