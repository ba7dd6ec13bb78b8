use crate::error::ContentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name reported by the liveness probe
pub const SERVICE_NAME: &str = "otm-spec-server";

/// Prerelease labels starting with this (any case) are hidden when alpha
/// filtering is enabled
pub const ALPHA_PRERELEASE_PREFIX: &str = "alpha";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionTag {
    pub name: String,
    pub commit_id: String,
}

impl VersionTag {
    pub fn new(name: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commit_id: commit_id.into(),
        }
    }
}

/// One entry of the upstream tag list
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTag {
    pub name: String,
    pub commit: UpstreamCommit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamCommit {
    pub sha: String,
}

impl From<UpstreamTag> for VersionTag {
    fn from(tag: UpstreamTag) -> Self {
        // refs/tags/4.2.0 -> 4.2.0
        let name = tag.name.rsplit('/').next().unwrap_or(&tag.name).to_string();
        VersionTag {
            name,
            commit_id: tag.commit.sha,
        }
    }
}

/// Whether `name` is a semantic version whose prerelease label is an alpha.
pub fn is_alpha(name: &str) -> bool {
    semver::Version::parse(name)
        .map(|v| {
            v.pre
                .as_str()
                .to_ascii_lowercase()
                .starts_with(ALPHA_PRERELEASE_PREFIX)
        })
        .unwrap_or(false)
}

/// Liveness payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub name: String,
    pub version: String,
    pub health: String,
}

/// Version name to tag mapping for one resolution snapshot.
///
/// Iteration follows upstream order. A duplicate name keeps its first
/// position but takes the later entry's commit. Hidden (alpha) tags are kept
/// aside: they are not versions clients can request, but they can still be
/// used as a template source.
#[derive(Debug, Clone, Default)]
pub struct VersionMap {
    tags: Vec<VersionTag>,
    index: HashMap<String, usize>,
    hidden: HashMap<String, VersionTag>,
    upstream_head: Option<String>,
}

impl VersionMap {
    pub fn from_tags<I>(tags: I, hide_alpha: bool) -> Self
    where
        I: IntoIterator<Item = VersionTag>,
    {
        let mut map = VersionMap::default();
        for tag in tags {
            if map.upstream_head.is_none() {
                map.upstream_head = Some(tag.name.clone());
            }
            if hide_alpha && is_alpha(&tag.name) {
                map.hidden.insert(tag.name.clone(), tag);
                continue;
            }
            match map.index.get(&tag.name).copied() {
                Some(position) => map.tags[position] = tag,
                None => {
                    map.index.insert(tag.name.clone(), map.tags.len());
                    map.tags.push(tag);
                }
            }
        }
        map
    }

    /// Parse the upstream JSON tag list.
    pub fn parse(body: &[u8], hide_alpha: bool) -> Result<Self, serde_json::Error> {
        let raw: Vec<UpstreamTag> = serde_json::from_slice(body)?;
        Ok(Self::from_tags(raw.into_iter().map(VersionTag::from), hide_alpha))
    }

    pub fn get(&self, name: &str) -> Option<&VersionTag> {
        self.index.get(name).map(|&i| &self.tags[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look a tag up among visible and hidden tags.
    pub fn lookup_any(&self, name: &str) -> Option<&VersionTag> {
        self.get(name).or_else(|| self.hidden.get(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    pub fn tags(&self) -> &[VersionTag] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Highest version without a prerelease component.
    pub fn latest_stable(&self) -> Result<&str, ContentError> {
        self.tags
            .iter()
            .filter_map(|t| {
                semver::Version::parse(&t.name)
                    .ok()
                    .filter(|v| v.pre.is_empty())
                    .map(|v| (v, t.name.as_str()))
            })
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, name)| name)
            .ok_or(ContentError::NoStableVersion)
    }

    /// First tag in upstream order, reported as the running version.
    pub fn health_snapshot(&self) -> Option<HealthSnapshot> {
        self.upstream_head.as_ref().map(|version| HealthSnapshot {
            name: SERVICE_NAME.to_string(),
            version: version.clone(),
            health: "RUNNING".to_string(),
        })
    }
}
