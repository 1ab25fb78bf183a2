use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{Dist, Maintainer};

/// Full package document as served by an npm-compatible upstream.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpstreamManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, UpstreamVersion>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub time: UpstreamTime,
    #[serde(default)]
    pub users: BTreeMap<String, bool>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpstreamVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dist: Dist,
}

/// The `time` block. Besides `created`/`modified` it maps each version to
/// its publish time, and carries `unpublished` once the package is removed.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpstreamTime {
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub unpublished: Option<UpstreamUnpublished>,
    #[serde(flatten)]
    pub versions: BTreeMap<String, serde_json::Value>,
}

impl UpstreamTime {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.as_deref().and_then(parse_timestamp)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified.as_deref().and_then(parse_timestamp)
    }

    pub fn version_at(&self, version: &str) -> Option<DateTime<Utc>> {
        self.versions
            .get(version)
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp)
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct UpstreamUnpublished {
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub maintainers: Vec<Maintainer>,
    #[serde(default)]
    pub versions: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
