use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// An NPM registry packument: every published version of a package plus
/// the shared metadata (dist-tags, timestamps, readme of the latest version).
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,

    #[serde(default)]
    pub versions: BTreeMap<String, ManifestVersion>,

    #[serde(rename = "dist-tags", default)]
    pub dist_tags: DistTags,

    pub time: ManifestTime,

    #[serde(default)]
    pub readme: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistTags {
    pub latest: Option<String>,
}

/// The manifest `time` map: `created` and `modified` for the package as a
/// whole, plus one publish timestamp keyed by each version string.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestTime {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    // Kept as raw values: unpublished packages carry a non-timestamp
    // "unpublished" entry in this map.
    #[serde(flatten)]
    releases: BTreeMap<String, serde_json::Value>,
}

impl ManifestTime {
    /// Publish timestamp for a specific version, if the registry recorded one.
    pub fn release_date(&self, version: &str) -> Option<DateTime<Utc>> {
        let value = self.releases.get(version)?;
        let raw = value.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// One entry of the manifest `versions` map. The version string itself is
/// the map key; the embedded `version` field is not relied upon.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestVersion {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub license: Option<License>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Modern manifests carry an SPDX string; pre-2016 manifests may carry an
/// object like `{"type": "MIT", "url": "..."}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum License {
    Spdx(String),
    Legacy {
        #[serde(rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl License {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            License::Spdx(s) => Some(s.as_str()),
            License::Legacy { kind, .. } => kind.as_deref(),
        }
    }
}
