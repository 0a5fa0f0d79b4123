use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A stored package together with all of its versions, newest release first.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PackageRecord {
    /// Row id
    pub id: i64,
    /// Package name (unique)
    pub name: String,
    /// Creation timestamp reported by the registry
    pub time_created: DateTime<Utc>,
    /// Last-modified timestamp reported by the registry
    pub time_modified: DateTime<Utc>,
    /// Versions ordered by release date descending
    #[sqlx(skip)]
    pub versions: Vec<VersionRecord>,
}

/// One published version of a package.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct VersionRecord {
    pub id: i64,
    pub package_id: i64,
    /// Version string, e.g. "1.0.0"
    pub version: String,
    pub description: Option<String>,
    /// Normalized SPDX license identifier
    pub license: Option<String>,
    /// Publish timestamp from the manifest time map
    pub release_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub dependencies: Vec<DependencyRecord>,
    #[sqlx(skip)]
    pub keywords: Vec<KeywordRecord>,
    #[sqlx(skip)]
    pub readmes: Vec<ReadmeRecord>,
    #[sqlx(skip)]
    pub audit_infos: Vec<AuditInfoRecord>,
}

/// A runtime or development dependency of one version.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct DependencyRecord {
    pub id: i64,
    pub version_id: i64,
    /// Name of the depended-upon package
    pub name: String,
    /// Semver range string, e.g. "^1.0.0"
    pub version_range: String,
    /// True when the dependency came from devDependencies
    pub is_dev: bool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct KeywordRecord {
    pub id: i64,
    pub version_id: i64,
    pub value: String,
}

/// Readme text; only the dist-tag "latest" version carries one.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct ReadmeRecord {
    pub id: i64,
    pub version_id: i64,
    pub content: String,
}

/// Vulnerability record for one version. Written by an external audit job,
/// never by the importer; only the count is surfaced.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AuditInfoRecord {
    pub id: i64,
    pub version_id: i64,
    pub vulnerability_count: i64,
}

/// Package row without nested relations, for the list endpoint.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct PackageSummary {
    pub id: i64,
    pub name: String,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PackageListQuery {
    /// Page number (1-indexed)
    pub page: Option<i64>,
    /// Packages per page (default 50, capped at 200)
    pub per_page: Option<i64>,
}
