use crate::error::Result;
use crate::models::{
    AuditInfoRecord, DependencyRecord, KeywordRecord, PackageRecord, PackageSummary, ReadmeRecord,
    VersionRecord,
};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Relational store for package metadata.
///
/// Tables: packages -> versions -> {dependencies, keywords, readmes,
/// audit_infos}. Rows are only ever inserted, during import; there is no
/// update or delete path.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE,
    time_created  TEXT NOT NULL,
    time_modified TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id   INTEGER NOT NULL REFERENCES packages(id),
    version      TEXT NOT NULL,
    description  TEXT,
    license      TEXT,
    release_date TEXT,
    UNIQUE(package_id, version)
);

CREATE TABLE IF NOT EXISTS dependencies (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id    INTEGER NOT NULL REFERENCES versions(id),
    name          TEXT NOT NULL,
    version_range TEXT NOT NULL,
    is_dev        BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS keywords (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions(id),
    value      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS readmes (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id INTEGER NOT NULL REFERENCES versions(id),
    content    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_infos (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    version_id          INTEGER NOT NULL REFERENCES versions(id),
    vulnerability_count INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_versions_package_id ON versions(package_id);
CREATE INDEX IF NOT EXISTS idx_dependencies_version_id ON dependencies(version_id);
CREATE INDEX IF NOT EXISTS idx_keywords_version_id ON keywords(version_id);
CREATE INDEX IF NOT EXISTS idx_readmes_version_id ON readmes(version_id);
CREATE INDEX IF NOT EXISTS idx_audit_infos_version_id ON audit_infos(version_id);
"#;

impl Store {
    /// Open (creating if missing) a SQLite database at the given path.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| crate::error::Error::Config {
                    msg: format!("Failed to create database directory: {}", e),
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open an in-memory database. Used by tests and tooling.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        // A single connection that is never recycled, otherwise each pool
        // connection would see its own empty in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema. Idempotent, runs on every startup.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Load a package with all nested relations, versions ordered by
    /// release date descending. Returns None on a cache miss.
    pub async fn get_package(&self, name: &str) -> Result<Option<PackageRecord>> {
        let package = sqlx::query_as::<_, PackageRecord>(
            "SELECT id, name, time_created, time_modified FROM packages WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut package) = package else {
            return Ok(None);
        };

        let mut versions = sqlx::query_as::<_, VersionRecord>(
            "SELECT id, package_id, version, description, license, release_date \
             FROM versions WHERE package_id = ? ORDER BY release_date DESC",
        )
        .bind(package.id)
        .fetch_all(&self.pool)
        .await?;

        // Index of version id -> position, to attach child rows
        let mut slots: HashMap<i64, usize> = HashMap::new();
        for (idx, version) in versions.iter().enumerate() {
            slots.insert(version.id, idx);
        }

        let dependencies = sqlx::query_as::<_, DependencyRecord>(
            "SELECT d.id, d.version_id, d.name, d.version_range, d.is_dev \
             FROM dependencies d JOIN versions v ON v.id = d.version_id \
             WHERE v.package_id = ? ORDER BY d.id",
        )
        .bind(package.id)
        .fetch_all(&self.pool)
        .await?;
        for dep in dependencies {
            if let Some(&idx) = slots.get(&dep.version_id) {
                versions[idx].dependencies.push(dep);
            }
        }

        let keywords = sqlx::query_as::<_, KeywordRecord>(
            "SELECT k.id, k.version_id, k.value \
             FROM keywords k JOIN versions v ON v.id = k.version_id \
             WHERE v.package_id = ? ORDER BY k.id",
        )
        .bind(package.id)
        .fetch_all(&self.pool)
        .await?;
        for keyword in keywords {
            if let Some(&idx) = slots.get(&keyword.version_id) {
                versions[idx].keywords.push(keyword);
            }
        }

        let readmes = sqlx::query_as::<_, ReadmeRecord>(
            "SELECT r.id, r.version_id, r.content \
             FROM readmes r JOIN versions v ON v.id = r.version_id \
             WHERE v.package_id = ? ORDER BY r.id",
        )
        .bind(package.id)
        .fetch_all(&self.pool)
        .await?;
        for readme in readmes {
            if let Some(&idx) = slots.get(&readme.version_id) {
                versions[idx].readmes.push(readme);
            }
        }

        let audit_infos = sqlx::query_as::<_, AuditInfoRecord>(
            "SELECT a.id, a.version_id, a.vulnerability_count \
             FROM audit_infos a JOIN versions v ON v.id = a.version_id \
             WHERE v.package_id = ? ORDER BY a.id",
        )
        .bind(package.id)
        .fetch_all(&self.pool)
        .await?;
        for audit in audit_infos {
            if let Some(&idx) = slots.get(&audit.version_id) {
                versions[idx].audit_infos.push(audit);
            }
        }

        package.versions = versions;
        Ok(Some(package))
    }

    /// Name-sorted page of package rows, without nested relations.
    pub async fn list_packages(&self, limit: i64, offset: i64) -> Result<Vec<PackageSummary>> {
        let packages = sqlx::query_as::<_, PackageSummary>(
            "SELECT id, name, time_created, time_modified \
             FROM packages ORDER BY name LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(packages)
    }

    /// Atomically insert a package row unless one with the same name exists.
    ///
    /// Returns the new row id, or None when another import won the race.
    /// The UNIQUE constraint on name is what makes concurrent duplicate
    /// imports safe.
    pub async fn insert_package_if_absent(
        &self,
        name: &str,
        time_created: DateTime<Utc>,
        time_modified: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO packages (name, time_created, time_modified) VALUES (?, ?, ?) \
             ON CONFLICT(name) DO NOTHING RETURNING id",
        )
        .bind(name)
        .bind(time_created)
        .bind(time_modified)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn insert_version(
        &self,
        package_id: i64,
        version: &str,
        description: Option<&str>,
        license: Option<&str>,
        release_date: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO versions (package_id, version, description, license, release_date) \
             VALUES (?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(package_id)
        .bind(version)
        .bind(description)
        .bind(license)
        .bind(release_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn insert_dependency(
        &self,
        version_id: i64,
        name: &str,
        version_range: &str,
        is_dev: bool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO dependencies (version_id, name, version_range, is_dev) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(version_id)
        .bind(name)
        .bind(version_range)
        .bind(is_dev)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_keyword(&self, version_id: i64, value: &str) -> Result<()> {
        sqlx::query("INSERT INTO keywords (version_id, value) VALUES (?, ?)")
            .bind(version_id)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_readme(&self, version_id: i64, content: &str) -> Result<()> {
        sqlx::query("INSERT INTO readmes (version_id, content) VALUES (?, ?)")
            .bind(version_id)
            .bind(content)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
