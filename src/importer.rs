use crate::error::{Error, Result};
use crate::models::{Manifest, ManifestVersion, PackageRecord};
use crate::registry::RegistryClient;
use crate::store::Store;
use futures::future::join_all;

/// Read-through importer: serves a package from the store, pulling it from
/// the upstream registry on first access.
///
/// Once a package row exists it is never refreshed; re-import is not
/// attempted even if upstream data changes.
#[derive(Clone)]
pub struct Importer {
    store: Store,
    registry: RegistryClient,
}

impl Importer {
    pub fn new(store: Store, registry: RegistryClient) -> Self {
        Self { store, registry }
    }

    /// Return the stored record for `name`, importing it on a cache miss.
    ///
    /// Upstream fetch failures and package-row insert failures propagate.
    /// Child-row insert failures are logged and skipped, so a partially
    /// imported record can be returned with some child rows missing.
    pub async fn get_package(&self, name: &str) -> Result<PackageRecord> {
        if let Some(record) = self.store.get_package(name).await? {
            return Ok(record);
        }

        tracing::info!(package = name, "Cache miss, importing from registry");
        let manifest = self.registry.fetch_manifest(name).await?;
        self.import(name, &manifest).await?;

        // Re-query so the response reflects exactly what was persisted
        self.store
            .get_package(name)
            .await?
            .ok_or_else(|| Error::PackageNotFound {
                name: name.to_string(),
            })
    }

    async fn import(&self, name: &str, manifest: &Manifest) -> Result<()> {
        let package_id = match self
            .store
            .insert_package_if_absent(name, manifest.time.created, manifest.time.modified)
            .await
        {
            Ok(Some(id)) => id,
            Ok(None) => {
                // A concurrent import won the race; its rows are (or will
                // be) the record for this name.
                tracing::info!(package = name, "Package already imported concurrently");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(package = name, error = %e, "Failed to insert package row");
                return Err(e);
            }
        };

        let latest = manifest.dist_tags.latest.as_deref();

        // One gathered batch per manifest version. Best effort: a failed
        // version loses its rows but never aborts the import.
        let inserts = manifest.versions.iter().map(|(version, data)| {
            self.import_version(package_id, name, version, data, manifest, latest)
        });

        for (version, result) in manifest.versions.keys().zip(join_all(inserts).await) {
            if let Err(e) = result {
                tracing::error!(
                    package = name,
                    version = %version,
                    error = %e,
                    "Failed to insert version rows"
                );
            }
        }

        tracing::info!(
            package = name,
            versions = manifest.versions.len(),
            "Imported package"
        );

        Ok(())
    }

    /// Insert one Version row plus its dependency/keyword/readme children.
    async fn import_version(
        &self,
        package_id: i64,
        package: &str,
        version: &str,
        data: &ManifestVersion,
        manifest: &Manifest,
        latest: Option<&str>,
    ) -> Result<()> {
        let release_date = manifest.time.release_date(version);
        let license = data.license.as_ref().and_then(|l| l.as_str());

        let version_id = self
            .store
            .insert_version(
                package_id,
                version,
                data.description.as_deref(),
                license,
                release_date,
            )
            .await?;

        // Only the dist-tag "latest" version carries the readme
        if latest == Some(version) {
            let content = manifest.readme.as_deref().unwrap_or_default();
            if let Err(e) = self.store.insert_readme(version_id, content).await {
                tracing::error!(package, version, error = %e, "Failed to insert readme");
            }
        }

        for (dep, range) in &data.dependencies {
            if let Err(e) = self
                .store
                .insert_dependency(version_id, dep, range, false)
                .await
            {
                tracing::error!(package, version, dependency = %dep, error = %e,
                    "Failed to insert dependency");
            }
        }

        for (dep, range) in &data.dev_dependencies {
            if let Err(e) = self
                .store
                .insert_dependency(version_id, dep, range, true)
                .await
            {
                tracing::error!(package, version, dependency = %dep, error = %e,
                    "Failed to insert dev dependency");
            }
        }

        for keyword in &data.keywords {
            if let Err(e) = self.store.insert_keyword(version_id, keyword).await {
                tracing::error!(package, version, keyword = %keyword, error = %e,
                    "Failed to insert keyword");
            }
        }

        Ok(())
    }
}
