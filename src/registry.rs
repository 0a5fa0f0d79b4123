use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::models::Manifest;
use std::time::Duration;

/// HTTP client for the upstream NPM registry.
///
/// The base URL is injected via configuration so tests can point it at a
/// local mock server.
#[derive(Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the manifest ("packument") for a package by name.
    ///
    /// Scoped names (`@scope/name`) are passed through as-is; the registry
    /// accepts the literal slash.
    pub async fn fetch_manifest(&self, name: &str) -> Result<Manifest> {
        validate_package_name(name)?;

        let url = format!("{}/{}", self.base_url, name);
        tracing::debug!(package = name, url, "Fetching manifest from registry");

        let response = self.http.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::PackageNotFound {
                name: name.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(Error::RegistryStatus {
                name: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        let manifest = response.json::<Manifest>().await?;
        Ok(manifest)
    }
}

/// Reject names that could not be valid on the registry, before they reach
/// the network. NPM names are lowercase URL-safe strings, optionally scoped.
fn validate_package_name(name: &str) -> Result<()> {
    let invalid = |n: &str| Error::InvalidPackageName {
        name: n.to_string(),
    };

    if name.is_empty() || name.len() > 214 {
        return Err(invalid(name));
    }

    // At most one slash, only as the scope separator
    let mut parts = name.splitn(2, '/');
    let first = parts.next().unwrap_or("");
    let second = parts.next();

    match second {
        Some(rest) => {
            if !first.starts_with('@') || first.len() == 1 || rest.is_empty() {
                return Err(invalid(name));
            }
        }
        None => {
            if first.starts_with('@') {
                return Err(invalid(name));
            }
        }
    }

    if name
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@' | '/')))
    {
        return Err(invalid(name));
    }

    // Path-traversal style segments never name a real package
    if name.split('/').any(|seg| seg == "." || seg == "..") {
        return Err(invalid(name));
    }

    Ok(())
}
