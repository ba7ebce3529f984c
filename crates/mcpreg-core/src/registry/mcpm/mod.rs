//! mcpm registry provider
//!
//! Normalises the mcpm `servers.json` manifest into canonical servers.
//!
//! Upstream quirks handled here:
//!
//! - Installation keys are inconsistent (`npm` for an `npx` command, ...), so
//!   installations are indexed by their `command`.
//! - Installations have no versions. Every installation reports `latest` and
//!   a `version` filter is dropped with a warning before matching.
//! - An installation whose `args` contain no plain package name is rejected.
//! - The server's canonical name is the package of the alphabetically first
//!   runtime.

pub mod schema;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::{Fetch, HttpFetcher, ManifestCache};
use crate::classifier::{InstallationArgs, classify_installations};
use crate::error::{RegistryError, Result};
use crate::filter::{Filters, keys, normalize_string, server_match_options};
use crate::packages::{Installation, Installations, Publisher, Server, Tools, Transports};
use crate::runtime::Runtime;

use super::catalog::{Catalog, validate_runtimes};
use super::{BuildOptions, PackageProvider, ProviderBuilder, ResolveOptions, SearchOptions};

pub use schema::{McpmAuthor, McpmInstallation, McpmManifest, McpmServer};

/// Default provider ID.
pub const PROVIDER_ID: &str = "mcpm";

/// Public mcpm manifest.
pub const DEFAULT_URL: &str = "https://getmcp.io/api/servers.json";

/// Version reported for every mcpm installation.
const LATEST: &str = "latest";

/// Runtimes mcpm manifests describe.
pub const RUNTIMES: [Runtime; 3] = [Runtime::Docker, Runtime::Npx, Runtime::Uvx];

/// Provider over a decoded mcpm manifest.
pub struct McpmProvider {
    catalog: Catalog,
}

impl std::fmt::Debug for McpmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpmProvider")
            .field("id", &self.catalog.id())
            .field("servers", &self.catalog.len())
            .finish()
    }
}

impl McpmProvider {
    /// Build from raw manifest bytes using the default provider ID.
    pub fn from_json(bytes: &[u8], runtimes: &BTreeSet<Runtime>) -> Result<Self> {
        Self::from_json_with_id(PROVIDER_ID, bytes, runtimes)
    }

    pub fn from_json_with_id(id: &str, bytes: &[u8], runtimes: &BTreeSet<Runtime>) -> Result<Self> {
        let supported = validate_runtimes(id, runtimes, &RUNTIMES)?;
        let manifest: McpmManifest =
            serde_json::from_slice(bytes).map_err(|e| RegistryError::decode(id, e))?;
        Ok(Self::from_manifest(id, &manifest, &supported))
    }

    fn from_manifest(id: &str, manifest: &McpmManifest, supported: &BTreeSet<Runtime>) -> Self {
        let mut catalog = Catalog::new(id, server_match_options()).with_mutator(drop_version_filter);

        for (key, record) in manifest {
            match build_server(id, key, record, supported) {
                Some(server) => catalog.insert(server),
                None => tracing::warn!(
                    provider = id,
                    server = %key,
                    "skipping server without supported installations"
                ),
            }
        }

        tracing::debug!(provider = id, servers = catalog.len(), "built registry");
        Self { catalog }
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

impl PackageProvider for McpmProvider {
    fn id(&self) -> &str {
        self.catalog.id()
    }

    fn resolve(&self, name: &str, options: &ResolveOptions) -> Result<Server> {
        self.catalog.resolve(name, options)
    }

    fn search(
        &self,
        name: &str,
        filters: Option<&Filters>,
        _options: &SearchOptions,
    ) -> Result<Vec<Server>> {
        self.catalog.search(name, filters)
    }
}

fn drop_version_filter(filters: &mut Filters) {
    if let Some(version) = filters.remove(keys::VERSION) {
        tracing::warn!(
            version = %version,
            "mcpm registry has no per-installation versions, ignoring version filter"
        );
    }
}

fn build_server(
    provider: &str,
    key: &str,
    record: &McpmServer,
    supported: &BTreeSet<Runtime>,
) -> Option<Server> {
    let id = normalize_string(key);
    if id.is_empty() {
        return None;
    }

    let mut installations = Installations::new();
    let mut kept = Vec::new();

    for (method, install) in &record.installations {
        let Ok(runtime) = install.command.parse::<Runtime>() else {
            tracing::debug!(provider, server = %id, method = %method, command = %install.command, "unknown installation command");
            continue;
        };
        if !supported.contains(&runtime) {
            continue;
        }
        if installations.get(runtime).is_some() {
            tracing::debug!(provider, server = %id, method = %method, "duplicate installation for runtime");
            continue;
        }
        let Some(package) = runtime.spec().extract_package_name(&install.args) else {
            tracing::warn!(provider, server = %id, method = %method, "installation has no package name, skipping");
            continue;
        };

        installations.insert(Installation {
            runtime,
            package,
            version: LATEST.to_string(),
            description: install.description.clone(),
            recommended: install.recommended,
            deprecated: false,
            transports: Transports::default(),
            repository: record.repository.clone(),
        });
        kept.push(InstallationArgs {
            runtime: Some(runtime),
            args: &install.args,
            env: &install.env,
        });
    }

    // Sorted by runtime, so the first entry is the alphabetically first runtime.
    let name = installations.iter().next()?.package.clone();
    let arguments = classify_installations(kept, supported, &record.arguments);

    let display_name = [&record.display_name, &record.name, &id]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let publisher = record
        .author
        .as_ref()
        .map(|a| Publisher {
            name: a.name.clone(),
            url: a.url.clone(),
        })
        .unwrap_or_default();

    Some(Server {
        id,
        source: provider.to_string(),
        name,
        display_name,
        description: record.description.clone(),
        license: record.license.clone(),
        categories: record.categories.clone(),
        tags: record.tags.clone(),
        homepage: record.homepage.clone().filter(|h| !h.trim().is_empty()),
        publisher,
        tools: Tools::from(record.tools.clone()),
        installations,
        arguments,
        is_official: record.is_official,
        deprecated: false,
        meta: Default::default(),
    })
}

/// Builds an [`McpmProvider`] from a manifest URL through the shared cache.
pub struct McpmBuilder<F: Fetch = HttpFetcher> {
    id: String,
    url: String,
    runtimes: BTreeSet<Runtime>,
    cache: Arc<ManifestCache<F>>,
}

impl<F: Fetch> McpmBuilder<F> {
    pub fn new(url: impl Into<String>, runtimes: BTreeSet<Runtime>, cache: Arc<ManifestCache<F>>) -> Self {
        Self {
            id: PROVIDER_ID.to_string(),
            url: url.into(),
            runtimes,
            cache,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl<F: Fetch> ProviderBuilder for McpmBuilder<F> {
    type Provider = McpmProvider;

    async fn build(&self, options: &BuildOptions) -> Result<McpmProvider> {
        if self.url.trim().is_empty() {
            return Err(RegistryError::invalid(format!("{}: url must not be empty", self.id)));
        }
        validate_runtimes(&self.id, &self.runtimes, &RUNTIMES)?;

        let bytes = self.cache.fetch(&self.url, options).await?;
        McpmProvider::from_json_with_id(&self.id, &bytes, &self.runtimes)
    }
}
