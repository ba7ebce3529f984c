//! mozilla-ai registry provider
//!
//! Reads the mozilla-ai manifest, either from a URL through the manifest
//! cache or from the copy embedded in this crate when no URL is configured.
//!
//! An installation survives only if its key, `type` and `command` agree on a
//! runtime the caller supports. A server is deprecated when upstream says so
//! or when every surviving installation is deprecated.

pub mod schema;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cache::{Fetch, HttpFetcher, ManifestCache};
use crate::classifier::{InstallationArgs, classify_installations};
use crate::error::{RegistryError, Result};
use crate::filter::{Filters, MatchOptions, equals_bool, keys, normalize_string, server_match_options};
use crate::packages::{Installation, Installations, Server, Tools, Transports};
use crate::runtime::Runtime;

use super::catalog::{Catalog, validate_runtimes};
use super::{BuildOptions, PackageProvider, ProviderBuilder, ResolveOptions, SearchOptions};

pub use schema::{MozillaAiInstallation, MozillaAiManifest, MozillaAiServer};

/// Default provider ID.
pub const PROVIDER_ID: &str = "mozilla-ai";

/// Runtimes mozilla-ai manifests describe.
pub const RUNTIMES: [Runtime; 4] = [Runtime::Docker, Runtime::Npx, Runtime::Python, Runtime::Uvx];

const LATEST: &str = "latest";

/// Manifest shipped with the crate.
pub static EMBEDDED_REGISTRY: &[u8] = include_bytes!("data/registry.json");

/// Default server matchers plus a `deprecated` flag matcher.
pub fn match_options() -> MatchOptions<Server> {
    server_match_options().with_matcher(keys::DEPRECATED, equals_bool(|s: &Server| s.deprecated))
}

/// Provider over a decoded mozilla-ai manifest.
pub struct MozillaAiProvider {
    catalog: Catalog,
}

impl std::fmt::Debug for MozillaAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MozillaAiProvider")
            .field("id", &self.catalog.id())
            .field("servers", &self.catalog.len())
            .finish()
    }
}

impl MozillaAiProvider {
    /// Provider over the embedded manifest.
    pub fn embedded(runtimes: &BTreeSet<Runtime>) -> Result<Self> {
        Self::from_json(EMBEDDED_REGISTRY, runtimes)
    }

    pub fn from_json(bytes: &[u8], runtimes: &BTreeSet<Runtime>) -> Result<Self> {
        Self::from_json_with_id(PROVIDER_ID, bytes, runtimes)
    }

    pub fn from_json_with_id(id: &str, bytes: &[u8], runtimes: &BTreeSet<Runtime>) -> Result<Self> {
        let supported = validate_runtimes(id, runtimes, &RUNTIMES)?;
        let manifest: MozillaAiManifest =
            serde_json::from_slice(bytes).map_err(|e| RegistryError::decode(id, e))?;

        let mut catalog = Catalog::new(id, match_options());
        for (key, record) in &manifest {
            match build_server(id, key, record, &supported) {
                Some(server) => catalog.insert(server),
                None => tracing::warn!(
                    provider = id,
                    server = %key,
                    "skipping server without supported installations"
                ),
            }
        }

        tracing::debug!(provider = id, servers = catalog.len(), "built registry");
        Ok(Self { catalog })
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }
}

impl PackageProvider for MozillaAiProvider {
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

fn build_server(
    provider: &str,
    key: &str,
    record: &MozillaAiServer,
    supported: &BTreeSet<Runtime>,
) -> Option<Server> {
    let id = if record.id.trim().is_empty() {
        normalize_string(key)
    } else {
        normalize_string(&record.id)
    };
    if id.is_empty() {
        return None;
    }

    let server_transports = Transports::from_strings(&record.transports);
    let mut installations = Installations::new();
    let mut kept = Vec::new();

    for (method, install) in &record.installations {
        if !install.is_consistent(method) {
            tracing::debug!(provider, server = %id, method = %method, "installation key, type and command disagree");
            continue;
        }
        let Ok(runtime) = method.parse::<Runtime>() else {
            continue;
        };
        if !supported.contains(&runtime) || installations.get(runtime).is_some() {
            continue;
        }

        let package = if install.package.trim().is_empty() {
            runtime.spec().extract_package_name(&install.args)
        } else {
            Some(install.package.trim().to_string())
        };
        let Some(package) = package else {
            tracing::warn!(provider, server = %id, method = %method, "installation has no package name, skipping");
            continue;
        };

        let transports = if install.transports.is_empty() {
            server_transports.clone()
        } else {
            Transports::from_strings(&install.transports)
        };
        let version = match install.version.trim() {
            "" => LATEST.to_string(),
            v => v.to_string(),
        };

        installations.insert(Installation {
            runtime,
            package,
            version,
            description: install.description.clone(),
            recommended: install.recommended,
            deprecated: install.deprecated,
            transports,
            repository: install.repository.clone(),
        });
        kept.push(InstallationArgs {
            runtime: Some(runtime),
            args: &install.args,
            env: &install.env,
        });
    }

    if installations.is_empty() {
        return None;
    }

    let name = match normalize_string(&record.name) {
        n if n.is_empty() => id.clone(),
        n => n,
    };
    let display_name = match record.display_name.trim() {
        "" => name.clone(),
        d => d.to_string(),
    };
    let arguments = classify_installations(kept, supported, &record.arguments);
    let deprecated = record.deprecated || installations.all_deprecated();

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
        publisher: record.publisher.clone(),
        tools: Tools::from(record.tools.clone()),
        installations,
        arguments,
        is_official: record.is_official,
        deprecated,
        meta: Default::default(),
    })
}

/// Builds a [`MozillaAiProvider`]. A blank URL selects the embedded manifest.
pub struct MozillaAiBuilder<F: Fetch = HttpFetcher> {
    id: String,
    url: String,
    runtimes: BTreeSet<Runtime>,
    cache: Arc<ManifestCache<F>>,
}

impl<F: Fetch> MozillaAiBuilder<F> {
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

impl<F: Fetch> ProviderBuilder for MozillaAiBuilder<F> {
    type Provider = MozillaAiProvider;

    async fn build(&self, options: &BuildOptions) -> Result<MozillaAiProvider> {
        validate_runtimes(&self.id, &self.runtimes, &RUNTIMES)?;

        if self.url.trim().is_empty() {
            tracing::debug!(provider = %self.id, "using embedded registry");
            return MozillaAiProvider::from_json_with_id(&self.id, EMBEDDED_REGISTRY, &self.runtimes);
        }

        let bytes = self.cache.fetch(&self.url, options).await?;
        MozillaAiProvider::from_json_with_id(&self.id, &bytes, &self.runtimes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::Transport;
    use crate::runtime::default_supported_runtimes;

    const MANIFEST: &str = r#"{
        "Time": {
            "name": "time",
            "displayName": "Time",
            "transports": ["sse"],
            "arguments": {"TZ": {"description": "Timezone", "required": false, "example": "UTC"}},
            "installations": {
                "uvx": {"type": "uvx", "command": "uvx", "args": ["mcp-server-time", "--local-timezone=${TZ}"], "package": "mcp-server-time", "version": "0.6.2"},
                "docker": {"type": "docker", "command": "docker", "args": ["run", "-i", "--rm", "mcp/time"], "transports": ["streamable-http", "bogus"]},
                "npx": {"type": "npx", "command": "uvx", "args": ["mcp-server-time"]}
            }
        },
        "legacy": {
            "id": "Legacy-Server",
            "installations": {
                "npx": {"type": "npx", "command": "npx", "args": ["-y", "legacy-mcp"], "deprecated": true}
            }
        }
    }"#;

    fn provider() -> MozillaAiProvider {
        MozillaAiProvider::from_json(MANIFEST.as_bytes(), &default_supported_runtimes()).unwrap()
    }

    #[test]
    fn test_inconsistent_installation_is_dropped() {
        let server = provider().resolve("time", &ResolveOptions::new()).unwrap();
        assert_eq!(server.runtimes(), vec![Runtime::Docker, Runtime::Uvx]);
    }

    #[test]
    fn test_transport_overrides() {
        let server = provider().resolve("time", &ResolveOptions::new()).unwrap();
        let uvx = server.installation(Runtime::Uvx).unwrap();
        assert_eq!(uvx.transports.iter().collect::<Vec<_>>(), vec![Transport::Sse]);
        let docker = server.installation(Runtime::Docker).unwrap();
        assert_eq!(docker.transports.iter().collect::<Vec<_>>(), vec![Transport::StreamableHttp]);
    }

    #[test]
    fn test_versions_and_packages() {
        let server = provider().resolve("time", &ResolveOptions::new()).unwrap();
        assert_eq!(server.installation(Runtime::Uvx).unwrap().version, "0.6.2");
        let docker = server.installation(Runtime::Docker).unwrap();
        assert_eq!(docker.version, "latest");
        assert_eq!(docker.package, "mcp/time");

        assert!(
            provider()
                .resolve("time", &ResolveOptions::new().with_version("0.6.2"))
                .is_ok()
        );
        assert!(
            provider()
                .resolve("time", &ResolveOptions::new().with_version("0.1.0"))
                .is_err()
        );
    }

    #[test]
    fn test_deprecated_when_all_installations_deprecated() {
        let provider = provider();
        let legacy = provider.resolve("legacy-server", &ResolveOptions::new()).unwrap();
        assert!(legacy.deprecated);
        assert_eq!(legacy.name, "legacy-server");

        let filters = Filters::from([("deprecated".to_string(), "false".to_string())]);
        let active = provider.search("*", Some(&filters), &SearchOptions::new()).unwrap();
        let ids: Vec<_> = active.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["time"]);
    }

    #[test]
    fn test_embedded_registry_builds() {
        let provider = MozillaAiProvider::embedded(&default_supported_runtimes()).unwrap();
        assert!(!provider.is_empty());
        for server in provider.search("*", None, &SearchOptions::new()).unwrap() {
            assert_eq!(server.source, PROVIDER_ID);
            assert!(!server.installations.is_empty());
            assert_eq!(server.id, normalize_string(&server.id));
        }
    }
}
