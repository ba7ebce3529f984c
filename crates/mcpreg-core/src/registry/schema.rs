//! Registry configuration schema
//!
//! Declares which registries to query and in which order:
//!
//! ```toml
//! [[registry]]
//! type = "mozilla-ai"
//!
//! [[registry]]
//! id = "mcpm"
//! type = "mcpm"
//! url = "https://getmcp.io/api/servers.json"
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::{Fetch, HttpFetcher, ManifestCache};
use crate::error::Result;
use crate::runtime::Runtime;

use super::mcpm::{self, McpmBuilder};
use super::mozilla_ai::{self, MozillaAiBuilder};
use super::{Aggregator, BuildOptions, PackageProvider, ProviderBuilder};

/// Registry types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryType {
    /// mcpm `servers.json`
    Mcpm,
    /// mozilla-ai registry, embedded when no URL is given
    MozillaAi,
}

impl RegistryType {
    /// Provider ID used when an entry does not set one.
    pub fn default_id(&self) -> &'static str {
        match self {
            RegistryType::Mcpm => mcpm::PROVIDER_ID,
            RegistryType::MozillaAi => mozilla_ai::PROVIDER_ID,
        }
    }
}

/// One `[[registry]]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Provider ID; defaults to the type's own ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Registry type
    #[serde(rename = "type")]
    pub kind: RegistryType,

    /// Manifest URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
}

impl RegistryEntry {
    pub fn mcpm(url: Url) -> Self {
        Self {
            id: None,
            kind: RegistryType::Mcpm,
            url: Some(url),
        }
    }

    pub fn mozilla_ai(url: Option<Url>) -> Self {
        Self {
            id: None,
            kind: RegistryType::MozillaAi,
            url,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn provider_id(&self) -> &str {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.kind.default_id())
    }

    /// Validate configuration based on registry type
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.url
            && !matches!(url.scheme(), "http" | "https")
        {
            anyhow::bail!(
                "Registry '{}' url must use http or https, got '{}'",
                self.provider_id(),
                url
            );
        }
        if self.kind == RegistryType::Mcpm && self.url.is_none() {
            anyhow::bail!("mcpm registry '{}' requires 'url' field", self.provider_id());
        }
        Ok(())
    }

    fn url_str(&self) -> String {
        self.url.as_ref().map(Url::to_string).unwrap_or_default()
    }
}

/// Ordered list of registries, as read from `registries.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default, rename = "registry")]
    pub registries: Vec<RegistryEntry>,
}

impl Default for RegistryConfig {
    /// Embedded mozilla-ai registry, then the public mcpm registry.
    fn default() -> Self {
        let mut registries = vec![RegistryEntry::mozilla_ai(None)];
        if let Ok(url) = Url::parse(mcpm::DEFAULT_URL) {
            registries.push(RegistryEntry::mcpm(url));
        }
        Self { registries }
    }
}

impl RegistryConfig {
    /// Read `path`. A missing file yields [`RegistryConfig::default`].
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "registry config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry config: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse registry config: {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: RegistryConfig = toml::from_str(content).context("Invalid registry TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize registry config")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.registries.is_empty() {
            anyhow::bail!("No registries configured");
        }
        let mut seen = HashSet::new();
        for entry in &self.registries {
            entry.validate()?;
            if !seen.insert(entry.provider_id()) {
                anyhow::bail!("Duplicate registry id '{}'", entry.provider_id());
            }
        }
        Ok(())
    }

    /// Build every configured registry over HTTP and wrap them in an [`Aggregator`].
    pub async fn build(
        &self,
        options: &BuildOptions,
        runtimes: &BTreeSet<Runtime>,
    ) -> anyhow::Result<Aggregator> {
        let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
        self.build_with_cache(options, runtimes, Arc::new(ManifestCache::new(fetcher)))
            .await
    }

    /// Like [`build`](Self::build), sharing `cache` between every provider.
    ///
    /// A registry that cannot be reached (fetch, HTTP status or cache I/O
    /// failure) is logged and left out. Invalid input, undecodable data and
    /// cancellation abort the build, as does every registry failing.
    pub async fn build_with_cache<F: Fetch + 'static>(
        &self,
        options: &BuildOptions,
        runtimes: &BTreeSet<Runtime>,
        cache: Arc<ManifestCache<F>>,
    ) -> anyhow::Result<Aggregator> {
        self.validate()?;

        let mut providers: Vec<Box<dyn PackageProvider>> = Vec::with_capacity(self.registries.len());
        let mut last_skipped = None;
        for entry in &self.registries {
            let id = entry.provider_id();
            match build_entry(entry, options, runtimes, &cache).await {
                Ok(provider) => providers.push(provider),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(registry = id, %err, "skipping unreachable registry");
                    last_skipped = Some((id, err));
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("Failed to build registry '{}'", id));
                }
            }
        }

        if providers.is_empty()
            && let Some((id, err)) = last_skipped
        {
            return Err(err).with_context(|| format!("Failed to build registry '{}'", id));
        }

        Ok(Aggregator::new(providers)?)
    }
}

async fn build_entry<F: Fetch + 'static>(
    entry: &RegistryEntry,
    options: &BuildOptions,
    runtimes: &BTreeSet<Runtime>,
    cache: &Arc<ManifestCache<F>>,
) -> Result<Box<dyn PackageProvider>> {
    let id = entry.provider_id();
    let provider: Box<dyn PackageProvider> = match entry.kind {
        RegistryType::Mcpm => Box::new(
            McpmBuilder::new(entry.url_str(), runtimes.clone(), cache.clone())
                .with_id(id)
                .build(options)
                .await?,
        ),
        RegistryType::MozillaAi => Box::new(
            MozillaAiBuilder::new(entry.url_str(), runtimes.clone(), cache.clone())
                .with_id(id)
                .build(options)
                .await?,
        ),
    };
    Ok(provider)
}
