//! Meta-provider composing several registries.

use std::collections::HashSet;

use crate::error::{RegistryError, Result};
use crate::filter::{Filters, normalize_string};
use crate::packages::Server;

use super::{PackageProvider, ResolveOptions, SearchOptions};

/// Provider ID of the aggregator itself.
pub const AGGREGATOR_ID: &str = "aggregator";

/// Routes queries to child providers kept in registration order.
///
/// A `source` option sends the query to one child. Otherwise `resolve` returns
/// the first child's success and `search` concatenates every child's results.
pub struct Aggregator {
    providers: Vec<Box<dyn PackageProvider>>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("providers", &self.provider_ids())
            .finish()
    }
}

impl Aggregator {
    /// Fails when two children share an ID.
    pub fn new(providers: Vec<Box<dyn PackageProvider>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.id().to_string()) {
                return Err(RegistryError::invalid(format!(
                    "duplicate provider ID '{}'",
                    provider.id()
                )));
            }
        }
        Ok(Self { providers })
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn provider(&self, source: &str) -> Result<&dyn PackageProvider> {
        self.providers
            .iter()
            .find(|p| p.id() == source)
            .map(|p| p.as_ref())
            .ok_or_else(|| RegistryError::invalid(format!("unknown registry source '{}'", source)))
    }
}

impl PackageProvider for Aggregator {
    fn id(&self) -> &str {
        AGGREGATOR_ID
    }

    fn resolve(&self, name: &str, options: &ResolveOptions) -> Result<Server> {
        require_name(name)?;
        if let Some(source) = &options.source {
            return self.provider(source)?.resolve(name, options);
        }

        for provider in &self.providers {
            match provider.resolve(name, options) {
                Ok(server) => return Ok(server),
                Err(err) => {
                    tracing::warn!(provider = provider.id(), name, %err, "registry could not resolve server");
                }
            }
        }

        Err(RegistryError::NotFoundInAnyRegistry {
            name: name.trim().to_string(),
            version: options.version.clone().unwrap_or_default(),
            runtime: options
                .runtime
                .map(|r| r.as_str().to_string())
                .unwrap_or_default(),
        })
    }

    fn search(
        &self,
        name: &str,
        filters: Option<&Filters>,
        options: &SearchOptions,
    ) -> Result<Vec<Server>> {
        require_name(name)?;
        if let Some(source) = &options.source {
            return self.provider(source)?.search(name, filters, options);
        }

        let mut results = Vec::new();
        for provider in &self.providers {
            match provider.search(name, filters, options) {
                Ok(found) => results.extend(found),
                Err(err) => {
                    tracing::warn!(provider = provider.id(), name, %err, "registry search failed");
                }
            }
        }
        Ok(results)
    }
}

fn require_name(name: &str) -> Result<()> {
    if normalize_string(name).is_empty() {
        return Err(RegistryError::invalid("name must not be empty"));
    }
    Ok(())
}
