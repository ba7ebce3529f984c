//! Shared lookup and matching over a provider's built servers.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{RegistryError, Result};
use crate::filter::{Filters, MatchOptions, match_item, normalize_string, prepare_filters};
use crate::packages::Server;
use crate::runtime::Runtime;

use super::options::{ResolveOptions, resolve_filters};

/// Provider-specific adjustment of prepared filters.
pub type FilterMutator = fn(&mut Filters);

/// Immutable server map plus the matching rules of one provider.
pub struct Catalog {
    id: String,
    servers: BTreeMap<String, Server>,
    match_options: MatchOptions<Server>,
    mutate: Option<FilterMutator>,
}

impl Catalog {
    pub fn new(id: &str, match_options: MatchOptions<Server>) -> Self {
        Self {
            id: id.to_string(),
            servers: BTreeMap::new(),
            match_options,
            mutate: None,
        }
    }

    pub fn with_mutator(mut self, mutate: FilterMutator) -> Self {
        self.mutate = Some(mutate);
        self
    }

    /// Add a built server. A later server with the same ID replaces the earlier one.
    pub fn insert(&mut self, server: Server) {
        if self.servers.contains_key(&server.id) {
            tracing::warn!(provider = %self.id, id = %server.id, "duplicate server ID, keeping the last");
        }
        self.servers.insert(server.id.clone(), server);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Server> {
        self.servers.get(&normalize_string(id))
    }

    fn prepare(&self, filters: Option<&Filters>, name: &str) -> Filters {
        let mutate = self.mutate.as_ref().map(|m| m as &dyn Fn(&mut Filters));
        prepare_filters(filters, name, mutate)
    }

    pub fn resolve(&self, name: &str, options: &ResolveOptions) -> Result<Server> {
        let name = require_name(name)?;
        let server = self.servers.get(&name).ok_or_else(|| RegistryError::NotFound {
            provider: self.id.clone(),
            name: name.clone(),
        })?;

        let filters = self.prepare(Some(&resolve_filters(options)), &name);
        if !match_item(server, Some(&filters), &self.match_options)? {
            return Err(RegistryError::FilterMismatch {
                provider: self.id.clone(),
                name,
            });
        }
        Ok(server.clone())
    }

    pub fn search(&self, name: &str, filters: Option<&Filters>) -> Result<Vec<Server>> {
        let name = require_name(name)?;
        let filters = self.prepare(filters, &name);

        let mut matches = Vec::new();
        for server in self.servers.values() {
            if match_item(server, Some(&filters), &self.match_options)? {
                matches.push(server.clone());
            }
        }
        Ok(matches)
    }
}

fn require_name(name: &str) -> Result<String> {
    let name = normalize_string(name);
    if name.is_empty() {
        return Err(RegistryError::invalid("name must not be empty"));
    }
    Ok(name)
}

/// Runtimes both requested by the caller and offered by the provider.
///
/// Fails when the intersection is empty.
pub fn validate_runtimes(
    provider: &str,
    requested: &BTreeSet<Runtime>,
    offered: &[Runtime],
) -> Result<BTreeSet<Runtime>> {
    let supported: BTreeSet<Runtime> = offered
        .iter()
        .copied()
        .filter(|r| requested.contains(r))
        .collect();
    if supported.is_empty() {
        let offered: Vec<_> = offered.iter().map(Runtime::as_str).collect();
        return Err(RegistryError::invalid(format!(
            "{}: none of the requested runtimes are supported (supported: {})",
            provider,
            offered.join(", ")
        )));
    }
    Ok(supported)
}
