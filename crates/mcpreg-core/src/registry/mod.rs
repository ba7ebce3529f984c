//! Registry providers
//!
//! A provider turns one upstream registry into canonical [`Server`] records
//! and answers `resolve`/`search` over them. The [`Aggregator`] composes
//! several providers behind the same interface.

pub mod aggregator;
pub mod catalog;
pub mod mcpm;
pub mod mozilla_ai;
pub mod options;
pub mod schema;

use std::future::Future;

use crate::error::Result;
use crate::filter::Filters;
use crate::packages::Server;

pub use aggregator::Aggregator;
pub use options::{BuildOptions, ResolveOptions, SearchOptions, resolve_filters};
pub use schema::{RegistryConfig, RegistryEntry, RegistryType};

/// Capability set every registry exposes.
///
/// Providers are immutable once built; both operations are pure lookups and
/// may run concurrently.
pub trait PackageProvider: Send + Sync {
    /// Stable identifier, also stamped into [`Server::source`].
    fn id(&self) -> &str;

    /// Find one server by ID, subject to the runtime/version options.
    fn resolve(&self, name: &str, options: &ResolveOptions) -> Result<Server>;

    /// Every server matching `name` (or `*`) and `filters`, in iteration order.
    fn search(
        &self,
        name: &str,
        filters: Option<&Filters>,
        options: &SearchOptions,
    ) -> Result<Vec<Server>>;
}

/// Constructs a provider, loading its manifest through the cache.
pub trait ProviderBuilder {
    type Provider: PackageProvider + 'static;

    fn build(&self, options: &BuildOptions) -> impl Future<Output = Result<Self::Provider>> + Send;
}
