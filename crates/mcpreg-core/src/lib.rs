//! mcpreg Core Library
//!
//! Discovers MCP servers across heterogeneous registries and normalises them
//! into one canonical [`packages::Server`] record, with a shared filter
//! algebra, argument classification and a disk-backed manifest cache.

pub mod cache;
pub mod classifier;
pub mod error;
pub mod filter;
pub mod packages;
pub mod registry;
pub mod runtime;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{RegistryError, Result};

    // Canonical model
    pub use crate::packages::{
        ArgumentMetadata, Arguments, Installation, Installations, Server, Tool, Tools, Transport,
        Transports, VariableType,
    };

    // Runtimes
    pub use crate::runtime::{Runtime, default_supported_runtimes, parse_runtimes};

    // Filters
    pub use crate::filter::{Filters, MatchOptions, keys, match_item};

    // Registries
    pub use crate::cache::{CancelToken, ManifestCache};
    pub use crate::registry::mcpm::{McpmBuilder, McpmProvider};
    pub use crate::registry::mozilla_ai::{MozillaAiBuilder, MozillaAiProvider};
    pub use crate::registry::{
        Aggregator, BuildOptions, PackageProvider, ProviderBuilder, RegistryConfig, RegistryEntry,
        RegistryType, ResolveOptions, SearchOptions,
    };
}
