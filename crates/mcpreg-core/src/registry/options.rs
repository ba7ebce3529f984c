//! Option records for building providers and querying them.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CancelToken;
use crate::filter::{Filters, keys};
use crate::runtime::Runtime;

/// Default freshness bound for cached manifests.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// `<user cache dir>/mcpreg/registries`, or the temp dir when no cache dir exists.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mcpreg")
        .join("registries")
}

/// Cache policy and cancellation for provider construction.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub use_cache: bool,
    pub refresh_cache: bool,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub cancel: CancelToken,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            refresh_cache: false,
            cache_dir: default_cache_dir(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cancel: CancelToken::new(),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_refresh_cache(mut self, refresh: bool) -> Self {
        self.refresh_cache = refresh;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = dir;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }
}

/// Narrowing applied by `resolve`. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    pub runtime: Option<Runtime>,
    pub version: Option<String>,
    pub source: Option<String>,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Blank versions are ignored.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        if !version.trim().is_empty() {
            self.version = Some(version.trim().to_string());
        }
        self
    }

    /// Blank sources are ignored.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !source.trim().is_empty() {
            self.source = Some(source.trim().to_string());
        }
        self
    }
}

/// Routing applied by `search`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub source: Option<String>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank sources are ignored.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !source.trim().is_empty() {
            self.source = Some(source.trim().to_string());
        }
        self
    }
}

/// Project resolve options onto the `runtime` and `version` filter keys.
pub fn resolve_filters(options: &ResolveOptions) -> Filters {
    let mut filters = Filters::new();
    if let Some(runtime) = options.runtime {
        filters.insert(keys::RUNTIME.to_string(), runtime.as_str().to_string());
    }
    if let Some(version) = &options.version {
        filters.insert(keys::VERSION.to_string(), version.clone());
    }
    filters
}
