//! Error types for registry discovery.
//!
//! Every failure the core can surface is a variant of [`RegistryError`]. The
//! type is `Clone` so a single in-flight fetch can hand the same outcome to
//! every caller waiting on it.

use thiserror::Error;

/// Errors produced by providers, the aggregator and the manifest cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Caller supplied something unusable (empty name, empty runtime set, ...).
    #[error("{0}")]
    InvalidInput(String),

    /// HTTP transport failure.
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Upstream answered with something other than 200.
    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    /// Upstream JSON could not be decoded.
    #[error("{provider}: failed to decode registry data: {message}")]
    Decode { provider: String, message: String },

    /// ID missing from a provider's backing data.
    #[error("{provider}: server '{name}' not found")]
    NotFound { provider: String, name: String },

    /// Record exists but the requested filters reject it.
    #[error("{provider}: server '{name}' does not match requested filters")]
    FilterMismatch { provider: String, name: String },

    /// No child of the aggregator could resolve the request.
    #[error("package '{name}', version '{version}', runtime '{runtime}' not found in any registry")]
    NotFoundInAnyRegistry {
        name: String,
        version: String,
        runtime: String,
    },

    /// Disk read or write error inside the manifest cache.
    #[error("cache I/O error at {path}: {message}")]
    CacheIo { path: String, message: String },

    /// Some requested values are absent from the available set.
    #[error("missing values: {}", .0.join(", "))]
    MissingValues(Vec<String>),

    /// Every requested value is absent from the available set.
    #[error("none of the requested values were found")]
    NoRequestedValues,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl RegistryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn decode(provider: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }

    pub fn cache_io(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::CacheIo {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// Runtime errors that the aggregator may skip over when it has more
    /// providers to try. Construction-fatal kinds return `false`.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. }
                | Self::Status { .. }
                | Self::NotFound { .. }
                | Self::FilterMismatch { .. }
                | Self::CacheIo { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
