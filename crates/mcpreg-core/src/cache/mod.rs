//! Manifest cache
//!
//! Registry manifests are fetched over HTTP and kept on disk, one file per
//! URL fingerprint, so repeated lookups do not hit the network.
//!
//! - Fingerprint: blake3 of the canonicalised URL (first 16 bytes, hex).
//! - Freshness: an entry is used while `now - mtime < ttl`.
//! - Writes go to a uniquely named temp file in the cache directory and are
//!   renamed into place, so readers see the old bytes or the new bytes, never
//!   a mix.
//! - Concurrent fetches of one fingerprint collapse into a single request
//!   across every cache instance in the process; every waiter receives the
//!   same bytes or the same error.

mod cancel;

use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use tokio::sync::OnceCell;

use crate::error::{RegistryError, Result};
use crate::registry::options::BuildOptions;

pub use cancel::CancelToken;

/// HTTP collaborator used by the cache.
pub trait Fetch: Send + Sync {
    /// Fetch the body at `url`. Non-200 answers are [`RegistryError::Status`].
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// [`Fetch`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mcpreg/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RegistryError::invalid(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RegistryError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| RegistryError::Fetch {
            url: url.to_string(),
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(bytes.to_vec())
    }
}

/// Stable fingerprint of `url`, used as the cache file name.
pub fn fingerprint(url: &str) -> Result<String> {
    let canonical = canonicalize_url(url)?;
    let hash = blake3::hash(canonical.as_bytes());
    Ok(hash.to_hex()[..32].to_string())
}

fn canonicalize_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::invalid("url must not be empty"));
    }
    let parsed = url::Url::parse(trimmed)
        .map_err(|e| RegistryError::invalid(format!("invalid registry URL '{}': {}", trimmed, e)))?;
    Ok(parsed.to_string())
}

type Shared = Arc<OnceCell<Result<Arc<Vec<u8>>>>>;

/// Identity of one in-flight fetch. Callers only join a flight that follows
/// the same cache policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FlightKey {
    cache_dir: PathBuf,
    fingerprint: String,
    use_cache: bool,
    refresh_cache: bool,
}

impl FlightKey {
    fn new(fingerprint: String, options: &BuildOptions) -> Self {
        Self {
            cache_dir: options.cache_dir.clone(),
            fingerprint,
            use_cache: options.use_cache,
            refresh_cache: options.refresh_cache,
        }
    }
}

/// Fetches in progress anywhere in the process.
static IN_FLIGHT: LazyLock<Mutex<HashMap<FlightKey, Shared>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn lock_in_flight() -> MutexGuard<'static, HashMap<FlightKey, Shared>> {
    IN_FLIGHT
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Disk-backed, TTL-bounded cache in front of a [`Fetch`] implementation.
///
/// Concurrent fetches of one URL with the same cache policy share a single
/// request, even across separate `ManifestCache` instances.
pub struct ManifestCache<F = HttpFetcher> {
    fetcher: F,
}

impl<F: Fetch> ManifestCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Path of the cache file for `url` under `options.cache_dir`.
    pub fn entry_path(url: &str, options: &BuildOptions) -> Result<PathBuf> {
        Ok(options.cache_dir.join(format!("{}.json", fingerprint(url)?)))
    }

    /// Return the manifest bytes for `url`, honouring the cache policy in `options`.
    ///
    /// Returns [`RegistryError::Cancelled`] as soon as `options.cancel` fires.
    pub async fn fetch(&self, url: &str, options: &BuildOptions) -> Result<Arc<Vec<u8>>> {
        if options.cancel.is_cancelled() {
            return Err(RegistryError::Cancelled);
        }
        tokio::select! {
            result = self.fetch_shared(url, options) => result,
            _ = options.cancel.cancelled() => Err(RegistryError::Cancelled),
        }
    }

    async fn fetch_shared(&self, url: &str, options: &BuildOptions) -> Result<Arc<Vec<u8>>> {
        let key = FlightKey::new(fingerprint(url)?, options);
        let cell = {
            let mut in_flight = lock_in_flight();
            in_flight.entry(key.clone()).or_default().clone()
        };

        let result = cell
            .get_or_init(|| self.load(url, &key.fingerprint, options))
            .await
            .clone();

        let mut in_flight = lock_in_flight();
        if in_flight
            .get(&key)
            .is_some_and(|current| Arc::ptr_eq(current, &cell))
        {
            in_flight.remove(&key);
        }

        result
    }

    async fn load(&self, url: &str, key: &str, options: &BuildOptions) -> Result<Arc<Vec<u8>>> {
        if !options.use_cache {
            tracing::debug!(url, "registry cache disabled, fetching");
            return self.fetcher.fetch(url).await.map(Arc::new);
        }

        let path = options.cache_dir.join(format!("{}.json", key));

        if !options.refresh_cache {
            match read_fresh(&path, options.cache_ttl) {
                Ok(Some(bytes)) => {
                    tracing::debug!(url, path = %path.display(), "registry cache hit");
                    return Ok(Arc::new(bytes));
                }
                Ok(None) => tracing::debug!(url, "registry cache miss"),
                Err(err) => tracing::warn!(url, %err, "ignoring unreadable registry cache entry"),
            }
        }

        let bytes = self.fetcher.fetch(url).await?;
        if let Err(err) = write_atomic(&options.cache_dir, &path, &bytes) {
            tracing::warn!(url, %err, "failed to write registry cache entry");
        }
        Ok(Arc::new(bytes))
    }
}

/// Read `path` if it exists and is younger than `ttl`.
pub fn read_fresh(path: &Path, ttl: Duration) -> Result<Option<Vec<u8>>> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(RegistryError::cache_io(path, err)),
    };

    let modified = metadata
        .modified()
        .map_err(|e| RegistryError::cache_io(path, e))?;
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);
    if age >= ttl {
        return Ok(None);
    }

    fs::read(path)
        .map(Some)
        .map_err(|e| RegistryError::cache_io(path, e))
}

/// Write `bytes` to `path` via a uniquely named temp file in `dir` and a rename.
///
/// The temp file is removed if the write or the rename fails.
pub fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| RegistryError::cache_io(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".manifest-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| RegistryError::cache_io(dir, e))?;
    if let Err(err) = tmp.write_all(bytes) {
        return Err(RegistryError::cache_io(tmp.path(), err));
    }
    tmp.persist(path)
        .map_err(|e| RegistryError::cache_io(path, e.error))?;
    Ok(())
}

/// Remove every cached manifest in `dir`. Returns how many entries were deleted.
pub fn clear(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(RegistryError::cache_io(dir, err)),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| RegistryError::cache_io(dir, e))?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            fs::remove_file(&path).map_err(|e| RegistryError::cache_io(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}
