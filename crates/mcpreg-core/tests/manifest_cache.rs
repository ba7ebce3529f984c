//! Manifest cache behaviour through the public provider builders.

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use mcpreg_core::cache::{CancelToken, ManifestCache};
use mcpreg_core::error::RegistryError;
use mcpreg_core::registry::mcpm::McpmBuilder;
use mcpreg_core::registry::{BuildOptions, PackageProvider, ProviderBuilder, ResolveOptions};
use mcpreg_core::runtime::{Runtime, default_supported_runtimes};

use support::{MCPM_MANIFEST, MCPM_URL, StaticFetcher};

fn options(tmp: &TempDir) -> BuildOptions {
    BuildOptions::default()
        .with_cache_dir(tmp.path().to_path_buf())
        .with_cache_ttl(Duration::from_secs(60 * 60))
}

fn builder(cache: &Arc<ManifestCache<StaticFetcher>>) -> McpmBuilder<StaticFetcher> {
    McpmBuilder::new(MCPM_URL, default_supported_runtimes(), cache.clone())
}

// =========================================================================
// TTL
// =========================================================================

#[tokio::test]
async fn fetches_once_within_ttl_and_again_after_expiry() {
    let tmp = TempDir::new().unwrap();
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new().with_body(MCPM_URL, MCPM_MANIFEST),
    ));
    let opts = options(&tmp);

    let first = builder(&cache).build(&opts).await.unwrap();
    first.resolve("time", &ResolveOptions::new()).unwrap();
    let second = builder(&cache).build(&opts).await.unwrap();
    second.resolve("time", &ResolveOptions::new()).unwrap();
    assert_eq!(cache.fetcher().calls(), 1);

    let entry = ManifestCache::<StaticFetcher>::entry_path(MCPM_URL, &opts).unwrap();
    let expired = SystemTime::now() - Duration::from_secs(2 * 60 * 60);
    filetime::set_file_mtime(&entry, FileTime::from_system_time(expired)).unwrap();

    let third = builder(&cache).build(&opts).await.unwrap();
    third.resolve("time", &ResolveOptions::new()).unwrap();
    assert_eq!(cache.fetcher().calls(), 2);

    let rewritten = std::fs::metadata(&entry).unwrap().modified().unwrap();
    assert!(rewritten > expired + Duration::from_secs(60 * 60));
    assert_eq!(std::fs::read(&entry).unwrap(), MCPM_MANIFEST.as_bytes());
}

#[tokio::test]
async fn refresh_and_disabled_cache_bypass_disk() {
    let tmp = TempDir::new().unwrap();
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new().with_body(MCPM_URL, MCPM_MANIFEST),
    ));

    builder(&cache).build(&options(&tmp)).await.unwrap();
    builder(&cache)
        .build(&options(&tmp).with_refresh_cache(true))
        .await
        .unwrap();
    assert_eq!(cache.fetcher().calls(), 2);

    let uncached = TempDir::new().unwrap();
    builder(&cache)
        .build(&options(&uncached).with_use_cache(false))
        .await
        .unwrap();
    assert_eq!(cache.fetcher().calls(), 3);
    assert_eq!(std::fs::read_dir(uncached.path()).unwrap().count(), 0);
}

// =========================================================================
// Single flight
// =========================================================================

#[tokio::test]
async fn concurrent_builds_share_one_fetch() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new()
            .with_body(MCPM_URL, MCPM_MANIFEST)
            .gated(gate.clone()),
    ));
    let opts = options(&tmp);

    let release = async {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(10);
    };

    let (first, second, third) = (builder(&cache), builder(&cache), builder(&cache));
    let (a, b, c, ()) = tokio::join!(
        first.build(&opts),
        second.build(&opts),
        third.build(&opts),
        release,
    );

    assert_eq!(cache.fetcher().calls(), 1);
    for provider in [a.unwrap(), b.unwrap(), c.unwrap()] {
        assert_eq!(provider.len(), 4);
    }
}

#[tokio::test]
async fn separate_cache_instances_share_one_fetch() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let fetcher = || {
        StaticFetcher::new()
            .with_body(MCPM_URL, MCPM_MANIFEST)
            .gated(gate.clone())
    };
    let left = Arc::new(ManifestCache::new(fetcher()));
    let right = Arc::new(ManifestCache::new(fetcher()));
    let opts = options(&tmp);

    let release = async {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(10);
    };

    let (first, second) = (builder(&left), builder(&right));
    let (a, b, ()) = tokio::join!(first.build(&opts), second.build(&opts), release);

    assert_eq!(left.fetcher().calls() + right.fetcher().calls(), 1);
    assert_eq!(a.unwrap().len(), 4);
    assert_eq!(b.unwrap().len(), 4);
}

#[tokio::test]
async fn refresh_does_not_join_a_cached_flight() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new()
            .with_body(MCPM_URL, MCPM_MANIFEST)
            .gated(gate.clone()),
    ));
    let opts = options(&tmp);
    let refresh_opts = options(&tmp).with_refresh_cache(true);

    let release = async {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        gate.add_permits(10);
    };

    let (plain, refresh) = (builder(&cache), builder(&cache));
    let (a, b, ()) = tokio::join!(plain.build(&opts), refresh.build(&refresh_opts), release);

    assert_eq!(cache.fetcher().calls(), 2);
    a.unwrap();
    b.unwrap();
}

#[tokio::test]
async fn fetch_errors_are_shared_but_not_cached() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let cache = Arc::new(ManifestCache::new(StaticFetcher::new().gated(gate.clone())));
    let opts = options(&tmp);

    let release = async {
        tokio::task::yield_now().await;
        gate.add_permits(10);
    };
    let (first, second) = (builder(&cache), builder(&cache));
    let (a, b, ()) = tokio::join!(first.build(&opts), second.build(&opts), release);
    let a = a.unwrap_err();
    assert!(matches!(a, RegistryError::Status { status: 404, .. }));
    assert_eq!(b.unwrap_err(), a);

    builder(&cache).build(&opts).await.unwrap_err();
    assert_eq!(cache.fetcher().calls(), 2);
}

// =========================================================================
// Cancellation
// =========================================================================

#[tokio::test]
async fn cancellation_releases_the_fetch_without_writing() {
    let tmp = TempDir::new().unwrap();
    let gate = Arc::new(Semaphore::new(0));
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new()
            .with_body(MCPM_URL, MCPM_MANIFEST)
            .gated(gate.clone()),
    ));
    let token = CancelToken::new();
    let opts = options(&tmp).with_cancel_token(token.clone());

    let cancel = async {
        tokio::task::yield_now().await;
        token.cancel();
    };
    let pending = builder(&cache);
    let (result, ()) = tokio::join!(pending.build(&opts), cancel);

    assert_eq!(result.unwrap_err(), RegistryError::Cancelled);
    assert_eq!(std::fs::read_dir(tmp.path()).map(|d| d.count()).unwrap_or(0), 0);

    gate.add_permits(10);
    let provider = builder(&cache).build(&options(&tmp)).await.unwrap();
    assert_eq!(provider.len(), 4);
    assert_eq!(cache.fetcher().calls(), 2);
}

#[tokio::test]
async fn empty_runtime_intersection_fails_before_fetching() {
    let tmp = TempDir::new().unwrap();
    let cache = Arc::new(ManifestCache::new(
        StaticFetcher::new().with_body(MCPM_URL, MCPM_MANIFEST),
    ));

    let err = McpmBuilder::new(MCPM_URL, BTreeSet::from([Runtime::Python]), cache.clone())
        .build(&options(&tmp))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::InvalidInput(_)));
    assert_eq!(cache.fetcher().calls(), 0);
}
