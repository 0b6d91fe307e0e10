//! End-to-end scenarios: a host running successive worker versions against
//! an in-memory cache storage and a scripted network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderValue, RANGE};
use sw_sdk::prelude::*;
use url::Url;

const ROOT: &str = "https://app.example.com/";
const SETTINGS: &str = "https://app.example.com/settings";
const APP_JS: &str = "https://app.example.com/app.js";
const LOCATION: &str = "https://app.example.com/service-worker.js";

/// Cache storage that counts every `open`.
#[derive(Default)]
struct CountingStorage {
    inner: MemoryCacheStorage,
    opens: AtomicUsize,
}

impl CountingStorage {
    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for CountingStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn Cache>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open(name).await
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        self.inner.has(name).await
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        self.inner.delete(name).await
    }
}

struct Harness {
    storage: Arc<CountingStorage>,
    network: Arc<MockNetwork>,
    host: WorkerHost,
}

impl Harness {
    fn new() -> Self {
        let storage = Arc::new(CountingStorage::default());
        let network = Arc::new(MockNetwork::new());
        network
            .respond(ROOT, Response::ok("<html>home</html>").with_content_type("text/html"))
            .respond(SETTINGS, Response::ok("<html>settings</html>").with_content_type("text/html"))
            .respond(APP_JS, Response::ok("app v1").with_content_type("text/javascript"));
        let host = WorkerHost::new(storage.clone(), network.clone());
        Self {
            storage,
            network,
            host,
        }
    }

    fn worker(&self, config: &WorkerConfig) -> anyhow::Result<AssetWorker> {
        let location = Url::parse(LOCATION)?;
        Ok(AssetWorker::new(config, location, self.host.services())?)
    }

    async fn register(&self, version: &str) -> anyhow::Result<Registration> {
        let worker = self.worker(&config(version, &["/app.js"]))?;
        Ok(self.host.register(worker).await?)
    }

    fn cache(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.storage.inner.cache(name)
    }
}

fn config(version: &str, build: &[&str]) -> WorkerConfig {
    WorkerConfig::new(BuildManifest::new(version).with_build(build.iter().copied()))
        .with_precache(PrecacheConfig::default().with_external_assets(Vec::<String>::new()))
}

fn get(url: &str) -> FetchRequest {
    FetchRequest::parse_get(url).expect("valid test URL")
}

#[tokio::test]
async fn install_caches_exactly_the_manifest() -> anyhow::Result<()> {
    let harness = Harness::new();
    let registration = harness.register("V1").await?;
    assert!(matches!(registration, Registration::Activated(_)));

    let cache = harness.cache("cacheV1").expect("cacheV1 exists");
    let keys: Vec<String> = cache
        .keys()
        .await?
        .iter()
        .map(|key| key.to_string())
        .collect();
    let mut keys = keys;
    keys.sort();
    assert_eq!(keys, vec![ROOT, APP_JS, SETTINGS]);

    let report = registration.worker().install_report().expect("install report");
    assert_eq!(report.cache_name, "cacheV1");
    assert_eq!(report.entries, 3);
    Ok(())
}

#[tokio::test]
async fn cached_hit_is_served_then_replaced() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;

    harness.network.forget(APP_JS);
    harness.network.respond(APP_JS, Response::ok("app v2"));
    let before = harness.network.calls(APP_JS);

    let outcome = harness.host.dispatch(get(APP_JS)).await?;
    assert_eq!(outcome.interception, Some(Interception::Handle));
    assert_eq!(outcome.response.text(), Some("app v1"));

    // The paired network fetch has resolved once dispatch returns.
    assert_eq!(harness.network.calls(APP_JS) - before, 1);
    let stored = harness.cache("cacheV1").and_then(|c| c.get(APP_JS));
    assert_eq!(stored.and_then(|r| r.text().map(str::to_owned)).as_deref(), Some("app v2"));

    let next = harness.host.fetch(get(APP_JS)).await?;
    assert_eq!(next.text(), Some("app v2"));
    Ok(())
}

#[tokio::test]
async fn activation_leaves_only_the_current_generation() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.storage.open("cacheV0").await?;

    let registration = harness.register("V1").await?;
    assert_eq!(harness.storage.keys().await?, vec!["cacheV1"]);

    let report = registration.worker().activation_report().expect("activation report");
    assert_eq!(report.deleted, vec!["cacheV0"]);
    assert!(report.failed.is_empty());
    Ok(())
}

#[tokio::test]
async fn new_version_removes_previous_generation() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.host.clients().open("tab-1", ROOT);

    let first = harness.register("V1").await?;
    harness.register("V2").await?;

    assert!(!harness.storage.has("cacheV1").await?);
    assert!(harness.storage.has("cacheV2").await?);
    assert_eq!(first.worker().state(), WorkerState::Redundant);
    assert_eq!(harness.host.clients().controlled_count(), 1);
    Ok(())
}

#[tokio::test]
async fn range_request_never_touches_the_cache() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;
    let opens = harness.storage.opens();
    let calls = harness.network.total_calls();

    let request = get(APP_JS).with_header(RANGE, HeaderValue::from_static("bytes=0-3"));
    let outcome = harness.host.dispatch(request).await?;

    assert_eq!(
        outcome.interception,
        Some(Interception::Pass(PassReason::RangeRequest))
    );
    assert_eq!(harness.storage.opens(), opens);
    assert_eq!(harness.network.total_calls(), calls + 1);
    Ok(())
}

#[tokio::test]
async fn uncached_only_if_cached_request_is_a_network_error() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;
    let calls = harness.network.total_calls();

    let uncached = get("https://app.example.com/api/items")
        .with_cache_mode(RequestCacheMode::OnlyIfCached);
    let result = harness.host.fetch(uncached).await;

    assert!(matches!(result, Err(ref e) if e.is_network()));
    assert_eq!(harness.network.total_calls(), calls);

    let static_request = get(APP_JS).with_cache_mode(RequestCacheMode::OnlyIfCached);
    let response = harness.host.fetch(static_request).await?;
    assert_eq!(response.text(), Some("app v1"));
    Ok(())
}

#[tokio::test]
async fn failed_install_keeps_previous_version_active() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;

    let broken = harness.worker(&config("V2", &["/app.js", "/missing.js"]))?;
    let result = harness.host.register(broken).await;
    assert!(matches!(result, Err(WorkerError::InstallFailed { .. })));

    let active = harness.host.active().expect("previous worker still active");
    assert_eq!(active.version(), "V1");
    assert_eq!(active.state(), WorkerState::Active);
    assert!(harness.storage.has("cacheV1").await?);
    assert_eq!(harness.cache("cacheV1").map(|c| c.len()), Some(3));

    let response = harness.host.fetch(get(ROOT)).await?;
    assert_eq!(response.text(), Some("<html>home</html>"));
    Ok(())
}

#[tokio::test]
async fn miss_with_network_failure_is_a_network_error() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;

    let result = harness
        .host
        .fetch(get("https://app.example.com/api/items"))
        .await;
    assert!(matches!(result, Err(WorkerError::Network(_))));

    let snapshot = harness.host.active().expect("active").metrics().snapshot();
    assert_eq!(snapshot.cache_misses, 1);
    assert_eq!(snapshot.revalidation_failures, 1);
    Ok(())
}

#[tokio::test]
async fn dev_server_traffic_is_left_alone() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;
    harness
        .network
        .respond("https://app.example.com:5173/@vite/client", Response::ok("hmr"));

    let outcome = harness
        .host
        .dispatch(get("https://app.example.com:5173/@vite/client"))
        .await?;
    assert_eq!(
        outcome.interception,
        Some(Interception::Pass(PassReason::DevServer))
    );
    assert_eq!(outcome.response.text(), Some("hmr"));
    assert!(harness
        .cache("cacheV1")
        .and_then(|c| c.get("https://app.example.com:5173/@vite/client"))
        .is_none());
    Ok(())
}

#[tokio::test]
async fn worker_from_toml_config() -> anyhow::Result<()> {
    let harness = Harness::new();
    let config = WorkerConfig::from_toml_str(
        r#"
        [build]
        version = "1700000000"
        build = ["/app.js"]
        files = ["/icons/apple-touch-icon.png"]

        [precache]
        external_assets = []
        "#,
    )?;
    let worker = harness.worker(&config)?;
    assert_eq!(worker.cache_name().as_str(), "cache1700000000");
    assert_eq!(worker.manifest().len(), 3);

    harness.host.register(worker).await?;
    assert!(harness.storage.has("cache1700000000").await?);
    Ok(())
}

#[tokio::test]
async fn metrics_snapshot_serializes() -> anyhow::Result<()> {
    let harness = Harness::new();
    harness.register("V1").await?;
    harness.host.fetch(get(APP_JS)).await?;

    let snapshot = harness.host.active().expect("active").metrics().snapshot();
    assert_eq!(snapshot.precached, 3);
    assert_eq!(snapshot.cache_hits, 1);

    let json: serde_json::Value = serde_json::from_str(&snapshot.to_json())?;
    assert_eq!(json["cache_hits"], 1);
    Ok(())
}
