use crate::error::Result;
use crate::OgData;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const RESULTS_NAMESPACE: &str = "results";
pub const DISABLED_NAMESPACE: &str = "disabled";

/// Durable string-keyed store of JSON values. Every call is atomic per key.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Process-lifetime store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Reads are served from memory. Each mutation writes a full snapshot to a
/// sibling temp file and renames it over the original, so a crash leaves
/// either the old or the new snapshot on disk.
pub struct JsonFileStore {
    path: PathBuf,
    entries: DashMap<String, Value>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => DashMap::new(),
            Ok(bytes) => {
                let map: HashMap<String, Value> = serde_json::from_slice(&bytes)?;
                map.into_iter().collect()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => DashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened JSON cache store");
        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let snapshot: BTreeMap<String, Value> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let bytes = serde_json::to_vec(&snapshot)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist().await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.persist().await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        self.persist().await
    }
}

/// The two cache namespaces: fetched metadata and permanently disabled URLs.
#[derive(Clone)]
pub struct Cache {
    results: Arc<dyn KvStore>,
    disabled: Arc<dyn KvStore>,
}

impl Cache {
    pub fn new(results: Arc<dyn KvStore>, disabled: Arc<dyn KvStore>) -> Self {
        Self { results, disabled }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// Opens `results.json` and `disabled.json` under `dir`.
    pub async fn open_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let results = JsonFileStore::open(dir.join(format!("{RESULTS_NAMESPACE}.json"))).await?;
        let disabled = JsonFileStore::open(dir.join(format!("{DISABLED_NAMESPACE}.json"))).await?;
        Ok(Self::new(Arc::new(results), Arc::new(disabled)))
    }

    pub async fn result(&self, url: &str) -> Result<Option<OgData>> {
        let Some(value) = self.results.get(url).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!(url = %url, error = %e, "Ignoring malformed cached metadata");
                Ok(None)
            }
        }
    }

    pub async fn store_result(&self, url: &str, data: &OgData) -> Result<()> {
        self.results.set(url, serde_json::to_value(data)?).await
    }

    pub async fn is_disabled(&self, url: &str) -> Result<bool> {
        Ok(self.disabled.get(url).await?.is_some())
    }

    pub async fn disable(&self, url: &str) -> Result<()> {
        self.disabled.set(url, Value::String(String::new())).await
    }

    /// Lifts the disabled marker so the next resolution fetches again.
    pub async fn enable(&self, url: &str) -> Result<()> {
        self.disabled.remove(url).await
    }

    pub async fn clear_disabled(&self) -> Result<()> {
        self.disabled.clear().await
    }

    pub async fn invalidate(&self, url: &str) -> Result<()> {
        self.results.remove(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OgData {
        OgData {
            title: "Example".into(),
            description: "An example page".into(),
            image: String::new(),
            image_alt: String::new(),
            canonical_url: "https://example.com/".into(),
            base_url: "https://example.com".into(),
        }
    }

    #[tokio::test]
    async fn namespaces_are_independent() {
        let cache = Cache::in_memory();
        cache.disable("https://a.com").await.unwrap();

        assert!(cache.is_disabled("https://a.com").await.unwrap());
        assert!(cache.result("https://a.com").await.unwrap().is_none());

        cache.store_result("https://b.com", &sample()).await.unwrap();
        assert!(!cache.is_disabled("https://b.com").await.unwrap());
    }

    #[tokio::test]
    async fn stored_metadata_round_trips_with_empty_image() {
        let cache = Cache::in_memory();
        let data = sample();
        cache.store_result("https://example.com", &data).await.unwrap();

        let loaded = cache.result("https://example.com").await.unwrap().unwrap();
        assert_eq!(loaded, data);
        assert_eq!(loaded.image, "");
    }

    #[tokio::test]
    async fn malformed_value_reads_as_absent() {
        let results = Arc::new(MemoryStore::new());
        results
            .set("https://x.com", Value::String("garbage".into()))
            .await
            .unwrap();
        let cache = Cache::new(results, Arc::new(MemoryStore::new()));

        assert!(cache.result("https://x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enable_lifts_disabled_marker() {
        let cache = Cache::in_memory();
        cache.disable("https://a.com").await.unwrap();
        cache.enable("https://a.com").await.unwrap();
        assert!(!cache.is_disabled("https://a.com").await.unwrap());
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let cache = Cache::open_dir(dir.path()).await.unwrap();
            cache.store_result("https://example.com", &sample()).await.unwrap();
            cache.disable("https://broken.com").await.unwrap();
        }

        let cache = Cache::open_dir(dir.path()).await.unwrap();
        assert_eq!(
            cache.result("https://example.com").await.unwrap(),
            Some(sample())
        );
        assert!(cache.is_disabled("https://broken.com").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_sets_keep_file_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("results.json")).await.unwrap());

        let writes = (0..20).map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .set(&format!("https://site{i}.com"), Value::from(i))
                    .await
                    .unwrap();
            })
        });
        for handle in futures::future::join_all(writes).await {
            handle.unwrap();
        }

        let reopened = JsonFileStore::open(store.path()).await.unwrap();
        for i in 0..20 {
            assert_eq!(
                reopened.get(&format!("https://site{i}.com")).await.unwrap(),
                Some(Value::from(i))
            );
        }
    }
}
