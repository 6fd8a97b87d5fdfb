use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use fuserank_core::ScoredCandidate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// the key covers the query and the ordered candidate texts; reordering the
// texts changes the key, there is no normalization
pub fn cache_key(query: &str, texts: &[String]) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    for text in texts {
        hasher.update([0x1f]);
        hasher.update(text.as_bytes());
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    CacheKey(out)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// expiry is evaluated lazily against the ttl supplied on read; nothing
// sweeps entries proactively
pub trait RerankCache: Send {
    fn get(&mut self, key: &CacheKey, ttl: Duration) -> Option<Vec<ScoredCandidate>>;
    fn put(&mut self, key: &CacheKey, value: &[ScoredCandidate]) -> Result<(), CacheError>;
    fn stats(&self) -> Value;
}

pub fn build_cache(
    backend: &str,
    capacity: usize,
    path: Option<&Path>,
) -> Result<Box<dyn RerankCache>, CacheError> {
    let default_path = Path::new("fuserank-cache.json");
    match backend.trim().to_ascii_lowercase().as_str() {
        "volatile" | "memory" => Ok(Box::new(VolatileCache::new(capacity))),
        "durable" | "disk" => Ok(Box::new(DurableCache::open(path.unwrap_or(default_path))?)),
        "tiered" => Ok(Box::new(TieredCache::open(
            capacity,
            path.unwrap_or(default_path),
        )?)),
        other => Err(CacheError::InvalidInput(format!(
            "unknown cache backend: {other}"
        ))),
    }
}

#[derive(Debug, Default, Clone)]
struct CacheCounters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl CacheCounters {
    fn hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    fn miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    fn eviction(&mut self) {
        self.evictions = self.evictions.saturating_add(1);
    }
}

struct VolatileEntry {
    stored_ms: u64,
    value: Vec<ScoredCandidate>,
}

pub struct VolatileCache {
    entries: HashMap<String, VolatileEntry>,
    lru: VecDeque<String>,
    capacity: usize,
    counters: CacheCounters,
}

impl VolatileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: VecDeque::new(),
            capacity: capacity.max(1),
            counters: CacheCounters::default(),
        }
    }

    fn get_at(&mut self, key: &CacheKey, ttl: Duration, now: u64) -> Option<Vec<ScoredCandidate>> {
        let ttl_ms = ttl.as_millis() as u64;
        let live = self.entries.get(key.as_str()).and_then(|entry| {
            if now.saturating_sub(entry.stored_ms) > ttl_ms {
                None
            } else {
                Some(entry.value.clone())
            }
        });
        if let Some(value) = live {
            self.bump_lru(key.as_str());
            self.counters.hit();
            return Some(value);
        }
        if self.entries.remove(key.as_str()).is_some() {
            self.lru.retain(|k| k != key.as_str());
        }
        self.counters.miss();
        None
    }

    fn put_at(&mut self, key: &CacheKey, value: &[ScoredCandidate], now: u64) {
        self.entries.insert(
            key.as_str().to_string(),
            VolatileEntry {
                stored_ms: now,
                value: value.to_vec(),
            },
        );
        self.bump_lru(key.as_str());
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.lru.pop_front() {
                if self.entries.remove(&oldest).is_some() {
                    self.counters.eviction();
                }
            } else {
                break;
            }
        }
    }

    fn bump_lru(&mut self, key: &str) {
        self.lru.retain(|k| k != key);
        self.lru.push_back(key.to_string());
    }
}

impl RerankCache for VolatileCache {
    fn get(&mut self, key: &CacheKey, ttl: Duration) -> Option<Vec<ScoredCandidate>> {
        self.get_at(key, ttl, now_ms())
    }

    fn put(&mut self, key: &CacheKey, value: &[ScoredCandidate]) -> Result<(), CacheError> {
        self.put_at(key, value, now_ms());
        Ok(())
    }

    fn stats(&self) -> Value {
        serde_json::json!({
            "backend": "volatile",
            "entries": self.entries.len(),
            "capacity": self.capacity,
            "hits": self.counters.hits,
            "misses": self.counters.misses,
            "evictions": self.counters.evictions,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DurableEntry {
    stored_ms: u64,
    results: Vec<ScoredCandidate>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedCache {
    entries: HashMap<String, Value>,
}

// a missing, unreadable, or incompatible file behaves as an empty cache; an
// entry that no longer decodes is a miss
pub struct DurableCache {
    path: PathBuf,
    counters: CacheCounters,
}

impl DurableCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if !path.exists() {
            let bytes = serde_json::to_vec_pretty(&PersistedCache::default())?;
            fs::write(&path, bytes)?;
        }
        Ok(Self {
            path,
            counters: CacheCounters::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PersistedCache {
        fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn persist(&self, persisted: &PersistedCache) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(persisted)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }

    fn get_at(&mut self, key: &CacheKey, ttl: Duration, now: u64) -> Option<Vec<ScoredCandidate>> {
        let mut persisted = self.load();
        let decoded = persisted
            .entries
            .get(key.as_str())
            .cloned()
            .and_then(|raw| serde_json::from_value::<DurableEntry>(raw).ok());
        let Some(entry) = decoded else {
            self.counters.miss();
            return None;
        };
        if now.saturating_sub(entry.stored_ms) > ttl.as_millis() as u64 {
            persisted.entries.remove(key.as_str());
            let _ = self.persist(&persisted);
            self.counters.miss();
            return None;
        }
        self.counters.hit();
        Some(entry.results)
    }

    fn put_at(&mut self, key: &CacheKey, value: &[ScoredCandidate], now: u64) -> Result<(), CacheError> {
        let mut persisted = self.load();
        let entry = DurableEntry {
            stored_ms: now,
            results: value.to_vec(),
        };
        persisted
            .entries
            .insert(key.as_str().to_string(), serde_json::to_value(&entry)?);
        self.persist(&persisted)
    }
}

impl RerankCache for DurableCache {
    fn get(&mut self, key: &CacheKey, ttl: Duration) -> Option<Vec<ScoredCandidate>> {
        self.get_at(key, ttl, now_ms())
    }

    fn put(&mut self, key: &CacheKey, value: &[ScoredCandidate]) -> Result<(), CacheError> {
        self.put_at(key, value, now_ms())
    }

    fn stats(&self) -> Value {
        serde_json::json!({
            "backend": "durable",
            "path": self.path,
            "entries": self.load().entries.len(),
            "hits": self.counters.hits,
            "misses": self.counters.misses,
        })
    }
}

pub struct TieredCache {
    volatile: VolatileCache,
    durable: DurableCache,
}

impl TieredCache {
    pub fn open(capacity: usize, path: impl AsRef<Path>) -> Result<Self, CacheError> {
        Ok(Self {
            volatile: VolatileCache::new(capacity),
            durable: DurableCache::open(path)?,
        })
    }
}

impl RerankCache for TieredCache {
    fn get(&mut self, key: &CacheKey, ttl: Duration) -> Option<Vec<ScoredCandidate>> {
        if let Some(hit) = self.volatile.get(key, ttl) {
            return Some(hit);
        }
        let hit = self.durable.get(key, ttl)?;
        self.volatile.put_at(key, &hit, now_ms());
        Some(hit)
    }

    fn put(&mut self, key: &CacheKey, value: &[ScoredCandidate]) -> Result<(), CacheError> {
        self.volatile.put_at(key, value, now_ms());
        self.durable.put(key, value)
    }

    fn stats(&self) -> Value {
        serde_json::json!({
            "backend": "tiered",
            "volatile": self.volatile.stats(),
            "durable": self.durable.stats(),
        })
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use fuserank_core::Candidate;

    use super::*;

    static TEMP_SEQ: AtomicU64 = AtomicU64::new(1);

    fn temp_cache_path() -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let pid = std::process::id();
        std::env::temp_dir().join(format!("fuserank-cache-test-{pid}-{}-{seq}.json", now_ms()))
    }

    fn results(ids: &[&str]) -> Vec<ScoredCandidate> {
        ids.iter()
            .enumerate()
            .map(|(pos, id)| ScoredCandidate {
                candidate: Candidate::new(*id, format!("content for {id}")),
                score: 1.0 / (pos as f64 + 1.0),
                rerank_rank: pos as u32 + 1,
            })
            .collect()
    }

    #[test]
    fn cache_key_is_order_sensitive() {
        let a = vec!["first".to_string(), "second".to_string()];
        let b = vec!["second".to_string(), "first".to_string()];
        assert_eq!(cache_key("q", &a), cache_key("q", &a));
        assert_ne!(cache_key("q", &a), cache_key("q", &b));
        assert_ne!(cache_key("q", &a), cache_key("other", &a));
        assert_eq!(cache_key("q", &a).as_str().len(), 64);
    }

    #[test]
    fn volatile_ttl_boundary_is_strict() {
        let mut cache = VolatileCache::new(8);
        let key = cache_key("q", &["t".to_string()]);
        cache.put_at(&key, &results(&["a"]), 0);

        let ttl = Duration::from_millis(10);
        assert!(cache.get_at(&key, ttl, 9).is_some());
        assert!(cache.get_at(&key, ttl, 10).is_some());
        assert!(cache.get_at(&key, ttl, 11).is_none());
        assert!(cache.get_at(&key, Duration::from_secs(3600), 11).is_none());
    }

    #[test]
    fn volatile_lru_evicts_coldest() {
        let mut cache = VolatileCache::new(2);
        let ttl = Duration::from_secs(60);
        let ka = cache_key("a", &[]);
        let kb = cache_key("b", &[]);
        let kc = cache_key("c", &[]);
        cache.put_at(&ka, &results(&["a"]), 0);
        cache.put_at(&kb, &results(&["b"]), 0);
        assert!(cache.get_at(&ka, ttl, 1).is_some());
        cache.put_at(&kc, &results(&["c"]), 2);

        assert!(cache.get_at(&kb, ttl, 3).is_none());
        assert!(cache.get_at(&ka, ttl, 3).is_some());
        assert!(cache.get_at(&kc, ttl, 3).is_some());
        assert_eq!(cache.counters.evictions, 1);
    }

    #[test]
    fn durable_round_trips_across_handles() {
        let path = temp_cache_path();
        let key = cache_key("query", &["text".to_string()]);
        let stored = results(&["a", "b"]);

        let mut writer = DurableCache::open(&path).expect("open writer");
        writer.put(&key, &stored).expect("put");

        let mut reader = DurableCache::open(&path).expect("open reader");
        let loaded = reader.get(&key, Duration::from_secs(60)).expect("hit");
        assert_eq!(loaded, stored);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn durable_incompatible_entry_is_a_miss() {
        let path = temp_cache_path();
        let key = cache_key("query", &["text".to_string()]);

        let mut cache = DurableCache::open(&path).expect("open");
        cache.put(&key, &results(&["a"])).expect("put");

        let mut persisted = cache.load();
        persisted.entries.insert(
            key.as_str().to_string(),
            serde_json::json!({"schema": "v2", "rows": []}),
        );
        cache.persist(&persisted).expect("persist");

        assert!(cache.get(&key, Duration::from_secs(60)).is_none());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn durable_expired_entry_is_deleted_on_read() {
        let path = temp_cache_path();
        let key = cache_key("query", &["text".to_string()]);

        let mut cache = DurableCache::open(&path).expect("open");
        cache.put_at(&key, &results(&["a"]), 0).expect("put");

        let ttl = Duration::from_millis(5);
        assert!(cache.get_at(&key, ttl, 100).is_none());
        assert!(cache.load().entries.is_empty());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn corrupt_durable_file_behaves_as_empty() {
        let path = temp_cache_path();
        fs::write(&path, b"not json at all").expect("write garbage");

        let mut cache = DurableCache::open(&path).expect("open");
        let key = cache_key("query", &["text".to_string()]);
        assert!(cache.get(&key, Duration::from_secs(60)).is_none());

        cache.put(&key, &results(&["a"])).expect("put");
        assert!(cache.get(&key, Duration::from_secs(60)).is_some());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn tiered_promotes_durable_hits() {
        let path = temp_cache_path();
        let key = cache_key("query", &["text".to_string()]);
        let stored = results(&["a"]);

        let mut seed = DurableCache::open(&path).expect("open seed");
        seed.put(&key, &stored).expect("seed put");

        let mut tiered = TieredCache::open(8, &path).expect("open tiered");
        let ttl = Duration::from_secs(60);
        assert_eq!(tiered.get(&key, ttl), Some(stored.clone()));
        assert_eq!(tiered.get(&key, ttl), Some(stored));
        assert_eq!(tiered.volatile.counters.hits, 1);
        assert_eq!(tiered.durable.counters.hits, 1);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn build_cache_rejects_unknown_backend() {
        assert!(build_cache("volatile", 8, None).is_ok());
        let err = build_cache("redis", 8, None);
        assert!(matches!(err, Err(CacheError::InvalidInput(_))));
    }
}
