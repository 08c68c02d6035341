//! Persistent model cache
//!
//! Stores serialized assets keyed by `(url, engine)` so later loads of the
//! same model can skip the network fetch and the engine's parser.
//!
//! Entries expire after a configurable age (7 days by default) and are
//! ignored when they were written with another format version. If the
//! backing directory cannot be opened the cache disables itself for the rest
//! of the session: every save becomes a no-op and every lookup a miss.

mod entry;
mod index;
mod store;

pub use entry::{CacheEntry, CacheMetadata, EntrySummary, entry_id, is_fresh};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tessera_core::time::DAY_MILLIS;
use tessera_core::{Clock, EngineKind, SystemClock};
use tessera_platform::ScopedTimer;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::format::SerializedAsset;
use crate::{AssetError, AssetResult};
use index::CacheIndex;
use store::RecordStore;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one record per entry; `None` keeps entries in memory
    pub directory: Option<PathBuf>,
    /// Maximum entry age in milliseconds
    pub max_age_ms: u64,
    /// Format version written into new entries; other versions are misses
    pub format_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_age_ms: 7 * DAY_MILLIS,
            format_version: "2.0".to_string(),
        }
    }
}

impl CacheConfig {
    /// Default configuration persisting to `directory`
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Default::default()
        }
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub per_engine: Vec<(EngineKind, usize)>,
    /// Oldest write time (epoch ms)
    pub oldest: Option<u64>,
    /// Newest write time (epoch ms)
    pub newest: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreState {
    Closed,
    Ready,
    Disabled,
}

/// Persistent cache of serialized models
#[derive(Debug)]
pub struct ModelCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    store: RecordStore,
    index: RwLock<CacheIndex>,
    state: RwLock<StoreState>,
    /// Serializes writes, deletes and opening the store
    write_lock: tokio::sync::Mutex<()>,
}

impl ModelCache {
    /// Create a cache using the system clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let store = match &config.directory {
            Some(directory) => RecordStore::directory(directory.clone()),
            None => RecordStore::memory(),
        };
        Self {
            config,
            clock,
            store,
            index: RwLock::new(CacheIndex::default()),
            state: RwLock::new(StoreState::Closed),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Open the store and rebuild the indices. Calling it again is a no-op.
    pub async fn init(&self) -> AssetResult<()> {
        let _guard = self.write_lock.lock().await;

        let state = *self.state.read();
        match state {
            StoreState::Ready => return Ok(()),
            StoreState::Disabled => {
                return Err(AssetError::StorageUnavailable(
                    "cache disabled for this session".to_string(),
                ));
            }
            StoreState::Closed => {}
        }

        match self.store.open().await {
            Ok(records) => {
                let count = records.len();
                {
                    let mut index = self.index.write();
                    index.clear();
                    for record in records {
                        index.insert(record);
                    }
                }
                *self.state.write() = StoreState::Ready;
                log::info!("Model cache ready with {} entries", count);
                Ok(())
            }
            Err(e) => {
                *self.state.write() = StoreState::Disabled;
                log::warn!("Model cache disabled: {}", e);
                Err(e)
            }
        }
    }

    /// Open lazily; false when the cache is disabled
    async fn ensure_ready(&self) -> bool {
        let state = *self.state.read();
        match state {
            StoreState::Ready => true,
            StoreState::Disabled => false,
            StoreState::Closed => self.init().await.is_ok(),
        }
    }

    /// Whether the store is open and accepting writes
    pub fn is_available(&self) -> bool {
        *self.state.read() == StoreState::Ready
    }

    /// Look up a fresh entry for `url`, optionally restricted to one engine
    pub async fn get(&self, url: &str, engine: Option<EngineKind>) -> Option<CacheEntry> {
        if !self.ensure_ready().await {
            return None;
        }

        let now = self.clock.epoch_millis();
        let id = {
            let index = self.index.read();
            let fresh = index
                .for_url(url)
                .filter(|summary| engine.is_none_or(|e| summary.engine_type == e))
                .find(|summary| {
                    // Stale and foreign-version records are skipped but stay on disk
                    if !is_fresh(summary.timestamp, now, self.config.max_age_ms) {
                        log::debug!("Cache entry {} for {} is stale", summary.engine_type, url);
                        return false;
                    }
                    if summary.version != self.config.format_version {
                        log::debug!(
                            "Cache entry {} for {} has version {} (want {})",
                            summary.engine_type,
                            url,
                            summary.version,
                            self.config.format_version
                        );
                        return false;
                    }
                    true
                })?;
            fresh.id.clone()
        };

        match self.store.read(&id).await {
            Ok(Some(entry)) => {
                log::debug!("Cache hit for {} ({})", url, entry.engine_type);
                Some(entry)
            }
            Ok(None) => {
                log::warn!("Cache record {} vanished from storage", id);
                self.index.write().remove(&id);
                None
            }
            Err(e) => {
                log::warn!("Failed to read cache record {}: {}", id, e);
                None
            }
        }
    }

    /// Store a serialized asset, replacing any entry for the same `(url, engine)`
    pub async fn try_save(
        &self,
        url: &str,
        model_data: SerializedAsset,
        engine: EngineKind,
        metadata: Option<CacheMetadata>,
    ) -> AssetResult<()> {
        if model_data.engine_type != engine {
            return Err(AssetError::EngineMismatch {
                expected: engine,
                actual: model_data.engine_type,
            });
        }
        if !self.ensure_ready().await {
            return Err(AssetError::StorageUnavailable(
                "cache disabled for this session".to_string(),
            ));
        }

        let _guard = self.write_lock.lock().await;
        let entry = CacheEntry {
            id: entry_id(engine, url),
            url: url.to_string(),
            model_data,
            engine_type: engine,
            timestamp: self.clock.epoch_millis(),
            version: self.config.format_version.clone(),
            metadata,
        };
        self.store.write(&entry).await?;
        self.index.write().insert(entry.summary());

        log::debug!("Cached {} for {}", url, engine);
        Ok(())
    }

    /// Store a serialized asset, logging instead of returning failures
    pub async fn save(
        &self,
        url: &str,
        model_data: SerializedAsset,
        engine: EngineKind,
        metadata: Option<CacheMetadata>,
    ) {
        match self.try_save(url, model_data, engine, metadata).await {
            Ok(()) => {}
            Err(AssetError::StorageUnavailable(_)) => {
                log::debug!("Cache disabled, not saving {}", url);
            }
            Err(e) => log::warn!("Failed to cache {}: {}", url, e),
        }
    }

    /// Delete every entry written at or before `now - max_age`
    pub async fn clear_old_cache(&self, max_age: Duration) -> usize {
        if !self.ensure_ready().await {
            return 0;
        }
        let _timer = ScopedTimer::traced("cache.clear_old_cache");

        let _guard = self.write_lock.lock().await;
        let now = self.clock.epoch_millis();
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let Some(cutoff) = now.checked_sub(max_age_ms) else {
            return 0;
        };
        let ids = self.index.read().ids_at_or_before(cutoff);
        let removed = self.remove_records(ids).await;
        if removed > 0 {
            log::info!("Removed {} cache entries older than {:?}", removed, max_age);
        }
        removed
    }

    /// Delete every entry written by `engine`, regardless of age
    pub async fn clear_cache_by_engine(&self, engine: EngineKind) -> usize {
        if !self.ensure_ready().await {
            return 0;
        }

        let _guard = self.write_lock.lock().await;
        let ids = self.index.read().ids_for_engine(engine);
        let removed = self.remove_records(ids).await;
        log::info!("Removed {} {} cache entries", removed, engine);
        removed
    }

    /// Must be called with the write lock held
    async fn remove_records(&self, ids: Vec<String>) -> usize {
        let mut removed = 0;
        for id in ids {
            match self.store.remove(&id).await {
                Ok(existed) => {
                    self.index.write().remove(&id);
                    if existed {
                        removed += 1;
                    } else {
                        log::debug!("Cache record {} was already gone", id);
                    }
                }
                Err(e) => log::warn!("Failed to remove cache record {}: {}", id, e),
            }
        }
        removed
    }

    /// Number of indexed entries, fresh or not
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let index = self.index.read();
        CacheStats {
            entries: index.len(),
            per_engine: EngineKind::ALL
                .iter()
                .map(|&engine| (engine, index.count_for_engine(engine)))
                .collect(),
            oldest: index.oldest(),
            newest: index.newest(),
        }
    }

    /// Entries without payloads, oldest first
    pub fn summaries(&self, engine: Option<EngineKind>) -> Vec<EntrySummary> {
        self.index
            .read()
            .iter_by_age()
            .filter(|summary| engine.is_none_or(|e| summary.engine_type == e))
            .cloned()
            .collect()
    }

    /// Run [`ModelCache::clear_old_cache`] every `interval` on the tokio runtime
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, max_age: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.clear_old_cache(max_age).await;
            }
        })
    }
}
