//! Record storage backends
//!
//! Either an in-memory table or a directory holding one JSON file per entry
//! (`<id>.json`). Files are replaced atomically.

use std::path::PathBuf;

use ahash::AHashMap;
use parking_lot::RwLock;
use tessera_platform::FileSystem;

use super::entry::{CacheEntry, EntrySummary};
use crate::{AssetError, AssetResult};

const RECORD_EXTENSION: &str = "json";

#[derive(Debug)]
pub(crate) enum RecordStore {
    Memory(RwLock<AHashMap<String, CacheEntry>>),
    Directory(FileSystem),
}

impl RecordStore {
    pub fn memory() -> Self {
        RecordStore::Memory(RwLock::new(AHashMap::new()))
    }

    pub fn directory(path: PathBuf) -> Self {
        RecordStore::Directory(FileSystem::with_cache_dir(path))
    }

    fn record_path(fs: &FileSystem, id: &str) -> PathBuf {
        fs.cache_path(format!("{id}.{RECORD_EXTENSION}"))
    }

    /// Open the store and return a summary of every readable record
    pub async fn open(&self) -> AssetResult<Vec<EntrySummary>> {
        let fs = match self {
            RecordStore::Memory(table) => {
                return Ok(table.read().values().map(CacheEntry::summary).collect());
            }
            RecordStore::Directory(fs) => fs,
        };

        let unavailable = |e: tessera_platform::PlatformError| {
            AssetError::StorageUnavailable(format!("{}: {}", fs.cache_dir().display(), e))
        };
        fs.ensure_dir(fs.cache_dir()).await.map_err(unavailable)?;
        let files = fs
            .list_files(fs.cache_dir(), RECORD_EXTENSION)
            .await
            .map_err(unavailable)?;

        let mut summaries = Vec::with_capacity(files.len());
        for path in files {
            let bytes = match fs.async_handle(&path).read_all().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Skipping unreadable cache record {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_slice::<EntrySummary>(&bytes) {
                Ok(summary) if path.file_stem().is_some_and(|stem| stem == summary.id.as_str()) => {
                    summaries.push(summary);
                }
                Ok(summary) => {
                    log::warn!(
                        "Skipping cache record {}: stored id {} does not match file name",
                        path.display(),
                        summary.id
                    );
                }
                Err(e) => {
                    log::warn!("Skipping corrupt cache record {}: {}", path.display(), e);
                }
            }
        }
        Ok(summaries)
    }

    pub async fn read(&self, id: &str) -> AssetResult<Option<CacheEntry>> {
        match self {
            RecordStore::Memory(table) => Ok(table.read().get(id).cloned()),
            RecordStore::Directory(fs) => {
                let bytes = fs.async_handle(Self::record_path(fs, id)).read_if_exists().await?;
                match bytes {
                    Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                    None => Ok(None),
                }
            }
        }
    }

    pub async fn write(&self, entry: &CacheEntry) -> AssetResult<()> {
        match self {
            RecordStore::Memory(table) => {
                table.write().insert(entry.id.clone(), entry.clone());
                Ok(())
            }
            RecordStore::Directory(fs) => {
                let bytes = serde_json::to_vec(entry)?;
                fs.async_handle(Self::record_path(fs, &entry.id))
                    .write_atomic(&bytes)
                    .await?;
                Ok(())
            }
        }
    }

    /// Delete a record. Returns false if it was already gone.
    pub async fn remove(&self, id: &str) -> AssetResult<bool> {
        match self {
            RecordStore::Memory(table) => Ok(table.write().remove(id).is_some()),
            RecordStore::Directory(fs) => Ok(fs.async_handle(Self::record_path(fs, id)).remove().await?),
        }
    }
}
