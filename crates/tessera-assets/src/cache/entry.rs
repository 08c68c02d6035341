//! Cache records

use serde::{Deserialize, Serialize};
use tessera_core::EngineKind;

use crate::format::SerializedAsset;

/// Summary counters stored next to a cached asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textures: Option<Vec<String>>,
}

impl CacheMetadata {
    /// Compute vertex and face totals for an asset
    pub fn from_asset(asset: &SerializedAsset) -> Self {
        Self {
            vertices: Some(asset.vertex_count() as u64),
            faces: Some(asset.face_count() as u64),
            materials: None,
            textures: None,
        }
    }
}

/// One persisted asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub id: String,
    pub url: String,
    pub model_data: SerializedAsset,
    pub engine_type: EngineKind,
    /// Write time in epoch milliseconds
    pub timestamp: u64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CacheMetadata>,
}

impl CacheEntry {
    /// Index record for this entry
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            url: self.url.clone(),
            engine_type: self.engine_type,
            timestamp: self.timestamp,
            version: self.version.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A cache entry without its payload.
///
/// Deserializing an on-disk record into this type skips `modelData`, which
/// keeps index rebuilds cheap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: String,
    pub url: String,
    pub engine_type: EngineKind,
    pub timestamp: u64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CacheMetadata>,
}

/// Deterministic entry id for an `(engine, url)` pair (lowercase BLAKE3 hex)
pub fn entry_id(engine: EngineKind, url: &str) -> String {
    blake3::hash(format!("{}_{}", engine.tag(), url).as_bytes())
        .to_hex()
        .to_string()
}

/// Whether a record written at `timestamp` is still fresh at `now`
pub fn is_fresh(timestamp: u64, now: u64, max_age_ms: u64) -> bool {
    now.saturating_sub(timestamp) < max_age_ms
}
