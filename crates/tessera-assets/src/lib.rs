//! # Tessera Assets
//!
//! Engine-agnostic mesh serialization and the persistent model cache.
//!
//! ## Features
//! - Flat, JSON-safe mesh format shared by every supported engine
//! - One [`EngineAdapter`] per engine, built around an injected [`NativeRuntime`]
//! - Persistent cache keyed by `(url, engine)` with freshness and version checks
//! - Cache-or-load pipeline that degrades to uncached loading on any failure

pub mod adapter;
pub mod cache;
pub mod engines;
pub mod format;
pub mod pipeline;
pub mod serializer;

pub use adapter::{BufferHandle, EngineAdapter, FrameStats, MaterialHandle, NativeRuntime};
pub use cache::{CacheConfig, CacheEntry, CacheMetadata, CacheStats, EntrySummary, ModelCache};
pub use engines::{BabylonAdapter, CesiumAdapter, ThreeAdapter};
pub use format::{MeshDefect, Rotation, SerializedAsset, SerializedMesh, SerializedTransform};
pub use pipeline::{AssetLoader, AssetOrigin, AssetPipeline, LoadedAsset};
pub use serializer::MeshSerializer;

use tessera_core::EngineKind;
use tessera_platform::PlatformError;
use thiserror::Error;

/// Errors raised while converting between native scenes and serialized assets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SerializationError {
    #[error("{0} runtime is not available in this process")]
    RuntimeUnavailable(EngineKind),

    #[error("Malformed mesh '{mesh}': {defect}")]
    MalformedMesh { mesh: String, defect: MeshDefect },
}

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Engine mismatch: expected {expected}, found {actual}")]
    EngineMismatch {
        expected: EngineKind,
        actual: EngineKind,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Asset loader failed for {url}: {message}")]
    Load { url: String, message: String },
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;

/// Fail unless a serialized asset was produced by the expected engine
pub fn ensure_engine(asset: &SerializedAsset, expected: EngineKind) -> AssetResult<()> {
    if asset.engine_type == expected {
        Ok(())
    } else {
        Err(AssetError::EngineMismatch {
            expected,
            actual: asset.engine_type,
        })
    }
}
