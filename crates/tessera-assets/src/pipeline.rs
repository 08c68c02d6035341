//! Cache-or-load pipeline
//!
//! Serves a model from the cache when a usable entry exists and falls back to
//! the engine's own loader otherwise. Freshly loaded scenes are serialized and
//! stored for next time. Cache problems never fail a load; only the loader can.

use std::future::Future;
use std::sync::Arc;

use tessera_core::EngineKind;

use crate::adapter::EngineAdapter;
use crate::cache::{CacheMetadata, ModelCache};
use crate::serializer::MeshSerializer;
use crate::{AssetError, AssetResult};

/// Fetches and parses a model with the engine's own loader
pub trait AssetLoader<S>: Send + Sync {
    fn load_asset(
        &self,
        url: &str,
        engine: EngineKind,
    ) -> impl Future<Output = anyhow::Result<S>> + Send;
}

/// Where a loaded scene came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Cache,
    /// Loaded from source; `persisted` tells whether it was written to the cache
    Loader { persisted: bool },
}

/// Native scene with its origin
#[derive(Debug)]
pub struct LoadedAsset<S> {
    pub scene: S,
    pub origin: AssetOrigin,
}

/// Cache-aware model loading for one engine
pub struct AssetPipeline<A: EngineAdapter, L> {
    serializer: MeshSerializer<A>,
    cache: Arc<ModelCache>,
    loader: L,
}

impl<A, L> AssetPipeline<A, L>
where
    A: EngineAdapter,
    L: AssetLoader<A::Scene>,
{
    pub fn new(serializer: MeshSerializer<A>, cache: Arc<ModelCache>, loader: L) -> Self {
        Self {
            serializer,
            cache,
            loader,
        }
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn serializer(&self) -> &MeshSerializer<A> {
        &self.serializer
    }

    /// Load a model, preferring the cache
    pub async fn load(&self, url: &str) -> AssetResult<LoadedAsset<A::Scene>> {
        let engine = self.serializer.engine();

        if let Some(entry) = self.cache.get(url, Some(engine)).await {
            match self.serializer.deserialize(&entry.model_data) {
                Ok(scene) => {
                    return Ok(LoadedAsset {
                        scene,
                        origin: AssetOrigin::Cache,
                    });
                }
                Err(e) => log::warn!("Cached copy of {} is unusable, reloading: {}", url, e),
            }
        }

        let scene = self
            .loader
            .load_asset(url, engine)
            .await
            .map_err(|e| AssetError::Load {
                url: url.to_string(),
                message: format!("{e:#}"),
            })?;

        let persisted = match self.serializer.serialize(&scene) {
            Ok(asset) => {
                let metadata = CacheMetadata::from_asset(&asset);
                match self.cache.try_save(url, asset, engine, Some(metadata)).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("Could not cache {}: {}", url, e);
                        false
                    }
                }
            }
            Err(e) => {
                log::warn!("{} is not cacheable this run: {}", url, e);
                false
            }
        };

        Ok(LoadedAsset {
            scene,
            origin: AssetOrigin::Loader { persisted },
        })
    }
}
