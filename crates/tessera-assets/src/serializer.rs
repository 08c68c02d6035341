//! Mesh serializer
//!
//! Converts whole native scenes to and from [`SerializedAsset`] through an
//! [`EngineAdapter`].

use std::sync::Arc;

use tessera_core::EngineKind;

use crate::adapter::EngineAdapter;
use crate::format::SerializedAsset;
use crate::{AssetResult, SerializationError, ensure_engine};

/// Scene-level serializer for one engine
#[derive(Debug)]
pub struct MeshSerializer<A: EngineAdapter> {
    adapter: Arc<A>,
}

impl<A: EngineAdapter> Clone for MeshSerializer<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<A: EngineAdapter> MeshSerializer<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Engine this serializer produces and accepts
    pub fn engine(&self) -> EngineKind {
        self.adapter.kind()
    }

    /// Serialize every mesh carrying positions. The scene is not modified.
    pub fn serialize(&self, scene: &A::Scene) -> Result<SerializedAsset, SerializationError> {
        let meshes = self.adapter.serialize(scene)?;
        log::debug!(
            "Serialized {} scene with {} meshes",
            self.engine(),
            meshes.len()
        );
        Ok(SerializedAsset {
            engine_type: self.engine(),
            meshes,
        })
    }

    /// Rebuild a native scene from a serialized asset.
    ///
    /// The engine tag is checked before anything is built. Malformed meshes
    /// are skipped. Any other failure disposes the meshes built so far and
    /// returns the error.
    pub fn deserialize(&self, asset: &SerializedAsset) -> AssetResult<A::Scene> {
        ensure_engine(asset, self.engine())?;

        let mut built = Vec::with_capacity(asset.meshes.len());
        for data in &asset.meshes {
            match self.adapter.build_mesh(data) {
                Ok(mesh) => built.push(mesh),
                Err(SerializationError::MalformedMesh { mesh, defect }) => {
                    log::warn!("Skipping malformed mesh '{}': {}", mesh, defect);
                }
                Err(e) => {
                    for mesh in built {
                        self.adapter.dispose(mesh);
                    }
                    return Err(e.into());
                }
            }
        }

        Ok(self.adapter.assemble(built))
    }
}
