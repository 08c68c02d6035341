//! Babylon adapter
//!
//! Babylon loader results are a flat list of meshes. Each mesh stores its
//! vertex data by kind, an optional index buffer, Euler `rotation` with an
//! optional `rotationQuaternion` that takes precedence, and `scaling`.

use std::sync::Arc;

use ahash::AHashMap;
use glam::{Quat, Vec3};
use tessera_core::EngineKind;

use crate::SerializationError;
use crate::adapter::{
    BufferHandle, EngineAdapter, FrameStats, MaterialHandle, NativeRuntime, f32_bytes, u32_bytes,
};
use crate::format::{Rotation, SerializedMesh, SerializedTransform};

/// Vertex data kinds read and written by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    Position,
    Normal,
    Uv,
}

/// Babylon mesh
#[derive(Debug, Clone)]
pub struct BabylonMesh {
    pub name: String,
    pub position: Vec3,
    pub rotation: Vec3,
    pub rotation_quaternion: Option<Quat>,
    pub scaling: Vec3,
    vertex_data: AHashMap<VertexKind, Vec<f32>>,
    indices: Option<Vec<u32>>,
    enabled: bool,
    buffers: Vec<BufferHandle>,
    material: Option<MaterialHandle>,
}

impl BabylonMesh {
    /// Create an empty, enabled mesh at the origin
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            rotation_quaternion: None,
            scaling: Vec3::ONE,
            vertex_data: AHashMap::new(),
            indices: None,
            enabled: true,
            buffers: Vec::new(),
            material: None,
        }
    }

    pub fn set_vertices_data(&mut self, kind: VertexKind, data: Vec<f32>) {
        self.vertex_data.insert(kind, data);
    }

    pub fn get_vertices_data(&self, kind: VertexKind) -> Option<&[f32]> {
        self.vertex_data.get(&kind).map(Vec::as_slice)
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = Some(indices);
    }

    pub fn get_indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of vertices in the position buffer
    pub fn get_total_vertices(&self) -> usize {
        self.get_vertices_data(VertexKind::Position)
            .map_or(0, |p| p.len() / 3)
    }

    /// Material assigned when the mesh was rebuilt
    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }
}

/// Result of a Babylon scene import
#[derive(Debug, Clone, Default)]
pub struct BabylonImportResult {
    pub meshes: Vec<BabylonMesh>,
}

/// Adapter for Babylon scenes
#[derive(Debug, Clone)]
pub struct BabylonAdapter {
    runtime: Option<Arc<NativeRuntime>>,
}

impl BabylonAdapter {
    pub fn new(runtime: Arc<NativeRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Adapter for a process where Babylon is not loaded
    pub fn detached() -> Self {
        Self { runtime: None }
    }
}

impl EngineAdapter for BabylonAdapter {
    type Scene = BabylonImportResult;
    type Mesh = BabylonMesh;

    fn kind(&self) -> EngineKind {
        EngineKind::Babylon
    }

    fn runtime(&self) -> Option<&Arc<NativeRuntime>> {
        self.runtime.as_ref()
    }

    fn serialize(&self, scene: &BabylonImportResult) -> Result<Vec<SerializedMesh>, SerializationError> {
        self.require_runtime()?;

        let meshes = scene
            .meshes
            .iter()
            .filter_map(|mesh| {
                let positions = mesh.get_vertices_data(VertexKind::Position)?;
                let rotation = match mesh.rotation_quaternion {
                    Some(q) => Rotation::Quaternion(q.to_array()),
                    None => Rotation::Euler(mesh.rotation.to_array()),
                };
                Some(SerializedMesh {
                    name: mesh.name.clone(),
                    transform: SerializedTransform::new(
                        mesh.position.to_array(),
                        rotation,
                        mesh.scaling.to_array(),
                    ),
                    positions: Some(positions.to_vec()),
                    normals: mesh.get_vertices_data(VertexKind::Normal).map(<[f32]>::to_vec),
                    uvs: mesh.get_vertices_data(VertexKind::Uv).map(<[f32]>::to_vec),
                    indices: mesh.get_indices().map(<[u32]>::to_vec),
                })
            })
            .collect();
        Ok(meshes)
    }

    fn build_mesh(&self, data: &SerializedMesh) -> Result<BabylonMesh, SerializationError> {
        let runtime = self.require_runtime()?;
        data.validate()
            .map_err(|defect| SerializationError::MalformedMesh {
                mesh: data.name.clone(),
                defect,
            })?;

        let mut mesh = BabylonMesh::new(data.name.clone());
        let attributes = [
            (VertexKind::Position, &data.positions),
            (VertexKind::Normal, &data.normals),
            (VertexKind::Uv, &data.uvs),
        ];
        for (kind, values) in attributes {
            if let Some(values) = values {
                mesh.buffers.push(runtime.create_buffer(f32_bytes(values.len())));
                mesh.set_vertices_data(kind, values.clone());
            }
        }
        if let Some(indices) = &data.indices {
            mesh.buffers.push(runtime.create_buffer(u32_bytes(indices.len())));
            mesh.set_indices(indices.clone());
        }

        let transform = &data.transform;
        mesh.position = Vec3::from_array(transform.position);
        mesh.scaling = Vec3::from_array(transform.scale);
        match transform.rotation {
            Rotation::Euler(e) => mesh.rotation = Vec3::from_array(e),
            Rotation::Quaternion(q) => mesh.rotation_quaternion = Some(Quat::from_array(q)),
        }
        mesh.material = Some(runtime.create_default_material());

        Ok(mesh)
    }

    fn assemble(&self, meshes: Vec<BabylonMesh>) -> BabylonImportResult {
        BabylonImportResult { meshes }
    }

    fn set_enabled(&self, mesh: &mut BabylonMesh, enabled: bool) {
        mesh.set_enabled(enabled);
    }

    fn is_enabled(&self, mesh: &BabylonMesh) -> bool {
        mesh.is_enabled()
    }

    fn dispose(&self, mesh: BabylonMesh) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        for buffer in mesh.buffers {
            runtime.release_buffer(buffer);
        }
        if let Some(material) = mesh.material {
            runtime.release_material(material);
        }
    }

    fn frame_stats(&self) -> FrameStats {
        self.runtime
            .as_ref()
            .map(|runtime| runtime.last_frame())
            .unwrap_or_default()
    }
}
