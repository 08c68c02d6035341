//! Cesium adapter
//!
//! Cesium scenes are primitive collections. Each primitive places its geometry
//! with a model matrix and stores positions in double precision. The
//! serialized format keeps `f32`, so positions are narrowed on the way out.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use tessera_core::EngineKind;

use crate::SerializationError;
use crate::adapter::{
    BufferHandle, EngineAdapter, FrameStats, MaterialHandle, NativeRuntime, f32_bytes, u32_bytes,
};
use crate::format::{Rotation, SerializedMesh, SerializedTransform};

/// Primitive geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CesiumGeometry {
    pub positions: Vec<f64>,
    pub normals: Option<Vec<f32>>,
    /// Texture coordinates
    pub st: Option<Vec<f32>>,
    pub indices: Option<Vec<u32>>,
}

/// Renderable primitive
#[derive(Debug, Clone)]
pub struct Primitive {
    pub id: String,
    pub model_matrix: Mat4,
    pub geometry: Option<CesiumGeometry>,
    pub show: bool,
    buffers: Vec<BufferHandle>,
    appearance: Option<MaterialHandle>,
}

impl Primitive {
    pub fn new(id: impl Into<String>, model_matrix: Mat4, geometry: CesiumGeometry) -> Self {
        Self {
            id: id.into(),
            model_matrix,
            geometry: Some(geometry),
            show: true,
            buffers: Vec::new(),
            appearance: None,
        }
    }

    /// Material assigned when the primitive was rebuilt
    pub fn appearance(&self) -> Option<MaterialHandle> {
        self.appearance
    }
}

/// Ordered set of primitives
#[derive(Debug, Clone, Default)]
pub struct PrimitiveCollection {
    primitives: Vec<Primitive>,
}

impl PrimitiveCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, primitive: Primitive) {
        self.primitives.push(primitive);
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Primitive> {
        self.primitives.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.iter()
    }
}

/// Adapter for Cesium primitive collections
#[derive(Debug, Clone)]
pub struct CesiumAdapter {
    runtime: Option<Arc<NativeRuntime>>,
}

impl CesiumAdapter {
    pub fn new(runtime: Arc<NativeRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Adapter for a process where Cesium is not loaded
    pub fn detached() -> Self {
        Self { runtime: None }
    }
}

impl EngineAdapter for CesiumAdapter {
    type Scene = PrimitiveCollection;
    type Mesh = Primitive;

    fn kind(&self) -> EngineKind {
        EngineKind::Cesium
    }

    fn runtime(&self) -> Option<&Arc<NativeRuntime>> {
        self.runtime.as_ref()
    }

    fn serialize(&self, scene: &PrimitiveCollection) -> Result<Vec<SerializedMesh>, SerializationError> {
        self.require_runtime()?;

        let meshes = scene
            .iter()
            .filter_map(|primitive| {
                let geometry = primitive.geometry.as_ref()?;
                if geometry.positions.is_empty() {
                    return None;
                }
                let (scale, rotation, translation) = primitive.model_matrix.to_scale_rotation_translation();
                Some(SerializedMesh {
                    name: primitive.id.clone(),
                    transform: SerializedTransform::new(
                        translation.to_array(),
                        Rotation::Quaternion(rotation.to_array()),
                        scale.to_array(),
                    ),
                    positions: Some(geometry.positions.iter().map(|&p| p as f32).collect()),
                    normals: geometry.normals.clone(),
                    uvs: geometry.st.clone(),
                    indices: geometry.indices.clone(),
                })
            })
            .collect();
        Ok(meshes)
    }

    fn build_mesh(&self, data: &SerializedMesh) -> Result<Primitive, SerializationError> {
        let runtime = self.require_runtime()?;
        data.validate()
            .map_err(|defect| SerializationError::MalformedMesh {
                mesh: data.name.clone(),
                defect,
            })?;

        let positions: Vec<f64> = data
            .positions
            .iter()
            .flatten()
            .map(|&p| f64::from(p))
            .collect();

        let mut buffers = vec![runtime.create_buffer(positions.len() * std::mem::size_of::<f64>())];
        for values in [&data.normals, &data.uvs].into_iter().flatten() {
            buffers.push(runtime.create_buffer(f32_bytes(values.len())));
        }
        if let Some(indices) = &data.indices {
            buffers.push(runtime.create_buffer(u32_bytes(indices.len())));
        }

        let transform = &data.transform;
        let model_matrix = Mat4::from_scale_rotation_translation(
            Vec3::from_array(transform.scale),
            transform.rotation.to_quat(),
            Vec3::from_array(transform.position),
        );

        let geometry = CesiumGeometry {
            positions,
            normals: data.normals.clone(),
            st: data.uvs.clone(),
            indices: data.indices.clone(),
        };
        let mut primitive = Primitive::new(data.name.clone(), model_matrix, geometry);
        primitive.buffers = buffers;
        primitive.appearance = Some(runtime.create_default_material());

        Ok(primitive)
    }

    fn assemble(&self, meshes: Vec<Primitive>) -> PrimitiveCollection {
        PrimitiveCollection { primitives: meshes }
    }

    fn set_enabled(&self, mesh: &mut Primitive, enabled: bool) {
        mesh.show = enabled;
    }

    fn is_enabled(&self, mesh: &Primitive) -> bool {
        mesh.show
    }

    fn dispose(&self, mesh: Primitive) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        for buffer in mesh.buffers {
            runtime.release_buffer(buffer);
        }
        if let Some(appearance) = mesh.appearance {
            runtime.release_material(appearance);
        }
    }

    /// Cesium exposes no draw-call counter, so `draw_calls` is always zero
    fn frame_stats(&self) -> FrameStats {
        self.runtime
            .as_ref()
            .map(|runtime| FrameStats {
                draw_calls: 0,
                ..runtime.last_frame()
            })
            .unwrap_or_default()
    }
}

/// Rotation component of a primitive's model matrix
pub fn primitive_rotation(primitive: &Primitive) -> Quat {
    primitive.model_matrix.to_scale_rotation_translation().1
}
