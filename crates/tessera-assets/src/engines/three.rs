//! Three adapter
//!
//! Three scenes are `Object3D` trees. Only mesh-like nodes carry geometry, and
//! geometry attributes are addressed by name (`position`, `normal`, `uv`).

use std::sync::Arc;

use ahash::AHashMap;
use glam::{EulerRot, Quat, Vec3};
use tessera_core::EngineKind;

use crate::SerializationError;
use crate::adapter::{
    BufferHandle, EngineAdapter, FrameStats, MaterialHandle, NativeRuntime, f32_bytes, u32_bytes,
};
use crate::format::{Rotation, SerializedMesh, SerializedTransform};

const POSITION: &str = "position";
const NORMAL: &str = "normal";
const UV: &str = "uv";

/// Node type in an object tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Object3D,
    Group,
    Mesh,
    SkinnedMesh,
}

impl ObjectKind {
    /// Whether nodes of this kind can carry geometry
    pub fn is_mesh(&self) -> bool {
        matches!(self, ObjectKind::Mesh | ObjectKind::SkinnedMesh)
    }
}

/// Flat typed array with its per-vertex item size
#[derive(Debug, Clone, PartialEq)]
pub struct BufferAttribute {
    pub array: Vec<f32>,
    pub item_size: usize,
}

impl BufferAttribute {
    pub fn new(array: Vec<f32>, item_size: usize) -> Self {
        Self { array, item_size }
    }

    /// Number of items (vertices) in the attribute
    pub fn count(&self) -> usize {
        self.array.len() / self.item_size.max(1)
    }
}

/// Geometry with named attributes
#[derive(Debug, Clone, Default)]
pub struct BufferGeometry {
    attributes: AHashMap<String, BufferAttribute>,
    index: Option<Vec<u32>>,
    buffers: Vec<BufferHandle>,
}

impl BufferGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: BufferAttribute) {
        self.attributes.insert(name.into(), attribute);
    }

    pub fn get_attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    pub fn set_index(&mut self, index: Vec<u32>) {
        self.index = Some(index);
    }

    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }
}

/// Node of a Three scene graph
#[derive(Debug, Clone)]
pub struct Object3D {
    pub name: String,
    pub kind: ObjectKind,
    pub position: Vec3,
    /// Euler angles in XYZ order
    pub rotation: Vec3,
    pub scale: Vec3,
    pub visible: bool,
    pub geometry: Option<BufferGeometry>,
    material: Option<MaterialHandle>,
    pub children: Vec<Object3D>,
}

impl Object3D {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            visible: true,
            geometry: None,
            material: None,
            children: Vec::new(),
        }
    }

    /// Create a group node
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Group)
    }

    /// Create a mesh node with geometry
    pub fn mesh(name: impl Into<String>, geometry: BufferGeometry) -> Self {
        let mut node = Self::new(name, ObjectKind::Mesh);
        node.geometry = Some(geometry);
        node
    }

    pub fn add(&mut self, child: Object3D) {
        self.children.push(child);
    }

    /// Visit this node and every descendant, parents first
    pub fn traverse<'a>(&'a self, visit: &mut impl FnMut(&'a Object3D)) {
        visit(self);
        for child in &self.children {
            child.traverse(visit);
        }
    }

    /// Material assigned when the mesh was rebuilt
    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }
}

/// Adapter for Three scenes
#[derive(Debug, Clone)]
pub struct ThreeAdapter {
    runtime: Option<Arc<NativeRuntime>>,
}

impl ThreeAdapter {
    pub fn new(runtime: Arc<NativeRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Adapter for a process where Three is not loaded
    pub fn detached() -> Self {
        Self { runtime: None }
    }

    fn release(&self, runtime: &NativeRuntime, node: Object3D) {
        if let Some(geometry) = node.geometry {
            for buffer in geometry.buffers {
                runtime.release_buffer(buffer);
            }
        }
        if let Some(material) = node.material {
            runtime.release_material(material);
        }
        for child in node.children {
            self.release(runtime, child);
        }
    }
}

fn serialize_node(node: &Object3D) -> Option<SerializedMesh> {
    if !node.kind.is_mesh() {
        return None;
    }
    let geometry = node.geometry.as_ref()?;
    let positions = geometry.get_attribute(POSITION)?;

    Some(SerializedMesh {
        name: node.name.clone(),
        transform: SerializedTransform::new(
            node.position.to_array(),
            Rotation::Euler(node.rotation.to_array()),
            node.scale.to_array(),
        ),
        positions: Some(positions.array.clone()),
        normals: geometry.get_attribute(NORMAL).map(|a| a.array.clone()),
        uvs: geometry.get_attribute(UV).map(|a| a.array.clone()),
        indices: geometry.index().map(<[u32]>::to_vec),
    })
}

impl EngineAdapter for ThreeAdapter {
    type Scene = Object3D;
    type Mesh = Object3D;

    fn kind(&self) -> EngineKind {
        EngineKind::Three
    }

    fn runtime(&self) -> Option<&Arc<NativeRuntime>> {
        self.runtime.as_ref()
    }

    fn serialize(&self, scene: &Object3D) -> Result<Vec<SerializedMesh>, SerializationError> {
        self.require_runtime()?;

        let mut meshes = Vec::new();
        scene.traverse(&mut |node| {
            if let Some(mesh) = serialize_node(node) {
                meshes.push(mesh);
            }
        });
        Ok(meshes)
    }

    fn build_mesh(&self, data: &SerializedMesh) -> Result<Object3D, SerializationError> {
        let runtime = self.require_runtime()?;
        data.validate()
            .map_err(|defect| SerializationError::MalformedMesh {
                mesh: data.name.clone(),
                defect,
            })?;

        let mut geometry = BufferGeometry::new();
        let attributes = [(POSITION, &data.positions, 3), (NORMAL, &data.normals, 3), (UV, &data.uvs, 2)];
        for (name, values, item_size) in attributes {
            if let Some(values) = values {
                geometry.buffers.push(runtime.create_buffer(f32_bytes(values.len())));
                geometry.set_attribute(name, BufferAttribute::new(values.clone(), item_size));
            }
        }
        if let Some(indices) = &data.indices {
            geometry.buffers.push(runtime.create_buffer(u32_bytes(indices.len())));
            geometry.set_index(indices.clone());
        }

        let mut node = Object3D::mesh(data.name.clone(), geometry);
        node.position = Vec3::from_array(data.transform.position);
        node.rotation = data.transform.rotation.to_euler();
        node.scale = Vec3::from_array(data.transform.scale);
        node.material = Some(runtime.create_default_material());

        Ok(node)
    }

    fn assemble(&self, meshes: Vec<Object3D>) -> Object3D {
        let mut group = Object3D::group("");
        group.children = meshes;
        group
    }

    fn set_enabled(&self, mesh: &mut Object3D, enabled: bool) {
        mesh.visible = enabled;
    }

    fn is_enabled(&self, mesh: &Object3D) -> bool {
        mesh.visible
    }

    fn dispose(&self, mesh: Object3D) {
        if let Some(runtime) = &self.runtime {
            self.release(runtime, mesh);
        }
    }

    fn frame_stats(&self) -> FrameStats {
        self.runtime
            .as_ref()
            .map(|runtime| runtime.last_frame())
            .unwrap_or_default()
    }
}

/// Rotation of a node as a quaternion
pub fn node_quat(node: &Object3D) -> Quat {
    Quat::from_euler(EulerRot::XYZ, node.rotation.x, node.rotation.y, node.rotation.z)
}
