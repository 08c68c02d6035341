//! Serialized mesh format
//!
//! The engine-neutral shape every adapter reads and writes. Vertex attributes
//! are flat numeric arrays (`[x, y, z, x, y, z, ...]`) so the format can be
//! persisted as plain JSON. Attributes that a mesh does not carry are omitted,
//! never zero-filled.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use tessera_core::EngineKind;
use tessera_core::math::Aabb;
use thiserror::Error;

/// Rotation as stored in the format.
///
/// Euler angles are radians in XYZ order. Quaternions are `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    Euler([f32; 3]),
    Quaternion([f32; 4]),
}

impl Rotation {
    /// Convert to a quaternion
    pub fn to_quat(&self) -> Quat {
        match *self {
            Rotation::Euler([x, y, z]) => Quat::from_euler(EulerRot::XYZ, x, y, z),
            Rotation::Quaternion(q) => Quat::from_array(q),
        }
    }

    /// Convert to XYZ Euler angles
    pub fn to_euler(&self) -> Vec3 {
        match *self {
            Rotation::Euler(e) => Vec3::from_array(e),
            Rotation::Quaternion(q) => {
                let (x, y, z) = Quat::from_array(q).to_euler(EulerRot::XYZ);
                Vec3::new(x, y, z)
            }
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::Euler([0.0; 3])
    }
}

/// Local transform of a serialized mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerializedTransform {
    pub position: [f32; 3],
    pub rotation: Rotation,
    pub scale: [f32; 3],
}

impl SerializedTransform {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        position: [0.0; 3],
        rotation: Rotation::Euler([0.0; 3]),
        scale: [1.0; 3],
    };

    /// Create a transform from its parts
    pub fn new(position: [f32; 3], rotation: Rotation, scale: [f32; 3]) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Compare two transforms component-wise.
    ///
    /// Rotations are compared as quaternions, so an Euler rotation and the
    /// equivalent quaternion compare equal.
    pub fn approx_eq(&self, other: &SerializedTransform, epsilon: f32) -> bool {
        let close = |a: &[f32], b: &[f32]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= epsilon);
        let qa = self.rotation.to_quat();
        let qb = other.rotation.to_quat();
        close(&self.position, &other.position)
            && close(&self.scale, &other.scale)
            && (qa.dot(qb).abs() - 1.0).abs() <= epsilon
    }
}

impl Default for SerializedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Structural problem found in a serialized mesh
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshDefect {
    #[error("no position data")]
    MissingPositions,

    #[error("position buffer length {0} is not a multiple of 3")]
    PositionsNotTriples(usize),

    #[error("normal buffer has {actual} floats, expected {expected}")]
    NormalsLength { expected: usize, actual: usize },

    #[error("uv buffer has {actual} floats, expected {expected}")]
    UvsLength { expected: usize, actual: usize },

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Engine-agnostic description of one mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedMesh {
    pub name: String,
    pub transform: SerializedTransform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

impl SerializedMesh {
    /// Create a mesh carrying only positions
    pub fn new(name: impl Into<String>, transform: SerializedTransform, positions: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            transform,
            positions: Some(positions),
            normals: None,
            uvs: None,
            indices: None,
        }
    }

    /// Attach normals
    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Attach texture coordinates
    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Attach an index buffer
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Number of vertices (`positions.len() / 3`)
    pub fn vertex_count(&self) -> usize {
        self.positions.as_ref().map_or(0, |p| p.len() / 3)
    }

    /// Number of triangles, indexed or not
    pub fn face_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    /// Local-space bounds of the position buffer
    pub fn bounds(&self) -> Aabb {
        self.positions
            .as_deref()
            .map(Aabb::from_flat_positions)
            .unwrap_or(Aabb::EMPTY)
    }

    /// Check the buffers are consistent with each other
    pub fn validate(&self) -> Result<(), MeshDefect> {
        let positions = self.positions.as_ref().ok_or(MeshDefect::MissingPositions)?;
        if positions.len() % 3 != 0 {
            return Err(MeshDefect::PositionsNotTriples(positions.len()));
        }
        let vertex_count = positions.len() / 3;

        if let Some(normals) = &self.normals {
            if normals.len() != positions.len() {
                return Err(MeshDefect::NormalsLength {
                    expected: positions.len(),
                    actual: normals.len(),
                });
            }
        }

        if let Some(uvs) = &self.uvs {
            if uvs.len() != vertex_count * 2 {
                return Err(MeshDefect::UvsLength {
                    expected: vertex_count * 2,
                    actual: uvs.len(),
                });
            }
        }

        if let Some(indices) = &self.indices {
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshDefect::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        Ok(())
    }
}

/// Engine-tagged collection of serialized meshes.
///
/// An asset with no meshes (for example a lights-only fragment) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedAsset {
    pub engine_type: EngineKind,
    #[serde(default)]
    pub meshes: Vec<SerializedMesh>,
}

impl SerializedAsset {
    /// Create an empty asset for an engine
    pub fn new(engine_type: EngineKind) -> Self {
        Self {
            engine_type,
            meshes: Vec::new(),
        }
    }

    /// Total vertices across all meshes
    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(SerializedMesh::vertex_count).sum()
    }

    /// Total triangles across all meshes
    pub fn face_count(&self) -> usize {
        self.meshes.iter().map(SerializedMesh::face_count).sum()
    }

    /// Bounds of all meshes in local space (transforms are not applied)
    pub fn bounds(&self) -> Aabb {
        self.meshes
            .iter()
            .fold(Aabb::EMPTY, |acc, mesh| acc.merge(&mesh.bounds()))
    }
}
