//! Adapters for the supported engines

pub mod babylon;
pub mod cesium;
pub mod three;

pub use babylon::{BabylonAdapter, BabylonImportResult, BabylonMesh, VertexKind};
pub use cesium::{CesiumAdapter, CesiumGeometry, Primitive, PrimitiveCollection};
pub use three::{BufferAttribute, BufferGeometry, Object3D, ObjectKind, ThreeAdapter};
