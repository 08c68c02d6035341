//! Engine adapters
//!
//! The seam between the engine-neutral format and a concrete rendering
//! runtime. Rendering itself happens outside this crate; a [`NativeRuntime`]
//! stands in for the loaded engine and keeps the bookkeeping the adapters need
//! (buffer and material handles, per-frame render counters).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tessera_core::EngineKind;

use crate::SerializationError;
use crate::format::SerializedMesh;

/// Per-frame render counters reported by an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    pub draw_calls: u64,
    pub triangle_count: u64,
    pub memory_usage: u64,
}

/// Handle to a vertex or index buffer owned by a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

/// Handle to a material owned by a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u64);

/// Injected handle to a loaded engine
#[derive(Debug)]
pub struct NativeRuntime {
    kind: EngineKind,
    next_handle: AtomicU64,
    buffers: Mutex<AHashMap<BufferHandle, usize>>,
    materials: Mutex<AHashSet<MaterialHandle>>,
    draw_calls: AtomicU64,
    triangles: AtomicU64,
}

impl NativeRuntime {
    /// Create a runtime for the given engine
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            next_handle: AtomicU64::new(1),
            buffers: Mutex::new(AHashMap::new()),
            materials: Mutex::new(AHashSet::new()),
            draw_calls: AtomicU64::new(0),
            triangles: AtomicU64::new(0),
        }
    }

    /// Engine this runtime belongs to
    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    fn allocate(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    /// Upload a buffer of `bytes` bytes
    pub fn create_buffer(&self, bytes: usize) -> BufferHandle {
        let handle = BufferHandle(self.allocate());
        self.buffers.lock().insert(handle, bytes);
        handle
    }

    /// Release a buffer. Returns false if the handle was not live.
    pub fn release_buffer(&self, handle: BufferHandle) -> bool {
        self.buffers.lock().remove(&handle).is_some()
    }

    /// Create the flat default material applied to rebuilt meshes
    pub fn create_default_material(&self) -> MaterialHandle {
        let handle = MaterialHandle(self.allocate());
        self.materials.lock().insert(handle);
        handle
    }

    /// Release a material. Returns false if the handle was not live.
    pub fn release_material(&self, handle: MaterialHandle) -> bool {
        self.materials.lock().remove(&handle)
    }

    /// Number of live buffers
    pub fn live_buffers(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Number of live materials
    pub fn live_materials(&self) -> usize {
        self.materials.lock().len()
    }

    /// Total bytes held by live buffers
    pub fn buffer_bytes(&self) -> u64 {
        self.buffers.lock().values().map(|&b| b as u64).sum()
    }

    /// Record the counters of the frame that was just rendered
    pub fn record_frame(&self, draw_calls: u64, triangles: u64) {
        self.draw_calls.store(draw_calls, Ordering::Relaxed);
        self.triangles.store(triangles, Ordering::Relaxed);
    }

    /// Counters of the last rendered frame
    pub fn last_frame(&self) -> FrameStats {
        FrameStats {
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            triangle_count: self.triangles.load(Ordering::Relaxed),
            memory_usage: self.buffer_bytes(),
        }
    }
}

/// Byte size of a float attribute once uploaded
pub(crate) fn f32_bytes(len: usize) -> usize {
    len * std::mem::size_of::<f32>()
}

/// Byte size of an index buffer once uploaded
pub(crate) fn u32_bytes(len: usize) -> usize {
    len * std::mem::size_of::<u32>()
}

/// Conversion between one engine's native objects and the serialized format
pub trait EngineAdapter: Send + Sync {
    /// Native scene or loader result
    type Scene: Send;

    /// Native mesh
    type Mesh: Send;

    /// Engine served by this adapter
    fn kind(&self) -> EngineKind;

    /// Runtime handle, `None` when the engine is not loaded in this process
    fn runtime(&self) -> Option<&Arc<NativeRuntime>>;

    /// Extract every mesh carrying positions from a native scene
    fn serialize(&self, scene: &Self::Scene) -> Result<Vec<SerializedMesh>, SerializationError>;

    /// Build one native mesh, with buffers, transform and default material applied
    fn build_mesh(&self, mesh: &SerializedMesh) -> Result<Self::Mesh, SerializationError>;

    /// Wrap built meshes into a native scene
    fn assemble(&self, meshes: Vec<Self::Mesh>) -> Self::Scene;

    /// Show or hide a mesh
    fn set_enabled(&self, mesh: &mut Self::Mesh, enabled: bool);

    /// Whether a mesh is currently shown
    fn is_enabled(&self, mesh: &Self::Mesh) -> bool;

    /// Release the native resources held by a mesh
    fn dispose(&self, mesh: Self::Mesh);

    /// Counters of the last rendered frame
    fn frame_stats(&self) -> FrameStats;

    /// Runtime handle, failing when it is missing or belongs to another engine
    fn require_runtime(&self) -> Result<&Arc<NativeRuntime>, SerializationError> {
        match self.runtime() {
            Some(runtime) if runtime.kind() == self.kind() => Ok(runtime),
            _ => Err(SerializationError::RuntimeUnavailable(self.kind())),
        }
    }
}
