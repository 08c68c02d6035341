//! # Tessera Renderer
//!
//! Runtime-side helpers that sit next to the host engine's render loop.
//!
//! ## Features
//! - Distance-based LOD switching with exactly one active variant per object
//! - Scene-wide LOD management driven by the scene registry
//! - Once-per-second frame-rate and render-counter sampling
//! - Degradation events when the frame rate drops below a threshold

pub mod lod;
pub mod perf;

pub use lod::{LodManager, LodManagerConfig, LodObject, LodVariant};
pub use perf::{
    FrameTimeStats, MonitorConfig, PerformanceEvent, PerformanceMetrics, PerformanceMonitor,
    RenderHook, SubscriptionId,
};

use tessera_core::ObjectId;
use thiserror::Error;

/// Renderer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendererError {
    #[error("Invalid LOD trigger distance: {0}")]
    InvalidTriggerDistance(f32),

    #[error("Unknown scene object: {0}")]
    UnknownObject(ObjectId),
}

/// Result type for renderer operations
pub type RendererResult<T> = Result<T, RendererError>;
