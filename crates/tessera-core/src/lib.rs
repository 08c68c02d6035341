//! # Tessera Core
//!
//! Core types shared by every Tessera crate.
//!
//! This crate provides the foundations of the multi-engine asset runtime:
//! - **EngineKind**: The closed set of supported 3D rendering engines
//! - **Time**: Wall-clock and monotonic clocks, with a manual clock for tests
//! - **Scene**: Object registry holding positions and object-to-object relations
//! - **Math**: glam re-exports and bounding volumes

pub mod math;
pub mod scene;
pub mod time;

pub use scene::{ObjectId, SceneObject, SceneRegistry};
pub use time::{Clock, ManualClock, SystemClock};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when an engine name cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown engine type: {0} (expected babylon, three or cesium)")]
pub struct ParseEngineKindError(pub String);

/// Supported 3D rendering engines.
///
/// Every cached entry, serialized payload and performance sample is tagged
/// with exactly one engine. The serde representation uses the engine tags
/// found in persisted cache records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EngineKind {
    /// Babylon.js style engine (flat mesh arrays, vertex data by kind)
    #[serde(rename = "3D_ENGINE_BABYLON")]
    Babylon,
    /// three.js style engine (object tree with buffer geometries)
    #[serde(rename = "3D_ENGINE_THREE")]
    Three,
    /// Cesium style engine (primitive collections with model matrices)
    #[serde(rename = "3D_ENGINE_CESIUM")]
    Cesium,
}

impl EngineKind {
    /// All supported engines
    pub const ALL: [EngineKind; 3] = [EngineKind::Babylon, EngineKind::Three, EngineKind::Cesium];

    /// Persisted tag for this engine
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Babylon => "3D_ENGINE_BABYLON",
            Self::Three => "3D_ENGINE_THREE",
            Self::Cesium => "3D_ENGINE_CESIUM",
        }
    }

    /// Short lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Babylon => "babylon",
            Self::Three => "three",
            Self::Cesium => "cesium",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = ParseEngineKindError;

    /// Accepts both the short names and the persisted tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        EngineKind::ALL
            .into_iter()
            .find(|kind| {
                kind.name().eq_ignore_ascii_case(normalized) || kind.tag() == normalized
            })
            .ok_or_else(|| ParseEngineKindError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("babylon".parse::<EngineKind>().unwrap(), EngineKind::Babylon);
        assert_eq!("Three".parse::<EngineKind>().unwrap(), EngineKind::Three);
        assert_eq!("3D_ENGINE_CESIUM".parse::<EngineKind>().unwrap(), EngineKind::Cesium);
        assert!("unity".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_engine_kind_serde_tag() {
        let json = serde_json::to_string(&EngineKind::Three).unwrap();
        assert_eq!(json, "\"3D_ENGINE_THREE\"");

        let kind: EngineKind = serde_json::from_str("\"3D_ENGINE_BABYLON\"").unwrap();
        assert_eq!(kind, EngineKind::Babylon);
    }

    #[test]
    fn test_engine_kind_display() {
        for kind in EngineKind::ALL {
            assert_eq!(kind.to_string().parse::<EngineKind>().unwrap(), kind);
        }
    }
}
