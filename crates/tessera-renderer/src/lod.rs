//! Level of detail
//!
//! A [`LodObject`] owns a set of native mesh variants, each tagged with the
//! camera distance from which it should be shown. Updating with a camera
//! distance enables the variant with the largest trigger distance not
//! exceeding it and disables every other variant.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tessera_assets::EngineAdapter;
use tessera_core::math::camera_distance;
use tessera_core::{ObjectId, SceneRegistry};

use crate::perf::PerformanceEvent;
use crate::{RendererError, RendererResult};

/// One level of detail
#[derive(Debug)]
pub struct LodVariant<M> {
    pub trigger_distance: f32,
    pub payload: M,
    pub enabled: bool,
}

/// Object switching between mesh variants by camera distance
pub struct LodObject<A: EngineAdapter> {
    name: String,
    position: Vec3,
    /// Sorted by trigger distance, ascending
    variants: SmallVec<[LodVariant<A::Mesh>; 4]>,
    adapter: Arc<A>,
    active: Option<usize>,
    distance_scale: f32,
}

impl<A: EngineAdapter> LodObject<A> {
    pub fn new(name: impl Into<String>, position: Vec3, adapter: Arc<A>) -> Self {
        Self {
            name: name.into(),
            position,
            variants: SmallVec::new(),
            adapter,
            active: None,
            distance_scale: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn distance_scale(&self) -> f32 {
        self.distance_scale
    }

    /// Multiplier applied to camera distances before selection.
    ///
    /// Values above 1 switch to coarser variants sooner.
    pub fn set_distance_scale(&mut self, scale: f32) {
        self.distance_scale = scale;
    }

    /// Register a variant, disabled until the next update.
    ///
    /// A variant already registered at the same distance is replaced and its
    /// payload disposed. A negative or non-finite distance is rejected and the
    /// payload is disposed.
    pub fn add_lod_level(&mut self, trigger_distance: f32, mut payload: A::Mesh) -> RendererResult<()> {
        if !trigger_distance.is_finite() || trigger_distance < 0.0 {
            self.adapter.dispose(payload);
            return Err(RendererError::InvalidTriggerDistance(trigger_distance));
        }

        self.adapter.set_enabled(&mut payload, false);
        let variant = LodVariant {
            trigger_distance,
            payload,
            enabled: false,
        };

        let slot = self
            .variants
            .partition_point(|v| v.trigger_distance < trigger_distance);
        let replaces = self
            .variants
            .get(slot)
            .is_some_and(|v| v.trigger_distance == trigger_distance);

        if replaces {
            let previous = std::mem::replace(&mut self.variants[slot], variant);
            self.adapter.dispose(previous.payload);
            if self.active == Some(slot) {
                self.active = None;
            }
            log::debug!("{}: replaced LOD level at {}", self.name, trigger_distance);
        } else {
            self.variants.insert(slot, variant);
            if let Some(active) = self.active.as_mut() {
                if *active >= slot {
                    *active += 1;
                }
            }
        }
        Ok(())
    }

    /// Select the variant for a camera distance.
    ///
    /// Returns the trigger distance of the enabled variant, or `None` when no
    /// variant qualifies (every variant is then disabled). Repeating the
    /// current selection leaves native state untouched.
    pub fn update_lod(&mut self, camera_distance: f32) -> Option<f32> {
        let distance = camera_distance * self.distance_scale;
        let selected = match self
            .variants
            .partition_point(|v| v.trigger_distance <= distance)
        {
            0 => None,
            n => Some(n - 1),
        };

        if selected != self.active {
            for (i, variant) in self.variants.iter_mut().enumerate() {
                if Some(i) != selected && variant.enabled {
                    self.adapter.set_enabled(&mut variant.payload, false);
                    variant.enabled = false;
                }
            }
            if let Some(variant) = selected.map(|i| &mut self.variants[i]) {
                self.adapter.set_enabled(&mut variant.payload, true);
                variant.enabled = true;
            }
            self.active = selected;
        }

        self.active_distance()
    }

    /// Select the variant for a camera position
    pub fn update_from_camera(&mut self, camera: Vec3) -> Option<f32> {
        self.update_lod(camera_distance(camera, self.position))
    }

    /// Trigger distance of the enabled variant
    pub fn active_distance(&self) -> Option<f32> {
        self.active.map(|i| self.variants[i].trigger_distance)
    }

    /// Payload of the enabled variant
    pub fn active_payload(&self) -> Option<&A::Mesh> {
        self.active.map(|i| &self.variants[i].payload)
    }

    pub fn variants(&self) -> &[LodVariant<A::Mesh>] {
        &self.variants
    }

    pub fn enabled_count(&self) -> usize {
        self.variants.iter().filter(|v| v.enabled).count()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Release every variant's native resources
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.variants.is_empty() {
            return;
        }
        let count = self.variants.len();
        for variant in self.variants.drain(..) {
            self.adapter.dispose(variant.payload);
        }
        self.active = None;
        log::debug!("{}: released {} LOD levels", self.name, count);
    }
}

impl<A: EngineAdapter> Drop for LodObject<A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A: EngineAdapter> std::fmt::Debug for LodObject<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let triggers: SmallVec<[f32; 4]> = self.variants.iter().map(|v| v.trigger_distance).collect();
        f.debug_struct("LodObject")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("triggers", &triggers)
            .field("active", &self.active_distance())
            .field("distance_scale", &self.distance_scale)
            .finish()
    }
}

/// LOD manager configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodManagerConfig {
    /// Distance scale applied while the frame rate is degraded
    pub degraded_distance_scale: f32,
}

impl Default for LodManagerConfig {
    fn default() -> Self {
        Self {
            degraded_distance_scale: 1.5,
        }
    }
}

/// LOD objects bound to scene registry entries
pub struct LodManager<A: EngineAdapter> {
    config: LodManagerConfig,
    objects: AHashMap<ObjectId, LodObject<A>>,
    degraded: bool,
}

impl<A: EngineAdapter> LodManager<A> {
    pub fn new(config: LodManagerConfig) -> Self {
        Self {
            config,
            objects: AHashMap::new(),
            degraded: false,
        }
    }

    fn current_scale(&self) -> f32 {
        if self.degraded {
            self.config.degraded_distance_scale
        } else {
            1.0
        }
    }

    /// Bind a LOD object to a registered scene object.
    ///
    /// An object already bound to `id` is replaced and released.
    pub fn attach(
        &mut self,
        registry: &SceneRegistry,
        id: ObjectId,
        mut object: LodObject<A>,
    ) -> RendererResult<()> {
        let position = registry
            .position(id)
            .ok_or(RendererError::UnknownObject(id))?;
        object.set_position(position);
        object.set_distance_scale(self.current_scale());
        self.objects.insert(id, object);
        Ok(())
    }

    /// Unbind a LOD object, handing ownership back to the caller
    pub fn detach(&mut self, id: ObjectId) -> Option<LodObject<A>> {
        self.objects.remove(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&LodObject<A>> {
        self.objects.get(&id)
    }

    /// Refresh positions from the registry and update every object.
    ///
    /// Objects whose scene entry was despawned are released. Returns the
    /// number of objects updated.
    pub fn update(&mut self, registry: &SceneRegistry, camera: Vec3) -> usize {
        self.objects.retain(|id, object| match registry.position(*id) {
            Some(position) => {
                object.set_position(position);
                object.update_from_camera(camera);
                true
            }
            None => {
                log::debug!("Releasing LOD object for despawned {}", id);
                false
            }
        });
        self.objects.len()
    }

    /// Switch between the normal and degraded distance scale
    pub fn on_performance(&mut self, event: &PerformanceEvent) {
        let degraded = matches!(event, PerformanceEvent::Degraded(_));
        if degraded == self.degraded {
            return;
        }
        self.degraded = degraded;
        let scale = self.current_scale();
        for object in self.objects.values_mut() {
            object.set_distance_scale(scale);
        }
        log::info!(
            "LOD distance scale set to {} ({} fps)",
            scale,
            event.metrics().fps
        );
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Release every managed object
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perf::PerformanceMetrics;
    use tessera_assets::engines::babylon::{BabylonMesh, VertexKind};
    use tessera_assets::{BabylonAdapter, NativeRuntime, SerializedMesh, SerializedTransform};
    use tessera_core::EngineKind;

    fn setup() -> (Arc<NativeRuntime>, Arc<BabylonAdapter>) {
        let runtime = Arc::new(NativeRuntime::new(EngineKind::Babylon));
        let adapter = Arc::new(BabylonAdapter::new(runtime.clone()));
        (runtime, adapter)
    }

    fn built_mesh(adapter: &BabylonAdapter, name: &str) -> BabylonMesh {
        let data = SerializedMesh::new(
            name,
            SerializedTransform::IDENTITY,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        );
        adapter.build_mesh(&data).unwrap()
    }

    fn plain_mesh(name: &str) -> BabylonMesh {
        let mut mesh = BabylonMesh::new(name);
        mesh.set_vertices_data(VertexKind::Position, vec![0.0; 9]);
        mesh
    }

    fn four_levels(adapter: &Arc<BabylonAdapter>) -> LodObject<BabylonAdapter> {
        let mut object = LodObject::new("tower", Vec3::ZERO, adapter.clone());
        // Unsorted
        for distance in [200.0, 0.0, 500.0, 50.0] {
            object
                .add_lod_level(distance, plain_mesh(&format!("lod{distance}")))
                .unwrap();
        }
        object
    }

    fn metrics(fps: u32) -> PerformanceMetrics {
        PerformanceMetrics {
            fps,
            ..PerformanceMetrics::empty(EngineKind::Babylon)
        }
    }

    #[test]
    fn test_selection() {
        let (_, adapter) = setup();
        let mut object = four_levels(&adapter);

        assert_eq!(object.enabled_count(), 0);
        assert_eq!(object.update_lod(30.0), Some(0.0));
        assert_eq!(object.update_lod(75.0), Some(50.0));
        assert_eq!(object.update_lod(600.0), Some(500.0));
        assert_eq!(object.update_lod(200.0), Some(200.0));
        assert_eq!(object.enabled_count(), 1);
        assert_eq!(object.active_payload().map(|m| m.name.as_str()), Some("lod200"));
    }

    #[test]
    fn test_exactly_one_enabled_after_each_update() {
        let (_, adapter) = setup();
        let mut object = four_levels(&adapter);

        for distance in [0.0, 49.9, 50.0, 199.0, 1e6, 10.0, 500.0] {
            object.update_lod(distance);
            assert_eq!(object.enabled_count(), 1, "distance {distance}");
            let enabled: Vec<_> = object
                .variants()
                .iter()
                .filter(|v| adapter.is_enabled(&v.payload))
                .collect();
            assert_eq!(enabled.len(), 1);
        }
    }

    #[test]
    fn test_no_qualifying_variant() {
        let (_, adapter) = setup();
        let mut object = LodObject::new("far", Vec3::ZERO, adapter.clone());
        object.add_lod_level(100.0, plain_mesh("a")).unwrap();

        assert_eq!(object.update_lod(50.0), None);
        assert_eq!(object.enabled_count(), 0);
        assert_eq!(object.update_lod(150.0), Some(100.0));
        assert_eq!(object.update_lod(10.0), None);
        assert_eq!(object.enabled_count(), 0);
        assert_eq!(object.update_lod(f32::NAN), None);
    }

    #[test]
    fn test_same_distance_replaces_and_disposes() {
        let (runtime, adapter) = setup();
        let mut object = LodObject::new("crate", Vec3::ZERO, adapter.clone());

        object.add_lod_level(0.0, built_mesh(&adapter, "old")).unwrap();
        object.update_lod(10.0);
        object.add_lod_level(0.0, built_mesh(&adapter, "new")).unwrap();

        assert_eq!(object.len(), 1);
        assert_eq!(runtime.live_materials(), 1);
        assert_eq!(object.enabled_count(), 0);
        assert_eq!(object.update_lod(10.0), Some(0.0));
        assert_eq!(object.active_payload().map(|m| m.name.as_str()), Some("new"));
    }

    #[test]
    fn test_insert_keeps_active_selection() {
        let (_, adapter) = setup();
        let mut object = LodObject::new("rock", Vec3::ZERO, adapter.clone());
        object.add_lod_level(100.0, plain_mesh("coarse")).unwrap();
        object.update_lod(150.0);

        object.add_lod_level(10.0, plain_mesh("fine")).unwrap();
        assert_eq!(object.active_distance(), Some(100.0));
        assert_eq!(object.update_lod(150.0), Some(100.0));
        assert_eq!(object.enabled_count(), 1);
    }

    #[test]
    fn test_invalid_trigger_distance() {
        let (runtime, adapter) = setup();
        let mut object = LodObject::new("bad", Vec3::ZERO, adapter.clone());

        let err = object
            .add_lod_level(-1.0, built_mesh(&adapter, "neg"))
            .unwrap_err();
        assert_eq!(err, RendererError::InvalidTriggerDistance(-1.0));
        assert!(object.add_lod_level(f32::INFINITY, plain_mesh("inf")).is_err());
        assert!(object.is_empty());
        assert_eq!(runtime.live_buffers(), 0);
    }

    #[test]
    fn test_dispose_releases_everything() {
        let (runtime, adapter) = setup();
        let mut object = LodObject::new("ship", Vec3::ZERO, adapter.clone());
        for distance in [0.0, 50.0, 200.0] {
            object
                .add_lod_level(distance, built_mesh(&adapter, "ship"))
                .unwrap();
        }
        assert_eq!(runtime.live_buffers(), 3);

        object.dispose();
        assert_eq!(runtime.live_buffers(), 0);
        assert_eq!(runtime.live_materials(), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let (runtime, adapter) = setup();
        {
            let mut object = LodObject::new("ship", Vec3::ZERO, adapter.clone());
            object.add_lod_level(0.0, built_mesh(&adapter, "ship")).unwrap();
        }
        assert_eq!(runtime.live_buffers(), 0);
    }

    #[test]
    fn test_distance_scale_and_camera() {
        let (_, adapter) = setup();
        let mut object = four_levels(&adapter);
        object.set_position(Vec3::new(0.0, 0.0, 100.0));

        assert_eq!(object.update_from_camera(Vec3::new(0.0, 0.0, 40.0)), Some(50.0));
        object.set_distance_scale(2.0);
        assert_eq!(object.update_from_camera(Vec3::new(0.0, 0.0, 40.0)), Some(50.0));
        assert_eq!(object.update_from_camera(Vec3::ZERO), Some(200.0));
    }

    #[test]
    fn test_manager_follows_registry() {
        let (runtime, adapter) = setup();
        let mut registry = SceneRegistry::new();
        let id = registry.spawn("tower", Vec3::new(0.0, 0.0, 100.0));

        let mut manager = LodManager::new(LodManagerConfig::default());
        let mut object = LodObject::new("tower", Vec3::ZERO, adapter.clone());
        object.add_lod_level(0.0, built_mesh(&adapter, "near")).unwrap();
        object.add_lod_level(150.0, built_mesh(&adapter, "far")).unwrap();
        manager.attach(&registry, id, object).unwrap();

        assert_eq!(manager.update(&registry, Vec3::ZERO), 1);
        assert_eq!(manager.get(id).and_then(LodObject::active_distance), Some(0.0));

        registry.set_position(id, Vec3::new(0.0, 0.0, 300.0));
        manager.update(&registry, Vec3::ZERO);
        assert_eq!(manager.get(id).and_then(LodObject::active_distance), Some(150.0));

        registry.despawn(id);
        assert_eq!(manager.update(&registry, Vec3::ZERO), 0);
        assert!(manager.is_empty());
        assert_eq!(runtime.live_buffers(), 0);
    }

    #[test]
    fn test_manager_rejects_unknown_object() {
        let (_, adapter) = setup();
        let mut registry = SceneRegistry::new();
        let id = registry.spawn("ghost", Vec3::ZERO);
        registry.despawn(id);

        let mut manager = LodManager::new(LodManagerConfig::default());
        let err = manager
            .attach(&registry, id, LodObject::new("ghost", Vec3::ZERO, adapter))
            .unwrap_err();
        assert_eq!(err, RendererError::UnknownObject(id));
    }

    #[test]
    fn test_manager_degraded_scale() {
        let (_, adapter) = setup();
        let mut registry = SceneRegistry::new();
        let id = registry.spawn("tower", Vec3::new(0.0, 0.0, 160.0));

        let mut manager = LodManager::new(LodManagerConfig::default());
        manager
            .attach(&registry, id, four_levels(&adapter))
            .unwrap();

        manager.update(&registry, Vec3::ZERO);
        assert_eq!(manager.get(id).and_then(LodObject::active_distance), Some(50.0));

        manager.on_performance(&PerformanceEvent::Degraded(metrics(20)));
        assert!(manager.is_degraded());
        manager.update(&registry, Vec3::ZERO);
        assert_eq!(manager.get(id).and_then(LodObject::active_distance), Some(200.0));

        manager.on_performance(&PerformanceEvent::Recovered(metrics(60)));
        manager.update(&registry, Vec3::ZERO);
        assert_eq!(manager.get(id).and_then(LodObject::active_distance), Some(50.0));
    }
}
