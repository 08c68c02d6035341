//! Scene Registry
//!
//! Owned by the scene composition layer. Holds:
//! - Logical object positions (what LOD distance checks are measured against)
//! - Object-to-object relations such as a light aimed at a loaded model
//!
//! Relations are stored as id pairs, never as handles to engine objects, so
//! despawning a target cannot leave a dangling reference behind.

use indexmap::IndexMap;

use glam::Vec3;

/// Identifier of a logical scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Get the raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// A registered scene object
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    /// Object name for identification
    pub name: String,
    /// World-space position
    pub position: Vec3,
}

/// Registry of logical scene objects and the relations between them
#[derive(Debug, Default)]
pub struct SceneRegistry {
    objects: IndexMap<ObjectId, SceneObject>,
    targets: IndexMap<ObjectId, ObjectId>,
    next_id: u64,
}

impl SceneRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new object
    pub fn spawn(&mut self, name: impl Into<String>, position: Vec3) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.insert(
            id,
            SceneObject {
                name: name.into(),
                position,
            },
        );
        id
    }

    /// Remove an object together with every relation that mentions it
    pub fn despawn(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.objects.shift_remove(&id)?;
        self.targets
            .retain(|source, target| *source != id && *target != id);
        log::trace!("Despawned {} ({})", id, removed.name);
        Some(removed)
    }

    /// Check if an object is registered
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Get an object
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    /// Get an object's position
    pub fn position(&self, id: ObjectId) -> Option<Vec3> {
        self.objects.get(&id).map(|o| o.position)
    }

    /// Move an object. Returns false if the object is unknown.
    pub fn set_position(&mut self, id: ObjectId, position: Vec3) -> bool {
        match self.objects.get_mut(&id) {
            Some(object) => {
                object.position = position;
                true
            }
            None => false,
        }
    }

    /// Point `source` at `target`, replacing any previous target.
    ///
    /// Returns false if either object is unknown or they are the same object.
    pub fn bind_target(&mut self, source: ObjectId, target: ObjectId) -> bool {
        if source == target || !self.contains(source) || !self.contains(target) {
            return false;
        }
        self.targets.insert(source, target);
        true
    }

    /// Remove the target relation of `source`
    pub fn unbind_target(&mut self, source: ObjectId) -> Option<ObjectId> {
        self.targets.shift_remove(&source)
    }

    /// Get the current target of `source`
    pub fn target(&self, source: ObjectId) -> Option<ObjectId> {
        self.targets.get(&source).copied()
    }

    /// Resolve the position of the current target of `source`
    pub fn target_position(&self, source: ObjectId) -> Option<Vec3> {
        self.target(source).and_then(|target| self.position(target))
    }

    /// Iterate over all objects in registration order
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter().map(|(id, object)| (*id, object))
    }

    /// Number of registered objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
