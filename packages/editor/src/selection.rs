//! Pickable runtime meshes and the objects that own them

use std::collections::HashMap;

use crate::ids::{ComponentId, ObjectId};

/// Opaque handle of a mesh instance in the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

#[derive(Debug, Default)]
pub struct SelectionCache {
    meshes: HashMap<MeshHandle, (ObjectId, ComponentId)>,
}

impl SelectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: MeshHandle, object: ObjectId, component: ComponentId) {
        self.meshes.insert(mesh, (object, component));
    }

    /// Forget every mesh a component contributed
    pub fn remove_component(&mut self, component: &ComponentId) -> usize {
        let before = self.meshes.len();
        self.meshes.retain(|_, (_, owner)| owner != component);
        before - self.meshes.len()
    }

    /// Object that owns the picked mesh
    pub fn get(&self, mesh: MeshHandle) -> Option<&ObjectId> {
        self.meshes.get(&mesh).map(|(object, _)| object)
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
