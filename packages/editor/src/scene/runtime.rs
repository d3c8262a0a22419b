//! # Scene runtime
//!
//! The live projection of a scene inside a rendering engine. The editor
//! only drives it through [`SceneRuntime`]; [`HeadlessRuntime`] keeps the
//! same bookkeeping without rendering anything and backs tests and the CLI.

use std::collections::HashMap;
use std::rc::Rc;

use crate::assets::LoadedAsset;
use crate::errors::{RuntimeError, RuntimeResult};
use crate::ids::{AssetId, ComponentId, ObjectId};
use crate::scene::definition::{ComponentDefinition, Transform};
use crate::selection::MeshHandle;

/// What the runtime produced for one component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentInstance {
    /// Meshes the user can click to select the owning object
    pub selectable_meshes: Vec<MeshHandle>,
    /// Assets the instance was built from, for dependency tracking
    pub asset_dependencies: Vec<AssetId>,
}

pub trait SceneRuntime: 'static {
    fn create_object(
        &mut self,
        id: &ObjectId,
        name: &str,
        transform: &Transform,
        parent: Option<&ObjectId>,
        index: usize,
    ) -> RuntimeResult<()>;

    fn destroy_object(&mut self, id: &ObjectId) -> RuntimeResult<()>;

    fn set_name(&mut self, id: &ObjectId, name: &str) -> RuntimeResult<()>;

    fn set_local_transform(&mut self, id: &ObjectId, transform: &Transform) -> RuntimeResult<()>;

    fn local_transform(&self, id: &ObjectId) -> RuntimeResult<Transform>;

    /// Reparent keeping the world placement. Returns the new local transform.
    fn set_parent(&mut self, id: &ObjectId, parent: Option<&ObjectId>, index: usize) -> RuntimeResult<Transform>;

    fn create_component(
        &mut self,
        object: &ObjectId,
        definition: &ComponentDefinition,
        assets: &[Rc<LoadedAsset>],
    ) -> RuntimeResult<ComponentInstance>;

    /// Push changed non-asset properties (light color, intensity)
    fn update_component(&mut self, object: &ObjectId, definition: &ComponentDefinition) -> RuntimeResult<()>;

    fn destroy_component(&mut self, object: &ObjectId, component: &ComponentId) -> RuntimeResult<()>;

    fn has_component(&self, object: &ObjectId, component: &ComponentId) -> bool;

    fn object_count(&self) -> usize;

    fn clear(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessObject {
    pub name: String,
    pub transform: Transform,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub components: HashMap<ComponentId, HeadlessComponent>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessComponent {
    pub definition: ComponentDefinition,
    /// Revisions of the assets the component was built from
    pub asset_revisions: Vec<String>,
    pub meshes: Vec<MeshHandle>,
}

/// Engine-free runtime. World placement only accounts for translation.
#[derive(Debug, Default)]
pub struct HeadlessRuntime {
    objects: HashMap<ObjectId, HeadlessObject>,
    roots: Vec<ObjectId>,
    next_mesh: u64,
    /// Components built over the runtime's lifetime
    pub components_created: usize,
}

impl HeadlessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, id: &ObjectId) -> Option<&HeadlessObject> {
        self.objects.get(id)
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn component(&self, object: &ObjectId, component: &ComponentId) -> Option<&HeadlessComponent> {
        self.objects.get(object)?.components.get(component)
    }

    fn get_mut(&mut self, id: &ObjectId) -> RuntimeResult<&mut HeadlessObject> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| RuntimeError::UnknownObject(id.clone()))
    }

    fn siblings_mut(&mut self, parent: Option<&ObjectId>) -> RuntimeResult<&mut Vec<ObjectId>> {
        match parent {
            Some(parent) => Ok(&mut self.get_mut(parent)?.children),
            None => Ok(&mut self.roots),
        }
    }

    fn world_position(&self, id: &ObjectId) -> crate::values::Vector3 {
        let mut position = crate::values::Vector3::ZERO;
        let mut current = Some(id);
        while let Some(object) = current.and_then(|id| self.objects.get(id)) {
            position = position + object.transform.position;
            current = object.parent.as_ref();
        }
        position
    }
}

impl SceneRuntime for HeadlessRuntime {
    fn create_object(
        &mut self,
        id: &ObjectId,
        name: &str,
        transform: &Transform,
        parent: Option<&ObjectId>,
        index: usize,
    ) -> RuntimeResult<()> {
        if self.objects.contains_key(id) {
            return Err(RuntimeError::DuplicateObject(id.clone()));
        }
        let siblings = self.siblings_mut(parent)?;
        siblings.insert(index.min(siblings.len()), id.clone());

        self.objects.insert(
            id.clone(),
            HeadlessObject {
                name: name.to_string(),
                transform: *transform,
                parent: parent.cloned(),
                children: Vec::new(),
                components: HashMap::new(),
            },
        );
        Ok(())
    }

    fn destroy_object(&mut self, id: &ObjectId) -> RuntimeResult<()> {
        let object = self
            .objects
            .remove(id)
            .ok_or_else(|| RuntimeError::UnknownObject(id.clone()))?;
        if let Ok(siblings) = self.siblings_mut(object.parent.as_ref()) {
            siblings.retain(|sibling| sibling != id);
        }
        for child in object.children {
            self.destroy_object(&child)?;
        }
        Ok(())
    }

    fn set_name(&mut self, id: &ObjectId, name: &str) -> RuntimeResult<()> {
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn set_local_transform(&mut self, id: &ObjectId, transform: &Transform) -> RuntimeResult<()> {
        self.get_mut(id)?.transform = *transform;
        Ok(())
    }

    fn local_transform(&self, id: &ObjectId) -> RuntimeResult<Transform> {
        self.objects
            .get(id)
            .map(|object| object.transform)
            .ok_or_else(|| RuntimeError::UnknownObject(id.clone()))
    }

    fn set_parent(&mut self, id: &ObjectId, parent: Option<&ObjectId>, index: usize) -> RuntimeResult<Transform> {
        if let Some(parent) = parent {
            if !self.objects.contains_key(parent) {
                return Err(RuntimeError::UnknownObject(parent.clone()));
            }
        }
        let world = self.world_position(id);
        let parent_world = parent.map(|parent| self.world_position(parent)).unwrap_or_default();

        let old_parent = self
            .objects
            .get(id)
            .ok_or_else(|| RuntimeError::UnknownObject(id.clone()))?
            .parent
            .clone();
        self.siblings_mut(old_parent.as_ref())?.retain(|sibling| sibling != id);
        let siblings = self.siblings_mut(parent)?;
        siblings.insert(index.min(siblings.len()), id.clone());

        let object = self.get_mut(id)?;
        object.parent = parent.cloned();
        object.transform.position = world - parent_world;
        Ok(object.transform)
    }

    fn create_component(
        &mut self,
        object: &ObjectId,
        definition: &ComponentDefinition,
        assets: &[Rc<LoadedAsset>],
    ) -> RuntimeResult<ComponentInstance> {
        let meshes = match definition {
            ComponentDefinition::Mesh(_) if !assets.is_empty() => {
                self.next_mesh += 1;
                vec![MeshHandle(self.next_mesh)]
            }
            _ => Vec::new(),
        };

        let target = self.get_mut(object)?;
        target.components.insert(
            definition.id().clone(),
            HeadlessComponent {
                definition: definition.clone(),
                asset_revisions: assets.iter().map(|asset| asset.revision.clone()).collect(),
                meshes: meshes.clone(),
            },
        );
        self.components_created += 1;

        Ok(ComponentInstance {
            selectable_meshes: meshes,
            asset_dependencies: assets
                .iter()
                .flat_map(|asset| std::iter::once(asset.asset_id.clone()).chain(asset.dependencies.iter().cloned()))
                .collect(),
        })
    }

    fn update_component(&mut self, object: &ObjectId, definition: &ComponentDefinition) -> RuntimeResult<()> {
        let component = self
            .get_mut(object)?
            .components
            .get_mut(definition.id())
            .ok_or_else(|| RuntimeError::UnknownComponent(definition.id().clone()))?;
        component.definition = definition.clone();
        Ok(())
    }

    fn destroy_component(&mut self, object: &ObjectId, component: &ComponentId) -> RuntimeResult<()> {
        self.get_mut(object)?
            .components
            .remove(component)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::UnknownComponent(component.clone()))
    }

    fn has_component(&self, object: &ObjectId, component: &ComponentId) -> bool {
        self.component(object, component).is_some()
    }

    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn clear(&mut self) {
        self.objects.clear();
        self.roots.clear();
    }
}
