//! # Scene model
//!
//! In-memory arena of game objects keyed by stable id. Hierarchy is held as
//! id lists (`parent`, `children`, `roots`), so reparenting rewrites two
//! lists and never touches the objects themselves.

use std::collections::{HashMap, HashSet};

use crate::ids::{ComponentId, ObjectId};
use crate::mutation_trait::{MutationError, MutationResult};
use crate::scene::definition::{ComponentDefinition, GameObjectDefinition, SceneConfig, SceneDefinition, Transform};

#[derive(Debug, Clone, PartialEq)]
pub struct GameObjectData {
    pub id: ObjectId,
    pub name: String,
    pub transform: Transform,
    pub components: Vec<ComponentDefinition>,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    pub config: SceneConfig,
    objects: HashMap<ObjectId, GameObjectData>,
    roots: Vec<ObjectId>,
}

impl SceneModel {
    pub fn from_definition(definition: &SceneDefinition) -> MutationResult<Self> {
        let mut model = Self {
            config: definition.config.clone(),
            ..Self::default()
        };
        for (index, object) in definition.objects.iter().enumerate() {
            model.insert_subtree(object, None, Some(index))?;
        }
        Ok(model)
    }

    pub fn object(&self, id: &ObjectId) -> MutationResult<&GameObjectData> {
        self.objects
            .get(id)
            .ok_or_else(|| MutationError::ObjectNotFound(id.clone()))
    }

    pub fn object_mut(&mut self, id: &ObjectId) -> MutationResult<&mut GameObjectData> {
        self.objects
            .get_mut(id)
            .ok_or_else(|| MutationError::ObjectNotFound(id.clone()))
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    /// Children of `parent`, or the roots for `None`
    pub fn children_of(&self, parent: Option<&ObjectId>) -> MutationResult<&[ObjectId]> {
        match parent {
            Some(parent) => Ok(&self.object(parent)?.children),
            None => Ok(&self.roots),
        }
    }

    /// Position of `id` among its siblings
    pub fn index_in_parent(&self, id: &ObjectId) -> MutationResult<usize> {
        let parent = self.object(id)?.parent.clone();
        self.children_of(parent.as_ref())?
            .iter()
            .position(|sibling| sibling == id)
            .ok_or_else(|| MutationError::ObjectNotFound(id.clone()))
    }

    /// True if `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor(&self, ancestor: &ObjectId, id: &ObjectId) -> bool {
        let mut current = Some(id.clone());
        while let Some(object) = current {
            if &object == ancestor {
                return true;
            }
            current = self.objects.get(&object).and_then(|data| data.parent.clone());
        }
        false
    }

    /// Insert a definition and all of its descendants. Returns the new ids
    /// in pre-order (parents before children).
    pub fn insert_subtree(
        &mut self,
        definition: &GameObjectDefinition,
        parent: Option<&ObjectId>,
        index: Option<usize>,
    ) -> MutationResult<Vec<ObjectId>> {
        self.check_insertable(definition)?;

        let siblings = self.children_list_mut(parent)?;
        let index = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, definition.id.clone());

        let mut inserted = Vec::new();
        self.insert_unlinked(definition, parent.cloned(), &mut inserted);
        Ok(inserted)
    }

    /// Every id in `definition` must be new to the scene and appear only
    /// once within the definition itself
    fn check_insertable(&self, definition: &GameObjectDefinition) -> MutationResult<()> {
        let mut seen = HashSet::new();
        self.check_unique(definition, &mut seen)
    }

    fn check_unique<'d>(
        &self,
        definition: &'d GameObjectDefinition,
        seen: &mut HashSet<&'d ObjectId>,
    ) -> MutationResult<()> {
        if self.contains(&definition.id) || !seen.insert(&definition.id) {
            return Err(MutationError::DuplicateObject(definition.id.clone()));
        }
        definition
            .children
            .iter()
            .try_for_each(|child| self.check_unique(child, seen))
    }

    fn insert_unlinked(
        &mut self,
        definition: &GameObjectDefinition,
        parent: Option<ObjectId>,
        inserted: &mut Vec<ObjectId>,
    ) {
        self.objects.insert(
            definition.id.clone(),
            GameObjectData {
                id: definition.id.clone(),
                name: definition.name.clone(),
                transform: definition.transform,
                components: definition.components.clone(),
                parent,
                children: definition.children.iter().map(|child| child.id.clone()).collect(),
            },
        );
        inserted.push(definition.id.clone());

        for child in &definition.children {
            self.insert_unlinked(child, Some(definition.id.clone()), inserted);
        }
    }

    /// Remove an object and its descendants, returning them as a definition
    pub fn remove_subtree(&mut self, id: &ObjectId) -> MutationResult<GameObjectDefinition> {
        let definition = self.object_definition(id)?;
        let parent = self.object(id)?.parent.clone();
        self.children_list_mut(parent.as_ref())?.retain(|sibling| sibling != id);

        for removed in self.subtree_ids(id)? {
            self.objects.remove(&removed);
        }
        Ok(definition)
    }

    /// Reparent `id` under `parent` at `index` (clamped). Fails if the new
    /// parent is inside the moved subtree.
    pub fn move_object(&mut self, id: &ObjectId, parent: Option<&ObjectId>, index: usize) -> MutationResult<()> {
        if let Some(parent) = parent {
            self.object(parent)?;
            if self.is_ancestor(id, parent) {
                return Err(MutationError::CycleDetected {
                    object: id.clone(),
                    parent: parent.clone(),
                });
            }
        }

        let old_parent = self.object(id)?.parent.clone();
        self.children_list_mut(old_parent.as_ref())?.retain(|sibling| sibling != id);

        let siblings = self.children_list_mut(parent)?;
        let index = index.min(siblings.len());
        siblings.insert(index, id.clone());
        self.object_mut(id)?.parent = parent.cloned();
        Ok(())
    }

    /// Rebuild the serialized definition of an object and its descendants
    pub fn object_definition(&self, id: &ObjectId) -> MutationResult<GameObjectDefinition> {
        let object = self.object(id)?;
        Ok(GameObjectDefinition {
            id: object.id.clone(),
            name: object.name.clone(),
            transform: object.transform,
            components: object.components.clone(),
            children: object
                .children
                .iter()
                .map(|child| self.object_definition(child))
                .collect::<MutationResult<_>>()?,
        })
    }

    /// `id` and its descendants in pre-order
    pub fn subtree_ids(&self, id: &ObjectId) -> MutationResult<Vec<ObjectId>> {
        let mut ids = vec![id.clone()];
        for child in &self.object(id)?.children {
            ids.extend(self.subtree_ids(child)?);
        }
        Ok(ids)
    }

    pub fn to_definition(&self) -> MutationResult<SceneDefinition> {
        Ok(SceneDefinition {
            config: self.config.clone(),
            objects: self
                .roots
                .iter()
                .map(|root| self.object_definition(root))
                .collect::<MutationResult<_>>()?,
        })
    }

    pub fn component(&self, object: &ObjectId, component: &ComponentId) -> MutationResult<&ComponentDefinition> {
        self.object(object)?
            .components
            .iter()
            .find(|candidate| candidate.id() == component)
            .ok_or_else(|| component_not_found(object, component))
    }

    pub fn component_mut(
        &mut self,
        object: &ObjectId,
        component: &ComponentId,
    ) -> MutationResult<&mut ComponentDefinition> {
        self.object_mut(object)?
            .components
            .iter_mut()
            .find(|candidate| candidate.id() == component)
            .ok_or_else(|| component_not_found(object, component))
    }

    pub fn component_index(&self, object: &ObjectId, component: &ComponentId) -> MutationResult<usize> {
        self.object(object)?
            .components
            .iter()
            .position(|candidate| candidate.id() == component)
            .ok_or_else(|| component_not_found(object, component))
    }

    fn children_list_mut(&mut self, parent: Option<&ObjectId>) -> MutationResult<&mut Vec<ObjectId>> {
        match parent {
            Some(parent) => Ok(&mut self.object_mut(parent)?.children),
            None => Ok(&mut self.roots),
        }
    }
}

fn component_not_found(object: &ObjectId, component: &ComponentId) -> MutationError {
    MutationError::ComponentNotFound {
        object: object.clone(),
        component: component.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> SceneModel {
        let definition: SceneDefinition = serde_json::from_value(json!({
            "objects": [
                { "id": "root", "name": "Root", "children": [
                    { "id": "a", "name": "A" },
                    { "id": "b", "name": "B", "children": [{ "id": "b1", "name": "B1" }] }
                ]},
                { "id": "other", "name": "Other" }
            ]
        }))
        .unwrap();
        SceneModel::from_definition(&definition).unwrap()
    }

    fn ids(values: &[&str]) -> Vec<ObjectId> {
        values.iter().map(|v| ObjectId::new(*v)).collect()
    }

    #[test]
    fn test_arena_from_definition() {
        let model = model();
        assert_eq!(model.len(), 5);
        assert_eq!(model.roots(), ids(&["root", "other"]).as_slice());
        assert_eq!(model.object(&"b1".into()).unwrap().parent, Some("b".into()));
        assert_eq!(model.index_in_parent(&"b".into()).unwrap(), 1);
        assert_eq!(model.subtree_ids(&"root".into()).unwrap(), ids(&["root", "a", "b", "b1"]));
    }

    #[test]
    fn test_move_rewrites_both_lists() {
        let mut model = model();
        model.move_object(&"b1".into(), Some(&"root".into()), 0).unwrap();

        assert_eq!(model.children_of(Some(&"root".into())).unwrap(), ids(&["b1", "a", "b"]).as_slice());
        assert!(model.children_of(Some(&"b".into())).unwrap().is_empty());
        assert_eq!(model.object(&"b1".into()).unwrap().parent, Some("root".into()));
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut model = model();
        let err = model.move_object(&"root".into(), Some(&"b1".into()), 0).unwrap_err();
        assert!(matches!(err, MutationError::CycleDetected { .. }));
        assert_eq!(model.roots(), ids(&["root", "other"]).as_slice());
    }

    #[test]
    fn test_remove_and_reinsert_subtree() {
        let mut model = model();
        let before = model.to_definition().unwrap();

        let removed = model.remove_subtree(&"b".into()).unwrap();
        assert_eq!(model.len(), 3);
        assert!(!model.contains(&"b1".into()));

        let inserted = model.insert_subtree(&removed, Some(&"root".into()), Some(1)).unwrap();
        assert_eq!(inserted, ids(&["b", "b1"]));
        assert_eq!(model.to_definition().unwrap(), before);
    }

    #[test]
    fn test_duplicate_insert_is_rejected() {
        let mut model = model();
        let duplicate = GameObjectDefinition::new("a".into(), "Again");
        assert!(matches!(
            model.insert_subtree(&duplicate, None, None),
            Err(MutationError::DuplicateObject(_))
        ));
        assert_eq!(model.roots().len(), 2);
    }

    #[test]
    fn test_repeated_id_inside_definition_is_rejected() {
        let mut model = model();
        let mut crate_stack = GameObjectDefinition::new("crate".into(), "Crate");
        crate_stack.children = vec![
            GameObjectDefinition::new("lid".into(), "Lid"),
            GameObjectDefinition::new("lid".into(), "Lid copy"),
        ];

        let err = model.insert_subtree(&crate_stack, None, None).unwrap_err();
        assert!(matches!(err, MutationError::DuplicateObject(id) if id == ObjectId::new("lid")));
        assert_eq!(model.len(), 5);
        assert!(!model.contains(&"crate".into()));
        assert_eq!(model.roots(), ids(&["root", "other"]).as_slice());
    }
}
