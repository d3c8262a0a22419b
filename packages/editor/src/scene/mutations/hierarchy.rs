use crate::ids::ObjectId;
use crate::mutation_trait::{Mutation, MutationError, MutationResult, OneShotMutation};
use crate::scene::definition::GameObjectDefinition;
use crate::scene::runtime::SceneRuntime;
use crate::scene::view::SceneView;

/// Whether an object (with its whole subtree) exists, and where
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPresence {
    Present {
        parent: Option<ObjectId>,
        /// Sibling index; `None` appends
        index: Option<usize>,
        definition: GameObjectDefinition,
    },
    Absent,
}

/// Bring model and runtime to `presence` for the object `id`
fn apply_presence<R: SceneRuntime>(view: &mut SceneView<R>, id: &ObjectId, presence: &ObjectPresence) -> MutationResult<()> {
    if let ObjectPresence::Present { parent: Some(parent), .. } = presence {
        if !view.model.contains(parent) {
            return Err(MutationError::ObjectNotFound(parent.clone()));
        }
    }

    if view.model.contains(id) {
        let removed = view.model.remove_subtree(id)?;
        view.destroy_object_instances(&removed)?;
    }

    if let ObjectPresence::Present {
        parent,
        index,
        definition,
    } = presence
    {
        view.model.insert_subtree(definition, parent.as_ref(), *index)?;
        view.create_object_instances(&definition.id)?;
    }
    Ok(())
}

fn current_presence<R: SceneRuntime>(view: &SceneView<R>, id: &ObjectId) -> MutationResult<ObjectPresence> {
    Ok(ObjectPresence::Present {
        parent: view.model.object(id)?.parent.clone(),
        index: Some(view.model.index_in_parent(id)?),
        definition: view.model.object_definition(id)?,
    })
}

/// Add an empty object as the last child of `parent` (or as the last root)
#[derive(Debug, Clone)]
pub struct CreateBlankObjectMutation {
    pub parent: Option<ObjectId>,
    pub object_id: ObjectId,
    pub name: String,
}

impl CreateBlankObjectMutation {
    pub fn new(parent: Option<ObjectId>) -> Self {
        Self {
            parent,
            object_id: ObjectId::generate(),
            name: "New object".to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for CreateBlankObjectMutation {
    type Args = ObjectPresence;

    fn description(&self) -> String {
        format!("Create {}", self.name)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<ObjectPresence> {
        if let Some(parent) = &self.parent {
            view.model.object(parent)?;
        }
        if view.model.contains(&self.object_id) {
            return Err(MutationError::DuplicateObject(self.object_id.clone()));
        }
        Ok(ObjectPresence::Absent)
    }

    fn update(&self, view: &mut SceneView<R>, args: &ObjectPresence) -> MutationResult<()> {
        apply_presence(view, &self.object_id, args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        view.sync_object_placement(&self.object_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for CreateBlankObjectMutation {
    fn args(&self) -> ObjectPresence {
        ObjectPresence::Present {
            parent: self.parent.clone(),
            index: None,
            definition: GameObjectDefinition::new(self.object_id.clone(), self.name.clone()),
        }
    }
}

/// Remove an object and everything below it
#[derive(Debug, Clone)]
pub struct DeleteObjectMutation {
    pub object_id: ObjectId,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for DeleteObjectMutation {
    type Args = ObjectPresence;

    fn description(&self) -> String {
        format!("Delete {}", self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<ObjectPresence> {
        current_presence(view, &self.object_id)
    }

    fn update(&self, view: &mut SceneView<R>, args: &ObjectPresence) -> MutationResult<()> {
        apply_presence(view, &self.object_id, args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        view.sync_object_placement(&self.object_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for DeleteObjectMutation {
    fn args(&self) -> ObjectPresence {
        ObjectPresence::Absent
    }
}

/// Where among the new siblings a moved object lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiblingPosition {
    Last,
    Before(ObjectId),
    After(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub parent: Option<ObjectId>,
    pub position: SiblingPosition,
}

/// Reparent an object, keeping its world placement
#[derive(Debug, Clone)]
pub struct SetObjectParentMutation {
    pub object_id: ObjectId,
    pub parent: Option<ObjectId>,
    pub position: SiblingPosition,
}

impl SetObjectParentMutation {
    fn requested(&self) -> Placement {
        Placement {
            parent: self.parent.clone(),
            position: self.position.clone(),
        }
    }

    /// Sibling index `placement` resolves to once `self.object_id` is taken
    /// out of the target list
    fn target_index<R: SceneRuntime>(&self, view: &SceneView<R>, placement: &Placement) -> MutationResult<usize> {
        let siblings: Vec<&ObjectId> = view
            .model
            .children_of(placement.parent.as_ref())?
            .iter()
            .filter(|sibling| **sibling != self.object_id)
            .collect();

        let index_of = |anchor: &ObjectId| {
            siblings
                .iter()
                .position(|sibling| *sibling == anchor)
                .ok_or_else(|| MutationError::InvalidSibling(anchor.clone()))
        };

        match &placement.position {
            SiblingPosition::Last => Ok(siblings.len()),
            SiblingPosition::Before(anchor) => index_of(anchor),
            SiblingPosition::After(anchor) => index_of(anchor).map(|index| index + 1),
        }
    }
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetObjectParentMutation {
    type Args = Placement;

    fn description(&self) -> String {
        match &self.parent {
            Some(parent) => format!("Move {} under {}", self.object_id, parent),
            None => format!("Move {} to scene root", self.object_id),
        }
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Placement> {
        let object = view.model.object(&self.object_id)?;
        if let Some(parent) = &self.parent {
            view.model.object(parent)?;
            if view.model.is_ancestor(&self.object_id, parent) {
                return Err(MutationError::CycleDetected {
                    object: self.object_id.clone(),
                    parent: parent.clone(),
                });
            }
        }
        self.target_index(view, &self.requested())?;

        let siblings = view.model.children_of(object.parent.as_ref())?;
        let index = view.model.index_in_parent(&self.object_id)?;
        let position = match siblings.get(index + 1) {
            Some(next) => SiblingPosition::Before(next.clone()),
            None => SiblingPosition::Last,
        };
        Ok(Placement {
            parent: object.parent.clone(),
            position,
        })
    }

    fn update(&self, view: &mut SceneView<R>, args: &Placement) -> MutationResult<()> {
        let index = self.target_index(view, args)?;
        view.model.move_object(&self.object_id, args.parent.as_ref(), index)?;
        let local = view.runtime.set_parent(&self.object_id, args.parent.as_ref(), index)?;
        view.model.object_mut(&self.object_id)?.transform = local;
        Ok(())
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        view.sync_object_placement(&self.object_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for SetObjectParentMutation {
    fn args(&self) -> Placement {
        self.requested()
    }
}
