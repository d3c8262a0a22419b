use crate::ids::ObjectId;
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationResult, OneShotMutation};
use crate::scene::definition::Transform;
use crate::scene::runtime::SceneRuntime;
use crate::scene::view::SceneView;
use crate::values::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    Position,
    Rotation,
    Scale,
}

impl TransformField {
    pub fn key(&self) -> &'static str {
        match self {
            TransformField::Position => "position",
            TransformField::Rotation => "rotation",
            TransformField::Scale => "scale",
        }
    }

    fn get(&self, transform: &Transform) -> Vector3 {
        match self {
            TransformField::Position => transform.position,
            TransformField::Rotation => transform.rotation,
            TransformField::Scale => transform.scale,
        }
    }

    fn set(&self, transform: &mut Transform, value: Vector3) {
        match self {
            TransformField::Position => transform.position = value,
            TransformField::Rotation => transform.rotation = value,
            TransformField::Scale => transform.scale = value,
        }
    }
}

/// Drag one transform vector of an object (gizmo handles, inspector fields)
#[derive(Debug, Clone)]
pub struct SetTransformFieldMutation {
    pub object_id: ObjectId,
    pub field: TransformField,
}

impl SetTransformFieldMutation {
    pub fn position(object_id: ObjectId) -> Self {
        Self {
            object_id,
            field: TransformField::Position,
        }
    }

    pub fn rotation(object_id: ObjectId) -> Self {
        Self {
            object_id,
            field: TransformField::Rotation,
        }
    }

    pub fn scale(object_id: ObjectId) -> Self {
        Self {
            object_id,
            field: TransformField::Scale,
        }
    }
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetTransformFieldMutation {
    type Args = Vector3;

    fn description(&self) -> String {
        format!("Set {} of {}", self.field.key(), self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Vector3> {
        Ok(self.field.get(&view.model.object(&self.object_id)?.transform))
    }

    fn update(&self, view: &mut SceneView<R>, args: &Vector3) -> MutationResult<()> {
        let object = view.model.object_mut(&self.object_id)?;
        self.field.set(&mut object.transform, *args);
        let transform = object.transform;
        view.runtime.set_local_transform(&self.object_id, &transform)?;
        Ok(())
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        let value = self.field.get(&view.model.object(&self.object_id)?.transform);
        view.write_transform_field(&self.object_id, self.field.key(), &value)
    }
}

impl<R: SceneRuntime> ContinuousMutation<SceneView<R>> for SetTransformFieldMutation {}

/// Replace the whole local transform at once (paste, reset)
#[derive(Debug, Clone)]
pub struct SetObjectTransformMutation {
    pub object_id: ObjectId,
    pub transform: Transform,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetObjectTransformMutation {
    type Args = Transform;

    fn description(&self) -> String {
        format!("Set transform of {}", self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Transform> {
        Ok(view.model.object(&self.object_id)?.transform)
    }

    fn update(&self, view: &mut SceneView<R>, args: &Transform) -> MutationResult<()> {
        view.model.object_mut(&self.object_id)?.transform = *args;
        view.runtime.set_local_transform(&self.object_id, args)?;
        Ok(())
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        let transform = view.model.object(&self.object_id)?.transform;
        for field in [TransformField::Position, TransformField::Rotation, TransformField::Scale] {
            view.write_transform_field(&self.object_id, field.key(), &field.get(&transform))?;
        }
        Ok(())
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for SetObjectTransformMutation {
    fn args(&self) -> Transform {
        self.transform
    }
}
