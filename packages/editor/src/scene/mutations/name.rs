use composer_jsonc::JsonPath;

use crate::ids::ObjectId;
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationResult};
use crate::scene::runtime::SceneRuntime;
use crate::scene::view::SceneView;

/// Rename an object; continuous so typing in the inspector is one history step
#[derive(Debug, Clone)]
pub struct SetObjectNameMutation {
    pub object_id: ObjectId,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetObjectNameMutation {
    type Args = String;

    fn description(&self) -> String {
        format!("Rename {}", self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<String> {
        Ok(view.model.object(&self.object_id)?.name.clone())
    }

    fn update(&self, view: &mut SceneView<R>, args: &String) -> MutationResult<()> {
        view.model.object_mut(&self.object_id)?.name = args.clone();
        view.runtime.set_name(&self.object_id, args)?;
        Ok(())
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        let name = view.model.object(&self.object_id)?.name.clone();
        view.write_object_field(&self.object_id, &JsonPath::root().key("name"), &name)
    }
}

impl<R: SceneRuntime> ContinuousMutation<SceneView<R>> for SetObjectNameMutation {}
