use crate::ids::{AssetId, ComponentId, ObjectId};
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationError, MutationResult, OneShotMutation};
use crate::scene::definition::{ComponentDefinition, LightComponent};
use crate::scene::runtime::SceneRuntime;
use crate::scene::view::SceneView;
use crate::values::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentPresence {
    Present {
        /// Position in the object's component list; `None` appends
        index: Option<usize>,
        definition: ComponentDefinition,
    },
    Absent,
}

fn apply_component_presence<R: SceneRuntime>(
    view: &mut SceneView<R>,
    object: &ObjectId,
    component: &ComponentId,
    presence: &ComponentPresence,
) -> MutationResult<()> {
    if let Ok(index) = view.model.component_index(object, component) {
        view.model.object_mut(object)?.components.remove(index);
        view.destroy_component_instance(object, component)?;
    }

    if let ComponentPresence::Present { index, definition } = presence {
        let components = &mut view.model.object_mut(object)?.components;
        let index = index.unwrap_or(components.len()).min(components.len());
        components.insert(index, definition.clone());
        view.queue_component(object.clone(), component.clone());
    }
    Ok(())
}

/// Attach a new component to an object
#[derive(Debug, Clone)]
pub struct AddComponentMutation {
    pub object_id: ObjectId,
    pub definition: ComponentDefinition,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for AddComponentMutation {
    type Args = ComponentPresence;

    fn description(&self) -> String {
        format!("Add {} component to {}", self.definition.kind_name(), self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<ComponentPresence> {
        let object = view.model.object(&self.object_id)?;
        if object.components.iter().any(|c| c.id() == self.definition.id()) {
            return Err(MutationError::DuplicateComponent(self.definition.id().clone()));
        }
        Ok(ComponentPresence::Absent)
    }

    fn update(&self, view: &mut SceneView<R>, args: &ComponentPresence) -> MutationResult<()> {
        apply_component_presence(view, &self.object_id, self.definition.id(), args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        view.sync_component_presence(&self.object_id, self.definition.id())
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for AddComponentMutation {
    fn args(&self) -> ComponentPresence {
        ComponentPresence::Present {
            index: None,
            definition: self.definition.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoveComponentMutation {
    pub object_id: ObjectId,
    pub component_id: ComponentId,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for RemoveComponentMutation {
    type Args = ComponentPresence;

    fn description(&self) -> String {
        format!("Remove component {} from {}", self.component_id, self.object_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<ComponentPresence> {
        Ok(ComponentPresence::Present {
            index: Some(view.model.component_index(&self.object_id, &self.component_id)?),
            definition: view.model.component(&self.object_id, &self.component_id)?.clone(),
        })
    }

    fn update(&self, view: &mut SceneView<R>, args: &ComponentPresence) -> MutationResult<()> {
        apply_component_presence(view, &self.object_id, &self.component_id, args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        view.sync_component_presence(&self.object_id, &self.component_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for RemoveComponentMutation {
    fn args(&self) -> ComponentPresence {
        ComponentPresence::Absent
    }
}

/// Asset reference field of a component kind that is built from an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetSlot {
    Mesh,
    Script,
}

impl AssetSlot {
    fn kind_name(self) -> &'static str {
        match self {
            AssetSlot::Mesh => "mesh",
            AssetSlot::Script => "script",
        }
    }

    fn field(self) -> &'static str {
        match self {
            AssetSlot::Mesh => "meshFileId",
            AssetSlot::Script => "scriptFileId",
        }
    }

    fn get(self, definition: &ComponentDefinition) -> Option<&Option<AssetId>> {
        match (self, definition) {
            (AssetSlot::Mesh, ComponentDefinition::Mesh(mesh)) => Some(&mesh.mesh_file_id),
            (AssetSlot::Script, ComponentDefinition::Script(script)) => Some(&script.script_file_id),
            _ => None,
        }
    }

    fn get_mut(self, definition: &mut ComponentDefinition) -> Option<&mut Option<AssetId>> {
        match (self, definition) {
            (AssetSlot::Mesh, ComponentDefinition::Mesh(mesh)) => Some(&mut mesh.mesh_file_id),
            (AssetSlot::Script, ComponentDefinition::Script(script)) => Some(&mut script.script_file_id),
            _ => None,
        }
    }

    fn current<R: SceneRuntime>(
        self,
        view: &SceneView<R>,
        object: &ObjectId,
        component: &ComponentId,
    ) -> MutationResult<Option<AssetId>> {
        let definition = view.model.component(object, component)?;
        self.get(definition)
            .cloned()
            .ok_or_else(|| MutationError::ComponentTypeMismatch {
                component: component.clone(),
                expected: self.kind_name(),
                actual: definition.kind_name(),
            })
    }

    /// Swap the asset and queue the component to be rebuilt from it
    fn set<R: SceneRuntime>(
        self,
        view: &mut SceneView<R>,
        object: &ObjectId,
        component: &ComponentId,
        asset: &Option<AssetId>,
    ) -> MutationResult<()> {
        self.current(view, object, component)?;
        if let Some(slot) = self.get_mut(view.model.component_mut(object, component)?) {
            *slot = asset.clone();
        }
        view.destroy_component_instance(object, component)?;
        view.queue_component(object.clone(), component.clone());
        Ok(())
    }

    fn write<R: SceneRuntime>(
        self,
        view: &mut SceneView<R>,
        object: &ObjectId,
        component: &ComponentId,
    ) -> MutationResult<()> {
        let asset = self.current(view, object, component)?;
        view.write_component_field(object, component, self.field(), asset.as_ref())
    }
}

/// Point a mesh component at another mesh asset (or none) and rebuild it
#[derive(Debug, Clone)]
pub struct SetMeshComponentAssetMutation {
    pub object_id: ObjectId,
    pub component_id: ComponentId,
    pub asset_id: Option<AssetId>,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetMeshComponentAssetMutation {
    type Args = Option<AssetId>;

    fn description(&self) -> String {
        format!("Set mesh of {}", self.component_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Option<AssetId>> {
        AssetSlot::Mesh.current(view, &self.object_id, &self.component_id)
    }

    fn update(&self, view: &mut SceneView<R>, args: &Option<AssetId>) -> MutationResult<()> {
        AssetSlot::Mesh.set(view, &self.object_id, &self.component_id, args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        AssetSlot::Mesh.write(view, &self.object_id, &self.component_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for SetMeshComponentAssetMutation {
    fn args(&self) -> Option<AssetId> {
        self.asset_id.clone()
    }
}

/// Point a script component at another script asset (or none) and rebuild it
#[derive(Debug, Clone)]
pub struct SetScriptComponentAssetMutation {
    pub object_id: ObjectId,
    pub component_id: ComponentId,
    pub asset_id: Option<AssetId>,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetScriptComponentAssetMutation {
    type Args = Option<AssetId>;

    fn description(&self) -> String {
        format!("Set script of {}", self.component_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Option<AssetId>> {
        AssetSlot::Script.current(view, &self.object_id, &self.component_id)
    }

    fn update(&self, view: &mut SceneView<R>, args: &Option<AssetId>) -> MutationResult<()> {
        AssetSlot::Script.set(view, &self.object_id, &self.component_id, args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        AssetSlot::Script.write(view, &self.object_id, &self.component_id)
    }
}

impl<R: SceneRuntime> OneShotMutation<SceneView<R>> for SetScriptComponentAssetMutation {
    fn args(&self) -> Option<AssetId> {
        self.asset_id.clone()
    }
}

fn light<'a, R: SceneRuntime>(
    view: &'a SceneView<R>,
    object: &ObjectId,
    component: &ComponentId,
) -> MutationResult<&'a LightComponent> {
    let definition = view.model.component(object, component)?;
    definition.light().ok_or_else(|| MutationError::ComponentTypeMismatch {
        component: component.clone(),
        expected: "light",
        actual: definition.kind_name(),
    })
}

/// Edit a light in place and push it to the runtime
fn update_light<R: SceneRuntime>(
    view: &mut SceneView<R>,
    object: &ObjectId,
    component: &ComponentId,
    edit: impl FnOnce(&mut LightComponent),
) -> MutationResult<()> {
    let definition = view.model.component_mut(object, component)?;
    if let Some(light) = definition.light_mut() {
        edit(light);
    }
    let definition = definition.clone();
    view.runtime.update_component(object, &definition)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SetLightColorMutation {
    pub object_id: ObjectId,
    pub component_id: ComponentId,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetLightColorMutation {
    type Args = Color;

    fn description(&self) -> String {
        format!("Set light color of {}", self.component_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<Color> {
        Ok(light(view, &self.object_id, &self.component_id)?.color)
    }

    fn update(&self, view: &mut SceneView<R>, args: &Color) -> MutationResult<()> {
        update_light(view, &self.object_id, &self.component_id, |light| light.color = *args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        let color = light(view, &self.object_id, &self.component_id)?.color;
        view.write_component_field(&self.object_id, &self.component_id, "color", Some(&color))
    }
}

impl<R: SceneRuntime> ContinuousMutation<SceneView<R>> for SetLightColorMutation {}

#[derive(Debug, Clone)]
pub struct SetLightIntensityMutation {
    pub object_id: ObjectId,
    pub component_id: ComponentId,
}

impl<R: SceneRuntime> Mutation<SceneView<R>> for SetLightIntensityMutation {
    type Args = f32;

    fn description(&self) -> String {
        format!("Set light intensity of {}", self.component_id)
    }

    fn capture_undo_args(&self, view: &SceneView<R>) -> MutationResult<f32> {
        Ok(light(view, &self.object_id, &self.component_id)?.intensity)
    }

    fn update(&self, view: &mut SceneView<R>, args: &f32) -> MutationResult<()> {
        if !args.is_finite() || *args < 0.0 {
            return Err(MutationError::Precondition(format!("invalid light intensity {args}")));
        }
        update_light(view, &self.object_id, &self.component_id, |light| light.intensity = *args)
    }

    fn write_document(&self, view: &mut SceneView<R>) -> MutationResult<()> {
        let intensity = light(view, &self.object_id, &self.component_id)?.intensity;
        view.write_component_field(&self.object_id, &self.component_id, "intensity", Some(&intensity))
    }
}

impl<R: SceneRuntime> ContinuousMutation<SceneView<R>> for SetLightIntensityMutation {}
