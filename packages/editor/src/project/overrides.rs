//! Material overrides of mesh assets.
//!
//! A mesh can override any material it uses, by name: swap in another
//! material asset as the base, and override single properties on top. The
//! overrides are stored in the mesh's entry in the project file; only the
//! enabled, non-empty ones are written.

use std::fmt::Debug;

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assets::{AssetChangeKind, AssetType};
use crate::document::reconcile;
use crate::ids::AssetId;
use crate::material::property::{ContinuousProperty, MaterialProperty};
use crate::material::{MaterialDefinition, MaterialState};
use crate::mutation_trait::{ContinuousMutation, Mutation, MutationError, MutationResult, OneShotMutation};
use crate::project::{AssetDefinition, ProjectDomain};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialOverrideDefinition {
    /// Material asset used in place of the mesh's own material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_asset_id: Option<AssetId>,
    #[serde(flatten)]
    pub material: MaterialDefinition,
}

impl MaterialOverrideDefinition {
    pub fn is_empty(&self) -> bool {
        self.material_asset_id.is_none() && self.material.is_empty()
    }
}

/// Editable state of one material override, disabled values included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialOverrideState {
    pub base_material: Option<AssetId>,
    pub base_material_enabled: bool,
    pub material: MaterialState,
}

impl MaterialOverrideState {
    pub fn from_definition(definition: MaterialOverrideDefinition) -> Self {
        Self {
            base_material_enabled: definition.material_asset_id.is_some(),
            base_material: definition.material_asset_id,
            material: MaterialState::from_definition(definition.material),
        }
    }

    pub fn effective(&self) -> MaterialOverrideDefinition {
        MaterialOverrideDefinition {
            material_asset_id: self.base_material.clone().filter(|_| self.base_material_enabled),
            material: self.material.effective(),
        }
    }
}

/// A property of a material override
pub trait OverrideProperty: Debug + Clone + 'static {
    type Value: Clone + Debug + 'static;

    fn label(&self) -> String;

    /// Check `value` against the rest of the project before it is written
    fn validate(&self, _project: &ProjectDomain, _value: &Self::Value) -> MutationResult<()> {
        Ok(())
    }

    fn read(&self, state: &MaterialOverrideState) -> MutationResult<Self::Value>;

    fn write(&self, state: &mut MaterialOverrideState, value: &Self::Value) -> MutationResult<()>;
}

/// A material property, overridden
#[derive(Debug, Clone, Copy)]
pub struct Overridden<Prop>(pub Prop);

impl<Prop: MaterialProperty> OverrideProperty for Overridden<Prop> {
    type Value = Prop::Value;

    fn label(&self) -> String {
        self.0.label()
    }

    fn read(&self, state: &MaterialOverrideState) -> MutationResult<Prop::Value> {
        self.0.read(&state.material)
    }

    fn write(&self, state: &mut MaterialOverrideState, value: &Prop::Value) -> MutationResult<()> {
        self.0.write(&mut state.material, value)
    }
}

/// Material asset replacing the mesh's own material
#[derive(Debug, Clone, Copy)]
pub struct BaseMaterial;

impl OverrideProperty for BaseMaterial {
    type Value = Option<AssetId>;

    fn label(&self) -> String {
        "base material".to_string()
    }

    fn validate(&self, project: &ProjectDomain, value: &Option<AssetId>) -> MutationResult<()> {
        let Some(material) = value else {
            return Ok(());
        };
        match project.asset(material) {
            Some(asset) if asset.asset_type == AssetType::Material => Ok(()),
            Some(_) => Err(MutationError::Precondition(format!("asset {material} is not a material"))),
            None => Err(MutationError::AssetNotFound(material.clone())),
        }
    }

    fn read(&self, state: &MaterialOverrideState) -> MutationResult<Option<AssetId>> {
        Ok(state.base_material.clone())
    }

    fn write(&self, state: &mut MaterialOverrideState, value: &Option<AssetId>) -> MutationResult<()> {
        state.base_material = value.clone();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BaseMaterialEnabled;

impl OverrideProperty for BaseMaterialEnabled {
    type Value = bool;

    fn label(&self) -> String {
        "base material enabled".to_string()
    }

    fn read(&self, state: &MaterialOverrideState) -> MutationResult<bool> {
        Ok(state.base_material_enabled)
    }

    fn write(&self, state: &mut MaterialOverrideState, value: &bool) -> MutationResult<()> {
        state.base_material_enabled = *value;
        Ok(())
    }
}

impl ProjectDomain {
    /// Override state for `material` of `mesh`, as edited so far
    pub fn override_state(&self, mesh: &AssetId, material: &str) -> MutationResult<MaterialOverrideState> {
        let asset = self.mesh_asset(mesh)?;
        if let Some(state) = self.overrides.get(&(mesh.clone(), material.to_string())) {
            return Ok(state.clone());
        }
        let definition = asset.material_overrides.get(material).cloned().unwrap_or_default();
        Ok(MaterialOverrideState::from_definition(definition))
    }

    fn mesh_asset(&self, mesh: &AssetId) -> MutationResult<&AssetDefinition> {
        let asset = self
            .asset(mesh)
            .ok_or_else(|| MutationError::AssetNotFound(mesh.clone()))?;
        if asset.asset_type != AssetType::Mesh {
            return Err(MutationError::Precondition(format!("asset {mesh} is not a mesh")));
        }
        Ok(asset)
    }

    fn edit_override<Prop: OverrideProperty>(
        &mut self,
        mesh: &AssetId,
        material: &str,
        property: &Prop,
        value: &Prop::Value,
    ) -> MutationResult<()> {
        property.validate(self, value)?;
        let mut state = self.override_state(mesh, material)?;
        property.write(&mut state, value)?;

        let effective = state.effective();
        self.overrides.insert((mesh.clone(), material.to_string()), state);
        let overrides = &mut self.asset_mut(mesh)?.material_overrides;
        if effective.is_empty() {
            overrides.remove(material);
        } else {
            overrides.insert(material.to_string(), effective);
        }
        Ok(())
    }

    /// Patch the mesh's `materialOverrides` block, dropping it once empty
    fn write_material_overrides(&mut self, mesh: &AssetId) -> MutationResult<()> {
        let path = self
            .asset_path(mesh)
            .ok_or_else(|| MutationError::AssetNotFound(mesh.clone()))?
            .key("materialOverrides");
        let overrides = self.mesh_asset(mesh)?.material_overrides.clone();
        let target = (!overrides.is_empty()).then_some(&overrides);
        reconcile(&mut self.document, &path, target)?;
        Ok(())
    }

    /// Drop the mesh from the cache so it is rebuilt with its overrides
    fn invalidate_mesh(&mut self, mesh: &AssetId) {
        debug!("[Project] material overrides of {} changed", mesh);
        let change = self.invalidated(mesh, AssetChangeKind::Modified);
        self.changes.push(change);
    }
}

fn after_override_persist<'a>(project: &'a mut ProjectDomain, mesh: &AssetId) -> LocalBoxFuture<'a, MutationResult<()>> {
    project.invalidate_mesh(mesh);
    future::ready(Ok(())).boxed_local()
}

/// Set one override property of a mesh material
#[derive(Debug, Clone)]
pub struct SetMaterialOverrideMutation<Prop: OverrideProperty> {
    pub mesh: AssetId,
    pub material: String,
    pub property: Prop,
    pub value: Prop::Value,
}

impl<Prop: OverrideProperty> SetMaterialOverrideMutation<Prop> {
    pub fn new(mesh: AssetId, material: impl Into<String>, property: Prop, value: Prop::Value) -> Self {
        Self {
            mesh,
            material: material.into(),
            property,
            value,
        }
    }
}

impl<Prop: MaterialProperty> SetMaterialOverrideMutation<Overridden<Prop>> {
    /// Override a material property
    pub fn material_property(mesh: AssetId, material: impl Into<String>, property: Prop, value: Prop::Value) -> Self {
        Self::new(mesh, material, Overridden(property), value)
    }
}

impl<Prop: OverrideProperty> Mutation<ProjectDomain> for SetMaterialOverrideMutation<Prop> {
    type Args = Prop::Value;

    fn description(&self) -> String {
        format!("Set {} override of material {}", self.property.label(), self.material)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<Prop::Value> {
        self.property.read(&project.override_state(&self.mesh, &self.material)?)
    }

    fn update(&self, project: &mut ProjectDomain, args: &Prop::Value) -> MutationResult<()> {
        project.edit_override(&self.mesh, &self.material, &self.property, args)
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        project.write_material_overrides(&self.mesh)
    }

    fn after_persist<'a>(&'a self, project: &'a mut ProjectDomain) -> LocalBoxFuture<'a, MutationResult<()>> {
        after_override_persist(project, &self.mesh)
    }
}

impl<Prop: OverrideProperty> OneShotMutation<ProjectDomain> for SetMaterialOverrideMutation<Prop> {
    fn args(&self) -> Prop::Value {
        self.value.clone()
    }
}

/// Drag an overridden material property (color, reflection strength)
#[derive(Debug, Clone)]
pub struct DragMaterialOverrideMutation<Prop: ContinuousProperty> {
    pub mesh: AssetId,
    pub material: String,
    pub property: Overridden<Prop>,
}

impl<Prop: ContinuousProperty> DragMaterialOverrideMutation<Prop> {
    pub fn new(mesh: AssetId, material: impl Into<String>, property: Prop) -> Self {
        Self {
            mesh,
            material: material.into(),
            property: Overridden(property),
        }
    }
}

impl<Prop: ContinuousProperty> Mutation<ProjectDomain> for DragMaterialOverrideMutation<Prop> {
    type Args = Prop::Value;

    fn description(&self) -> String {
        format!("Set {} override of material {}", self.property.label(), self.material)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<Prop::Value> {
        self.property.read(&project.override_state(&self.mesh, &self.material)?)
    }

    fn update(&self, project: &mut ProjectDomain, args: &Prop::Value) -> MutationResult<()> {
        project.edit_override(&self.mesh, &self.material, &self.property, args)
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        project.write_material_overrides(&self.mesh)
    }

    fn after_persist<'a>(&'a self, project: &'a mut ProjectDomain) -> LocalBoxFuture<'a, MutationResult<()>> {
        after_override_persist(project, &self.mesh)
    }
}

impl<Prop: ContinuousProperty> ContinuousMutation<ProjectDomain> for DragMaterialOverrideMutation<Prop> {}
