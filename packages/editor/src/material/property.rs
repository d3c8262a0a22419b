//! Editable properties of a material.
//!
//! Each property reads and writes one slice of a [`MaterialState`]. The same
//! properties drive both the material editor and the per-model material
//! overrides kept in the project file.

use std::fmt::Debug;

use crate::ids::AssetId;
use crate::material::definition::{
    MaterialState, MaterialToggle, ReflectionDefinition, ReflectionLayout, ReflectionTextureSlot,
};
use crate::mutation_trait::{MutationError, MutationResult};
use crate::values::Color;

pub trait MaterialProperty: Debug + Clone + 'static {
    /// Complete target state of the property
    type Value: Clone + Debug + 'static;

    /// Lower-case name for descriptions, e.g. "diffuse color"
    fn label(&self) -> String;

    fn read(&self, state: &MaterialState) -> MutationResult<Self::Value>;

    fn write(&self, state: &mut MaterialState, value: &Self::Value) -> MutationResult<()>;
}

/// Properties that can be dragged through a continuous gesture
pub trait ContinuousProperty: MaterialProperty {}

#[derive(Debug, Clone, Copy)]
pub struct DiffuseColor;

impl MaterialProperty for DiffuseColor {
    type Value = Option<Color>;

    fn label(&self) -> String {
        "diffuse color".to_string()
    }

    fn read(&self, state: &MaterialState) -> MutationResult<Option<Color>> {
        Ok(state.values.diffuse_color)
    }

    fn write(&self, state: &mut MaterialState, value: &Option<Color>) -> MutationResult<()> {
        state.values.diffuse_color = *value;
        Ok(())
    }
}

impl ContinuousProperty for DiffuseColor {}

#[derive(Debug, Clone, Copy)]
pub struct EmissionColor;

impl MaterialProperty for EmissionColor {
    type Value = Option<Color>;

    fn label(&self) -> String {
        "emission color".to_string()
    }

    fn read(&self, state: &MaterialState) -> MutationResult<Option<Color>> {
        Ok(state.values.emission_color)
    }

    fn write(&self, state: &mut MaterialState, value: &Option<Color>) -> MutationResult<()> {
        state.values.emission_color = *value;
        Ok(())
    }
}

impl ContinuousProperty for EmissionColor {}

#[derive(Debug, Clone, Copy)]
pub struct DiffuseTexture;

impl MaterialProperty for DiffuseTexture {
    type Value = Option<AssetId>;

    fn label(&self) -> String {
        "diffuse texture".to_string()
    }

    fn read(&self, state: &MaterialState) -> MutationResult<Option<AssetId>> {
        Ok(state.values.diffuse_texture_asset_id.clone())
    }

    fn write(&self, state: &mut MaterialState, value: &Option<AssetId>) -> MutationResult<()> {
        state.values.diffuse_texture_asset_id = value.clone();
        Ok(())
    }
}

/// Whether a field takes part in the material
#[derive(Debug, Clone, Copy)]
pub struct Enabled(pub MaterialToggle);

impl MaterialProperty for Enabled {
    type Value = bool;

    fn label(&self) -> String {
        let field = match self.0 {
            MaterialToggle::DiffuseColor => "diffuse color",
            MaterialToggle::DiffuseTexture => "diffuse texture",
            MaterialToggle::EmissionColor => "emission color",
            MaterialToggle::Reflection => "reflection",
        };
        format!("{field} enabled")
    }

    fn read(&self, state: &MaterialState) -> MutationResult<bool> {
        Ok(state.enabled.get(self.0))
    }

    fn write(&self, state: &mut MaterialState, value: &bool) -> MutationResult<()> {
        state.set_enabled(self.0, *value);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReflectionChange {
    /// Switch to another layout, converting the current reflection. `None`
    /// removes the reflection.
    Layout(Option<ReflectionLayout>),
    /// Put back an earlier reflection as it was
    Restore(Option<ReflectionDefinition>),
}

/// The reflection as a whole: its layout, or its removal
#[derive(Debug, Clone, Copy)]
pub struct Reflection;

impl MaterialProperty for Reflection {
    type Value = ReflectionChange;

    fn label(&self) -> String {
        "reflection type".to_string()
    }

    fn read(&self, state: &MaterialState) -> MutationResult<ReflectionChange> {
        Ok(ReflectionChange::Restore(state.values.reflection.clone()))
    }

    fn write(&self, state: &mut MaterialState, value: &ReflectionChange) -> MutationResult<()> {
        let reflection = &mut state.values.reflection;
        match value {
            ReflectionChange::Restore(previous) => *reflection = previous.clone(),
            ReflectionChange::Layout(None) => *reflection = None,
            ReflectionChange::Layout(Some(layout)) => {
                *reflection = Some(match reflection.as_ref() {
                    Some(current) if current.layout == *layout => return Ok(()),
                    Some(current) => current.converted(*layout),
                    None => ReflectionDefinition::new(*layout),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReflectionStrength;

impl MaterialProperty for ReflectionStrength {
    type Value = f32;

    fn label(&self) -> String {
        "reflection strength".to_string()
    }

    fn read(&self, state: &MaterialState) -> MutationResult<f32> {
        Ok(state.reflection()?.strength())
    }

    fn write(&self, state: &mut MaterialState, value: &f32) -> MutationResult<()> {
        if !value.is_finite() || *value < 0.0 {
            return Err(MutationError::Precondition(format!(
                "reflection strength must be a non-negative number, got {value}"
            )));
        }
        state.reflection_mut()?.strength = Some(*value);
        Ok(())
    }
}

impl ContinuousProperty for ReflectionStrength {}

/// One texture slot of the reflection, which must currently use the
/// slot's layout
#[derive(Debug, Clone, Copy)]
pub struct ReflectionTexture(pub ReflectionTextureSlot);

impl MaterialProperty for ReflectionTexture {
    type Value = Option<AssetId>;

    fn label(&self) -> String {
        match self.0 {
            ReflectionTextureSlot::Face(face) => format!("reflection {face:?} texture"),
            slot => format!("reflection {} texture", slot.layout()),
        }
    }

    fn read(&self, state: &MaterialState) -> MutationResult<Option<AssetId>> {
        Ok(state.reflection()?.texture(self.0)?.cloned())
    }

    fn write(&self, state: &mut MaterialState, value: &Option<AssetId>) -> MutationResult<()> {
        state.reflection_mut()?.set_texture(self.0, value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::definition::{CubeFace, MaterialDefinition};

    fn reflective() -> MaterialState {
        let mut reflection = ReflectionDefinition::new(ReflectionLayout::SixByOne);
        reflection.strength = Some(0.8);
        reflection.texture_asset_id = Some("sky".into());
        MaterialState::from_definition(MaterialDefinition {
            reflection: Some(reflection),
            ..MaterialDefinition::default()
        })
    }

    #[test]
    fn test_layout_change_converts_and_restores() {
        let mut state = reflective();
        let before = Reflection.read(&state).unwrap();

        Reflection
            .write(&mut state, &ReflectionChange::Layout(Some(ReflectionLayout::Separate)))
            .unwrap();
        let converted = state.reflection().unwrap();
        assert_eq!(converted.strength, Some(0.8));
        assert_eq!(converted.face(CubeFace::PositiveX), Some(&AssetId::new("sky")));
        assert_eq!(converted.texture_asset_id, None);

        // Same layout again leaves the textures alone
        ReflectionTexture(ReflectionTextureSlot::Face(CubeFace::NegativeY))
            .write(&mut state, &Some("ground".into()))
            .unwrap();
        Reflection
            .write(&mut state, &ReflectionChange::Layout(Some(ReflectionLayout::Separate)))
            .unwrap();
        assert_eq!(state.reflection().unwrap().texture_ids().len(), 2);

        Reflection.write(&mut state, &before).unwrap();
        assert_eq!(state, reflective());

        Reflection.write(&mut state, &ReflectionChange::Layout(None)).unwrap();
        assert!(state.values.reflection.is_none());
    }

    #[test]
    fn test_strength_and_textures_need_a_reflection() {
        let mut state = MaterialState::default();
        assert!(ReflectionStrength.read(&state).is_err());
        assert!(ReflectionStrength.write(&mut state, &0.3).is_err());
        assert!(ReflectionTexture(ReflectionTextureSlot::BoxNet)
            .write(&mut state, &None)
            .is_err());

        let mut state = reflective();
        assert!(ReflectionStrength.write(&mut state, &f32::NAN).is_err());
        assert!(ReflectionTexture(ReflectionTextureSlot::ThreeByTwo)
            .read(&state)
            .is_err());
        assert_eq!(
            ReflectionTexture(ReflectionTextureSlot::SixByOne).read(&state).unwrap(),
            Some(AssetId::new("sky"))
        );
    }
}
