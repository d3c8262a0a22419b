use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::AssetId;
use crate::mutation_trait::{MutationError, MutationResult};
use crate::values::Color;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emission_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ReflectionDefinition>,
}

impl MaterialDefinition {
    pub fn is_empty(&self) -> bool {
        *self == MaterialDefinition::default()
    }

    /// Texture assets the material renders with
    pub fn texture_ids(&self) -> Vec<AssetId> {
        let mut textures: Vec<AssetId> = self.diffuse_texture_asset_id.iter().cloned().collect();
        if let Some(reflection) = &self.reflection {
            textures.extend(reflection.texture_ids());
        }
        textures
    }
}

/// How the six faces of a reflection cube map are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReflectionLayout {
    /// One texture, faces unfolded as a cross
    #[serde(rename = "box-net")]
    BoxNet,
    #[serde(rename = "3x2")]
    ThreeByTwo,
    #[serde(rename = "6x1")]
    SixByOne,
    /// One texture per face
    #[serde(rename = "separate")]
    Separate,
}

impl ReflectionLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            ReflectionLayout::BoxNet => "box-net",
            ReflectionLayout::ThreeByTwo => "3x2",
            ReflectionLayout::SixByOne => "6x1",
            ReflectionLayout::Separate => "separate",
        }
    }
}

impl fmt::Display for ReflectionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];
}

/// Texture slot of a reflection. Only the slot(s) of the current layout
/// can be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectionTextureSlot {
    BoxNet,
    ThreeByTwo,
    SixByOne,
    Face(CubeFace),
}

impl ReflectionTextureSlot {
    pub fn layout(self) -> ReflectionLayout {
        match self {
            ReflectionTextureSlot::BoxNet => ReflectionLayout::BoxNet,
            ReflectionTextureSlot::ThreeByTwo => ReflectionLayout::ThreeByTwo,
            ReflectionTextureSlot::SixByOne => ReflectionLayout::SixByOne,
            ReflectionTextureSlot::Face(_) => ReflectionLayout::Separate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionDefinition {
    #[serde(rename = "type")]
    pub layout: ReflectionLayout,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
    /// Texture of the single-texture layouts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub px_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nx_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub py_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ny_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pz_texture_asset_id: Option<AssetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nz_texture_asset_id: Option<AssetId>,
}

impl ReflectionDefinition {
    pub const DEFAULT_STRENGTH: f32 = 0.5;

    pub fn new(layout: ReflectionLayout) -> Self {
        Self {
            layout,
            strength: None,
            texture_asset_id: None,
            px_texture_asset_id: None,
            nx_texture_asset_id: None,
            py_texture_asset_id: None,
            ny_texture_asset_id: None,
            pz_texture_asset_id: None,
            nz_texture_asset_id: None,
        }
    }

    pub fn strength(&self) -> f32 {
        self.strength.unwrap_or(Self::DEFAULT_STRENGTH)
    }

    pub fn face(&self, face: CubeFace) -> Option<&AssetId> {
        match face {
            CubeFace::PositiveX => self.px_texture_asset_id.as_ref(),
            CubeFace::NegativeX => self.nx_texture_asset_id.as_ref(),
            CubeFace::PositiveY => self.py_texture_asset_id.as_ref(),
            CubeFace::NegativeY => self.ny_texture_asset_id.as_ref(),
            CubeFace::PositiveZ => self.pz_texture_asset_id.as_ref(),
            CubeFace::NegativeZ => self.nz_texture_asset_id.as_ref(),
        }
    }

    fn face_mut(&mut self, face: CubeFace) -> &mut Option<AssetId> {
        match face {
            CubeFace::PositiveX => &mut self.px_texture_asset_id,
            CubeFace::NegativeX => &mut self.nx_texture_asset_id,
            CubeFace::PositiveY => &mut self.py_texture_asset_id,
            CubeFace::NegativeY => &mut self.ny_texture_asset_id,
            CubeFace::PositiveZ => &mut self.pz_texture_asset_id,
            CubeFace::NegativeZ => &mut self.nz_texture_asset_id,
        }
    }

    /// Assigned textures, faces in `CubeFace::ALL` order for the separate layout
    pub fn texture_ids(&self) -> Vec<AssetId> {
        match self.layout {
            ReflectionLayout::Separate => CubeFace::ALL
                .iter()
                .filter_map(|face| self.face(*face).cloned())
                .collect(),
            _ => self.texture_asset_id.iter().cloned().collect(),
        }
    }

    /// Textures to render with, or `None` while the layout is missing any
    pub fn complete_textures(&self) -> Option<Vec<AssetId>> {
        match self.layout {
            ReflectionLayout::Separate => CubeFace::ALL
                .iter()
                .map(|face| self.face(*face).cloned())
                .collect(),
            _ => self.texture_asset_id.clone().map(|texture| vec![texture]),
        }
    }

    /// The same reflection under another layout. Strength carries over and
    /// so does the first texture (into +X for the separate layout).
    pub fn converted(&self, layout: ReflectionLayout) -> Self {
        let first = self.texture_ids().into_iter().next();
        let mut converted = Self::new(layout);
        converted.strength = self.strength;
        match layout {
            ReflectionLayout::Separate => converted.px_texture_asset_id = first,
            _ => converted.texture_asset_id = first,
        }
        converted
    }

    pub fn texture(&self, slot: ReflectionTextureSlot) -> MutationResult<Option<&AssetId>> {
        self.check_slot(slot)?;
        Ok(match slot {
            ReflectionTextureSlot::Face(face) => self.face(face),
            _ => self.texture_asset_id.as_ref(),
        })
    }

    pub fn set_texture(&mut self, slot: ReflectionTextureSlot, texture: Option<AssetId>) -> MutationResult<()> {
        self.check_slot(slot)?;
        match slot {
            ReflectionTextureSlot::Face(face) => *self.face_mut(face) = texture,
            _ => self.texture_asset_id = texture,
        }
        Ok(())
    }

    fn check_slot(&self, slot: ReflectionTextureSlot) -> MutationResult<()> {
        if slot.layout() != self.layout {
            return Err(MutationError::Precondition(format!(
                "reflection is {}, cannot set a {} texture",
                self.layout,
                slot.layout()
            )));
        }
        Ok(())
    }
}

/// Material fields that can be switched off without losing their value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialToggle {
    DiffuseColor,
    DiffuseTexture,
    EmissionColor,
    Reflection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialToggles {
    pub diffuse_color: bool,
    pub diffuse_texture: bool,
    pub emission_color: bool,
    pub reflection: bool,
}

impl MaterialToggles {
    pub fn get(&self, toggle: MaterialToggle) -> bool {
        match toggle {
            MaterialToggle::DiffuseColor => self.diffuse_color,
            MaterialToggle::DiffuseTexture => self.diffuse_texture,
            MaterialToggle::EmissionColor => self.emission_color,
            MaterialToggle::Reflection => self.reflection,
        }
    }

    fn get_mut(&mut self, toggle: MaterialToggle) -> &mut bool {
        match toggle {
            MaterialToggle::DiffuseColor => &mut self.diffuse_color,
            MaterialToggle::DiffuseTexture => &mut self.diffuse_texture,
            MaterialToggle::EmissionColor => &mut self.emission_color,
            MaterialToggle::Reflection => &mut self.reflection,
        }
    }
}

/// Editable state of a material: every value ever set, plus which of them
/// are switched on.
///
/// A disabled field keeps its value so that switching it back on restores
/// it; only the effective definition is written to disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialState {
    pub values: MaterialDefinition,
    pub enabled: MaterialToggles,
}

impl MaterialState {
    pub fn from_definition(definition: MaterialDefinition) -> Self {
        let enabled = MaterialToggles {
            diffuse_color: definition.diffuse_color.is_some(),
            diffuse_texture: definition.diffuse_texture_asset_id.is_some(),
            emission_color: definition.emission_color.is_some(),
            reflection: definition.reflection.is_some(),
        };
        Self {
            values: definition,
            enabled,
        }
    }

    /// What the material looks like: enabled fields only
    pub fn effective(&self) -> MaterialDefinition {
        let values = &self.values;
        let enabled = &self.enabled;
        MaterialDefinition {
            diffuse_color: values.diffuse_color.filter(|_| enabled.diffuse_color),
            diffuse_texture_asset_id: values.diffuse_texture_asset_id.clone().filter(|_| enabled.diffuse_texture),
            emission_color: values.emission_color.filter(|_| enabled.emission_color),
            reflection: values.reflection.clone().filter(|_| enabled.reflection),
        }
    }

    /// Switch a field on or off. Switching a color on gives it a default
    /// value if it never had one.
    pub fn set_enabled(&mut self, toggle: MaterialToggle, enabled: bool) {
        *self.enabled.get_mut(toggle) = enabled;
        if !enabled {
            return;
        }
        match toggle {
            MaterialToggle::DiffuseColor => {
                self.values.diffuse_color.get_or_insert(Color::WHITE);
            }
            MaterialToggle::EmissionColor => {
                self.values.emission_color.get_or_insert(Color::BLACK);
            }
            MaterialToggle::DiffuseTexture | MaterialToggle::Reflection => {}
        }
    }

    /// The reflection, which must exist to be edited
    pub fn reflection(&self) -> MutationResult<&ReflectionDefinition> {
        self.values
            .reflection
            .as_ref()
            .ok_or_else(|| MutationError::Precondition("material has no reflection".to_string()))
    }

    pub fn reflection_mut(&mut self) -> MutationResult<&mut ReflectionDefinition> {
        self.values
            .reflection
            .as_mut()
            .ok_or_else(|| MutationError::Precondition("material has no reflection".to_string()))
    }
}
