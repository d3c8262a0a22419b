//! Serialized shape of a scene document

use serde::{Deserialize, Serialize};

use crate::ids::{AssetId, ComponentId, ObjectId};
use crate::values::{Color, Vector3};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDefinition {
    #[serde(default)]
    pub config: SceneConfig,
    #[serde(default)]
    pub objects: Vec<GameObjectDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneConfig {
    #[serde(default)]
    pub clear_color: Color,
    #[serde(default = "default_ambient_light")]
    pub ambient_light: Color,
}

fn default_ambient_light() -> Color {
    Color::new(40, 40, 40)
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::default(),
            ambient_light: default_ambient_light(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameObjectDefinition {
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub components: Vec<ComponentDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GameObjectDefinition>,
}

impl GameObjectDefinition {
    pub fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            transform: Transform::default(),
            components: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Local transform relative to the parent object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: Vector3,
    #[serde(default)]
    pub rotation: Vector3,
    #[serde(default = "default_scale")]
    pub scale: Vector3,
}

fn default_scale() -> Vector3 {
    Vector3::ONE
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ComponentDefinition {
    Mesh(MeshComponent),
    Script(ScriptComponent),
    Camera(CameraComponent),
    DirectionalLight(LightComponent),
    PointLight(LightComponent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshComponent {
    pub id: ComponentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_file_id: Option<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptComponent {
    pub id: ComponentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file_id: Option<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraComponent {
    pub id: ComponentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightComponent {
    pub id: ComponentId,
    #[serde(default = "default_intensity")]
    pub intensity: f32,
    #[serde(default = "default_light_color")]
    pub color: Color,
}

fn default_intensity() -> f32 {
    1.0
}

fn default_light_color() -> Color {
    Color::WHITE
}

impl ComponentDefinition {
    pub fn id(&self) -> &ComponentId {
        match self {
            ComponentDefinition::Mesh(mesh) => &mesh.id,
            ComponentDefinition::Script(script) => &script.id,
            ComponentDefinition::Camera(camera) => &camera.id,
            ComponentDefinition::DirectionalLight(light) | ComponentDefinition::PointLight(light) => &light.id,
        }
    }

    /// Assets this component is built from
    pub fn asset_ids(&self) -> Vec<AssetId> {
        match self {
            ComponentDefinition::Mesh(mesh) => mesh.mesh_file_id.iter().cloned().collect(),
            ComponentDefinition::Script(script) => script.script_file_id.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Serialized `type` tag
    pub fn kind_name(&self) -> &'static str {
        match self {
            ComponentDefinition::Mesh(_) => "mesh",
            ComponentDefinition::Script(_) => "script",
            ComponentDefinition::Camera(_) => "camera",
            ComponentDefinition::DirectionalLight(_) => "directionalLight",
            ComponentDefinition::PointLight(_) => "pointLight",
        }
    }

    pub fn light(&self) -> Option<&LightComponent> {
        match self {
            ComponentDefinition::DirectionalLight(light) | ComponentDefinition::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut LightComponent> {
        match self {
            ComponentDefinition::DirectionalLight(light) | ComponentDefinition::PointLight(light) => Some(light),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_component_tagging() {
        let component: ComponentDefinition = serde_json::from_value(json!({
            "type": "mesh",
            "id": "m1",
            "meshFileId": "cube.glb"
        }))
        .unwrap();
        assert_eq!(component.kind_name(), "mesh");
        assert_eq!(component.asset_ids(), vec![AssetId::new("cube.glb")]);

        let light: ComponentDefinition =
            serde_json::from_value(json!({ "type": "pointLight", "id": "l1" })).unwrap();
        assert_eq!(light.light().map(|l| l.intensity), Some(1.0));
        assert_eq!(
            serde_json::to_value(&light).unwrap(),
            json!({ "type": "pointLight", "id": "l1", "intensity": 1.0, "color": { "r": 255, "g": 255, "b": 255 } })
        );
    }

    #[test]
    fn test_object_defaults() {
        let object: GameObjectDefinition =
            serde_json::from_value(json!({ "id": "a", "name": "Empty" })).unwrap();
        assert_eq!(object.transform, Transform::default());
        assert!(object.children.is_empty());

        let value = serde_json::to_value(&object).unwrap();
        assert!(value.get("children").is_none());
    }
}
