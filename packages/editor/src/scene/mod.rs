//! Scene editing: definition types, the arena model, the runtime projection
//! and the mutations that tie them to the scene document.

pub mod definition;
pub mod model;
pub mod mutations;
pub mod paths;
pub mod runtime;
pub mod view;

pub use definition::{
    CameraComponent, ComponentDefinition, GameObjectDefinition, LightComponent, MeshComponent, SceneConfig,
    SceneDefinition, ScriptComponent, Transform,
};
pub use model::{GameObjectData, SceneModel};
pub use runtime::{ComponentInstance, HeadlessComponent, HeadlessObject, HeadlessRuntime, SceneRuntime};
pub use view::SceneView;
