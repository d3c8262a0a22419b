pub mod document;
pub mod scene;

pub use document::{delete, get, set, DeleteArgs, GetArgs, SetArgs};
pub use scene::{scene, SceneArgs};
