//! Scene mutations
//!
//! Every mutation edits the [`SceneModel`](crate::scene::SceneModel) and the
//! runtime in `update`, then derives the document patch from the model in
//! `write_document`. Document paths are looked up by object id at write time,
//! never cached across mutations.

mod components;
mod hierarchy;
mod name;
mod transform;

pub use components::{
    AddComponentMutation, ComponentPresence, RemoveComponentMutation, SetLightColorMutation,
    SetLightIntensityMutation, SetMeshComponentAssetMutation, SetScriptComponentAssetMutation,
};
pub use hierarchy::{
    CreateBlankObjectMutation, DeleteObjectMutation, ObjectPresence, Placement, SetObjectParentMutation,
    SiblingPosition,
};
pub use name::SetObjectNameMutation;
pub use transform::{SetObjectTransformMutation, SetTransformFieldMutation, TransformField};
