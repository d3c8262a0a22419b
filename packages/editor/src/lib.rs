//! # Composer Editor
//!
//! Mutation and synchronization engine for the scene and material editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ jsonc: document text → tree, path edits     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: one Mutator per open surface        │
//! │  - model + runtime edits (update)           │
//! │  - document patch (write_document)          │
//! │  - persist, undo/redo from recorded edits   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ runtime projection: SceneRuntime, preview   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: model and runtime are rebuilt from it
//! 2. **Formatting survives edits**: comments and untouched regions stay byte-identical
//! 3. **One write per gesture**: continuous mutations touch the document once, on apply
//! 4. **Precise cascades**: an asset change reinitializes only the components that use it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use composer_editor::scene::mutations::SetTransformFieldMutation;
//!
//! let handle = mutator.begin_continuous(SetTransformFieldMutation::position(id))?;
//! for position in drag {
//!     mutator.update_continuous(&handle, position)?;
//! }
//! mutator.apply_continuous(handle).await?;
//!
//! mutator.undo().await?;
//! ```

mod assets;
mod cascade;
mod controller;
mod dependency;
mod document;
mod errors;
mod events;
mod ids;
mod mutation_trait;
mod mutator;
mod selection;
mod undo_stack;
mod values;

pub mod material;
pub mod project;
pub mod scene;

pub use assets::{
    get_or_load, AssetCache, AssetChange, AssetChangeKind, AssetLoadError, AssetLoader, AssetType, LoadedAsset,
    RawAssetEvent, SharedAssetCache, StaticAssetLoader,
};
pub use cascade::{cascade_asset_change, CascadeFailure, CascadeReport, CascadeTarget};
pub use controller::{MutationController, SurfaceMutator};
pub use dependency::{ComponentDependency, DependencyManager};
pub use document::{DocumentStore, MutationDomain, PersistOutcome};
pub use errors::{EditorError, EditorResult, RuntimeError, RuntimeResult};
pub use events::{ChangeNotifier, MutationEvent, SubscriptionId};
pub use ids::{AssetId, ComponentId, MutationId, MutationIds, ObjectId, SurfaceId};
pub use mutation_trait::{ContinuousMutation, Mutation, MutationError, MutationResult, OneShotMutation};
pub use mutator::{ContinuousHandle, Mutator, MutatorOptions};
pub use selection::{MeshHandle, SelectionCache};
pub use undo_stack::{UndoEntry, UndoStack};
pub use values::{Color, Vector3};
