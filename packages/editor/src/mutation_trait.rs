//! # Mutation protocol
//!
//! A mutation is a unit of work describing one user-intended edit. The
//! [`Mutator`](crate::Mutator) drives it through its phases:
//!
//! ```text
//! one-shot:    capture_undo_args → update(args) → write_document → persist → after_persist
//! continuous:  capture_undo_args → update(v1) … update(vN) → write_document → persist → after_persist
//! undo/redo:   update(undo_args | args) → revert/replay recorded document edits → persist
//! ```
//!
//! `update` touches only the document model and the runtime projection.
//! `write_document` touches only the document, deriving the patch from the
//! current model. Keeping the two apart is what lets a drag gesture run
//! `update` at frame rate while the document is written once.

use std::fmt::Debug;
use std::path::PathBuf;

use composer_common::CommonError;
use composer_jsonc::DocumentError;
use futures::future::{self, FutureExt, LocalBoxFuture};
use thiserror::Error;

use crate::errors::EditorError;
use crate::ids::{AssetId, ComponentId, ObjectId};

pub type MutationResult<T> = Result<T, MutationError>;

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("No object with ID {0}")]
    ObjectNotFound(ObjectId),

    #[error("No component with ID {component} on object {object}")]
    ComponentNotFound {
        object: ObjectId,
        component: ComponentId,
    },

    #[error("No asset with ID {0}")]
    AssetNotFound(AssetId),

    #[error("Object {0} already exists")]
    DuplicateObject(ObjectId),

    #[error("Component {0} already exists")]
    DuplicateComponent(ComponentId),

    #[error("Would create cycle: {object} cannot become a child of {parent}")]
    CycleDetected { object: ObjectId, parent: ObjectId },

    #[error("{0} is not a sibling at the target location")]
    InvalidSibling(ObjectId),

    #[error("Component {component} is a {actual} component, expected {expected}")]
    ComponentTypeMismatch {
        component: ComponentId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Could not update {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: CommonError,
    },

    #[error("Project update failed: {0}")]
    Project(#[source] Box<EditorError>),
}

/// A unit of work over a domain `D`
pub trait Mutation<D>: 'static {
    /// Arguments of `update`: the complete target state of whatever the
    /// mutation edits, so that applying them twice equals applying once
    type Args: Clone + Debug + 'static;

    /// Human-readable label for history menus and logs
    fn description(&self) -> String;

    /// Snapshot the state `update` will overwrite. Precondition checks
    /// belong here, before anything changes.
    fn capture_undo_args(&self, domain: &D) -> MutationResult<Self::Args>;

    /// Write `args` to the document model, then to the runtime projection
    fn update(&self, domain: &mut D, args: &Self::Args) -> MutationResult<()>;

    /// Patch the document from the current document model
    fn write_document(&self, domain: &mut D) -> MutationResult<()>;

    /// Refresh derived caches once the document has been persisted
    fn after_persist<'a>(&'a self, _domain: &'a mut D) -> LocalBoxFuture<'a, MutationResult<()>> {
        future::ready(Ok(())).boxed_local()
    }
}

/// Mutation applied in a single call with arguments fixed at construction
pub trait OneShotMutation<D>: Mutation<D> {
    fn args(&self) -> Self::Args;
}

/// Mutation that supports `begin` / `update`×N / `apply`
pub trait ContinuousMutation<D>: Mutation<D> {}
