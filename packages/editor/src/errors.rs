//! Error types for the editor

use std::path::PathBuf;

use composer_common::CommonError;
use composer_jsonc::DocumentError;
use thiserror::Error;

use crate::assets::AssetLoadError;
use crate::ids::{ComponentId, MutationId, ObjectId, SurfaceId};
use crate::mutation_trait::MutationError;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Asset load failed: {0}")]
    AssetLoad(#[from] AssetLoadError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: CommonError,
    },

    /// The edit is applied in memory but not saved
    #[error("Failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: CommonError,
    },

    #[error("After-persist hook of mutation {id} failed: {source}")]
    AfterPersist {
        id: MutationId,
        #[source]
        source: MutationError,
    },

    #[error("Continuous mutation {0} is still in progress")]
    ContinuousInProgress(MutationId),

    #[error("Continuous mutation {0} is not pending on this mutator")]
    StaleContinuousHandle(MutationId),

    #[error("Continuous mutation {0} was applied without any update")]
    ContinuousNotUpdated(MutationId),

    #[error("Surface '{0}' is already registered")]
    SurfaceAlreadyRegistered(SurfaceId),

    #[error("Surface '{0}' is not registered")]
    SurfaceNotRegistered(SurfaceId),
}

impl From<RuntimeError> for MutationError {
    fn from(err: RuntimeError) -> Self {
        MutationError::Runtime(err.to_string())
    }
}

/// Errors reported by a runtime projection (scene runtime, material preview)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("No runtime object for {0}")]
    UnknownObject(ObjectId),

    #[error("No runtime component for {0}")]
    UnknownComponent(ComponentId),

    #[error("Runtime object {0} already exists")]
    DuplicateObject(ObjectId),

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
