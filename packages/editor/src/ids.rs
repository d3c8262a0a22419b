//! Stable identifiers shared by the document model, runtime and history

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random (UUID v4) identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Game object in a scene
    ObjectId
);
string_id!(
    /// Component attached to a game object
    ComponentId
);
string_id!(
    /// Project asset (mesh, material, texture, ...)
    AssetId
);
string_id!(
    /// Editing surface registered with the mutation controller
    SurfaceId
);

/// Identifier of one applied (or pending) mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl MutationId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic mutation id source.
///
/// Clones share the counter, so every mutator handed a clone by the same
/// controller draws from one sequence.
#[derive(Debug, Clone, Default)]
pub struct MutationIds(Rc<Cell<u64>>);

impl MutationIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> MutationId {
        let next = self.0.get() + 1;
        self.0.set(next);
        MutationId(next)
    }
}
