//! Backing-store collaborators shared by the editor crates: file access and
//! content hashing.

pub mod error;
pub mod filesystem;
pub mod hash;

pub use error::*;
pub use filesystem::*;
pub use hash::*;
