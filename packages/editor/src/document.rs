//! # Document Handle
//!
//! How a mutator reaches the document it edits and the file it persists to.
//!
//! ```text
//! Load → Parse → Edit (model + runtime) → Patch document → Save
//!   ↓      ↓            ↓                      ↓            ↓
//! File  JsoncDocument  MutationDomain    JsoncDocument   DocumentStore
//! ```

use std::path::{Path, PathBuf};
use std::rc::Rc;

use composer_common::{ContentHasher, FileSystem};
use composer_jsonc::{DocumentError, DocumentResult, JsonPath, JsoncDocument};
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{EditorError, EditorResult};

/// The editable state of one surface: a document plus whatever model and
/// runtime projection are derived from it.
pub trait MutationDomain: 'static {
    fn document(&self) -> &JsoncDocument;

    fn document_mut(&mut self) -> &mut JsoncDocument;

    /// Finish runtime work that `update` queued because it needs to await
    /// (asset loads). Each failure is reported, none aborts the others.
    fn settle(&mut self) -> LocalBoxFuture<'_, Vec<EditorError>> {
        future::ready(Vec::new()).boxed_local()
    }

    /// Rebuild everything from freshly read document text
    fn reload(&mut self, text: String) -> LocalBoxFuture<'_, EditorResult<()>> {
        let result = self.document_mut().replace_text(text).map_err(EditorError::from);
        future::ready(result).boxed_local()
    }
}

/// Result of [`DocumentStore::persist`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { hash: String },
    /// Content hash matches the last persisted one, nothing was written
    Unchanged,
}

/// File a document persists to
pub struct DocumentStore {
    path: PathBuf,
    fs: Rc<dyn FileSystem>,
    hasher: Rc<dyn ContentHasher>,
    last_hash: Option<String>,
}

impl DocumentStore {
    pub fn new(path: impl Into<PathBuf>, fs: Rc<dyn FileSystem>, hasher: Rc<dyn ContentHasher>) -> Self {
        Self {
            path: path.into(),
            fs,
            hasher,
            last_hash: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_system(&self) -> &Rc<dyn FileSystem> {
        &self.fs
    }

    pub fn hasher(&self) -> &Rc<dyn ContentHasher> {
        &self.hasher
    }

    /// Hash of the content last read or written
    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Read the document text and remember its hash as persisted
    pub async fn read(&mut self) -> EditorResult<String> {
        let text = self
            .fs
            .read_to_string(&self.path)
            .await
            .map_err(|source| EditorError::Read {
                path: self.path.clone(),
                source,
            })?;
        self.last_hash = Some(self.hasher.hash(text.as_bytes()));
        Ok(text)
    }

    /// Write `text` unless it hashes to what is already on disk
    pub async fn persist(&mut self, text: &str) -> EditorResult<PersistOutcome> {
        let hash = self.hasher.hash(text.as_bytes());
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            debug!("[DocumentStore] {} unchanged, skipping write", self.path.display());
            return Ok(PersistOutcome::Unchanged);
        }

        self.fs
            .write(&self.path, text.as_bytes())
            .await
            .map_err(|source| EditorError::Persist {
                path: self.path.clone(),
                source,
            })?;
        self.last_hash = Some(hash.clone());
        Ok(PersistOutcome::Written { hash })
    }

    /// Load a document, parsing it with the detected formatting
    pub async fn load_document(&mut self) -> EditorResult<JsoncDocument> {
        let text = self.read().await?;
        Ok(JsoncDocument::parse(text)?)
    }
}

/// Bring the value at `path` to `target` (`None` removes it) with the
/// fewest edits: equal values stay as written and objects are reconciled
/// member by member. The parent of `path` must exist.
pub(crate) fn reconcile<T: Serialize + ?Sized>(
    document: &mut JsoncDocument,
    path: &JsonPath,
    target: Option<&T>,
) -> DocumentResult<()> {
    match target {
        Some(target) => reconcile_value(document, path, &as_written(target)?),
        None if document.contains(path) => document.delete(path),
        None => Ok(()),
    }
}

fn reconcile_value(document: &mut JsoncDocument, path: &JsonPath, target: &Value) -> DocumentResult<()> {
    match (document.value_at(path), target) {
        (Some(current), _) if current == *target => Ok(()),
        (Some(Value::Object(current)), Value::Object(members)) => {
            for key in current.keys().filter(|key| !members.contains_key(*key)) {
                document.delete(&path.clone().key(key.as_str()))?;
            }
            for (key, member) in members {
                reconcile_value(document, &path.clone().key(key.as_str()), member)?;
            }
            Ok(())
        }
        _ => document.set(path, target),
    }
}

/// `value` as it reads back once written, so `0.7f32` compares equal to a
/// `0.7` already in the document
fn as_written<T: Serialize + ?Sized>(value: &T) -> DocumentResult<Value> {
    let text = serde_json::to_string(value).map_err(DocumentError::Serialize)?;
    serde_json::from_str(&text).map_err(DocumentError::Deserialize)
}
