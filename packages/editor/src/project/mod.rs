//! # Project
//!
//! The project file lists every asset and scene. File-watcher events are
//! folded into it here and turned into [`AssetChange`]s for the open
//! surfaces:
//!
//! ```text
//! RawAssetEvent → project model + document → AssetChange (+ dependents)
//!                        ↓                          ↓
//!                 persist_changes            cache invalidated, scenes cascade
//! ```

mod mutations;
mod overrides;

pub use mutations::{CreateNewMaterialAssetMutation, CreateNewSceneMutation, MoveAssetMutation, MoveSceneMutation};
pub use overrides::{
    BaseMaterial, BaseMaterialEnabled, DragMaterialOverrideMutation, MaterialOverrideDefinition,
    MaterialOverrideState, OverrideProperty, Overridden, SetMaterialOverrideMutation,
};

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::rc::Rc;

use composer_common::{ContentHasher, FileSystem};
use composer_jsonc::{DocumentResult, JsonPath, JsoncDocument};
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assets::{AssetChange, AssetChangeKind, AssetType, RawAssetEvent, SharedAssetCache};
use crate::document::MutationDomain;
use crate::errors::EditorResult;
use crate::ids::AssetId;
use crate::mutation_trait::{MutationError, MutationResult};
use crate::mutator::Mutator;
use crate::scene::paths::position_by_id;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectManifest {
    #[serde(default)]
    pub project_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDefinition {
    pub id: AssetId,
    pub path: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Per-material overrides of a mesh, keyed by material name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub material_overrides: BTreeMap<String, MaterialOverrideDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneManifest {
    pub id: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDefinition {
    #[serde(default)]
    pub manifest: ProjectManifest,
    #[serde(default)]
    pub assets: Vec<AssetDefinition>,
    #[serde(default)]
    pub scenes: Vec<SceneManifest>,
}

/// Where the project's asset and scene files live. Paths recorded in the
/// project file are relative to `root`.
#[derive(Clone)]
pub struct ProjectFiles {
    pub fs: Rc<dyn FileSystem>,
    pub root: PathBuf,
    pub hasher: Rc<dyn ContentHasher>,
}

impl ProjectFiles {
    pub fn new(fs: Rc<dyn FileSystem>, root: impl Into<PathBuf>, hasher: Rc<dyn ContentHasher>) -> Self {
        Self {
            fs,
            root: root.into(),
            hasher,
        }
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

pub struct ProjectDomain {
    pub(crate) document: JsoncDocument,
    pub(crate) model: ProjectDefinition,
    assets: SharedAssetCache,
    files: Option<ProjectFiles>,
    /// Material override state touched since load, keyed by (mesh, material)
    overrides: HashMap<(AssetId, String), MaterialOverrideState>,
    /// Changes made by persisted override edits, for the open surfaces
    changes: Vec<AssetChange>,
    /// Where the file of a moved scene still sits, until it is moved too
    scene_files: HashMap<String, String>,
}

impl ProjectDomain {
    pub fn load(document: JsoncDocument, assets: SharedAssetCache) -> EditorResult<Self> {
        let model = document.value()?;
        Ok(Self {
            document,
            model,
            assets,
            files: None,
            overrides: HashMap::new(),
            changes: Vec::new(),
            scene_files: HashMap::new(),
        })
    }

    /// Allow mutations that create, move or delete project files
    pub fn with_files(mut self, files: ProjectFiles) -> Self {
        self.files = Some(files);
        self
    }

    pub fn files(&self) -> MutationResult<&ProjectFiles> {
        self.files
            .as_ref()
            .ok_or_else(|| MutationError::Precondition("project has no file access".to_string()))
    }

    /// Drain the asset changes collected since last called
    pub fn take_asset_changes(&mut self) -> Vec<AssetChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn document(&self) -> &JsoncDocument {
        &self.document
    }

    pub fn model(&self) -> &ProjectDefinition {
        &self.model
    }

    pub fn asset(&self, id: &AssetId) -> Option<&AssetDefinition> {
        self.model.assets.iter().find(|asset| asset.id == *id)
    }

    pub fn asset_mut(&mut self, id: &AssetId) -> MutationResult<&mut AssetDefinition> {
        self.model
            .assets
            .iter_mut()
            .find(|asset| asset.id == *id)
            .ok_or_else(|| MutationError::AssetNotFound(id.clone()))
    }

    /// Document path of an asset definition, looked up by id
    pub fn asset_path(&self, id: &AssetId) -> Option<JsonPath> {
        element_path(&self.document, "assets", id.as_str())
    }

    pub fn scene(&self, id: &str) -> Option<&SceneManifest> {
        self.model.scenes.iter().find(|scene| scene.id == id)
    }

    pub fn scene_by_path(&self, path: &str) -> Option<&SceneManifest> {
        self.model.scenes.iter().find(|scene| scene.path == path)
    }

    pub fn scene_mut(&mut self, id: &str) -> MutationResult<&mut SceneManifest> {
        self.model
            .scenes
            .iter_mut()
            .find(|scene| scene.id == id)
            .ok_or_else(|| MutationError::Precondition(format!("No scene exists with Id '{id}'")))
    }

    /// Document path of a scene manifest, looked up by id
    pub fn scene_path(&self, id: &str) -> Option<JsonPath> {
        element_path(&self.document, "scenes", id)
    }

    pub fn reload(&mut self, text: String) -> EditorResult<()> {
        self.document.replace_text(text)?;
        self.model = self.document.value()?;
        self.overrides.clear();
        self.scene_files.clear();
        Ok(())
    }

    /// Fold watcher events into the project model and document.
    ///
    /// Dependents are read from the asset cache before the changed entries
    /// are invalidated. Events naming unknown assets are logged and skipped.
    /// Nothing is persisted here.
    pub fn apply_asset_events(&mut self, events: &[RawAssetEvent]) -> EditorResult<Vec<AssetChange>> {
        let mut changes = Vec::with_capacity(events.len());
        for event in events {
            if let Some(change) = self.apply_asset_event(event)? {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    fn apply_asset_event(&mut self, event: &RawAssetEvent) -> EditorResult<Option<AssetChange>> {
        match event {
            RawAssetEvent::Created {
                asset_id,
                path,
                asset_type,
                hash,
            } => {
                if self.asset(asset_id).is_some() {
                    warn!("[Project] asset {} created twice, ignoring", asset_id);
                    return Ok(None);
                }
                info!("[Project] new asset {} ({})", path, asset_id);
                let definition = AssetDefinition {
                    id: asset_id.clone(),
                    path: path.clone(),
                    asset_type: *asset_type,
                    hash: hash.clone(),
                    material_overrides: BTreeMap::new(),
                };
                self.append_asset(definition)?;
                Ok(Some(AssetChange::new(asset_id.clone(), AssetChangeKind::Created)))
            }

            RawAssetEvent::Modified { asset_id, hash } => {
                let Some(path) = self.known_asset_path(asset_id, "modify") else {
                    return Ok(None);
                };
                self.asset_mut(asset_id)?.hash = hash.clone();
                let hash_path = path.key("hash");
                match hash {
                    Some(hash) => self.document.set(&hash_path, hash)?,
                    None if self.document.contains(&hash_path) => self.document.delete(&hash_path)?,
                    None => {}
                }
                Ok(Some(self.invalidated(asset_id, AssetChangeKind::Modified)))
            }

            RawAssetEvent::Deleted { asset_id } => {
                let Some(path) = self.known_asset_path(asset_id, "delete") else {
                    return Ok(None);
                };
                info!("[Project] asset {} deleted", asset_id);
                self.model.assets.retain(|asset| asset.id != *asset_id);
                self.overrides.retain(|(mesh, _), _| mesh != asset_id);
                self.document.delete(&path)?;
                Ok(Some(self.invalidated(asset_id, AssetChangeKind::Deleted)))
            }

            RawAssetEvent::Renamed { asset_id, new_path } => {
                let Some(path) = self.known_asset_path(asset_id, "rename") else {
                    return Ok(None);
                };
                let asset = self.asset_mut(asset_id)?;
                let old_path = std::mem::replace(&mut asset.path, new_path.clone());
                self.document.set(&path.key("path"), new_path)?;
                Ok(Some(AssetChange::new(
                    asset_id.clone(),
                    AssetChangeKind::Renamed {
                        old_path: PathBuf::from(old_path),
                        new_path: PathBuf::from(new_path),
                    },
                )))
            }
        }
    }

    /// Add an asset definition to the end of the model and the document
    pub(crate) fn append_asset(&mut self, definition: AssetDefinition) -> DocumentResult<()> {
        insert_element(&mut self.document, "assets", self.model.assets.len(), &definition)?;
        self.model.assets.push(definition);
        Ok(())
    }

    fn known_asset_path(&self, asset_id: &AssetId, action: &str) -> Option<JsonPath> {
        let path = self.asset(asset_id).and_then(|_| self.asset_path(asset_id));
        if path.is_none() {
            warn!("[Project] cannot {} unknown asset {}, skipping", action, asset_id);
        }
        path
    }

    /// Change record for `asset_id` with its dependents, dropping all of
    /// them from the cache
    fn invalidated(&self, asset_id: &AssetId, kind: AssetChangeKind) -> AssetChange {
        let mut cache = self.assets.borrow_mut();
        let dependents = cache.transitive_dependents(asset_id);
        cache.invalidate(asset_id);
        AssetChange::new(asset_id.clone(), kind).with_dependents(dependents)
    }
}

/// Path of the element of the top-level `array` whose id is `id`
fn element_path(document: &JsoncDocument, array: &str, id: &str) -> Option<JsonPath> {
    let path = JsonPath::root().key(array);
    let node = document.root().resolve(path.segments())?;
    let index = position_by_id(node, id)?;
    Some(path.index(index))
}

/// Insert `value` at `index` of the top-level `array`, creating the array
/// if the document has none
pub(crate) fn insert_element<T: Serialize>(
    document: &mut JsoncDocument,
    array: &str,
    index: usize,
    value: &T,
) -> DocumentResult<()> {
    let path = JsonPath::root().key(array);
    if document.contains(&path) {
        document.insert(&path.index(index), value)
    } else {
        document.set(&path, &[value])
    }
}

impl MutationDomain for ProjectDomain {
    fn document(&self) -> &JsoncDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut JsoncDocument {
        &mut self.document
    }

    fn reload(&mut self, text: String) -> LocalBoxFuture<'_, EditorResult<()>> {
        future::ready(ProjectDomain::reload(self, text)).boxed_local()
    }
}

/// Project mutator shared with the surfaces that write assets themselves
pub type SharedProject = Rc<RefCell<Mutator<ProjectDomain>>>;

impl Mutator<ProjectDomain> {
    /// Apply watcher events and persist the project file once for the batch
    pub async fn sync_asset_events(&mut self, events: &[RawAssetEvent]) -> EditorResult<Vec<AssetChange>> {
        let changes = self.domain_mut().apply_asset_events(events)?;
        if !changes.is_empty() {
            self.persist_changes().await?;
        }
        Ok(changes)
    }

    /// Record the new hash of an asset the editor wrote itself, exactly as
    /// a watcher `Modified` event would
    pub async fn record_asset_hash(&mut self, asset_id: &AssetId, hash: String) -> EditorResult<Vec<AssetChange>> {
        let recorded = self.domain().asset(asset_id).and_then(|asset| asset.hash.as_deref());
        if recorded == Some(hash.as_str()) {
            return Ok(Vec::new());
        }
        self.sync_asset_events(&[RawAssetEvent::Modified {
            asset_id: asset_id.clone(),
            hash: Some(hash),
        }])
        .await
    }
}
