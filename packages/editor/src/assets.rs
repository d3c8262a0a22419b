//! # Asset cache
//!
//! Loaded assets keyed by id, with the reverse dependency graph needed to
//! find everything an asset change reaches.
//!
//! The cache is shared between surfaces as [`SharedAssetCache`]. Borrows are
//! always released before awaiting a loader.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ids::AssetId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetLoadError {
    #[error("Asset {0} not found")]
    NotFound(AssetId),

    #[error("Failed to load asset {asset}: {message}")]
    Failed { asset: AssetId, message: String },
}

/// Runtime-ready form of an asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedAsset {
    pub asset_id: AssetId,
    /// Changes whenever the asset's content changes
    pub revision: String,
    /// Assets this one references directly
    pub dependencies: Vec<AssetId>,
}

impl LoadedAsset {
    pub fn leaf(asset_id: AssetId, revision: impl Into<String>) -> Self {
        Self {
            asset_id,
            revision: revision.into(),
            dependencies: Vec::new(),
        }
    }
}

/// Produces loaded assets, typically from disk through an importer
pub trait AssetLoader {
    fn load<'a>(&'a self, asset: &'a AssetId) -> LocalBoxFuture<'a, Result<LoadedAsset, AssetLoadError>>;
}

pub type SharedAssetCache = Rc<RefCell<AssetCache>>;

#[derive(Debug, Default)]
pub struct AssetCache {
    entries: HashMap<AssetId, Rc<LoadedAsset>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedAssetCache {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn get(&self, asset: &AssetId) -> Option<Rc<LoadedAsset>> {
        self.entries.get(asset).cloned()
    }

    pub fn insert(&mut self, asset: LoadedAsset) -> Rc<LoadedAsset> {
        let asset = Rc::new(asset);
        self.entries.insert(asset.asset_id.clone(), asset.clone());
        asset
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.entries.contains_key(asset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every cached asset that depends on `asset`, directly or not.
    /// Sorted, never includes `asset` itself.
    pub fn transitive_dependents(&self, asset: &AssetId) -> Vec<AssetId> {
        let mut reverse: HashMap<&AssetId, Vec<&AssetId>> = HashMap::new();
        for loaded in self.entries.values() {
            for dependency in &loaded.dependencies {
                reverse.entry(dependency).or_default().push(&loaded.asset_id);
            }
        }

        let mut seen: HashSet<&AssetId> = HashSet::from([asset]);
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::from([asset]);
        while let Some(current) = queue.pop_front() {
            for &dependent in reverse.get(current).into_iter().flatten() {
                if seen.insert(dependent) {
                    found.insert(dependent.clone());
                    queue.push_back(dependent);
                }
            }
        }
        found.into_iter().collect()
    }

    /// Drop `asset` and its transitive dependents; returns what was cached
    pub fn invalidate(&mut self, asset: &AssetId) -> Vec<AssetId> {
        let mut targets = vec![asset.clone()];
        targets.extend(self.transitive_dependents(asset));
        targets
            .into_iter()
            .filter(|id| self.entries.remove(id).is_some())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Cached asset, loading it on a miss together with every dependency not
/// cached yet, so the reverse graph is complete. Nothing is cached if any
/// load in the chain fails.
pub async fn get_or_load(
    cache: &SharedAssetCache,
    asset: &AssetId,
    loader: &dyn AssetLoader,
) -> Result<Rc<LoadedAsset>, AssetLoadError> {
    if let Some(hit) = cache.borrow().get(asset) {
        return Ok(hit);
    }

    let mut loaded = Vec::new();
    let mut seen = HashSet::from([asset.clone()]);
    let mut queue = VecDeque::from([asset.clone()]);
    while let Some(next) = queue.pop_front() {
        debug!("[AssetCache] loading {}", next);
        let entry = loader.load(&next).await?;
        for dependency in &entry.dependencies {
            if !cache.borrow().contains(dependency) && seen.insert(dependency.clone()) {
                queue.push_back(dependency.clone());
            }
        }
        loaded.push(entry);
    }

    let mut cache = cache.borrow_mut();
    let mut requested = None;
    for entry in loaded {
        let entry = cache.insert(entry);
        requested.get_or_insert(entry);
    }
    requested.ok_or_else(|| AssetLoadError::NotFound(asset.clone()))
}

/// In-memory loader. Ids without an entry load as leaf assets unless
/// marked failing.
#[derive(Debug, Default)]
pub struct StaticAssetLoader {
    assets: RefCell<HashMap<AssetId, LoadedAsset>>,
    failing: RefCell<HashSet<AssetId>>,
    loads: Cell<usize>,
}

impl StaticAssetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(self, asset: LoadedAsset) -> Self {
        self.set_asset(asset);
        self
    }

    pub fn set_asset(&self, asset: LoadedAsset) {
        self.assets.borrow_mut().insert(asset.asset_id.clone(), asset);
    }

    pub fn set_failing(&self, asset: &AssetId, failing: bool) {
        if failing {
            self.failing.borrow_mut().insert(asset.clone());
        } else {
            self.failing.borrow_mut().remove(asset);
        }
    }

    /// Number of load calls so far, failed ones included
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl AssetLoader for StaticAssetLoader {
    fn load<'a>(&'a self, asset: &'a AssetId) -> LocalBoxFuture<'a, Result<LoadedAsset, AssetLoadError>> {
        self.loads.set(self.loads.get() + 1);
        let result = if self.failing.borrow().contains(asset) {
            Err(AssetLoadError::Failed {
                asset: asset.clone(),
                message: "load failure injected".to_string(),
            })
        } else {
            Ok(self
                .assets
                .borrow()
                .get(asset)
                .cloned()
                .unwrap_or_else(|| LoadedAsset::leaf(asset.clone(), "0")))
        };
        future::ready(result).boxed_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetType {
    Mesh,
    MeshSupplementary,
    Script,
    Sound,
    Texture,
    Material,
    #[serde(other)]
    Unknown,
}

impl AssetType {
    /// Classify a file by extension, case-insensitively
    pub fn from_path(path: &Path) -> AssetType {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "obj" | "fbx" | "gltf" | "glb" | "stl" => AssetType::Mesh,
            "mtl" => AssetType::MeshSupplementary,
            "ts" | "js" => AssetType::Script,
            "mp3" | "ogg" | "wav" => AssetType::Sound,
            "png" | "jpg" | "jpeg" | "bmp" | "basis" | "dds" => AssetType::Texture,
            "pzmat" => AssetType::Material,
            _ => AssetType::Unknown,
        }
    }
}

/// File-watcher notification, before it is resolved against the project.
/// Deserializes from the watcher's wire form, e.g.
/// `{ "modify": { "assetId": "…", "newHash": "…" } }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum RawAssetEvent {
    #[serde(rename = "create", rename_all = "camelCase")]
    Created {
        asset_id: AssetId,
        path: String,
        #[serde(rename = "type")]
        asset_type: AssetType,
        #[serde(default)]
        hash: Option<String>,
    },
    #[serde(rename = "modify", rename_all = "camelCase")]
    Modified {
        asset_id: AssetId,
        #[serde(rename = "newHash", default)]
        hash: Option<String>,
    },
    #[serde(rename = "delete", rename_all = "camelCase")]
    Deleted { asset_id: AssetId },
    #[serde(rename = "rename", rename_all = "camelCase")]
    Renamed { asset_id: AssetId, new_path: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetChangeKind {
    Created,
    Modified,
    Deleted,
    Renamed { old_path: PathBuf, new_path: PathBuf },
}

/// Resolved asset change, ready to cascade into scene views
#[derive(Debug, Clone, PartialEq)]
pub struct AssetChange {
    pub asset_id: AssetId,
    pub kind: AssetChangeKind,
    /// Transitive dependents at the time of the change
    pub dependents: Vec<AssetId>,
}

impl AssetChange {
    pub fn new(asset_id: AssetId, kind: AssetChangeKind) -> Self {
        Self {
            asset_id,
            kind,
            dependents: Vec::new(),
        }
    }

    pub fn with_dependents(mut self, dependents: Vec<AssetId>) -> Self {
        self.dependents = dependents;
        self
    }

    /// The changed asset followed by its dependents
    pub fn affected_asset_ids(&self) -> Vec<AssetId> {
        let mut ids = Vec::with_capacity(self.dependents.len() + 1);
        ids.push(self.asset_id.clone());
        ids.extend(self.dependents.iter().filter(|id| **id != self.asset_id).cloned());
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, deps: &[&str]) -> LoadedAsset {
        LoadedAsset {
            asset_id: AssetId::new(id),
            revision: "1".to_string(),
            dependencies: deps.iter().map(|d| AssetId::new(*d)).collect(),
        }
    }

    fn graph() -> AssetCache {
        // texture <- material <- mesh-a, material <- mesh-b, other
        let mut cache = AssetCache::new();
        cache.insert(asset("texture", &[]));
        cache.insert(asset("material", &["texture"]));
        cache.insert(asset("mesh-a", &["material"]));
        cache.insert(asset("mesh-b", &["material"]));
        cache.insert(asset("other", &[]));
        cache
    }

    #[test]
    fn test_transitive_dependents() {
        let cache = graph();
        let ids: Vec<String> = cache
            .transitive_dependents(&AssetId::new("texture"))
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["material", "mesh-a", "mesh-b"]);
        assert!(cache.transitive_dependents(&AssetId::new("other")).is_empty());
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let mut cache = AssetCache::new();
        cache.insert(asset("a", &["b"]));
        cache.insert(asset("b", &["a"]));
        assert_eq!(cache.transitive_dependents(&AssetId::new("a")), vec![AssetId::new("b")]);
    }

    #[test]
    fn test_invalidate_removes_dependents() {
        let mut cache = graph();
        let removed = cache.invalidate(&AssetId::new("material"));
        assert_eq!(removed.len(), 3);
        assert!(cache.contains(&AssetId::new("texture")));
        assert!(!cache.contains(&AssetId::new("mesh-a")));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_get_or_load_caches() {
        let cache = AssetCache::shared();
        let loader = StaticAssetLoader::new().with_asset(asset("mesh", &["material"]));

        let first = get_or_load(&cache, &AssetId::new("mesh"), &loader).await.unwrap();
        let second = get_or_load(&cache, &AssetId::new("mesh"), &loader).await.unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.dependencies, vec![AssetId::new("material")]);
        // the unknown dependency loads as a leaf and is cached alongside
        assert_eq!(loader.load_count(), 2);
        assert!(cache.borrow().contains(&AssetId::new("material")));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let cache = AssetCache::shared();
        let loader = StaticAssetLoader::new();
        let id = AssetId::new("broken");
        loader.set_failing(&id, true);

        assert!(get_or_load(&cache, &id, &loader).await.is_err());
        assert!(cache.borrow().is_empty());

        loader.set_failing(&id, false);
        assert!(get_or_load(&cache, &id, &loader).await.is_ok());
    }

    #[test]
    fn test_affected_asset_ids() {
        let change = AssetChange::new(AssetId::new("a"), AssetChangeKind::Modified)
            .with_dependents(vec![AssetId::new("b")]);
        assert_eq!(change.affected_asset_ids(), vec![AssetId::new("a"), AssetId::new("b")]);
    }

    #[test]
    fn test_asset_type_from_extension() {
        assert_eq!(AssetType::from_path(Path::new("models/ship.GLB")), AssetType::Mesh);
        assert_eq!(AssetType::from_path(Path::new("textures/hull.png")), AssetType::Texture);
        assert_eq!(AssetType::from_path(Path::new("hull.pzmat")), AssetType::Material);
        assert_eq!(AssetType::from_path(Path::new("README")), AssetType::Unknown);
    }

    #[test]
    fn test_raw_events_from_watcher_payload() {
        let payload = r#"[
            { "create": { "assetId": "t1", "path": "textures/a.png", "type": "texture", "hash": "ab" } },
            { "modify": { "assetId": "t1", "newHash": "cd" } },
            { "rename": { "assetId": "t1", "newPath": "textures/b.png" } },
            { "delete": { "assetId": "t1" } },
            { "create": { "assetId": "x", "path": "x.bin", "type": "blob" } }
        ]"#;
        let events: Vec<RawAssetEvent> = serde_json::from_str(payload).unwrap();

        assert_eq!(
            events[0],
            RawAssetEvent::Created {
                asset_id: AssetId::new("t1"),
                path: "textures/a.png".to_string(),
                asset_type: AssetType::Texture,
                hash: Some("ab".to_string()),
            }
        );
        assert_eq!(
            events[1],
            RawAssetEvent::Modified {
                asset_id: AssetId::new("t1"),
                hash: Some("cd".to_string()),
            }
        );
        assert!(matches!(&events[2], RawAssetEvent::Renamed { new_path, .. } if new_path == "textures/b.png"));
        assert!(matches!(&events[3], RawAssetEvent::Deleted { .. }));
        assert!(matches!(
            &events[4],
            RawAssetEvent::Created { asset_type: AssetType::Unknown, hash: None, .. }
        ));
    }
}
