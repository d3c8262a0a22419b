//! Shared fixtures: a small harbor scene opened on an in-memory file system

#![allow(dead_code)]

use std::path::Path;
use std::rc::Rc;

use composer_common::{Crc32Hasher, MockFileSystem};
use composer_editor::scene::{HeadlessRuntime, SceneView};
use composer_editor::{
    AssetCache, AssetId, DocumentStore, LoadedAsset, MutationIds, Mutator, MutatorOptions, SharedAssetCache,
    StaticAssetLoader,
};

pub const SCENE_PATH: &str = "/harbor/scenes/harbor.scene.json";

pub const SCENE: &str = r#"{
  // Harbor at dusk
  "config": {
    "clearColor": { "r": 20, "g": 24, "b": 40 }
  },
  "objects": [
    {
      "id": "harbor",
      "name": "Harbor",
      "transform": {
        "position": { "x": 0, "y": 0, "z": 0 },
        "rotation": { "x": 0, "y": 0, "z": 0 },
        "scale": { "x": 1, "y": 1, "z": 1 }
      },
      "components": [],
      "children": [
        {
          "id": "ship",
          "name": "Ship",
          "transform": {
            "position": { "x": 4, "y": 0, "z": 0 },
            "rotation": { "x": 0, "y": 0, "z": 0 },
            "scale": { "x": 1, "y": 1, "z": 1 }
          },
          "components": [
            { "type": "mesh", "id": "ship-mesh", "meshFileId": "mesh-ship" }
          ]
        },
        {
          "id": "dock", /* pier */
          "name": "Dock",
          "transform": {
            "position": { "x": -2, "y": 0, "z": 0 },
            "rotation": { "x": 0, "y": 0, "z": 0 },
            "scale": { "x": 1, "y": 1, "z": 1 }
          },
          "components": [
            { "type": "mesh", "id": "dock-mesh", "meshFileId": "mesh-dock" }
          ]
        }
      ]
    },
    {
      "id": "sun",
      "name": "Sun",
      "transform": {
        "position": { "x": 0, "y": 10, "z": 0 },
        "rotation": { "x": 45, "y": 0, "z": 0 },
        "scale": { "x": 1, "y": 1, "z": 1 }
      },
      "components": [
        { "type": "directionalLight", "id": "sun-light", "intensity": 1.5, "color": { "r": 255, "g": 240, "b": 200 } }
      ]
    }
  ]
}
"#;

pub fn asset(id: &str, revision: &str, dependencies: &[&str]) -> LoadedAsset {
    LoadedAsset {
        asset_id: AssetId::new(id),
        revision: revision.to_string(),
        dependencies: dependencies.iter().map(|d| AssetId::new(*d)).collect(),
    }
}

/// mesh-ship → mat-hull → tex-hull, mesh-dock → mat-wood
pub fn loader() -> StaticAssetLoader {
    StaticAssetLoader::new()
        .with_asset(asset("mesh-ship", "1", &["mat-hull"]))
        .with_asset(asset("mat-hull", "1", &["tex-hull"]))
        .with_asset(asset("tex-hull", "1", &[]))
        .with_asset(asset("mesh-dock", "1", &["mat-wood"]))
        .with_asset(asset("mat-wood", "1", &[]))
}

pub struct SceneFixture {
    pub mutator: Mutator<SceneView<HeadlessRuntime>>,
    pub fs: Rc<MockFileSystem>,
    pub assets: SharedAssetCache,
    pub loader: Rc<StaticAssetLoader>,
}

impl SceneFixture {
    pub fn view(&self) -> &SceneView<HeadlessRuntime> {
        self.mutator.domain()
    }

    pub fn runtime(&self) -> &HeadlessRuntime {
        self.mutator.domain().runtime()
    }

    pub fn text(&self) -> &str {
        self.mutator.domain().document().as_str()
    }

    pub fn on_disk(&self) -> String {
        self.fs.contents(Path::new(SCENE_PATH)).unwrap_or_default()
    }
}

pub async fn open_scene() -> SceneFixture {
    open_scene_with(SCENE, loader()).await
}

pub async fn open_scene_with(source: &str, loader: StaticAssetLoader) -> SceneFixture {
    let fs = Rc::new(MockFileSystem::new().with_file(SCENE_PATH, source));
    let mut store = DocumentStore::new(SCENE_PATH, fs.clone(), Rc::new(Crc32Hasher));
    let document = store.load_document().await.unwrap();

    let assets = AssetCache::shared();
    let loader = Rc::new(loader);
    let view = SceneView::load(document, HeadlessRuntime::new(), assets.clone(), loader.clone())
        .await
        .unwrap();

    SceneFixture {
        mutator: Mutator::new(view, store, MutationIds::new(), MutatorOptions::default()),
        fs,
        assets,
        loader,
    }
}
