//! Asset changes flowing from the project file and the material editor into
//! an open scene: only components built from an affected asset are rebuilt.

mod common;

use std::rc::Rc;

use common::{asset, loader, open_scene, open_scene_with, SCENE};
use composer_common::{ContentHasher, Crc32Hasher, MockFileSystem};
use composer_editor::material::property::DiffuseColor;
use composer_editor::material::{DragMaterialPropertyMutation, HeadlessMaterialPreview, MaterialEditorView};
use composer_editor::project::ProjectDomain;
use composer_editor::{
    AssetChange, AssetChangeKind, AssetId, AssetLoader, Color, ComponentId, DocumentStore, MutationIds, Mutator,
    MutatorOptions, ObjectId, RawAssetEvent, SharedAssetCache,
};
use composer_jsonc::JsoncDocument;

const PROJECT: &str = r#"{
  "manifest": { "projectName": "Harbor" },
  "assets": [
    { "id": "tex-hull", "path": "textures/hull.png", "type": "texture", "hash": "a1" },
    { "id": "mat-hull", "path": "materials/hull.pzmat", "type": "material" },
    { "id": "mesh-ship", "path": "models/ship.glb", "type": "mesh" },
    { "id": "mat-wood", "path": "materials/wood.pzmat", "type": "material" },
    { "id": "mesh-dock", "path": "models/dock.glb", "type": "mesh" }
  ]
}
"#;

fn project(assets: SharedAssetCache) -> ProjectDomain {
    ProjectDomain::load(JsoncDocument::parse(PROJECT).unwrap(), assets).unwrap()
}

fn modified(id: &str) -> RawAssetEvent {
    RawAssetEvent::Modified {
        asset_id: AssetId::new(id),
        hash: Some("b2".to_string()),
    }
}

#[tokio::test]
async fn test_texture_change_reinitializes_only_dependent_mesh() {
    let mut f = open_scene().await;
    let ship = ObjectId::new("ship");
    let dock = ObjectId::new("dock");
    let dock_before = f.runtime().component(&dock, &"dock-mesh".into()).cloned().unwrap();
    let created_before = f.runtime().components_created;

    let mut project = project(f.assets.clone());
    f.loader.set_asset(asset("tex-hull", "2", &[]));
    let changes = project.apply_asset_events(&[modified("tex-hull")]).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes[0].dependents,
        vec![AssetId::new("mat-hull"), AssetId::new("mesh-ship")]
    );
    assert!(!f.assets.borrow().contains(&"tex-hull".into()));
    assert!(f.assets.borrow().contains(&"mesh-dock".into()));

    let report = f.mutator.domain_mut().on_asset_changed(&changes[0]).await;

    assert!(report.is_clean());
    assert_eq!(report.reinitialized, vec![ComponentId::new("ship-mesh")]);
    assert_eq!(f.runtime().components_created, created_before + 1);
    assert_eq!(f.assets.borrow().get(&"tex-hull".into()).unwrap().revision, "2");
    assert!(f.runtime().component(&ship, &"ship-mesh".into()).is_some());
    assert_eq!(f.runtime().component(&dock, &"dock-mesh".into()), Some(&dock_before));

    // the rebuilt mesh is pickable again
    let mesh = f.runtime().component(&ship, &"ship-mesh".into()).unwrap().meshes[0];
    assert_eq!(f.view().pick(mesh), Some(&ship));
    // a cascade never touches the document
    assert_eq!(f.text(), SCENE);
    assert_eq!(f.fs.write_count(), 0);
}

#[tokio::test]
async fn test_unrelated_change_reinitializes_nothing() {
    let mut f = open_scene().await;
    let created_before = f.runtime().components_created;

    let change = AssetChange::new(AssetId::new("sound-gulls"), AssetChangeKind::Modified);
    let report = f.mutator.domain_mut().on_asset_changed(&change).await;

    assert!(report.reinitialized.is_empty());
    assert!(report.is_clean());
    assert_eq!(f.runtime().components_created, created_before);
}

#[tokio::test]
async fn test_failed_component_does_not_block_siblings() {
    // both meshes share the hull material
    let shared = loader()
        .with_asset(asset("mesh-dock", "1", &["mat-hull"]))
        .with_asset(asset("mat-hull", "1", &["tex-hull"]));
    let mut f = open_scene_with(SCENE, shared).await;
    let ship = ObjectId::new("ship");
    let dock = ObjectId::new("dock");

    let mut project = project(f.assets.clone());
    let changes = project.apply_asset_events(&[modified("tex-hull")]).unwrap();
    f.loader.set_failing(&"mesh-ship".into(), true);

    let report = f.mutator.domain_mut().on_asset_changed(&changes[0]).await;

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].component_id, ComponentId::new("ship-mesh"));
    assert_eq!(report.failures[0].object_id, ship);
    assert_eq!(report.reinitialized, vec![ComponentId::new("dock-mesh")]);
    assert!(f.runtime().component(&ship, &"ship-mesh".into()).is_none());
    assert!(f.runtime().component(&dock, &"dock-mesh".into()).is_some());
    assert!(!f.assets.borrow().contains(&"mesh-ship".into()));

    // the dependency stays registered, so the next change retries it
    f.loader.set_failing(&"mesh-ship".into(), false);
    let changes = project.apply_asset_events(&[modified("mesh-ship")]).unwrap();
    let report = f.mutator.domain_mut().on_asset_changed(&changes[0]).await;

    assert!(report.is_clean());
    assert_eq!(report.reinitialized, vec![ComponentId::new("ship-mesh")]);
    assert!(f.runtime().component(&ship, &"ship-mesh".into()).is_some());
}

#[tokio::test]
async fn test_deleted_asset_cascades_and_leaves_component_unbuilt() {
    let mut f = open_scene().await;
    let dock = ObjectId::new("dock");

    let mut project = project(f.assets.clone());
    f.loader.set_failing(&"mesh-dock".into(), true);
    let changes = project
        .apply_asset_events(&[RawAssetEvent::Deleted {
            asset_id: AssetId::new("mesh-dock"),
        }])
        .unwrap();
    assert_eq!(changes[0].kind, AssetChangeKind::Deleted);
    assert!(project.asset(&"mesh-dock".into()).is_none());

    let report = f.mutator.domain_mut().on_asset_changed(&changes[0]).await;

    assert_eq!(report.failures.len(), 1);
    assert!(f.runtime().component(&dock, &"dock-mesh".into()).is_none());
    // the definition is kept; only the runtime instance is gone
    assert!(f.view().model().component(&dock, &"dock-mesh".into()).is_ok());
}

#[tokio::test]
async fn test_material_edit_reaches_scene_through_cache() {
    let mut f = open_scene().await;
    let material_path = "/harbor/materials/hull.pzmat";
    let material = "{\n  \"diffuseColor\": { \"r\": 90, \"g\": 60, \"b\": 40 },\n  \"diffuseTextureAssetId\": \"tex-hull\"\n}\n";

    let fs = Rc::new(MockFileSystem::new().with_file(material_path, material));
    let hasher: Rc<dyn ContentHasher> = Rc::new(Crc32Hasher);
    let mut store = DocumentStore::new(material_path, fs.clone(), hasher.clone());
    let document = store.load_document().await.unwrap();
    let loader: Rc<dyn AssetLoader> = f.loader.clone();
    let view = MaterialEditorView::load(
        AssetId::new("mat-hull"),
        document,
        HeadlessMaterialPreview::new(),
        f.assets.clone(),
        loader,
        hasher.clone(),
    )
    .await
    .unwrap();
    let mut material_mutator = Mutator::new(view, store, MutationIds::new(), MutatorOptions::default());

    material_mutator
        .apply_instantly(DragMaterialPropertyMutation::new(DiffuseColor), Some(Color::new(120, 70, 50)))
        .await
        .unwrap();

    let cached = f.assets.borrow().get(&"mat-hull".into()).unwrap();
    assert_eq!(cached.revision, hasher.hash(material_mutator.domain().document().as_str().as_bytes()));
    assert_eq!(cached.dependencies, vec![AssetId::new("tex-hull")]);

    let dependents = f.assets.borrow().transitive_dependents(&"mat-hull".into());
    assert_eq!(dependents, vec![AssetId::new("mesh-ship")]);
    let change = AssetChange::new(AssetId::new("mat-hull"), AssetChangeKind::Modified).with_dependents(dependents);
    let report = f.mutator.domain_mut().on_asset_changed(&change).await;

    assert_eq!(report.reinitialized, vec![ComponentId::new("ship-mesh")]);
    assert_eq!(
        fs.contents(std::path::Path::new(material_path)).as_deref(),
        Some(material_mutator.domain().document().as_str())
    );
}
