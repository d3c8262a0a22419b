//! Multi-step editing sessions on the harbor scene: hierarchy moves,
//! component edits, and undo/redo over whole sequences.

mod common;

use common::{open_scene, SceneFixture, SCENE};
use composer_editor::scene::mutations::{
    AddComponentMutation, CreateBlankObjectMutation, DeleteObjectMutation, RemoveComponentMutation,
    SetLightColorMutation, SetLightIntensityMutation, SetMeshComponentAssetMutation, SetObjectNameMutation,
    SetObjectParentMutation, SetTransformFieldMutation, SiblingPosition,
};
use composer_editor::scene::{ComponentDefinition, HeadlessRuntime, MeshComponent, SceneRuntime, SceneView};
use composer_editor::{
    AssetId, Color, ComponentId, EditorError, MutationController, MutationError, ObjectId, SurfaceId, Vector3,
};
use composer_jsonc::JsonPath;

fn path(text: &str) -> JsonPath {
    text.parse().unwrap()
}

fn children(f: &SceneFixture, parent: Option<&str>) -> Vec<String> {
    let parent = parent.map(ObjectId::new);
    f.view()
        .model()
        .children_of(parent.as_ref())
        .unwrap()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect()
}

fn move_object(object: &str, parent: Option<&str>, position: SiblingPosition) -> SetObjectParentMutation {
    SetObjectParentMutation {
        object_id: object.into(),
        parent: parent.map(ObjectId::new),
        position,
    }
}

fn light_intensity(f: &SceneFixture) -> f32 {
    f.runtime()
        .component(&"sun".into(), &"sun-light".into())
        .and_then(|component| component.definition.light())
        .map(|light| light.intensity)
        .unwrap()
}

#[tokio::test]
async fn test_reparent_keeps_world_position() {
    let mut f = open_scene().await;
    let ship = ObjectId::new("ship");

    f.mutator
        .apply(move_object("ship", Some("sun"), SiblingPosition::Last))
        .await
        .unwrap();

    assert_eq!(children(&f, Some("sun")), vec!["ship"]);
    assert_eq!(children(&f, Some("harbor")), vec!["dock"]);
    let runtime_ship = f.runtime().object(&ship).unwrap();
    assert_eq!(runtime_ship.parent, Some(ObjectId::new("sun")));
    // sun sits at y = 10, so the local offset compensates
    assert_eq!(runtime_ship.transform.position, Vector3::new(4.0, -10.0, 0.0));
    assert_eq!(
        f.view().model().object(&ship).unwrap().transform.position,
        Vector3::new(4.0, -10.0, 0.0)
    );
    assert_eq!(
        f.view().document().value_at(&path("objects[1].children[0].id")),
        Some(serde_json::json!("ship"))
    );
    assert_eq!(f.on_disk(), f.text());

    f.mutator.undo().await.unwrap();
    assert_eq!(f.text(), SCENE);
    assert_eq!(children(&f, Some("harbor")), vec!["ship", "dock"]);
    let runtime_ship = f.runtime().object(&ship).unwrap();
    assert_eq!(runtime_ship.parent, Some(ObjectId::new("harbor")));
    assert_eq!(runtime_ship.transform.position, Vector3::new(4.0, 0.0, 0.0));
}

#[tokio::test]
async fn test_reorder_siblings() {
    let mut f = open_scene().await;

    f.mutator
        .apply(move_object("dock", Some("harbor"), SiblingPosition::Before("ship".into())))
        .await
        .unwrap();
    assert_eq!(children(&f, Some("harbor")), vec!["dock", "ship"]);
    assert_eq!(
        f.runtime().object(&"harbor".into()).unwrap().children,
        vec![ObjectId::new("dock"), ObjectId::new("ship")]
    );
    assert_eq!(
        f.view().document().value_at(&path("objects[0].children[0].id")),
        Some(serde_json::json!("dock"))
    );

    f.mutator
        .apply(move_object("harbor", None, SiblingPosition::After("sun".into())))
        .await
        .unwrap();
    assert_eq!(children(&f, None), vec!["sun", "harbor"]);
    assert_eq!(f.runtime().roots(), &[ObjectId::new("sun"), ObjectId::new("harbor")]);

    f.mutator.undo().await.unwrap();
    f.mutator.undo().await.unwrap();
    assert_eq!(f.text(), SCENE);
    assert_eq!(children(&f, None), vec!["harbor", "sun"]);
}

#[tokio::test]
async fn test_invalid_moves_are_rejected_untouched() {
    let mut f = open_scene().await;

    let err = f
        .mutator
        .apply(move_object("harbor", Some("ship"), SiblingPosition::Last))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::CycleDetected { .. })));

    let err = f
        .mutator
        .apply(move_object("ship", Some("ship"), SiblingPosition::Last))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::CycleDetected { .. })));

    let err = f
        .mutator
        .apply(move_object("ship", Some("harbor"), SiblingPosition::Before("sun".into())))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::InvalidSibling(_))));

    let err = f
        .mutator
        .apply(move_object("ghost", None, SiblingPosition::Last))
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::ObjectNotFound(_))));

    assert_eq!(f.text(), SCENE);
    assert!(!f.mutator.history().can_undo());
    assert_eq!(f.fs.write_count(), 0);
}

#[tokio::test]
async fn test_delete_subtree_and_undo() {
    let mut f = open_scene().await;
    let created_before = f.runtime().components_created;

    f.mutator
        .apply(DeleteObjectMutation { object_id: "harbor".into() })
        .await
        .unwrap();

    assert_eq!(f.runtime().object_count(), 1);
    assert!(f.runtime().object(&"ship".into()).is_none());
    assert!(f.view().selection().is_empty());
    assert_eq!(f.view().dependencies().len(), 1);
    assert!(!f.text().contains("\"harbor\""));
    assert!(f.text().contains("// Harbor at dusk"));

    f.mutator.undo().await.unwrap();
    assert_eq!(f.text(), SCENE);
    assert_eq!(f.runtime().object_count(), 4);
    assert_eq!(f.runtime().components_created, created_before + 2);
    assert_eq!(f.view().selection().len(), 2);
    assert_eq!(f.view().dependencies().len(), 3);
    assert_eq!(children(&f, Some("harbor")), vec!["ship", "dock"]);
}

#[tokio::test]
async fn test_add_and_remove_components() {
    let mut f = open_scene().await;
    let sun = ObjectId::new("sun");
    let lamp = ComponentDefinition::Mesh(MeshComponent {
        id: "sun-mesh".into(),
        mesh_file_id: Some(AssetId::new("mesh-dock")),
    });

    f.mutator
        .apply(AddComponentMutation {
            object_id: sun.clone(),
            definition: lamp.clone(),
        })
        .await
        .unwrap();
    assert!(f.runtime().component(&sun, &"sun-mesh".into()).is_some());
    assert_eq!(f.view().selection().len(), 3);
    let written: ComponentDefinition = serde_json::from_value(
        f.view()
            .document()
            .value_at(&path("objects[1].components[1]"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(written, lamp);

    let err = f
        .mutator
        .apply(AddComponentMutation {
            object_id: sun.clone(),
            definition: lamp.clone(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::DuplicateComponent(_))));

    f.mutator
        .apply(RemoveComponentMutation {
            object_id: "ship".into(),
            component_id: "ship-mesh".into(),
        })
        .await
        .unwrap();
    assert!(f.runtime().component(&"ship".into(), &"ship-mesh".into()).is_none());
    assert!(f.view().dependencies().dependencies_of(&"ship-mesh".into()).is_none());
    assert_eq!(
        f.view()
            .document()
            .value_at(&path("objects[0].children[0].components")),
        Some(serde_json::json!([]))
    );

    f.mutator.undo().await.unwrap();
    f.mutator.undo().await.unwrap();
    assert_eq!(f.text(), SCENE);
    assert!(f.runtime().component(&"ship".into(), &"ship-mesh".into()).is_some());
    assert!(f.runtime().component(&sun, &"sun-mesh".into()).is_none());
}

#[tokio::test]
async fn test_swap_mesh_asset() {
    let mut f = open_scene().await;
    let ship = ObjectId::new("ship");
    let mesh = ComponentId::new("ship-mesh");
    let field = path("objects[0].children[0].components[0].meshFileId");

    f.mutator
        .apply(SetMeshComponentAssetMutation {
            object_id: ship.clone(),
            component_id: mesh.clone(),
            asset_id: Some("mesh-dock".into()),
        })
        .await
        .unwrap();
    assert_eq!(f.view().document().value_at(&field), Some(serde_json::json!("mesh-dock")));
    let dependency = f.view().dependencies().dependencies_of(&mesh).unwrap();
    assert!(dependency.asset_ids.contains(&AssetId::new("mesh-dock")));
    assert!(!dependency.asset_ids.contains(&AssetId::new("mesh-ship")));

    f.mutator
        .apply(SetMeshComponentAssetMutation {
            object_id: ship.clone(),
            component_id: mesh.clone(),
            asset_id: None,
        })
        .await
        .unwrap();
    assert!(!f.view().document().contains(&field));
    assert!(f.runtime().component(&ship, &mesh).unwrap().meshes.is_empty());

    let err = f
        .mutator
        .apply(SetMeshComponentAssetMutation {
            object_id: "sun".into(),
            component_id: "sun-light".into(),
            asset_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EditorError::Mutation(MutationError::ComponentTypeMismatch { .. })
    ));

    f.mutator.undo().await.unwrap();
    f.mutator.undo().await.unwrap();
    assert_eq!(f.text(), SCENE);
    assert_eq!(f.runtime().component(&ship, &mesh).unwrap().meshes.len(), 1);
}

#[tokio::test]
async fn test_light_edits_and_rejected_intensity() {
    let mut f = open_scene().await;
    let light = || SetLightIntensityMutation {
        object_id: "sun".into(),
        component_id: "sun-light".into(),
    };

    let handle = f.mutator.begin_continuous(light()).unwrap();
    f.mutator.update_continuous(&handle, 2.0).unwrap();
    let err = f.mutator.update_continuous(&handle, -1.0).unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
    // last good value is back and the gesture continues
    assert_eq!(light_intensity(&f), 2.0);
    f.mutator.update_continuous(&handle, 3.0).unwrap();
    f.mutator.apply_continuous(handle).await.unwrap();
    assert_eq!(light_intensity(&f), 3.0);
    assert_eq!(
        f.view()
            .document()
            .value_at(&path("objects[1].components[0].intensity")),
        Some(serde_json::json!(3.0))
    );

    f.mutator
        .apply_instantly(
            SetLightColorMutation {
                object_id: "sun".into(),
                component_id: "sun-light".into(),
            },
            Color::new(255, 120, 80),
        )
        .await
        .unwrap();
    let color = f
        .runtime()
        .component(&"sun".into(), &"sun-light".into())
        .and_then(|component| component.definition.light())
        .map(|light| light.color);
    assert_eq!(color, Some(Color::new(255, 120, 80)));

    let err = f
        .mutator
        .apply_instantly(light(), f32::NAN)
        .await
        .unwrap_err();
    assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
    assert!(f.mutator.pending_continuous().is_none());
    assert_eq!(f.mutator.history().undo_levels(), 2);
}

#[tokio::test]
async fn test_undo_all_then_redo_all() {
    let mut f = open_scene().await;
    let buoy = CreateBlankObjectMutation::new(Some("harbor".into())).with_name("Buoy");
    let buoy_id = buoy.object_id.clone();

    f.mutator.apply(buoy).await.unwrap();
    f.mutator
        .apply_instantly(SetTransformFieldMutation::position(buoy_id.clone()), Vector3::new(1.0, 0.0, 6.0))
        .await
        .unwrap();
    f.mutator
        .apply(move_object("dock", Some("sun"), SiblingPosition::Last))
        .await
        .unwrap();
    f.mutator
        .apply_instantly(SetObjectNameMutation { object_id: "ship".into() }, "Ferry".to_string())
        .await
        .unwrap();
    f.mutator
        .apply(DeleteObjectMutation { object_id: buoy_id.clone() })
        .await
        .unwrap();
    let edited = f.text().to_string();
    assert_eq!(f.mutator.history().undo_levels(), 5);

    while f.mutator.undo().await.unwrap() {}
    assert_eq!(f.text(), SCENE);
    assert_eq!(f.on_disk(), SCENE);
    assert_eq!(f.runtime().object_count(), 4);
    assert!(f.runtime().object(&buoy_id).is_none());

    while f.mutator.redo().await.unwrap() {}
    assert_eq!(f.text(), edited);
    assert_eq!(f.on_disk(), edited);
    assert_eq!(f.runtime().object(&"ship".into()).unwrap().name, "Ferry");
    assert_eq!(f.runtime().object(&"dock".into()).unwrap().parent, Some(ObjectId::new("sun")));
    assert!(f.runtime().object(&buoy_id).is_none());
}

#[tokio::test]
async fn test_new_edit_clears_redo() {
    let mut f = open_scene().await;

    f.mutator
        .apply_instantly(SetObjectNameMutation { object_id: "ship".into() }, "Ferry".to_string())
        .await
        .unwrap();
    f.mutator.undo().await.unwrap();
    assert!(f.mutator.history().can_redo());

    f.mutator
        .apply_instantly(SetObjectNameMutation { object_id: "dock".into() }, "Quay".to_string())
        .await
        .unwrap();
    assert!(!f.mutator.history().can_redo());
    assert!(!f.mutator.redo().await.unwrap());
    assert!(f.text().contains("\"Ship\""));
}

#[tokio::test]
async fn test_controller_routes_undo_to_active_surface() {
    type Scene = SceneView<HeadlessRuntime>;
    let mut controller = MutationController::new();
    let left = SurfaceId::new("left");
    let right = SurfaceId::new("right");

    let SceneFixture { mutator: mut first, .. } = open_scene().await;
    let SceneFixture { mutator: mut second, .. } = open_scene().await;
    first
        .apply_instantly(SetObjectNameMutation { object_id: "ship".into() }, "Left".to_string())
        .await
        .unwrap();
    second
        .apply_instantly(SetObjectNameMutation { object_id: "ship".into() }, "Right".to_string())
        .await
        .unwrap();
    controller.register(left.clone(), first).unwrap();
    controller.register(right.clone(), second).unwrap();

    // nothing focused
    assert!(!controller.undo().await.unwrap());

    controller.set_mutator_active(&left, true).unwrap();
    assert!(controller.undo().await.unwrap());

    let text = |controller: &MutationController, surface: &SurfaceId| {
        controller
            .mutator::<Scene>(surface)
            .unwrap()
            .domain()
            .document()
            .as_str()
            .to_string()
    };
    assert_eq!(text(&controller, &left), SCENE);
    assert!(text(&controller, &right).contains("\"Right\""));

    controller.set_mutator_active(&right, true).unwrap();
    assert_eq!(controller.active(), Some(&right));
    assert!(controller.undo().await.unwrap());
    assert_eq!(text(&controller, &right), SCENE);

    assert!(controller.deregister(&right).is_some());
    assert_eq!(controller.active(), None);
    assert!(!controller.is_registered(&right));
}
