use composer_jsonc::DocumentError;
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::info;

use crate::assets::AssetType;
use crate::ids::{AssetId, ComponentId, ObjectId};
use crate::mutation_trait::{Mutation, MutationError, MutationResult, OneShotMutation};
use crate::project::{insert_element, AssetDefinition, ProjectDomain, ProjectFiles, SceneManifest};
use crate::scene::definition::{
    CameraComponent, ComponentDefinition, GameObjectDefinition, LightComponent, SceneConfig, SceneDefinition,
};
use crate::values::{Color, Vector3};

/// Change the path recorded for an asset in the project file
#[derive(Debug, Clone)]
pub struct MoveAssetMutation {
    pub asset_id: AssetId,
    pub new_path: String,
}

impl MoveAssetMutation {
    pub fn new(asset_id: AssetId, new_path: impl Into<String>) -> Self {
        Self {
            asset_id,
            new_path: new_path.into(),
        }
    }
}

impl Mutation<ProjectDomain> for MoveAssetMutation {
    type Args = String;

    fn description(&self) -> String {
        format!("Rename asset {}", self.asset_id)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<String> {
        if self.new_path.trim().is_empty() {
            return Err(MutationError::Precondition("asset path cannot be empty".to_string()));
        }
        project
            .asset(&self.asset_id)
            .map(|asset| asset.path.clone())
            .ok_or_else(|| MutationError::AssetNotFound(self.asset_id.clone()))
    }

    fn update(&self, project: &mut ProjectDomain, args: &String) -> MutationResult<()> {
        project.asset_mut(&self.asset_id)?.path = args.clone();
        Ok(())
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        let path = project
            .asset_path(&self.asset_id)
            .ok_or_else(|| MutationError::AssetNotFound(self.asset_id.clone()))?;
        let value = project
            .asset(&self.asset_id)
            .map(|asset| asset.path.clone())
            .ok_or_else(|| MutationError::AssetNotFound(self.asset_id.clone()))?;
        project.document.set(&path.key("path"), &value)?;
        Ok(())
    }
}

impl OneShotMutation<ProjectDomain> for MoveAssetMutation {
    fn args(&self) -> String {
        self.new_path.clone()
    }
}

/// Bring a project file in line with the project: written when `contents`
/// is given and the file is missing, removed when `contents` is `None` and
/// the file exists
async fn sync_file(files: &ProjectFiles, relative: &str, contents: Option<&str>) -> MutationResult<()> {
    let path = files.resolve(relative);
    let result = match contents {
        Some(contents) if !files.fs.exists(&path) => {
            info!("[Project] creating {}", path.display());
            files.fs.write(&path, contents.as_bytes()).await
        }
        None if files.fs.exists(&path) => {
            info!("[Project] removing {}", path.display());
            files.fs.remove(&path).await
        }
        _ => return Ok(()),
    };
    result.map_err(|source| MutationError::File { path, source })
}

fn check_new_path(path: &str, taken: bool) -> MutationResult<()> {
    if path.trim().is_empty() {
        return Err(MutationError::Precondition("path cannot be empty".to_string()));
    }
    if taken {
        return Err(MutationError::Precondition(format!("{path} is already in the project")));
    }
    Ok(())
}

/// Create an empty material file and list it in the project.
///
/// Args are whether the material is listed; undo unlists it and removes
/// the file again.
#[derive(Debug, Clone)]
pub struct CreateNewMaterialAssetMutation {
    pub asset_id: AssetId,
    pub path: String,
    pub contents: String,
}

impl CreateNewMaterialAssetMutation {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            asset_id: AssetId::generate(),
            path: path.into(),
            contents: "{}\n".to_string(),
        }
    }
}

impl Mutation<ProjectDomain> for CreateNewMaterialAssetMutation {
    type Args = bool;

    fn description(&self) -> String {
        format!("Create material {}", self.path)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<bool> {
        let listed = project.asset(&self.asset_id).is_some();
        if !listed {
            let taken = project.model.assets.iter().any(|asset| asset.path == self.path);
            check_new_path(&self.path, taken)?;
        }
        Ok(listed)
    }

    fn update(&self, project: &mut ProjectDomain, listed: &bool) -> MutationResult<()> {
        let present = project.asset(&self.asset_id).is_some();
        if *listed && !present {
            let hash = project.files()?.hasher.hash(self.contents.as_bytes());
            project.model.assets.push(AssetDefinition {
                id: self.asset_id.clone(),
                path: self.path.clone(),
                asset_type: AssetType::Material,
                hash: Some(hash),
                material_overrides: Default::default(),
            });
        } else if !*listed {
            project.model.assets.retain(|asset| asset.id != self.asset_id);
        }
        Ok(())
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        let written = project.asset_path(&self.asset_id);
        let position = project.model.assets.iter().position(|asset| asset.id == self.asset_id);
        match (position, written) {
            (Some(index), None) => {
                let definition = project.model.assets[index].clone();
                insert_element(&mut project.document, "assets", index, &definition)?;
            }
            (None, Some(path)) => project.document.delete(&path)?,
            _ => {}
        }
        Ok(())
    }

    fn after_persist<'a>(&'a self, project: &'a mut ProjectDomain) -> LocalBoxFuture<'a, MutationResult<()>> {
        async move {
            let listed = project.asset(&self.asset_id).is_some();
            sync_file(project.files()?, &self.path, listed.then_some(self.contents.as_str())).await
        }
        .boxed_local()
    }
}

impl OneShotMutation<ProjectDomain> for CreateNewMaterialAssetMutation {
    fn args(&self) -> bool {
        true
    }
}

/// Create a scene file with a camera and a light, and list it in the
/// project. Args are whether the scene is listed.
#[derive(Debug, Clone)]
pub struct CreateNewSceneMutation {
    pub scene_id: String,
    pub path: String,
    pub contents: String,
}

impl CreateNewSceneMutation {
    pub fn new(path: impl Into<String>) -> MutationResult<Self> {
        let contents = serde_json::to_string_pretty(&starter_scene())
            .map_err(|err| MutationError::Document(DocumentError::Serialize(err)))?;
        Ok(Self {
            scene_id: uuid::Uuid::new_v4().to_string(),
            path: path.into(),
            contents: contents + "\n",
        })
    }
}

/// What a new scene starts with: a camera looking at the origin and a sun
fn starter_scene() -> SceneDefinition {
    let mut camera = GameObjectDefinition::new(ObjectId::generate(), "Main camera");
    camera.transform.position = Vector3::new(0.0, 0.0, -5.0);
    camera
        .components
        .push(ComponentDefinition::Camera(CameraComponent { id: ComponentId::generate() }));

    let mut sun = GameObjectDefinition::new(ObjectId::generate(), "Sun");
    sun.transform.position = Vector3::new(0.0, 10.0, 0.0);
    sun.components.push(ComponentDefinition::DirectionalLight(LightComponent {
        id: ComponentId::generate(),
        intensity: 1.0,
        color: Color::WHITE,
    }));

    SceneDefinition {
        config: SceneConfig {
            clear_color: Color::new(255, 235, 245),
            ambient_light: Color::WHITE,
        },
        objects: vec![camera, sun],
    }
}

impl Mutation<ProjectDomain> for CreateNewSceneMutation {
    type Args = bool;

    fn description(&self) -> String {
        format!("Create scene {}", self.path)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<bool> {
        let listed = project.scene(&self.scene_id).is_some();
        if !listed {
            check_new_path(&self.path, project.scene_by_path(&self.path).is_some())?;
        }
        Ok(listed)
    }

    fn update(&self, project: &mut ProjectDomain, listed: &bool) -> MutationResult<()> {
        let present = project.scene(&self.scene_id).is_some();
        if *listed && !present {
            let hash = project.files()?.hasher.hash(self.contents.as_bytes());
            project.model.scenes.push(SceneManifest {
                id: self.scene_id.clone(),
                path: self.path.clone(),
                hash: Some(hash),
            });
        } else if !*listed {
            project.model.scenes.retain(|scene| scene.id != self.scene_id);
        }
        Ok(())
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        let written = project.scene_path(&self.scene_id);
        let position = project.model.scenes.iter().position(|scene| scene.id == self.scene_id);
        match (position, written) {
            (Some(index), None) => {
                let manifest = project.model.scenes[index].clone();
                insert_element(&mut project.document, "scenes", index, &manifest)?;
            }
            (None, Some(path)) => project.document.delete(&path)?,
            _ => {}
        }
        Ok(())
    }

    fn after_persist<'a>(&'a self, project: &'a mut ProjectDomain) -> LocalBoxFuture<'a, MutationResult<()>> {
        async move {
            let listed = project.scene(&self.scene_id).is_some();
            sync_file(project.files()?, &self.path, listed.then_some(self.contents.as_str())).await
        }
        .boxed_local()
    }
}

impl OneShotMutation<ProjectDomain> for CreateNewSceneMutation {
    fn args(&self) -> bool {
        true
    }
}

/// Move a scene to another path, file included
#[derive(Debug, Clone)]
pub struct MoveSceneMutation {
    pub scene_id: String,
    pub new_path: String,
}

impl MoveSceneMutation {
    pub fn new(scene_id: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self {
            scene_id: scene_id.into(),
            new_path: new_path.into(),
        }
    }
}

impl Mutation<ProjectDomain> for MoveSceneMutation {
    type Args = String;

    fn description(&self) -> String {
        format!("Move scene to {}", self.new_path)
    }

    fn capture_undo_args(&self, project: &ProjectDomain) -> MutationResult<String> {
        let scene = project
            .scene(&self.scene_id)
            .ok_or_else(|| MutationError::Precondition(format!("No scene exists with Id '{}'", self.scene_id)))?;
        let taken = project
            .scene_by_path(&self.new_path)
            .is_some_and(|other| other.id != self.scene_id);
        check_new_path(&self.new_path, taken)?;
        Ok(scene.path.clone())
    }

    fn update(&self, project: &mut ProjectDomain, path: &String) -> MutationResult<()> {
        let scene = project.scene_mut(&self.scene_id)?;
        let previous = std::mem::replace(&mut scene.path, path.clone());
        project.scene_files.entry(self.scene_id.clone()).or_insert(previous);
        Ok(())
    }

    fn write_document(&self, project: &mut ProjectDomain) -> MutationResult<()> {
        let path = project
            .scene_path(&self.scene_id)
            .ok_or_else(|| MutationError::Precondition(format!("No scene exists with Id '{}'", self.scene_id)))?;
        let value = project.scene_mut(&self.scene_id)?.path.clone();
        project.document.set(&path.key("path"), &value)?;
        Ok(())
    }

    fn after_persist<'a>(&'a self, project: &'a mut ProjectDomain) -> LocalBoxFuture<'a, MutationResult<()>> {
        async move {
            let Some(on_disk) = project.scene_files.get(&self.scene_id).cloned() else {
                return Ok(());
            };
            let recorded = project.scene_mut(&self.scene_id)?.path.clone();
            if on_disk != recorded {
                move_file(project.files()?, &on_disk, &recorded).await?;
            }
            project.scene_files.remove(&self.scene_id);
            Ok(())
        }
        .boxed_local()
    }
}

impl OneShotMutation<ProjectDomain> for MoveSceneMutation {
    fn args(&self) -> String {
        self.new_path.clone()
    }
}

async fn move_file(files: &ProjectFiles, from: &str, to: &str) -> MutationResult<()> {
    let (from, to) = (files.resolve(from), files.resolve(to));
    let contents = match files.fs.read(&from).await {
        Ok(contents) => contents,
        // Already moved
        Err(_) if files.fs.exists(&to) => return Ok(()),
        Err(source) => return Err(MutationError::File { path: from, source }),
    };
    info!("[Project] moving {} to {}", from.display(), to.display());
    files
        .fs
        .write(&to, &contents)
        .await
        .map_err(|source| MutationError::File { path: to.clone(), source })?;
    files
        .fs
        .remove(&from)
        .await
        .map_err(|source| MutationError::File { path: from, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCache;
    use crate::document::DocumentStore;
    use crate::errors::EditorError;
    use crate::ids::MutationIds;
    use crate::mutator::{Mutator, MutatorOptions};
    use crate::project::ProjectDefinition;
    use composer_common::{ContentHasher, Crc32Hasher, FileSystem, MockFileSystem};
    use std::path::Path;
    use std::rc::Rc;

    const PROJECT: &str = "{\n  \"assets\": [\n    { \"id\": \"tex\", \"path\": \"a.png\", \"type\": \"texture\" } // hull\n  ]\n}\n";

    async fn mutator() -> Mutator<ProjectDomain> {
        let fs = Rc::new(MockFileSystem::new().with_file("/project.json", PROJECT));
        let mut store = DocumentStore::new("/project.json", fs, Rc::new(Crc32Hasher));
        let document = store.load_document().await.unwrap();
        let domain = ProjectDomain::load(document, AssetCache::shared()).unwrap();
        Mutator::new(domain, store, MutationIds::new(), MutatorOptions::default())
    }

    #[tokio::test]
    async fn test_move_asset_and_undo() {
        let mut mutator = mutator().await;

        mutator
            .apply(MoveAssetMutation::new(AssetId::new("tex"), "textures/a.png"))
            .await
            .unwrap();
        assert_eq!(mutator.domain().asset(&AssetId::new("tex")).unwrap().path, "textures/a.png");
        assert!(mutator.domain().document().as_str().contains("\"textures/a.png\" } // hull"));

        mutator.undo().await.unwrap();
        assert_eq!(mutator.domain().asset(&AssetId::new("tex")).unwrap().path, "a.png");
        assert_eq!(mutator.domain().document().as_str(), PROJECT);
    }

    #[tokio::test]
    async fn test_rejects_empty_path_and_unknown_asset() {
        let mut mutator = mutator().await;

        let err = mutator
            .apply(MoveAssetMutation::new(AssetId::new("tex"), "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));

        let err = mutator
            .apply(MoveAssetMutation::new(AssetId::new("nope"), "b.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::AssetNotFound(_))));
        assert!(!mutator.history().can_undo());
    }

    const FILED_PROJECT: &str = r#"{
  "assets": [
    { "id": "tex", "path": "textures/hull.png", "type": "texture" }
  ],
  "scenes": [
    { "id": "main", "path": "scenes/main.pzscene" } // start here
  ]
}
"#;

    async fn filed_mutator() -> (Mutator<ProjectDomain>, Rc<MockFileSystem>) {
        let fs = Rc::new(
            MockFileSystem::new()
                .with_file("/proj/project.json", FILED_PROJECT)
                .with_file("/proj/scenes/main.pzscene", "{}"),
        );
        let mut store = DocumentStore::new("/proj/project.json", fs.clone(), Rc::new(Crc32Hasher));
        let document = store.load_document().await.unwrap();
        let domain = ProjectDomain::load(document, AssetCache::shared())
            .unwrap()
            .with_files(ProjectFiles::new(fs.clone(), "/proj", Rc::new(Crc32Hasher)));
        (Mutator::new(domain, store, MutationIds::new(), MutatorOptions::default()), fs)
    }

    #[tokio::test]
    async fn test_create_material_lists_and_writes_file() {
        let (mut mutator, fs) = filed_mutator().await;
        let create = CreateNewMaterialAssetMutation::new("materials/paint.pzmat");
        let asset_id = create.asset_id.clone();
        let file = Path::new("/proj/materials/paint.pzmat");

        mutator.apply(create).await.unwrap();
        let asset = mutator.domain().asset(&asset_id).unwrap();
        assert_eq!(asset.asset_type, AssetType::Material);
        assert_eq!(asset.hash, Some(Crc32Hasher.hash(b"{}\n")));
        assert_eq!(fs.contents(file).as_deref(), Some("{}\n"));
        let reparsed: ProjectDefinition = mutator.domain().document().value().unwrap();
        assert_eq!(reparsed, *mutator.domain().model());

        mutator.undo().await.unwrap();
        assert!(mutator.domain().asset(&asset_id).is_none());
        assert!(!fs.exists(file));
        assert_eq!(mutator.domain().document().as_str(), FILED_PROJECT);

        mutator.redo().await.unwrap();
        assert!(fs.exists(file));
        assert!(mutator.domain().asset(&asset_id).is_some());
    }

    #[tokio::test]
    async fn test_create_needs_files_and_a_free_path() {
        let mut mutator = mutator().await;
        let err = mutator
            .apply(CreateNewMaterialAssetMutation::new("materials/paint.pzmat"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
        assert_eq!(mutator.domain().model().assets.len(), 1);

        let (mut mutator, _) = filed_mutator().await;
        let err = mutator
            .apply(CreateNewMaterialAssetMutation::new("textures/hull.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
        let err = mutator
            .apply(CreateNewSceneMutation::new("scenes/main.pzscene").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
        assert!(!mutator.history().can_undo());
    }

    #[tokio::test]
    async fn test_create_scene_writes_starter_content() {
        let (mut mutator, fs) = filed_mutator().await;
        let create = CreateNewSceneMutation::new("scenes/dock.pzscene").unwrap();
        let scene_id = create.scene_id.clone();

        mutator.apply(create).await.unwrap();
        let manifest = mutator.domain().scene(&scene_id).unwrap();
        assert_eq!(manifest.path, "scenes/dock.pzscene");
        assert!(mutator.domain().document().as_str().contains("// start here"));

        let written = fs.contents(Path::new("/proj/scenes/dock.pzscene")).unwrap();
        assert_eq!(manifest.hash, Some(Crc32Hasher.hash(written.as_bytes())));
        let scene: SceneDefinition = serde_json::from_str(&written).unwrap();
        let names: Vec<_> = scene.objects.iter().map(|object| object.name.as_str()).collect();
        assert_eq!(names, ["Main camera", "Sun"]);
        assert!(matches!(scene.objects[1].components[0], ComponentDefinition::DirectionalLight(_)));

        mutator.undo().await.unwrap();
        assert!(mutator.domain().scene(&scene_id).is_none());
        assert!(!fs.exists(Path::new("/proj/scenes/dock.pzscene")));
    }

    #[tokio::test]
    async fn test_move_scene_moves_its_file() {
        let (mut mutator, fs) = filed_mutator().await;
        let (old, new) = (Path::new("/proj/scenes/main.pzscene"), Path::new("/proj/levels/harbor.pzscene"));

        mutator
            .apply(MoveSceneMutation::new("main", "levels/harbor.pzscene"))
            .await
            .unwrap();
        assert_eq!(mutator.domain().scene("main").unwrap().path, "levels/harbor.pzscene");
        assert!(mutator
            .domain()
            .document()
            .as_str()
            .contains(r#""path": "levels/harbor.pzscene" } // start here"#));
        assert_eq!(fs.contents(new).as_deref(), Some("{}"));
        assert!(!fs.exists(old));

        mutator.undo().await.unwrap();
        assert_eq!(mutator.domain().document().as_str(), FILED_PROJECT);
        assert!(fs.exists(old));
        assert!(!fs.exists(new));

        let err = mutator
            .apply(MoveSceneMutation::new("side", "levels/side.pzscene"))
            .await
            .unwrap_err();
        assert!(matches!(err, EditorError::Mutation(MutationError::Precondition(_))));
    }
}
