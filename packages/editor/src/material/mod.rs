//! # Material editor
//!
//! One open material asset. The preview shows the material live while it is
//! edited; once a change is persisted the material's runtime form is
//! recomputed and stored in the shared asset cache, so scenes built from it
//! afterwards pick up the new state. With a project attached, the project
//! file's recorded hash for the material follows every persisted edit.
//!
//! Fields can be switched off without losing their value (see
//! [`MaterialState`]); the document only ever holds the enabled ones.

mod definition;
mod mutations;
pub mod property;

pub use definition::{
    CubeFace, MaterialDefinition, MaterialState, MaterialToggle, MaterialToggles, ReflectionDefinition,
    ReflectionLayout, ReflectionTextureSlot,
};
pub use mutations::{DragMaterialPropertyMutation, SetMaterialPropertyMutation};

use std::rc::Rc;

use composer_common::ContentHasher;
use composer_jsonc::{JsonPath, JsoncDocument};
use futures::future::{FutureExt, LocalBoxFuture};
use tracing::{debug, warn};

use crate::assets::{get_or_load, AssetChange, AssetLoader, LoadedAsset, SharedAssetCache};
use crate::document::{reconcile, MutationDomain};
use crate::errors::{EditorError, EditorResult, RuntimeResult};
use crate::ids::AssetId;
use crate::mutation_trait::{MutationError, MutationResult};
use crate::project::SharedProject;
use crate::values::Color;

/// Reflection ready to render: every texture of its layout loaded
#[derive(Debug, Clone)]
pub struct ReflectionPreview {
    pub layout: ReflectionLayout,
    pub strength: f32,
    pub textures: Vec<Rc<LoadedAsset>>,
}

/// Live rendering of the material being edited
pub trait MaterialPreview: 'static {
    fn set_diffuse_color(&mut self, color: Option<Color>) -> RuntimeResult<()>;

    fn set_emission_color(&mut self, color: Option<Color>) -> RuntimeResult<()>;

    fn set_diffuse_texture(&mut self, texture: Option<Rc<LoadedAsset>>) -> RuntimeResult<()>;

    fn set_reflection(&mut self, reflection: Option<ReflectionPreview>) -> RuntimeResult<()>;

    /// Change the strength of the reflection already shown
    fn set_reflection_strength(&mut self, strength: f32) -> RuntimeResult<()>;
}

#[derive(Debug, Default)]
pub struct HeadlessMaterialPreview {
    pub diffuse_color: Option<Color>,
    pub emission_color: Option<Color>,
    pub diffuse_texture: Option<Rc<LoadedAsset>>,
    pub reflection: Option<ReflectionPreview>,
}

impl HeadlessMaterialPreview {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaterialPreview for HeadlessMaterialPreview {
    fn set_diffuse_color(&mut self, color: Option<Color>) -> RuntimeResult<()> {
        self.diffuse_color = color;
        Ok(())
    }

    fn set_emission_color(&mut self, color: Option<Color>) -> RuntimeResult<()> {
        self.emission_color = color;
        Ok(())
    }

    fn set_diffuse_texture(&mut self, texture: Option<Rc<LoadedAsset>>) -> RuntimeResult<()> {
        self.diffuse_texture = texture;
        Ok(())
    }

    fn set_reflection(&mut self, reflection: Option<ReflectionPreview>) -> RuntimeResult<()> {
        self.reflection = reflection;
        Ok(())
    }

    fn set_reflection_strength(&mut self, strength: f32) -> RuntimeResult<()> {
        if let Some(reflection) = &mut self.reflection {
            reflection.strength = strength;
        }
        Ok(())
    }
}

/// Layout and complete texture set: what a reflection needs reloading for
type ReflectionKey = Option<(ReflectionLayout, Option<Vec<AssetId>>)>;

fn reflection_key(definition: &MaterialDefinition) -> ReflectionKey {
    definition
        .reflection
        .as_ref()
        .map(|reflection| (reflection.layout, reflection.complete_textures()))
}

pub struct MaterialEditorView<P: MaterialPreview> {
    asset_id: AssetId,
    pub(crate) document: JsoncDocument,
    pub(crate) state: MaterialState,
    pub(crate) preview: P,
    assets: SharedAssetCache,
    loader: Rc<dyn AssetLoader>,
    hasher: Rc<dyn ContentHasher>,
    project: Option<SharedProject>,
    /// Changes reported by the project while recording this material's hash
    asset_changes: Vec<AssetChange>,
    /// Effective definition last pushed to the preview
    shown: MaterialDefinition,
    /// Textures changed in the model but not yet loaded into the preview
    texture_dirty: bool,
    reflection_dirty: bool,
}

impl<P: MaterialPreview> MaterialEditorView<P> {
    pub async fn load(
        asset_id: AssetId,
        document: JsoncDocument,
        preview: P,
        assets: SharedAssetCache,
        loader: Rc<dyn AssetLoader>,
        hasher: Rc<dyn ContentHasher>,
    ) -> EditorResult<Self> {
        let definition: MaterialDefinition = document.value()?;
        let mut view = Self {
            asset_id,
            document,
            state: MaterialState::from_definition(definition),
            preview,
            assets,
            loader,
            hasher,
            project: None,
            asset_changes: Vec::new(),
            shown: MaterialDefinition::default(),
            texture_dirty: true,
            reflection_dirty: true,
        };
        view.refresh_preview()?;
        for err in view.settle_preview().await {
            warn!("[MaterialEditor] {}: {}", view.asset_id, err);
        }
        Ok(view)
    }

    /// Record this material's hash in `project` after every persisted edit
    pub fn with_project(mut self, project: SharedProject) -> Self {
        self.project = Some(project);
        self
    }

    pub fn asset_id(&self) -> &AssetId {
        &self.asset_id
    }

    pub fn document(&self) -> &JsoncDocument {
        &self.document
    }

    pub fn state(&self) -> &MaterialState {
        &self.state
    }

    /// The material as rendered and written: enabled fields only
    pub fn definition(&self) -> MaterialDefinition {
        self.state.effective()
    }

    pub fn preview(&self) -> &P {
        &self.preview
    }

    /// Drain the asset changes collected from the project since last called
    pub fn take_asset_changes(&mut self) -> Vec<AssetChange> {
        std::mem::take(&mut self.asset_changes)
    }

    /// Runtime form of the material as the document currently stands
    pub fn derived_asset(&self) -> LoadedAsset {
        LoadedAsset {
            asset_id: self.asset_id.clone(),
            revision: self.hasher.hash(self.document.as_str().as_bytes()),
            dependencies: self.definition().texture_ids(),
        }
    }

    /// Replace the cached runtime form of this material with a fresh one
    pub fn refresh_cached_asset(&self) -> Rc<LoadedAsset> {
        let asset = self.derived_asset();
        debug!("[MaterialEditor] caching {} at revision {}", asset.asset_id, asset.revision);
        self.assets.borrow_mut().insert(asset)
    }

    /// Push the effective definition to the preview. Colors and strength
    /// apply at once; changed textures load on the next settle.
    pub(crate) fn refresh_preview(&mut self) -> RuntimeResult<()> {
        let effective = self.state.effective();
        self.preview.set_diffuse_color(effective.diffuse_color)?;
        self.preview.set_emission_color(effective.emission_color)?;

        if effective.diffuse_texture_asset_id != self.shown.diffuse_texture_asset_id {
            self.texture_dirty = true;
        }
        if reflection_key(&effective) != reflection_key(&self.shown) {
            self.reflection_dirty = true;
        } else if let Some(reflection) = &effective.reflection {
            self.preview.set_reflection_strength(reflection.strength())?;
        }
        self.shown = effective;
        Ok(())
    }

    /// Patch the document to the effective definition
    pub(crate) fn write_definition(&mut self) -> MutationResult<()> {
        let effective = self.state.effective();
        let root = JsonPath::root();
        reconcile(&mut self.document, &root.clone().key("diffuseColor"), effective.diffuse_color.as_ref())?;
        reconcile(
            &mut self.document,
            &root.clone().key("diffuseTextureAssetId"),
            effective.diffuse_texture_asset_id.as_ref(),
        )?;
        reconcile(&mut self.document, &root.clone().key("emissionColor"), effective.emission_color.as_ref())?;
        reconcile(&mut self.document, &root.key("reflection"), effective.reflection.as_ref())?;
        Ok(())
    }

    /// Publish the persisted material: its hash to the project, then its
    /// fresh runtime form to the cache
    pub(crate) async fn publish(&mut self) -> MutationResult<()> {
        if let Some(project) = self.project.clone() {
            let hash = self.hasher.hash(self.document.as_str().as_bytes());
            let changes = record_in_project(&project, &self.asset_id, hash)
                .await
                .map_err(|err| MutationError::Project(Box::new(err)))?;
            self.asset_changes.extend(changes);
        }
        self.refresh_cached_asset();
        Ok(())
    }

    async fn settle_preview(&mut self) -> Vec<EditorError> {
        let mut errors = Vec::new();
        if std::mem::take(&mut self.texture_dirty) {
            errors.extend(self.settle_diffuse_texture().await);
        }
        if std::mem::take(&mut self.reflection_dirty) {
            errors.extend(self.settle_reflection().await);
        }
        errors
    }

    async fn settle_diffuse_texture(&mut self) -> Option<EditorError> {
        let texture = match &self.shown.diffuse_texture_asset_id {
            Some(texture) => match get_or_load(&self.assets, texture, self.loader.as_ref()).await {
                Ok(loaded) => Some(loaded),
                Err(err) => {
                    // Keep showing nothing rather than a stale texture
                    if let Err(clear) = self.preview.set_diffuse_texture(None) {
                        warn!("[MaterialEditor] {}: could not clear diffuse texture: {}", self.asset_id, clear);
                    }
                    return Some(err.into());
                }
            },
            None => None,
        };
        self.preview.set_diffuse_texture(texture).err().map(EditorError::from)
    }

    async fn settle_reflection(&mut self) -> Option<EditorError> {
        let ready = self.shown.reflection.as_ref().and_then(|reflection| {
            reflection
                .complete_textures()
                .map(|textures| (reflection.layout, reflection.strength(), textures))
        });
        let Some((layout, strength, texture_ids)) = ready else {
            return self.preview.set_reflection(None).err().map(EditorError::from);
        };

        let mut textures = Vec::with_capacity(texture_ids.len());
        for texture in &texture_ids {
            match get_or_load(&self.assets, texture, self.loader.as_ref()).await {
                Ok(loaded) => textures.push(loaded),
                Err(err) => {
                    if let Err(clear) = self.preview.set_reflection(None) {
                        warn!("[MaterialEditor] {}: could not clear reflection: {}", self.asset_id, clear);
                    }
                    return Some(err.into());
                }
            }
        }
        self.preview
            .set_reflection(Some(ReflectionPreview {
                layout,
                strength,
                textures,
            }))
            .err()
            .map(EditorError::from)
    }

    pub async fn reload(&mut self, text: String) -> EditorResult<()> {
        self.document.replace_text(text)?;
        let definition: MaterialDefinition = self.document.value()?;
        self.state = MaterialState::from_definition(definition);
        self.refresh_preview()?;
        for err in self.settle_preview().await {
            warn!("[MaterialEditor] {}: {}", self.asset_id, err);
        }
        Ok(())
    }
}

/// Record a persisted hash in the project and save the project file
#[allow(clippy::await_holding_refcell_ref)]
async fn record_in_project(project: &SharedProject, asset_id: &AssetId, hash: String) -> EditorResult<Vec<AssetChange>> {
    // Single-threaded: the project mutator is not reentered while it persists
    let mut project = project
        .try_borrow_mut()
        .map_err(|_| MutationError::Precondition("project is busy".to_string()))?;
    project.record_asset_hash(asset_id, hash).await
}

impl<P: MaterialPreview> MutationDomain for MaterialEditorView<P> {
    fn document(&self) -> &JsoncDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut JsoncDocument {
        &mut self.document
    }

    fn settle(&mut self) -> LocalBoxFuture<'_, Vec<EditorError>> {
        self.settle_preview().boxed_local()
    }

    fn reload(&mut self, text: String) -> LocalBoxFuture<'_, EditorResult<()>> {
        MaterialEditorView::reload(self, text).boxed_local()
    }
}
