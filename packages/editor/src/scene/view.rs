//! # Scene view
//!
//! One open scene: its document, the arena model built from it, the runtime
//! projection, and the caches that tie runtime instances back to objects
//! (selection) and to assets (dependencies).
//!
//! ## Lifecycle
//!
//! ```text
//! load:     document → SceneModel → runtime objects → queued components → settle
//! mutation: update (model + runtime, components queued) → settle → write document
//! asset:    AssetChange → cascade → reinitialize_component (destroy + create)
//! reload:   clear caches + runtime → load
//! ```
//!
//! Component instantiation needs asset loads, so it never happens inside a
//! synchronous mutation phase; components are queued and created in
//! [`SceneView::settle_components`].

use std::rc::Rc;

use composer_jsonc::{JsonPath, JsoncDocument};
use futures::future::{FutureExt, LocalBoxFuture};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::assets::{get_or_load, AssetChange, AssetLoader, SharedAssetCache};
use crate::cascade::{cascade_asset_change, CascadeReport, CascadeTarget};
use crate::dependency::{ComponentDependency, DependencyManager};
use crate::document::MutationDomain;
use crate::errors::{EditorError, EditorResult};
use crate::ids::{ComponentId, ObjectId};
use crate::mutation_trait::{MutationError, MutationResult};
use crate::scene::definition::{GameObjectDefinition, SceneDefinition};
use crate::scene::model::SceneModel;
use crate::scene::paths::{children_path, component_path, object_path};
use crate::scene::runtime::SceneRuntime;
use crate::selection::{MeshHandle, SelectionCache};

pub struct SceneView<R: SceneRuntime> {
    pub(crate) document: JsoncDocument,
    pub(crate) model: SceneModel,
    pub(crate) runtime: R,
    pub(crate) dependencies: DependencyManager,
    pub(crate) selection: SelectionCache,
    assets: SharedAssetCache,
    loader: Rc<dyn AssetLoader>,
    pending_components: Vec<(ObjectId, ComponentId)>,
}

impl<R: SceneRuntime> SceneView<R> {
    /// Build the model and runtime for a parsed scene document.
    ///
    /// Components whose assets fail to load are logged and left without a
    /// runtime instance; their dependencies stay registered so a later
    /// asset change retries them.
    pub async fn load(
        document: JsoncDocument,
        runtime: R,
        assets: SharedAssetCache,
        loader: Rc<dyn AssetLoader>,
    ) -> EditorResult<Self> {
        let definition: SceneDefinition = document.value()?;
        let model = SceneModel::from_definition(&definition)?;

        let mut view = Self {
            document,
            model,
            runtime,
            dependencies: DependencyManager::new(),
            selection: SelectionCache::new(),
            assets,
            loader,
            pending_components: Vec::new(),
        };
        view.build_runtime().await?;
        Ok(view)
    }

    async fn build_runtime(&mut self) -> EditorResult<()> {
        let roots = self.model.roots().to_vec();
        for root in &roots {
            self.create_object_instances(root)?;
        }

        let failures = self.settle_components().await;
        for failure in &failures {
            warn!("[SceneView] component failed to initialize: {}", failure);
        }
        info!(
            "[SceneView] built {} objects ({} component failures)",
            self.runtime.object_count(),
            failures.len()
        );
        Ok(())
    }

    /// Replace the document text and rebuild everything derived from it
    pub async fn reload(&mut self, text: String) -> EditorResult<()> {
        self.document.replace_text(text)?;
        let definition: SceneDefinition = self.document.value()?;
        let model = SceneModel::from_definition(&definition)?;

        self.selection.clear();
        self.dependencies.clear();
        self.pending_components.clear();
        self.runtime.clear();
        self.model = model;

        self.build_runtime().await
    }

    pub fn document(&self) -> &JsoncDocument {
        &self.document
    }

    pub fn model(&self) -> &SceneModel {
        &self.model
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn dependencies(&self) -> &DependencyManager {
        &self.dependencies
    }

    pub fn selection(&self) -> &SelectionCache {
        &self.selection
    }

    pub fn assets(&self) -> &SharedAssetCache {
        &self.assets
    }

    /// Object owning a clicked mesh
    pub fn pick(&self, mesh: MeshHandle) -> Option<&ObjectId> {
        self.selection.get(mesh)
    }

    /// Create runtime objects for `id` and its descendants from the model.
    /// Their components are queued, not created.
    pub fn create_object_instances(&mut self, id: &ObjectId) -> MutationResult<()> {
        for object_id in self.model.subtree_ids(id)? {
            let index = self.model.index_in_parent(&object_id)?;
            let object = self.model.object(&object_id)?;
            self.runtime.create_object(
                &object.id,
                &object.name,
                &object.transform,
                object.parent.as_ref(),
                index,
            )?;

            let components: Vec<ComponentId> = object.components.iter().map(|c| c.id().clone()).collect();
            for component in components {
                self.queue_component(object_id.clone(), component);
            }
        }
        Ok(())
    }

    /// Tear down the runtime side of a removed subtree, children first
    pub fn destroy_object_instances(&mut self, definition: &GameObjectDefinition) -> MutationResult<()> {
        for child in &definition.children {
            self.destroy_object_instances(child)?;
        }
        for component in &definition.components {
            self.destroy_component_instance(&definition.id, component.id())?;
        }
        self.runtime.destroy_object(&definition.id)?;
        Ok(())
    }

    /// Remove a component's runtime instance along with its selection and
    /// dependency entries. Missing pieces are skipped.
    pub fn destroy_component_instance(&mut self, object: &ObjectId, component: &ComponentId) -> MutationResult<()> {
        self.selection.remove_component(component);
        self.dependencies.unregister_dependency(component);
        self.pending_components
            .retain(|(queued_object, queued)| !(queued_object == object && queued == component));

        if self.runtime.has_component(object, component) {
            self.runtime.destroy_component(object, component)?;
        }
        Ok(())
    }

    /// Load a component's assets and create its runtime instance
    pub async fn create_component_instance(&mut self, object: &ObjectId, component: &ComponentId) -> EditorResult<()> {
        let definition = self.model.component(object, component)?.clone();
        let asset_ids = definition.asset_ids();
        self.dependencies
            .register_dependency(component.clone(), object.clone(), asset_ids.iter().cloned());

        let mut loaded = Vec::with_capacity(asset_ids.len());
        for asset_id in &asset_ids {
            loaded.push(get_or_load(&self.assets, asset_id, self.loader.as_ref()).await?);
        }

        let instance = self.runtime.create_component(object, &definition, &loaded)?;
        for mesh in instance.selectable_meshes {
            self.selection.insert(mesh, object.clone(), component.clone());
        }
        self.dependencies.register_dependency(
            component.clone(),
            object.clone(),
            asset_ids.into_iter().chain(instance.asset_dependencies),
        );
        debug!("[SceneView] created component {} on {}", component, object);
        Ok(())
    }

    /// Destroy and recreate one component from its current definition
    pub async fn reinitialize_component(&mut self, object: &ObjectId, component: &ComponentId) -> EditorResult<()> {
        self.destroy_component_instance(object, component)?;
        self.create_component_instance(object, component).await
    }

    /// Schedule a component for creation at the next settle
    pub fn queue_component(&mut self, object: ObjectId, component: ComponentId) {
        let entry = (object, component);
        if !self.pending_components.contains(&entry) {
            self.pending_components.push(entry);
        }
    }

    /// Create every queued component, each independently
    pub async fn settle_components(&mut self) -> Vec<EditorError> {
        let queued = std::mem::take(&mut self.pending_components);
        let mut failures = Vec::new();

        for (object, component) in queued {
            if self.model.component(&object, &component).is_err() {
                continue;
            }
            if let Err(err) = self.create_component_instance(&object, &component).await {
                failures.push(err);
            }
        }
        failures
    }

    /// Reinitialize every component affected by an asset change
    pub async fn on_asset_changed(&mut self, change: &AssetChange) -> CascadeReport {
        cascade_asset_change(self, change).await
    }

    /// Write one field of an object, addressed relative to the object
    pub fn write_object_field<T: Serialize + ?Sized>(
        &mut self,
        id: &ObjectId,
        field: &JsonPath,
        value: &T,
    ) -> MutationResult<()> {
        let path = object_path(&self.document, id)
            .ok_or_else(|| MutationError::ObjectNotFound(id.clone()))?
            .join(field);
        self.document.set(&path, value)?;
        Ok(())
    }

    /// Write one transform field, creating `transform` if the object has
    /// none yet. Values equal to what the document holds are not rewritten.
    pub fn write_transform_field<T>(&mut self, id: &ObjectId, field: &str, value: &T) -> MutationResult<()>
    where
        T: Serialize + DeserializeOwned + PartialEq,
    {
        let transform_path = object_path(&self.document, id)
            .ok_or_else(|| MutationError::ObjectNotFound(id.clone()))?
            .key("transform");

        if !self.document.contains(&transform_path) {
            let transform = self.model.object(id)?.transform;
            self.document.set(&transform_path, &transform)?;
            return Ok(());
        }

        let field_path = transform_path.key(field);
        let current = self
            .document
            .value_at(&field_path)
            .and_then(|value| serde_json::from_value::<T>(value).ok());
        if current.as_ref() != Some(value) {
            self.document.set(&field_path, value)?;
        }
        Ok(())
    }

    /// Set (`Some`) or remove (`None`) one field of a component
    pub fn write_component_field<T: Serialize + ?Sized>(
        &mut self,
        object: &ObjectId,
        component: &ComponentId,
        field: &str,
        value: Option<&T>,
    ) -> MutationResult<()> {
        let path = component_path(&self.document, object, component)
            .ok_or_else(|| MutationError::ComponentNotFound {
                object: object.clone(),
                component: component.clone(),
            })?
            .key(field);

        match value {
            Some(value) => self.document.set(&path, value)?,
            None if self.document.contains(&path) => self.document.delete(&path)?,
            None => {}
        }
        Ok(())
    }

    /// Make the document's placement of `id` match the model: removed if
    /// the model no longer has it, otherwise at the model's position.
    pub fn sync_object_placement(&mut self, id: &ObjectId) -> MutationResult<()> {
        if let Some(path) = object_path(&self.document, id) {
            self.document.delete(&path)?;
        }
        if !self.model.contains(id) {
            return Ok(());
        }

        let definition = self.model.object_definition(id)?;
        let parent = self.model.object(id)?.parent.clone();
        let index = self.model.index_in_parent(id)?;
        let siblings = children_path(&self.document, parent.as_ref()).ok_or_else(|| {
            MutationError::ObjectNotFound(parent.clone().unwrap_or_else(|| id.clone()))
        })?;

        if self.document.contains(&siblings) {
            self.document.insert(&siblings.index(index), &definition)?;
        } else {
            self.document.set(&siblings, &[definition])?;
        }
        Ok(())
    }

    /// Make the document's copy of one component match the model
    pub fn sync_component_presence(&mut self, object: &ObjectId, component: &ComponentId) -> MutationResult<()> {
        if let Some(path) = component_path(&self.document, object, component) {
            self.document.delete(&path)?;
        }
        let Ok(index) = self.model.component_index(object, component) else {
            return Ok(());
        };

        let definition = self.model.component(object, component)?.clone();
        let components = object_path(&self.document, object)
            .ok_or_else(|| MutationError::ObjectNotFound(object.clone()))?
            .key("components");

        if self.document.contains(&components) {
            self.document.insert(&components.index(index), &definition)?;
        } else {
            self.document.set(&components, &[definition])?;
        }
        Ok(())
    }
}

impl<R: SceneRuntime> MutationDomain for SceneView<R> {
    fn document(&self) -> &JsoncDocument {
        &self.document
    }

    fn document_mut(&mut self) -> &mut JsoncDocument {
        &mut self.document
    }

    fn settle(&mut self) -> LocalBoxFuture<'_, Vec<EditorError>> {
        self.settle_components().boxed_local()
    }

    fn reload(&mut self, text: String) -> LocalBoxFuture<'_, EditorResult<()>> {
        SceneView::reload(self, text).boxed_local()
    }
}

impl<R: SceneRuntime> CascadeTarget for SceneView<R> {
    fn dependency_manager(&self) -> &DependencyManager {
        &self.dependencies
    }

    fn reinitialize_dependent<'a>(
        &'a mut self,
        dependency: &'a ComponentDependency,
    ) -> LocalBoxFuture<'a, EditorResult<()>> {
        self.reinitialize_component(&dependency.object_id, &dependency.component_id)
            .boxed_local()
    }
}
