use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use composer_common::{Crc32Hasher, RealFileSystem};
use composer_editor::scene::mutations::{
    CreateBlankObjectMutation, DeleteObjectMutation, SetObjectNameMutation, SetTransformFieldMutation,
};
use composer_editor::scene::{HeadlessRuntime, SceneView};
use composer_editor::{
    AssetCache, DocumentStore, MutationIds, Mutator, MutatorOptions, ObjectId, StaticAssetLoader, Vector3,
};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::warn;

#[derive(Args, Debug)]
pub struct SceneArgs {
    /// Scene file
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: SceneCommand,
}

#[derive(Subcommand, Debug)]
pub enum SceneCommand {
    /// Set an object's local position
    Move {
        object: String,
        x: f32,
        y: f32,
        z: f32,
    },

    /// Rename an object
    Rename { object: String, name: String },

    /// Create an empty object
    Create {
        name: String,

        /// Parent object id; created at the scene root when omitted
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete an object and its children
    Delete { object: String },
}

type HeadlessMutator = Mutator<SceneView<HeadlessRuntime>>;

/// Open a scene with no engine attached. Assets resolve to empty leaves.
async fn open_scene(file: &Path, config: &Config) -> Result<HeadlessMutator> {
    let mut store = DocumentStore::new(file, Rc::new(RealFileSystem), Rc::new(Crc32Hasher));
    let mut document = store.load_document().await?;
    if let Some(indent) = &config.indent {
        document.set_indent_unit(indent.clone());
    }

    let view = SceneView::load(
        document,
        HeadlessRuntime::new(),
        AssetCache::shared(),
        Rc::new(StaticAssetLoader::new()),
    )
    .await
    .with_context(|| format!("Cannot load scene {}", file.display()))?;

    let options = MutatorOptions {
        max_undo_levels: config.undo_levels,
        ..MutatorOptions::default()
    };
    Ok(Mutator::new(view, store, MutationIds::new(), options))
}

pub async fn scene(args: SceneArgs, config: &Config) -> Result<()> {
    if !config.is_scene_file(&args.file) {
        warn!(
            "[Scene] {} does not end with '{}'",
            args.file.display(),
            config.scene_extension
        );
    }

    let mut mutator = open_scene(&args.file, config).await?;

    let summary = match args.command {
        SceneCommand::Move { object, x, y, z } => {
            let position = Vector3::new(x, y, z);
            mutator
                .apply_instantly(SetTransformFieldMutation::position(ObjectId::new(&object)), position)
                .await?;
            format!("Moved {} to ({}, {}, {})", object, x, y, z)
        }
        SceneCommand::Rename { object, name } => {
            mutator
                .apply_instantly(SetObjectNameMutation { object_id: ObjectId::new(&object) }, name.clone())
                .await?;
            format!("Renamed {} to {}", object, name)
        }
        SceneCommand::Create { name, parent } => {
            let mutation = CreateBlankObjectMutation::new(parent.map(ObjectId::new)).with_name(&name);
            let id = mutation.object_id.clone();
            mutator.apply(mutation).await?;
            format!("Created {} ({})", name, id)
        }
        SceneCommand::Delete { object } => {
            mutator
                .apply(DeleteObjectMutation { object_id: ObjectId::new(&object) })
                .await?;
            format!("Deleted {}", object)
        }
    };

    println!("{} {} in {}", "✓".green(), summary, args.file.display());
    Ok(())
}
