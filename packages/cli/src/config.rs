use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "composer.config.json";

/// Composer configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// History depth for scene edits (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,

    /// Indent unit for newly written values; detected from the file when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<String>,

    /// Default tracing filter, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Suffix expected on scene files
    #[serde(default = "default_scene_extension")]
    pub scene_extension: String,
}

fn default_undo_levels() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scene_extension() -> String {
    "scene.json".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Cannot read {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Invalid {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn is_scene_file(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| name.to_string_lossy().ends_with(self.scene_extension.as_str()))
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_levels: default_undo_levels(),
            indent: None,
            log_level: default_log_level(),
            scene_extension: default_scene_extension(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "undoLevels": 20,
            "indent": "\t",
            "logLevel": "debug"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.undo_levels, 20);
        assert_eq!(config.indent.as_deref(), Some("\t"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.scene_extension, "scene.json");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.undo_levels, 100);
        assert_eq!(config.indent, None);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().undo_levels, 100);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "sceneExtension": "pzscene" }"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.is_scene_file(Path::new("levels/harbor.pzscene")));
        assert!(!config.is_scene_file(Path::new("levels/harbor.json")));
    }
}
