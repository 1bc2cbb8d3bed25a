use std::{fs, path::Path};
use thiserror::Error;
use toml::Value;

pub const CONFIG_FILE_NAME: &str = "mosaic.toml";

/// Behaviour switches for a [`crate::Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneConfig {
    /// Null out references to a node when it is removed.
    pub clear_references_on_remove: bool,
    /// Refuse `set_parent` calls that would close a hierarchy loop.
    pub reject_hierarchy_cycles: bool,
    /// Log a warning for each dangling reference found by an import.
    pub warn_on_dangling: bool,
    /// Give unnamed nodes a generated unique name on attach.
    pub unique_names: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            clear_references_on_remove: false,
            reject_hierarchy_cycles: true,
            warn_on_dangling: true,
            unique_names: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("invalid field `{0}`: {1}")]
    InvalidField(&'static str, String),
}

pub fn default_scene_config_toml() -> String {
    r#"[scene]
clear_references_on_remove = false
reject_hierarchy_cycles = true
warn_on_dangling = true
unique_names = true
"#
    .to_string()
}

pub fn load_scene_config(path: &Path) -> Result<SceneConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_scene_config(&contents)
}

/// Reads the `[scene]` table. Missing table or keys fall back to defaults.
pub fn parse_scene_config(contents: &str) -> Result<SceneConfig, ConfigError> {
    let value: Value = contents.parse::<Value>()?;
    let mut config = SceneConfig::default();

    let Some(scene) = value.get("scene") else {
        return Ok(config);
    };
    let scene = scene
        .as_table()
        .ok_or_else(|| ConfigError::InvalidField("scene", "expected a table".to_string()))?;

    let read_bool = |field: &'static str, target: &mut bool| -> Result<(), ConfigError> {
        match scene.get(field) {
            None => Ok(()),
            Some(Value::Boolean(b)) => {
                *target = *b;
                Ok(())
            }
            Some(other) => Err(ConfigError::InvalidField(
                field,
                format!("expected true or false, got `{other}`"),
            )),
        }
    };

    read_bool(
        "clear_references_on_remove",
        &mut config.clear_references_on_remove,
    )?;
    read_bool(
        "reject_hierarchy_cycles",
        &mut config.reject_hierarchy_cycles,
    )?;
    read_bool("warn_on_dangling", &mut config.warn_on_dangling)?;
    read_bool("unique_names", &mut config.unique_names)?;

    Ok(config)
}
