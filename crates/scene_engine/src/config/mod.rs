//! Configuration system
//!
//! Engine settings are plain serde structs. Any type implementing [`Config`]
//! can be loaded from or saved to TOML or RON, picked by file extension.

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            Self::from_toml_str(&contents)
        } else if path.ends_with(".ron") {
            Self::from_ron_str(&contents)
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            self.to_toml_string()?
        } else if path.ends_with(".ron") {
            self.to_ron_string()?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse from a TOML document
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse from a RON document
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Render as a TOML document
    fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Render as a RON document
    fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Scene tree behaviour settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Log every lifecycle transition (pre-start, start, destroy) at debug level
    pub log_lifecycle: bool,

    /// Slots reserved up front in the object and component arenas
    pub initial_capacity: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            log_lifecycle: false,
            initial_capacity: 256,
        }
    }
}

/// UI layout engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Rebuild every registered UI root once per tick
    pub rebuild_on_tick: bool,

    /// Upper bound on redistribution rounds when growing children toward
    /// their preferred size
    pub distribution_passes: usize,

    /// Priority given to layout elements that do not declare one
    pub default_priority: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rebuild_on_tick: true,
            distribution_passes: 8,
            default_priority: 1,
        }
    }
}

/// Top level engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step used by headless hosts instead of wall clock time
    pub fixed_delta_time: Option<f32>,

    /// Scene tree settings
    pub scene: SceneConfig,

    /// Layout settings
    pub layout: LayoutConfig,
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let mut config = EngineConfig::default();
        config.layout.distribution_passes = 3;
        config.fixed_delta_time = Some(0.016);

        let text = config.to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let parsed = EngineConfig::from_ron_str("(layout: (default_priority: 4))").unwrap();
        assert_eq!(parsed.layout.default_priority, 4);
        assert!(parsed.layout.rebuild_on_tick);
        assert_eq!(parsed.scene, SceneConfig::default());
    }

    #[test]
    fn test_unsupported_extension() {
        let result = EngineConfig::default().save_to_file("settings.ini");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
