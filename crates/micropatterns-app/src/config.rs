use std::path::PathBuf;

use micropatterns_renderer::DEFAULT_BLOCK_SIZE;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "MICROPATTERNS_CONFIG";
const CONFIG_FILE: &str = "micropatterns.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Surface size in pixels. The Watchy panel is 200×200.
    pub width: i32,
    pub height: i32,
    pub block_size: i32,
    /// Script loaded at startup instead of the built-in one.
    pub script_path: Option<PathBuf>,
    /// Canvas zoom in the preview tab.
    pub zoom: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { width: 200, height: 200, block_size: DEFAULT_BLOCK_SIZE, script_path: None, zoom: 3.0 }
    }
}

impl AppConfig {
    /// `$MICROPATTERNS_CONFIG`, else `micropatterns.json` in the working
    /// directory. A missing file is not an error.
    pub fn load() -> Result<Self, String> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::from_json(&text).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(text)?;
        config.width = config.width.max(1);
        config.height = config.height.max(1);
        config.zoom = config.zoom.clamp(1.0, 16.0);
        Ok(config)
    }

    pub fn initial_script(&self) -> Option<Result<String, String>> {
        let path = self.script_path.as_ref()?;
        Some(std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display())))
    }
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let c = AppConfig::from_json(r#"{ "width": 152 }"#).unwrap();
        assert_eq!(c.width, 152);
        assert_eq!(c.height, 200);
        assert_eq!(c.block_size, 16);
        assert!(c.script_path.is_none());
    }

    #[test]
    fn nonsense_sizes_are_clamped() {
        let c = AppConfig::from_json(r#"{ "width": -3, "height": 0, "zoom": 100 }"#).unwrap();
        assert_eq!((c.width, c.height), (1, 1));
        assert_eq!(c.zoom, 16.0);
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(AppConfig::from_json("{ width: ").is_err());
    }
}
