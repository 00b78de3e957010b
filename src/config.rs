use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::renderer::Color;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ── EngineConfig ──────────────────────────────────────────────────────────────

/// Engine settings. Every field is optional in JSON; missing ones keep their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window_width: u32,
    pub window_height: u32,
    /// World size in pixels, used for camera and bounds clamping.
    pub map_width: u32,
    pub map_height: u32,
    /// Upper bound on the delta handed to systems, in seconds.
    pub max_delta: f32,
    /// Stop after this many frames. `None` runs until quit.
    pub frame_limit: Option<u64>,
    pub debug_colliders: bool,
    pub clear_color: [f32; 4],
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_width: 800,
            window_height: 600,
            map_width: 1600,
            map_height: 1200,
            max_delta: 0.05,
            frame_limit: None,
            debug_colliders: false,
            clear_color: [0.0, 0.0, 1.0, 1.0],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.window_width, self.window_height
            )));
        }
        if self.map_width == 0 || self.map_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "map size {}x{} must be non-zero",
                self.map_width, self.map_height
            )));
        }
        if !self.max_delta.is_finite() || self.max_delta <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_delta must be positive, got {}",
                self.max_delta
            )));
        }
        Ok(())
    }

    pub fn clear_color(&self) -> Color {
        Color(self.clear_color)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
