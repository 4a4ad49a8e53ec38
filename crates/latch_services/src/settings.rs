//! Settings management

use latch_render::window::WindowConfig;
use latch_render::{BackendFactory, BackendKind, Platform, UnknownBackendKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable that overrides `graphics.backend`.
pub const BACKEND_ENV: &str = "LATCH_GRAPHICS_BACKEND";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(#[from] UnknownBackendKind),
}

/// Engine settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graphics: GraphicsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    pub resolution_width: u32,
    pub resolution_height: u32,
    pub fullscreen: bool,
    /// `"auto"` or a backend token such as `"metal"`.
    pub backend: BackendPreference,
    /// Fall back to the null backend when every real one fails.
    pub headless_fallback: bool,
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            resolution_width: 1280,
            resolution_height: 720,
            fullscreen: false,
            backend: BackendPreference::Auto,
            headless_fallback: false,
        }
    }
}

/// Which backend to use: platform order, or one forced kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendPreference {
    #[default]
    Auto,
    Forced(BackendKind),
}

impl BackendPreference {
    pub fn forced(self) -> Option<BackendKind> {
        match self {
            BackendPreference::Auto => None,
            BackendPreference::Forced(kind) => Some(kind),
        }
    }
}

impl FromStr for BackendPreference {
    type Err = UnknownBackendKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") || s.trim().is_empty() {
            return Ok(BackendPreference::Auto);
        }
        s.parse().map(BackendPreference::Forced)
    }
}

impl TryFrom<String> for BackendPreference {
    type Error = UnknownBackendKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendPreference> for String {
    fn from(pref: BackendPreference) -> Self {
        pref.to_string()
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => f.write_str("auto"),
            BackendPreference::Forced(kind) => f.write_str(kind.token()),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::from_json(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply [`BACKEND_ENV`] if it is set.
    pub fn apply_env(&mut self) -> Result<(), SettingsError> {
        if let Ok(value) = std::env::var(BACKEND_ENV) {
            self.graphics.set_backend(&value)?;
            tracing::info!(backend = %self.graphics.backend, "graphics backend set from {BACKEND_ENV}");
        }
        Ok(())
    }
}

impl GraphicsSettings {
    pub fn set_backend(&mut self, token: &str) -> Result<(), UnknownBackendKind> {
        self.backend = token.parse()?;
        Ok(())
    }

    /// Candidate table for `platform` with wgpu initializers registered.
    pub fn backend_factory(&self, platform: Platform) -> BackendFactory {
        let factory = BackendFactory::new(platform).with_wgpu_initializers();
        if self.headless_fallback {
            factory.with_headless_fallback()
        } else {
            factory
        }
    }

    pub fn window_config(&self, title: impl Into<String>) -> WindowConfig {
        WindowConfig {
            title: title.into(),
            width: self.resolution_width,
            height: self.resolution_height,
        }
    }
}
