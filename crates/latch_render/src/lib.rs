//! Latch Render System
//!
//! Cross-platform graphics backend bootstrap with automatic selection and fallbacks.
//!
//! The engine builds a [`BackendFactory`] for the current [`Platform`], hands it to a
//! [`BootstrapCoordinator`], and every subsystem that needs the GPU goes through
//! [`BootstrapCoordinator::await_ready`] before touching the [`BackendHandle`].
//!
//! ```ignore
//! use latch_render::{graphics, BackendFactory, Platform};
//!
//! let factory = BackendFactory::new(Platform::current()).with_wgpu_initializers();
//! graphics().start(factory, None);
//!
//! // Any thread, any time later:
//! let handle = graphics().current_handle()?;
//! tracing::info!("rendering with {}", handle.kind());
//! ```

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod gate;
pub mod wgpu_backend;
pub mod window;

pub use wgpu;
pub use winit;

pub use backend::{BackendHandle, GraphicsBackend, NativeView, NativeViewHost, NullBackend};
pub use coordinator::{graphics, BootstrapCoordinator, BootstrapResult, StartOutcome};
pub use error::{BootstrapError, CandidateFailure, FailureCause, InitError, ProtocolMisuse};
pub use factory::{BackendFactory, Initializer, Platform};
pub use gate::ReadinessGate;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Graphics backend family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenGL / OpenGL ES (cross-platform, fallback)
    #[serde(rename = "opengl")]
    OpenGL,
    /// Metal (macOS, iOS)
    Metal,
    /// DirectX (Windows)
    #[serde(rename = "directx")]
    DirectX,
    /// Console vendor API
    #[serde(rename = "console")]
    ConsoleSpecific,
    /// No-op backend for headless runs (last resort)
    None,
}

impl BackendKind {
    /// Every kind, in declaration order.
    pub const ALL: [BackendKind; 5] = [
        BackendKind::OpenGL,
        BackendKind::Metal,
        BackendKind::DirectX,
        BackendKind::ConsoleSpecific,
        BackendKind::None,
    ];

    /// Human readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::OpenGL => "OpenGL",
            BackendKind::Metal => "Metal",
            BackendKind::DirectX => "DirectX",
            BackendKind::ConsoleSpecific => "Console",
            BackendKind::None => "None",
        }
    }

    /// Token accepted by [`FromStr`] and used in settings files.
    pub fn token(self) -> &'static str {
        match self {
            BackendKind::OpenGL => "opengl",
            BackendKind::Metal => "metal",
            BackendKind::DirectX => "directx",
            BackendKind::ConsoleSpecific => "console",
            BackendKind::None => "none",
        }
    }

    pub fn is_opengl_family(self) -> bool {
        matches!(self, BackendKind::OpenGL)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a backend token does not name any [`BackendKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown graphics backend '{0}' (expected opengl, metal, directx, console or none)")]
pub struct UnknownBackendKind(pub String);

impl FromStr for BackendKind {
    type Err = UnknownBackendKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opengl" | "gl" => Ok(BackendKind::OpenGL),
            "metal" => Ok(BackendKind::Metal),
            "directx" | "dx" => Ok(BackendKind::DirectX),
            "console" => Ok(BackendKind::ConsoleSpecific),
            "none" | "null" => Ok(BackendKind::None),
            _ => Err(UnknownBackendKind(s.to_string())),
        }
    }
}

/// Capability facts reported by an initialized backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceCapabilities {
    pub max_texture_size: u32,
    pub supports_compute: bool,
    pub supports_instancing: bool,
}
