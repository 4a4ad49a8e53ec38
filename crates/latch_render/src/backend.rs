//! Rendering backend abstraction
//!
//! A [`BackendHandle`] is what the rest of the engine sees once bootstrap has
//! picked a backend: its kind, a couple of yes/no capability facts, and nothing
//! else. The concrete API lives behind [`GraphicsBackend`].

use crate::{BackendKind, DeviceCapabilities};
use std::fmt;

/// Platform view/surface pointer owned by the windowing layer
/// (UIView, NSView, HWND, ...). Stored as an address; never dereferenced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeView(usize);

impl NativeView {
    pub fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> usize {
        self.0
    }
}

/// Optional capability: the backend renders into a view the engine hands it.
pub trait NativeViewHost: Send + Sync {
    fn attach_native_view(&self, view: NativeView);

    /// Most recently attached view.
    fn attached_native_view(&self) -> Option<NativeView>;
}

/// An initialized graphics backend.
///
/// Implementations must release everything they acquired when dropped; a failed
/// initializer returns only after its partial state has been dropped.
pub trait GraphicsBackend: Send + Sync {
    /// Adapter or driver name for logs.
    fn description(&self) -> String;

    fn capabilities(&self) -> DeviceCapabilities;

    /// Native view attachment, when supported.
    fn native_view_host(&self) -> Option<&dyn NativeViewHost> {
        None
    }
}

/// The active backend, tagged with the kind of the candidate that produced it.
pub struct BackendHandle {
    kind: BackendKind,
    backend: Box<dyn GraphicsBackend>,
}

impl BackendHandle {
    pub(crate) fn new(kind: BackendKind, backend: Box<dyn GraphicsBackend>) -> Self {
        Self { kind, backend }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// True only for OpenGL-derived backends.
    pub fn is_opengl_family(&self) -> bool {
        self.kind.is_opengl_family()
    }

    pub fn supports_native_view_attachment(&self) -> bool {
        self.backend.native_view_host().is_some()
    }

    /// Hand `view` to the backend if it can take one.
    ///
    /// Returns `false` and does nothing on backends without the capability.
    pub fn try_native_view_attachment(&self, view: NativeView) -> bool {
        match self.backend.native_view_host() {
            Some(host) => {
                host.attach_native_view(view);
                tracing::debug!(backend = %self.kind, view = view.as_raw(), "attached native view");
                true
            }
            None => false,
        }
    }

    /// View the backend is rendering into, if it takes one and has been given one.
    pub fn attached_native_view(&self) -> Option<NativeView> {
        self.backend
            .native_view_host()
            .and_then(|host| host.attached_native_view())
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.backend.capabilities()
    }

    pub fn description(&self) -> String {
        self.backend.description()
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("kind", &self.kind)
            .field("backend", &self.backend.description())
            .finish()
    }
}

/// No-op backend for headless runs and tests.
///
/// Only ever selected as the last candidate of a factory that opted into the
/// headless fallback.
#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GraphicsBackend for NullBackend {
    fn description(&self) -> String {
        "null (headless)".to_string()
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities::default()
    }
}
