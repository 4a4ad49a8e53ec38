//! Window management
//!
//! Cross-platform window creation via winit, and extraction of the platform
//! view a backend may want attached.

use crate::backend::NativeView;
use winit::{
    error::EventLoopError,
    event_loop::EventLoop,
    raw_window_handle::{HasWindowHandle, RawWindowHandle},
    window::Window,
};

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Latch Engine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Create window attributes from config
pub fn window_attributes(config: &WindowConfig) -> winit::window::WindowAttributes {
    Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height))
}

/// Windows must be created inside `ApplicationHandler::resumed` (winit 0.30+).
pub fn create_event_loop() -> Result<EventLoop<()>, EventLoopError> {
    EventLoop::new()
}

/// Platform view behind `window`: UIView, NSView, HWND, X11/XCB window,
/// Wayland surface or ANativeWindow.
pub fn native_view(window: &Window) -> Option<NativeView> {
    let handle = match window.window_handle() {
        Ok(handle) => handle,
        Err(err) => {
            tracing::warn!(error = %err, "window has no native handle");
            return None;
        }
    };

    let raw = match handle.as_raw() {
        RawWindowHandle::UiKit(h) => h.ui_view.as_ptr() as usize,
        RawWindowHandle::AppKit(h) => h.ns_view.as_ptr() as usize,
        RawWindowHandle::Win32(h) => h.hwnd.get() as usize,
        RawWindowHandle::Xlib(h) => h.window as usize,
        RawWindowHandle::Xcb(h) => h.window.get() as usize,
        RawWindowHandle::Wayland(h) => h.surface.as_ptr() as usize,
        RawWindowHandle::AndroidNdk(h) => h.a_native_window.as_ptr() as usize,
        other => {
            tracing::debug!(handle = ?other, "unsupported window handle kind");
            return None;
        }
    };
    Some(NativeView::from_raw(raw))
}
