//! Latch Engine Runtime
//!
//! Boots logging and settings, starts graphics bootstrap off the main thread,
//! then drives the window event loop. The window's native view is handed to
//! the backend once bootstrap has published.

use anyhow::{Context, Result};
use latch_render::window::{create_event_loop, native_view, window_attributes, WindowConfig};
use latch_render::BootstrapCoordinator;
use latch_services::settings::{Settings, BACKEND_ENV};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

const SETTINGS_PATH: &str = "latch.json";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Latch Engine v{}", latch_render::VERSION);

    let mut settings = Settings::load(SETTINGS_PATH)?;
    settings
        .apply_env()
        .with_context(|| format!("invalid {BACKEND_ENV}"))?;

    tracing::info!("Initializing services...");
    let graphics = latch_services::init_services(&settings);

    let event_loop = create_event_loop().context("failed to create event loop")?;
    let mut app = RuntimeApp::new(graphics, settings.graphics.window_config("Latch Engine"));
    event_loop.run_app(&mut app).context("event loop terminated abnormally")?;

    if let Some(err) = app.failure {
        return Err(err);
    }
    tracing::info!("Runtime shut down cleanly");
    Ok(())
}

struct RuntimeApp {
    graphics: &'static BootstrapCoordinator,
    config: WindowConfig,
    window: Option<Window>,
    failure: Option<anyhow::Error>,
}

impl RuntimeApp {
    fn new(graphics: &'static BootstrapCoordinator, config: WindowConfig) -> Self {
        Self {
            graphics,
            config,
            window: None,
            failure: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!("{err:#}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for RuntimeApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window = match event_loop.create_window(window_attributes(&self.config)) {
            Ok(window) => window,
            Err(err) => {
                let err = anyhow::Error::new(err).context("failed to create window");
                return self.fail(event_loop, err);
            }
        };

        // Blocks this thread until bootstrap publishes.
        let handle = match self.graphics.current_handle() {
            Ok(handle) => handle,
            Err(err) => return self.fail(event_loop, err.into()),
        };

        let attached = native_view(&window)
            .map(|view| handle.try_native_view_attachment(view))
            .unwrap_or(false);
        tracing::info!(
            backend = %handle.kind(),
            device = %handle.description(),
            opengl = handle.is_opengl_family(),
            native_view = attached,
            capabilities = ?handle.capabilities(),
            "renderer online"
        );

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            tracing::info!("Close requested, shutting down...");
            event_loop.exit();
        }
    }
}
