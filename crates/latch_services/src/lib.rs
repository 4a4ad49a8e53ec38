//! Latch Services Layer
//!
//! Platform abstraction for settings and engine service startup.

pub mod settings;

pub use settings::{BackendPreference, GraphicsSettings, Settings, SettingsError};

use latch_render::{BootstrapCoordinator, Platform, StartOutcome};

/// Platform detection and service setup.
///
/// Starts graphics bootstrap on the process-wide coordinator and returns it;
/// the caller continues while backends initialize on a worker thread.
pub fn init_services(settings: &Settings) -> &'static BootstrapCoordinator {
    let graphics = latch_render::graphics();
    init_graphics(graphics, settings, Platform::current());
    graphics
}

/// Start graphics bootstrap for `platform` on `coordinator`.
pub fn init_graphics(
    coordinator: &BootstrapCoordinator,
    settings: &Settings,
    platform: Platform,
) -> StartOutcome {
    let factory = settings.graphics.backend_factory(platform);
    coordinator.start(factory, settings.graphics.backend.forced())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latch_render::BackendKind;

    #[test]
    fn headless_platform_boots_null_backend() {
        let coordinator = BootstrapCoordinator::new();
        let settings = Settings::default();

        assert_eq!(
            init_graphics(&coordinator, &settings, Platform::Headless),
            StartOutcome::Started
        );
        assert_eq!(
            init_graphics(&coordinator, &settings, Platform::Headless),
            StartOutcome::AlreadyStarted
        );
        assert_eq!(coordinator.backend_kind(), Ok(BackendKind::None));
        assert_eq!(coordinator.is_opengl(), Ok(false));
    }

    #[test]
    fn forced_backend_outside_platform_fails_cleanly() {
        let coordinator = BootstrapCoordinator::new();
        let mut settings = Settings::default();
        settings.graphics.set_backend("directx").unwrap();

        init_graphics(&coordinator, &settings, Platform::Android);
        let err = coordinator.current_handle().unwrap_err();
        assert_eq!(err.forced, Some(BackendKind::DirectX));
        assert!(err.to_string().contains("DirectX: not supported in this environment"));
    }
}
