//! Backend selection
//!
//! A [`BackendFactory`] is a per-platform table of candidates, tried strictly in
//! priority order. The first initializer that succeeds wins; if none does, the
//! error lists every candidate and why it failed.

use crate::backend::{BackendHandle, GraphicsBackend, NullBackend};
use crate::coordinator::BootstrapResult;
use crate::error::{BootstrapError, CandidateFailure, InitError};
use crate::BackendKind;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Creates one backend. Runs at most once, on the bootstrap thread.
pub type Initializer = Box<dyn FnOnce() -> Result<Box<dyn GraphicsBackend>, InitError> + Send>;

/// Platform identity used to pick the candidate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    MacOs,
    Android,
    Windows,
    Linux,
    Console,
    /// No display; only the null backend exists.
    Headless,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(unix) {
            Platform::Linux
        } else {
            Platform::Headless
        }
    }

    /// Backends this platform offers, most preferred first.
    pub fn priority(self) -> &'static [BackendKind] {
        match self {
            Platform::Ios | Platform::MacOs => &[BackendKind::Metal, BackendKind::OpenGL],
            Platform::Windows => &[BackendKind::DirectX, BackendKind::OpenGL],
            Platform::Android | Platform::Linux => &[BackendKind::OpenGL],
            Platform::Console => &[BackendKind::ConsoleSpecific],
            Platform::Headless => &[BackendKind::None],
        }
    }
}

/// Candidate table for one platform plus the initializers to run.
pub struct BackendFactory {
    platform: Platform,
    initializers: HashMap<BackendKind, Initializer>,
    headless_fallback: bool,
}

impl BackendFactory {
    pub fn new(platform: Platform) -> Self {
        let mut initializers: HashMap<BackendKind, Initializer> = HashMap::new();
        initializers.insert(BackendKind::None, Box::new(null_initializer));
        Self {
            platform,
            initializers,
            headless_fallback: false,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Register (or replace) the initializer for `kind`.
    pub fn with_initializer<F>(mut self, kind: BackendKind, init: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn GraphicsBackend>, InitError> + Send + 'static,
    {
        self.initializers.insert(kind, Box::new(init));
        self
    }

    /// Append the null backend as the candidate of last resort.
    pub fn with_headless_fallback(mut self) -> Self {
        self.headless_fallback = true;
        self
    }

    /// Candidates in attempt order.
    pub fn candidates(&self) -> Vec<BackendKind> {
        let mut order = self.platform.priority().to_vec();
        if self.headless_fallback && !order.contains(&BackendKind::None) {
            order.push(BackendKind::None);
        }
        order
    }

    /// Whether `kind` can be attempted here: offered by the platform table and
    /// backed by an initializer.
    pub fn offers(&self, kind: BackendKind) -> bool {
        self.candidates().contains(&kind) && self.initializers.contains_key(&kind)
    }

    /// Run the selection. Consumes the factory so no initializer can run twice.
    pub fn select(mut self, forced: Option<BackendKind>) -> BootstrapResult {
        if let Some(kind) = forced {
            tracing::info!(backend = %kind, "graphics backend forced");
            return self
                .attempt(kind)
                .map_err(|failure| BootstrapError::forced(kind, failure));
        }

        let mut failures = Vec::new();
        for kind in self.candidates() {
            match self.attempt(kind) {
                Ok(handle) => return Ok(handle),
                Err(failure) => failures.push(failure),
            }
        }
        Err(BootstrapError::exhausted(failures))
    }

    fn attempt(&mut self, kind: BackendKind) -> Result<BackendHandle, CandidateFailure> {
        let init = if self.offers(kind) {
            self.initializers.remove(&kind)
        } else {
            None
        };
        let Some(init) = init else {
            tracing::warn!(backend = %kind, platform = ?self.platform, "graphics backend not supported");
            return Err(CandidateFailure::unavailable(kind));
        };

        tracing::debug!(backend = %kind, "initializing graphics backend");
        let started = Instant::now();
        // Only effective with panic = "unwind"; the ship profile aborts instead.
        let outcome = panic::catch_unwind(AssertUnwindSafe(init));
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        let err = match outcome {
            Ok(Ok(backend)) => {
                tracing::debug!(backend = %kind, elapsed_ms, "graphics backend initialized");
                return Ok(BackendHandle::new(kind, backend));
            }
            Ok(Err(err)) => err,
            Err(payload) => InitError::new(format!(
                "initializer panicked: {}",
                panic_message(payload.as_ref())
            )),
        };
        tracing::warn!(backend = %kind, elapsed_ms, error = %err, "graphics backend failed to initialize");
        Err(CandidateFailure::init_failed(kind, err))
    }
}

impl fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendFactory")
            .field("platform", &self.platform)
            .field("candidates", &self.candidates())
            .finish()
    }
}

fn null_initializer() -> Result<Box<dyn GraphicsBackend>, InitError> {
    Ok(Box::new(NullBackend::new()))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
