//! Graphics bootstrap coordinator
//!
//! Runs backend selection exactly once and publishes the outcome through a
//! [`ReadinessGate`]. Every consumer, on any thread, goes through
//! [`BootstrapCoordinator::await_ready`] before touching the backend.

use crate::backend::{BackendHandle, NativeView};
use crate::error::{BootstrapError, ProtocolMisuse};
use crate::factory::BackendFactory;
use crate::gate::ReadinessGate;
use crate::BackendKind;
use once_cell::sync::Lazy;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Outcome of bootstrap: the active backend, or every reason there isn't one.
pub type BootstrapResult = Result<BackendHandle, BootstrapError>;

const WORKER_NAME: &str = "latch-gfx-bootstrap";

/// What a call to [`BootstrapCoordinator::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Bootstrap was already running or finished; nothing happened.
    AlreadyStarted,
}

/// Cheap to clone; clones share the same bootstrap.
#[derive(Debug, Clone, Default)]
pub struct BootstrapCoordinator {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    started: AtomicBool,
    gate: ReadinessGate<BootstrapResult>,
}

impl BootstrapCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run selection on a dedicated worker thread and return immediately.
    ///
    /// Only the first call does anything; later calls return
    /// [`StartOutcome::AlreadyStarted`] and drop their factory unused. If the
    /// worker cannot be spawned, selection runs on the calling thread instead.
    pub fn start(&self, factory: BackendFactory, forced: Option<BackendKind>) -> StartOutcome {
        self.start_with(factory, forced, |work| {
            thread::Builder::new()
                .name(WORKER_NAME.to_string())
                .spawn(work)
                .map(drop)
        })
    }

    fn start_with<S>(
        &self,
        factory: BackendFactory,
        forced: Option<BackendKind>,
        spawn: S,
    ) -> StartOutcome
    where
        S: FnOnce(Box<dyn FnOnce() + Send>) -> io::Result<()>,
    {
        if !self.claim() {
            tracing::debug!("graphics bootstrap already started");
            return StartOutcome::AlreadyStarted;
        }

        // The job stays reachable from here so a failed spawn can still run it.
        let job: Arc<Mutex<Option<Job>>> = Arc::new(Mutex::new(Some((factory, forced))));
        let worker_job = Arc::clone(&job);
        let inner = Arc::clone(&self.inner);
        let work = Box::new(move || {
            if let Some((factory, forced)) = take_job(&worker_job) {
                inner.execute(factory, forced);
            }
        });

        if let Err(err) = spawn(work) {
            tracing::warn!(error = %err, "failed to spawn graphics bootstrap thread, running inline");
            if let Some((factory, forced)) = take_job(&job) {
                self.inner.execute(factory, forced);
            }
        }
        StartOutcome::Started
    }

    /// Same as [`start`](Self::start) but runs selection on the calling thread.
    pub fn run(&self, factory: BackendFactory, forced: Option<BackendKind>) -> StartOutcome {
        if !self.claim() {
            tracing::debug!("graphics bootstrap already started");
            return StartOutcome::AlreadyStarted;
        }
        self.inner.execute(factory, forced);
        StartOutcome::Started
    }

    fn claim(&self) -> bool {
        self.inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_published()
    }

    /// Published result, if any, without blocking.
    pub fn try_ready(&self) -> Option<&BootstrapResult> {
        self.inner.gate.try_get()
    }

    /// Block until the result is published.
    ///
    /// Fails only if bootstrap was never started, in which case waiting would
    /// never end.
    pub fn try_await_ready(&self) -> Result<&BootstrapResult, ProtocolMisuse> {
        if !self.is_started() {
            return Err(ProtocolMisuse::AwaitBeforeStart);
        }
        Ok(self.inner.gate.wait())
    }

    /// Block until the result is published, then return it.
    ///
    /// # Panics
    ///
    /// If called before [`start`](Self::start) or [`run`](Self::run).
    pub fn await_ready(&self) -> &BootstrapResult {
        match self.try_await_ready() {
            Ok(result) => result,
            Err(misuse) => panic!("{misuse}"),
        }
    }

    pub fn current_handle(&self) -> Result<&BackendHandle, BootstrapError> {
        self.await_ready().as_ref().map_err(Clone::clone)
    }

    pub fn backend_kind(&self) -> Result<BackendKind, BootstrapError> {
        self.current_handle().map(BackendHandle::kind)
    }

    /// Whether the active backend is OpenGL-family. Waits for readiness.
    pub fn is_opengl(&self) -> Result<bool, BootstrapError> {
        self.current_handle().map(BackendHandle::is_opengl_family)
    }

    /// Attach an engine-owned view once the backend is ready.
    ///
    /// `Ok(false)` means the backend has no use for a native view.
    pub fn attach_native_view(&self, view: NativeView) -> Result<bool, BootstrapError> {
        self.current_handle()
            .map(|handle| handle.try_native_view_attachment(view))
    }
}

impl Inner {
    fn execute(&self, factory: BackendFactory, forced: Option<BackendKind>) {
        tracing::info!(
            platform = ?factory.platform(),
            candidates = ?factory.candidates(),
            "choosing graphics backend"
        );

        let result = factory.select(forced);
        match &result {
            Ok(handle) => tracing::info!(
                backend = %handle.kind(),
                device = %handle.description(),
                "graphics backend ready"
            ),
            Err(err) => tracing::error!(error = %err, "graphics bootstrap failed"),
        }

        if let Err(misuse) = self.gate.publish(result) {
            panic!("{misuse}");
        }
    }
}

type Job = (BackendFactory, Option<BackendKind>);

fn take_job(job: &Mutex<Option<Job>>) -> Option<Job> {
    job.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take()
}

static GRAPHICS: Lazy<BootstrapCoordinator> = Lazy::new(BootstrapCoordinator::new);

/// Process-wide coordinator.
pub fn graphics() -> &'static BootstrapCoordinator {
    &GRAPHICS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GraphicsBackend, NativeViewHost, NullBackend};
    use crate::error::InitError;
    use crate::factory::Platform;
    use crate::DeviceCapabilities;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{mpsc, Barrier};
    use std::time::Duration;

    #[derive(Default)]
    struct MetalDouble {
        attached: Mutex<Option<NativeView>>,
    }

    impl NativeViewHost for MetalDouble {
        fn attach_native_view(&self, view: NativeView) {
            *self.attached.lock().unwrap() = Some(view);
        }

        fn attached_native_view(&self) -> Option<NativeView> {
            *self.attached.lock().unwrap()
        }
    }

    impl GraphicsBackend for MetalDouble {
        fn description(&self) -> String {
            "metal double".to_string()
        }

        fn capabilities(&self) -> DeviceCapabilities {
            DeviceCapabilities::default()
        }

        fn native_view_host(&self) -> Option<&dyn NativeViewHost> {
            Some(self)
        }
    }

    fn null_backend() -> Result<Box<dyn GraphicsBackend>, InitError> {
        Ok(Box::new(NullBackend::new()))
    }

    #[test]
    fn start_twice_runs_initializers_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let factory = |runs: Arc<AtomicUsize>| {
            BackendFactory::new(Platform::Linux).with_initializer(BackendKind::OpenGL, move || {
                runs.fetch_add(1, Ordering::SeqCst);
                null_backend()
            })
        };

        let coordinator = BootstrapCoordinator::new();
        assert_eq!(coordinator.start(factory(runs.clone()), None), StartOutcome::Started);
        assert_eq!(
            coordinator.start(factory(runs.clone()), None),
            StartOutcome::AlreadyStarted
        );
        let first = coordinator.await_ready().as_ref().unwrap() as *const BackendHandle;

        assert_eq!(
            coordinator.run(factory(runs.clone()), Some(BackendKind::None)),
            StartOutcome::AlreadyStarted
        );
        let again = coordinator.await_ready().as_ref().unwrap() as *const BackendHandle;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(first, again);
        assert_eq!(coordinator.backend_kind(), Ok(BackendKind::OpenGL));
    }

    #[test]
    fn every_waiter_sees_the_same_handle() {
        let (release, hold) = mpsc::channel::<()>();
        let factory = BackendFactory::new(Platform::Linux).with_initializer(
            BackendKind::OpenGL,
            move || {
                hold.recv().map_err(InitError::from_error)?;
                null_backend()
            },
        );

        let coordinator = BootstrapCoordinator::new();
        coordinator.start(factory, None);

        let early_waiters = 8;
        let parked = Barrier::new(early_waiters + 1);

        let seen: Vec<usize> = thread::scope(|s| {
            let early: Vec<_> = (0..early_waiters)
                .map(|_| {
                    s.spawn(|| {
                        parked.wait();
                        let handle = coordinator.current_handle().unwrap();
                        handle as *const BackendHandle as usize
                    })
                })
                .collect();

            parked.wait();
            thread::sleep(Duration::from_millis(20));
            assert!(!coordinator.is_ready());
            release.send(()).unwrap();

            let late: Vec<_> = (0..8)
                .map(|_| {
                    let c = coordinator.clone();
                    s.spawn(move || {
                        let handle = c.current_handle().unwrap();
                        handle as *const BackendHandle as usize
                    })
                })
                .collect();

            early
                .into_iter()
                .chain(late)
                .map(|h| h.join().unwrap())
                .collect()
        });

        let expected = coordinator.current_handle().unwrap() as *const BackendHandle as usize;
        assert_eq!(seen.len(), 16);
        assert!(seen.iter().all(|&p| p == expected));
    }

    #[test]
    fn spawn_failure_runs_bootstrap_inline() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let factory = BackendFactory::new(Platform::Linux).with_initializer(
            BackendKind::OpenGL,
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                null_backend()
            },
        );

        let coordinator = BootstrapCoordinator::new();
        let outcome = coordinator.start_with(factory, None, |_work| {
            Err(io::Error::new(io::ErrorKind::Other, "thread limit reached"))
        });

        assert_eq!(outcome, StartOutcome::Started);
        assert!(coordinator.is_ready());
        assert_eq!(coordinator.backend_kind(), Ok(BackendKind::OpenGL));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawned_work_runs_the_job_once() {
        let coordinator = BootstrapCoordinator::new();
        let outcome = coordinator.start_with(
            BackendFactory::new(Platform::Headless),
            None,
            |work| {
                work();
                Ok(())
            },
        );

        assert_eq!(outcome, StartOutcome::Started);
        assert_eq!(coordinator.backend_kind(), Ok(BackendKind::None));
    }

    #[test]
    fn failure_is_published_to_everyone() {
        let factory = BackendFactory::new(Platform::MacOs)
            .with_initializer(BackendKind::Metal, || Err(InitError::new("no driver")))
            .with_initializer(BackendKind::OpenGL, || Err(InitError::new("permission denied")));

        let coordinator = BootstrapCoordinator::new();
        coordinator.start(factory, None);

        let errors: Vec<BootstrapError> = thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| coordinator.current_handle().unwrap_err()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let text = errors[0].to_string();
        assert!(text.contains("Metal: no driver, OpenGL: permission denied"));
        assert!(errors.iter().all(|e| *e == errors[0]));
        assert_eq!(coordinator.is_opengl(), Err(errors[0].clone()));
    }

    #[test]
    #[should_panic(expected = "awaited before bootstrap was started")]
    fn await_without_start_is_fatal() {
        BootstrapCoordinator::new().await_ready();
    }

    #[test]
    fn try_await_reports_misuse() {
        let coordinator = BootstrapCoordinator::new();
        assert!(!coordinator.is_started());
        assert!(matches!(
            coordinator.try_await_ready(),
            Err(ProtocolMisuse::AwaitBeforeStart)
        ));
        assert!(coordinator.try_ready().is_none());
    }

    #[test]
    fn run_publishes_before_returning() {
        let coordinator = BootstrapCoordinator::new();
        coordinator.run(
            BackendFactory::new(Platform::Headless).with_headless_fallback(),
            None,
        );
        assert!(coordinator.is_ready());
        assert_eq!(coordinator.backend_kind(), Ok(BackendKind::None));
    }

    #[test]
    fn native_view_reaches_metal_backend() {
        let factory = BackendFactory::new(Platform::Ios).with_initializer(BackendKind::Metal, || {
            Ok(Box::new(MetalDouble::default()) as Box<dyn GraphicsBackend>)
        });

        let coordinator = BootstrapCoordinator::new();
        coordinator.start(factory, None);

        assert_eq!(coordinator.is_opengl(), Ok(false));
        assert_eq!(coordinator.attach_native_view(NativeView::from_raw(0x1000)), Ok(true));
        let handle = coordinator.current_handle().unwrap();
        assert_eq!(handle.attached_native_view(), Some(NativeView::from_raw(0x1000)));
    }

    #[test]
    fn native_view_is_ignored_by_opengl() {
        let coordinator = BootstrapCoordinator::new();
        coordinator.run(
            BackendFactory::new(Platform::Android)
                .with_initializer(BackendKind::OpenGL, null_backend),
            None,
        );

        assert_eq!(coordinator.is_opengl(), Ok(true));
        assert_eq!(coordinator.attach_native_view(NativeView::from_raw(0x1000)), Ok(false));
    }

    #[test]
    fn forced_failure_names_only_that_backend() {
        let coordinator = BootstrapCoordinator::new();
        coordinator.run(
            BackendFactory::new(Platform::Windows)
                .with_initializer(BackendKind::DirectX, null_backend)
                .with_initializer(BackendKind::OpenGL, || Err(InitError::new("no context"))),
            Some(BackendKind::OpenGL),
        );

        let err = coordinator.current_handle().unwrap_err();
        assert_eq!(err.forced, Some(BackendKind::OpenGL));
        assert!(!err.to_string().contains("DirectX"));
    }

    #[test]
    fn global_coordinator_is_shared() {
        assert!(std::ptr::eq(graphics(), graphics()));
    }
}
