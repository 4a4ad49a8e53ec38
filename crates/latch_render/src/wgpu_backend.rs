//! wgpu-backed initializers
//!
//! Each supported [`BackendKind`] maps to one wgpu API. An initializer opens an
//! instance restricted to that API, picks an adapter and creates a device. Any
//! failure drops whatever was created so far before the error is returned.

use crate::backend::{GraphicsBackend, NativeView, NativeViewHost};
use crate::error::InitError;
use crate::factory::BackendFactory;
use crate::{BackendKind, DeviceCapabilities};
use std::sync::Mutex;

/// wgpu API used for `kind`, if wgpu can drive it.
pub fn wgpu_backends(kind: BackendKind) -> Option<wgpu::Backends> {
    match kind {
        BackendKind::Metal => Some(wgpu::Backends::METAL),
        BackendKind::OpenGL => Some(wgpu::Backends::GL),
        BackendKind::DirectX => Some(wgpu::Backends::DX12),
        BackendKind::ConsoleSpecific | BackendKind::None => None,
    }
}

/// A live wgpu device on a single API.
pub struct WgpuBackend {
    kind: BackendKind,
    info: wgpu::AdapterInfo,
    capabilities: DeviceCapabilities,
    native_view: Mutex<Option<NativeView>>,
    // Drop order: device and queue before the adapter and instance they came from.
    device: wgpu::Device,
    queue: wgpu::Queue,
    _adapter: wgpu::Adapter,
    _instance: wgpu::Instance,
}

impl WgpuBackend {
    /// Blocking: waits on adapter and device requests.
    pub fn new(kind: BackendKind) -> Result<Self, InitError> {
        let backends = wgpu_backends(kind)
            .ok_or_else(|| InitError::new(format!("wgpu cannot drive {kind}")))?;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| InitError::new(format!("no {kind} adapter found")))?;

        let info = adapter.get_info();
        tracing::debug!(backend = %kind, adapter = %info.name, driver = %info.driver, "adapter found");

        // GL adapters rarely meet the full default limits.
        let base_limits = match kind {
            BackendKind::OpenGL => wgpu::Limits::downlevel_webgl2_defaults(),
            _ => wgpu::Limits::default(),
        };

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Latch Device"),
                required_features: wgpu::Features::empty(),
                required_limits: base_limits.using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .map_err(InitError::from_error)?;

        let downlevel = adapter.get_downlevel_capabilities();
        let capabilities = DeviceCapabilities {
            max_texture_size: device.limits().max_texture_dimension_2d,
            supports_compute: downlevel
                .flags
                .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS),
            supports_instancing: true,
        };

        Ok(Self {
            kind,
            info,
            capabilities,
            native_view: Mutex::new(None),
            device,
            queue,
            _adapter: adapter,
            _instance: instance,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }
}

impl NativeViewHost for WgpuBackend {
    fn attach_native_view(&self, view: NativeView) {
        *self
            .native_view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(view);
    }

    fn attached_native_view(&self) -> Option<NativeView> {
        *self
            .native_view
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GraphicsBackend for WgpuBackend {
    fn description(&self) -> String {
        format!("{} ({:?})", self.info.name, self.info.backend)
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn native_view_host(&self) -> Option<&dyn NativeViewHost> {
        // Only Metal renders into a view the engine hands over.
        match self.kind {
            BackendKind::Metal => Some(self),
            _ => None,
        }
    }
}

impl BackendFactory {
    /// Register wgpu initializers for every candidate wgpu can drive.
    ///
    /// Candidates wgpu cannot drive (console, null) keep their current
    /// initializer.
    pub fn with_wgpu_initializers(self) -> Self {
        let kinds: Vec<BackendKind> = self
            .candidates()
            .into_iter()
            .filter(|&kind| wgpu_backends(kind).is_some())
            .collect();

        kinds.into_iter().fold(self, |factory, kind| {
            factory.with_initializer(kind, move || {
                WgpuBackend::new(kind).map(|backend| Box::new(backend) as Box<dyn GraphicsBackend>)
            })
        })
    }
}
