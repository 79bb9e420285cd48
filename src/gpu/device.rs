// gpu/device.rs — wgpu device abstraction.
//
// Responsibilities:
//   - Enumerate adapters on the primary backends and pick one that can run
//     compute shaders, preferring real hardware.
//   - Expose a `DeviceProfile` for running under tighter limits than the
//     hardware offers (catches oversize dispatches on a dev machine).
//   - Provide `WorkgroupSize`, injected into the kernel through WGSL
//     `override` constants.
//   - Capture wgpu validation / out-of-memory errors around a single call
//     so each pipeline step can report its own failure instead of hitting
//     wgpu's default uncaptured-error panic.
//
// ADAPTER SELECTION:
// `request_adapter` uses power-preference heuristics that happily return a
// software rasterizer (llvmpipe, WARP, SwiftShader) even when a real GPU is
// present. We enumerate explicitly and rank by device type:
//   DiscreteGpu > IntegratedGpu > VirtualGpu / Other > Cpu
// Adapters without compute shader support (some GL downlevels) are skipped.
//
// PLATFORM vs DEVICE:
//   no adapters at all on any backend  → GrayscaleError::Platform
//   adapters, but none can do compute  → GrayscaleError::Device
//   device request refused             → GrayscaleError::Context

use std::collections::HashMap;
use std::fmt;

use crate::error::{GrayscaleError, Result};

/// Hardware profile controlling requested device limits and the default
/// workgroup size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceProfile {
    /// Request the adapter's own limits. No artificial caps.
    #[default]
    Native,
    /// Cap limits to what small embedded GPUs report (256 invocations per
    /// workgroup, 128 MiB storage bindings). wgpu then rejects anything
    /// that would not fit on such a device.
    Constrained,
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProfile::Native => write!(f, "Native"),
            DeviceProfile::Constrained => write!(f, "Constrained (capped limits)"),
        }
    }
}

/// A workgroup size configuration for 2D compute dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkgroupSize {
    pub x: u32,
    pub y: u32,
}

impl WorkgroupSize {
    /// Total invocations per workgroup (x * y).
    pub fn total(&self) -> u32 {
        self.x * self.y
    }

    /// Values for the kernel's `override WORKGROUP_X / WORKGROUP_Y`,
    /// passed to `PipelineCompilationOptions::constants`.
    pub fn as_constants(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("WORKGROUP_X".to_string(), self.x as f64),
            ("WORKGROUP_Y".to_string(), self.y as f64),
        ])
    }

    /// - `Native`: 16×8 = 128 invocations (4 NVIDIA warps, 2 AMD waves).
    /// - `Constrained`: 8×8 = 64, well inside a 256 invocation cap.
    pub fn for_profile(profile: DeviceProfile) -> Self {
        match profile {
            DeviceProfile::Native => WorkgroupSize { x: 16, y: 8 },
            DeviceProfile::Constrained => WorkgroupSize { x: 8, y: 8 },
        }
    }

    /// Workgroups needed to cover a `width`×`height` grid (ceiling division).
    ///
    /// The kernel must guard against out-of-bounds global IDs:
    /// ```wgsl
    /// if gid.x >= width || gid.y >= height { return; }
    /// ```
    pub fn dispatch_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(self.x), height.div_ceil(self.y))
    }
}

impl fmt::Display for WorkgroupSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{} ({} invocations)", self.x, self.y, self.total())
    }
}

/// Adapter description used for selection and logging.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
    /// Whether the adapter can run compute shaders at all.
    pub supports_compute: bool,
}

impl AdapterInfo {
    fn from_adapter(adapter: &wgpu::Adapter) -> Self {
        let raw = adapter.get_info();
        let supports_compute = adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS);
        AdapterInfo {
            name: raw.name,
            device_type: raw.device_type,
            backend: raw.backend,
            supports_compute,
        }
    }

    /// Lower is better. `None` means unusable.
    fn rank(&self) -> Option<u8> {
        if !self.supports_compute {
            return None;
        }
        Some(match self.device_type {
            wgpu::DeviceType::DiscreteGpu => 0,
            wgpu::DeviceType::IntegratedGpu => 1,
            wgpu::DeviceType::VirtualGpu | wgpu::DeviceType::Other => 2,
            wgpu::DeviceType::Cpu => 3,
        })
    }
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Pick the best adapter from `candidates`, or `None` if none can run
/// compute shaders. Ties keep enumeration order.
pub fn select_adapter(candidates: &[AdapterInfo]) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, info)| info.rank().map(|r| (r, i)))
        .min()
        .map(|(_, i)| i)
}

/// The compute context: device, queue, and active profile.
///
/// # Field drop order
/// Rust drops fields top to bottom. `_instance` is declared last so the
/// `wgpu::Instance` outlives `device` and `queue`; some Vulkan layers crash
/// when the instance goes first.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub profile: DeviceProfile,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: WorkgroupSize,
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a `GpuDevice` on the best adapter with `DeviceProfile::Native`.
    pub fn new() -> Result<Self> {
        Self::new_with_profile(DeviceProfile::Native)
    }

    pub fn new_with_profile(profile: DeviceProfile) -> Result<Self> {
        pollster::block_on(Self::init_async(profile))
    }

    async fn init_async(profile: DeviceProfile) -> Result<Self> {
        let flags = if cfg!(debug_assertions) {
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags,
            ..Default::default()
        });

        let mut adapters = instance.enumerate_adapters(wgpu::Backends::PRIMARY);
        if adapters.is_empty() {
            return Err(GrayscaleError::Platform(
                "no adapters found on Vulkan, Metal or DX12".into(),
            ));
        }

        let infos: Vec<AdapterInfo> = adapters.iter().map(AdapterInfo::from_adapter).collect();
        for info in &infos {
            tracing::debug!(adapter = %info, compute = info.supports_compute, "found adapter");
        }

        let index = select_adapter(&infos).ok_or_else(|| {
            GrayscaleError::Device(format!(
                "{} adapter(s) found, none supports compute shaders",
                infos.len()
            ))
        })?;
        let adapter = adapters.swap_remove(index);
        let adapter_info = infos[index].clone();
        if adapter_info.device_type == wgpu::DeviceType::Cpu {
            tracing::warn!(adapter = %adapter_info, "only a software adapter is available");
        }

        let limits = limits_for_profile(profile, adapter.limits());

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gpu-grayscale"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        Ok(GpuDevice {
            device,
            queue,
            profile,
            adapter_info,
            workgroup_size: WorkgroupSize::for_profile(profile),
            _instance: instance,
        })
    }

    /// Workgroups needed to cover an image with the active workgroup size.
    pub fn dispatch_size(&self, width: u32, height: u32) -> (u32, u32) {
        self.workgroup_size.dispatch_size(width, height)
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// wgpu reports most failures asynchronously through error scopes
    /// rather than return values; without a scope they go to the uncaptured
    /// error handler, which panics. The first captured error is returned
    /// alongside `f`'s value.
    pub fn capture_errors<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(out_of_memory))
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, profile: {}, workgroup: {} }}",
            self.adapter_info, self.profile, self.workgroup_size
        )
    }
}

// ============================================================
// Limits
// ============================================================

/// Limits to request for `profile`, given what the adapter supports.
///
/// `Constrained` requests *lower* limits than the hardware has; wgpu
/// validates against the requested values, so oversize work fails here
/// exactly as it would on the small device.
fn limits_for_profile(profile: DeviceProfile, adapter: wgpu::Limits) -> wgpu::Limits {
    match profile {
        DeviceProfile::Native => adapter,
        DeviceProfile::Constrained => wgpu::Limits {
            max_compute_invocations_per_workgroup: 256
                .min(adapter.max_compute_invocations_per_workgroup),
            max_compute_workgroup_size_x: 256.min(adapter.max_compute_workgroup_size_x),
            max_compute_workgroup_size_y: 256.min(adapter.max_compute_workgroup_size_y),
            max_storage_buffer_binding_size: (128 << 20)
                .min(adapter.max_storage_buffer_binding_size),
            max_buffer_size: (128u64 << 20).min(adapter.max_buffer_size),
            ..adapter
        },
    }
}

// ============================================================
// Tests
// ============================================================
