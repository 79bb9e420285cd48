// gpu/kernel.rs — The embedded RGB → luma compute kernel.
//
// COMPILATION
// ───────────
// The WGSL source is a compile-time constant. Shader module creation runs
// inside an error scope; if naga rejects the source, the compilation
// messages are collected into a `BuildLog` (bounded, with the number of
// dropped bytes recorded) and returned as `GrayscaleError::Compile`.
//
// DISPATCH
// ────────
// One work item per pixel over a (width, height) grid, rounded up to whole
// workgroups. Dense output (one u32 per pixel) is copied into a MAP_READ
// staging buffer in the same command encoder as the compute pass, so a
// single submit covers both.

use std::fmt;

use crate::error::{GrayscaleError, Result};
use crate::gpu::buffers::DeviceBuffers;
use crate::gpu::device::GpuDevice;
use crate::image::PixelBuffer;

/// WGSL source of the grayscale kernel.
pub const KERNEL_SOURCE: &str = include_str!("../shaders/rgb_to_gray.wgsl");

/// Entry point inside [`KERNEL_SOURCE`].
pub const KERNEL_ENTRY_POINT: &str = "rgb_to_gray";

/// Default cap on the compiler diagnostic log, in bytes.
pub const BUILD_LOG_CAPACITY: usize = 4096;

// ---------------------------------------------------------------------------
// BuildLog
// ---------------------------------------------------------------------------

/// Compiler diagnostics, capped at a fixed number of bytes.
///
/// Text past the cap is dropped, but the number of dropped bytes is kept
/// and shown when the log is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLog {
    text: String,
    capacity: usize,
    truncated: usize,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::with_capacity(BUILD_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BuildLog { text: String::new(), capacity, truncated: 0 }
    }

    /// Collect every message of a shader module's compilation info, one
    /// line each, as `line:col: kind: message`.
    pub fn from_compilation_info(info: &wgpu::CompilationInfo) -> Self {
        let mut log = Self::new();
        for msg in &info.messages {
            let kind = match msg.message_type {
                wgpu::CompilationMessageType::Error => "error",
                wgpu::CompilationMessageType::Warning => "warning",
                wgpu::CompilationMessageType::Info => "info",
            };
            match &msg.location {
                Some(loc) => log.push_line(&format!(
                    "{}:{}: {kind}: {}",
                    loc.line_number, loc.line_position, msg.message
                )),
                None => log.push_line(&format!("{kind}: {}", msg.message)),
            }
        }
        log
    }

    /// Append `line` and a newline, keeping at most `capacity` bytes.
    pub fn push_line(&mut self, line: &str) {
        for piece in [line, "\n"] {
            let room = self.capacity.saturating_sub(self.text.len());
            if piece.len() <= room && self.truncated == 0 {
                self.text.push_str(piece);
                continue;
            }
            // Cut on a char boundary so the log stays valid UTF-8.
            let mut cut = room.min(piece.len());
            while !piece.is_char_boundary(cut) {
                cut -= 1;
            }
            if self.truncated == 0 {
                self.text.push_str(&piece[..cut]);
            } else {
                cut = 0;
            }
            self.truncated += piece.len() - cut;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.truncated == 0
    }

    /// Bytes dropped because the log was full.
    pub fn truncated_bytes(&self) -> usize {
        self.truncated
    }
}

impl Default for BuildLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BuildLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim_end())?;
        if self.truncated > 0 {
            write!(f, "\n... [{} more bytes truncated]", self.truncated)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Uniform params (must match WGSL struct Params exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct KernelParams {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub _pad: u32,
}

// ---------------------------------------------------------------------------
// GrayscaleKernel
// ---------------------------------------------------------------------------

/// The compiled grayscale pipeline.
///
/// Create once per device; [`run`](Self::run) converts one image.
pub struct GrayscaleKernel {
    pipeline: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl GrayscaleKernel {
    /// Compile [`KERNEL_SOURCE`] for `gpu`.
    pub fn compile(gpu: &GpuDevice) -> Result<Self> {
        Self::from_source(gpu, KERNEL_SOURCE)
    }

    pub(crate) fn from_source(gpu: &GpuDevice, source: &str) -> Result<Self> {
        let (shader, scope_err) = gpu.capture_errors(|| {
            gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("rgb_to_gray.wgsl"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });

        let info = pollster::block_on(shader.get_compilation_info());
        let has_errors = info
            .messages
            .iter()
            .any(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error));
        if has_errors || scope_err.is_some() {
            let mut log = BuildLog::from_compilation_info(&info);
            if let Some(e) = scope_err {
                if log.is_empty() {
                    log.push_line(&e.to_string());
                }
            }
            if log.truncated_bytes() > 0 {
                tracing::warn!(dropped = log.truncated_bytes(), "compiler log truncated");
            }
            return Err(GrayscaleError::Compile { log });
        }

        let kernel_err = |reason: String| GrayscaleError::KernelCreate {
            entry_point: KERNEL_ENTRY_POINT.to_string(),
            reason,
        };

        let ((bgl, pipeline), scope_err) = gpu.capture_errors(|| {
            let bgl = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GrayscaleKernel BGL"),
                entries: &[
                    // 0 — packed RGB(A) words
                    storage_entry(0, true),
                    // 1 — dense luma output
                    storage_entry(1, false),
                    // 2 — params uniform
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

            let layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("GrayscaleKernel pipeline layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

            let constants = gpu.workgroup_size.as_constants();
            let pipeline = gpu.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(KERNEL_ENTRY_POINT),
                layout: Some(&layout),
                module: &shader,
                entry_point: KERNEL_ENTRY_POINT,
                compilation_options: wgpu::PipelineCompilationOptions {
                    constants: &constants,
                    ..Default::default()
                },
                cache: None,
            });
            (bgl, pipeline)
        });
        if let Some(e) = scope_err {
            return Err(kernel_err(e.to_string()));
        }

        tracing::debug!(workgroup = %gpu.workgroup_size, "kernel compiled");
        Ok(GrayscaleKernel { pipeline, bgl })
    }

    pub(crate) fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bgl
    }

    /// Record the compute pass plus the output → staging copy and submit.
    pub fn dispatch(
        &self,
        gpu: &GpuDevice,
        bind_group: &wgpu::BindGroup,
        buffers: &DeviceBuffers,
    ) -> Result<()> {
        let (wg_x, wg_y) = gpu.dispatch_size(buffers.width, buffers.height);
        check_grid(&gpu.device.limits(), (wg_x, wg_y))?;

        let ((), scope_err) = gpu.capture_errors(|| {
            let mut encoder = gpu.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor { label: Some("GrayscaleKernel dispatch") },
            );
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(KERNEL_ENTRY_POINT),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.dispatch_workgroups(wg_x, wg_y, 1);
            }
            encoder.copy_buffer_to_buffer(
                &buffers.output,
                0,
                &buffers.readback,
                0,
                buffers.output_size,
            );
            gpu.queue.submit(std::iter::once(encoder.finish()));
        });
        match scope_err {
            Some(e) => Err(GrayscaleError::Dispatch(e.to_string())),
            None => {
                tracing::debug!(wg_x, wg_y, "kernel dispatched");
                Ok(())
            }
        }
    }

    /// Bind, dispatch and read back with already allocated buffers.
    pub fn execute(&self, gpu: &GpuDevice, buffers: &DeviceBuffers) -> Result<PixelBuffer> {
        let bind_group = buffers.bind(gpu, self)?;
        self.dispatch(gpu, &bind_group, buffers)?;
        buffers.read_back(gpu)
    }

    /// Convert one RGB(A) image: allocate, execute, release.
    pub fn run(&self, gpu: &GpuDevice, src: &PixelBuffer) -> Result<PixelBuffer> {
        let buffers = DeviceBuffers::allocate(gpu, src)?;
        let gray = self.execute(gpu, &buffers)?;
        buffers.release(gpu)?;
        Ok(gray)
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Reject a workgroup grid the device cannot launch in one dispatch.
fn check_grid(limits: &wgpu::Limits, (wg_x, wg_y): (u32, u32)) -> Result<()> {
    let max = limits.max_compute_workgroups_per_dimension;
    if wg_x > max || wg_y > max {
        return Err(GrayscaleError::Dispatch(format!(
            "grid of {wg_x}×{wg_y} workgroups exceeds the per-dimension limit of {max}"
        )));
    }
    Ok(())
}
