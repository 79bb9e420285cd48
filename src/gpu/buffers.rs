// gpu/buffers.rs — Device buffers for one conversion.
//
// Four buffers per run:
//   input     STORAGE          packed RGB(A) bytes as u32 words
//   output    STORAGE|COPY_SRC one u32 per pixel (dense, no atomics)
//   readback  MAP_READ|COPY_DST host-visible copy of `output`
//   params    UNIFORM          width, height, channels
//
// Sizes are checked against the device limits before anything is created;
// an oversize image becomes `GrayscaleError::BufferAlloc` rather than a
// validation panic inside wgpu.
//
// READBACK
// `map_async` only registers the request. `device.poll(Maintain::Wait)`
// blocks until the queue drains and the callback has fired. The callback's
// channel closing without a value means the queue never finished the work.

use std::sync::mpsc;

use wgpu::util::DeviceExt;

use crate::error::{GrayscaleError, Result};
use crate::gpu::device::GpuDevice;
use crate::gpu::kernel::{GrayscaleKernel, KernelParams};
use crate::image::PixelBuffer;

/// Bytes per output element on the device (one u32 per pixel).
const OUTPUT_BYTES_PER_PIXEL: u64 = std::mem::size_of::<u32>() as u64;

/// wgpu buffers backing one kernel dispatch.
pub struct DeviceBuffers {
    pub(crate) input: wgpu::Buffer,
    pub(crate) output: wgpu::Buffer,
    pub(crate) readback: wgpu::Buffer,
    pub(crate) params: wgpu::Buffer,
    pub(crate) output_size: u64,
    pub width: u32,
    pub height: u32,
}

impl DeviceBuffers {
    /// Upload `src` and allocate the output and staging buffers.
    pub fn allocate(gpu: &GpuDevice, src: &PixelBuffer) -> Result<Self> {
        let channels = src.channels();
        if !(3..=4).contains(&channels) {
            return Err(GrayscaleError::BufferAlloc {
                label: "input",
                size: src.as_slice().len() as u64,
                reason: format!("kernel reads RGB or RGBA, got {channels} channel(s)"),
            });
        }

        let input_bytes = pad_to_words(src.as_slice());
        let input_size = input_bytes.len() as u64;
        let output_size = src.pixel_count() as u64 * OUTPUT_BYTES_PER_PIXEL;

        let limits = gpu.device.limits();
        check_storage_size(&limits, "input", input_size)?;
        check_storage_size(&limits, "output", output_size)?;

        let input = create_checked(gpu, "input", input_size, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("DeviceBuffers::input"),
                contents: &input_bytes,
                usage: wgpu::BufferUsages::STORAGE,
            })
        })?;

        let output = create_checked(gpu, "output", output_size, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("DeviceBuffers::output"),
                size: output_size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })?;

        let readback = create_checked(gpu, "readback", output_size, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("DeviceBuffers::readback"),
                size: output_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let params = KernelParams {
            width: src.width(),
            height: src.height(),
            channels: channels as u32,
            _pad: 0,
        };
        let params_size = std::mem::size_of::<KernelParams>() as u64;
        let params = create_checked(gpu, "params", params_size, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("DeviceBuffers::params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        })?;

        tracing::debug!(input_size, output_size, "device buffers allocated");
        Ok(DeviceBuffers {
            input,
            output,
            readback,
            params,
            output_size,
            width: src.width(),
            height: src.height(),
        })
    }

    /// Bind input, output and params to the kernel's layout.
    pub fn bind(&self, gpu: &GpuDevice, kernel: &GrayscaleKernel) -> Result<wgpu::BindGroup> {
        let (bind_group, scope_err) = gpu.capture_errors(|| {
            gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("GrayscaleKernel BG"),
                layout: kernel.bind_group_layout(),
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: self.input.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 1, resource: self.output.as_entire_binding() },
                    wgpu::BindGroupEntry { binding: 2, resource: self.params.as_entire_binding() },
                ],
            })
        });
        match scope_err {
            Some(e) => Err(GrayscaleError::ArgBind(e.to_string())),
            None => Ok(bind_group),
        }
    }

    /// Block until the dispatched work finishes and copy the luma values
    /// out of the staging buffer.
    pub fn read_back(&self, gpu: &GpuDevice) -> Result<PixelBuffer> {
        let slice = self.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            // The receiver only goes away if read_back already returned.
            let _ = tx.send(r);
        });
        gpu.device.poll(wgpu::Maintain::Wait);

        let mapped = rx
            .recv()
            .map_err(|_| GrayscaleError::Queue("map callback never fired".into()))?;
        mapped?;

        let view = slice.get_mapped_range();
        // Mapped ranges are at least 8-byte aligned; size = pixels * 4.
        let words: &[u32] = bytemuck::cast_slice(&view);
        let gray: Vec<u8> = words.iter().map(|&v| v.min(255) as u8).collect();
        drop(view);
        self.readback.unmap();

        Ok(PixelBuffer::from_vec(self.width, self.height, 1, gray))
    }

    /// Destroy every buffer now instead of waiting for drop.
    pub fn release(self, gpu: &GpuDevice) -> Result<()> {
        let ((), scope_err) = gpu.capture_errors(|| {
            self.input.destroy();
            self.output.destroy();
            self.readback.destroy();
            self.params.destroy();
        });
        match scope_err {
            Some(e) => Err(GrayscaleError::Cleanup(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Copy `bytes`, zero-padding the tail to a whole number of u32 words.
fn pad_to_words(bytes: &[u8]) -> Vec<u8> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT as usize;
    let mut padded = Vec::with_capacity(bytes.len().next_multiple_of(align));
    padded.extend_from_slice(bytes);
    padded.resize(bytes.len().next_multiple_of(align), 0);
    padded
}

fn check_storage_size(limits: &wgpu::Limits, label: &'static str, size: u64) -> Result<()> {
    let max = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if size > max {
        return Err(GrayscaleError::BufferAlloc {
            label,
            size,
            reason: format!("exceeds the device limit of {max} bytes"),
        });
    }
    Ok(())
}

fn create_checked(
    gpu: &GpuDevice,
    label: &'static str,
    size: u64,
    create: impl FnOnce(&wgpu::Device) -> wgpu::Buffer,
) -> Result<wgpu::Buffer> {
    let (buffer, scope_err) = gpu.capture_errors(|| create(&gpu.device));
    match scope_err {
        Some(e) => Err(GrayscaleError::BufferAlloc { label, size, reason: e.to_string() }),
        None => Ok(buffer),
    }
}
