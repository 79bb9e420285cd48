// pipeline.rs — GrayscaleConverter: the whole run, start to finish.
//
//   decode → device → compile → allocate → bind/dispatch/read back
//          → output directory → encode → release
//
// Strictly sequential. The first failing step ends the run. Device buffers
// are released last, after the JPEG is on disk; a release failure still
// turns the result into an error.

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gpu::buffers::DeviceBuffers;
use crate::gpu::device::{DeviceProfile, GpuDevice};
use crate::gpu::kernel::GrayscaleKernel;
use crate::image::PixelBuffer;
use crate::io;

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionReport {
    pub width: u32,
    pub height: u32,
    /// Channels of the decoded input (3 or 4).
    pub channels: u8,
    pub adapter: String,
    pub output: PathBuf,
}

pub struct GrayscaleConverter {
    config: PipelineConfig,
}

impl GrayscaleConverter {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(GrayscaleConverter { config })
    }

    /// Run on the best available GPU.
    pub fn run(&self) -> Result<ConversionReport> {
        self.run_with(GpuDevice::new_with_profile)
    }

    /// Run with a caller-supplied way to acquire the device. The input is
    /// decoded before `acquire` is called.
    pub fn run_with(
        &self,
        acquire: impl FnOnce(DeviceProfile) -> Result<GpuDevice>,
    ) -> Result<ConversionReport> {
        let start = Instant::now();
        let cfg = &self.config;

        info!(path = %cfg.input.display(), "loading image");
        let src = io::load_rgb(&cfg.input)?;

        info!(profile = %cfg.profile, "acquiring compute device");
        let gpu = acquire(cfg.profile)?;
        info!(device = %gpu, "device ready");

        info!("compiling kernel");
        let kernel = GrayscaleKernel::compile(&gpu)?;

        info!(shape = %src, "allocating device buffers");
        let buffers = DeviceBuffers::allocate(&gpu, &src)?;

        info!("executing kernel");
        let gray = kernel.execute(&gpu, &buffers)?;

        save_then_release(cfg, &gray, || buffers.release(&gpu))?;

        let report = ConversionReport {
            width: src.width(),
            height: src.height(),
            channels: src.channels(),
            adapter: gpu.adapter_info.name.clone(),
            output: cfg.output.clone(),
        };
        drop(kernel);
        drop(gpu);

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "conversion finished");
        Ok(report)
    }
}

/// Write the JPEG, then release device resources. A release failure is
/// returned even though the output file is already on disk.
fn save_then_release(
    cfg: &PipelineConfig,
    gray: &PixelBuffer,
    release: impl FnOnce() -> Result<()>,
) -> Result<()> {
    info!(path = %cfg.output.display(), "saving output image");
    io::ensure_parent_dir(&cfg.output)?;
    io::save_gray_jpeg(&cfg.output, gray, cfg.jpeg_quality)?;

    info!("releasing device resources");
    release()
}
