// gpu/mod.rs — wgpu compute layer.
//
// The CPU formula in `convert` is the authoritative reference; the kernel
// here is validated against it pixel-for-pixel.
//
//   device   — adapter selection, profile limits, error-scope capture
//   kernel   — embedded WGSL source, compilation, dispatch
//   buffers  — per-image device buffers, read-back, release

pub mod buffers;
pub mod device;
pub mod kernel;
