//! wgpu compute backend for the path tracer.
//!
//! A compute kernel sums samples into a storage buffer; a fullscreen blit
//! averages, exposes and tone maps it onto the window surface.

mod gpu;
mod shaders;

pub use gpu::{PresentableImage, WgpuBackend};
pub use shaders::WORKGROUP_SIZE;
