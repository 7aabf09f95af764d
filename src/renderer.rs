//! GPU backend: runs the compositor shader over a window surface or an
//! offscreen target.

use std::sync::Arc;

use tracing::{info, warn};
use wgpu::{CompositeAlphaMode, InstanceDescriptor, SurfaceTarget};

use crate::error::RenderError;
use crate::params::{CompositorUniforms, ShaderParams};
use crate::pipeline::{
    create_compositor_pipeline, create_layer_bind_group_layout, create_uniform_bind_group,
    create_uniform_bind_group_layout, create_uniform_buffer,
};
use crate::texture_manager::TextureManager;
use crate::texture_set::TextureSet;

mod construction;
mod readback;
mod rendering;
mod surface;

pub(crate) use readback::bgra_to_argb32;

/// Pixel format of the surface and of every readback.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

pub struct Renderer<'a> {
    /// Size of the render target in physical pixels
    pub(crate) physical_size: (u32, u32),

    // WGPU components
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'a>>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    uniforms: CompositorUniforms,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    layer_bind_group_layout: wgpu::BindGroupLayout,
    layer_bind_group: wgpu::BindGroup,

    texture_manager: TextureManager,

    // Cached offscreen target and readback buffer, recreated on size change
    rtb_offscreen_texture: Option<wgpu::Texture>,
    rtb_readback_buffer: Option<wgpu::Buffer>,
    rtb_cached_size: (u32, u32),
    readback_bytes: Vec<u8>,
}
