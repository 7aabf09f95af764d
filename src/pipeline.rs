//! Render pipeline for the compositor pass.
//!
//! A single fullscreen triangle runs `compositor.wgsl` once per pixel. Group 0
//! holds the uniform block, group 1 every layer texture in
//! [`TextureRole`](crate::texture_set::TextureRole) order followed by the clamp
//! and repeat samplers.

use wgpu::util::DeviceExt;
use wgpu::{BindGroupLayout, Device};

use crate::params::CompositorUniforms;
use crate::texture_set::TextureRole;

/// Vertex shader drawing a fullscreen triangle (3 vertices, no vertex buffer).
/// UV origin is the top-left corner.
pub(crate) const FULLSCREEN_TRIANGLE_VS: &str = r#"
struct QuadOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_quad(@builtin(vertex_index) vi: u32) -> QuadOutput {
    let uv = vec2<f32>(f32((vi << 1u) & 2u), f32(vi & 2u));
    var out: QuadOutput;
    out.position = vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
    out.uv = vec2<f32>(uv.x, 1.0 - uv.y);
    return out;
}
"#;

pub(crate) const COMPOSITOR_FS: &str = include_str!("compositor.wgsl");

/// Binding of the clamp-to-edge sampler in the layer group.
pub(crate) const CLAMP_SAMPLER_BINDING: u32 = TextureRole::ALL.len() as u32;
/// Binding of the repeat sampler in the layer group.
pub(crate) const REPEAT_SAMPLER_BINDING: u32 = CLAMP_SAMPLER_BINDING + 1;

pub(crate) fn build_compositor_wgsl() -> String {
    format!("{FULLSCREEN_TRIANGLE_VS}\n{COMPOSITOR_FS}")
}

pub fn create_uniform_bind_group_layout(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("compositor_uniform_bind_group_layout"),
    })
}

pub fn create_layer_bind_group_layout(device: &Device) -> BindGroupLayout {
    let mut entries: Vec<wgpu::BindGroupLayoutEntry> = TextureRole::ALL
        .iter()
        .map(|role| wgpu::BindGroupLayoutEntry {
            binding: role.binding(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        })
        .collect();

    for binding in [CLAMP_SAMPLER_BINDING, REPEAT_SAMPLER_BINDING] {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &entries,
        label: Some("compositor_layer_bind_group_layout"),
    })
}

pub fn create_uniform_buffer(device: &Device, uniforms: &CompositorUniforms) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("compositor_uniform_buffer"),
        contents: bytemuck::cast_slice(&[*uniforms]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn create_uniform_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("compositor_uniform_bind_group"),
    })
}

/// The compositor writes premultiplied colour over a cleared target.
pub fn create_compositor_pipeline(
    device: &Device,
    format: wgpu::TextureFormat,
    uniform_bind_group_layout: &BindGroupLayout,
    layer_bind_group_layout: &BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("compositor_shader"),
        source: wgpu::ShaderSource::Wgsl(build_compositor_wgsl().into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("compositor_pipeline_layout"),
        bind_group_layouts: &[uniform_bind_group_layout, layer_bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("compositor_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_quad"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_compositor"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
