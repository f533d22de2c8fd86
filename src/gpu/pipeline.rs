//! Render pipelines for part meshes: the opaque and translucent colour
//! passes and the R32Uint picking pass.
//!
//! Bind groups:
//! - 0: camera uniform
//! - 1: material (diffuse texture, sampler, [`MaterialUniform`])
//! - 2: per-draw uniform at a dynamic offset (colour passes only)

use wgpu::util::DeviceExt;

use super::render_context::RenderContext;
use super::shader_composer::{Shader, ShaderComposer};
use super::texture::Texture;
use crate::catalog::Material;
use crate::error::ViewerError;
use crate::mesh::gpu_mesh::{ATTRIB_SLOT, COLOR_INDEX_SLOT};

/// Floats per vertex the part shaders read: position xyz, texcoord uv,
/// normal xyz.
pub const VERTEX_CHANNELS: usize = 8;

/// Format of the picking target.
pub const PICKING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Uint;

/// Depth format shared by every pass.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const PART_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x2,
    2 => Float32x3,
];

const COLOR_INDEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![
    3 => Float32,
];

/// Interleaved part vertex layout (slot [`ATTRIB_SLOT`]).
pub fn part_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (VERTEX_CHANNELS * size_of::<f32>()) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &PART_ATTRIBUTES,
    }
}

/// Per-vertex part ID layout (slot [`COLOR_INDEX_SLOT`]).
pub fn color_index_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: size_of::<f32>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &COLOR_INDEX_ATTRIBUTES,
    }
}

/// Depth state; translucent draws test against depth but do not write it.
pub fn depth_stencil_state(write: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: write,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Material constants; matches `Material` in `part_mesh.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Ambient colour (rgb, a unused).
    pub ambient: [f32; 4],
    /// Specular colour (rgb, a unused).
    pub specular: [f32; 4],
    /// x: shininess exponent.
    pub params: [f32; 4],
}

impl MaterialUniform {
    /// Constants for `material`; a missing material gets a dim ambient term
    /// and no highlight.
    pub fn from_material(material: Option<&Material>) -> Self {
        material.map_or(
            Self {
                ambient: [0.1, 0.1, 0.1, 0.0],
                specular: [0.0; 4],
                params: [1.0, 0.0, 0.0, 0.0],
            },
            |m| {
                let [ar, ag, ab] = m.ambient_rgb();
                let [sr, sg, sb] = m.specular_rgb();
                Self {
                    ambient: [ar, ag, ab, 0.0],
                    specular: [sr, sg, sb, 0.0],
                    params: [m.shininess, 0.0, 0.0, 0.0],
                }
            },
        )
    }
}

/// Layout and sampler for material bind groups (group 1).
pub struct MaterialBinding {
    /// Layout of group 1.
    pub layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl MaterialBinding {
    /// Create the layout and the shared trilinear sampler.
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self { layout, sampler }
    }

    /// Bind group pairing `texture` with `material`'s constants.
    pub fn bind_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        texture: &Texture,
        material: Option<&Material>,
    ) -> wgpu::BindGroup {
        let uniform = MaterialUniform::from_material(material);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Material")),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Material Bind Group")),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
        })
    }
}

/// Bind group layouts a [`PartPipelines`] is built against.
pub struct PipelineLayouts<'a> {
    /// Group 0.
    pub camera: &'a wgpu::BindGroupLayout,
    /// Group 1.
    pub material: &'a wgpu::BindGroupLayout,
    /// Group 2.
    pub draw: &'a wgpu::BindGroupLayout,
}

/// The three part-mesh pipelines.
pub struct PartPipelines {
    /// Depth-writing, unblended.
    pub opaque: wgpu::RenderPipeline,
    /// Alpha-blended, depth-tested without writes.
    pub translucent: wgpu::RenderPipeline,
    /// Part IDs into [`PICKING_FORMAT`].
    pub picking: wgpu::RenderPipeline,
}

impl PartPipelines {
    /// Build every pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Shader`] if a shader fails to compose.
    pub fn new(
        context: &RenderContext,
        layouts: &PipelineLayouts<'_>,
        composer: &mut ShaderComposer,
    ) -> Result<Self, ViewerError> {
        let device = &context.device;
        let color_shader = composer.compose(device, Shader::PartMesh)?;
        let color_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Part Mesh Pipeline Layout"),
            bind_group_layouts: &[layouts.camera, layouts.material, layouts.draw],
            push_constant_ranges: &[],
        });

        let opaque = color_pipeline(
            device,
            "Opaque Part Pipeline",
            &color_layout,
            &color_shader,
            context.format(),
            false,
        );
        let translucent = color_pipeline(
            device,
            "Translucent Part Pipeline",
            &color_layout,
            &color_shader,
            context.format(),
            true,
        );

        let picking_shader = composer.compose(device, Shader::PickingPart)?;
        let picking_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Picking Part Pipeline Layout"),
            bind_group_layouts: &[layouts.camera],
            push_constant_ranges: &[],
        });
        let picking = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Picking Part Pipeline"),
            layout: Some(&picking_layout),
            vertex: wgpu::VertexState {
                module: &picking_shader,
                entry_point: Some("vs_main"),
                buffers: &vertex_buffers(),
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &picking_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: PICKING_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_stencil_state(true)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            opaque,
            translucent,
            picking,
        })
    }
}

/// Slot 0 attributes, slot 1 part IDs. The colour pipelines only read
/// slot 0.
fn vertex_buffers() -> [wgpu::VertexBufferLayout<'static>; 2] {
    debug_assert_eq!(ATTRIB_SLOT, 0);
    debug_assert_eq!(COLOR_INDEX_SLOT, 1);
    [part_vertex_layout(), color_index_layout()]
}

fn color_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    translucent: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[part_vertex_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: translucent.then_some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            // Anatomy meshes are not consistently wound.
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(depth_stencil_state(!translucent)),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
