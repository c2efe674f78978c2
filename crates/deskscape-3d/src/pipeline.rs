use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::depth::DEPTH_FORMAT;
use crate::model::Vertex;

/// Must match the array length of `Skin.joints` in `shader.wgsl`.
pub const MAX_JOINTS: usize = 128;

/// Group 0. The camera writes `view_proj`, the renderer writes the lights.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Globals {
    pub view_proj: [[f32; 4]; 4],
    pub lights: LightsUniform,
}

/// Colours are linear and pre-multiplied by intensity. `light_dir` points
/// from the light toward the scene.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightsUniform {
    pub ambient: [f32; 4],
    pub light_dir: [f32; 4],
    pub light_color: [f32; 4],
}

pub const LIGHTS_OFFSET: u64 = std::mem::size_of::<[[f32; 4]; 4]>() as u64;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct NodeUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl NodeUniform {
    pub fn from_world(world: Mat4) -> Self {
        let normal = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            world
        };
        Self {
            model: world.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: unlit
    pub flags: [f32; 4],
}

pub struct Layouts {
    pub globals_bgl: BindGroupLayout,
    pub node_bgl: BindGroupLayout,
    pub material_bgl: BindGroupLayout,
    pub skin_bgl: BindGroupLayout,
}

fn uniform_entry(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn create_bind_group_layouts(device: &Device) -> Layouts {
    let globals_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("globals_bgl"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT)],
    });

    let node_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("node_bgl"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX)],
    });

    let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("material_bgl"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    multisampled: false,
                    view_dimension: TextureViewDimension::D2,
                    sample_type: TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
            uniform_entry(2, ShaderStages::FRAGMENT),
        ],
    });

    let skin_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("skin_bgl"),
        entries: &[uniform_entry(0, ShaderStages::VERTEX)],
    });

    Layouts {
        globals_bgl,
        node_bgl,
        material_bgl,
        skin_bgl,
    }
}

pub struct Pipelines {
    pub culled: RenderPipeline,
    pub double_sided: RenderPipeline,
}

fn build_pipeline(
    device: &Device,
    shader: &ShaderModule,
    layout: &PipelineLayout,
    format: TextureFormat,
    cull_mode: Option<Face>,
    label: &str,
) -> RenderPipeline {
    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::LAYOUT],
        },
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            front_face: FrontFace::Ccw,
            cull_mode,
            ..Default::default()
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: CompareFunction::Less,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState::default(),
        fragment: Some(FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(ColorTargetState {
                format,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

/// Builds both cull variants and the globals uniform they share.
pub fn create_pipeline(
    device: &Device,
    format: TextureFormat,
    layouts: &Layouts,
) -> (Pipelines, BindGroup, Buffer) {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!("shader.wgsl"))),
    });

    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some("scene_pipeline_layout"),
        bind_group_layouts: &[
            &layouts.globals_bgl,
            &layouts.node_bgl,
            &layouts.material_bgl,
            &layouts.skin_bgl,
        ],
        push_constant_ranges: &[],
    });

    let pipelines = Pipelines {
        culled: build_pipeline(
            device,
            &shader,
            &layout,
            format,
            Some(Face::Back),
            "scene_pipeline",
        ),
        double_sided: build_pipeline(
            device,
            &shader,
            &layout,
            format,
            None,
            "scene_pipeline_double_sided",
        ),
    };

    let globals = Globals {
        view_proj: Mat4::IDENTITY.to_cols_array_2d(),
        lights: LightsUniform::default(),
    };
    let globals_buf = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("globals_ubo"),
        contents: bytemuck::bytes_of(&globals),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let globals_bg = device.create_bind_group(&BindGroupDescriptor {
        label: Some("globals_bg"),
        layout: &layouts.globals_bgl,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: globals_buf.as_entire_binding(),
        }],
    });

    (pipelines, globals_bg, globals_buf)
}
