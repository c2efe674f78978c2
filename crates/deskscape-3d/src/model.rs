use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::pipeline::{MAX_JOINTS, MaterialUniform, NodeUniform};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub nrm: [f32; 3],
    pub uv: [f32; 2],
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Uint32x4,
            4 => Float32x4
        ],
    };

    /// A vertex bound entirely to joint 0, which is the identity for unskinned
    /// meshes.
    pub fn rigid(pos: [f32; 3], nrm: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            pos,
            nrm,
            uv,
            joints: [0; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

pub struct GpuMesh {
    pub vbuf: Buffer,
    pub ibuf: Buffer,
    pub index_count: u32,
    pub material_id: usize,
}

impl GpuMesh {
    pub fn new(
        device: &Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
        material_id: usize,
    ) -> Self {
        let vbuf = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some(&format!("{label}_vbuf")),
            contents: bytemuck::cast_slice(vertices),
            usage: BufferUsages::VERTEX,
        });
        let ibuf = device.create_buffer_init(&util::BufferInitDescriptor {
            label: Some(&format!("{label}_ibuf")),
            contents: bytemuck::cast_slice(indices),
            usage: BufferUsages::INDEX,
        });
        Self {
            vbuf,
            ibuf,
            index_count: indices.len() as u32,
            material_id,
        }
    }
}

pub struct Material {
    pub bind_group: BindGroup,
    pub uniform_buf: Buffer,
    pub texture: Texture,
    pub double_sided: bool,
}

/// Borrowed RGBA8 pixels for a material's base colour texture.
#[derive(Clone, Copy)]
pub struct TextureSource<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

pub struct MaterialParams<'a> {
    pub label: &'a str,
    pub base_color: [f32; 4],
    pub texture: Option<TextureSource<'a>>,
    pub unlit: bool,
    pub double_sided: bool,
}

const WHITE_PIXEL: [u8; 4] = [255, 255, 255, 255];

pub fn create_material(
    device: &Device,
    queue: &Queue,
    material_bgl: &BindGroupLayout,
    params: &MaterialParams,
) -> Material {
    let source = params.texture.unwrap_or(TextureSource {
        width: 1,
        height: 1,
        rgba: &WHITE_PIXEL,
    });
    let size = Extent3d {
        width: source.width.max(1),
        height: source.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(&format!("{}_base_color", params.label)),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: Origin3d::ZERO,
            aspect: TextureAspect::All,
        },
        source.rgba,
        TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * size.width),
            rows_per_image: Some(size.height),
        },
        size,
    );
    let view = texture.create_view(&TextureViewDescriptor::default());
    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some("material_sampler"),
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        ..Default::default()
    });

    let uniform = MaterialUniform {
        base_color: params.base_color,
        flags: [if params.unlit { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
    };
    let uniform_buf = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some(&format!("{}_material_ubo", params.label)),
        contents: bytemuck::bytes_of(&uniform),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&BindGroupDescriptor {
        label: Some(&format!("{}_material_bg", params.label)),
        layout: material_bgl,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&view),
            },
            BindGroupEntry {
                binding: 1,
                resource: BindingResource::Sampler(&sampler),
            },
            BindGroupEntry {
                binding: 2,
                resource: uniform_buf.as_entire_binding(),
            },
        ],
    });

    Material {
        bind_group,
        uniform_buf,
        texture,
        double_sided: params.double_sided,
    }
}

/// GPU side of one loaded model. `meshes` holds one entry per primitive;
/// `mesh_primitives[i]` is the range of `meshes` belonging to source mesh `i`.
pub struct Model {
    pub meshes: Vec<GpuMesh>,
    pub materials: Vec<Material>,
    pub mesh_primitives: Vec<Range<usize>>,
}

impl Model {
    pub fn primitives(&self, mesh: usize) -> &[GpuMesh] {
        self.mesh_primitives
            .get(mesh)
            .and_then(|range| self.meshes.get(range.clone()))
            .unwrap_or(&[])
    }

    pub fn material(&self, mesh: &GpuMesh) -> Option<&Material> {
        self.materials
            .get(mesh.material_id)
            .or_else(|| self.materials.last())
    }
}

pub fn create_node_ubo(device: &Device, node_bgl: &BindGroupLayout) -> (Buffer, BindGroup) {
    let uniform = NodeUniform::from_world(Mat4::IDENTITY);
    let buf = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("node_ubo"),
        contents: bytemuck::bytes_of(&uniform),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let bg = device.create_bind_group(&BindGroupDescriptor {
        label: Some("node_bg"),
        layout: node_bgl,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: buf.as_entire_binding(),
        }],
    });
    (buf, bg)
}

pub fn write_node_ubo(queue: &Queue, buf: &Buffer, world: Mat4) {
    queue.write_buffer(buf, 0, bytemuck::bytes_of(&NodeUniform::from_world(world)));
}

pub fn create_skin_ubo(device: &Device, skin_bgl: &BindGroupLayout) -> (Buffer, BindGroup) {
    let palette = [Mat4::IDENTITY.to_cols_array_2d(); MAX_JOINTS];
    let buf = device.create_buffer_init(&util::BufferInitDescriptor {
        label: Some("skin_ubo"),
        contents: bytemuck::cast_slice(&palette),
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
    });
    let bg = device.create_bind_group(&BindGroupDescriptor {
        label: Some("skin_bg"),
        layout: skin_bgl,
        entries: &[BindGroupEntry {
            binding: 0,
            resource: buf.as_entire_binding(),
        }],
    });
    (buf, bg)
}

/// Uploads a joint palette. Joints past `MAX_JOINTS` are dropped.
pub fn write_skin_ubo(queue: &Queue, buf: &Buffer, palette: &[Mat4]) {
    let cols: Vec<[[f32; 4]; 4]> = palette
        .iter()
        .take(MAX_JOINTS)
        .map(Mat4::to_cols_array_2d)
        .collect();
    if !cols.is_empty() {
        queue.write_buffer(buf, 0, bytemuck::cast_slice(&cols));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_stride_matches_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 64);
        assert_eq!(Vertex::LAYOUT.array_stride, 64);
    }

    #[test]
    fn rigid_vertex_binds_joint_zero() {
        let v = Vertex::rigid([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5]);
        assert_eq!(v.joints, [0; 4]);
        assert_eq!(v.weights, [1.0, 0.0, 0.0, 0.0]);
    }
}
