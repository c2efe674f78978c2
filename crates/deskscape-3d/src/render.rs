use crate::depth::create_depth;
use crate::model::{GpuMesh, Material, create_skin_ubo};
use crate::pipeline::{LIGHTS_OFFSET, Layouts, LightsUniform, Pipelines, create_pipeline};
use wgpu::*;

/// One indexed draw: a primitive, its material, the node transform and an
/// optional joint palette. Draws without a palette use the identity skin.
pub struct DrawItem<'a> {
    pub mesh: &'a GpuMesh,
    pub material: &'a Material,
    pub node_bg: &'a BindGroup,
    pub skin_bg: Option<&'a BindGroup>,
}

pub struct Renderer3D {
    pub pipelines: Pipelines,
    pub depth_view: TextureView,
    pub depth_tex: Texture,
    pub globals_bg: BindGroup,
    pub globals_buf: Buffer,
    pub identity_skin_bg: BindGroup,
    pub identity_skin_buf: Buffer,
    pub clear_color: Color,
}

impl Renderer3D {
    pub fn new(
        device: &Device,
        surface_format: TextureFormat,
        width: u32,
        height: u32,
        layouts: &Layouts,
    ) -> Self {
        let (depth_view, depth_tex) = create_depth(device, width, height);

        let (pipelines, globals_bg, globals_buf) = create_pipeline(device, surface_format, layouts);

        let (identity_skin_buf, identity_skin_bg) = create_skin_ubo(device, &layouts.skin_bgl);

        Self {
            pipelines,
            depth_view,
            depth_tex,
            globals_bg,
            globals_buf,
            identity_skin_bg,
            identity_skin_buf,
            clear_color: Color::BLACK,
        }
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        let (dv, dt) = create_depth(device, width, height);
        self.depth_view = dv;
        self.depth_tex = dt;
    }

    /// `rgb` is linear.
    pub fn set_clear_color(&mut self, rgb: [f32; 3]) {
        self.clear_color = Color {
            r: rgb[0] as f64,
            g: rgb[1] as f64,
            b: rgb[2] as f64,
            a: 1.0,
        };
    }

    pub fn write_lights(&self, queue: &Queue, lights: &LightsUniform) {
        queue.write_buffer(&self.globals_buf, LIGHTS_OFFSET, bytemuck::bytes_of(lights));
    }

    pub fn render(&self, encoder: &mut CommandEncoder, target_view: &TextureView, items: &[DrawItem]) {
        let mut r_pass = encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: target_view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(self.clear_color),
                    store: StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(Operations {
                    load: LoadOp::Clear(1.0),
                    store: StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        r_pass.set_bind_group(0, &self.globals_bg, &[]);

        for item in items {
            let pipeline = if item.material.double_sided {
                &self.pipelines.double_sided
            } else {
                &self.pipelines.culled
            };
            r_pass.set_pipeline(pipeline);
            r_pass.set_bind_group(1, item.node_bg, &[]);
            r_pass.set_bind_group(2, &item.material.bind_group, &[]);
            r_pass.set_bind_group(3, item.skin_bg.unwrap_or(&self.identity_skin_bg), &[]);
            r_pass.set_vertex_buffer(0, item.mesh.vbuf.slice(..));
            r_pass.set_index_buffer(item.mesh.ibuf.slice(..), IndexFormat::Uint32);
            r_pass.draw_indexed(0..item.mesh.index_count, 0, 0..1);
        }
    }
}
