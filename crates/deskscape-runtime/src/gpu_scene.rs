use std::collections::HashMap;

use deskscape_3d::{
    DrawItem, Layouts, Model, create_node_ubo, create_skin_ubo, write_node_ubo, write_skin_ubo,
};
use deskscape_gltf::upload_model;
use deskscape_scene::{NodeId, NodeKind, skin_palette};
use wgpu::{BindGroup, Buffer, Device, Queue};

use crate::view::OfficeView;

struct NodeGpu {
    buf: Buffer,
    bind_group: BindGroup,
    skin: Option<(Buffer, BindGroup)>,
}

/// GPU mirror of an `OfficeView`: uploaded models and per-node uniforms.
/// Grows as the view places assets; nothing is ever released early.
#[derive(Default)]
pub struct GpuScene {
    models: Vec<Model>,
    nodes: HashMap<NodeId, NodeGpu>,
}

impl GpuScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads models placed since the last call and rewrites every node
    /// transform and joint palette.
    pub fn sync(&mut self, device: &Device, queue: &Queue, layouts: &Layouts, view: &OfficeView) {
        for (id, data) in view.models().iter().skip(self.models.len()) {
            log::debug!("uploading model {} ({})", id.0, data.name);
            self.models
                .push(upload_model(device, queue, &layouts.material_bgl, data));
        }

        let graph = view.graph();
        for (id, node) in graph.meshes() {
            let NodeKind::Mesh { model, skin, .. } = &node.kind else {
                continue;
            };
            let gpu = self.nodes.entry(id).or_insert_with(|| {
                let (buf, bind_group) = create_node_ubo(device, &layouts.node_bgl);
                let skin = skin
                    .as_ref()
                    .map(|_| create_skin_ubo(device, &layouts.skin_bgl));
                NodeGpu {
                    buf,
                    bind_group,
                    skin,
                }
            });
            write_node_ubo(queue, &gpu.buf, node.world());

            if let (Some(binding), Some((skin_buf, _))) = (skin, &gpu.skin)
                && let Some(skin_data) = view
                    .models()
                    .get(*model)
                    .and_then(|m| m.skins.get(binding.skin))
            {
                let palette = skin_palette(graph, id, binding, skin_data);
                write_skin_ubo(queue, skin_buf, &palette);
            }
        }
    }

    pub fn draw_items<'a>(&'a self, view: &OfficeView) -> Vec<DrawItem<'a>> {
        let mut items = Vec::new();
        for (id, node) in view.graph().meshes() {
            let NodeKind::Mesh { model, mesh, .. } = &node.kind else {
                continue;
            };
            let (Some(gpu_model), Some(gpu_node)) = (self.models.get(model.0), self.nodes.get(&id))
            else {
                continue;
            };
            for prim in gpu_model.primitives(*mesh) {
                let Some(material) = gpu_model.material(prim) else {
                    continue;
                };
                items.push(DrawItem {
                    mesh: prim,
                    material,
                    node_bg: &gpu_node.bind_group,
                    skin_bg: gpu_node.skin.as_ref().map(|(_, bg)| bg),
                });
            }
        }
        items
    }
}
