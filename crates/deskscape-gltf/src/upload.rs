use deskscape_3d::{
    GpuMesh, Material, MaterialParams, Model, TextureSource, create_material,
};
use wgpu::{BindGroupLayout, Device, Queue};

use crate::data::{MaterialData, ModelData};

fn upload_material(
    device: &Device,
    queue: &Queue,
    material_bgl: &BindGroupLayout,
    data: &ModelData,
    material: &MaterialData,
    label: &str,
) -> Material {
    let texture = material
        .base_color_texture
        .and_then(|t| data.textures.get(t))
        .filter(|t| t.rgba.len() as u64 >= 4 * t.width as u64 * t.height as u64)
        .map(|t| TextureSource {
            width: t.width,
            height: t.height,
            rgba: &t.rgba,
        });
    create_material(
        device,
        queue,
        material_bgl,
        &MaterialParams {
            label,
            base_color: material.base_color,
            texture,
            unlit: material.unlit,
            double_sided: material.double_sided,
        },
    )
}

/// Creates vertex/index buffers and material bind groups for every primitive.
/// A default white material is appended for primitives without one.
pub fn upload_model(
    device: &Device,
    queue: &Queue,
    material_bgl: &BindGroupLayout,
    data: &ModelData,
) -> Model {
    let mut materials: Vec<Material> = data
        .materials
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let label = format!("{}_mat{i}", data.name);
            upload_material(device, queue, material_bgl, data, m, &label)
        })
        .collect();
    let default_material = materials.len();
    materials.push(upload_material(
        device,
        queue,
        material_bgl,
        data,
        &MaterialData::default(),
        &format!("{}_default", data.name),
    ));

    let mut meshes = Vec::new();
    let mut mesh_primitives = Vec::with_capacity(data.meshes.len());
    for (mi, mesh) in data.meshes.iter().enumerate() {
        let start = meshes.len();
        for (pi, prim) in mesh.primitives.iter().enumerate() {
            if prim.indices.is_empty() || prim.vertices.is_empty() {
                continue;
            }
            let material_id = prim
                .material
                .filter(|&m| m < default_material)
                .unwrap_or(default_material);
            meshes.push(GpuMesh::new(
                device,
                &format!("{}_{mi}_{pi}", data.name),
                &prim.vertices,
                &prim.indices,
                material_id,
            ));
        }
        mesh_primitives.push(start..meshes.len());
    }

    log::debug!(
        "uploaded {}: {} primitives, {} materials",
        data.name,
        meshes.len(),
        materials.len()
    );

    Model {
        meshes,
        materials,
        mesh_primitives,
    }
}
