use deskscape_3d::Vertex;

use crate::data::{MaterialData, MeshData, ModelData, NodeData, PrimitiveData, TextureData};

/// A `width` x `height` quad centred on the origin in the XY plane, facing +Z.
pub fn plane(width: f32, height: f32) -> PrimitiveData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::rigid([-hw, hh, 0.0], n, [0.0, 0.0]),
        Vertex::rigid([hw, hh, 0.0], n, [1.0, 0.0]),
        Vertex::rigid([-hw, -hh, 0.0], n, [0.0, 1.0]),
        Vertex::rigid([hw, -hh, 0.0], n, [1.0, 1.0]),
    ];
    PrimitiveData::new(vertices, vec![0, 2, 1, 2, 3, 1], Some(0))
}

/// Wraps a plane into a one-node model so it can be instanced like any
/// loaded asset.
pub fn plane_model(
    name: &str,
    width: f32,
    height: f32,
    mut material: MaterialData,
    texture: Option<TextureData>,
) -> ModelData {
    let textures: Vec<TextureData> = texture.into_iter().collect();
    material.base_color_texture = (!textures.is_empty()).then_some(0);
    let mut node = NodeData::new(name);
    node.mesh = Some(0);
    ModelData {
        name: name.to_string(),
        nodes: vec![node],
        scene_roots: vec![0],
        meshes: vec![MeshData {
            name: name.to_string(),
            primitives: vec![plane(width, height)],
        }],
        materials: vec![material],
        textures,
        ..Default::default()
    }
}
