//! CPU-side model data, independent of any GPU device.
//!
//! A `ModelData` mirrors the parts of a glTF document the scene needs: the
//! node hierarchy with local TRS, triangle meshes split into primitives,
//! materials, decoded textures, skins and animation clips. Node, mesh,
//! material and texture references are plain indices into the owning
//! `ModelData`.

use deskscape_3d::{Aabb, Vertex};
use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub name: String,
    pub nodes: Vec<NodeData>,
    /// Top-level nodes of the default scene, in document order.
    pub scene_roots: Vec<usize>,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
    pub textures: Vec<TextureData>,
    pub skins: Vec<SkinData>,
    pub animations: Vec<AnimationClip>,
}

impl ModelData {
    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| &m.primitives)
            .map(|p| p.indices.len() / 3)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

impl NodeData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            mesh: None,
            skin: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub primitives: Vec<PrimitiveData>,
}

#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
    pub bounds: Aabb,
}

impl PrimitiveData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>, material: Option<usize>) -> Self {
        let bounds = Aabb::from_points(vertices.iter().map(|v| Vec3::from(v.pos)));
        Self {
            vertices,
            indices,
            material,
            bounds,
        }
    }

    /// Bind-pose triangles. Triangles with out-of-range indices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let p = |i: u32| self.vertices.get(i as usize).map(|v| Vec3::from(v.pos));
            Some([p(tri[0])?, p(tri[1])?, p(tri[2])?])
        })
    }
}

#[derive(Debug, Clone)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub base_color_texture: Option<usize>,
    pub double_sided: bool,
    pub unlit: bool,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: String::from("default"),
            base_color: [1.0; 4],
            base_color_texture: None,
            double_sided: false,
            unlit: false,
        }
    }
}

/// Tightly packed RGBA8 pixels, top row first.
#[derive(Clone, Default)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for TextureData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureData")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SkinData {
    /// Node index of each joint, in palette order.
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Debug, Clone)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub node: usize,
    pub times: Vec<f32>,
    pub values: ChannelValues,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, Default)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_bounds_and_triangles() {
        let verts = vec![
            Vertex::rigid([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex::rigid([2.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex::rigid([0.0, 3.0, -1.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        let prim = PrimitiveData::new(verts, vec![0, 1, 2, 0, 1, 9], None);
        assert_eq!(prim.bounds.min, Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(prim.bounds.max, Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(prim.triangles().count(), 1);
    }
}
