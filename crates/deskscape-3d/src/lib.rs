pub mod depth;
pub mod math;
pub mod model;
pub mod pipeline;
pub mod render;

pub use depth::create_depth;
pub use math::{Aabb, Ray, hex_to_linear, hex_to_rgb, srgb_to_linear};
pub use model::{
    GpuMesh, Material, MaterialParams, Model, TextureSource, Vertex, create_material,
    create_node_ubo, create_skin_ubo, write_node_ubo, write_skin_ubo,
};
pub use pipeline::{Layouts, LightsUniform, MAX_JOINTS, create_bind_group_layouts, create_pipeline};
pub use render::{DrawItem, Renderer3D};
