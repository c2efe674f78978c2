pub mod data;
pub mod load;
pub mod primitives;
pub mod upload;

pub use data::{
    AnimationClip, Channel, ChannelValues, Interpolation, MaterialData, MeshData, ModelData,
    NodeData, PrimitiveData, SkinData, TextureData,
};
pub use load::{decode_image, load_image, load_model, parse_model, percent, read_with_progress};
pub use primitives::{plane, plane_model};
pub use upload::upload_model;
