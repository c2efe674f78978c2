pub mod animation;
pub mod graph;
pub mod instance;
pub mod raycast;

pub use animation::{AnimationMixer, skin_palette};
pub use graph::{
    Light, LightKind, ModelId, Node, NodeId, NodeKind, SceneGraph, SkinBinding, Transform,
};
pub use instance::{AssetInstance, ModelStore, instantiate};
pub use raycast::{Hit, raycast_subtree};
