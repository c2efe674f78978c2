use std::sync::Arc;

use deskscape_gltf::ModelData;

use crate::graph::{ModelId, NodeId, NodeKind, SceneGraph, SkinBinding, Transform};

/// CPU copies of every model placed in the scene, shared with the GPU sync
/// and the picker.
#[derive(Default)]
pub struct ModelStore {
    models: Vec<Arc<ModelData>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, data: Arc<ModelData>) -> ModelId {
        self.models.push(data);
        ModelId(self.models.len() - 1)
    }

    pub fn get(&self, id: ModelId) -> Option<&Arc<ModelData>> {
        self.models.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelId, &Arc<ModelData>)> + '_ {
        self.models.iter().enumerate().map(|(i, m)| (ModelId(i), m))
    }
}

/// One placed copy of a model.
#[derive(Debug, Clone)]
pub struct AssetInstance {
    pub model: ModelId,
    /// Group carrying the placement transform.
    pub root: NodeId,
    /// Scene node for each model node; `None` for nodes outside the model's
    /// scene.
    pub nodes: Vec<Option<NodeId>>,
}

impl AssetInstance {
    /// Scene node created for the model's `index`-th top-level node.
    pub fn scene_root(&self, graph: &SceneGraph, index: usize) -> Option<NodeId> {
        graph.node(self.root)?.children().get(index).copied()
    }
}

/// Copies the model's node hierarchy under a new group attached to `parent`.
pub fn instantiate(
    graph: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    transform: Transform,
    model: ModelId,
    data: &ModelData,
) -> AssetInstance {
    let root = graph.add_group(parent, name, transform);
    let mut nodes = vec![None; data.nodes.len()];

    let mut stack: Vec<(usize, NodeId)> = data.scene_roots.iter().rev().map(|&n| (n, root)).collect();
    while let Some((index, parent)) = stack.pop() {
        let Some(src) = data.nodes.get(index) else {
            log::warn!("{}: node {index} out of range", data.name);
            continue;
        };
        if nodes[index].is_some() {
            continue;
        }
        let kind = match src.mesh {
            Some(mesh) => NodeKind::Mesh {
                model,
                mesh,
                skin: None,
            },
            None => NodeKind::Group,
        };
        let id = graph.add(
            parent,
            src.name.clone(),
            Transform {
                translation: src.translation,
                rotation: src.rotation,
                scale: src.scale,
            },
            kind,
        );
        nodes[index] = Some(id);
        stack.extend(src.children.iter().rev().map(|&c| (c, id)));
    }

    // Joints may sit outside the skinned node's branch.
    for (index, src) in data.nodes.iter().enumerate() {
        let (Some(skin), Some(id)) = (src.skin, nodes[index]) else {
            continue;
        };
        let Some(skin_data) = data.skins.get(skin) else {
            continue;
        };
        let joints: Option<Vec<NodeId>> = skin_data
            .joints
            .iter()
            .map(|&j| nodes.get(j).copied().flatten())
            .collect();
        let Some(joints) = joints else {
            log::warn!("{}: skin {skin} references joints outside the scene", data.name);
            continue;
        };
        if let Some(node) = graph.node_mut(id)
            && let NodeKind::Mesh { skin: binding, .. } = &mut node.kind
        {
            *binding = Some(SkinBinding { skin, joints });
        }
    }

    AssetInstance { model, root, nodes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskscape_gltf::{NodeData, SkinData};
    use glam::{Mat4, Vec3};

    fn two_level() -> ModelData {
        let mut top = NodeData::new("top");
        top.children = vec![1];
        let mut screen = NodeData::new("screen");
        screen.translation = Vec3::new(0.0, 1.0, 0.0);
        screen.mesh = Some(0);
        screen.skin = Some(0);
        ModelData {
            name: "monitor".to_string(),
            nodes: vec![top, screen, NodeData::new("orphan")],
            scene_roots: vec![0],
            skins: vec![SkinData {
                joints: vec![0],
                inverse_bind: vec![Mat4::IDENTITY],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn hierarchy_is_copied_under_placement_group() {
        let data = two_level();
        let mut graph = SceneGraph::new([0.0; 3]);
        let mut store = ModelStore::new();
        let model = store.insert(Arc::new(data.clone()));
        let placement = Transform::from_scale_position_euler(Vec3::splat(2.0), Vec3::X, Vec3::ZERO);
        let scene_root = graph.root();
        let inst = instantiate(&mut graph, scene_root, "monitor", placement, model, &data);
        graph.update_world();

        assert_eq!(graph.node(inst.root).map(|n| n.transform), Some(placement));
        assert!(graph.is_descendant_of(inst.root, scene_root));
        let top = inst.scene_root(&graph, 0);
        assert_eq!(top, inst.nodes[0]);
        let screen = inst.nodes[1].expect("screen instanced");
        assert_eq!(graph.world_position(screen), Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(inst.nodes[2], None);
    }

    #[test]
    fn skins_bind_to_scene_joints() {
        let data = two_level();
        let mut graph = SceneGraph::new([0.0; 3]);
        let scene_root = graph.root();
        let inst = instantiate(&mut graph, scene_root, "m", Transform::IDENTITY, ModelId(0), &data);
        let screen = inst.nodes[1].expect("screen instanced");
        match &graph.node(screen).expect("node").kind {
            NodeKind::Mesh { skin: Some(b), .. } => assert_eq!(b.joints, vec![inst.nodes[0].expect("top")]),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
