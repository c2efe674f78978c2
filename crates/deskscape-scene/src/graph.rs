use glam::{EulerRot, Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index into a `ModelStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Euler angles in radians, applied in X, Y, Z order.
    pub fn from_scale_position_euler(scale: Vec3, position: Vec3, euler: Vec3) -> Self {
        Self {
            translation: position,
            rotation: Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z),
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    /// Shines from the node's world position toward the origin.
    Directional,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkinBinding {
    pub skin: usize,
    /// Scene nodes for each joint, in skin order.
    pub joints: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh {
        model: ModelId,
        mesh: usize,
        skin: Option<SkinBinding>,
    },
    Light(Light),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world: Mat4,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// World matrix as of the last `SceneGraph::update_world`.
    pub fn world(&self) -> Mat4 {
        self.world
    }
}

/// Arena of nodes under a single root group. Nodes are never removed.
pub struct SceneGraph {
    nodes: Vec<Node>,
    root: NodeId,
    /// Linear RGB clear colour.
    pub background: [f32; 3],
}

impl SceneGraph {
    pub fn new(background: [f32; 3]) -> Self {
        let root = Node {
            name: "Scene".to_string(),
            transform: Transform::IDENTITY,
            kind: NodeKind::Group,
            parent: None,
            children: Vec::new(),
            world: Mat4::IDENTITY,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            background,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Appends a node under `parent`. An unknown parent falls back to the root.
    pub fn add(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: Transform,
        kind: NodeKind,
    ) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            self.root
        };
        let id = NodeId(self.nodes.len());
        let world = self.nodes[parent.0].world * transform.matrix();
        self.nodes.push(Node {
            name: name.into(),
            transform,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            world,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_group(&mut self, parent: NodeId, name: impl Into<String>, transform: Transform) -> NodeId {
        self.add(parent, name, transform, NodeKind::Group)
    }

    pub fn add_light(&mut self, name: impl Into<String>, position: Vec3, light: Light) -> NodeId {
        self.add(
            self.root,
            name,
            Transform::from_translation(position),
            NodeKind::Light(light),
        )
    }

    /// Recomputes every world matrix top-down from the root.
    pub fn update_world(&mut self) {
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &mut self.nodes[id.0];
            node.world = parent_world * node.transform.matrix();
            let world = node.world;
            stack.extend(node.children.iter().map(|&c| (c, world)));
        }
    }

    pub fn world(&self, id: NodeId) -> Mat4 {
        self.node(id).map_or(Mat4::IDENTITY, |n| n.world)
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world(id).w_axis.truncate()
    }

    /// `id` and everything below it, depth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.node(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n.0].children.iter().rev());
        }
        out
    }

    /// True when `ancestor` is `id` itself or any of its parents.
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.node(n).and_then(|node| node.parent);
        }
        false
    }

    pub fn lights(&self) -> impl Iterator<Item = (NodeId, &Light)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match &n.kind {
            NodeKind::Light(light) => Some((NodeId(i), light)),
            _ => None,
        })
    }

    pub fn meshes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Mesh { .. }))
            .map(|(i, n)| (NodeId(i), n))
    }
}
