//! Clip playback onto scene nodes and joint palettes for skinned draws.

use deskscape_gltf::{AnimationClip, ChannelValues, Interpolation, ModelData, SkinData};
use glam::{Mat4, Quat, Vec3};

use crate::graph::{NodeId, SceneGraph, SkinBinding};
use crate::instance::AssetInstance;

/// Plays one clip on a loop against the nodes of one instance.
pub struct AnimationMixer {
    clip: AnimationClip,
    targets: Vec<Option<NodeId>>,
    time: f32,
}

impl AnimationMixer {
    /// Binds the model's first clip to `instance`. `None` when the model has
    /// no animations.
    pub fn for_first_clip(data: &ModelData, instance: &AssetInstance) -> Option<Self> {
        let clip = data.animations.first()?.clone();
        log::info!(
            "{}: playing clip '{}' ({:.2}s, {} channels)",
            data.name,
            clip.name,
            clip.duration,
            clip.channels.len()
        );
        Some(Self {
            clip,
            targets: instance.nodes.clone(),
            time: 0.0,
        })
    }

    pub fn clip_name(&self) -> &str {
        &self.clip.name
    }

    /// Position within the clip, in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advances by `dt` seconds and writes sampled TRS into the bound nodes.
    pub fn update(&mut self, dt: f32, graph: &mut SceneGraph) {
        self.time = if self.clip.duration > 0.0 {
            (self.time + dt.max(0.0)) % self.clip.duration
        } else {
            0.0
        };
        let t = self.time;
        for channel in &self.clip.channels {
            let Some(Some(node)) = self.targets.get(channel.node) else {
                continue;
            };
            let Some(node) = graph.node_mut(*node) else {
                continue;
            };
            let tf = &mut node.transform;
            match &channel.values {
                ChannelValues::Translation(v) => {
                    if let Some(s) = sample_vec3(&channel.times, v, t, channel.interpolation) {
                        tf.translation = s;
                    }
                }
                ChannelValues::Rotation(v) => {
                    if let Some(s) = sample_quat(&channel.times, v, t, channel.interpolation) {
                        tf.rotation = s;
                    }
                }
                ChannelValues::Scale(v) => {
                    if let Some(s) = sample_vec3(&channel.times, v, t, channel.interpolation) {
                        tf.scale = s;
                    }
                }
            }
        }
    }
}

/// Index of the keyframe at or before `t` and the blend factor toward the next one.
fn locate(times: &[f32], t: f32) -> Option<(usize, usize, f32)> {
    let last = times.len().checked_sub(1)?;
    if t <= times[0] {
        return Some((0, 0, 0.0));
    }
    if t >= times[last] {
        return Some((last, last, 0.0));
    }
    let i = times.partition_point(|&k| k <= t).saturating_sub(1);
    let (t0, t1) = (times[i], times[i + 1]);
    let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    Some((i, i + 1, f))
}

fn sample_vec3(times: &[f32], values: &[Vec3], t: f32, interp: Interpolation) -> Option<Vec3> {
    let (i, j, f) = locate(times, t)?;
    let (a, b) = (*values.get(i)?, *values.get(j)?);
    Some(match interp {
        Interpolation::Step => a,
        Interpolation::Linear => a.lerp(b, f),
    })
}

fn sample_quat(times: &[f32], values: &[Quat], t: f32, interp: Interpolation) -> Option<Quat> {
    let (i, j, f) = locate(times, t)?;
    let (a, b) = (*values.get(i)?, *values.get(j)?);
    Some(match interp {
        Interpolation::Step => a,
        Interpolation::Linear => a.slerp(b, f).normalize(),
    })
}

/// Joint matrices in skin order, relative to the skinned mesh node:
/// inverse(mesh world) * joint world * inverse bind.
pub fn skin_palette(graph: &SceneGraph, mesh_node: NodeId, binding: &SkinBinding, skin: &SkinData) -> Vec<Mat4> {
    let mesh_world = graph.world(mesh_node);
    let inv_mesh = if mesh_world.determinant().abs() > f32::EPSILON {
        mesh_world.inverse()
    } else {
        Mat4::IDENTITY
    };
    binding
        .joints
        .iter()
        .enumerate()
        .map(|(i, &joint)| {
            let ibm = skin.inverse_bind.get(i).copied().unwrap_or(Mat4::IDENTITY);
            inv_mesh * graph.world(joint) * ibm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ModelId, Transform};
    use crate::instance::instantiate;
    use deskscape_gltf::{Channel, NodeData};

    fn animated() -> ModelData {
        let mut bone = NodeData::new("bone");
        bone.translation = Vec3::new(0.0, 5.0, 0.0);
        ModelData {
            name: "typing".to_string(),
            nodes: vec![bone],
            scene_roots: vec![0],
            animations: vec![AnimationClip {
                name: "Typing".to_string(),
                duration: 2.0,
                channels: vec![Channel {
                    node: 0,
                    times: vec![0.0, 2.0],
                    values: ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]),
                    interpolation: Interpolation::Linear,
                }],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn mixer_samples_and_loops() {
        let data = animated();
        let mut graph = SceneGraph::new([0.0; 3]);
        let root = graph.root();
        let inst = instantiate(&mut graph, root, "c", Transform::IDENTITY, ModelId(0), &data);
        let bone = inst.nodes[0].expect("bone");
        let mut mixer = AnimationMixer::for_first_clip(&data, &inst).expect("clip");
        assert_eq!(mixer.clip_name(), "Typing");

        mixer.update(0.5, &mut graph);
        let tr = graph.node(bone).map(|n| n.transform.translation);
        assert_eq!(tr, Some(Vec3::new(0.5, 0.0, 0.0)));

        mixer.update(2.0, &mut graph);
        assert!((mixer.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn no_clip_no_mixer() {
        let mut data = animated();
        data.animations.clear();
        let mut graph = SceneGraph::new([0.0; 3]);
        let root = graph.root();
        let inst = instantiate(&mut graph, root, "c", Transform::IDENTITY, ModelId(0), &data);
        assert!(AnimationMixer::for_first_clip(&data, &inst).is_none());
    }

    #[test]
    fn step_and_clamp_sampling() {
        let times = [1.0, 2.0, 3.0];
        let values = [Vec3::X, Vec3::Y, Vec3::Z];
        assert_eq!(sample_vec3(&times, &values, 0.0, Interpolation::Linear), Some(Vec3::X));
        assert_eq!(sample_vec3(&times, &values, 9.0, Interpolation::Linear), Some(Vec3::Z));
        assert_eq!(sample_vec3(&times, &values, 1.5, Interpolation::Step), Some(Vec3::X));
        assert_eq!(sample_vec3(&[], &[], 1.0, Interpolation::Linear), None);
        let q = sample_quat(&[0.0, 1.0], &[Quat::IDENTITY, Quat::from_rotation_y(1.0)], 0.5, Interpolation::Linear);
        assert!(q.is_some_and(|q| (q.to_axis_angle().1 - 0.5).abs() < 1e-4));
    }

    #[test]
    fn palette_is_identity_in_bind_pose() {
        let mut graph = SceneGraph::new([0.0; 3]);
        let root = graph.root();
        let mesh = graph.add_group(root, "mesh", Transform::from_translation(Vec3::X));
        let joint = graph.add_group(mesh, "joint", Transform::from_translation(Vec3::Y));
        graph.update_world();
        let skin = SkinData {
            joints: vec![0],
            inverse_bind: vec![Mat4::from_translation(-Vec3::Y)],
        };
        let binding = SkinBinding { skin: 0, joints: vec![joint] };
        let palette = skin_palette(&graph, mesh, &binding, &skin);
        assert_eq!(palette.len(), 1);
        assert!(palette[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }
}
