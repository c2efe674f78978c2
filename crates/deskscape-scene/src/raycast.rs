use deskscape_3d::Ray;
use glam::Vec3;

use crate::graph::{NodeId, NodeKind, SceneGraph};
use crate::instance::ModelStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub node: NodeId,
    /// Along the world ray, in units of its direction.
    pub distance: f32,
    pub point: Vec3,
}

/// Intersects `ray` with every mesh at or below `root`, nearest hit first.
/// Uses world matrices from the last `update_world`. Skinned meshes are
/// tested in bind pose.
pub fn raycast_subtree(graph: &SceneGraph, models: &ModelStore, root: NodeId, ray: &Ray) -> Vec<Hit> {
    let mut hits = Vec::new();
    for id in graph.descendants(root) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let NodeKind::Mesh { model, mesh, .. } = &node.kind else {
            continue;
        };
        let Some(mesh) = models.get(*model).and_then(|m| m.meshes.get(*mesh).map(|mesh| (m, mesh))) else {
            continue;
        };
        let (data, mesh) = mesh;
        let world = node.world();
        if world.determinant().abs() <= f32::EPSILON {
            continue;
        }
        let local = ray.transformed(&world.inverse());

        let mut nearest: Option<f32> = None;
        for prim in &mesh.primitives {
            if local.intersect_aabb(&prim.bounds).is_none() {
                continue;
            }
            let double_sided = prim
                .material
                .and_then(|m| data.materials.get(m))
                .is_some_and(|m| m.double_sided);
            for [a, b, c] in prim.triangles() {
                if let Some(t) = local.intersect_triangle(a, b, c, !double_sided)
                    && nearest.is_none_or(|n| t < n)
                {
                    nearest = Some(t);
                }
            }
        }
        if let Some(t) = nearest {
            hits.push(Hit {
                node: id,
                distance: t,
                point: ray.at(t),
            });
        }
    }
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Transform;
    use crate::instance::instantiate;
    use deskscape_gltf::{MaterialData, plane_model};
    use std::sync::Arc;

    fn scene_with_planes(double_sided: bool) -> (SceneGraph, ModelStore, NodeId, NodeId) {
        let mut graph = SceneGraph::new([0.0; 3]);
        let mut store = ModelStore::new();
        let data = plane_model(
            "plane",
            2.0,
            2.0,
            MaterialData {
                double_sided,
                ..Default::default()
            },
            None,
        );
        let id = store.insert(Arc::new(data.clone()));
        let root = graph.root();
        let group = graph.add_group(root, "screens", Transform::IDENTITY);
        let near = instantiate(&mut graph, group, "near", Transform::from_translation(Vec3::Z * 2.0), id, &data);
        instantiate(&mut graph, group, "far", Transform::IDENTITY, id, &data);
        graph.update_world();
        (graph, store, group, near.root)
    }

    #[test]
    fn hits_are_sorted_by_distance() {
        let (graph, store, group, _) = scene_with_planes(false);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hits = raycast_subtree(&graph, &store, group, &ray);
        assert_eq!(hits.len(), 2);
        assert!((hits[0].distance - 8.0).abs() < 1e-5);
        assert!((hits[1].distance - 10.0).abs() < 1e-5);
        assert!((hits[0].point - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn only_the_requested_subtree_is_tested() {
        let (graph, store, _, near_root) = scene_with_planes(false);
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let hits = raycast_subtree(&graph, &store, near_root, &ray);
        assert_eq!(hits.len(), 1);
        assert!(graph.is_descendant_of(hits[0].node, near_root));
    }

    #[test]
    fn back_faces_need_double_sided_material() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -10.0), Vec3::Z);
        let (graph, store, group, _) = scene_with_planes(false);
        assert!(raycast_subtree(&graph, &store, group, &ray).is_empty());
        let (graph, store, group, _) = scene_with_planes(true);
        assert_eq!(raycast_subtree(&graph, &store, group, &ray).len(), 2);
    }

    #[test]
    fn miss_returns_nothing() {
        let (graph, store, group, _) = scene_with_planes(false);
        let ray = Ray::new(Vec3::new(5.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(raycast_subtree(&graph, &store, group, &ray).is_empty());
    }
}
