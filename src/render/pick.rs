//! CPU ray picking against the scene graph.
//!
//! A pointer position becomes normalized device coordinates, the coordinates
//! are unprojected through the camera into a world-space ray, and the ray is
//! tested against every mesh under a subtree: bounding box first, then each
//! triangle. Hits come back sorted nearest first.

use super::camera::PerspectiveCamera;
use crate::scene::{NodeId, SceneGraph};
use glam::{Vec2, Vec3};

/// Pointer position in window pixels, origin top left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

/// Drawable area in the same pixel units as `PointerSample`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Screen position in [-1, 1] on both axes, +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedDeviceCoordinate(pub Vec2);

impl NormalizedDeviceCoordinate {
    /// Screen Y grows downward, device Y grows upward.
    pub fn from_pointer(sample: PointerSample, viewport: Viewport) -> Self {
        Self(Vec2::new(
            (sample.x / viewport.width) * 2.0 - 1.0,
            -(sample.y / viewport.height) * 2.0 + 1.0,
        ))
    }

    pub fn x(&self) -> f32 {
        self.0.x
    }

    pub fn y(&self) -> f32 {
        self.0.y
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRay {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl PickRay {
    /// Ray from the camera position through the near-plane point under `ndc`.
    pub fn from_camera(ndc: NormalizedDeviceCoordinate, camera: &PerspectiveCamera) -> Self {
        let inverse = camera.view_proj().inverse();
        let near_point = inverse.project_point3(Vec3::new(ndc.x(), ndc.y(), 0.0));
        let direction = (near_point - camera.position)
            .try_normalize()
            .unwrap_or_else(|| camera.forward());
        Self {
            origin: camera.position,
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// World-space distance from the ray origin.
    pub distance: f32,
    pub point: Vec3,
    pub node: NodeId,
}

/// Hits sorted nearest first; empty on a miss.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntersectionResult {
    hits: Vec<PickHit>,
}

impl IntersectionResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn nearest(&self) -> Option<&PickHit> {
        self.hits.first()
    }

    pub fn hits(&self) -> &[PickHit] {
        &self.hits
    }
}

/// Intersect `ray` with every mesh under `root`, descending through all children.
pub fn intersect_subtree(ray: &PickRay, graph: &SceneGraph, root: NodeId) -> IntersectionResult {
    let mut hits = Vec::new();
    graph.visit_meshes(root, |node, mesh, world| {
        let world_bounds = mesh.bounds.transformed(world);
        if world_bounds.intersect_ray(ray.origin, ray.direction).is_none() {
            return;
        }
        // Test in local space, measure in world space.
        let inverse = world.inverse();
        let local_origin = inverse.transform_point3(ray.origin);
        let local_direction = inverse.transform_vector3(ray.direction);
        for index in 0..mesh.triangle_count() {
            let Some(triangle) = mesh.triangle(index) else {
                continue;
            };
            if let Some(t) = intersect_triangle(local_origin, local_direction, &triangle) {
                let point = world.transform_point3(local_origin + local_direction * t);
                hits.push(PickHit {
                    distance: ray.origin.distance(point),
                    point,
                    node,
                });
            }
        }
    });
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    IntersectionResult { hits }
}

/// Möller–Trumbore, both faces. Returns the ray parameter of the hit.
fn intersect_triangle(origin: Vec3, direction: Vec3, [a, b, c]: &[Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let edge1 = *b - *a;
    let edge2 = *c - *a;
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - *a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    (t > EPSILON).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::tests::cuboid;
    use crate::scene::{NodeKind, Transform};

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_deg: 45.0,
            aspect: 1920.0 / 1080.0,
            near: 1.0,
            far: 3000.0,
        }
    }

    #[test]
    fn ndc_maps_viewport_edges_exactly() {
        let viewport = Viewport::new(1920, 1080);
        let at = |x, y| NormalizedDeviceCoordinate::from_pointer(PointerSample { x, y }, viewport);
        assert_eq!(at(0.0, 0.0).0, Vec2::new(-1.0, 1.0));
        assert_eq!(at(1920.0, 1080.0).0, Vec2::new(1.0, -1.0));
        assert_eq!(at(960.0, 540.0).0, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn center_ray_points_at_target() {
        let ray = PickRay::from_camera(NormalizedDeviceCoordinate(Vec2::ZERO), &camera());
        assert_eq!(ray.origin, Vec3::new(0.0, 0.0, 10.0));
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn corner_ray_spans_the_field_of_view() {
        let cam = camera();
        let ray = PickRay::from_camera(NormalizedDeviceCoordinate(Vec2::new(0.0, 1.0)), &cam);
        let angle = ray.direction.angle_between(Vec3::NEG_Z).to_degrees();
        assert!((angle - cam.fov_y_deg * 0.5).abs() < 1e-2);
    }

    #[test]
    fn hits_are_sorted_nearest_first() {
        let mut graph = SceneGraph::new("model");
        let root = graph.root();
        graph.add_mesh_node(
            root,
            "far",
            Transform {
                translation: Vec3::new(0.0, 0.0, -5.0),
                ..Transform::IDENTITY
            },
            cuboid(Vec3::ONE),
        );
        let near = graph.add_mesh_node(root, "near", Transform::IDENTITY, cuboid(Vec3::ONE));
        // Off the face diagonals so each face reports a single triangle.
        let ray = PickRay {
            origin: Vec3::new(0.3, 0.1, 10.0),
            direction: Vec3::NEG_Z,
        };
        let result = intersect_subtree(&ray, &graph, root);
        // Entry and exit faces of both boxes.
        assert_eq!(result.len(), 4);
        let nearest = result.nearest().unwrap();
        assert_eq!(nearest.node, near);
        assert!((nearest.distance - 9.0).abs() < 1e-4);
        assert!(result
            .hits()
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance));
    }

    #[test]
    fn nested_transforms_are_honoured() {
        let mut graph = SceneGraph::new("model");
        let group = graph.add_node(
            graph.root(),
            "offset",
            Transform {
                translation: Vec3::new(50.0, 0.0, 0.0),
                ..Transform::IDENTITY
            },
            NodeKind::Group,
        );
        graph.add_mesh_node(
            group,
            "scaled",
            Transform {
                scale: Vec3::splat(3.0),
                ..Transform::IDENTITY
            },
            cuboid(Vec3::ONE),
        );
        let miss = PickRay {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        assert!(intersect_subtree(&miss, &graph, graph.root()).is_empty());

        let hit = PickRay {
            origin: Vec3::new(52.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        let result = intersect_subtree(&hit, &graph, graph.root());
        let nearest = result.nearest().unwrap();
        assert!((nearest.distance - 7.0).abs() < 1e-4);
        assert!((nearest.point - Vec3::new(52.0, 0.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn subtree_outside_root_is_ignored() {
        let mut graph = SceneGraph::new("scene");
        let model = graph.add_node(graph.root(), "model", Transform::IDENTITY, NodeKind::Group);
        graph.add_mesh_node(graph.root(), "ground", Transform::IDENTITY, cuboid(Vec3::ONE));
        let ray = PickRay {
            origin: Vec3::new(0.0, 0.0, 10.0),
            direction: Vec3::NEG_Z,
        };
        assert!(intersect_subtree(&ray, &graph, model).is_empty());
        assert!(!intersect_subtree(&ray, &graph, graph.root()).is_empty());
    }

    #[test]
    fn triangle_behind_origin_is_missed() {
        let tri = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        assert!(intersect_triangle(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, &tri).is_none());
        let t = intersect_triangle(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z, &tri).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        // Back face hits too.
        assert!(intersect_triangle(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, &tri).is_some());
    }
}
