pub mod setup;

use glam::{EulerRot, Mat4, Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(usize);

/// Local translation / rotation / scale of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Euler angles in degrees, X then Y then Z.
    pub fn from_placement(position: [f32; 3], rotation_deg: [f32; 3], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(position),
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rotation_deg[0].to_radians(),
                rotation_deg[1].to_radians(),
                rotation_deg[2].to_radians(),
            ),
            scale: Vec3::from(scale),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Axis-aligned bounding box. An empty box has `min > max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        points.into_iter().fold(Self::EMPTY, |acc, p| acc.including(*p))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn including(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    pub fn union(self, other: Self) -> Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            return other;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half size along each axis.
    pub fn extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Bounds of the eight corners after `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::EMPTY;
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out = out.including(matrix.transform_point3(corner));
        }
        out
    }

    /// Slab test. Returns the entry distance along the ray (0 when the origin
    /// is inside), or `None` on a miss.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let inv = direction.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let t_near = t0.min(t1).max_element();
        let t_far = t0.max(t1).min_element();
        if t_far < 0.0 || t_near > t_far || t_near.is_nan() || t_far.is_nan() {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// Triangle geometry in node-local space.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
    /// Linear RGBA.
    pub base_color: [f32; 4],
    /// Weight of the environment reflection, 0..1.
    pub reflectivity: f32,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Mesh {
    /// Builds a mesh; computes smooth normals when `normals` does not match
    /// `positions` one to one.
    pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions);
        let mut mesh = Self {
            positions,
            normals,
            indices,
            bounds,
            base_color: [1.0, 1.0, 1.0, 1.0],
            reflectivity: 0.0,
            cast_shadow: false,
            receive_shadow: false,
        };
        if mesh.normals.len() != mesh.positions.len() {
            mesh.compute_normals();
        }
        mesh
    }

    /// Square in the XZ plane, facing +Y, centred on the origin.
    pub fn plane(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, 0.0, -h),
            Vec3::new(h, 0.0, -h),
            Vec3::new(h, 0.0, h),
            Vec3::new(-h, 0.0, h),
        ];
        let normals = vec![Vec3::Y; 4];
        Self::new(positions, normals, vec![0, 2, 1, 0, 3, 2])
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangle(&self, index: usize) -> Option<[Vec3; 3]> {
        let base = index * 3;
        let tri = self.indices.get(base..base + 3)?;
        Some([
            *self.positions.get(tri[0] as usize)?,
            *self.positions.get(tri[1] as usize)?,
            *self.positions.get(tri[2] as usize)?,
        ])
    }

    /// Area-weighted vertex normals.
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (Some(pa), Some(pb), Some(pc)) = (
                self.positions.get(a),
                self.positions.get(b),
                self.positions.get(c),
            ) else {
                continue;
            };
            let face = (*pb - *pa).cross(*pc - *pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
            .collect();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Mesh(MeshId),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub local: Transform,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed node hierarchy. Node 0 is the root group.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    meshes: Vec<Mesh>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new("root")
    }
}

impl SceneGraph {
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                name: root_name.to_string(),
                local: Transform::IDENTITY,
                kind: NodeKind::Group,
                parent: None,
                children: Vec::new(),
            }],
            meshes: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Appends a child of `parent`. An unknown parent attaches to the root.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Transform,
        kind: NodeKind,
    ) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            self.root()
        };
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            local,
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_mesh_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        local: Transform,
        mesh: Mesh,
    ) -> NodeId {
        let mesh_id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        self.add_node(parent, name, local, NodeKind::Mesh(mesh_id))
    }

    pub fn set_local_transform(&mut self, id: NodeId, local: Transform) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.local = local;
        }
    }

    /// Product of all ancestor local matrices, root first.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.nodes.get(id.0).map(|_| id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id.0];
            matrix = node.local.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Depth-first walk of every mesh under `root` (inclusive) with its world matrix.
    pub fn visit_meshes<F>(&self, root: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &Mesh, &Mat4),
    {
        if root.0 >= self.nodes.len() {
            return;
        }
        let parent_world = self.nodes[root.0]
            .parent
            .map(|parent| self.world_matrix(parent))
            .unwrap_or(Mat4::IDENTITY);
        let mut stack = vec![(root, parent_world)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id.0];
            let world = parent_world * node.local.matrix();
            if let NodeKind::Mesh(mesh_id) = node.kind {
                if let Some(mesh) = self.meshes.get(mesh_id.0) {
                    visit(id, mesh, &world);
                }
            }
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    /// World-space bounds of every mesh under `root`.
    pub fn world_bounds(&self, root: NodeId) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        self.visit_meshes(root, |_, mesh, world| {
            bounds = bounds.union(mesh.bounds.transformed(world));
        });
        bounds
    }

    /// Sets shadow flags on every mesh under `root`.
    pub fn set_shadows(&mut self, root: NodeId, cast: bool, receive: bool) {
        let mut mesh_ids = Vec::new();
        self.visit_meshes(root, |id, _, _| {
            if let NodeKind::Mesh(mesh_id) = self.nodes[id.0].kind {
                mesh_ids.push(mesh_id);
            }
        });
        for mesh_id in mesh_ids {
            let mesh = &mut self.meshes[mesh_id.0];
            mesh.cast_shadow = cast;
            mesh.receive_shadow = receive;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Closed box centred on the origin.
    pub(crate) fn cuboid(half: Vec3) -> Mesh {
        let (x, y, z) = (half.x, half.y, half.z);
        let positions = vec![
            Vec3::new(-x, -y, -z),
            Vec3::new(x, -y, -z),
            Vec3::new(x, y, -z),
            Vec3::new(-x, y, -z),
            Vec3::new(-x, -y, z),
            Vec3::new(x, -y, z),
            Vec3::new(x, y, z),
            Vec3::new(-x, y, z),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // -z
            4, 5, 6, 4, 6, 7, // +z
            0, 1, 5, 0, 5, 4, // -y
            3, 7, 6, 3, 6, 2, // +y
            0, 4, 7, 0, 7, 3, // -x
            1, 2, 6, 1, 6, 5, // +x
        ];
        Mesh::new(positions, Vec::new(), indices)
    }

    #[test]
    fn world_matrix_composes_parent_first() {
        let mut graph = SceneGraph::new("model");
        let group = graph.add_node(
            graph.root(),
            "group",
            Transform {
                translation: Vec3::new(10.0, 0.0, 0.0),
                ..Transform::IDENTITY
            },
            NodeKind::Group,
        );
        let child = graph.add_mesh_node(
            group,
            "child",
            Transform {
                scale: Vec3::splat(2.0),
                ..Transform::IDENTITY
            },
            cuboid(Vec3::ONE),
        );
        let p = graph.world_matrix(child).transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(12.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn placement_rotates_x_then_y_then_z() {
        let t = Transform::from_placement([0.0, 0.0, 0.0], [-90.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        let up = t.matrix().transform_vector3(Vec3::Y);
        assert!((up - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn world_bounds_cover_transformed_meshes() {
        let mut graph = SceneGraph::new("model");
        graph.add_mesh_node(
            graph.root(),
            "a",
            Transform {
                translation: Vec3::new(5.0, 0.0, 0.0),
                ..Transform::IDENTITY
            },
            cuboid(Vec3::ONE),
        );
        graph.add_mesh_node(graph.root(), "b", Transform::IDENTITY, cuboid(Vec3::ONE));
        let bounds = graph.world_bounds(graph.root());
        assert!((bounds.min - Vec3::new(-1.0, -1.0, -1.0)).length() < 1e-5);
        assert!((bounds.max - Vec3::new(6.0, 1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn set_shadows_reaches_nested_meshes() {
        let mut graph = SceneGraph::new("model");
        let group = graph.add_node(graph.root(), "g", Transform::IDENTITY, NodeKind::Group);
        let nested = graph.add_mesh_node(group, "m", Transform::IDENTITY, cuboid(Vec3::ONE));
        graph.set_shadows(graph.root(), true, true);
        assert!(matches!(graph.node(nested).unwrap().kind, NodeKind::Mesh(_)));
        let mut seen = 0;
        graph.visit_meshes(graph.root(), |_, mesh, _| {
            seen += 1;
            assert!(mesh.cast_shadow && mesh.receive_shadow);
        });
        assert_eq!(seen, 1);
    }

    #[test]
    fn aabb_ray_slab_test() {
        let aabb = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };
        let hit = aabb.intersect_ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!((hit.unwrap() - 4.0).abs() < 1e-5);
        assert!(aabb
            .intersect_ray(Vec3::new(0.0, 3.0, 5.0), Vec3::NEG_Z)
            .is_none());
        assert!(aabb.intersect_ray(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).is_none());
        assert_eq!(aabb.intersect_ray(Vec3::ZERO, Vec3::X), Some(0.0));
    }

    #[test]
    fn computed_normals_are_unit_length() {
        let mesh = cuboid(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert!(mesh
            .normals
            .iter()
            .all(|n| (n.length() - 1.0).abs() < 1e-5));
    }

    #[test]
    fn plane_faces_up() {
        let plane = Mesh::plane(10.0);
        let [a, b, c] = plane.triangle(0).unwrap();
        assert!((b - a).cross(c - a).normalize().dot(Vec3::Y) > 0.99);
        assert_eq!(plane.triangle_count(), 2);
    }
}
