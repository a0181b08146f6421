//! GPU-side copies of scene graph meshes and the uniform layouts shared with
//! the WGSL shaders.

use crate::scene::{Mesh, NodeId, SceneGraph};
use glam::Mat4;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-frame values, `Globals` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalsUniform {
    pub view_proj: Mat4,       // 64
    pub light_view_proj: Mat4, // 128
    pub camera_pos: [f32; 4],  // 144
    /// xyz towards the light, w = 1 when shadows are on.
    pub light_dir: [f32; 4],   // 160
    pub light_color: [f32; 4], // 176
    pub sky_color: [f32; 4],   // 192
    pub ground_color: [f32; 4], // 208
    /// x env intensity, y exposure, z has env, w shadow texel size.
    pub env_params: [f32; 4],  // 224
}

const _: [(); 224] = [(); core::mem::size_of::<GlobalsUniform>()];

/// Per-draw values, `Draw` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniform {
    pub model: Mat4,          // 64
    pub normal_matrix: Mat4,  // 128
    pub base_color: [f32; 4], // 144
    /// x receive shadow, y reflectivity.
    pub material: [f32; 4],   // 160
}

const _: [(); 160] = [(); core::mem::size_of::<DrawUniform>()];

impl DrawUniform {
    pub fn new(mesh: &Mesh, world: &Mat4) -> Self {
        let normal_matrix = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            *world
        };
        Self {
            model: *world,
            normal_matrix,
            base_color: mesh.base_color,
            material: [
                if mesh.receive_shadow { 1.0 } else { 0.0 },
                mesh.reflectivity.clamp(0.0, 1.0),
                0.0,
                0.0,
            ],
        }
    }
}

/// One mesh instance ready to draw: buffers plus its group-1 bind group.
pub struct GpuDraw {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pub cast_shadow: bool,
}

impl GpuDraw {
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Upload every mesh under `root`. Triangles with out-of-range indices are
/// dropped; meshes left empty are skipped.
pub fn upload_subtree(
    device: &wgpu::Device,
    draw_layout: &wgpu::BindGroupLayout,
    graph: &SceneGraph,
    root: NodeId,
) -> Vec<GpuDraw> {
    let mut draws = Vec::new();
    graph.visit_meshes(root, |_, mesh, world| {
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| Vertex {
                position: p.to_array(),
                normal: n.to_array(),
            })
            .collect();
        let vertex_count = vertices.len() as u32;
        let indices: Vec<u32> = mesh
            .indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|i| *i < vertex_count))
            .flatten()
            .copied()
            .collect();
        if indices.is_empty() {
            return;
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform = DrawUniform::new(mesh, world);
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Draw Uniform"),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Bind Group"),
            layout: draw_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        draws.push(GpuDraw {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            _uniform_buffer: uniform_buffer,
            bind_group,
            cast_shadow: mesh.cast_shadow,
        });
    });
    draws
}
