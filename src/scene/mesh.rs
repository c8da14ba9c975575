//! GPU mesh records for the capture pass.

use glam::Mat4;
use wgpu::util::DeviceExt;

/// Render passes a mesh can be tagged for.
///
/// Probe capture only draws meshes tagged [`RenderPassKind::Environment`];
/// everything else belongs to the host renderer's own passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPassKind {
    /// Drawn into probe environment cubemaps.
    Environment,
    /// Drawn by the host's main color pass (ignored by the baker).
    Forward,
}

/// Vertex layout shared by capture-pass meshes.
///
/// Kept deliberately small: probes capture radiance, so position plus a
/// flat emissive color (and a normal for hosts that shade the capture)
/// is enough.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
    /// Linear emissive color.
    pub color: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
    ];

    /// The vertex buffer layout matching `env_mesh.wgsl`.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// An indexed mesh plus the passes it participates in.
pub struct SceneMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    /// Object-to-world transform.
    pub transform: Mat4,
    passes: Vec<RenderPassKind>,
}

impl SceneMesh {
    /// Upload a mesh and tag it for the given passes.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        vertices: &[Vertex],
        indices: &[u32],
        transform: Mat4,
        passes: Vec<RenderPassKind>,
    ) -> Self {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            transform,
            passes,
        }
    }

    /// Whether the mesh is tagged for `pass`.
    #[must_use]
    pub fn has_pass(&self, pass: RenderPassKind) -> bool {
        self.passes.contains(&pass)
    }

    /// The vertex buffer.
    #[must_use]
    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }

    /// The index buffer (u32 indices).
    #[must_use]
    pub fn index_buffer(&self) -> &wgpu::Buffer {
        &self.index_buffer
    }

    /// Number of indices to draw.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
