//! Environment capture: renders tagged scene geometry into a probe's
//! environment cubemap.

use wgpu::util::DeviceExt;

use crate::camera::{Camera, CubeFace};
use crate::error::BakeError;
use crate::gpu::cubemap::{mip_resolution, FACE_COUNT};
use crate::gpu::pipeline_helpers;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::probe::{ProbeState, ProbeTextures};
use crate::scene::{SceneMesh, Vertex};

/// Per-draw capture uniform.
///
/// WGSL layout (`env_mesh.wgsl`):
///   view_proj: mat4x4<f32>          (offset 0)
///   model: mat4x4<f32>              (offset 64)
///   environment_scale: f32          (offset 128)
///   Total: 144 bytes (12 bytes tail padding)
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct CaptureParams {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    environment_scale: f32,
    _pad: [f32; 3],
}

/// Renders every mesh tagged for the environment pass into each mip of
/// the probe's environment cubemap, one 90° face camera at a time, then
/// rebuilds the mip chain with a downsample blit so all levels are
/// consistent.
///
/// Capture is opaque: no blending, culling disabled (cube capture is
/// viewed from inside geometry as often as outside), and no depth
/// test/write.
pub struct EnvironmentCaptureStage {
    mesh_pipelines: [wgpu::RenderPipeline; 2],
    capture_layout: wgpu::BindGroupLayout,
    downsample_pipelines: [wgpu::RenderPipeline; 2],
    downsample_layout: wgpu::BindGroupLayout,
}

impl EnvironmentCaptureStage {
    /// Build the capture and downsample pipelines (one per HDR format).
    #[must_use]
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
    ) -> Self {
        let device = &context.device;

        let capture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Env Capture Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let mesh_shader = composer.compose(
            device,
            "Env Capture Shader",
            include_str!("../../assets/shaders/bake/env_mesh.wgsl"),
            "env_mesh.wgsl",
        );

        let make_mesh_pipeline = |format: wgpu::TextureFormat| {
            let pipeline_layout = device.create_pipeline_layout(
                &wgpu::PipelineLayoutDescriptor {
                    label: Some("Env Capture Pipeline Layout"),
                    bind_group_layouts: &[&capture_layout],
                    push_constant_ranges: &[],
                },
            );
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Env Capture Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &mesh_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &mesh_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let mesh_pipelines = [
            make_mesh_pipeline(wgpu::TextureFormat::Rgba16Float),
            make_mesh_pipeline(wgpu::TextureFormat::Rgba32Float),
        ];

        let downsample_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Env Downsample Layout"),
                entries: &[pipeline_helpers::texture_2d(0)],
            },
        );

        let downsample_shader = composer.compose(
            device,
            "Env Downsample Shader",
            include_str!("../../assets/shaders/bake/downsample.wgsl"),
            "downsample.wgsl",
        );

        let downsample_pipelines = [
            pipeline_helpers::create_face_pipeline(
                device,
                "Env Downsample 16f",
                &downsample_shader,
                wgpu::TextureFormat::Rgba16Float,
                &[&downsample_layout],
            ),
            pipeline_helpers::create_face_pipeline(
                device,
                "Env Downsample 32f",
                &downsample_shader,
                wgpu::TextureFormat::Rgba32Float,
                &[&downsample_layout],
            ),
        ];

        Self {
            mesh_pipelines,
            capture_layout,
            downsample_pipelines,
            downsample_layout,
        }
    }

    /// Encode the capture for one probe.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ConfigMismatch`] when the probe's environment
    /// target disagrees with its declared configuration; nothing is
    /// encoded in that case.
    pub fn encode(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        probe: &ProbeState,
        textures: &ProbeTextures,
        meshes: &[&SceneMesh],
        active_camera: &Camera,
    ) -> Result<(), BakeError> {
        textures.validate_capture(probe)?;

        let env = &textures.environment;
        let pipeline = &self.mesh_pipelines[probe.hdr_format.index()];

        if meshes.is_empty() {
            log::debug!("no environment-tagged meshes; capturing empty sky");
        }

        // Geometry into every mip of the chain, coarse mips included.
        for mip in 0..env.mip_count() {
            let size = mip_resolution(env.resolution(), mip);
            for face in CubeFace::ALL {
                let cam = Camera::cube_face(
                    probe.center,
                    probe.basis,
                    face,
                    active_camera.znear,
                    active_camera.zfar,
                );
                let view_proj = cam.build_capture_matrix().to_cols_array_2d();

                let bind_groups: Vec<wgpu::BindGroup> = meshes
                    .iter()
                    .map(|mesh| {
                        let params = CaptureParams {
                            view_proj,
                            model: mesh.transform.to_cols_array_2d(),
                            environment_scale: probe.environment_scale,
                            _pad: [0.0; 3],
                        };
                        let buffer = context.device.create_buffer_init(
                            &wgpu::util::BufferInitDescriptor {
                                label: Some("Env Capture Params"),
                                contents: bytemuck::cast_slice(&[params]),
                                usage: wgpu::BufferUsages::UNIFORM,
                            },
                        );
                        context.device.create_bind_group(
                            &wgpu::BindGroupDescriptor {
                                label: Some("Env Capture Bind Group"),
                                layout: &self.capture_layout,
                                entries: &[wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: buffer.as_entire_binding(),
                                }],
                            },
                        )
                    })
                    .collect();

                let mut pass =
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Env Capture"),
                        color_attachments: &[Some(
                            wgpu::RenderPassColorAttachment {
                                view: env.face_view(face.index(), mip),
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(
                                        wgpu::Color::BLACK,
                                    ),
                                    store: wgpu::StoreOp::Store,
                                },
                                depth_slice: None,
                            },
                        )],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });
                pass.set_viewport(
                    0.0,
                    0.0,
                    size as f32,
                    size as f32,
                    0.0,
                    1.0,
                );
                pass.set_pipeline(pipeline);
                for (mesh, bind_group) in meshes.iter().zip(&bind_groups) {
                    pass.set_bind_group(0, bind_group, &[]);
                    pass.set_vertex_buffer(0, mesh.vertex_buffer().slice(..));
                    pass.set_index_buffer(
                        mesh.index_buffer().slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..mesh.index_count(), 0, 0..1);
                }
            }
        }

        // Mip-consistency pass: rebuild the chain from mip 0 (the
        // hardware mip-generation equivalent), covering any level the
        // geometry renders missed through sub-texel triangles.
        let downsample =
            &self.downsample_pipelines[probe.hdr_format.index()];
        for mip in 1..env.mip_count() {
            for face in 0..FACE_COUNT {
                let bind_group = context.device.create_bind_group(
                    &wgpu::BindGroupDescriptor {
                        label: Some("Env Downsample Bind Group"),
                        layout: &self.downsample_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                env.face_view(face, mip - 1),
                            ),
                        }],
                    },
                );
                let mut pass =
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Env Downsample"),
                        color_attachments: &[Some(
                            wgpu::RenderPassColorAttachment {
                                view: env.face_view(face, mip),
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Clear(
                                        wgpu::Color::BLACK,
                                    ),
                                    store: wgpu::StoreOp::Store,
                                },
                                depth_slice: None,
                            },
                        )],
                        depth_stencil_attachment: None,
                        ..Default::default()
                    });
                pass.set_pipeline(downsample);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }

        Ok(())
    }
}
