//! Specular and diffuse importance-sampling convolution stages.
//!
//! Both stages supply bookkeeping only: source cubemap, the previous
//! partial result, and the sample-budget window for this tick. The
//! sampling math itself lives in the BRDF's WGSL kernels, which blend
//! `samples_per_frame` fresh stochastic samples into the running average
//! so an expensive convolution converges across frames instead of
//! stalling one.

use wgpu::util::DeviceExt;

use crate::error::BakeError;
use crate::gpu::cubemap::{mip_resolution, CubeMapTarget, FACE_COUNT};
use crate::gpu::pipeline_helpers;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::probe::{ProbeState, ProbeTextures};

/// Per-draw convolution uniform, shared by both kernels.
///
/// WGSL layout (`specular_prefilter.wgsl` / `diffuse_irradiance.wgsl`):
///   face: u32                 (offset 0)
///   mip_index: u32            (offset 4)
///   sample_offset: u32        (offset 8)
///   samples_per_frame: u32    (offset 12)
///   sample_count: u32         (offset 16)
///   output_size: f32          (offset 20)
///   roughness: f32            (offset 24)
///   _pad: f32                 (offset 28)
///   Total: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ConvolveParams {
    face: u32,
    mip_index: u32,
    sample_offset: u32,
    samples_per_frame: u32,
    sample_count: u32,
    output_size: f32,
    roughness: f32,
    _pad: f32,
}

/// Roughness convolved into a specular mip.
///
/// Linear ramp over the active chain: mip 0 is a mirror (roughness 0),
/// the last active mip is fully rough (roughness 1). A single active
/// mip degenerates to roughness 0.
#[must_use]
pub fn roughness_for_mip(mip: u32, active_mip_levels: u32) -> f32 {
    if active_mip_levels <= 1 {
        0.0
    } else {
        mip as f32 / (active_mip_levels - 1) as f32
    }
}

/// Bind group layout shared by both convolution stages:
/// environment cube, last-result cube, sampler, params.
fn convolve_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            pipeline_helpers::texture_cube(0),
            pipeline_helpers::texture_cube(1),
            pipeline_helpers::non_filtering_sampler(2),
            pipeline_helpers::uniform_buffer(3),
        ],
    })
}

/// Kernel-backed pipelines for one convolution stage.
///
/// Pipelines are rebuilt whenever the kernel's content hash changes,
/// which is how live kernel edits reach the GPU.
struct KernelPipelines {
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    pipelines: Option<[wgpu::RenderPipeline; 2]>,
    built_hash: Option<u64>,
    label: &'static str,
}

impl KernelPipelines {
    fn new(device: &wgpu::Device, label: &'static str) -> Self {
        Self {
            layout: convolve_layout(device, label),
            sampler: pipeline_helpers::nearest_sampler(device, label),
            pipelines: None,
            built_hash: None,
            label,
        }
    }

    fn ensure(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        kernel_source: &str,
        kernel_hash: u64,
    ) -> Result<(), BakeError> {
        if self.built_hash == Some(kernel_hash) {
            return Ok(());
        }
        let shader = composer.try_compose(
            &context.device,
            self.label,
            kernel_source,
            "convolution_kernel.wgsl",
        )?;
        let pipelines = [
            pipeline_helpers::create_face_pipeline(
                &context.device,
                self.label,
                &shader,
                wgpu::TextureFormat::Rgba16Float,
                &[&self.layout],
            ),
            pipeline_helpers::create_face_pipeline(
                &context.device,
                self.label,
                &shader,
                wgpu::TextureFormat::Rgba32Float,
                &[&self.layout],
            ),
        ];
        self.pipelines = Some(pipelines);
        self.built_hash = Some(kernel_hash);
        log::info!("{} pipelines rebuilt", self.label);
        Ok(())
    }

    /// One fullscreen draw into `dest.face_view(face, mip)`, sampling
    /// the environment and the previous partial result.
    fn encode_face(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        env: &CubeMapTarget,
        last: &CubeMapTarget,
        dest: &CubeMapTarget,
        params: ConvolveParams,
    ) {
        let buffer = context.device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Convolve Params"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM,
            },
        );
        let bind_group =
            context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Convolve Bind Group"),
                    layout: &self.layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(
                                env.cube_view(),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(
                                last.cube_view(),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(
                                &self.sampler,
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: buffer.as_entire_binding(),
                        },
                    ],
                });

        let mut pass =
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(self.label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: dest.face_view(params.face, params.mip_index),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
        pass.set_viewport(
            0.0,
            0.0,
            params.output_size,
            params.output_size,
            0.0,
            1.0,
        );
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Convolves the environment into the specular chain, one roughness per
/// active mip, with temporal sample accumulation.
pub struct SpecularConvolutionStage {
    kernel: KernelPipelines,
}

impl SpecularConvolutionStage {
    /// Create the stage; pipelines are built on the first
    /// [`Self::ensure_pipelines`] call.
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            kernel: KernelPipelines::new(device, "Specular Prefilter"),
        }
    }

    /// (Re)build pipelines for the given kernel if its hash changed.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ShaderCompose`] if the kernel fails to
    /// compose; the previously-built pipelines stay installed.
    pub fn ensure_pipelines(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        kernel_source: &str,
        kernel_hash: u64,
    ) -> Result<(), BakeError> {
        self.kernel.ensure(context, composer, kernel_source, kernel_hash)
    }

    /// Encode this tick's specular refinement for one probe.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ShaderCompose`] if no kernel pipelines are
    /// built yet.
    pub fn encode(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        probe: &ProbeState,
        textures: &ProbeTextures,
    ) -> Result<(), BakeError> {
        let Some(pipelines) = &self.kernel.pipelines else {
            return Err(BakeError::ShaderCompose(
                "specular kernel pipelines not built".to_owned(),
            ));
        };
        let pipeline = &pipelines[probe.hdr_format.index()];

        let specular = &textures.specular;
        let active = probe.active_specular_mips();
        for mip in 0..active {
            let size = mip_resolution(specular.resolution(), mip);
            let roughness = roughness_for_mip(mip, active);
            for face in 0..FACE_COUNT {
                self.kernel.encode_face(
                    context,
                    encoder,
                    pipeline,
                    &textures.environment,
                    &textures.specular_last,
                    specular,
                    ConvolveParams {
                        face,
                        mip_index: mip,
                        sample_offset: probe.sample_offset(),
                        samples_per_frame: probe.samples_per_frame(),
                        sample_count: probe.sample_count(),
                        output_size: size as f32,
                        roughness,
                        _pad: 0.0,
                    },
                );
            }
        }

        // The converged-so-far result becomes next tick's accumulation
        // input.
        specular.copy_all_to(encoder, &textures.specular_last);
        Ok(())
    }
}

/// Convolves the environment into the single diffuse irradiance target
/// (cosine-weighted hemisphere integration), same accumulation scheme
/// as the specular stage.
pub struct DiffuseConvolutionStage {
    kernel: KernelPipelines,
}

impl DiffuseConvolutionStage {
    /// Create the stage; pipelines are built on the first
    /// [`Self::ensure_pipelines`] call.
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            kernel: KernelPipelines::new(device, "Diffuse Irradiance"),
        }
    }

    /// (Re)build pipelines for the given kernel if its hash changed.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ShaderCompose`] if the kernel fails to
    /// compose.
    pub fn ensure_pipelines(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        kernel_source: &str,
        kernel_hash: u64,
    ) -> Result<(), BakeError> {
        self.kernel.ensure(context, composer, kernel_source, kernel_hash)
    }

    /// Encode this tick's diffuse refinement for one probe.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ShaderCompose`] if no kernel pipelines are
    /// built yet.
    pub fn encode(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        probe: &ProbeState,
        textures: &ProbeTextures,
    ) -> Result<(), BakeError> {
        let Some(pipelines) = &self.kernel.pipelines else {
            return Err(BakeError::ShaderCompose(
                "diffuse kernel pipelines not built".to_owned(),
            ));
        };
        let pipeline = &pipelines[probe.hdr_format.index()];

        let diffuse = &textures.diffuse;
        for face in 0..FACE_COUNT {
            self.kernel.encode_face(
                context,
                encoder,
                pipeline,
                &textures.environment,
                &textures.diffuse_last,
                diffuse,
                ConvolveParams {
                    face,
                    mip_index: 0,
                    sample_offset: probe.sample_offset(),
                    samples_per_frame: probe.samples_per_frame(),
                    sample_count: probe.sample_count(),
                    output_size: diffuse.resolution() as f32,
                    // Diffuse integration is maximal roughness by
                    // definition.
                    roughness: 1.0,
                    _pad: 0.0,
                },
            );
        }

        diffuse.copy_all_to(encoder, &textures.diffuse_last);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roughness_ramp_hits_both_endpoints() {
        let active = 5;
        assert_eq!(roughness_for_mip(0, active), 0.0);
        assert_eq!(roughness_for_mip(active - 1, active), 1.0);
    }

    #[test]
    fn roughness_is_monotonically_non_decreasing() {
        for active in 2..=8u32 {
            let mut prev = -1.0f32;
            for mip in 0..active {
                let r = roughness_for_mip(mip, active);
                assert!(r >= prev, "mip {mip} of {active}");
                assert!((0.0..=1.0).contains(&r));
                prev = r;
            }
        }
    }

    #[test]
    fn single_active_mip_is_mirror_roughness() {
        assert_eq!(roughness_for_mip(0, 1), 0.0);
    }
}
