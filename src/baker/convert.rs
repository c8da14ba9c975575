//! HDR → MDR color-space conversion.
//!
//! Re-encodes the environment, specular, and diffuse HDR cubemaps into
//! their compressed medium-dynamic-range variants, mip by mip. The MDR
//! encoding divides by a per-probe range scale (the brightest recorded
//! source pixel) and stores the per-texel range multiplier in alpha, so
//! values above 1.0 survive an 8-bit format. The pass reads exact texels
//! (`textureLoad`) and is a pure function of source texture and
//! parameters, so re-running it on unchanged inputs is bit-identical.

use wgpu::util::DeviceExt;

use crate::gpu::cubemap::{mip_resolution, CubeMapTarget, FACE_COUNT};
use crate::gpu::pipeline_helpers;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::probe::{ProbeState, ProbeTextures, MDR_FORMAT};

/// Per-draw conversion uniform.
///
/// WGSL layout (`mdr_convert.wgsl`):
///   current_mip: u32     (offset 0)
///   mdr: u32             (offset 4)
///   mdr_scale: f32       (offset 8)
///   gamma: f32           (offset 12)
///   ldr_exposure: f32    (offset 16)
///   contrast: f32        (offset 20)
///   saturation: f32      (offset 24)
///   hue: f32             (offset 28)
///   Total: 32 bytes
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ConvertParams {
    current_mip: u32,
    mdr: u32,
    mdr_scale: f32,
    gamma: f32,
    ldr_exposure: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
}

impl ConvertParams {
    /// Conversion parameters for one mip of one probe's texture pair.
    pub(crate) fn for_probe(probe: &ProbeState, mip: u32) -> Self {
        Self {
            current_mip: mip,
            mdr: 1,
            mdr_scale: probe.mdr_scale(),
            gamma: probe.gamma,
            ldr_exposure: probe.ldr_exposure,
            contrast: probe.ibl_contrast,
            saturation: probe.ibl_saturation,
            hue: probe.ibl_hue,
        }
    }
}

/// Converts the three HDR cubemaps of a probe into their MDR variants.
pub struct ColorSpaceConverter {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

impl ColorSpaceConverter {
    /// Build the conversion pipeline (MDR targets are always
    /// `Rgba8Unorm`, so one pipeline serves every probe).
    #[must_use]
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
    ) -> Self {
        let device = &context.device;
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("MDR Convert Layout"),
                entries: &[
                    pipeline_helpers::texture_2d(0),
                    pipeline_helpers::uniform_buffer(1),
                ],
            });

        let shader = composer.compose(
            device,
            "MDR Convert Shader",
            include_str!("../../assets/shaders/bake/mdr_convert.wgsl"),
            "mdr_convert.wgsl",
        );

        let pipeline = pipeline_helpers::create_face_pipeline(
            device,
            "MDR Convert",
            &shader,
            MDR_FORMAT,
            &[&layout],
        );

        Self { layout, pipeline }
    }

    /// Encode conversion of all three texture pairs for one probe.
    ///
    /// Runs after any convolution update, on both the first-capture and
    /// the refinement paths.
    pub fn encode(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        probe: &ProbeState,
        textures: &ProbeTextures,
    ) {
        self.encode_pair(
            context,
            encoder,
            probe,
            &textures.environment,
            &textures.environment_mdr,
            textures.environment.mip_count(),
        );
        self.encode_pair(
            context,
            encoder,
            probe,
            &textures.specular,
            &textures.specular_mdr,
            probe.active_specular_mips(),
        );
        self.encode_pair(
            context,
            encoder,
            probe,
            &textures.diffuse,
            &textures.diffuse_mdr,
            1,
        );
    }

    fn encode_pair(
        &self,
        context: &RenderContext,
        encoder: &mut wgpu::CommandEncoder,
        probe: &ProbeState,
        src: &CubeMapTarget,
        dst: &CubeMapTarget,
        mips: u32,
    ) {
        for mip in 0..mips {
            let size = mip_resolution(dst.resolution(), mip);
            let params = ConvertParams::for_probe(probe, mip);
            for face in 0..FACE_COUNT {
                let buffer = context.device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some("MDR Convert Params"),
                        contents: bytemuck::cast_slice(&[params]),
                        usage: wgpu::BufferUsages::UNIFORM,
                    },
                );
                let bind_group = context.device.create_bind_group(
                    &wgpu::BindGroupDescriptor {
                        label: Some("MDR Convert Bind Group"),
                        layout: &self.layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: wgpu::BindingResource::TextureView(
                                    src.face_view(face, mip),
                                ),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: buffer.as_entire_binding(),
                            },
                        ],
                    },
                );

                let mut pass =
                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("MDR Convert"),
                        color_attachments: &[Some(
                            wgpu::RenderPassColorAttachment {
                                view: dst.face_view(face, mip),
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
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.draw(0..3, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Vec3};

    #[test]
    fn identical_inputs_produce_identical_parameter_payloads() {
        let mut probe = ProbeState::new(Mat3::IDENTITY, Vec3::ZERO);
        probe.max_pixel = Vec3::new(3.0, 1.0, 2.0);

        let a = ConvertParams::for_probe(&probe, 2);
        let b = ConvertParams::for_probe(&probe, 2);
        assert_eq!(a, b);
        assert_eq!(bytemuck::bytes_of(&a), bytemuck::bytes_of(&b));
    }

    #[test]
    fn params_track_probe_range_context() {
        let mut probe = ProbeState::new(Mat3::IDENTITY, Vec3::ZERO);
        probe.max_pixel = Vec3::new(5.0, 1.0, 1.0);
        let params = ConvertParams::for_probe(&probe, 0);
        assert_eq!(params.mdr, 1);
        assert_eq!(params.mdr_scale, 5.0);
        assert_eq!(params.current_mip, 0);
    }
}
