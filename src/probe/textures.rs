//! Per-probe cubemap texture bundle.

use crate::error::BakeError;
use crate::gpu::cubemap::{mip_count_for, CubeMapTarget};

use super::ProbeState;

/// Texel format of the compressed medium-dynamic-range variants.
pub const MDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// The GPU cubemaps owned by one probe.
///
/// Three HDR chains (environment capture, specular convolution, diffuse
/// irradiance), their MDR-encoded variants, and the per-stage
/// "last result" textures that feed temporal sample accumulation: after
/// each convolution tick the destination is copied into its partner so
/// the next tick can blend new samples against the running average.
///
/// Whenever the owning probe is `cached` the bundle is internally
/// consistent (matching resolutions and mip counts per pair) and safe
/// for export; mid-accumulation it is best-effort valid.
pub struct ProbeTextures {
    /// Captured HDR environment, full mip chain.
    pub environment: CubeMapTarget,
    /// MDR-encoded environment, same chain.
    pub environment_mdr: CubeMapTarget,
    /// Specular convolution destination, one mip per roughness step.
    pub specular: CubeMapTarget,
    /// Previous specular result (temporal accumulation input).
    pub specular_last: CubeMapTarget,
    /// MDR-encoded specular chain.
    pub specular_mdr: CubeMapTarget,
    /// Diffuse irradiance destination (single mip).
    pub diffuse: CubeMapTarget,
    /// Previous diffuse result (temporal accumulation input).
    pub diffuse_last: CubeMapTarget,
    /// MDR-encoded diffuse target (single mip).
    pub diffuse_mdr: CubeMapTarget,
}

impl ProbeTextures {
    /// Allocate the full bundle for a probe's declared configuration.
    #[must_use]
    pub fn allocate(device: &wgpu::Device, probe: &ProbeState) -> Self {
        let hdr = probe.hdr_format.texture_format();
        let env_mips = mip_count_for(probe.source_resolution);
        let spec_mips = mip_count_for(probe.specular_resolution);

        Self {
            environment: CubeMapTarget::new(
                device,
                "Probe Environment",
                probe.source_resolution,
                env_mips,
                hdr,
            ),
            environment_mdr: CubeMapTarget::new(
                device,
                "Probe Environment MDR",
                probe.source_resolution,
                env_mips,
                MDR_FORMAT,
            ),
            specular: CubeMapTarget::new(
                device,
                "Probe Specular",
                probe.specular_resolution,
                spec_mips,
                hdr,
            ),
            specular_last: CubeMapTarget::new(
                device,
                "Probe Specular Last",
                probe.specular_resolution,
                spec_mips,
                hdr,
            ),
            specular_mdr: CubeMapTarget::new(
                device,
                "Probe Specular MDR",
                probe.specular_resolution,
                spec_mips,
                MDR_FORMAT,
            ),
            diffuse: CubeMapTarget::new(
                device,
                "Probe Diffuse",
                probe.diffuse_resolution,
                1,
                hdr,
            ),
            diffuse_last: CubeMapTarget::new(
                device,
                "Probe Diffuse Last",
                probe.diffuse_resolution,
                1,
                hdr,
            ),
            diffuse_mdr: CubeMapTarget::new(
                device,
                "Probe Diffuse MDR",
                probe.diffuse_resolution,
                1,
                MDR_FORMAT,
            ),
        }
    }

    /// Check the capture chain against the probe's declared
    /// configuration before rendering into it.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::ConfigMismatch`] when resolution or mip
    /// count disagree — a programmer error that aborts capture for this
    /// probe only.
    pub fn validate_capture(
        &self,
        probe: &ProbeState,
    ) -> Result<(), BakeError> {
        self.environment.validate_against(
            probe.source_resolution,
            mip_count_for(probe.source_resolution),
        )
    }
}
