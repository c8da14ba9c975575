//! Light probe records: configuration, bake progress, and GPU textures.
//!
//! A probe's convolution is amortized across frames through a sample
//! budget: each scheduler tick consumes `samples_per_frame` of the
//! `sample_count` total, and the probe is finished (`cached`) once the
//! budget is spent. All progress mutation funnels through the
//! scheduler's crate-internal `advance_samples`, [`ProbeState::uncache`],
//! and [`ProbeState::mark_computed`], which keeps the lifecycle invariants
//! checkable in one place.

mod textures;

pub use textures::{ProbeTextures, MDR_FORMAT};

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::gpu::cubemap::mip_count_for;
use crate::gpu::render_context::RenderContext;
use crate::options::ProbeOptions;

/// Storage precision for a probe's HDR cubemaps.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub enum HdrPixelFormat {
    /// 16-bit float per channel (the usual choice).
    #[default]
    Rgba16Float,
    /// 32-bit float per channel for extreme ranges.
    Rgba32Float,
}

impl HdrPixelFormat {
    /// The wgpu texture format for this precision.
    #[must_use]
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            Self::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            Self::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }

    /// Index into the per-format pipeline tables kept by the bake
    /// stages.
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Rgba16Float => 0,
            Self::Rgba32Float => 1,
        }
    }
}

/// Lifecycle phase of a probe, derived from its progress counters.
///
/// `Uncached → Accumulating → Cached`; `Cached` is terminal and only
/// re-entered through explicit invalidation. A tick on an `Uncached`
/// probe performs the environment capture plus a full convolution pass;
/// a tick on an `Accumulating` probe refines the convolution without
/// re-capturing; a `Cached` probe is skipped outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakePhase {
    /// No samples accumulated; the next tick captures the environment.
    Uncached,
    /// Partially converged; the next tick refines the convolution.
    Accumulating,
    /// Fully converged (or explicitly finalized); ticks are no-ops.
    Cached,
}

/// One placed environment probe: capture transform, sample budget,
/// resolutions, color-correction scalars, and GPU texture bundle.
pub struct ProbeState {
    /// World-space orientation of the capture basis.
    pub basis: Mat3,
    /// World-space capture position.
    pub center: Vec3,
    sample_count: u32,
    samples_per_frame: u32,
    sample_offset: u32,
    cached: bool,
    /// Number of the coarsest specular mips to skip (roughness saturates
    /// before the smallest mips).
    pub mip_drop: u32,
    /// Environment capture face resolution.
    pub source_resolution: u32,
    /// Specular cubemap face resolution.
    pub specular_resolution: u32,
    /// Diffuse irradiance cubemap face resolution.
    pub diffuse_resolution: u32,
    /// Storage precision for the HDR cubemaps.
    pub hdr_format: HdrPixelFormat,
    /// Scale applied to captured environment radiance.
    pub environment_scale: f32,
    /// Contrast adjustment applied during color conversion.
    pub ibl_contrast: f32,
    /// Saturation adjustment applied during color conversion.
    pub ibl_saturation: f32,
    /// Hue rotation (radians) applied during color conversion.
    pub ibl_hue: f32,
    /// Gamma used by the MDR encoding.
    pub gamma: f32,
    /// Exposure applied before encoding.
    pub ldr_exposure: f32,
    /// Brightest-pixel values of the source environment, the MDR range
    /// normalization context. Defaults to 1.0 per channel; supplied by
    /// the surrounding application (e.g. at asset import).
    pub max_pixel: Vec3,
    textures: Option<ProbeTextures>,
}

impl ProbeState {
    /// Create a probe from persisted options at a placement.
    #[must_use]
    pub fn from_options(
        options: &ProbeOptions,
        basis: Mat3,
        center: Vec3,
    ) -> Self {
        Self {
            basis,
            center,
            sample_count: options.sample_count.max(1),
            samples_per_frame: options.samples_per_frame.max(1),
            sample_offset: 0,
            cached: false,
            mip_drop: options.mip_drop,
            source_resolution: options.source_resolution,
            specular_resolution: options.specular_resolution,
            diffuse_resolution: options.diffuse_resolution,
            hdr_format: options.hdr_format,
            environment_scale: options.environment_scale,
            ibl_contrast: options.ibl_contrast,
            ibl_saturation: options.ibl_saturation,
            ibl_hue: options.ibl_hue,
            gamma: options.gamma,
            ldr_exposure: options.ldr_exposure,
            max_pixel: Vec3::ONE,
            textures: None,
        }
    }

    /// Create a probe with default options at a placement.
    #[must_use]
    pub fn new(basis: Mat3, center: Vec3) -> Self {
        Self::from_options(&ProbeOptions::default(), basis, center)
    }

    // -- Progress --

    /// Total accumulation budget.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Samples consumed per scheduler tick.
    #[must_use]
    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    /// Samples consumed so far. Always in `0..=sample_count`.
    #[must_use]
    pub fn sample_offset(&self) -> u32 {
        self.sample_offset
    }

    /// Whether the probe is finished and skipped by the scheduler.
    #[must_use]
    pub fn cached(&self) -> bool {
        self.cached
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> BakePhase {
        if self.cached {
            BakePhase::Cached
        } else if self.sample_offset == 0 {
            BakePhase::Uncached
        } else {
            BakePhase::Accumulating
        }
    }

    /// Replace the sample budget and restart accumulation.
    pub fn set_sample_budget(&mut self, count: u32, per_frame: u32) {
        self.sample_count = count.max(1);
        self.samples_per_frame = per_frame.max(1);
        self.uncache();
    }

    /// Invalidate the probe: progress resets to zero and the next tick
    /// re-captures the environment.
    pub fn uncache(&mut self) {
        self.sample_offset = 0;
        self.cached = false;
    }

    /// Force the probe's final state.
    ///
    /// `cancel == true` marks the probe cached immediately, keeping
    /// whatever partial convolution is in the destination textures (the
    /// sanctioned way to accept partial results). `cancel == false`
    /// restarts the probe instead, equivalent to [`Self::uncache`].
    pub fn mark_computed(&mut self, cancel: bool) {
        if cancel {
            self.cached = true;
        } else {
            self.uncache();
        }
    }

    /// Consume one tick's worth of the sample budget. The single
    /// authoritative progress mutation; called by the scheduler after
    /// both convolution stages ran.
    pub(crate) fn advance_samples(&mut self) {
        self.sample_offset =
            (self.sample_offset + self.samples_per_frame).min(self.sample_count);
        self.cached = self.sample_offset == self.sample_count;
    }

    // -- Derived configuration --

    /// Specular mip levels actually convolved: the full chain minus
    /// `mip_drop`, never less than one.
    #[must_use]
    pub fn active_specular_mips(&self) -> u32 {
        let mips = mip_count_for(self.specular_resolution);
        mips.saturating_sub(self.mip_drop).max(1)
    }

    /// MDR range-normalization scale, derived from the brightest source
    /// pixel and clamped so LDR-range environments pass through
    /// unscaled.
    #[must_use]
    pub fn mdr_scale(&self) -> f32 {
        self.max_pixel.max_element().max(1.0)
    }

    // -- GPU resources --

    /// Allocate the probe's cubemap bundle. Until this is called the
    /// scheduler skips the probe (resource-not-ready).
    pub fn allocate_textures(&mut self, context: &RenderContext) {
        let textures = ProbeTextures::allocate(&context.device, self);
        self.textures = Some(textures);
    }

    /// The texture bundle, if allocated.
    #[must_use]
    pub fn textures(&self) -> Option<&ProbeTextures> {
        self.textures.as_ref()
    }

    /// Whether GPU resources are ready for baking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.textures.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(sample_count: u32, samples_per_frame: u32) -> ProbeState {
        let mut p = ProbeState::new(Mat3::IDENTITY, Vec3::ZERO);
        p.set_sample_budget(sample_count, samples_per_frame);
        p
    }

    #[test]
    fn single_tick_budget_caches_immediately() {
        let mut p = probe(128, 128);
        assert_eq!(p.phase(), BakePhase::Uncached);
        p.advance_samples();
        assert_eq!(p.sample_offset(), 128);
        assert!(p.cached());
        assert_eq!(p.phase(), BakePhase::Cached);
    }

    #[test]
    fn spread_budget_advances_monotonically() {
        let mut p = probe(256, 64);
        for n in 1..=6u32 {
            p.advance_samples();
            assert_eq!(p.sample_offset(), (64 * n).min(256));
            assert_eq!(p.cached(), n >= 4);
        }
    }

    #[test]
    fn uncache_resets_any_state() {
        let mut p = probe(128, 128);
        p.advance_samples();
        assert!(p.cached());
        p.uncache();
        assert_eq!(p.sample_offset(), 0);
        assert!(!p.cached());
        assert_eq!(p.phase(), BakePhase::Uncached);
    }

    #[test]
    fn cancel_keeps_partial_progress() {
        let mut p = probe(256, 64);
        p.advance_samples();
        assert_eq!(p.sample_offset(), 64);
        p.mark_computed(true);
        assert!(p.cached());
        assert_eq!(p.sample_offset(), 64, "cancel must not touch progress");
        assert_eq!(p.phase(), BakePhase::Cached);
    }

    #[test]
    fn mark_computed_false_restarts() {
        let mut p = probe(256, 64);
        p.advance_samples();
        p.advance_samples();
        p.mark_computed(false);
        assert_eq!(p.phase(), BakePhase::Uncached);
        assert_eq!(p.sample_offset(), 0);
    }

    #[test]
    fn offset_never_exceeds_budget() {
        let mut p = probe(100, 64);
        p.advance_samples();
        p.advance_samples();
        p.advance_samples();
        assert_eq!(p.sample_offset(), 100);
        assert!(p.cached());
    }

    #[test]
    fn active_mips_drop_the_coarse_tail() {
        let mut p = probe(128, 128);
        p.specular_resolution = 128;
        p.mip_drop = 2;
        // 128 → 7-mip chain, minus 2 dropped.
        assert_eq!(p.active_specular_mips(), 5);
        p.mip_drop = 20;
        assert_eq!(p.active_specular_mips(), 1);
    }

    #[test]
    fn mdr_scale_clamps_to_identity() {
        let mut p = probe(128, 128);
        assert_eq!(p.mdr_scale(), 1.0);
        p.max_pixel = Vec3::new(7.5, 2.0, 0.25);
        assert_eq!(p.mdr_scale(), 7.5);
        p.max_pixel = Vec3::splat(0.1);
        assert_eq!(p.mdr_scale(), 1.0);
    }
}
