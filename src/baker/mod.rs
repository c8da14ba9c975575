//! The per-frame probe bake scheduler and its render stages.
//!
//! [`ProbeBaker`] is the explicit pipeline context: it owns the four
//! stages (capture, specular, diffuse, conversion) and the invalidation
//! tracker, with a lifetime tied to the owning device — nothing here is
//! process-wide. Each frame [`ProbeBaker::tick`] walks the probe arena
//! and picks one of three paths per probe: the cached fast path (a
//! no-op, so a fully-baked scene costs near zero), the first-capture
//! path, or the refinement path. Paths are decided by [`TickAction`],
//! which is pure and tested on its own.

mod capture;
mod convert;
mod convolve;
mod invalidation;

pub use capture::EnvironmentCaptureStage;
pub use convert::ColorSpaceConverter;
pub use convolve::{
    roughness_for_mip, DiffuseConvolutionStage, SpecularConvolutionStage,
};
pub use invalidation::CacheInvalidationTracker;

use web_time::Instant;

use crate::camera::{Camera, CubeFace};
use crate::error::BakeError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::probe::BakePhase;
use crate::scene::{ProbeId, RenderPassKind, Scene};

/// Why a probe was skipped this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Fully converged; nothing to do.
    Cached,
    /// Cubemap resources not allocated yet; retried next tick.
    ResourcesNotReady,
}

/// What the scheduler does with one probe in one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// No work encoded.
    Skip(SkipReason),
    /// Capture the environment, then convolve and convert.
    FullBake,
    /// Refine the convolution and re-convert; no re-capture.
    Refine,
}

impl TickAction {
    /// Decide the path for a probe from its phase and resource
    /// readiness.
    #[must_use]
    pub fn decide(phase: BakePhase, ready: bool) -> Self {
        if !ready {
            return Self::Skip(SkipReason::ResourcesNotReady);
        }
        match phase {
            BakePhase::Cached => Self::Skip(SkipReason::Cached),
            BakePhase::Uncached => Self::FullBake,
            BakePhase::Accumulating => Self::Refine,
        }
    }
}

/// Summary of one scheduler tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Probes that had bake work encoded and advanced their budget.
    pub processed: u32,
    /// Probes skipped (cached or resources not ready).
    pub skipped: u32,
    /// Probes whose bake failed this tick (isolated; others proceeded).
    pub failed: u32,
    /// Whether a kernel change forced a global invalidation this tick.
    pub invalidated: bool,
}

/// Drives probe baking each frame.
pub struct ProbeBaker {
    composer: ShaderComposer,
    capture: EnvironmentCaptureStage,
    specular: SpecularConvolutionStage,
    diffuse: DiffuseConvolutionStage,
    convert: ColorSpaceConverter,
    tracker: CacheInvalidationTracker,
}

impl ProbeBaker {
    /// Build the stages against a device. Convolution pipelines are
    /// compiled lazily on the first tick, once the active BRDF's kernels
    /// are known.
    #[must_use]
    pub fn new(context: &RenderContext) -> Self {
        let mut composer = ShaderComposer::new();
        let capture = EnvironmentCaptureStage::new(context, &mut composer);
        let convert = ColorSpaceConverter::new(context, &mut composer);
        Self {
            composer,
            capture,
            specular: SpecularConvolutionStage::new(&context.device),
            diffuse: DiffuseConvolutionStage::new(&context.device),
            convert,
            tracker: CacheInvalidationTracker::new(),
        }
    }

    /// Run one scheduler pass over the scene's probes.
    ///
    /// Within the tick, capture (when performed) precedes convolution
    /// and convolution precedes color conversion; probes are processed
    /// independently and a failing probe never aborts the rest. The
    /// scene camera is restored to its pre-tick value before returning,
    /// on success and error paths alike.
    ///
    /// # Errors
    ///
    /// Returns [`BakeError::MissingBrdf`] when the scene has no active
    /// BRDF (no probe is processed that frame), or
    /// [`BakeError::ShaderCompose`] when a live-edited kernel fails to
    /// build.
    pub fn tick(
        &mut self,
        context: &RenderContext,
        scene: &mut Scene,
    ) -> Result<TickReport, BakeError> {
        let start = Instant::now();

        let Some(brdf) = scene.brdf() else {
            log::error!(
                "no active BRDF on scene; skipping all probe work this frame"
            );
            return Err(BakeError::MissingBrdf);
        };
        let specular_hash = brdf.specular_hash();
        let diffuse_hash = brdf.diffuse_hash();

        self.specular.ensure_pipelines(
            context,
            &mut self.composer,
            brdf.specular_kernel(),
            specular_hash,
        )?;
        self.diffuse.ensure_pipelines(
            context,
            &mut self.composer,
            brdf.diffuse_kernel(),
            diffuse_hash,
        )?;

        let invalidated = self.tracker.refresh(
            specular_hash,
            diffuse_hash,
            scene.probes_mut(),
        );
        if invalidated {
            log::info!(
                "convolution kernels changed; re-baking {} probes",
                scene.probe_count()
            );
        }

        let saved_camera = *scene.camera();
        let mut report = TickReport {
            invalidated,
            ..Default::default()
        };

        for id in scene.probe_ids() {
            let Some(probe) = scene.probe(id) else {
                continue;
            };
            let action = TickAction::decide(probe.phase(), probe.is_ready());
            match action {
                TickAction::Skip(SkipReason::Cached) => report.skipped += 1,
                TickAction::Skip(SkipReason::ResourcesNotReady) => {
                    log::debug!(
                        "probe {id:?} resources not ready; retrying next tick"
                    );
                    report.skipped += 1;
                }
                TickAction::FullBake | TickAction::Refine => {
                    match self.encode_probe(
                        context,
                        scene,
                        id,
                        action,
                        &saved_camera,
                    ) {
                        Ok(()) => {
                            if let Some(p) = scene.probe_mut(id) {
                                p.advance_samples();
                            }
                            report.processed += 1;
                        }
                        Err(e) => {
                            log::error!("probe {id:?} bake failed: {e}");
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        scene.set_camera(saved_camera);

        if report.processed > 0 {
            log::debug!(
                "probe tick: {} baked, {} skipped, {} failed in {:?}",
                report.processed,
                report.skipped,
                report.failed,
                start.elapsed()
            );
        }
        Ok(report)
    }

    /// Encode and submit one probe's work for this tick.
    fn encode_probe(
        &self,
        context: &RenderContext,
        scene: &mut Scene,
        id: ProbeId,
        action: TickAction,
        saved_camera: &Camera,
    ) -> Result<(), BakeError> {
        let Some((center, basis)) =
            scene.probe(id).map(|p| (p.center, p.basis))
        else {
            return Ok(());
        };

        // Override the active camera for the probe's render work; the
        // tick restores the saved camera before handing the frame back.
        scene.set_camera(Camera::cube_face(
            center,
            basis,
            CubeFace::PosX,
            saved_camera.znear,
            saved_camera.zfar,
        ));

        let Some(probe) = scene.probe(id) else {
            return Ok(());
        };
        let Some(textures) = probe.textures() else {
            return Ok(());
        };
        let meshes = scene.meshes_for_pass(RenderPassKind::Environment);

        let mut encoder = context.create_encoder();
        if action == TickAction::FullBake {
            self.capture.encode(
                context,
                &mut encoder,
                probe,
                textures,
                &meshes,
                saved_camera,
            )?;
        }
        self.specular.encode(context, &mut encoder, probe, textures)?;
        self.diffuse.encode(context, &mut encoder, probe, textures)?;
        self.convert.encode(context, &mut encoder, probe, textures);
        context.submit(encoder);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeState;
    use glam::{Mat3, Vec3};

    #[test]
    fn one_tick_bookkeeping_for_a_single_frame_probe() {
        let mut probe = ProbeState::new(Mat3::IDENTITY, Vec3::ZERO);
        probe.set_sample_budget(128, 128);
        probe.specular_resolution = 128;
        probe.mip_drop = 2;

        // 128 → 7-mip chain, two dropped: five active mips sweeping the
        // full roughness range.
        let active = probe.active_specular_mips();
        assert_eq!(active, 5);
        assert_eq!(roughness_for_mip(0, active), 0.0);
        assert_eq!(roughness_for_mip(active - 1, active), 1.0);

        assert_eq!(
            TickAction::decide(probe.phase(), true),
            TickAction::FullBake
        );
        probe.advance_samples();
        assert_eq!(probe.sample_offset(), 128);
        assert!(probe.cached());
        assert_eq!(
            TickAction::decide(probe.phase(), true),
            TickAction::Skip(SkipReason::Cached)
        );
    }

    #[test]
    fn cached_probes_take_the_noop_path() {
        assert_eq!(
            TickAction::decide(BakePhase::Cached, true),
            TickAction::Skip(SkipReason::Cached)
        );
    }

    #[test]
    fn fresh_probes_take_the_capture_path() {
        assert_eq!(
            TickAction::decide(BakePhase::Uncached, true),
            TickAction::FullBake
        );
    }

    #[test]
    fn partial_probes_take_the_refinement_path() {
        assert_eq!(
            TickAction::decide(BakePhase::Accumulating, true),
            TickAction::Refine
        );
    }

    #[test]
    fn unready_resources_defer_regardless_of_phase() {
        for phase in [
            BakePhase::Uncached,
            BakePhase::Accumulating,
            BakePhase::Cached,
        ] {
            assert_eq!(
                TickAction::decide(phase, false),
                TickAction::Skip(SkipReason::ResourcesNotReady)
            );
        }
    }
}
