//! Shader-hash-driven cache invalidation.

use crate::probe::ProbeState;

/// Tracks the content hashes of the active BRDF's convolution kernels
/// across scheduler passes.
///
/// If either hash differs from the last-seen pair, every probe is
/// uncached before the frame's bake work proceeds, so kernel edits take
/// effect live at the cost of one full re-bake cycle for all probes.
pub struct CacheInvalidationTracker {
    /// Last-seen (specular, diffuse) kernel hashes.
    hashes: Option<(u64, u64)>,
}

impl Default for CacheInvalidationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInvalidationTracker {
    /// Create a tracker with no observed hashes yet.
    #[must_use]
    pub fn new() -> Self {
        Self { hashes: None }
    }

    /// Compare the current kernel hashes against the stored pair,
    /// uncaching every probe on a mismatch, then store the new pair.
    ///
    /// Returns `true` iff a global invalidation happened. The first
    /// observation only initializes the tracker.
    pub fn refresh<'a, I>(
        &mut self,
        specular_hash: u64,
        diffuse_hash: u64,
        probes: I,
    ) -> bool
    where
        I: IntoIterator<Item = &'a mut ProbeState>,
    {
        let current = (specular_hash, diffuse_hash);
        let changed = match self.hashes {
            Some(seen) => seen != current,
            None => false,
        };
        self.hashes = Some(current);

        if changed {
            for probe in probes {
                probe.uncache();
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Vec3};

    fn cached_probe() -> ProbeState {
        let mut p = ProbeState::new(Mat3::IDENTITY, Vec3::ZERO);
        p.mark_computed(true);
        p
    }

    #[test]
    fn first_observation_does_not_invalidate() {
        let mut tracker = CacheInvalidationTracker::new();
        let mut probes = vec![cached_probe()];
        assert!(!tracker.refresh(1, 2, probes.iter_mut()));
        assert!(probes[0].cached());
    }

    #[test]
    fn unchanged_hashes_leave_probes_alone() {
        let mut tracker = CacheInvalidationTracker::new();
        let mut probes = vec![cached_probe(), cached_probe()];
        let _ = tracker.refresh(1, 2, probes.iter_mut());
        assert!(!tracker.refresh(1, 2, probes.iter_mut()));
        assert!(probes.iter().all(ProbeState::cached));
    }

    #[test]
    fn specular_hash_change_uncaches_every_probe() {
        let mut tracker = CacheInvalidationTracker::new();
        let mut probes = vec![cached_probe(), cached_probe()];
        let _ = tracker.refresh(1, 2, probes.iter_mut());
        assert!(tracker.refresh(99, 2, probes.iter_mut()));
        assert!(probes.iter().all(|p| !p.cached()));
        assert!(probes.iter().all(|p| p.sample_offset() == 0));
    }

    #[test]
    fn diffuse_hash_change_also_invalidates() {
        let mut tracker = CacheInvalidationTracker::new();
        let mut probes = vec![cached_probe()];
        let _ = tracker.refresh(1, 2, probes.iter_mut());
        assert!(tracker.refresh(1, 3, probes.iter_mut()));
        assert!(!probes[0].cached());
    }

    #[test]
    fn kernel_edit_invalidates_probes_via_brdf_hashes() {
        use crate::brdf::Brdf;
        use crate::scene::Scene;

        let mut scene = Scene::new();
        let a = scene.add_probe(cached_probe());
        let b = scene.add_probe(cached_probe());

        let mut brdf = Brdf::new();
        let mut tracker = CacheInvalidationTracker::new();
        let _ = tracker.refresh(
            brdf.specular_hash(),
            brdf.diffuse_hash(),
            scene.probes_mut(),
        );

        brdf.set_specular_kernel("// tweaked kernel".to_owned());
        assert!(tracker.refresh(
            brdf.specular_hash(),
            brdf.diffuse_hash(),
            scene.probes_mut(),
        ));
        for id in [a, b] {
            let probe = scene.probe(id);
            assert!(probe.is_some_and(|p| !p.cached()));
        }
    }

    #[test]
    fn invalidation_fires_once_per_change() {
        let mut tracker = CacheInvalidationTracker::new();
        let mut probes = vec![cached_probe()];
        let _ = tracker.refresh(1, 2, probes.iter_mut());
        assert!(tracker.refresh(7, 2, probes.iter_mut()));
        // Same new pair again: no further invalidation.
        probes[0].mark_computed(true);
        assert!(!tracker.refresh(7, 2, probes.iter_mut()));
        assert!(probes[0].cached());
    }
}
