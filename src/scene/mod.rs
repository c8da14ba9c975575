//! Authoritative scene: meshes, the probe arena, the active camera, and
//! the active BRDF.
//!
//! Probes live in an id-addressed arena. Handles stay valid across
//! removals of other probes, and all bake-progress mutation funnels
//! through the scheduler plus the explicit `uncache` / `mark_computed`
//! operations on [`ProbeState`].

mod mesh;

pub use mesh::{RenderPassKind, SceneMesh, Vertex};

use crate::brdf::Brdf;
use crate::camera::Camera;
use crate::probe::ProbeState;

/// Stable handle to a probe in the scene arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProbeId(u32);

struct ProbeEntry {
    id: ProbeId,
    state: ProbeState,
}

/// The authoritative scene. Owns meshes, probes, the active camera, and
/// the active BRDF.
pub struct Scene {
    meshes: Vec<SceneMesh>,
    probes: Vec<ProbeEntry>,
    next_probe_id: u32,
    camera: Camera,
    brdf: Option<Brdf>,
}

impl Scene {
    /// Create an empty scene with a default camera and no BRDF.
    #[must_use]
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            probes: Vec::new(),
            next_probe_id: 0,
            camera: Camera::default(),
            brdf: None,
        }
    }

    // -- Camera --

    /// The active camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the active camera. The baker uses this to override the
    /// camera during probe capture and to restore it afterward.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    // -- BRDF --

    /// The active BRDF, if one is installed.
    #[must_use]
    pub fn brdf(&self) -> Option<&Brdf> {
        self.brdf.as_ref()
    }

    /// Mutable access to the active BRDF (e.g. for kernel live-edits).
    pub fn brdf_mut(&mut self) -> Option<&mut Brdf> {
        self.brdf.as_mut()
    }

    /// Install the active BRDF.
    pub fn set_brdf(&mut self, brdf: Brdf) {
        self.brdf = Some(brdf);
    }

    // -- Meshes --

    /// Add a mesh. Returns its index in insertion order.
    pub fn add_mesh(&mut self, mesh: SceneMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// All meshes tagged for `pass`, in insertion order.
    #[must_use]
    pub fn meshes_for_pass(&self, pass: RenderPassKind) -> Vec<&SceneMesh> {
        self.meshes.iter().filter(|m| m.has_pass(pass)).collect()
    }

    /// Number of meshes.
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    // -- Probes --

    /// Add a probe. Returns its stable handle.
    pub fn add_probe(&mut self, state: ProbeState) -> ProbeId {
        let id = ProbeId(self.next_probe_id);
        self.next_probe_id += 1;
        self.probes.push(ProbeEntry { id, state });
        id
    }

    /// Remove a probe by handle. Returns the removed state, if any.
    pub fn remove_probe(&mut self, id: ProbeId) -> Option<ProbeState> {
        let idx = self.probes.iter().position(|e| e.id == id)?;
        Some(self.probes.remove(idx).state)
    }

    /// Read access to a probe.
    #[must_use]
    pub fn probe(&self, id: ProbeId) -> Option<&ProbeState> {
        self.probes.iter().find(|e| e.id == id).map(|e| &e.state)
    }

    /// Write access to a probe.
    pub fn probe_mut(&mut self, id: ProbeId) -> Option<&mut ProbeState> {
        self.probes
            .iter_mut()
            .find(|e| e.id == id)
            .map(|e| &mut e.state)
    }

    /// Handles of all probes in insertion order.
    #[must_use]
    pub fn probe_ids(&self) -> Vec<ProbeId> {
        self.probes.iter().map(|e| e.id).collect()
    }

    /// Mutable iteration over all probe states (insertion order).
    pub fn probes_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut ProbeState> + '_ {
        self.probes.iter_mut().map(|e| &mut e.state)
    }

    /// Number of probes.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat3, Vec3};

    fn test_probe() -> ProbeState {
        ProbeState::new(Mat3::IDENTITY, Vec3::ZERO)
    }

    #[test]
    fn probe_handles_survive_removal_of_others() {
        let mut scene = Scene::new();
        let a = scene.add_probe(test_probe());
        let b = scene.add_probe(test_probe());
        let c = scene.add_probe(test_probe());

        assert!(scene.remove_probe(b).is_some());
        assert!(scene.probe(a).is_some());
        assert!(scene.probe(c).is_some());
        assert!(scene.probe(b).is_none());
        assert_eq!(scene.probe_count(), 2);
    }

    #[test]
    fn probe_ids_are_never_reused() {
        let mut scene = Scene::new();
        let a = scene.add_probe(test_probe());
        assert!(scene.remove_probe(a).is_some());
        let b = scene.add_probe(test_probe());
        assert_ne!(a, b);
    }

    #[test]
    fn probes_mut_visits_every_probe() {
        let mut scene = Scene::new();
        let _ = scene.add_probe(test_probe());
        let _ = scene.add_probe(test_probe());
        for p in scene.probes_mut() {
            p.mark_computed(true);
        }
        for id in scene.probe_ids() {
            assert!(scene.probe(id).is_some_and(ProbeState::cached));
        }
    }

    #[test]
    fn camera_round_trips_through_set() {
        let mut scene = Scene::new();
        let saved = *scene.camera();
        let mut override_cam = saved;
        override_cam.fovy = 90.0;
        scene.set_camera(override_cam);
        assert_eq!(scene.camera().fovy, 90.0);
        scene.set_camera(saved);
        assert_eq!(scene.camera().fovy, saved.fovy);
    }
}
