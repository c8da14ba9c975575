//! Capture camera math for cube-face rendering.
//!
//! Probe capture renders the scene six times, once per cubemap face,
//! through 90° square-aspect cameras oriented by the probe's basis. The
//! face orientation table here is paired with the direction table in
//! `assets/shaders/modules/cube.wgsl`; the capture projection flips Y so
//! rasterized texel rows line up with cubemap face addressing.

use glam::{Mat3, Mat4, Vec3};

/// One face of a cubemap, in the standard `+X -X +Y -Y +Z -Z` order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CubeFace {
    /// Positive X.
    PosX,
    /// Negative X.
    NegX,
    /// Positive Y.
    PosY,
    /// Negative Y.
    NegY,
    /// Positive Z.
    PosZ,
    /// Negative Z.
    NegZ,
}

impl CubeFace {
    /// All six faces in array-layer order.
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// The face's array layer index.
    #[must_use]
    pub fn index(self) -> u32 {
        match self {
            Self::PosX => 0,
            Self::NegX => 1,
            Self::PosY => 2,
            Self::NegY => 3,
            Self::PosZ => 4,
            Self::NegZ => 5,
        }
    }

    /// View direction through the face center.
    #[must_use]
    pub fn forward(self) -> Vec3 {
        match self {
            Self::PosX => Vec3::X,
            Self::NegX => Vec3::NEG_X,
            Self::PosY => Vec3::Y,
            Self::NegY => Vec3::NEG_Y,
            Self::PosZ => Vec3::Z,
            Self::NegZ => Vec3::NEG_Z,
        }
    }

    /// Up vector for the face's capture camera.
    ///
    /// Combined with the Y-flipped capture projection these reproduce
    /// the face direction table used by the convolution shaders.
    #[must_use]
    pub fn up(self) -> Vec3 {
        match self {
            Self::PosY => Vec3::Z,
            Self::NegY => Vec3::NEG_Z,
            _ => Vec3::NEG_Y,
        }
    }
}

/// Perspective camera defined by eye position, look direction, and
/// projection parameters.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Normalized look direction.
    pub forward: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 5.0),
            forward: Vec3::NEG_Z,
            up: Vec3::Y,
            aspect: 1.6,
            fovy: 45.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

impl Camera {
    /// Build the capture camera for one cube face of a probe.
    ///
    /// 90° vertical FOV at aspect 1 so the six frusta tile the full
    /// sphere; `basis` rotates the face set into the probe's
    /// orientation.
    #[must_use]
    pub fn cube_face(
        center: Vec3,
        basis: Mat3,
        face: CubeFace,
        znear: f32,
        zfar: f32,
    ) -> Self {
        Self {
            eye: center,
            forward: (basis * face.forward()).normalize(),
            up: (basis * face.up()).normalize(),
            aspect: 1.0,
            fovy: 90.0,
            znear,
            zfar,
        }
    }

    /// Build the combined view-projection matrix.
    #[must_use]
    pub fn build_matrix(&self) -> Mat4 {
        let view = Mat4::look_to_rh(self.eye, self.forward, self.up);
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        let proj = Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj * view
    }

    /// View-projection for cube-face capture: [`Self::build_matrix`]
    /// with the projection's Y axis negated, so texel row 0 of the
    /// render target is the top row of the cubemap face.
    #[must_use]
    pub fn build_capture_matrix(&self) -> Mat4 {
        let view = Mat4::look_to_rh(self.eye, self.forward, self.up);
        let mut proj = Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj.y_axis = -proj.y_axis;
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_vectors_are_orthonormal() {
        for face in CubeFace::ALL {
            let f = face.forward();
            let u = face.up();
            assert!((f.length() - 1.0).abs() < 1e-6);
            assert!((u.length() - 1.0).abs() < 1e-6);
            assert!(f.dot(u).abs() < 1e-6, "face {face:?} not orthogonal");
        }
    }

    #[test]
    fn face_indices_cover_all_layers() {
        let indices: Vec<u32> =
            CubeFace::ALL.iter().map(|f| f.index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn cube_face_camera_uses_probe_basis() {
        let basis = Mat3::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let cam = Camera::cube_face(
            Vec3::ZERO,
            basis,
            CubeFace::PosZ,
            0.1,
            100.0,
        );
        // Rotating 90° about Y maps +Z to +X.
        assert!((cam.forward - Vec3::X).length() < 1e-5);
        assert_eq!(cam.fovy, 90.0);
        assert_eq!(cam.aspect, 1.0);
    }

    #[test]
    fn capture_matrix_is_finite_and_invertible() {
        let cam = Camera::cube_face(
            Vec3::new(1.0, 2.0, 3.0),
            Mat3::IDENTITY,
            CubeFace::NegX,
            0.1,
            50.0,
        );
        let m = cam.build_capture_matrix();
        assert!(m.to_cols_array().iter().all(|v| v.is_finite()));
        assert!(m.determinant().abs() > 1e-8);
    }
}
