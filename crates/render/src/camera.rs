use glam::Vec3;
use pathtrace_common::{MAX_FOV_DEGREES, MIN_FOV_DEGREES};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// Pitch stays this far from straight up/down so the right vector never
/// degenerates.
pub const PITCH_LIMIT: f32 = FRAC_PI_2 - 1e-3;
pub const MIN_FOV: f32 = MIN_FOV_DEGREES * PI / 180.0;
pub const MAX_FOV: f32 = MAX_FOV_DEGREES * PI / 180.0;

/// Yaw/pitch in radians. Not uploaded; only the derived basis is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRotation {
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraRotation {
    /// Looking down -Z.
    fn default() -> Self {
        Self {
            yaw: -FRAC_PI_2,
            pitch: 0.0,
        }
    }
}

/// Orthonormal camera frame in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub forward: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Basis {
    pub fn is_orthonormal(&self, epsilon: f32) -> bool {
        let unit = |v: Vec3| (v.length() - 1.0).abs() <= epsilon;
        unit(self.forward)
            && unit(self.right)
            && unit(self.up)
            && self.forward.dot(self.right).abs() <= epsilon
            && self.forward.dot(self.up).abs() <= epsilon
            && self.right.dot(self.up).abs() <= epsilon
    }
}

/// Fly camera: position, yaw/pitch rotation and vertical field of view.
///
/// Holds no dirty flag. Every mutator reports whether it changed anything
/// and the owner forwards that to the parameter synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    position: Vec3,
    rotation: CameraRotation,
    fov_y: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.0, 4.0), 60.0_f32.to_radians())
    }
}

impl CameraState {
    pub fn new(position: Vec3, fov_y: f32) -> Self {
        Self {
            position,
            rotation: CameraRotation::default(),
            fov_y: fov_y.clamp(MIN_FOV, MAX_FOV),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> CameraRotation {
        self.rotation
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Add to yaw and pitch. Pitch is clamped to ±[`PITCH_LIMIT`], yaw
    /// wraps to [-π, π]. Non-finite deltas are ignored.
    pub fn rotate(&mut self, delta_yaw: f32, delta_pitch: f32) -> bool {
        if !delta_yaw.is_finite() || !delta_pitch.is_finite() {
            return false;
        }
        let old = self.rotation;
        if delta_yaw != 0.0 {
            self.rotation.yaw = (old.yaw + delta_yaw + PI).rem_euclid(TAU) - PI;
        }
        self.rotation.pitch = (old.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.rotation != old
    }

    /// Move in the camera frame: `x` along right, `y` along world up,
    /// `z` along forward.
    pub fn translate_local(&mut self, delta: Vec3) -> bool {
        if !delta.is_finite() || delta == Vec3::ZERO {
            return false;
        }
        let basis = self.basis_vectors();
        self.position += basis.right * delta.x + Vec3::Y * delta.y + basis.forward * delta.z;
        true
    }

    /// Widen (positive) or narrow the field of view, within
    /// [`MIN_FOV`]..=[`MAX_FOV`].
    pub fn zoom(&mut self, delta_fov: f32) -> bool {
        if !delta_fov.is_finite() {
            return false;
        }
        let old = self.fov_y;
        self.fov_y = (old + delta_fov).clamp(MIN_FOV, MAX_FOV);
        self.fov_y != old
    }

    /// Forward/right/up for the current rotation. Pure; recomputed from the
    /// angles each call so no drift accumulates.
    pub fn basis_vectors(&self) -> Basis {
        let CameraRotation { yaw, pitch } = self.rotation;
        let forward = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        Basis { forward, right, up }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn horizontal_angle(v: Vec3) -> f32 {
        v.z.atan2(v.x)
    }

    #[test]
    fn default_looks_down_negative_z() {
        let basis = CameraState::default().basis_vectors();
        assert!(basis.forward.abs_diff_eq(Vec3::NEG_Z, EPS));
        assert!(basis.up.abs_diff_eq(Vec3::Y, EPS));
        assert!(basis.right.abs_diff_eq(Vec3::X, EPS));
    }

    #[test]
    fn basis_orthonormal_for_reachable_rotations() {
        let mut cam = CameraState::default();
        for i in 0..200 {
            let t = i as f32 * 0.37;
            cam.rotate(t.sin() * 3.0, t.cos() * 0.9);
            let basis = cam.basis_vectors();
            assert!(basis.is_orthonormal(EPS), "not orthonormal at step {i}: {basis:?}");
        }
    }

    #[test]
    fn basis_orthonormal_at_pitch_limits() {
        let mut cam = CameraState::default();
        cam.rotate(0.3, 100.0);
        assert_eq!(cam.rotation().pitch, PITCH_LIMIT);
        assert!(cam.basis_vectors().is_orthonormal(EPS));

        cam.rotate(-1.1, -200.0);
        assert_eq!(cam.rotation().pitch, -PITCH_LIMIT);
        assert!(cam.basis_vectors().is_orthonormal(EPS));
    }

    #[test]
    fn yaw_shifts_forward_horizontally() {
        let mut cam = CameraState::default();
        let before = cam.basis_vectors();
        assert!(cam.rotate(0.1, 0.0));
        let after = cam.basis_vectors();

        let shift = horizontal_angle(after.forward) - horizontal_angle(before.forward);
        assert!((shift - 0.1).abs() < EPS, "shift was {shift}");
        assert!(after.up.abs_diff_eq(before.up, EPS));
    }

    #[test]
    fn zero_rotation_reports_no_change() {
        let mut cam = CameraState::default();
        assert!(!cam.rotate(0.0, 0.0));
    }

    #[test]
    fn pitch_at_limit_reports_no_change() {
        let mut cam = CameraState::default();
        cam.rotate(0.0, 10.0);
        assert!(!cam.rotate(0.0, 0.5));
    }

    #[test]
    fn non_finite_rotation_ignored() {
        let mut cam = CameraState::default();
        assert!(!cam.rotate(f32::NAN, 0.0));
        assert!(!cam.rotate(0.0, f32::INFINITY));
        assert_eq!(cam.rotation(), CameraRotation::default());
    }

    #[test]
    fn yaw_wraps() {
        let mut cam = CameraState::default();
        for _ in 0..1000 {
            cam.rotate(1.0, 0.0);
        }
        let yaw = cam.rotation().yaw;
        assert!((-PI..=PI).contains(&yaw));
        assert!(cam.basis_vectors().is_orthonormal(EPS));
    }

    #[test]
    fn translate_follows_forward() {
        let mut cam = CameraState::default();
        let start = cam.position();
        assert!(cam.translate_local(Vec3::new(0.0, 0.0, 2.0)));
        assert!(cam.position().abs_diff_eq(start + Vec3::NEG_Z * 2.0, EPS));
        assert!(!cam.translate_local(Vec3::ZERO));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = CameraState::default();
        assert!(cam.zoom(10.0));
        assert_eq!(cam.fov_y(), MAX_FOV);
        assert!(!cam.zoom(0.1));
        cam.zoom(-10.0);
        assert_eq!(cam.fov_y(), MIN_FOV);
    }
}
