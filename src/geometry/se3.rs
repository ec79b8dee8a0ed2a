//! SE3 rigid transform: unit quaternion rotation + translation.

use nalgebra::{UnitQuaternion, Vector3};

/// A rigid transform in 3D. The engine reports camera poses in this form;
/// whether it means camera-to-world or world-to-camera is the engine's
/// convention and this crate forwards it untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Compose two transforms: `self * other`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse();
        SE3 {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_with_identity() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
            Vector3::new(1.0, 2.0, 3.0),
        );
        let composed = t.compose(&SE3::identity());
        assert_relative_eq!(composed.translation, t.translation, epsilon = 1e-12);
        assert_relative_eq!(
            composed.rotation.angle_to(&t.rotation),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.4, -0.2, 0.9),
            Vector3::new(-1.0, 0.5, 2.0),
        );
        let id = t.compose(&t.inverse());
        assert_relative_eq!(id.translation, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(id.rotation.angle(), 0.0, epsilon = 1e-12);
    }
}
