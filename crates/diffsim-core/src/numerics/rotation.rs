//! Particle orientations.
//!
//! Euler angles follow the roll/pitch/yaw convention: `angle_0` about x (the
//! beam axis), then `angle_1` about y, then `angle_2` about z, all extrinsic,
//! so `R = Rz(angle_2)·Ry(angle_1)·Rx(angle_0)`.

use crate::common::constants::TWO_PI;
use nalgebra::{Quaternion, Rotation3, UnitQuaternion, Vector3};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EulerAngles {
    pub angle_0: f64,
    pub angle_1: f64,
    pub angle_2: f64,
}

impl EulerAngles {
    pub const fn new(angle_0: f64, angle_1: f64, angle_2: f64) -> Self {
        Self {
            angle_0,
            angle_1,
            angle_2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    rotation: Rotation3<f64>,
}

impl Orientation {
    pub fn from_euler_angles(angles: EulerAngles) -> Self {
        Self {
            rotation: Rotation3::from_euler_angles(angles.angle_0, angles.angle_1, angles.angle_2),
        }
    }

    pub fn about_beam_axis(angle: f64) -> Self {
        Self::from_euler_angles(EulerAngles::new(angle, 0.0, 0.0))
    }

    /// Uniformly distributed over SO(3) (Shoemake's subgroup algorithm).
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let u1: f64 = rng.r#gen();
        let u2: f64 = rng.r#gen();
        let u3: f64 = rng.r#gen();
        let (s1, s2) = ((1.0 - u1).sqrt(), u1.sqrt());
        let quaternion = Quaternion::new(
            s2 * (TWO_PI * u3).cos(),
            s1 * (TWO_PI * u2).sin(),
            s1 * (TWO_PI * u2).cos(),
            s2 * (TWO_PI * u3).sin(),
        );
        Self {
            rotation: UnitQuaternion::from_quaternion(quaternion).to_rotation_matrix(),
        }
    }

    /// Uniformly distributed rotation about the beam axis only.
    pub fn random_about_beam_axis<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let fraction: f64 = rng.r#gen();
        Self::about_beam_axis(TWO_PI * fraction)
    }

    pub fn euler_angles(&self) -> EulerAngles {
        let (roll, pitch, yaw) = self.rotation.euler_angles();
        EulerAngles::new(roll, pitch, yaw)
    }

    /// Maps particle-frame coordinates to laboratory coordinates.
    pub fn rotate(&self, vector: [f64; 3]) -> [f64; 3] {
        let rotated = self.rotation * Vector3::from(vector);
        [rotated.x, rotated.y, rotated.z]
    }
}
