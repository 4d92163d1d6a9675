use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::{exp_so3, rotation_angle};

/// Gyro-only rotation preintegrator.
///
/// Accumulates `ΔR ← ΔR · Exp((ω - b_g) · Δt)` with a rectangular rule, which is
/// all the time aligner needs from a frame's worth of IMU data.
#[derive(Debug, Clone)]
pub struct RotationPreintegrator {
    pub gyro_bias: Vector3<f64>,
    pub delta_rot: UnitQuaternion<f64>,
    pub dt: f64,
}

impl RotationPreintegrator {
    pub fn new(gyro_bias: Vector3<f64>) -> Self {
        Self {
            gyro_bias,
            delta_rot: UnitQuaternion::identity(),
            dt: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.delta_rot = UnitQuaternion::identity();
        self.dt = 0.0;
    }

    /// Integrate one gyro reading held constant over `dt` seconds.
    pub fn integrate(&mut self, gyro: &Vector3<f64>, dt: f64) {
        let angle_axis = (gyro - self.gyro_bias) * dt;
        self.delta_rot *= exp_so3(&angle_axis);
        self.dt += dt;
    }

    /// Rotation-angle magnitude of the integrated increment.
    pub fn rotation_angle(&self) -> f64 {
        rotation_angle(&self.delta_rot)
    }
}

impl Default for RotationPreintegrator {
    fn default() -> Self {
        Self::new(Vector3::zeros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_rate_about_one_axis() {
        let mut pim = RotationPreintegrator::default();
        let gyro = Vector3::new(0.0, 0.0, 2.0);
        for _ in 0..10 {
            pim.integrate(&gyro, 0.005);
        }
        assert_relative_eq!(pim.rotation_angle(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(pim.dt, 0.05, epsilon = 1e-12);
    }

    #[test]
    fn test_opposite_rates_cancel() {
        let mut pim = RotationPreintegrator::default();
        pim.integrate(&Vector3::new(1.0, 0.0, 0.0), 0.01);
        pim.integrate(&Vector3::new(-1.0, 0.0, 0.0), 0.01);
        assert_relative_eq!(pim.rotation_angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_is_removed() {
        let bias = Vector3::new(0.01, -0.02, 0.03);
        let mut pim = RotationPreintegrator::new(bias);
        pim.integrate(&bias, 0.1);
        assert_relative_eq!(pim.rotation_angle(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_reset() {
        let mut pim = RotationPreintegrator::default();
        pim.integrate(&Vector3::new(0.3, 0.0, 0.0), 0.1);
        pim.reset();
        assert_eq!(pim.dt, 0.0);
        assert_eq!(pim.rotation_angle(), 0.0);
    }
}
