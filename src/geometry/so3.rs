//! SO(3) Lie group utilities for rotation-magnitude signals.
//!
//! Rotations are carried as `UnitQuaternion<f64>`. The logarithm maps onto the
//! tangent vector φ with |φ| ∈ [0, π], so the rotation angle of any increment is
//! the norm of its logarithm.

use nalgebra::{UnitQuaternion, Vector3};

/// Below this imaginary-part norm the logarithm uses its first-order form.
const SMALL_ANGLE_THRESHOLD: f64 = 1e-6;

/// Exponential map: tangent vector φ (axis × angle) to rotation.
#[inline]
pub fn exp_so3(phi: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*phi)
}

/// Logarithm map: rotation to tangent vector φ with |φ| ≤ π.
///
/// Uses `atan2` rather than `acos` of the scalar part so that angles far
/// below the square root of machine epsilon are not flushed to zero.
pub fn log_so3(rot: &UnitQuaternion<f64>) -> Vector3<f64> {
    let q = rot.quaternion();
    // q and -q are the same rotation; take the one with w >= 0.
    let (w, v) = if q.scalar() < 0.0 {
        (-q.scalar(), -q.imag())
    } else {
        (q.scalar(), q.imag())
    };
    let v_norm = v.norm();

    if v_norm < SMALL_ANGLE_THRESHOLD {
        return v * (2.0 / w);
    }
    v * (2.0 * v_norm.atan2(w) / v_norm)
}

/// Rotation-angle magnitude `|Log(R)|` in radians.
#[inline]
pub fn rotation_angle(rot: &UnitQuaternion<f64>) -> f64 {
    log_so3(rot).norm()
}

/// Relative rotation `R_ref⁻¹ · R_cur` taking the reference frame into the current one.
#[inline]
pub fn relative_rotation(
    rot_ref: &UnitQuaternion<f64>,
    rot_cur: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    rot_ref.inverse() * rot_cur
}
