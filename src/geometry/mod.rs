//! Geometry utilities: SO(3) exponential/logarithm and rotation magnitudes.

pub mod so3;

pub use so3::{exp_so3, log_so3, relative_rotation, rotation_angle};
