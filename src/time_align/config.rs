//! Construction-time parameters for the cross-correlation time aligner.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Multiplier on the squared gyro noise density below which the gyro
/// signal is treated as noise.
pub const DEFAULT_VARIANCE_THRESHOLD_MULTIPLIER: f64 = 3.0;

/// Which cadence the two signals are sampled at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentMode {
    /// One inertial and one vision sample per camera frame.
    FrameRate,
    /// One inertial sample per raw IMU reading; vision is interpolated onto the IMU stamps.
    ImuRate,
}

/// Aligner configuration, owned by the caller and read once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeAlignerConfig {
    /// Correlate at IMU rate instead of frame rate.
    pub use_high_rate_mode: bool,
    /// Nominal IMU sampling period in seconds.
    pub nominal_sample_period_s: f64,
    /// Gyroscope noise density (rad/s/√Hz).
    pub gyro_noise_density: f64,
    /// Number of samples in each correlation window.
    pub window_size: usize,
    pub variance_threshold_multiplier: f64,
}

impl Default for TimeAlignerConfig {
    fn default() -> Self {
        Self {
            use_high_rate_mode: true,
            // EuRoC ADIS16448 at 200 Hz
            nominal_sample_period_s: 0.005,
            gyro_noise_density: 1.6968e-4,
            window_size: 100,
            variance_threshold_multiplier: DEFAULT_VARIANCE_THRESHOLD_MULTIPLIER,
        }
    }
}

impl TimeAlignerConfig {
    pub fn mode(&self) -> AlignmentMode {
        if self.use_high_rate_mode {
            AlignmentMode::ImuRate
        } else {
            AlignmentMode::FrameRate
        }
    }

    /// Minimum gyro-signal variance required before an offset is computed.
    pub fn variance_threshold(&self) -> f64 {
        self.variance_threshold_multiplier * self.gyro_noise_density.powi(2)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.nominal_sample_period_s.is_finite() || self.nominal_sample_period_s <= 0.0 {
            bail!(
                "nominal_sample_period_s must be positive, got {}",
                self.nominal_sample_period_s
            );
        }
        if !self.gyro_noise_density.is_finite() || self.gyro_noise_density < 0.0 {
            bail!(
                "gyro_noise_density must be non-negative, got {}",
                self.gyro_noise_density
            );
        }
        if self.window_size == 0 {
            bail!("window_size must be at least 1");
        }
        if !self.variance_threshold_multiplier.is_finite()
            || self.variance_threshold_multiplier < 0.0
        {
            bail!(
                "variance_threshold_multiplier must be non-negative, got {}",
                self.variance_threshold_multiplier
            );
        }
        Ok(())
    }

    /// Check that one frame's IMU batch of up to `max_batch_len` samples fits in
    /// the window. In IMU-rate mode every new sample needs a buffered partner
    /// for interpolation, so a smaller window cannot be fed.
    pub fn validate_batch_capacity(&self, max_batch_len: usize) -> Result<()> {
        if self.mode() == AlignmentMode::ImuRate && self.window_size < max_batch_len {
            bail!(
                "window_size {} is smaller than the largest per-frame IMU batch ({} samples)",
                self.window_size,
                max_batch_len
            );
        }
        Ok(())
    }
}
