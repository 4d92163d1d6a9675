//! Cross-correlation time aligner: per-frame ingestion, gating and offset estimation.

use anyhow::{Context, Result};
use nalgebra::UnitQuaternion;
use tracing::{debug, error, info, warn};

use crate::geometry::rotation_angle;
use crate::imu::{nsec_to_sec, ImuSample, Timestamp};

use super::buffer::{Measurement, MeasurementBuffer};
use super::config::{AlignmentMode, TimeAlignerConfig};
use super::correlation::{cross_correlation, sample_variance, select_best_lag};
use super::imu_signal::ingest_imu_batch;
use super::vision_signal::interpolate_vision_samples;

/// Outcome of a single estimation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentStatus {
    /// The IMU batch added nothing; reported as a zero offset with `valid` set.
    NoImuData,
    /// The correlation window is still filling.
    InsufficientData,
    /// Gyro variance over the window is below the noise threshold.
    LowSignal,
    /// An offset was computed from a full window.
    Converged,
}

/// Time offset estimate, `t_imu = t_cam + timeshift_s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAlignResult {
    pub valid: bool,
    pub timeshift_s: f64,
    pub status: AlignmentStatus,
}

impl TimeAlignResult {
    fn pending(status: AlignmentStatus) -> Self {
        Self {
            valid: false,
            timeshift_s: 0.0,
            status,
        }
    }
}

/// Estimates the IMU-to-camera time offset by correlating rotation magnitudes.
///
/// One instance serves one camera/IMU pair. Both signal windows are allocated
/// at construction and mutated by every call; nothing is rolled back when a
/// call returns an invalid result.
pub struct CrossCorrTimeAligner {
    mode: AlignmentMode,
    imu_period_s: f64,
    imu_variance_threshold: f64,
    imu_buffer: MeasurementBuffer,
    vision_buffer: MeasurementBuffer,
    /// Scratch space for the `2M - 1` correlation scores.
    scores: Vec<f64>,
}

impl CrossCorrTimeAligner {
    pub fn new(config: &TimeAlignerConfig) -> Result<Self> {
        config
            .validate()
            .context("Invalid time alignment configuration")?;
        let window = config.window_size;
        Ok(Self {
            mode: config.mode(),
            imu_period_s: config.nominal_sample_period_s,
            imu_variance_threshold: config.variance_threshold(),
            imu_buffer: MeasurementBuffer::new(window),
            vision_buffer: MeasurementBuffer::new(window),
            scores: Vec::with_capacity(2 * window - 1),
        })
    }

    pub fn mode(&self) -> AlignmentMode {
        self.mode
    }

    pub fn imu_buffer(&self) -> &MeasurementBuffer {
        &self.imu_buffer
    }

    pub fn vision_buffer(&self) -> &MeasurementBuffer {
        &self.vision_buffer
    }

    /// Feed one frame interval and try to estimate the offset.
    ///
    /// # Arguments
    /// * `frame_interval` - `(t_ref, t_cur)` camera timestamps in nanoseconds
    /// * `rot_ref_cur` - rotation of the current frame relative to the reference frame
    /// * `imu_batch` - IMU samples covering the interval, in timestamp order
    ///
    /// An empty (or fully duplicated) IMU batch yields `valid == true` with a
    /// zero offset, the same shape as a converged estimate. Callers that need
    /// to tell the two apart should check `status`.
    pub fn attempt_estimation(
        &mut self,
        frame_interval: (Timestamp, Timestamp),
        rot_ref_cur: &UnitQuaternion<f64>,
        imu_batch: &[ImuSample],
    ) -> TimeAlignResult {
        let num_imu_added = ingest_imu_batch(
            &mut self.imu_buffer,
            self.mode,
            self.imu_period_s,
            frame_interval.1,
            imu_batch,
        );
        if num_imu_added == 0 {
            error!("Failed to add IMU data. Returning default estimate.");
            return TimeAlignResult {
                valid: true,
                timeshift_s: 0.0,
                status: AlignmentStatus::NoImuData,
            };
        }

        let angle = rotation_angle(rot_ref_cur);
        match self.mode {
            AlignmentMode::ImuRate => interpolate_vision_samples(
                &mut self.vision_buffer,
                &self.imu_buffer,
                frame_interval,
                angle,
                num_imu_added,
            ),
            AlignmentMode::FrameRate => self
                .vision_buffer
                .push(Measurement::new(frame_interval.1, angle)),
        }

        if !self.vision_buffer.is_full() {
            debug!(
                filled = self.vision_buffer.len(),
                window = self.vision_buffer.capacity(),
                "Waiting for enough measurements to perform temporal calibration"
            );
            return TimeAlignResult::pending(AlignmentStatus::InsufficientData);
        }

        let imu_variance = sample_variance(self.imu_buffer.values());
        if imu_variance < self.imu_variance_threshold {
            warn!(
                variance = imu_variance,
                threshold = self.imu_variance_threshold,
                "Low gyro signal variance, delaying temporal calibration"
            );
            return TimeAlignResult::pending(AlignmentStatus::LowSignal);
        }

        // TODO: also gate on the variance of the vision signal
        let timeshift_s = self.compute_time_shift();
        info!(
            "Computed timeshift of {:.6} [s] (t_imu = t_cam + timeshift)",
            timeshift_s
        );
        TimeAlignResult {
            valid: true,
            timeshift_s,
            status: AlignmentStatus::Converged,
        }
    }

    /// Offset in seconds implied by the best correlation lag between the windows.
    pub(crate) fn compute_time_shift(&mut self) -> f64 {
        cross_correlation(
            self.vision_buffer.values(),
            self.imu_buffer.values(),
            &mut self.scores,
        );
        let best_idx = select_best_lag(&self.scores);

        let n = self.vision_buffer.len() as i64;
        let offset = (n - self.scores.len() as i64 + best_idx as i64).unsigned_abs() as usize;
        let imu_stamp = self.imu_buffer[offset].timestamp;
        let vision_start = self.vision_buffer[0].timestamp;

        if best_idx as i64 >= n - 1 {
            nsec_to_sec(imu_stamp - vision_start)
        } else {
            nsec_to_sec(vision_start - imu_stamp)
        }
    }
}
