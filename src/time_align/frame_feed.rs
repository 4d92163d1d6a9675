//! Per-frame driver that turns absolute frame orientations into the relative
//! rotations the aligner consumes.

use anyhow::Result;
use nalgebra::UnitQuaternion;

use crate::geometry::relative_rotation;
use crate::imu::{ImuSample, Timestamp};

use super::aligner::{AlignmentStatus, CrossCorrTimeAligner, TimeAlignResult};
use super::config::TimeAlignerConfig;

/// Keeps the previous frame and forwards each new frame pair to a
/// [`CrossCorrTimeAligner`].
pub struct FrameFeed {
    aligner: CrossCorrTimeAligner,
    last_frame: Option<(Timestamp, UnitQuaternion<f64>)>,
    estimate: Option<f64>,
}

impl FrameFeed {
    pub fn new(config: &TimeAlignerConfig) -> Result<Self> {
        Ok(Self {
            aligner: CrossCorrTimeAligner::new(config)?,
            last_frame: None,
            estimate: None,
        })
    }

    /// Process a frame with its world orientation and the IMU samples since the
    /// previous frame.
    ///
    /// The first frame after construction or [`reset`](Self::reset) only becomes
    /// the reference and reports `InsufficientData`.
    pub fn process_frame(
        &mut self,
        timestamp_ns: Timestamp,
        orientation: UnitQuaternion<f64>,
        imu_batch: &[ImuSample],
    ) -> TimeAlignResult {
        let previous = self.last_frame.replace((timestamp_ns, orientation));
        let Some((last_ts, last_rot)) = previous else {
            return TimeAlignResult {
                valid: false,
                timeshift_s: 0.0,
                status: AlignmentStatus::InsufficientData,
            };
        };

        let rot_ref_cur = relative_rotation(&last_rot, &orientation);
        let result = self
            .aligner
            .attempt_estimation((last_ts, timestamp_ns), &rot_ref_cur, imu_batch);
        if result.status == AlignmentStatus::Converged && self.estimate.is_none() {
            self.estimate = Some(result.timeshift_s);
        }
        result
    }

    /// First converged offset, `t_imu = t_cam + timeshift_s`.
    pub fn estimate(&self) -> Option<f64> {
        self.estimate
    }

    /// Forget the reference frame; the next frame starts a new pair.
    pub fn reset(&mut self) {
        self.last_frame = None;
    }

    pub fn aligner(&self) -> &CrossCorrTimeAligner {
        &self.aligner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    use crate::geometry::exp_so3;

    const PERIOD_NS: Timestamp = 5_000_000;

    fn samples(first: i64, last: i64, rate: f64) -> Vec<ImuSample> {
        (first..=last)
            .map(|j| ImuSample::from_gyro(j * PERIOD_NS, Vector3::new(rate, 0.0, 0.0)))
            .collect()
    }

    fn frame_rate_feed(window_size: usize) -> FrameFeed {
        FrameFeed::new(&TimeAlignerConfig {
            use_high_rate_mode: false,
            window_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_first_frame_only_sets_reference() {
        let mut feed = frame_rate_feed(4);
        let result = feed.process_frame(0, UnitQuaternion::identity(), &samples(0, 2, 1.0));

        assert_eq!(result.status, AlignmentStatus::InsufficientData);
        assert!(feed.aligner().imu_buffer().is_empty());
        assert!(feed.aligner().vision_buffer().is_empty());
    }

    #[test]
    fn test_forwards_relative_rotation() {
        let mut feed = frame_rate_feed(4);
        let axis = Vector3::new(0.0, 1.0, 0.0);
        feed.process_frame(0, exp_so3(&(axis * 0.3)), &[]);
        feed.process_frame(10 * PERIOD_NS, exp_so3(&(axis * 0.5)), &samples(0, 10, 1.0));

        let vision = feed.aligner().vision_buffer();
        assert_eq!(vision.len(), 1);
        assert_eq!(vision[0].timestamp, 10 * PERIOD_NS);
        assert_abs_diff_eq!(vision[0].value, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_second_frame_pairs_with_first() {
        let mut feed = frame_rate_feed(4);
        feed.process_frame(0, UnitQuaternion::identity(), &[]);
        let result = feed.process_frame(10, UnitQuaternion::identity(), &samples(0, 1, 1.0));

        assert_eq!(result.status, AlignmentStatus::InsufficientData);
        assert_eq!(feed.aligner().vision_buffer().len(), 1);
        assert_eq!(feed.aligner().vision_buffer()[0].timestamp, 10);
    }

    #[test]
    fn test_reset_starts_new_pair() {
        let mut feed = frame_rate_feed(4);
        feed.process_frame(0, UnitQuaternion::identity(), &[]);
        feed.process_frame(10, UnitQuaternion::identity(), &samples(0, 1, 1.0));
        feed.reset();

        let result = feed.process_frame(20, UnitQuaternion::identity(), &samples(1, 2, 1.0));
        assert_eq!(result.status, AlignmentStatus::InsufficientData);
        assert_eq!(feed.aligner().imu_buffer().len(), 1);
    }

    #[test]
    fn test_keeps_first_converged_estimate() {
        let mut feed = frame_rate_feed(3);
        let rates = [0.1, 2.0, 0.1, 0.1, 0.1, 0.1];
        let angles = [0.0, 0.1, 0.0, 0.0, 0.0, 0.0];

        feed.process_frame(0, UnitQuaternion::identity(), &[]);
        let mut orientation = UnitQuaternion::identity();
        let mut results = Vec::new();
        for (k, (&rate, &angle)) in rates.iter().zip(angles.iter()).enumerate() {
            let k = k as i64;
            orientation *= exp_so3(&Vector3::new(0.0, 0.0, angle));
            let batch = samples(10 * k, 10 * (k + 1), rate);
            results.push(feed.process_frame(10 * (k + 1) * PERIOD_NS, orientation, &batch));
        }

        let first_converged = results
            .iter()
            .find(|r| r.status == AlignmentStatus::Converged)
            .copied()
            .unwrap();
        assert_eq!(feed.estimate(), Some(first_converged.timeshift_s));
        assert_abs_diff_eq!(first_converged.timeshift_s, 0.0, epsilon = 1e-12);
    }
}
