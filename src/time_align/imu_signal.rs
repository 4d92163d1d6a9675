//! Gyro batch → scalar rotation-magnitude signal.

use tracing::{error, trace};

use crate::imu::{ImuSample, RotationPreintegrator, Timestamp};

use super::buffer::{Measurement, MeasurementBuffer};
use super::config::AlignmentMode;

/// Append the rotation signal for one frame's IMU batch to `imu_buffer`.
///
/// Returns the number of measurements appended. An empty batch appends
/// nothing and returns 0.
///
/// * `FrameRate`: the whole batch is integrated with the nominal period and a
///   single rotation angle is pushed at `frame_timestamp`.
/// * `ImuRate`: every sample contributes `|ω| · period` at its own stamp. The
///   first sample is dropped when it is not newer than the buffer's last entry,
///   since consecutive batches share their boundary sample.
pub fn ingest_imu_batch(
    imu_buffer: &mut MeasurementBuffer,
    mode: AlignmentMode,
    sample_period_s: f64,
    frame_timestamp: Timestamp,
    batch: &[ImuSample],
) -> usize {
    let Some(first) = batch.first() else {
        error!("IMU batch for frame {} has no measurements", frame_timestamp);
        return 0;
    };

    match mode {
        AlignmentMode::FrameRate => {
            let mut pim = RotationPreintegrator::default();
            for sample in batch {
                pim.integrate(&sample.gyro, sample_period_s);
            }
            imu_buffer.push(Measurement::new(frame_timestamp, pim.rotation_angle()));
            1
        }
        AlignmentMode::ImuRate => {
            let start = match imu_buffer.back() {
                Some(last) if last.timestamp >= first.timestamp_ns => {
                    trace!(
                        timestamp_ns = first.timestamp_ns,
                        "Skipping IMU sample shared with previous batch"
                    );
                    1
                }
                _ => 0,
            };
            for sample in &batch[start..] {
                imu_buffer.push(Measurement::new(
                    sample.timestamp_ns,
                    sample.gyro.norm() * sample_period_s,
                ));
            }
            batch.len() - start
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const PERIOD_S: f64 = 0.005;

    fn batch(stamps: &[Timestamp], gyro: Vector3<f64>) -> Vec<ImuSample> {
        stamps.iter().map(|&t| ImuSample::from_gyro(t, gyro)).collect()
    }

    #[test]
    fn test_empty_batch_adds_nothing() {
        let mut buffer = MeasurementBuffer::new(10);
        for mode in [AlignmentMode::FrameRate, AlignmentMode::ImuRate] {
            assert_eq!(ingest_imu_batch(&mut buffer, mode, PERIOD_S, 100, &[]), 0);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_frame_rate_pushes_single_integrated_angle() {
        let mut buffer = MeasurementBuffer::new(10);
        let samples = batch(&[0, 5, 10, 15], Vector3::new(0.0, 3.0, 4.0));

        let added = ingest_imu_batch(&mut buffer, AlignmentMode::FrameRate, PERIOD_S, 42, &samples);

        assert_eq!(added, 1);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer[0].timestamp, 42);
        // |ω| = 5 rad/s over 4 steps of 5 ms
        assert_relative_eq!(buffer[0].value, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_imu_rate_pushes_every_sample() {
        let mut buffer = MeasurementBuffer::new(10);
        let samples = batch(&[0, 5, 10], Vector3::new(2.0, 0.0, 0.0));

        let added = ingest_imu_batch(&mut buffer, AlignmentMode::ImuRate, PERIOD_S, 10, &samples);

        assert_eq!(added, 3);
        assert_eq!(buffer.iter().map(|m| m.timestamp).collect::<Vec<_>>(), vec![0, 5, 10]);
        for m in buffer.iter() {
            assert_relative_eq!(m.value, 0.01, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_imu_rate_skips_shared_boundary_sample() {
        let mut buffer = MeasurementBuffer::new(10);
        let gyro = Vector3::new(0.0, 0.0, 1.0);
        ingest_imu_batch(
            &mut buffer,
            AlignmentMode::ImuRate,
            PERIOD_S,
            10,
            &batch(&[0, 5, 10], gyro),
        );

        let added = ingest_imu_batch(
            &mut buffer,
            AlignmentMode::ImuRate,
            PERIOD_S,
            20,
            &batch(&[10, 15, 20], gyro),
        );

        assert_eq!(added, 2);
        assert_eq!(
            buffer.iter().map(|m| m.timestamp).collect::<Vec<_>>(),
            vec![0, 5, 10, 15, 20]
        );
    }

    #[test]
    fn test_imu_rate_keeps_first_sample_when_newer() {
        let mut buffer = MeasurementBuffer::new(10);
        let gyro = Vector3::new(0.0, 0.0, 1.0);
        ingest_imu_batch(&mut buffer, AlignmentMode::ImuRate, PERIOD_S, 5, &batch(&[0, 5], gyro));

        let added = ingest_imu_batch(
            &mut buffer,
            AlignmentMode::ImuRate,
            PERIOD_S,
            15,
            &batch(&[10, 15], gyro),
        );

        assert_eq!(added, 2);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_single_duplicate_sample_adds_nothing() {
        let mut buffer = MeasurementBuffer::new(10);
        let gyro = Vector3::new(0.0, 0.0, 1.0);
        ingest_imu_batch(&mut buffer, AlignmentMode::ImuRate, PERIOD_S, 5, &batch(&[0, 5], gyro));

        let added = ingest_imu_batch(
            &mut buffer,
            AlignmentMode::ImuRate,
            PERIOD_S,
            5,
            &batch(&[5], gyro),
        );

        assert_eq!(added, 0);
        assert_eq!(buffer.len(), 2);
    }
}
