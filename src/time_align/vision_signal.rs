//! Per-frame relative rotation → vision rotation-magnitude signal.

use crate::imu::Timestamp;

use super::buffer::{Measurement, MeasurementBuffer};

/// Push `num_new_imu` vision samples aligned with the newest IMU measurements.
///
/// The frame's rotation angle is spread linearly over the frame interval,
/// starting from the previous vision value (zero when there is none). Each
/// new IMU stamp is mapped into `[t_start, t_end]` by its position relative to
/// the IMU stamp that opened the interval: the sample just before the new ones,
/// or the oldest sample on a cold start. A single new IMU sample cannot be
/// interpolated, so the angle is pushed as-is at that sample's stamp.
///
/// # Panics
/// If the IMU buffer holds fewer than `num_new_imu` measurements, or if the
/// IMU stamps spanning the interval do not increase.
pub fn interpolate_vision_samples(
    vision_buffer: &mut MeasurementBuffer,
    imu_buffer: &MeasurementBuffer,
    (t_start, t_end): (Timestamp, Timestamp),
    angle: f64,
    num_new_imu: usize,
) {
    let n = num_new_imu;
    assert!(
        n <= imu_buffer.len(),
        "IMU buffer holds {} measurements but {} were reported as new",
        imu_buffer.len(),
        n
    );
    let Some(newest_imu) = imu_buffer.back() else {
        return;
    };

    if n == 1 {
        vision_buffer.push(Measurement::new(newest_imu.timestamp, angle));
        return;
    }

    let prev_value = vision_buffer.back().map_or(0.0, |m| m.value);
    let value_diff = angle - prev_value;
    let frame_diff_ns = (t_end - t_start) as f64;

    let first_new = imu_buffer.len() - n;
    let reference = if first_new == 0 {
        imu_buffer[0].timestamp
    } else {
        imu_buffer[first_new - 1].timestamp
    };
    let imu_span_ns = newest_imu.timestamp - reference;
    assert!(
        imu_span_ns > 0,
        "IMU timestamps did not increase over the frame interval ({} -> {})",
        reference,
        newest_imu.timestamp
    );

    for i in first_new..imu_buffer.len() {
        let ratio = (imu_buffer[i].timestamp - reference) as f64 / imu_span_ns as f64;
        assert!(
            (0.0..=1.0).contains(&ratio),
            "Invalid ratio between IMU timestamps: {}",
            ratio
        );
        let timestamp = t_start + (ratio * frame_diff_ns).round() as Timestamp;
        vision_buffer.push(Measurement::new(timestamp, prev_value + ratio * value_diff));
    }
}
