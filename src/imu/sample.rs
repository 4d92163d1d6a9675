use nalgebra::Vector3;

/// Sensor timestamp in nanoseconds.
pub type Timestamp = i64;

/// Convert a nanosecond interval to seconds.
#[inline]
pub fn nsec_to_sec(ns: Timestamp) -> f64 {
    ns as f64 / 1e9
}

/// Convert seconds to nanoseconds, rounding to the nearest tick.
#[inline]
pub fn sec_to_nsec(s: f64) -> Timestamp {
    (s * 1e9).round() as Timestamp
}

/// Single IMU measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub timestamp_ns: Timestamp,
    pub accel: Vector3<f64>,
    pub gyro: Vector3<f64>,
}

impl ImuSample {
    pub fn new(timestamp_ns: Timestamp, accel: Vector3<f64>, gyro: Vector3<f64>) -> Self {
        Self {
            timestamp_ns,
            accel,
            gyro,
        }
    }

    /// Sample with only an angular rate; the accelerometer reads zero.
    pub fn from_gyro(timestamp_ns: Timestamp, gyro: Vector3<f64>) -> Self {
        Self::new(timestamp_ns, Vector3::zeros(), gyro)
    }

    /// Copy of this sample with its timestamp moved by `offset_ns`.
    pub fn shifted(&self, offset_ns: Timestamp) -> Self {
        Self {
            timestamp_ns: self.timestamp_ns + offset_ns,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_conversions() {
        assert_eq!(sec_to_nsec(0.005), 5_000_000);
        assert_eq!(sec_to_nsec(-0.05), -50_000_000);
        assert_eq!(nsec_to_sec(50_000_000), 0.05);
    }

    #[test]
    fn test_shifted_keeps_readings() {
        let s = ImuSample::new(10, Vector3::new(0.0, 0.0, 9.81), Vector3::new(0.1, 0.2, 0.3));
        let moved = s.shifted(-4);
        assert_eq!(moved.timestamp_ns, 6);
        assert_eq!(moved.gyro, s.gyro);
        assert_eq!(moved.accel, s.accel);
    }
}
