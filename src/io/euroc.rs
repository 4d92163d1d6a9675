use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::Deserialize;
use tracing::warn;

use crate::imu::{ImuSample, Timestamp};
use crate::time_align::TimeAlignerConfig;

#[derive(Debug, Clone)]
pub struct GroundTruthEntry {
    pub timestamp_ns: Timestamp,
    /// Body (IMU) orientation in the world frame.
    pub orientation: UnitQuaternion<f64>,
}

/// IMU intrinsics from `imu0/sensor.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImuSensorYaml {
    pub rate_hz: f64,
    pub gyroscope_noise_density: f64,
}

/// EuRoC MAV sequence, reduced to what temporal calibration needs.
#[derive(Debug)]
pub struct EurocDataset {
    pub cam0_timestamps: Vec<Timestamp>,
    pub imu_samples: Vec<ImuSample>,
    pub groundtruth: Vec<GroundTruthEntry>,
    pub imu_sensor: ImuSensorYaml,
}

impl EurocDataset {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let cam0_timestamps = load_image_timestamps(root.join("cam0/data.csv"))?;
        let imu_samples = load_imu_list(root.join("imu0/data.csv"))?;
        let groundtruth =
            load_groundtruth_list(root.join("state_groundtruth_estimate0/data.csv"))?;
        let imu_sensor = load_imu_sensor(&root.join("imu0/sensor.yaml"))?;

        if groundtruth.is_empty() {
            bail!("Ground truth is empty; relative frame rotations are taken from it");
        }

        Ok(Self {
            cam0_timestamps,
            imu_samples,
            groundtruth,
            imu_sensor,
        })
    }

    pub fn len(&self) -> usize {
        self.cam0_timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cam0_timestamps.is_empty()
    }

    /// Aligner configuration seeded from the IMU sensor description.
    pub fn time_aligner_config(&self) -> TimeAlignerConfig {
        TimeAlignerConfig {
            nominal_sample_period_s: 1.0 / self.imu_sensor.rate_hz,
            gyro_noise_density: self.imu_sensor.gyroscope_noise_density,
            ..Default::default()
        }
    }

    /// Get IMU samples between two timestamps (inclusive).
    pub fn imu_between(&self, t_ns_start: Timestamp, t_ns_end: Timestamp) -> &[ImuSample] {
        imu_between(&self.imu_samples, t_ns_start, t_ns_end)
    }

    /// Largest number of IMU samples any consecutive frame pair hands to the aligner.
    pub fn max_imu_batch_len(&self) -> usize {
        max_imu_batch_len(&self.imu_samples, &self.cam0_timestamps)
    }

    /// Ground-truth body orientation at `timestamp_ns`, slerped between the
    /// bracketing entries. None outside the ground-truth time range.
    pub fn orientation_at(&self, timestamp_ns: Timestamp) -> Option<UnitQuaternion<f64>> {
        orientation_at(&self.groundtruth, timestamp_ns)
    }

    /// Move every IMU stamp by `offset_ns`, simulating an IMU clock offset.
    pub fn shift_imu_timestamps(&mut self, offset_ns: Timestamp) {
        for sample in &mut self.imu_samples {
            *sample = sample.shifted(offset_ns);
        }
    }
}

fn imu_between(samples: &[ImuSample], t_ns_start: Timestamp, t_ns_end: Timestamp) -> &[ImuSample] {
    let begin = samples.partition_point(|s| s.timestamp_ns < t_ns_start);
    let end = samples.partition_point(|s| s.timestamp_ns <= t_ns_end);
    &samples[begin..end.max(begin)]
}

fn max_imu_batch_len(samples: &[ImuSample], frame_timestamps: &[Timestamp]) -> usize {
    frame_timestamps
        .windows(2)
        .map(|pair| imu_between(samples, pair[0], pair[1]).len())
        .max()
        .unwrap_or(0)
}

fn orientation_at(gt: &[GroundTruthEntry], timestamp_ns: Timestamp) -> Option<UnitQuaternion<f64>> {
    let idx = gt.partition_point(|e| e.timestamp_ns < timestamp_ns);
    let after = gt.get(idx)?;
    if after.timestamp_ns == timestamp_ns {
        return Some(after.orientation);
    }
    let before = gt.get(idx.checked_sub(1)?)?;

    let t = (timestamp_ns - before.timestamp_ns) as f64
        / (after.timestamp_ns - before.timestamp_ns) as f64;
    Some(before.orientation.slerp(&after.orientation, t))
}

/// EuRoC csv files carry a `#`-prefixed header line and no quoting.
fn open_euroc_csv(csv_path: &Path) -> Result<csv::Reader<File>> {
    ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))
}

fn load_image_timestamps(csv_path: PathBuf) -> Result<Vec<Timestamp>> {
    let mut rdr = open_euroc_csv(&csv_path)?;

    let mut stamps = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        stamps.push(rec[0].trim().parse()?);
    }
    Ok(stamps)
}

fn load_imu_list(csv_path: PathBuf) -> Result<Vec<ImuSample>> {
    let mut rdr = open_euroc_csv(&csv_path)?;

    let mut samples = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        // timestamp, w_RS_S_x/y/z [rad/s], a_RS_S_x/y/z [m/s^2]
        if rec.len() < 7 {
            continue;
        }
        let ts: Timestamp = rec[0].trim().parse()?;
        let gyro = Vector3::new(
            rec[1].trim().parse()?,
            rec[2].trim().parse()?,
            rec[3].trim().parse()?,
        );
        let accel = Vector3::new(
            rec[4].trim().parse()?,
            rec[5].trim().parse()?,
            rec[6].trim().parse()?,
        );
        samples.push(ImuSample::new(ts, accel, gyro));
    }
    Ok(samples)
}

fn load_groundtruth_list(csv_path: PathBuf) -> Result<Vec<GroundTruthEntry>> {
    let mut rdr = open_euroc_csv(&csv_path)?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        // timestamp, p_RS_R_x/y/z, q_RS_w/x/y/z, ...
        if rec.len() < 8 {
            continue;
        }
        let ts: Timestamp = rec[0].trim().parse()?;
        let qw: f64 = rec[4].trim().parse()?;
        let qx: f64 = rec[5].trim().parse()?;
        let qy: f64 = rec[6].trim().parse()?;
        let qz: f64 = rec[7].trim().parse()?;

        entries.push(GroundTruthEntry {
            timestamp_ns: ts,
            orientation: UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz)),
        });
    }
    Ok(entries)
}

fn load_imu_sensor(yaml_path: &Path) -> Result<ImuSensorYaml> {
    let sensor: ImuSensorYaml = serde_yaml::from_reader(
        File::open(yaml_path).with_context(|| format!("Failed to open {:?}", yaml_path))?,
    )
    .with_context(|| format!("Failed to parse {:?}", yaml_path))?;

    if !(sensor.rate_hz > 0.0) {
        bail!("IMU rate must be positive, got {}", sensor.rate_hz);
    }
    if sensor.gyroscope_noise_density <= 0.0 {
        warn!(
            "Gyroscope noise density is {}; the variance gate will pass any motion",
            sensor.gyroscope_noise_density
        );
    }
    Ok(sensor)
}
