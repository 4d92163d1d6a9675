//! IMU-to-camera temporal calibration by cross-correlating rotation magnitudes.
//!
//! Both sensors observe the same rotational motion. The gyro yields a rotation
//! angle per sample (or per frame), the camera a relative rotation per frame.
//! Once a window of both signals is available, the lag maximizing their
//! cross-correlation gives the clock offset `t_imu = t_cam + timeshift`.

pub mod aligner;
pub mod buffer;
pub mod config;
pub mod correlation;
pub mod frame_feed;
pub mod imu_signal;
pub mod vision_signal;

pub use aligner::{AlignmentStatus, CrossCorrTimeAligner, TimeAlignResult};
pub use buffer::{Measurement, MeasurementBuffer};
pub use config::{AlignmentMode, TimeAlignerConfig};
pub use frame_feed::FrameFeed;
