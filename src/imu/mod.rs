pub mod preintegration;
pub mod sample;

pub use preintegration::RotationPreintegrator;
pub use sample::{nsec_to_sec, sec_to_nsec, ImuSample, Timestamp};
