pub mod geometry;
pub mod imu;
pub mod io;
pub mod time_align;
