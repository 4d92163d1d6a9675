pub mod euroc;

pub use euroc::EurocDataset;
