use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vio_time_align::imu::{sec_to_nsec, ImuSample};
use vio_time_align::io::EurocDataset;
use vio_time_align::time_align::{AlignmentStatus, FrameFeed};

/// Estimate the IMU-to-camera time offset on a EuRoC MAV sequence.
#[derive(Parser, Debug)]
#[command(name = "vio_time_align", version, about)]
struct Args {
    /// Path to the sequence's `mav0` directory
    #[arg(default_value = "data/euroc/MH_01_easy/mav0")]
    dataset_path: String,

    /// Correlate one sample per frame instead of one per IMU reading
    #[arg(long)]
    frame_rate: bool,

    /// Shift every IMU timestamp by this many milliseconds before aligning
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    inject_offset_ms: f64,

    /// Correlation window size in samples
    #[arg(long)]
    window: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("Loading EuRoC dataset from: {}", args.dataset_path);
    let mut dataset = EurocDataset::new(&args.dataset_path)?;
    println!(
        "Loaded {} frames, {} IMU samples, {} ground truth entries",
        dataset.len(),
        dataset.imu_samples.len(),
        dataset.groundtruth.len()
    );

    if args.inject_offset_ms != 0.0 {
        let offset_ns = sec_to_nsec(args.inject_offset_ms * 1e-3);
        println!("Shifting IMU timestamps by {} ns", offset_ns);
        dataset.shift_imu_timestamps(offset_ns);
    }

    let mut config = dataset.time_aligner_config();
    config.use_high_rate_mode = !args.frame_rate;
    if let Some(window_size) = args.window {
        config.window_size = window_size;
    }
    config.validate_batch_capacity(dataset.max_imu_batch_len())?;
    println!("Time alignment config: {:?}", config);

    let mut feed = FrameFeed::new(&config)?;
    let mut prev_ts = None;
    let mut skipped = 0usize;

    for (i, &ts) in dataset.cam0_timestamps.iter().enumerate() {
        // Frames outside the ground-truth range have no reference rotation.
        let Some(orientation) = dataset.orientation_at(ts) else {
            skipped += 1;
            feed.reset();
            prev_ts = None;
            continue;
        };

        let imu: &[ImuSample] = match prev_ts {
            Some(prev) => dataset.imu_between(prev, ts),
            None => &[],
        };
        let result = feed.process_frame(ts, orientation, imu);
        prev_ts = Some(ts);

        if result.status == AlignmentStatus::Converged {
            println!(
                "Frame {} (ts={}): timeshift {:.4} s (t_imu = t_cam + timeshift)",
                i, ts, result.timeshift_s
            );
            break;
        }
    }

    if skipped > 0 {
        println!("Skipped {} frames without ground truth", skipped);
    }
    match feed.estimate() {
        Some(shift) => println!("Estimated timeshift: {:.4} s", shift),
        None => println!("No converged estimate: window never filled with enough motion"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["vio_time_align"]).unwrap();
        assert_eq!(args.dataset_path, "data/euroc/MH_01_easy/mav0");
        assert!(!args.frame_rate);
        assert_eq!(args.inject_offset_ms, 0.0);
        assert_eq!(args.window, None);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::try_parse_from([
            "vio_time_align",
            "mav0",
            "--frame-rate",
            "--inject-offset-ms",
            "-12.5",
            "--window",
            "40",
        ])
        .unwrap();
        assert_eq!(args.dataset_path, "mav0");
        assert!(args.frame_rate);
        assert_eq!(args.inject_offset_ms, -12.5);
        assert_eq!(args.window, Some(40));
    }

    #[test]
    fn test_args_reject_bad_window() {
        assert!(Args::try_parse_from(["vio_time_align", "--window", "-3"]).is_err());
    }
}
