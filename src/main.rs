use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use framegrab::detect::{self, DEFAULT_MAX_DEVICES};
use framegrab::{CaptureConfig, CaptureError, CaptureSession, StopToken, V4lTransport};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List video devices and their supported formats
    Detect {
        /// Maximum number of /dev/videoN paths to probe
        #[arg(long, default_value_t = DEFAULT_MAX_DEVICES)]
        max_devices: u32,
    },

    /// Grab a single frame and save it
    Grab {
        /// Path to the JSON capture config
        #[arg(short, long)]
        config: PathBuf,

        /// Give up after this many seconds
        #[arg(short, long, default_value_t = 5)]
        timeout: u64,

        /// Output image path (format from extension)
        #[arg(short, long, default_value = "capture.jpg")]
        output: PathBuf,
    },

    /// Run the continuous grabber and report the observed frame rate
    Watch {
        /// Path to the JSON capture config
        #[arg(short, long)]
        config: PathBuf,

        /// How long to watch, in seconds
        #[arg(short, long, default_value_t = 3)]
        duration: u64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Detect { max_devices } => {
            print_devices(max_devices);
            Ok(())
        }
        Command::Grab {
            config,
            timeout,
            output,
        } => grab(&config, Duration::from_secs(timeout), &output),
        Command::Watch { config, duration } => watch(&config, Duration::from_secs(duration)),
    }
}

fn print_devices(max_devices: u32) {
    let reports = detect::probe_devices::<V4lTransport>(max_devices);
    for report in &reports {
        print!("{}", report);
    }
    println!("\n{} devices found.", reports.len());
}

fn open_session(config_path: &Path) -> Result<CaptureSession<V4lTransport>> {
    let config = CaptureConfig::load(config_path).context("Failed to load capture config")?;

    match CaptureSession::open(config) {
        Ok(session) => Ok(session),
        Err(e @ CaptureError::UnsupportedFormat { .. }) => {
            println!("Unsupported format, use one of the following:");
            print_devices(DEFAULT_MAX_DEVICES);
            Err(e).context("Failed to open capture session")
        }
        Err(e) => Err(e).context("Failed to open capture session"),
    }
}

fn grab(config_path: &Path, timeout: Duration, output: &Path) -> Result<()> {
    let session = open_session(config_path)?;

    let frame = session.grab_frame_with_timeout(timeout);
    session.close();

    let frame = frame.with_context(|| format!("No frame captured within {:?}", timeout))?;
    frame
        .save(output)
        .with_context(|| format!("Failed to save frame to {}", output.display()))?;

    tracing::info!(
        "Saved {}x{} frame to {}",
        frame.width(),
        frame.height(),
        output.display()
    );
    Ok(())
}

fn watch(config_path: &Path, duration: Duration) -> Result<()> {
    let session = Arc::new(open_session(config_path)?);
    let grabber = session
        .start_continuous(StopToken::new())
        .context("Failed to start frame grabber")?;

    let start = Instant::now();
    let mut last_sequence = 0u64;
    let mut distinct = 0u64;

    while start.elapsed() < duration {
        if let Some(frame) = session.read_latest() {
            if frame.sequence != last_sequence {
                last_sequence = frame.sequence;
                distinct += 1;
            }
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    let published = grabber.join().unwrap_or_default();
    session.close();

    let fps = distinct as f64 / duration.as_secs_f64().max(f64::EPSILON);
    println!(
        "Observed {} distinct frames ({} published) in {:?}, {:.1} fps",
        distinct, published, duration, fps
    );
    Ok(())
}
