use std::path::{Path, PathBuf};

use clap::Parser;

use annexb::nal;
use annexb::reader;
use create_h264::SynthConfig;
use recorder::{RecorderError, RecordingSession};

/// H.264 Recorder — writes raw Annex B streams into timestamped MP4 files.
#[derive(Parser)]
#[command(name = "h264rec", version)]
struct Args {
    /// Output directory for finalized recordings
    #[arg(long = "output-folder", default_value = "./output")]
    output_folder: String,

    /// File name prefix for finalized recordings
    #[arg(long = "prefix", default_value = "video")]
    prefix: String,

    /// Video width in pixels
    #[arg(long = "width", default_value_t = 1280)]
    width: u32,

    /// Video height in pixels
    #[arg(long = "height", default_value_t = 720)]
    height: u32,

    /// Video frame rate
    #[arg(long = "rate", default_value_t = recorder::DEFAULT_FRAME_RATE)]
    rate: u32,

    /// Supply explicit millisecond timestamps (false = let the recorder
    /// synthesize them from the frame rate)
    #[arg(long = "with-pts", default_value_t = true, action = clap::ArgAction::Set)]
    with_pts: bool,

    /// Number of synthetic frames recorded when no input file is given
    #[arg(long = "synthetic-frames", default_value_t = 100)]
    synthetic_frames: u32,

    /// Input .h264 / .h264.gz files (one recording per file)
    files: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    validate_args(args)?;

    let mut session = RecordingSession::new(&args.output_folder, args.prefix.as_str());

    if args.files.is_empty() {
        log::info!(
            "No input files given, recording {} synthetic frames",
            args.synthetic_frames
        );
        let output = record_synthetic(&mut session, args)?;
        log::info!("Recorded {}", output.display());
        return Ok(());
    }

    for file in &args.files {
        let output = record_file(&mut session, Path::new(file), args)?;
        log::info!("Recorded {} from {}", output.display(), file);
    }
    Ok(())
}

fn validate_args(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.width == 0 || args.height == 0 || args.rate == 0 {
        return Err("Width, height and rate must all be greater than zero!".into());
    }
    if args.files.is_empty() && args.synthetic_frames == 0 {
        return Err("Expected input files or a non-zero --synthetic-frames count!".into());
    }
    Ok(())
}

/// Write one NAL unit, dropping malformed frames with a warning and
/// propagating everything else.
fn write_frame(
    session: &mut RecordingSession,
    data: &[u8],
    keyframe: bool,
    pts_ms: i64,
) -> Result<(), RecorderError> {
    match session.write_frame(data, keyframe, pts_ms) {
        Ok(()) => Ok(()),
        Err(e @ RecorderError::MalformedInput(_)) => {
            log::warn!("Dropping malformed frame: {}", e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Record the contents of one bitstream file into one MP4.
fn record_file(
    session: &mut RecordingSession,
    path: &Path,
    args: &Args,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data = reader::read_bitstream(path)
        .map_err(|e| format!("Error reading {}: {}", path.display(), e))?;
    let index = reader::scan(&data)
        .map_err(|e| format!("Error indexing {}: {}", path.display(), e))?;
    log::info!("{}: {} NAL units", path.display(), index.nals.len());

    session.start(args.width, args.height, args.rate)?;

    let frame_interval_ms = 1000 / args.rate as i64;
    let mut slice_index = 0i64;
    for record in &index.nals {
        let pts_ms = if args.with_pts {
            slice_index * frame_interval_ms
        } else {
            0
        };
        write_frame(
            session,
            reader::nal_bytes(&data, record),
            record.keyframe,
            pts_ms,
        )?;
        // Parameter sets are suppressed by the recorder and carry no
        // presentation time of their own
        if !nal::is_parameter_set(record.nal_type) {
            slice_index += 1;
        }
    }

    session.stop().ok_or_else(|| "no recording produced".into())
}

/// Record generated frames, the demo path when no input file exists.
fn record_synthetic(
    session: &mut RecordingSession,
    args: &Args,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let config = SynthConfig {
        frame_count: args.synthetic_frames,
        ..SynthConfig::default()
    };
    let frames = create_h264::generate_frames(&config);

    session.start(args.width, args.height, args.rate)?;

    let frame_interval_ms = 1000 / args.rate as i64;
    let mut slice_index = 0i64;
    for frame in &frames {
        let nal_type = nal::nal_unit_type(frame[4]);
        let pts_ms = if args.with_pts {
            slice_index * frame_interval_ms
        } else {
            0
        };
        write_frame(session, frame, nal::is_idr(nal_type), pts_ms)?;
        if !nal::is_parameter_set(nal_type) {
            slice_index += 1;
        }
    }

    session.stop().ok_or_else(|| "no recording produced".into())
}
