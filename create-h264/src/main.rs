use std::path::Path;

use clap::Parser;

use create_h264::SynthConfig;

/// Synthesise a raw H.264 Annex B bitstream for use as a test fixture.
#[derive(Parser)]
#[command(name = "create-h264", version)]
struct Args {
    /// Output .h264 file
    #[arg(default_value = "sample.h264")]
    output: String,

    /// Number of slice NAL units to generate
    #[arg(long = "frames", default_value_t = 100)]
    frames: u32,

    /// Payload bytes per slice
    #[arg(long = "frame-size", default_value_t = 4096)]
    frame_size: u32,

    /// Emit an IDR slice every n frames
    #[arg(long = "keyframe-interval", default_value_t = 10)]
    keyframe_interval: u32,

    /// Omit the leading SPS/PPS units
    #[arg(long = "no-parameter-sets", default_value_t = false)]
    no_parameter_sets: bool,

    /// Seed for the payload generator
    #[arg(long = "seed", default_value_t = 0x5EED)]
    seed: u64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();
    let config = SynthConfig {
        frame_count: args.frames,
        frame_size: args.frame_size,
        keyframe_interval: args.keyframe_interval,
        with_parameter_sets: !args.no_parameter_sets,
        seed: args.seed,
    };

    if let Err(e) = create_h264::write_bitstream(Path::new(&args.output), &config) {
        log::error!("Could not write {}: {}", args.output, e);
        std::process::exit(1);
    }

    log::info!(
        "Wrote {} frames ({} bytes each) to {}",
        config.frame_count,
        config.frame_size,
        args.output
    );
}
