use std::path::Path;

use clap::Parser;

use annexb::nal;

#[derive(Parser)]
#[command(name = "annexb-info", about = "Parse and display raw H.264 bitstream structure")]
struct Args {
    /// Input .h264 / .h264.gz file
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Input .h264 / .h264.gz file (positional)
    #[arg(conflicts_with = "file", required_unless_present_any = ["file", "schema"])]
    input: Option<String>,

    /// Filter by NAL unit type
    #[arg(short = 't', long = "type")]
    type_filter: Option<u8>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Print JSON schema for the output format and exit
    #[arg(long)]
    schema: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reset SIGPIPE to default so piped output (e.g. head/tail) exits cleanly
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let args = Args::parse();

    if args.schema {
        let schema = schemars::schema_for!(annexb::reader::BitstreamIndex);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let file = args.file.or(args.input).expect("file argument required");
    let data = annexb::reader::read_bitstream(Path::new(&file))?;
    let index = annexb::reader::scan(&data)?;

    if args.json {
        println!("{}", serde_json::to_string(&index)?);
        return Ok(());
    }

    // Print header
    println!(
        "{:>6} {:>3} {:>3} {:>12} {:>8} {:>3}",
        "Type", "NT", "KF", "OFFSET", "SIZE", "SC"
    );

    let mut totals = [0u32; 32];
    for record in &index.nals {
        totals[record.nal_type as usize & 0x1F] += 1;

        if let Some(filter) = args.type_filter {
            if record.nal_type != filter {
                continue;
            }
        }

        println!(
            "{:>6} {:>3} {:>3} {:>12} {:>8} {:>3}",
            nal::nal_type_name(record.nal_type),
            record.nal_type,
            if record.keyframe { 1 } else { 0 },
            record.offset,
            record.size,
            record.start_code_len,
        );
    }

    println!();
    println!("{} NAL units total", index.nals.len());
    for (nal_type, count) in totals.iter().enumerate() {
        if *count > 0 {
            println!(
                "\t{:>6} (type {:>2}): {}",
                nal::nal_type_name(nal_type as u8),
                nal_type,
                count
            );
        }
    }

    Ok(())
}
