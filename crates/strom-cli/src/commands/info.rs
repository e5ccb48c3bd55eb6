//! WAV header inspection command.

use std::path::PathBuf;

use clap::Args;
use serde_json::json;
use strom_io::{WavFormat, WavInfo, read_wav_info};

use super::common::format_bytes;

#[derive(Args)]
pub struct InfoArgs {
    /// WAV files to inspect
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let mut reports = Vec::with_capacity(args.files.len());

    for (i, path) in args.files.iter().enumerate() {
        let info = read_wav_info(path)?;
        let size = std::fs::metadata(path)?.len();

        if args.json {
            reports.push(json!({
                "file": path.display().to_string(),
                "format": format_name(&info),
                "bits": info.bits_per_sample,
                "channels": info.channels,
                "rate": info.sample_rate,
                "frames": info.num_frames,
                "seconds": info.duration_secs,
                "bytes": size,
            }));
            continue;
        }

        if i > 0 {
            println!();
        }
        println!("File:        {}", path.display());
        println!("Format:      {} {}-bit", format_name(&info), info.bits_per_sample);
        println!("Channels:    {}", info.channels);
        println!("Sample Rate: {} Hz", info.sample_rate);
        println!(
            "Duration:    {:.3}s ({} frames)",
            info.duration_secs, info.num_frames
        );
        println!("File Size:   {}", format_bytes(size));
        println!("Stream:      {}", info.spec());
    }

    if args.json {
        let value = if reports.len() == 1 {
            reports.remove(0)
        } else {
            serde_json::Value::Array(reports)
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    Ok(())
}

fn format_name(info: &WavInfo) -> &'static str {
    match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    }
}
