mod cli;

use mediamux::{
    codec::hevc::{self, ColourDescription, NalUnitType},
    common::Timestamp,
    config, logging,
    packet::ExternalTimestamps,
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_tracing(cli.verbose);

    match cli.command {
        Commands::Sps { input } => show_sps(&input),
        Commands::RewriteColour {
            input,
            output,
            primaries,
            transfer,
            matrix,
        } => rewrite_colour(
            &input,
            &output,
            ColourDescription {
                colour_primaries: primaries,
                transfer_characteristics: transfer,
                matrix_coefficients: matrix,
            },
        ),
        Commands::Timestamps { file, json } => show_timestamps(&file, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("mediamux {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("File does not exist: {:?}", path);
    }
    std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))
}

fn show_sps(input: &Path) -> Result<()> {
    let data = read_input(input)?;
    let units = hevc::extract_nal_units(&data);

    let mut found = 0;
    for unit in units.iter().filter(|unit| unit.nal_type == NalUnitType::Sps) {
        found += 1;
        let sps = hevc::parse_sps(unit.data)
            .with_context(|| format!("Failed to parse SPS #{}", found))?;

        let (width, height) = sps.display_size();
        println!("SPS #{}", found);
        println!("  Profile: {}, level {:.1}", sps.profile_idc, f64::from(sps.level_idc) / 30.0);
        println!("  Coded size: {}x{}", sps.width, sps.height);
        println!("  Display size: {}x{}", width, height);
        println!(
            "  Bit depth: {} luma, {} chroma",
            sps.bit_depth_luma, sps.bit_depth_chroma
        );

        if let Some(ref vui) = sps.vui {
            if let Some(colour) = vui.colour {
                println!(
                    "  Colour: primaries {}, transfer {}, matrix {}{}",
                    colour.colour_primaries,
                    colour.transfer_characteristics,
                    colour.matrix_coefficients,
                    if vui.video_full_range { ", full range" } else { "" }
                );
            }
            if let Some(fps) = vui.timing.and_then(|timing| timing.frame_rate()) {
                println!("  Frame rate: {:.3} fps", fps);
            }
        }
    }

    if found == 0 {
        anyhow::bail!("No SPS found in {:?}", input);
    }

    Ok(())
}

fn rewrite_colour(input: &Path, output: &Path, colour: ColourDescription) -> Result<()> {
    let data = read_input(input)?;
    let (framing, units) = hevc::extract_nal_units_with_framing(&data);
    if units.is_empty() {
        anyhow::bail!("No NAL units found in {:?}", input);
    }

    let (stream, rewritten) =
        hevc::rewrite_stream_colour(&data, colour).context("Failed to rewrite SPS")?;
    if rewritten == 0 {
        anyhow::bail!("No SPS found in {:?}", input);
    }

    std::fs::write(output, &stream).with_context(|| format!("Failed to write {:?}", output))?;
    tracing::info!(rewritten, units = units.len(), ?framing, "Wrote {:?}", output);

    Ok(())
}

#[derive(Debug, Serialize)]
struct TimestampSummary {
    frames: usize,
    first: String,
    last: String,
    average_frame_rate: Option<f64>,
}

fn show_timestamps(file: &Path, json: bool) -> Result<()> {
    let factory = ExternalTimestamps::from_path(file)
        .with_context(|| format!("Failed to load timestamp file: {:?}", file))?;

    let timestamps = factory.timestamps();
    let first = timestamps.iter().copied().min().unwrap_or(0);
    let last = timestamps.iter().copied().max().unwrap_or(0);
    let average_frame_rate = (timestamps.len() > 1 && last > first)
        .then(|| (timestamps.len() - 1) as f64 * 1e9 / (last - first) as f64);

    let summary = TimestampSummary {
        frames: factory.len(),
        first: Timestamp::from_ns(first).to_string(),
        last: Timestamp::from_ns(last).to_string(),
        average_frame_rate,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Frames: {}", summary.frames);
        println!("First: {}", summary.first);
        println!("Last: {}", summary.last);
        if let Some(fps) = summary.average_frame_rate {
            println!("Average frame rate: {:.3} fps", fps);
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Timestamp scale: {} ns", config.timestamp_scale_ns);
            println!(
                "  Cluster lookahead: {} ms, max {} pending packets",
                config.cluster.lookahead_ms, config.cluster.max_pending_packets
            );
            println!("  Timestamp files: {}", config.timestamps.len());
            println!("  Sync offsets: {}", config.sync.len());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::MuxConfig::default();
            println!("Default config:");
            println!("  Timestamp scale: {} ns", config.timestamp_scale_ns);
        }
    }

    Ok(())
}
