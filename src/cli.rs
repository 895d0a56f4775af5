use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediamux")]
#[command(author, version, about = "Matroska mux core tools")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the sequence parameter set of an HEVC elementary stream
    Sps {
        /// Annex B or length-prefixed HEVC data
        #[arg(required = true)]
        input: PathBuf,
    },

    /// Rewrite the colour description of every SPS in an HEVC stream
    RewriteColour {
        /// Annex B or length-prefixed HEVC data
        #[arg(required = true)]
        input: PathBuf,

        /// Where to write the rewritten stream, in the framing of the input
        #[arg(required = true)]
        output: PathBuf,

        /// colour_primaries code point (ITU-T H.273)
        #[arg(long)]
        primaries: u8,

        /// transfer_characteristics code point (ITU-T H.273)
        #[arg(long)]
        transfer: u8,

        /// matrix_coefficients code point (ITU-T H.273)
        #[arg(long)]
        matrix: u8,
    },

    /// Check a "timestamp format v2" file and summarize it
    Timestamps {
        /// Timestamp file
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
