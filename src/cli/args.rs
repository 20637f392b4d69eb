//! Command-line argument definitions for the ENVI metadata tool
//!
//! A single flat command: every positional path is either an `.hdr` file or a
//! directory walked recursively for ENVI headers.

use crate::config::DriverConfig;
use crate::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for cataloguing ENVI rasters
#[derive(Debug, Clone, Parser)]
#[command(
    name = "envi_metadata",
    version,
    about = "Extract catalogue metadata from ENVI .hdr labelled rasters",
    long_about = "Reads ENVI header/data pairs and reports their raster metadata. Headers \
                  written with the non-standard 'file type = ENVI' are recovered by mapping \
                  the data file through a raw virtual raster."
)]
pub struct Args {
    /// Header files or directories to scan
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Output format for catalogued metadata
    #[arg(
        long = "format",
        value_enum,
        default_value = "text",
        help = "Output format for catalogued metadata"
    )]
    pub format: OutputFormat,

    /// Print the parsed header fields of each dataset
    #[arg(long = "show-header", help = "Print parsed header fields")]
    pub show_header: bool,

    /// Print the VRT XML for datasets opened through recovery
    #[arg(long = "show-vrt", help = "Print the VRT used for recovered datasets")]
    pub show_vrt: bool,

    /// Disable recovery of `file type = ENVI` headers
    #[arg(long = "no-recovery", help = "Disable recovery of non-standard ENVI headers")]
    pub no_recovery: bool,

    /// Directory for recovery scratch files
    ///
    /// Defaults to ENVI_METADATA_TMPDIR, then the system temp directory.
    #[arg(
        long = "temp-dir",
        value_name = "DIR",
        help = "Directory for recovery scratch files"
    )]
    pub temp_dir: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors and the catalogued records. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress progress and log output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

/// Output format options for catalogued metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Text,
    /// One JSON document per dataset
    Json,
}

impl Args {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Driver configuration layered as defaults, environment, then flags
    pub fn driver_config(&self) -> Result<DriverConfig> {
        self.apply_overrides(DriverConfig::from_env()?)
    }

    fn apply_overrides(&self, mut config: DriverConfig) -> Result<DriverConfig> {
        if self.no_recovery {
            config = config.with_recovery(false);
        }
        if let Some(dir) = &self.temp_dir {
            config = config.with_temp_root(dir);
        }

        config.validate()?;
        Ok(config)
    }
}
