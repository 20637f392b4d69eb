//! ENVI Metadata Driver Library
//!
//! A metadata driver for ENVI-format rasters (`.hdr` header plus raw binary
//! data file) used by raster cataloguing tools.
//!
//! This library provides:
//! - Parsing and writing ENVI header text, including multi-line brace values
//! - Recognition of ENVI headers and discovery of their paired data files
//! - Recovery of headers declaring the non-standard `file type = ENVI`, by
//!   mapping the real data file through a raw virtual raster
//! - GDAL VRT rendering of raw raster layouts (BSQ, BIP, BIL)
//! - A header-only raster implementation for use without a raster library
//!
//! ```no_run
//! use envi_metadata::EnviDriver;
//! use std::path::Path;
//!
//! # fn main() -> envi_metadata::Result<()> {
//! let driver = EnviDriver::native();
//! let dataset = driver.open(Path::new("/data/scene.hdr"))?;
//! let populated = dataset.populate_metadata()?;
//! println!(
//!     "{} bands, {}x{} {}",
//!     populated.metadata.nbands,
//!     populated.metadata.cols,
//!     populated.metadata.rows,
//!     populated.metadata.datatype
//! );
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod header;
pub mod models;
pub mod raster;
pub mod vrt;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::DriverConfig;
pub use driver::{EnviDataset, EnviDriver, PopulatedDataset, Recognition};
pub use error::{EnviError, ExtractError, Result};
pub use header::HeaderRecord;
pub use models::{ByteOrder, DataType, DatasetCandidate, Interleave, MetadataRecord};
pub use vrt::VirtualRasterDescriptor;
