//! Raster library capabilities consumed by the ENVI driver.
//!
//! The driver never decodes pixels itself. It relies on three collaborators:
//! a [`MetadataExtractor`] that fills a [`MetadataRecord`] from a data file,
//! a [`RasterLibrary`] that opens files and virtual raw-raster mappings, and
//! the [`RasterHandle`]s those produce. [`native`] provides a header-only
//! implementation of all three.

pub mod native;

use crate::error::{ExtractError, Result};
use crate::models::MetadataRecord;
use crate::vrt::VirtualRasterDescriptor;
use std::fmt;
use std::path::Path;

pub use native::{NativeExtractor, NativeRaster, NativeRasterLibrary};

/// An open raster dataset
pub trait RasterHandle: fmt::Debug + Send {
    /// Short name of the driver that opened the dataset; empty if unknown
    fn driver_short_name(&self) -> &str;

    fn band_count(&self) -> usize;

    /// No-data value of a 1-based band
    fn band_nodata(&self, band: usize) -> Option<f64>;

    /// Set the no-data value of a 1-based band
    fn set_band_nodata(&mut self, band: usize, value: f64) -> Result<()>;
}

/// Result of a successful metadata extraction
#[derive(Debug)]
pub struct Extraction {
    pub metadata: MetadataRecord,
    pub raster: Box<dyn RasterHandle>,
}

/// Generic metadata extraction from a raster data file
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> std::result::Result<Extraction, ExtractError>;
}

/// Raster opening, both of real files and of virtual raw mappings
pub trait RasterLibrary: Send + Sync {
    /// Try to open a file; `None` when no driver recognises it
    fn open(&self, path: &Path) -> Option<Box<dyn RasterHandle>>;

    /// Open a raw raster through a virtual mapping
    fn open_virtual(&self, descriptor: &VirtualRasterDescriptor)
    -> Result<Box<dyn RasterHandle>>;
}
