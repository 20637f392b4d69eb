//! Constants for ENVI header handling.
//!
//! Field names, magic strings and defaults shared by the parser, the driver
//! and the native raster implementation.

// =============================================================================
// Format recognition
// =============================================================================

/// First line of every ENVI header
pub const ENVI_MAGIC: &str = "ENVI";

/// Regular expressions matched against candidate file names
pub const FORMAT_REGEX: &[&str] = &[r"\.hdr$"];

/// Header file extension
pub const HEADER_EXTENSION: &str = "hdr";

/// Prefix of GDAL virtual file system paths, which this driver never handles
pub const VSI_PREFIX: &str = "/vsi";

/// Driver identification
pub const DRIVER_SHORT_NAME: &str = "ENVI";
pub const DRIVER_LONG_NAME: &str = "ENVI .hdr Labelled";

// =============================================================================
// Header field names
// =============================================================================

pub mod fields {
    pub const FILE_TYPE: &str = "file type";
    pub const SAMPLES: &str = "samples";
    pub const LINES: &str = "lines";
    pub const BANDS: &str = "bands";
    pub const DATA_TYPE: &str = "data type";
    pub const HEADER_OFFSET: &str = "header offset";
    pub const BYTE_ORDER: &str = "byte order";
    pub const INTERLEAVE: &str = "interleave";
    pub const DATA_IGNORE_VALUE: &str = "data ignore value";
    pub const DESCRIPTION: &str = "description";
    pub const MAP_INFO: &str = "map info";
}

// =============================================================================
// File types
// =============================================================================

/// Bare file type written by some external tools, which raster libraries reject
pub const FILE_TYPE_NONSTANDARD: &str = "ENVI";

/// File type the non-standard variant is rewritten to
pub const FILE_TYPE_STANDARD: &str = "ENVI Standard";

// =============================================================================
// Recovery defaults
// =============================================================================

/// Prefix for the scratch directory holding the substitute header
pub const DEFAULT_TEMP_PREFIX: &str = "gdal";

/// Base name of the substitute header/data pair
pub const DEFAULT_SUBSTITUTE_NAME: &str = "dummy";

/// Content of the substitute data file; only its existence matters
pub const SUBSTITUTE_DATA: [u8; 2] = [0, 0];

// =============================================================================
// Environment overrides
// =============================================================================

pub mod env {
    pub const RECOVERY: &str = "ENVI_METADATA_RECOVERY";
    pub const TEMP_DIR: &str = "ENVI_METADATA_TMPDIR";
    pub const TEMP_PREFIX: &str = "ENVI_METADATA_TEMP_PREFIX";
}
