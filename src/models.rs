//! Core data structures for ENVI metadata extraction.
//!
//! Defines the dataset candidate produced by recognition, the metadata record
//! filled in by an extractor, and the small enums describing raw pixel layout.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An ENVI header together with its resolved binary data file.
///
/// Resolved once during recognition and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetCandidate {
    header: PathBuf,
    datafile: PathBuf,
}

impl DatasetCandidate {
    pub fn new(header: impl Into<PathBuf>, datafile: impl Into<PathBuf>) -> Self {
        Self {
            header: header.into(),
            datafile: datafile.into(),
        }
    }

    /// Path of the `.hdr` file
    pub fn header(&self) -> &Path {
        &self.header
    }

    /// Path of the paired binary data file
    pub fn datafile(&self) -> &Path {
        &self.datafile
    }
}

/// Raster pixel data types, named as GDAL names them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Byte,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
    CInt16,
    CInt32,
    CFloat32,
    CFloat64,
}

impl DataType {
    pub const ALL: [DataType; 14] = [
        DataType::Byte,
        DataType::Int8,
        DataType::UInt16,
        DataType::Int16,
        DataType::UInt32,
        DataType::Int32,
        DataType::UInt64,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::CInt16,
        DataType::CInt32,
        DataType::CFloat32,
        DataType::CFloat64,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "Byte",
            DataType::Int8 => "Int8",
            DataType::UInt16 => "UInt16",
            DataType::Int16 => "Int16",
            DataType::UInt32 => "UInt32",
            DataType::Int32 => "Int32",
            DataType::UInt64 => "UInt64",
            DataType::Int64 => "Int64",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
            DataType::CInt16 => "CInt16",
            DataType::CInt32 => "CInt32",
            DataType::CFloat32 => "CFloat32",
            DataType::CFloat64 => "CFloat64",
        }
    }

    /// Size of one pixel value in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Byte | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 | DataType::CInt16 => 4,
            DataType::UInt64
            | DataType::Int64
            | DataType::Float64
            | DataType::CInt32
            | DataType::CFloat32 => 8,
            DataType::CFloat64 => 16,
        }
    }

    /// Map an ENVI `data type` code to a data type
    pub fn from_envi_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(DataType::Byte),
            2 => Some(DataType::Int16),
            3 => Some(DataType::Int32),
            4 => Some(DataType::Float32),
            5 => Some(DataType::Float64),
            6 => Some(DataType::CFloat32),
            9 => Some(DataType::CFloat64),
            12 => Some(DataType::UInt16),
            13 => Some(DataType::UInt32),
            14 => Some(DataType::Int64),
            15 => Some(DataType::UInt64),
            _ => None,
        }
    }

    /// Smallest and largest representable value.
    ///
    /// Complex types report the range of one component.
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::Byte => (u8::MIN as f64, u8::MAX as f64),
            DataType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DataType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            DataType::Int16 | DataType::CInt16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            DataType::Int32 | DataType::CInt32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::UInt64 => (u64::MIN as f64, u64::MAX as f64),
            DataType::Int64 => (i64::MIN as f64, i64::MAX as f64),
            DataType::Float32 | DataType::CFloat32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 | DataType::CFloat64 => (f64::MIN, f64::MAX),
        }
    }

    pub fn min_value(&self) -> f64 {
        self.range().0
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            DataType::Float32 | DataType::Float64 | DataType::CFloat32 | DataType::CFloat64
        )
    }

    /// Minimum value as header text; floating point types use exponent form
    pub fn min_value_text(&self) -> String {
        if self.is_float() {
            format!("{:e}", self.min_value())
        } else {
            self.min_value().to_string()
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        DataType::ALL
            .into_iter()
            .find(|dt| dt.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown data type '{}'", s))
    }
}

/// Byte order of the raw pixel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Unspecified,
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Interpret an ENVI `byte order` value.
    ///
    /// Absent or empty means unspecified, `0` little-endian, `1` big-endian.
    /// Any other value yields `None`.
    pub fn from_header_value(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim).unwrap_or("") {
            "" => Some(ByteOrder::Unspecified),
            "0" => Some(ByteOrder::LittleEndian),
            "1" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Name used by VRT `ByteOrder` elements
    pub fn vrt_name(&self) -> Option<&'static str> {
        match self {
            ByteOrder::Unspecified => None,
            ByteOrder::LittleEndian => Some("LSB"),
            ByteOrder::BigEndian => Some("MSB"),
        }
    }
}

/// Band interleave scheme of a raw raster file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interleave {
    /// Band sequential
    Bsq,
    /// Band interleaved by pixel
    Bip,
    /// Band interleaved by line
    Bil,
}

impl Interleave {
    /// Interpret an ENVI `interleave` value, case-insensitively.
    /// Anything other than BSQ or BIP is treated as BIL.
    pub fn from_header_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("BSQ") => Interleave::Bsq,
            Some("BIP") => Interleave::Bip,
            _ => Interleave::Bil,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interleave::Bsq => "BSQ",
            Interleave::Bip => "BIP",
            Interleave::Bil => "BIL",
        }
    }
}

/// Geographic extent in the dataset's coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Metadata populated by an extractor for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// File the metadata was read from (the header for ENVI pairs)
    #[serde(serialize_with = "serialize_path_lossy")]
    pub filepath: PathBuf,
    #[serde(serialize_with = "serialize_path_lossy")]
    pub datafile: PathBuf,
    pub driver: String,
    pub datatype: DataType,
    pub nbands: usize,
    pub cols: usize,
    pub rows: usize,
    pub cellx: Option<f64>,
    pub celly: Option<f64>,
    pub extent: Option<Extent>,
    pub srs: Option<String>,
    pub nodata: Option<String>,
    pub interleave: Option<Interleave>,
    pub byteorder: ByteOrder,
    pub description: Option<String>,
}

impl MetadataRecord {
    /// Record with the mandatory geometry fields set and everything else empty
    pub fn new(
        datafile: impl Into<PathBuf>,
        driver: impl Into<String>,
        datatype: DataType,
        nbands: usize,
        cols: usize,
        rows: usize,
    ) -> Self {
        let datafile = datafile.into();
        Self {
            filepath: datafile.clone(),
            datafile,
            driver: driver.into(),
            datatype,
            nbands,
            cols,
            rows,
            cellx: None,
            celly: None,
            extent: None,
            srs: None,
            nodata: None,
            interleave: None,
            byteorder: ByteOrder::Unspecified,
            description: None,
        }
    }
}

/// Paths are written as text even when they are not valid UTF-8
fn serialize_path_lossy<P, S>(path: &P, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    serializer.serialize_str(&path.as_ref().to_string_lossy())
}
