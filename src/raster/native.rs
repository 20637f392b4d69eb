//! Header-only raster implementation.
//!
//! Reads geometry and encoding straight from ENVI headers without touching
//! pixel data. Like GDAL's ENVI driver it rejects headers whose `file type`
//! is the bare string `ENVI`, reporting the failure as an I/O error.

use super::{Extraction, MetadataExtractor, RasterHandle, RasterLibrary};
use crate::constants::{DRIVER_SHORT_NAME, HEADER_EXTENSION, fields};
use crate::error::{EnviError, ExtractError, Result};
use crate::header::HeaderRecord;
use crate::models::{ByteOrder, DataType, Extent, Interleave, MetadataRecord};
use crate::vrt::VirtualRasterDescriptor;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

const VRT_DRIVER: &str = "VRT";

/// Open raster handle holding per-band no-data values
#[derive(Debug, Clone)]
pub struct NativeRaster {
    driver: String,
    source: PathBuf,
    nodata: Vec<Option<f64>>,
}

impl NativeRaster {
    pub fn new(driver: impl Into<String>, source: impl Into<PathBuf>, nbands: usize) -> Self {
        Self {
            driver: driver.into(),
            source: source.into(),
            nodata: vec![None; nbands],
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl RasterHandle for NativeRaster {
    fn driver_short_name(&self) -> &str {
        &self.driver
    }

    fn band_count(&self) -> usize {
        self.nodata.len()
    }

    fn band_nodata(&self, band: usize) -> Option<f64> {
        band.checked_sub(1)
            .and_then(|index| self.nodata.get(index))
            .copied()
            .flatten()
    }

    fn set_band_nodata(&mut self, band: usize, value: f64) -> Result<()> {
        let count = self.nodata.len();
        let slot = band
            .checked_sub(1)
            .and_then(|index| self.nodata.get_mut(index))
            .ok_or_else(|| {
                EnviError::raster(format!(
                    "band {} out of range for {} ({} bands)",
                    band,
                    self.source.display(),
                    count
                ))
            })?;
        *slot = Some(value);
        Ok(())
    }
}

/// Metadata extractor reading ENVI headers alongside data files
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeExtractor;

impl MetadataExtractor for NativeExtractor {
    fn extract(&self, path: &Path) -> std::result::Result<Extraction, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::io(path, "no such file"));
        }

        let header_path = locate_header(path)
            .ok_or_else(|| ExtractError::unsupported(path, "no ENVI header alongside data file"))?;
        let header = HeaderRecord::from_file(&header_path)
            .map_err(|e| ExtractError::io(path, e.to_string()))?;

        let file_type = header.get(fields::FILE_TYPE).unwrap_or("");
        if !is_supported_file_type(file_type) {
            return Err(ExtractError::io(
                path,
                format!("file type '{}' not recognised as a supported file format", file_type),
            ));
        }

        let mut metadata =
            metadata_from_header(path, &header).map_err(|reason| ExtractError::io(path, reason))?;
        metadata.filepath = header_path;

        let mut raster = NativeRaster::new(DRIVER_SHORT_NAME, path, metadata.nbands);
        if let Some(nodata) = metadata.nodata.as_deref().and_then(|v| v.parse::<f64>().ok()) {
            for band in 1..=metadata.nbands {
                raster
                    .set_band_nodata(band, nodata)
                    .map_err(|e| ExtractError::other(path, e.to_string()))?;
            }
        }

        debug!(
            "Extracted {}x{}x{} {} from {}",
            metadata.cols,
            metadata.rows,
            metadata.nbands,
            metadata.datatype,
            path.display()
        );

        Ok(Extraction {
            metadata,
            raster: Box::new(raster),
        })
    }
}

/// Raster library opening ENVI pairs and raw virtual mappings
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRasterLibrary;

impl RasterLibrary for NativeRasterLibrary {
    fn open(&self, path: &Path) -> Option<Box<dyn RasterHandle>> {
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(HEADER_EXTENSION))
        {
            return None;
        }

        match NativeExtractor.extract(path) {
            Ok(extraction) => Some(extraction.raster),
            Err(e) => {
                debug!("Cannot open {}: {}", path.display(), e);
                None
            }
        }
    }

    fn open_virtual(
        &self,
        descriptor: &VirtualRasterDescriptor,
    ) -> Result<Box<dyn RasterHandle>> {
        if !descriptor.source.is_file() {
            return Err(EnviError::raster(format!(
                "virtual raster source not found: {}",
                descriptor.source.display()
            )));
        }
        if descriptor.nbands == 0 || descriptor.cols == 0 || descriptor.rows == 0 {
            return Err(EnviError::raster(format!(
                "invalid virtual raster dimensions {}x{}x{}",
                descriptor.cols, descriptor.rows, descriptor.nbands
            )));
        }

        Ok(Box::new(NativeRaster::new(
            VRT_DRIVER,
            descriptor.source.clone(),
            descriptor.nbands,
        )))
    }
}

/// Find the header belonging to a data file: `<file>.hdr`, then the file
/// name with its extension replaced by `hdr`
pub fn locate_header(datafile: &Path) -> Option<PathBuf> {
    let mut appended = OsString::from(datafile.as_os_str());
    appended.push(".");
    appended.push(HEADER_EXTENSION);

    let candidates = [PathBuf::from(appended), datafile.with_extension(HEADER_EXTENSION)];
    candidates
        .into_iter()
        .find(|candidate| candidate != datafile && candidate.is_file())
}

/// Qualified ENVI file types such as `ENVI Standard` or `ENVI Classification`
fn is_supported_file_type(file_type: &str) -> bool {
    file_type
        .trim()
        .strip_prefix("ENVI ")
        .is_some_and(|qualifier| !qualifier.trim().is_empty())
}

fn metadata_from_header(
    path: &Path,
    header: &HeaderRecord,
) -> std::result::Result<MetadataRecord, String> {
    let cols = required_usize(header, fields::SAMPLES)?;
    let rows = required_usize(header, fields::LINES)?;
    let nbands = optional_usize(header, fields::BANDS)?.unwrap_or(1);

    let datatype = match optional_usize(header, fields::DATA_TYPE)? {
        Some(code) => DataType::from_envi_code(code as u32)
            .ok_or_else(|| format!("unsupported data type code {}", code))?,
        None => DataType::Byte,
    };

    // Geometry does not depend on byte order; callers that map pixels check it
    let byteorder = ByteOrder::from_header_value(header.get(fields::BYTE_ORDER))
        .unwrap_or_else(|| {
            debug!(
                "Treating byte order '{}' as unspecified",
                header.get(fields::BYTE_ORDER).unwrap_or_default()
            );
            ByteOrder::Unspecified
        });

    let mut metadata = MetadataRecord::new(path, DRIVER_SHORT_NAME, datatype, nbands, cols, rows);
    metadata.byteorder = byteorder;
    metadata.interleave = Some(Interleave::from_header_value(header.get(fields::INTERLEAVE)));
    metadata.nodata = header.get(fields::DATA_IGNORE_VALUE).map(str::to_string);
    metadata.description = header.get(fields::DESCRIPTION).map(str::to_string);

    if let Some(map_info) = header.get(fields::MAP_INFO) {
        match parse_map_info(map_info, cols, rows) {
            Some(geo) => {
                metadata.cellx = Some(geo.cellx);
                metadata.celly = Some(geo.celly);
                metadata.extent = Some(geo.extent);
                metadata.srs = Some(geo.srs);
            }
            None => debug!("Ignoring unparseable map info '{}'", map_info),
        }
    }

    Ok(metadata)
}

fn required_usize(header: &HeaderRecord, key: &str) -> std::result::Result<usize, String> {
    optional_usize(header, key)?.ok_or_else(|| format!("missing required field '{}'", key))
}

fn optional_usize(header: &HeaderRecord, key: &str) -> std::result::Result<Option<usize>, String> {
    header
        .get(key)
        .map(|value| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid value '{}' for '{}'", value, key))
        })
        .transpose()
}

struct MapGeometry {
    cellx: f64,
    celly: f64,
    extent: Extent,
    srs: String,
}

/// Interpret `map info`:
/// `{projection, ref x, ref y, easting, northing, x size, y size[, zone, hemisphere][, datum][, units=..]}`
fn parse_map_info(value: &str, cols: usize, rows: usize) -> Option<MapGeometry> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() < 7 {
        return None;
    }

    let numbers: Vec<f64> = parts[1..7]
        .iter()
        .map(|p| p.parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()?;
    let (ref_x, ref_y, easting, northing, cellx, celly) =
        (numbers[0], numbers[1], numbers[2], numbers[3], numbers[4], numbers[5]);

    // Reference pixel coordinates are 1-based
    let min_x = easting - (ref_x - 1.0) * cellx;
    let max_y = northing + (ref_y - 1.0) * celly;
    let extent = Extent {
        min_x,
        min_y: max_y - rows as f64 * celly,
        max_x: min_x + cols as f64 * cellx,
        max_y,
    };

    let projection = parts[0];
    let srs = if projection.eq_ignore_ascii_case("UTM") && parts.len() >= 9 {
        let mut srs = format!("UTM zone {} {}", parts[7], parts[8]);
        if let Some(datum) = parts.get(9).filter(|d| !d.contains('=')) {
            srs.push_str(&format!(", {}", datum));
        }
        srs
    } else {
        match parts.get(7).filter(|d| !d.contains('=')) {
            Some(datum) => format!("{}, {}", projection, datum),
            None => projection.to_string(),
        }
    };

    Some(MapGeometry {
        cellx,
        celly,
        extent,
        srs,
    })
}
