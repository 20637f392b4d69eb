//! Recovery of ENVI headers declaring `file type = ENVI`.
//!
//! Some external tools write the bare file type `ENVI` instead of
//! `ENVI Standard`, and raster libraries refuse to open the data file. The
//! workflow rewrites the file type, runs the extractor against a throwaway
//! header plus a 2-byte substitute data file in a scratch directory, and then
//! opens the real data file through a raw virtual mapping built from the
//! extracted geometry.
//!
//! The scratch directory is a [`tempfile::TempDir`], so it is removed on
//! every exit path. The real data file is never written to.

use super::PopulatedDataset;
use crate::config::DriverConfig;
use crate::constants::{
    FILE_TYPE_NONSTANDARD, FILE_TYPE_STANDARD, HEADER_EXTENSION, SUBSTITUTE_DATA, fields,
};
use crate::error::{EnviError, ExtractError, Result};
use crate::header::HeaderRecord;
use crate::models::{ByteOrder, DatasetCandidate, Interleave, MetadataRecord};
use crate::raster::{Extraction, MetadataExtractor, RasterLibrary};
use crate::vrt::VirtualRasterDescriptor;
use std::fs;
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub struct RecoveryWorkflow<'a> {
    candidate: &'a DatasetCandidate,
    extractor: &'a dyn MetadataExtractor,
    library: &'a dyn RasterLibrary,
    config: &'a DriverConfig,
}

impl<'a> RecoveryWorkflow<'a> {
    pub fn new(
        candidate: &'a DatasetCandidate,
        extractor: &'a dyn MetadataExtractor,
        library: &'a dyn RasterLibrary,
        config: &'a DriverConfig,
    ) -> Self {
        Self {
            candidate,
            extractor,
            library,
            config,
        }
    }

    /// Attempt recovery after `original` was returned by the extractor.
    ///
    /// If the header is not the bare `ENVI` variant, `original` is returned
    /// as the error.
    pub fn run(&self, original: ExtractError) -> Result<PopulatedDataset> {
        let mut header = HeaderRecord::from_file(self.candidate.header())?;

        if header.get(fields::FILE_TYPE) != Some(FILE_TYPE_NONSTANDARD) {
            debug!(
                "{} declares file type {:?}; not recoverable",
                self.candidate.header().display(),
                header.get(fields::FILE_TYPE)
            );
            return Err(original.into());
        }

        info!(
            "Recovering non-standard ENVI header {}",
            self.candidate.header().display()
        );
        header.insert(fields::FILE_TYPE, FILE_TYPE_STANDARD);

        let mut metadata = self.extract_from_substitute(&header)?;
        let (descriptor, nodata_text) = self.build_descriptor(&header, &metadata)?;

        let mut raster = self.library.open_virtual(&descriptor)?;
        // No-data is not reliably carried through the virtual mapping
        for band in 1..=raster.band_count() {
            raster.set_band_nodata(band, descriptor.nodata)?;
        }

        metadata.filepath = self.candidate.header().to_path_buf();
        metadata.datafile = self.candidate.datafile().to_path_buf();
        metadata.nodata = Some(nodata_text);

        Ok(PopulatedDataset {
            metadata,
            raster,
            recovery: Some(descriptor),
        })
    }

    /// Run the extractor against a substitute header/data pair written into
    /// a scratch directory, then remove the directory
    fn extract_from_substitute(&self, header: &HeaderRecord) -> Result<MetadataRecord> {
        let workspace = self.scratch_dir()?;
        let data_path = workspace.path().join(&self.config.substitute_name);
        let header_path = data_path.with_extension(HEADER_EXTENSION);

        header.write_to(&header_path)?;
        fs::write(&data_path, SUBSTITUTE_DATA)?;
        debug!("Wrote substitute pair in {}", workspace.path().display());

        let extracted = match self.extractor.extract(&data_path) {
            Ok(Extraction { metadata, raster }) => {
                drop(raster);
                Ok(metadata)
            }
            Err(err) => Err(err),
        };

        let scratch = workspace.path().to_path_buf();
        if let Err(e) = workspace.close() {
            warn!("Failed to remove scratch directory {}: {}", scratch.display(), e);
        }

        Ok(extracted?)
    }

    fn scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.config.temp_prefix);

        let dir = match &self.config.temp_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Build the raw mapping onto the real data file, returning it together
    /// with the no-data value as written in (or derived for) the header
    fn build_descriptor(
        &self,
        header: &HeaderRecord,
        metadata: &MetadataRecord,
    ) -> Result<(VirtualRasterDescriptor, String)> {
        let header_path = self.candidate.header();

        let byte_order =
            ByteOrder::from_header_value(header.get(fields::BYTE_ORDER)).ok_or_else(|| {
                EnviError::format(
                    header_path,
                    format!(
                        "unsupported byte order '{}' (expected 0 or 1)",
                        header.get(fields::BYTE_ORDER).unwrap_or_default()
                    ),
                )
            })?;

        let nodata_text = match header.get(fields::DATA_IGNORE_VALUE) {
            Some(value) => value.to_string(),
            None => metadata.datatype.min_value_text(),
        };
        let nodata = nodata_text.trim().parse::<f64>().map_err(|_| {
            EnviError::format(
                header_path,
                format!("data ignore value '{}' is not a number", nodata_text),
            )
        })?;

        let interleave = Interleave::from_header_value(header.get(fields::INTERLEAVE));

        // The mapping always starts at byte 0 of the data file
        if let Some(offset) = header
            .get(fields::HEADER_OFFSET)
            .filter(|v| v.trim().parse::<u64>().map_or(true, |n| n != 0))
        {
            warn!(
                "{} declares header offset {}; mapping from byte 0",
                header_path.display(),
                offset
            );
        }

        let descriptor = VirtualRasterDescriptor::raw(
            self.candidate.datafile(),
            interleave,
            metadata.nbands,
            metadata.cols,
            metadata.rows,
            metadata.datatype,
            nodata,
        )
        .with_header_offset(0)
        .with_byte_order(byte_order)
        .with_relative_to_vrt(false);

        debug!(
            "Virtual mapping for {}: {} {}x{}x{} {} nodata={}",
            self.candidate.datafile().display(),
            interleave.as_str(),
            metadata.cols,
            metadata.rows,
            metadata.nbands,
            metadata.datatype,
            nodata_text
        );

        Ok((descriptor, nodata_text))
    }
}
