//! Tests for the ENVI driver
//!
//! Recognition and recovery are exercised against scripted collaborators so
//! failures can be injected precisely.

pub mod recognition;

use crate::constants::fields;
use crate::error::{EnviError, ExtractError};
use crate::header::HeaderRecord;
use crate::models::{DataType, MetadataRecord};
use crate::raster::{Extraction, MetadataExtractor, NativeRaster, RasterHandle, RasterLibrary};
use crate::vrt::VirtualRasterDescriptor;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What the scripted extractor saw when called on a substitute pair
#[derive(Debug, Clone)]
pub struct SubstituteCall {
    pub data_path: PathBuf,
    pub data_len: u64,
    pub header_text: String,
}

/// Extractor that fails on real data files and reads geometry from the
/// header of substitute pairs
#[derive(Debug)]
pub struct ScriptedExtractor {
    failure: Option<ExtractError>,
    substitute_failure: Option<ExtractError>,
    substitute_name: String,
    pub calls: Mutex<Vec<PathBuf>>,
    pub substitute_calls: Mutex<Vec<SubstituteCall>>,
}

impl ScriptedExtractor {
    /// Fails on real files with `failure`; `None` means real files succeed
    pub fn new(failure: Option<ExtractError>) -> Self {
        Self {
            failure,
            substitute_failure: None,
            substitute_name: "dummy".to_string(),
            calls: Mutex::new(Vec::new()),
            substitute_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_io() -> Self {
        Self::new(Some(ExtractError::io("/real/data", "not recognised as a supported file format")))
    }

    pub fn with_substitute_failure(mut self, failure: ExtractError) -> Self {
        self.substitute_failure = Some(failure);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn substitute_calls(&self) -> Vec<SubstituteCall> {
        self.substitute_calls.lock().unwrap().clone()
    }

    fn extract_substitute(&self, path: &Path) -> Result<Extraction, ExtractError> {
        let header_path = path.with_extension("hdr");
        let header_text = fs::read_to_string(&header_path).unwrap();
        let data_len = fs::metadata(path).unwrap().len();
        self.substitute_calls.lock().unwrap().push(SubstituteCall {
            data_path: path.to_path_buf(),
            data_len,
            header_text,
        });

        if let Some(failure) = &self.substitute_failure {
            return Err(failure.clone());
        }

        let header = HeaderRecord::from_file(&header_path).unwrap();
        let number = |key: &str| header.get(key).map(|v| v.parse::<usize>().unwrap());
        let datatype = number(fields::DATA_TYPE)
            .and_then(|code| DataType::from_envi_code(code as u32))
            .unwrap_or(DataType::Byte);
        let metadata = MetadataRecord::new(
            path,
            "ENVI",
            datatype,
            number(fields::BANDS).unwrap_or(1),
            number(fields::SAMPLES).unwrap(),
            number(fields::LINES).unwrap(),
        );
        let raster = NativeRaster::new("ENVI", path, metadata.nbands);

        Ok(Extraction {
            metadata,
            raster: Box::new(raster),
        })
    }
}

impl MetadataExtractor for ScriptedExtractor {
    fn extract(&self, path: &Path) -> Result<Extraction, ExtractError> {
        self.calls.lock().unwrap().push(path.to_path_buf());

        if path.file_name().is_some_and(|n| n == self.substitute_name.as_str()) {
            return self.extract_substitute(path);
        }

        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(Extraction {
                metadata: MetadataRecord::new(path, "ENVI", DataType::Float32, 1, 10, 10),
                raster: Box::new(NativeRaster::new("ENVI", path, 1)),
            }),
        }
    }
}

/// Raster library that opens a fixed set of paths and records virtual
/// mappings
#[derive(Debug, Default)]
pub struct ScriptedLibrary {
    openable: HashSet<PathBuf>,
    driver_name: String,
    fail_virtual: bool,
    pub opened: Mutex<Vec<PathBuf>>,
    pub virtual_opens: Mutex<Vec<VirtualRasterDescriptor>>,
}

impl ScriptedLibrary {
    pub fn new() -> Self {
        Self {
            driver_name: "ENVI".to_string(),
            ..Default::default()
        }
    }

    pub fn with_openable(mut self, path: impl Into<PathBuf>) -> Self {
        self.openable.insert(path.into());
        self
    }

    pub fn with_driver_name(mut self, name: &str) -> Self {
        self.driver_name = name.to_string();
        self
    }

    pub fn failing_virtual(mut self) -> Self {
        self.fail_virtual = true;
        self
    }

    pub fn open_attempts(&self) -> Vec<PathBuf> {
        self.opened.lock().unwrap().clone()
    }
}

impl RasterLibrary for ScriptedLibrary {
    fn open(&self, path: &Path) -> Option<Box<dyn RasterHandle>> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        self.openable
            .contains(path)
            .then(|| Box::new(NativeRaster::new(self.driver_name.clone(), path, 1)) as Box<dyn RasterHandle>)
    }

    fn open_virtual(
        &self,
        descriptor: &VirtualRasterDescriptor,
    ) -> crate::error::Result<Box<dyn RasterHandle>> {
        self.virtual_opens.lock().unwrap().push(descriptor.clone());
        if self.fail_virtual {
            return Err(EnviError::raster("virtual mapping rejected"));
        }
        Ok(Box::new(NativeRaster::new(
            "VRT",
            descriptor.source.clone(),
            descriptor.nbands,
        )))
    }
}

/// Directory entries remaining under `dir`
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    entries.sort();
    entries
}
