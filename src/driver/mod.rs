//! ENVI metadata driver.
//!
//! Recognises `.hdr` files, resolves the paired data file and populates
//! metadata through the injected extractor. Headers written with the bare
//! `file type = ENVI` are recovered by [`recovery::RecoveryWorkflow`].

pub mod discovery;
pub mod recovery;

#[cfg(test)]
pub mod tests;

use self::recovery::RecoveryWorkflow;

use crate::config::DriverConfig;
use crate::constants::{DRIVER_LONG_NAME, DRIVER_SHORT_NAME, FORMAT_REGEX, VSI_PREFIX};
use crate::error::{EnviError, Result};
use crate::header::has_envi_magic;
use crate::models::{DatasetCandidate, MetadataRecord};
use crate::raster::{
    Extraction, MetadataExtractor, NativeExtractor, NativeRasterLibrary, RasterHandle,
    RasterLibrary,
};
use crate::vrt::VirtualRasterDescriptor;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

static FORMAT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FORMAT_REGEX
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Registration details a driver framework uses to select this driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverInfo {
    pub short_name: &'static str,
    pub long_name: &'static str,
    pub format_regex: &'static [&'static str],
}

/// Outcome of checking whether a file belongs to this driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    Matched(DatasetCandidate),
    NotApplicable { path: PathBuf, reason: String },
}

impl Recognition {
    fn not_applicable(path: &Path, reason: impl Into<String>) -> Self {
        Recognition::NotApplicable {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Recognition::Matched(_))
    }

    /// Convert to a result, turning `NotApplicable` into [`EnviError::NotApplicable`]
    pub fn into_result(self) -> Result<DatasetCandidate> {
        match self {
            Recognition::Matched(candidate) => Ok(candidate),
            Recognition::NotApplicable { path, reason } => {
                Err(EnviError::NotApplicable { path, reason })
            }
        }
    }
}

/// A populated dataset: metadata plus the live raster handle backing it
#[derive(Debug)]
pub struct PopulatedDataset {
    pub metadata: MetadataRecord,
    pub raster: Box<dyn RasterHandle>,
    /// The virtual mapping onto the real data file when recovery was needed
    pub recovery: Option<VirtualRasterDescriptor>,
}

impl PopulatedDataset {
    pub fn was_recovered(&self) -> bool {
        self.recovery.is_some()
    }
}

/// The ENVI driver, holding its collaborators and configuration
#[derive(Clone)]
pub struct EnviDriver {
    extractor: Arc<dyn MetadataExtractor>,
    library: Arc<dyn RasterLibrary>,
    config: DriverConfig,
}

impl fmt::Debug for EnviDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnviDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EnviDriver {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, library: Arc<dyn RasterLibrary>) -> Self {
        Self {
            extractor,
            library,
            config: DriverConfig::default(),
        }
    }

    /// Driver backed by the header-only native raster implementation
    pub fn native() -> Self {
        Self::new(Arc::new(NativeExtractor), Arc::new(NativeRasterLibrary))
    }

    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn info() -> DriverInfo {
        DriverInfo {
            short_name: DRIVER_SHORT_NAME,
            long_name: DRIVER_LONG_NAME,
            format_regex: FORMAT_REGEX,
        }
    }

    /// Whether a file name matches the driver's format regex
    pub fn matches(path: &Path) -> bool {
        let name = path.to_string_lossy();
        FORMAT_PATTERNS.iter().any(|re| re.is_match(&name))
    }

    /// Decide whether `path` is an ENVI header with a usable data file.
    ///
    /// The first line is checked before anything else; files that are not
    /// ENVI headers never trigger a directory scan.
    pub fn recognize(&self, path: &Path) -> Result<Recognition> {
        if path.to_string_lossy().starts_with(VSI_PREFIX) {
            return Ok(Recognition::not_applicable(
                path,
                "virtual file system paths are not supported",
            ));
        }

        if !path.is_file() {
            return Ok(Recognition::not_applicable(path, "not a regular file"));
        }

        if !has_envi_magic(path)? {
            return Ok(Recognition::not_applicable(path, "first line is not ENVI"));
        }

        let datafile =
            discovery::resolve_datafile(path, self.library.as_ref(), self.config.probe_siblings)?;

        match datafile {
            Some(datafile) => {
                debug!("{} pairs with data file {}", path.display(), datafile.display());
                Ok(Recognition::Matched(DatasetCandidate::new(path, datafile)))
            }
            None => Ok(Recognition::not_applicable(path, "no paired data file found")),
        }
    }

    /// Recognise `path` and wrap it as a dataset, failing with
    /// [`EnviError::NotApplicable`] when it is not an ENVI dataset
    pub fn open(&self, path: &Path) -> Result<EnviDataset<'_>> {
        let candidate = self.recognize(path)?.into_result()?;
        Ok(self.dataset(candidate))
    }

    pub fn dataset(&self, candidate: DatasetCandidate) -> EnviDataset<'_> {
        EnviDataset {
            driver: self,
            candidate,
        }
    }
}

/// A recognised ENVI dataset awaiting metadata population
#[derive(Debug)]
pub struct EnviDataset<'a> {
    driver: &'a EnviDriver,
    candidate: DatasetCandidate,
}

impl EnviDataset<'_> {
    pub fn candidate(&self) -> &DatasetCandidate {
        &self.candidate
    }

    /// Populate metadata for the dataset.
    ///
    /// Well-formed files go straight through the extractor. An I/O failure
    /// falls back to recovery, which only applies to the bare
    /// `file type = ENVI` variant; every other error is returned unchanged.
    pub fn populate_metadata(&self) -> Result<PopulatedDataset> {
        let driver = self.driver;
        let datafile = self.candidate.datafile();

        match driver.extractor.extract(datafile) {
            Ok(Extraction { metadata, raster }) => Ok(PopulatedDataset {
                metadata,
                raster,
                recovery: None,
            }),
            Err(err) if err.is_io() && driver.config.recovery_enabled => {
                debug!("Direct extraction of {} failed: {}", datafile.display(), err);
                RecoveryWorkflow::new(
                    &self.candidate,
                    driver.extractor.as_ref(),
                    driver.library.as_ref(),
                    &driver.config,
                )
                .run(err)
            }
            Err(err) => Err(err.into()),
        }
    }
}
