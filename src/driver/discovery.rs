//! Paired data file discovery for ENVI headers.
//!
//! An ENVI header `scene.hdr` normally describes `scene`. When that file does
//! not exist, any `scene.*` sibling the raster library can open is accepted.

use crate::constants::HEADER_EXTENSION;
use crate::error::{EnviError, Result};
use crate::raster::RasterLibrary;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve the data file belonging to `header`, or `None` if there is none
pub fn resolve_datafile(
    header: &Path,
    library: &dyn RasterLibrary,
    probe_siblings: bool,
) -> Result<Option<PathBuf>> {
    let base = header.with_extension("");

    if base != header && base.is_file() {
        return Ok(Some(base));
    }

    if !probe_siblings {
        return Ok(None);
    }

    for candidate in sibling_candidates(&base)? {
        if candidate == header || is_header_file(&candidate) {
            continue;
        }

        match library.open(&candidate) {
            Some(handle) if !handle.driver_short_name().is_empty() => {
                debug!(
                    "Opened {} with driver {}",
                    candidate.display(),
                    handle.driver_short_name()
                );
                return Ok(Some(candidate));
            }
            _ => debug!("Skipping unopenable sibling {}", candidate.display()),
        }
    }

    Ok(None)
}

/// Files named `<base>.<anything>`, sorted by path
pub fn sibling_candidates(base: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}.*", glob::Pattern::escape(&base.to_string_lossy()));

    let entries = glob::glob(&pattern)
        .map_err(|e| EnviError::not_applicable(base, format!("invalid sibling pattern: {}", e)))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    Ok(files)
}

fn is_header_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(HEADER_EXTENSION))
}
