//! Recognition and data file resolution tests

use super::{ScriptedExtractor, ScriptedLibrary};
use crate::config::DriverConfig;
use crate::driver::{EnviDriver, Recognition};
use crate::error::EnviError;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn driver(library: ScriptedLibrary) -> (EnviDriver, Arc<ScriptedLibrary>) {
    let library = Arc::new(library);
    let driver = EnviDriver::new(Arc::new(ScriptedExtractor::new(None)), library.clone());
    (driver, library)
}

#[test]
fn test_format_regex() {
    assert!(EnviDriver::matches(Path::new("/data/scene.hdr")));
    assert!(!EnviDriver::matches(Path::new("/data/scene.hdr.bak")));
    assert!(!EnviDriver::matches(Path::new("/data/scene.img")));

    let info = EnviDriver::info();
    assert_eq!(info.short_name, "ENVI");
    assert_eq!(info.format_regex, &[r"\.hdr$"]);
}

#[test]
fn test_non_envi_header_is_not_applicable_without_scanning() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("scene.hdr");
    fs::write(&header, "BANDS: 3\nROWS: 10\n").unwrap();
    fs::write(temp_dir.path().join("scene.img"), [0u8; 4]).unwrap();

    let (driver, library) = driver(ScriptedLibrary::new());
    let recognition = driver.recognize(&header).unwrap();

    match recognition {
        Recognition::NotApplicable { reason, .. } => assert!(reason.contains("ENVI")),
        other => panic!("Expected NotApplicable, got {:?}", other),
    }
    assert!(library.open_attempts().is_empty());
}

#[test]
fn test_vsi_paths_are_not_applicable() {
    let (driver, _) = driver(ScriptedLibrary::new());
    let recognition = driver.recognize(Path::new("/vsizip/archive.zip/scene.hdr")).unwrap();
    assert!(!recognition.is_match());
}

#[test]
fn test_extensionless_data_file_matched() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("scene.hdr");
    fs::write(&header, "ENVI\nsamples = 1\n").unwrap();
    fs::write(temp_dir.path().join("scene"), [0u8; 4]).unwrap();

    let (driver, library) = driver(ScriptedLibrary::new());
    match driver.recognize(&header).unwrap() {
        Recognition::Matched(candidate) => {
            assert_eq!(candidate.header(), header.as_path());
            assert_eq!(candidate.datafile(), temp_dir.path().join("scene").as_path());
        }
        other => panic!("Expected Matched, got {:?}", other),
    }
    assert!(library.open_attempts().is_empty());
}

#[test]
fn test_first_openable_sibling_wins() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("scene.hdr");
    fs::write(&header, "ENVI\nsamples = 1\n").unwrap();
    for name in ["scene.aux", "scene.dat", "scene.img"] {
        fs::write(temp_dir.path().join(name), [0u8; 4]).unwrap();
    }

    let library = ScriptedLibrary::new()
        .with_openable(temp_dir.path().join("scene.dat"))
        .with_openable(temp_dir.path().join("scene.img"));
    let (driver, library) = driver(library);

    let candidate = driver.recognize(&header).unwrap().into_result().unwrap();
    assert_eq!(candidate.datafile(), temp_dir.path().join("scene.dat").as_path());

    // The header itself is never probed
    let attempts = library.open_attempts();
    assert_eq!(
        attempts,
        vec![temp_dir.path().join("scene.aux"), temp_dir.path().join("scene.dat")]
    );
}

#[test]
fn test_sibling_without_driver_name_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("scene.hdr");
    fs::write(&header, "ENVI\n").unwrap();
    fs::write(temp_dir.path().join("scene.dat"), [0u8; 4]).unwrap();

    let library = ScriptedLibrary::new()
        .with_openable(temp_dir.path().join("scene.dat"))
        .with_driver_name("");
    let (driver, _) = driver(library);

    let result = driver.recognize(&header).unwrap().into_result();
    assert!(matches!(result, Err(EnviError::NotApplicable { .. })));
}

#[test]
fn test_open_reports_not_applicable_error() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("lonely.hdr");
    fs::write(&header, "ENVI\nsamples = 1\n").unwrap();

    let (driver, _) = driver(ScriptedLibrary::new());
    let err = driver.open(&header).unwrap_err();
    assert!(err.is_not_applicable());
}

#[test]
fn test_probing_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let header = temp_dir.path().join("scene.hdr");
    fs::write(&header, "ENVI\n").unwrap();
    fs::write(temp_dir.path().join("scene.dat"), [0u8; 4]).unwrap();

    let library = ScriptedLibrary::new().with_openable(temp_dir.path().join("scene.dat"));
    let (driver, library) = driver(library);
    let driver = driver.with_config(DriverConfig::new().with_sibling_probing(false));

    assert!(!driver.recognize(&header).unwrap().is_match());
    assert!(library.open_attempts().is_empty());
}
