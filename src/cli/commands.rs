//! Command implementation for the ENVI metadata CLI
//!
//! Collects header files from the given paths, runs each through the driver,
//! and reports metadata as text or JSON lines on stdout. Logs and progress go
//! to stderr.

use crate::cli::args::{Args, OutputFormat};
use crate::driver::{EnviDriver, PopulatedDataset, Recognition};
use crate::error::EnviError;
use crate::header::HeaderRecord;
use anyhow::{Context, bail};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Cataloguing statistics for reporting
#[derive(Debug, Clone, Default)]
pub struct CatalogueStats {
    /// Header files considered
    pub headers_found: usize,
    /// Datasets whose metadata was populated
    pub catalogued: usize,
    /// Catalogued datasets that needed recovery
    pub recovered: usize,
    /// Files the driver does not apply to
    pub skipped: usize,
    /// Files that matched but failed to populate
    pub failed: usize,
    pub elapsed: Duration,
}

impl CatalogueStats {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Result of running one header through the driver
#[derive(Debug)]
pub enum Outcome {
    Catalogued(PopulatedDataset),
    Skipped(String),
    Failed(EnviError),
}

/// Main command runner
pub fn run(args: Args) -> anyhow::Result<CatalogueStats> {
    let start_time = Instant::now();
    setup_logging(&args)?;

    let config = args
        .driver_config()
        .context("Invalid driver configuration")?;
    debug!("Driver configuration: {:?}", config);
    let driver = EnviDriver::native().with_config(config);

    let headers = collect_headers(&args.paths)?;
    info!("Found {} candidate header files", headers.len());

    let mut stats = CatalogueStats {
        headers_found: headers.len(),
        ..Default::default()
    };

    let progress_bar = if args.show_progress() && args.paths.iter().any(|p| p.is_dir()) {
        let pb = ProgressBar::new(headers.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    for header in &headers {
        if let Some(pb) = &progress_bar {
            pb.set_message(display_name(header));
        }

        let outcome = catalogue(&driver, header);
        match &outcome {
            Outcome::Catalogued(populated) => {
                stats.catalogued += 1;
                if populated.was_recovered() {
                    stats.recovered += 1;
                }
            }
            Outcome::Skipped(reason) => {
                debug!("Skipping {}: {}", header.display(), reason);
                stats.skipped += 1;
            }
            Outcome::Failed(err) => {
                warn!("Failed to catalogue {}: {}", header.display(), err);
                stats.failed += 1;
            }
        }

        let rendered = match args.format {
            OutputFormat::Text => render_text(header, &outcome, &args),
            OutputFormat::Json => render_json(header, &outcome, &args).to_string(),
        };
        match &progress_bar {
            Some(pb) => pb.suspend(|| println!("{}", rendered)),
            None => println!("{}", rendered),
        }

        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    stats.elapsed = start_time.elapsed();
    if args.format == OutputFormat::Text && !args.quiet {
        print_summary(&stats);
    }

    Ok(stats)
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("envi_metadata={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to initialise logging")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Expand the command-line paths into a sorted, de-duplicated header list.
///
/// Directories are walked recursively for files matching the format regex.
/// Files named explicitly are kept whatever their name so the driver can
/// report why it does not apply.
pub fn collect_headers(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut headers = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if entry.file_type().is_file() && EnviDriver::matches(entry.path()) {
                    headers.push(entry.into_path());
                }
            }
        } else if path.is_file() {
            headers.push(path.clone());
        } else {
            bail!("Path does not exist: {}", path.display());
        }
    }

    headers.sort();
    headers.dedup();
    Ok(headers)
}

/// Recognise and populate one header file
pub fn catalogue(driver: &EnviDriver, header: &Path) -> Outcome {
    let candidate = match driver.recognize(header) {
        Ok(Recognition::Matched(candidate)) => candidate,
        Ok(Recognition::NotApplicable { reason, .. }) => return Outcome::Skipped(reason),
        Err(err) => return Outcome::Failed(err),
    };

    match driver.dataset(candidate).populate_metadata() {
        Ok(populated) => {
            if populated.was_recovered() {
                info!("Recovered {}", header.display());
            }
            Outcome::Catalogued(populated)
        }
        Err(err) => Outcome::Failed(err),
    }
}

fn render_text(header: &Path, outcome: &Outcome, args: &Args) -> String {
    let mut out = String::new();
    let name = header.display().to_string();

    match outcome {
        Outcome::Catalogued(populated) => {
            let md = &populated.metadata;
            let status = if populated.was_recovered() {
                "recovered".yellow()
            } else {
                "ok".green()
            };
            out.push_str(&format!("{} [{}]\n", name.bold(), status));
            out.push_str(&format!("  data file : {}\n", md.datafile.display()));
            out.push_str(&format!(
                "  raster    : {} {} bands {} x {} ({})\n",
                md.datatype,
                md.nbands,
                md.cols,
                md.rows,
                populated.raster.driver_short_name()
            ));
            if let Some(interleave) = md.interleave {
                out.push_str(&format!("  interleave: {}\n", interleave.as_str()));
            }
            if let (Some(cellx), Some(celly)) = (md.cellx, md.celly) {
                out.push_str(&format!("  cell size : {} x {}\n", cellx, celly));
            }
            if let Some(extent) = &md.extent {
                out.push_str(&format!(
                    "  extent    : {} {} {} {}\n",
                    extent.min_x, extent.min_y, extent.max_x, extent.max_y
                ));
            }
            if let Some(srs) = &md.srs {
                out.push_str(&format!("  srs       : {}\n", srs));
            }
            if let Some(nodata) = &md.nodata {
                out.push_str(&format!("  nodata    : {}\n", nodata));
            }
            if let Some(description) = &md.description {
                out.push_str(&format!("  descr.    : {}\n", description.replace('\n', " ")));
            }

            if args.show_header {
                match HeaderRecord::from_file(header) {
                    Ok(record) => {
                        out.push_str("  header:\n");
                        for (key, value) in record.iter() {
                            out.push_str(&format!("    {} = {}\n", key, value.replace('\n', "\\n")));
                        }
                    }
                    Err(err) => out.push_str(&format!("  header: {}\n", err.to_string().red())),
                }
            }

            if args.show_vrt {
                if let Some(descriptor) = &populated.recovery {
                    out.push_str(&descriptor.to_vrt_xml());
                }
            }
        }
        Outcome::Skipped(reason) => {
            out.push_str(&format!("{} [{}] {}", name, "skipped".dimmed(), reason));
        }
        Outcome::Failed(err) => {
            out.push_str(&format!("{} [{}] {}", name.bold(), "failed".red(), err));
        }
    }

    out.trim_end().to_string()
}

fn render_json(header: &Path, outcome: &Outcome, args: &Args) -> Value {
    match outcome {
        Outcome::Catalogued(populated) => {
            let mut value = json!({
                "header": header.display().to_string(),
                "status": "catalogued",
                "recovered": populated.was_recovered(),
                "raster_driver": populated.raster.driver_short_name(),
                "metadata": populated.metadata,
            });

            if args.show_header {
                if let Ok(record) = HeaderRecord::from_file(header) {
                    let fields: serde_json::Map<String, Value> = record
                        .iter()
                        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                        .collect();
                    value["header_fields"] = Value::Object(fields);
                }
            }
            if args.show_vrt {
                if let Some(descriptor) = &populated.recovery {
                    value["vrt"] = Value::String(descriptor.to_vrt_xml());
                }
            }

            value
        }
        Outcome::Skipped(reason) => json!({
            "header": header.display().to_string(),
            "status": "skipped",
            "reason": reason,
        }),
        Outcome::Failed(err) => json!({
            "header": header.display().to_string(),
            "status": "failed",
            "error": err.to_string(),
        }),
    }
}

fn print_summary(stats: &CatalogueStats) {
    println!();
    println!("{}", "Catalogue summary".bold());
    println!("   Headers found : {}", stats.headers_found);
    println!("   Catalogued    : {}", stats.catalogued.to_string().green());
    println!("   Recovered     : {}", stats.recovered);
    println!("   Skipped       : {}", stats.skipped);
    if stats.has_failures() {
        println!("   Failed        : {}", stats.failed.to_string().red());
    }
    println!("   Elapsed       : {}", HumanDuration(stats.elapsed));
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    const STANDARD: &str = "ENVI\nsamples = 4\nlines = 3\nbands = 2\n\
                            file type = ENVI Standard\ndata type = 4\ninterleave = bip\n";

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["envi_metadata"];
        argv.extend_from_slice(extra);
        argv.push("unused");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_collect_headers_walks_directories() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("z.hdr"), "ENVI\n").unwrap();
        fs::write(nested.join("m.hdr"), "ENVI\n").unwrap();
        fs::write(nested.join("m.img"), [0u8; 4]).unwrap();
        fs::write(nested.join("notes.txt"), "x").unwrap();

        let explicit = temp_dir.path().join("z.hdr");
        let headers =
            collect_headers(&[temp_dir.path().to_path_buf(), explicit.clone()]).unwrap();

        assert_eq!(headers, vec![nested.join("m.hdr"), explicit]);
    }

    #[test]
    fn test_collect_headers_missing_path() {
        let result = collect_headers(&[PathBuf::from("/nonexistent/scene.hdr")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_catalogue_outcomes() {
        let temp_dir = TempDir::new().unwrap();
        let good = temp_dir.path().join("good.hdr");
        fs::write(&good, STANDARD).unwrap();
        fs::write(temp_dir.path().join("good"), [0u8; 96]).unwrap();
        let other = temp_dir.path().join("other.hdr");
        fs::write(&other, "PDS_VERSION_ID = PDS3\n").unwrap();

        let driver = EnviDriver::native();

        match catalogue(&driver, &good) {
            Outcome::Catalogued(populated) => {
                assert!(!populated.was_recovered());
                assert_eq!(populated.metadata.nbands, 2);
            }
            other => panic!("Expected Catalogued, got {:?}", other),
        }
        assert!(matches!(catalogue(&driver, &other), Outcome::Skipped(_)));
    }

    #[test]
    fn test_render_json_skipped() {
        let outcome = Outcome::Skipped("not an ENVI header".to_string());
        let value = render_json(Path::new("/data/x.hdr"), &outcome, &args(&[]));

        assert_eq!(value["status"], "skipped");
        assert_eq!(value["header"], "/data/x.hdr");
        assert_eq!(value["reason"], "not an ENVI header");
    }

    #[test]
    fn test_render_json_catalogued_with_header_fields() {
        let temp_dir = TempDir::new().unwrap();
        let header = temp_dir.path().join("scene.hdr");
        fs::write(&header, STANDARD).unwrap();
        fs::write(temp_dir.path().join("scene"), [0u8; 96]).unwrap();

        let outcome = catalogue(&EnviDriver::native(), &header);
        let value = render_json(&header, &outcome, &args(&["--show-header", "--show-vrt"]));

        assert_eq!(value["status"], "catalogued");
        assert_eq!(value["recovered"], false);
        assert_eq!(value["metadata"]["cols"], 4);
        assert_eq!(value["metadata"]["datatype"], "Float32");
        assert_eq!(value["header_fields"]["interleave"], "bip");
        assert!(value.get("vrt").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_render_json_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let header = temp_dir.path().join(OsStr::from_bytes(b"sc\xffene.hdr"));
        fs::write(&header, STANDARD).unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"sc\xffene")), [0u8; 96]).unwrap();

        let outcome = catalogue(&EnviDriver::native(), &header);
        let value = render_json(&header, &outcome, &args(&[]));

        assert_eq!(value["status"], "catalogued");
        let rendered = value["header"].as_str().unwrap();
        assert!(rendered.ends_with("sc\u{FFFD}ene.hdr"));
        let datafile = value["metadata"]["datafile"].as_str().unwrap();
        assert!(datafile.ends_with("sc\u{FFFD}ene"));
    }

    #[test]
    fn test_render_text_failed() {
        let outcome = Outcome::Failed(EnviError::format("/data/x.hdr", "unterminated brace"));
        colored::control::set_override(false);
        let text = render_text(Path::new("/data/x.hdr"), &outcome, &args(&[]));

        assert!(text.starts_with("/data/x.hdr [failed]"));
        assert!(text.contains("unterminated brace"));
    }
}
