//! ENVI header parsing and serialization.
//!
//! An ENVI header is a text file whose first line is `ENVI`, followed by
//! `key = value` lines. Values wrapped in braces may span several lines:
//!
//! ```text
//! ENVI
//! samples = 512
//! description = {
//!   Scene captured 2009-03-14,
//!   radiometrically corrected}
//! ```
//!
//! Parsing produces a [`HeaderRecord`], an ordered map from lowercase field
//! name to trimmed value. Multi-line values are joined with `\n` and all
//! closing braces are removed from the assembled value, including any that
//! appear in its interior.

use crate::constants::ENVI_MAGIC;
use crate::error::{EnviError, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Origin used in error messages when parsing text that did not come from a file
const IN_MEMORY: &str = "<memory>";

/// Ordered mapping of ENVI header fields.
///
/// Keys are stored lowercase. Inserting an existing key replaces its value
/// but keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    fields: Vec<(String, String)>,
}

impl HeaderRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value if the key was present
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = key.as_ref().trim().to_lowercase();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse header lines. The first line is the `ENVI` marker and is skipped
    /// without being checked.
    pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        parse_lines_from(lines, Path::new(IN_MEMORY))
    }

    /// Parse header text, skipping its first line
    pub fn parse_str(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        Self::parse_lines(&lines)
    }

    /// Read and parse a header file, verifying the `ENVI` marker.
    ///
    /// Bytes that are not valid UTF-8 (Latin-1 text from older tools) are
    /// replaced rather than rejected.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();

        match lines.first() {
            Some(first) if first.trim() == ENVI_MAGIC => {}
            _ => {
                return Err(EnviError::format(path, "first line is not ENVI"));
            }
        }

        let record = parse_lines_from(&lines, path)?;
        debug!("Parsed {} header fields from {}", record.len(), path.display());
        Ok(record)
    }

    /// Render the record as ENVI header text.
    ///
    /// Values containing a newline are wrapped in braces so that parsing the
    /// output gives back the same record.
    pub fn to_envi_string(&self) -> String {
        let mut out = format!("{}\n", ENVI_MAGIC);
        for (key, value) in self.iter() {
            if value.contains('\n') {
                out.push_str(&format!("{} = {{{}}}\n", key, value));
            } else {
                out.push_str(&format!("{} = {}\n", key, value));
            }
        }
        out
    }

    /// Write the record as an ENVI header file. The file is flushed and closed
    /// before returning.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(self.to_envi_string().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Check whether the first line of a file is exactly `ENVI`.
///
/// Only the first line is read. Files that are not valid text simply do not
/// match.
pub fn has_envi_magic(path: &Path) -> Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut first = Vec::new();
    reader.read_until(b'\n', &mut first)?;
    Ok(String::from_utf8_lossy(&first).trim() == ENVI_MAGIC)
}

fn parse_lines_from<S: AsRef<str>>(lines: &[S], origin: &Path) -> Result<HeaderRecord> {
    let mut record = HeaderRecord::new();
    let mut i = 1;

    while i < lines.len() {
        let line_no = i + 1;
        let line = lines[i].as_ref().trim();
        i += 1;

        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let (key, value) = if line.contains('{') {
            let opened = line.replace('{', "");
            let (key, first) = split_field(&opened).ok_or_else(|| {
                EnviError::format(origin, format!("line {}: missing '=' in '{}'", line_no, line))
            })?;
            let key = key.to_string();
            let mut value = first.trim().to_string();

            if !line.contains('}') {
                loop {
                    let Some(next) = lines.get(i) else {
                        return Err(EnviError::format(
                            origin,
                            format!("line {}: unterminated '{{' in field '{}'", line_no, key.trim()),
                        ));
                    };
                    let next = next.as_ref().trim();
                    i += 1;
                    value.push('\n');
                    value.push_str(next);
                    if next.contains('}') {
                        break;
                    }
                }
            }

            (key, value.replace('}', ""))
        } else {
            let (key, value) = split_field(line).ok_or_else(|| {
                EnviError::format(origin, format!("line {}: missing '=' in '{}'", line_no, line))
            })?;
            (key.to_string(), value.to_string())
        };

        record.insert(key.trim(), value.trim());
    }

    Ok(record)
}

/// Split on the first `=` only; values may contain further `=` characters
fn split_field(line: &str) -> Option<(&str, &str)> {
    line.split_once('=')
}
