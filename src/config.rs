//! Configuration for the ENVI driver.
//!
//! Settings are layered: built-in defaults, then environment variables, then
//! whatever the caller (usually the CLI) applies through the `with_*` builders.

use crate::constants::{DEFAULT_SUBSTITUTE_NAME, DEFAULT_TEMP_PREFIX, HEADER_EXTENSION, env};
use crate::error::{EnviError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Recover headers declaring `file type = ENVI` instead of failing
    pub recovery_enabled: bool,

    /// Directory in which recovery scratch directories are created
    /// (system temp dir when unset)
    pub temp_root: Option<PathBuf>,

    /// Prefix of recovery scratch directory names
    pub temp_prefix: String,

    /// Base name of the substitute header/data pair written during recovery
    pub substitute_name: String,

    /// Scan `<base>.*` for a data file when `<base>` itself does not exist
    pub probe_siblings: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            recovery_enabled: true,
            temp_root: None,
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            substitute_name: DEFAULT_SUBSTITUTE_NAME.to_string(),
            probe_siblings: true,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `ENVI_METADATA_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup function
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(env::RECOVERY) {
            self.recovery_enabled = parse_flag(&value).ok_or_else(|| {
                EnviError::configuration(format!("{} must be a boolean, got '{}'", env::RECOVERY, value))
            })?;
            debug!("{} override: {}", env::RECOVERY, self.recovery_enabled);
        }

        if let Some(value) = lookup(env::TEMP_DIR).filter(|v| !v.trim().is_empty()) {
            self.temp_root = Some(PathBuf::from(value));
        }

        if let Some(value) = lookup(env::TEMP_PREFIX) {
            self.temp_prefix = value;
        }

        Ok(self)
    }

    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.recovery_enabled = enabled;
        self
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.temp_prefix = prefix.into();
        self
    }

    pub fn with_substitute_name(mut self, name: impl Into<String>) -> Self {
        self.substitute_name = name.into();
        self
    }

    pub fn with_sibling_probing(mut self, enabled: bool) -> Self {
        self.probe_siblings = enabled;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.substitute_name.trim().is_empty() {
            return Err(EnviError::configuration("substitute name must not be empty"));
        }

        let name = Path::new(&self.substitute_name);
        if name.file_name().map(|n| n != name.as_os_str()).unwrap_or(true) {
            return Err(EnviError::configuration(format!(
                "substitute name must be a bare file name, got '{}'",
                self.substitute_name
            )));
        }

        if name
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(HEADER_EXTENSION))
        {
            return Err(EnviError::configuration(format!(
                "substitute name must not end in .{}, got '{}'",
                HEADER_EXTENSION, self.substitute_name
            )));
        }

        if self.temp_prefix.contains(['/', '\\']) {
            return Err(EnviError::configuration(format!(
                "temp prefix must not contain path separators, got '{}'",
                self.temp_prefix
            )));
        }

        if let Some(root) = &self.temp_root {
            if !root.is_dir() {
                return Err(EnviError::configuration(format!(
                    "temp root is not a directory: {}",
                    root.display()
                )));
            }
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
