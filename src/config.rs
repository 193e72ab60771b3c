//! Configuration loaded from `javadeps.toml`.
//!
//! Every field has a default, so a missing file (or a file that sets only a
//! few keys) is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DepsError, Result};

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "javadeps.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Location of the persisted index store.
    pub database: PathBuf,
    pub naming: NamingConfig,
    pub build: BuildConfig,
}

/// How package names are derived from archive file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Regex stripped from the stem of `.rpm` file names (version-release.arch).
    pub rpm_suffix: String,
    /// Prefix of the synthetic name given to bare archives.
    pub jar_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Suffix of the extraction record files picked up by `build`.
    pub record_suffix: String,
    /// Records extracted in parallel before being merged.
    pub batch_size: usize,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("packages.dep"),
            naming: NamingConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            rpm_suffix: "-[^-]*-[^-]*$".to_string(),
            jar_prefix: "@jar@".to_string(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            record_suffix: ".deps.json".to_string(),
            batch_size: 256,
        }
    }
}

impl DepsConfig {
    /// Load config from an explicit path. The file must exist and parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DepsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::parse(&text).map_err(|e| DepsError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` if given, else `javadeps.toml` in the working directory if
    /// it exists, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let config: DepsConfig = toml::from_str(text).map_err(|e| e.to_string())?;
        if config.build.batch_size == 0 {
            return Err("build.batch_size must be at least 1".to_string());
        }
        Ok(config)
    }
}
