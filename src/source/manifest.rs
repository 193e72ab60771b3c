//! JSON extraction record files.
//!
//! An external archive scanner writes one record file per package next to
//! (or instead of) the archive, e.g. `foo-1.0-1.noarch.rpm.deps.json`:
//!
//! ```json
//! {
//!   "archive": "foo-1.0-1.noarch.rpm",
//!   "provides": ["org.foo.Main"],
//!   "requires": ["java/lang/Object", "org.bar.Util"]
//! }
//! ```

use serde::Deserialize;
use std::path::Path;

use super::naming::NameNormalizer;
use super::RecordSource;
use crate::config::DepsConfig;
use crate::error::{ExtractError, Result};
use crate::graph::ExtractionRecord;

/// On-disk shape of a record file.
#[derive(Debug, Deserialize)]
struct RecordFile {
    #[serde(default)]
    name: Option<String>,
    /// File name of the archive the record was extracted from.
    #[serde(default)]
    archive: Option<String>,
    #[serde(default)]
    provides: Vec<String>,
    #[serde(default)]
    requires: Vec<String>,
    /// Class files the scanner failed to parse.
    #[serde(default)]
    malformed: Vec<String>,
}

/// Reads `*.deps.json` record files.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    suffix: String,
    naming: NameNormalizer,
}

impl ManifestSource {
    pub fn new(suffix: impl Into<String>, naming: NameNormalizer) -> Self {
        Self {
            suffix: suffix.into(),
            naming,
        }
    }

    pub fn from_config(config: &DepsConfig) -> Result<Self> {
        Ok(Self::new(
            config.build.record_suffix.clone(),
            NameNormalizer::new(&config.naming)?,
        ))
    }

    fn package_name(&self, path: &Path, file: &RecordFile) -> String {
        if let Some(name) = file.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.trim().to_string();
        }
        if let Some(archive) = file.archive.as_deref().filter(|a| !a.is_empty()) {
            let base = archive.rsplit('/').next().unwrap_or(archive);
            return self.naming.package_name(base);
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let stem = file_name.strip_suffix(&self.suffix).unwrap_or(&file_name);
        self.naming.package_name(stem)
    }
}

impl RecordSource for ManifestSource {
    fn accepts(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.suffix) && n.len() > self.suffix.len())
    }

    fn extract(&self, path: &Path) -> std::result::Result<ExtractionRecord, ExtractError> {
        let unreadable = |reason: String| ExtractError::UnreadableArchive {
            path: path.to_path_buf(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        let file: RecordFile = serde_json::from_str(&text).map_err(|e| unreadable(e.to_string()))?;

        if let Some(entry) = file.malformed.first() {
            return Err(ExtractError::MalformedClassFile {
                path: path.to_path_buf(),
                entry: entry.clone(),
            });
        }

        let name = self.package_name(path, &file);
        if name.is_empty() {
            return Err(unreadable("record has no package name".to_string()));
        }

        Ok(ExtractionRecord::new(name, file.provides, file.requires))
    }
}
