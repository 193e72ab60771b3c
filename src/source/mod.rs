//! Extraction record sources.
//!
//! Reading archives and parsing class files happens outside this crate. A
//! [`RecordSource`] turns one input file into an [`ExtractionRecord`]; the
//! builder only ever talks to this trait.

pub mod manifest;
pub mod naming;

use std::path::Path;

use crate::error::ExtractError;
use crate::graph::ExtractionRecord;

pub use manifest::ManifestSource;
pub use naming::NameNormalizer;

/// Produces one extraction record per input file.
///
/// Implementations must be safe to call from several threads at once; the
/// builder extracts files in parallel.
pub trait RecordSource: Sync {
    /// Whether `path` is an input this source understands.
    fn accepts(&self, path: &Path) -> bool;

    /// Extract the record for the package stored at `path`.
    fn extract(&self, path: &Path) -> Result<ExtractionRecord, ExtractError>;
}
