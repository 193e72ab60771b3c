//! Error types for javadeps.
//!
//! Build-time extraction failures (`ExtractError`) are recoverable and only
//! logged. A damaged store (`CorruptIndex`) is fatal for the query process.
//! "Not found" and "no dependency" are ordinary query answers, not errors.

use std::path::PathBuf;

/// Why a persisted index was rejected. The store is never partially loaded.
#[derive(Debug, thiserror::Error)]
pub enum CorruptIndex {
    /// The store file could not be opened or read.
    #[error("cannot read index store: {0}")]
    Unreadable(#[source] std::io::Error),

    /// The file does not start with the index magic.
    #[error("not a javadeps index (bad magic)")]
    BadMagic,

    /// The file was written by an incompatible format version.
    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The record stream ends before the last record is complete.
    #[error("index store is truncated")]
    Truncated,

    /// The record stream is structurally invalid.
    #[error("malformed index store: {0}")]
    Malformed(String),
}

/// A per-archive failure reported by a record source.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The archive (or its record file) could not be opened or decoded.
    #[error("unreadable archive {}: {reason}", path.display())]
    UnreadableArchive { path: PathBuf, reason: String },

    /// A class file inside the archive could not be parsed.
    #[error("malformed class file {entry} in {}", path.display())]
    MalformedClassFile { path: PathBuf, entry: String },
}

impl ExtractError {
    /// The archive this failure belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ExtractError::UnreadableArchive { path, .. } => path,
            ExtractError::MalformedClassFile { path, .. } => path,
        }
    }
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum DepsError {
    #[error(transparent)]
    CorruptIndex(#[from] CorruptIndex),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("usage error: {0}")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, DepsError>;
