//! # javadeps
//!
//! Class-level dependency analysis for Java distribution packages.
//!
//! Every package (an RPM or a bare archive) provides the classes it contains
//! and requires the classes its bytecode references. javadeps indexes those
//! sets once, persists the index, and answers dependency questions without
//! touching the archives again.
//!
//! ## Key Features
//!
//! - **Deterministic**: the same inputs always give a byte-identical store
//! - **Single owner per class**: the first package in enumeration order wins
//! - **Explanations**: `why` lists the classes behind a dependency
//! - **Parallel build**: records are extracted on the rayon pool
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use javadeps::{build_index, DepsConfig, ManifestSource, QueryEngine};
//! use std::path::Path;
//!
//! let config = DepsConfig::default();
//! let source = ManifestSource::from_config(&config)?;
//! let (index, report) = build_index(Path::new("repo"), &source, config.build.batch_size)?;
//! println!("{}", report);
//!
//! let engine = QueryEngine::new(&index);
//! println!("{:?}", engine.what_provides("org.junit.Test"));
//! # Ok::<(), javadeps::DepsError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod query;
pub mod source;

// Re-exports for convenience
pub use config::DepsConfig;
pub use error::{CorruptIndex, DepsError, ExtractError, Result};

// Graph re-exports
pub use graph::{
    build, build_index, BuildReport, DependencyIndex, ExtractionRecord, QueryEngine, Why,
};
pub use query::{
    query_diff, query_list, query_provides, query_requires, query_stats, query_what_provides,
    query_what_requires, query_why, read_declared, QueryResponse,
};
pub use source::{ManifestSource, NameNormalizer, RecordSource};
