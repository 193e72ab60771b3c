//! Dependency graph: the index, its builder, the store and queries.
//!
//! Packages own the classes they provide; an edge A → B exists when A
//! references a class whose provider is B.

pub mod builder;
pub mod engine;
pub mod index;
pub mod persistence;
pub mod types;

pub use builder::{build, build_index, collect_inputs, BuildReport, IndexBuilder};
pub use engine::{Diff, Hop, IndexStats, QueryEngine, Requirements, Why};
pub use index::{DependencyIndex, Resolution};
pub use types::{ClassSymbol, ExtractionRecord, Package, PackageId, SymbolId, SymbolTable};
