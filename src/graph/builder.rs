//! Index builder. Scans a directory and builds the dependency index.
//!
//! Input files are enumerated and sorted by path, extracted in parallel
//! batches, and merged into the index strictly in sorted order. Parallel
//! completion order therefore never changes which package owns a class.

use ignore::WalkBuilder;
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::index::DependencyIndex;
use super::types::{ClassSymbol, ExtractionRecord, Package, SymbolId, SymbolTable};
use crate::error::{ExtractError, Result};
use crate::source::RecordSource;

/// Accumulates extraction records into a [`DependencyIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    symbols: SymbolTable,
    packages: IndexMap<String, Package>,
    skipped: usize,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package. A record whose name was already seen replaces the
    /// earlier contents but keeps the earlier position in enumeration order.
    pub fn add_record(&mut self, record: ExtractionRecord) {
        let mut package = Package::new(record.name.clone());
        for sym in record.provides.iter().filter_map(|raw| ClassSymbol::parse(raw)) {
            package.provides.insert(self.symbols.intern(sym.as_str()));
        }
        for sym in record.requires.iter().filter_map(|raw| ClassSymbol::parse(raw)) {
            package.requires.insert(self.symbols.intern(sym.as_str()));
        }

        if self.packages.contains_key(&record.name) {
            debug!(package = %record.name, "package rebuilt, replacing earlier record");
        }
        self.packages.insert(record.name, package);
    }

    /// Record a per-archive failure. The build carries on without it.
    pub fn skip(&mut self, err: &ExtractError) {
        warn!(path = %err.path().display(), error = %err, "skipping archive");
        self.skipped += 1;
    }

    pub fn push(&mut self, record: std::result::Result<ExtractionRecord, ExtractError>) {
        match record {
            Ok(record) => self.add_record(record),
            Err(err) => self.skip(&err),
        }
    }

    /// Number of records skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Freeze the index. Classes only the replaced records referenced are
    /// dropped and the surviving ids are renumbered by first use.
    pub fn finish(self) -> DependencyIndex {
        let IndexBuilder {
            symbols: interned,
            packages: records,
            ..
        } = self;

        let mut symbols = SymbolTable::new();
        let mut remap: HashMap<SymbolId, SymbolId> = HashMap::new();
        let mut rename =
            |sym: SymbolId| *remap.entry(sym).or_insert_with(|| symbols.intern(interned.name(sym)));

        let packages: IndexMap<String, Package> = records
            .into_iter()
            .map(|(name, old)| {
                let mut package = Package::new(old.name);
                package.provides = old.provides.iter().map(|&sym| rename(sym)).collect();
                package.requires = old.requires.iter().map(|&sym| rename(sym)).collect();
                (name, package)
            })
            .collect();

        let dropped = interned.len() - symbols.len();
        if dropped > 0 {
            debug!(dropped, "classes left only by replaced records dropped");
        }
        DependencyIndex::from_parts(symbols, packages)
    }
}

/// Build an index from a sequence of extraction results, in order.
pub fn build<I>(records: I) -> DependencyIndex
where
    I: IntoIterator<Item = std::result::Result<ExtractionRecord, ExtractError>>,
{
    let mut builder = IndexBuilder::new();
    for record in records {
        builder.push(record);
    }
    builder.finish()
}

/// Outcome of a directory build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub files_scanned: usize,
    pub packages: usize,
    pub skipped: usize,
    pub conflicts: usize,
}

impl std::fmt::Display for BuildReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scanned {} files: {} packages indexed, {} skipped, {} duplicate classes",
            self.files_scanned, self.packages, self.skipped, self.conflicts
        )
    }
}

/// Enumerate the inputs `source` accepts under `root`, sorted by path.
pub fn collect_inputs<S: RecordSource + ?Sized>(root: &Path, source: &S) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )
        .into());
    }

    let mut files: Vec<PathBuf> = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter(|entry| source.accepts(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Build an index from every input under `root`.
///
/// Extraction runs on the rayon pool `batch_size` files at a time; the merge
/// into the builder is serial and follows sorted path order.
pub fn build_index<S: RecordSource + ?Sized>(
    root: &Path,
    source: &S,
    batch_size: usize,
) -> Result<(DependencyIndex, BuildReport)> {
    let files = collect_inputs(root, source)?;
    info!(root = %root.display(), files = files.len(), "building dependency index");

    let mut builder = IndexBuilder::new();
    for batch in files.chunks(batch_size.max(1)) {
        let records: Vec<_> = batch.par_iter().map(|path| source.extract(path)).collect();
        for record in records {
            builder.push(record);
        }
    }

    let skipped = builder.skipped();
    let index = builder.finish();
    let report = BuildReport {
        files_scanned: files.len(),
        packages: index.len(),
        skipped,
        conflicts: index.conflicts(),
    };
    info!(
        packages = report.packages,
        skipped = report.skipped,
        conflicts = report.conflicts,
        "index built"
    );
    Ok((index, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory source keyed by file name; counts extraction calls.
    struct FakeSource {
        records: HashMap<String, std::result::Result<ExtractionRecord, String>>,
        calls: Mutex<usize>,
    }

    impl FakeSource {
        fn new(entries: Vec<(&str, std::result::Result<ExtractionRecord, String>)>) -> Self {
            Self {
                records: entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
                calls: Mutex::new(0),
            }
        }
    }

    impl RecordSource for FakeSource {
        fn accepts(&self, path: &Path) -> bool {
            path.extension().is_some_and(|e| e == "rec")
        }

        fn extract(&self, path: &Path) -> std::result::Result<ExtractionRecord, ExtractError> {
            *self.calls.lock().unwrap() += 1;
            let key = path.file_name().unwrap().to_string_lossy().to_string();
            match self.records.get(&key) {
                Some(Ok(r)) => Ok(r.clone()),
                Some(Err(reason)) => Err(ExtractError::UnreadableArchive {
                    path: path.to_path_buf(),
                    reason: reason.clone(),
                }),
                None => Err(ExtractError::UnreadableArchive {
                    path: path.to_path_buf(),
                    reason: "unknown".to_string(),
                }),
            }
        }
    }

    fn record(name: &str, provides: &[&str], requires: &[&str]) -> ExtractionRecord {
        ExtractionRecord::new(name, provides.iter().copied(), requires.iter().copied())
    }

    #[test]
    fn test_build_normalizes_symbols() {
        let index = build(vec![Ok(record(
            "p",
            &["org/p/Main", "[Lorg/p/Main;"],
            &["Ljava/lang/Object;", "[I", "int"],
        ))]);
        let p = index.package("p").unwrap();
        assert_eq!(p.provides.len(), 1);
        assert_eq!(p.requires.len(), 1);
        assert!(index.symbols().get("org.p.Main").is_some());
        assert!(index.symbols().get("java.lang.Object").is_some());
    }

    #[test]
    fn test_build_skips_failed_records() {
        let mut builder = IndexBuilder::new();
        builder.push(Ok(record("good", &["a.A"], &[])));
        builder.push(Err(ExtractError::MalformedClassFile {
            path: PathBuf::from("bad.rpm"),
            entry: "X.class".to_string(),
        }));
        assert_eq!(builder.skipped(), 1);
        let index = builder.finish();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_rebuilt_name_replaces_contents_keeps_position() {
        let index = build(vec![
            Ok(record("first", &["a.A"], &[])),
            Ok(record("second", &["b.B"], &[])),
            Ok(record("first", &["c.C"], &[])),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.package_id("first").unwrap().0, 0);
        let first = index.package("first").unwrap();
        let c = index.symbols().get("c.C").unwrap();
        assert_eq!(first.provides.iter().copied().collect::<Vec<_>>(), vec![c]);
        // a.A is gone from the symbol table, not just unowned.
        assert!(index.symbols().get("a.A").is_none());
        assert_eq!(index.symbols().len(), 2);
        assert_eq!(index.provided_count(), 2);
    }

    #[test]
    fn test_build_index_sorted_order_decides_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.rec", "a.rec", "c.rec", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let source = FakeSource::new(vec![
            ("a.rec", Ok(record("alpha", &["dup.Cls"], &[]))),
            ("b.rec", Ok(record("beta", &["dup.Cls"], &["dup.Cls"]))),
            ("c.rec", Err("corrupt cpio".to_string())),
        ]);

        // Batch size 1 and a large batch must agree.
        for batch in [1, 64] {
            let (index, report) = build_index(dir.path(), &source, batch).unwrap();
            assert_eq!(report.files_scanned, 3);
            assert_eq!(report.packages, 2);
            assert_eq!(report.skipped, 1);
            assert_eq!(report.conflicts, 1);
            let sym = index.symbols().get("dup.Cls").unwrap();
            assert_eq!(index.provider(sym), index.package_id("alpha"));
        }
        assert_eq!(*source.calls.lock().unwrap(), 6);
    }

    #[test]
    fn test_build_index_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource::new(vec![]);
        assert!(build_index(&dir.path().join("missing"), &source, 4).is_err());
    }

    #[test]
    fn test_report_display() {
        let report = BuildReport {
            files_scanned: 3,
            packages: 2,
            skipped: 1,
            conflicts: 0,
        };
        assert_eq!(
            report.to_string(),
            "Scanned 3 files: 2 packages indexed, 1 skipped, 0 duplicate classes"
        );
    }
}
