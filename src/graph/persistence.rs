//! Binary store for the dependency index.
//!
//! Layout:
//!
//! ```text
//! magic    8 bytes  "JDEPIDX\0"
//! version  u32 LE
//! body     bincode (varint ints): string table, then one record per package
//!          { name, provided symbol ids, required symbol ids }
//! ```
//!
//! Class names are written once in the string table and referenced by id.
//! The table is ordered by first use walking packages in index order, and id
//! lists are sorted, so the same index always serializes to the same bytes.
//! The provider index is not stored; loading replays the builder's policy.

use bincode::Options;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::index::DependencyIndex;
use super::types::{Package, SymbolId, SymbolTable};
use crate::error::{CorruptIndex, Result};

pub const MAGIC: [u8; 8] = *b"JDEPIDX\0";
pub const VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + 4;

#[derive(Debug, Serialize, Deserialize)]
struct StoreBody {
    symbols: Vec<String>,
    packages: Vec<StoredPackage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPackage {
    name: String,
    provides: Vec<u32>,
    requires: Vec<u32>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .reject_trailing_bytes()
}

/// Serialize `index` into `sink`.
pub fn write<W: Write>(index: &DependencyIndex, mut sink: W) -> Result<()> {
    let body = to_body(index);
    sink.write_all(&MAGIC)?;
    sink.write_all(&VERSION.to_le_bytes())?;
    codec()
        .serialize_into(&mut sink, &body)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(())
}

/// Deserialize an index. Any defect rejects the whole store.
pub fn read<R: Read>(mut source: R) -> std::result::Result<DependencyIndex, CorruptIndex> {
    let mut bytes = Vec::new();
    source
        .read_to_end(&mut bytes)
        .map_err(CorruptIndex::Unreadable)?;
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> std::result::Result<DependencyIndex, CorruptIndex> {
    if bytes.len() < MAGIC.len() {
        return Err(if MAGIC.starts_with(bytes) {
            CorruptIndex::Truncated
        } else {
            CorruptIndex::BadMagic
        });
    }
    if bytes[..MAGIC.len()] != MAGIC {
        return Err(CorruptIndex::BadMagic);
    }
    if bytes.len() < HEADER_LEN {
        return Err(CorruptIndex::Truncated);
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != VERSION {
        return Err(CorruptIndex::UnsupportedVersion {
            found: version,
            expected: VERSION,
        });
    }

    let body: StoreBody = codec()
        .deserialize(&bytes[HEADER_LEN..])
        .map_err(|err| match *err {
            bincode::ErrorKind::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                CorruptIndex::Truncated
            }
            ref other => CorruptIndex::Malformed(other.to_string()),
        })?;

    from_body(body)
}

fn to_body(index: &DependencyIndex) -> StoreBody {
    let mut remap: HashMap<SymbolId, u32> = HashMap::new();
    let mut symbols: Vec<String> = Vec::new();
    let mut packages = Vec::with_capacity(index.len());

    for (_, package) in index.packages() {
        let mut ids = |set: &std::collections::BTreeSet<SymbolId>| -> Vec<u32> {
            let mut out: Vec<u32> = set
                .iter()
                .map(|&sym| {
                    *remap.entry(sym).or_insert_with(|| {
                        symbols.push(index.symbol_name(sym).to_string());
                        (symbols.len() - 1) as u32
                    })
                })
                .collect();
            out.sort_unstable();
            out
        };
        let provides = ids(&package.provides);
        let requires = ids(&package.requires);
        packages.push(StoredPackage {
            name: package.name.clone(),
            provides,
            requires,
        });
    }

    StoreBody { symbols, packages }
}

fn from_body(body: StoreBody) -> std::result::Result<DependencyIndex, CorruptIndex> {
    let mut table = SymbolTable::new();
    for (i, name) in body.symbols.iter().enumerate() {
        if table.intern(name).0 as usize != i {
            return Err(CorruptIndex::Malformed(format!(
                "duplicate string table entry {:?}",
                name
            )));
        }
    }

    let count = table.len();
    let lookup = |id: u32, package: &str| {
        if (id as usize) < count {
            Ok(SymbolId(id))
        } else {
            Err(CorruptIndex::Malformed(format!(
                "package {} references symbol id {} outside table of {}",
                package, id, count
            )))
        }
    };

    let mut packages: IndexMap<String, Package> = IndexMap::with_capacity(body.packages.len());
    for stored in body.packages {
        let mut package = Package::new(stored.name.clone());
        for id in stored.provides {
            package.provides.insert(lookup(id, &stored.name)?);
        }
        for id in stored.requires {
            package.requires.insert(lookup(id, &stored.name)?);
        }
        if packages.insert(stored.name.clone(), package).is_some() {
            return Err(CorruptIndex::Malformed(format!(
                "duplicate package record {}",
                stored.name
            )));
        }
    }

    debug!(packages = packages.len(), symbols = count, "index store decoded");
    Ok(DependencyIndex::from_parts(table, packages))
}

impl DependencyIndex {
    /// Persist the index at `path`.
    ///
    /// The store is written to a temporary file in the same directory and
    /// renamed into place, so readers see either the old or the new store.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            write(self, &mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;

        info!(path = %path.display(), packages = self.len(), "index saved");
        Ok(())
    }

    /// Load a store written by [`DependencyIndex::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(CorruptIndex::Unreadable)?;
        let index = read(BufReader::new(file))?;
        info!(path = %path.display(), packages = index.len(), "index loaded");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DepsError;
    use crate::graph::builder::build;
    use crate::graph::types::ExtractionRecord;

    fn sample() -> DependencyIndex {
        build(vec![
            Ok(ExtractionRecord::new("p1", ["a.B"], Vec::<String>::new())),
            Ok(ExtractionRecord::new("p2", ["c.D", "a.B"], ["a.B", "x.Y"])),
        ])
    }

    fn encode(index: &DependencyIndex) -> Vec<u8> {
        let mut buf = Vec::new();
        write(index, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_header() {
        let bytes = encode(&sample());
        assert_eq!(&bytes[..8], b"JDEPIDX\0");
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
    }

    #[test]
    fn test_reload_keeps_conflict_winner() {
        let index = sample();
        let loaded = read(encode(&index).as_slice()).unwrap();
        let sym = loaded.symbols().get("a.B").unwrap();
        assert_eq!(loaded.provider(sym), loaded.package_id("p1"));
        assert_eq!(loaded.conflicts(), 1);
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_string_table_written_once() {
        let index = sample();
        let bytes = encode(&index);
        let needle = b"a.B";
        let hits = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_reencode_is_stable() {
        let first = encode(&sample());
        let second = encode(&read(first.as_slice()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn test_orphaned_symbols_not_written() {
        let index = build(vec![
            Ok(ExtractionRecord::new("p", ["old.Gone"], Vec::<String>::new())),
            Ok(ExtractionRecord::new("p", ["new.Here"], Vec::<String>::new())),
        ]);
        let loaded = read(encode(&index).as_slice()).unwrap();
        assert_eq!(loaded.symbols().len(), 1);
        assert!(loaded.symbols().get("old.Gone").is_none());
    }

    #[test]
    fn test_empty_index_round_trips() {
        let loaded = read(encode(&DependencyIndex::new()).as_slice()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample());
        bytes[0] = b'X';
        assert!(matches!(read(bytes.as_slice()), Err(CorruptIndex::BadMagic)));
        assert!(matches!(read(&b"PK"[..]), Err(CorruptIndex::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = encode(&sample());
        bytes[8..12].copy_from_slice(&7u32.to_le_bytes());
        assert!(matches!(
            read(bytes.as_slice()),
            Err(CorruptIndex::UnsupportedVersion { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = encode(&sample());
        assert!(matches!(read(&bytes[..4]), Err(CorruptIndex::Truncated)));
        assert!(matches!(read(&bytes[..10]), Err(CorruptIndex::Truncated)));
        assert!(matches!(
            read(&bytes[..bytes.len() - 1]),
            Err(CorruptIndex::Truncated)
        ));
    }

    #[test]
    fn test_trailing_bytes_malformed() {
        let mut bytes = encode(&sample());
        bytes.push(0);
        assert!(matches!(
            read(bytes.as_slice()),
            Err(CorruptIndex::Malformed(_))
        ));
    }

    #[test]
    fn test_dangling_symbol_id_malformed() {
        let body = StoreBody {
            symbols: vec!["a.B".to_string()],
            packages: vec![StoredPackage {
                name: "p".to_string(),
                provides: vec![0],
                requires: vec![5],
            }],
        };
        assert!(matches!(from_body(body), Err(CorruptIndex::Malformed(_))));
    }

    #[test]
    fn test_duplicate_package_malformed() {
        let stored = || StoredPackage {
            name: "p".to_string(),
            provides: vec![],
            requires: vec![],
        };
        let body = StoreBody {
            symbols: vec![],
            packages: vec![stored(), stored()],
        };
        assert!(matches!(from_body(body), Err(CorruptIndex::Malformed(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("packages.dep");
        let index = sample();
        index.save(&path).unwrap();

        let loaded = DependencyIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        // Only the store itself is left behind.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_load_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = DependencyIndex::load(&dir.path().join("none.dep")).unwrap_err();
        assert!(matches!(
            err,
            DepsError::CorruptIndex(CorruptIndex::Unreadable(_))
        ));
    }
}
