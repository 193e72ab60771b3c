//! Core types for the dependency index.
//!
//! Defines class symbols, the interned symbol table, packages, and the
//! per-package extraction records the builder consumes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

const PRIMITIVES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double", "void",
];

/// A normalized, dot-separated, fully-qualified class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassSymbol(String);

impl ClassSymbol {
    /// Normalize a class reference as found in a constant pool.
    ///
    /// Accepts dotted (`java.lang.String`), internal (`java/lang/String`) and
    /// descriptor (`Ljava/lang/String;`) forms. Array references, primitive
    /// type names, empty strings and a `;` outside the descriptor wrapper
    /// yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.contains('[') {
            return None;
        }
        let unwrapped = match raw.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
            Some(inner) => inner,
            None => raw,
        };
        if unwrapped.contains(';') {
            return None;
        }
        let name = unwrapped.replace('/', ".");
        if name.is_empty() || PRIMITIVES.contains(&name.as_str()) {
            return None;
        }
        Some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interned id of a class symbol within one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

/// Position of a package in the index enumeration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageId(pub u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Two-way mapping between class names and their interned ids.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `name`, assigning the next free id if it is new.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = SymbolId(self.names.len() as u32);
        let name: Arc<str> = Arc::from(name);
        self.names.push(Arc::clone(&name));
        self.ids.insert(name, id);
        id
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    /// The class name behind `id`. Ids always come from this table.
    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One distribution unit: an RPM or a standalone archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Classes the package contains.
    pub provides: BTreeSet<SymbolId>,
    /// Classes its bytecode references, before resolution against the index.
    pub requires: BTreeSet<SymbolId>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// What an extraction pass learned about a single package.
/// This is the raw input to the builder; names are normalized on ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub name: String,
    pub provides: BTreeSet<String>,
    pub requires: BTreeSet<String>,
}

impl ExtractionRecord {
    pub fn new<P, R, S, T>(name: impl Into<String>, provides: P, requires: R) -> Self
    where
        P: IntoIterator<Item = S>,
        R: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            provides: provides.into_iter().map(Into::into).collect(),
            requires: requires.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted() {
        assert_eq!(
            ClassSymbol::parse("java.lang.String").unwrap().as_str(),
            "java.lang.String"
        );
    }

    #[test]
    fn test_parse_internal_and_descriptor_forms() {
        assert_eq!(
            ClassSymbol::parse("org/apache/Foo$Bar").unwrap().as_str(),
            "org.apache.Foo$Bar"
        );
        assert_eq!(
            ClassSymbol::parse("Lorg/apache/Foo;").unwrap().as_str(),
            "org.apache.Foo"
        );
    }

    #[test]
    fn test_parse_rejects_arrays_and_primitives() {
        assert!(ClassSymbol::parse("[Ljava/lang/String;").is_none());
        assert!(ClassSymbol::parse("[[I").is_none());
        assert!(ClassSymbol::parse("int").is_none());
        assert!(ClassSymbol::parse("   ").is_none());
    }

    #[test]
    fn test_parse_rejects_stray_semicolons() {
        assert!(ClassSymbol::parse("a;b").is_none());
        assert!(ClassSymbol::parse("org/foo/Bar;").is_none());
        assert!(ClassSymbol::parse("La;b;").is_none());
        assert!(ClassSymbol::parse("L;").is_none());
    }

    #[test]
    fn test_parse_keeps_plain_l_names() {
        // Only a full L...; wrapper is unwrapped.
        assert_eq!(ClassSymbol::parse("Logger").unwrap().as_str(), "Logger");
    }

    #[test]
    fn test_symbol_table_interning() {
        let mut table = SymbolTable::new();
        let a = table.intern("a.B");
        let c = table.intern("c.D");
        assert_eq!(table.intern("a.B"), a);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(c), "c.D");
        assert_eq!(table.get("c.D"), Some(c));
        assert_eq!(table.get("x.Y"), None);
    }
}
