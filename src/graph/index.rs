//! The dependency index: packages, interned symbols and the provider index.
//!
//! The provider index is always derived, never stored: walking packages in
//! enumeration order, the first package providing a symbol owns it. The
//! builder and the store reader both go through [`DependencyIndex::from_parts`]
//! so they apply exactly the same policy.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::types::{Package, PackageId, SymbolId, SymbolTable};

/// Immutable, queryable snapshot of all indexed packages.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    symbols: SymbolTable,
    packages: IndexMap<String, Package>,
    /// Owning package of every provided symbol.
    provider_of: HashMap<SymbolId, PackageId>,
    /// Provisions that lost to an earlier package.
    conflicts: usize,
}

/// A package's requires set resolved against the provider index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Providing package -> the required symbols it owns.
    pub targets: BTreeMap<PackageId, Vec<SymbolId>>,
    /// Required symbols nobody in the corpus provides.
    pub unresolved: Vec<SymbolId>,
}

impl DependencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble an index and derive its provider index.
    pub(crate) fn from_parts(symbols: SymbolTable, packages: IndexMap<String, Package>) -> Self {
        let mut provider_of: HashMap<SymbolId, PackageId> = HashMap::new();
        let mut conflicts = 0;

        for (idx, package) in packages.values().enumerate() {
            let pid = PackageId(idx as u32);
            for &sym in &package.provides {
                match provider_of.get(&sym) {
                    None => {
                        provider_of.insert(sym, pid);
                    }
                    Some(&owner) => {
                        debug!(
                            class = symbols.name(sym),
                            owner = %packages[owner.index()].name,
                            shadowed = %package.name,
                            "class provided by more than one package"
                        );
                        conflicts += 1;
                    }
                }
            }
        }

        Self {
            symbols,
            packages,
            provider_of,
            conflicts,
        }
    }

    // ─── Packages ───────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn package_id(&self, name: &str) -> Option<PackageId> {
        self.packages.get_index_of(name).map(|i| PackageId(i as u32))
    }

    /// Package at `id`. Ids always come from this index.
    pub fn package_by_id(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    /// All packages in enumeration order.
    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> + '_ {
        self.packages
            .values()
            .enumerate()
            .map(|(i, p)| (PackageId(i as u32), p))
    }

    // ─── Symbols ────────────────────────────────────────────────

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        self.symbols.name(id)
    }

    /// The single owner of a symbol, if any package provides it.
    pub fn provider(&self, sym: SymbolId) -> Option<PackageId> {
        self.provider_of.get(&sym).copied()
    }

    /// Number of distinct symbols with an owner.
    pub fn provided_count(&self) -> usize {
        self.provider_of.len()
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts
    }

    // ─── Resolution ─────────────────────────────────────────────

    /// Resolve a package's requires set against the provider index.
    ///
    /// A symbol owned by the package itself is neither a target nor
    /// unresolved. A symbol the package merely ships a copy of still resolves
    /// to its owner.
    pub fn resolve(&self, id: PackageId) -> Resolution {
        let package = self.package_by_id(id);
        let mut resolution = Resolution::default();

        for &sym in &package.requires {
            match self.provider(sym) {
                Some(owner) if owner != id => {
                    resolution.targets.entry(owner).or_default().push(sym);
                }
                Some(_) => {}
                None => resolution.unresolved.push(sym),
            }
        }

        resolution
    }
}
