//! Query API: owned, serializable answers for the CLI and scripts.
//!
//! Every response carries `found` so callers can tell "unknown package" or
//! "no dependency" apart from a found-but-empty answer without parsing text.
//! `Display` renders the plain-text form, `serde` the JSON form.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::io::BufRead;

use crate::error::Result;
use crate::graph::{IndexStats, QueryEngine, Why};
use crate::source::NameNormalizer;

/// Shared behaviour of all query responses.
pub trait QueryResponse: Serialize + fmt::Display {
    /// False for NotFound and NoDependency answers.
    fn found(&self) -> bool;
}

fn owned(items: Vec<&str>) -> Vec<String> {
    items.into_iter().map(str::to_string).collect()
}

// ─── provides ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ProvidesResponse {
    pub package: String,
    pub found: bool,
    pub count: usize,
    pub classes: Vec<String>,
}

pub fn query_provides(engine: &QueryEngine<'_>, package: &str) -> ProvidesResponse {
    let classes = engine.provides(package).map(owned);
    ProvidesResponse {
        package: package.to_string(),
        found: classes.is_some(),
        count: classes.as_ref().map_or(0, Vec::len),
        classes: classes.unwrap_or_default(),
    }
}

impl fmt::Display for ProvidesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.found {
            return writeln!(f, "package {} not found", self.package);
        }
        for class in &self.classes {
            writeln!(f, "{}", class)?;
        }
        Ok(())
    }
}

impl QueryResponse for ProvidesResponse {
    fn found(&self) -> bool {
        self.found
    }
}

// ─── requires ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PackageRequirements {
    pub package: String,
    pub found: bool,
    pub packages: Vec<String>,
    /// Referenced classes no indexed package provides.
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequiresResponse {
    pub found: bool,
    pub results: Vec<PackageRequirements>,
}

pub fn query_requires(engine: &QueryEngine<'_>, packages: &[&str]) -> RequiresResponse {
    let results: Vec<PackageRequirements> = engine
        .requires_all(packages)
        .into_iter()
        .map(|(package, req)| match req {
            Some(req) => PackageRequirements {
                package: package.to_string(),
                found: true,
                packages: owned(req.packages),
                unresolved: owned(req.unresolved),
            },
            None => PackageRequirements {
                package: package.to_string(),
                found: false,
                packages: Vec::new(),
                unresolved: Vec::new(),
            },
        })
        .collect();
    RequiresResponse {
        found: results.iter().all(|r| r.found),
        results,
    }
}

impl fmt::Display for RequiresResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            if !result.found {
                writeln!(f, "{}: package not found", result.package)?;
                continue;
            }
            writeln!(f, "{}:", result.package)?;
            for package in &result.packages {
                writeln!(f, "  {}", package)?;
            }
            if !result.unresolved.is_empty() {
                writeln!(f, "  unresolved classes:")?;
                for class in &result.unresolved {
                    writeln!(f, "    {}", class)?;
                }
            }
        }
        Ok(())
    }
}

impl QueryResponse for RequiresResponse {
    fn found(&self) -> bool {
        self.found
    }
}

// ─── what-provides ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WhatProvidesResponse {
    pub class: String,
    pub found: bool,
    pub package: Option<String>,
}

pub fn query_what_provides(engine: &QueryEngine<'_>, class: &str) -> WhatProvidesResponse {
    let package = engine.what_provides(class).map(str::to_string);
    WhatProvidesResponse {
        class: class.to_string(),
        found: package.is_some(),
        package,
    }
}

impl fmt::Display for WhatProvidesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => writeln!(f, "{}", package),
            None => writeln!(f, "class {} is not provided by any indexed package", self.class),
        }
    }
}

impl QueryResponse for WhatProvidesResponse {
    fn found(&self) -> bool {
        self.found
    }
}

// ─── what-requires ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WhatRequiresResponse {
    pub package: String,
    pub found: bool,
    pub count: usize,
    pub packages: Vec<String>,
}

pub fn query_what_requires(engine: &QueryEngine<'_>, package: &str) -> WhatRequiresResponse {
    let packages = engine.what_requires(package).map(owned);
    WhatRequiresResponse {
        package: package.to_string(),
        found: packages.is_some(),
        count: packages.as_ref().map_or(0, Vec::len),
        packages: packages.unwrap_or_default(),
    }
}

impl fmt::Display for WhatRequiresResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.found {
            return writeln!(f, "package {} not found", self.package);
        }
        for package in &self.packages {
            writeln!(f, "{}", package)?;
        }
        Ok(())
    }
}

impl QueryResponse for WhatRequiresResponse {
    fn found(&self) -> bool {
        self.found
    }
}

// ─── why ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HopInfo {
    pub from: String,
    pub to: String,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhyResponse {
    pub from: String,
    pub to: String,
    /// Both packages are indexed.
    pub found: bool,
    /// `from` directly requires `to`.
    pub dependency: bool,
    /// Evidence for the direct edge.
    pub classes: Vec<String>,
    /// Shortest chain when a transitive explanation was asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<HopInfo>>,
    #[serde(skip)]
    missing: Option<String>,
}

pub fn query_why(engine: &QueryEngine<'_>, from: &str, to: &str, transitive: bool) -> WhyResponse {
    let index = engine.index();
    let missing = [from, to]
        .iter()
        .find(|name| index.package(name).is_none())
        .map(|name| name.to_string());

    let answer = engine.why(from, to);
    let (dependency, classes) = match answer {
        Some(Why::Evidence(classes)) => (true, owned(classes)),
        Some(Why::NoDependency) | None => (false, Vec::new()),
    };

    let path = if transitive && missing.is_none() {
        Some(
            engine
                .why_path(from, to)
                .unwrap_or_default()
                .into_iter()
                .map(|hop| HopInfo {
                    from: hop.from.to_string(),
                    to: hop.to.to_string(),
                    classes: owned(hop.evidence),
                })
                .collect(),
        )
    } else {
        None
    };

    WhyResponse {
        from: from.to_string(),
        to: to.to_string(),
        found: missing.is_none(),
        dependency,
        classes,
        path,
        missing,
    }
}

impl WhyResponse {
    fn has_path(&self) -> bool {
        self.path.as_ref().is_some_and(|p| !p.is_empty())
    }
}

impl fmt::Display for WhyResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.missing {
            return writeln!(f, "package {} not found", name);
        }
        if self.dependency {
            writeln!(f, "{} requires {} because of:", self.from, self.to)?;
            for class in &self.classes {
                writeln!(f, "  {}", class)?;
            }
        } else {
            writeln!(f, "{} does not directly require {}", self.from, self.to)?;
        }
        match &self.path {
            Some(path) if !path.is_empty() && !(self.dependency && path.len() == 1) => {
                writeln!(f, "dependency chain:")?;
                for hop in path {
                    writeln!(f, "  {} -> {}: {}", hop.from, hop.to, hop.classes.join(", "))?;
                }
            }
            Some(path) if path.is_empty() => {
                writeln!(f, "{} does not transitively require {}", self.from, self.to)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl QueryResponse for WhyResponse {
    fn found(&self) -> bool {
        self.found && (self.dependency || self.has_path())
    }
}

// ─── diff ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DiffResponse {
    pub package: String,
    pub found: bool,
    /// Declared but not observed in bytecode.
    pub extra: Vec<String>,
    /// Observed in bytecode but not declared.
    pub missing: Vec<String>,
}

pub fn query_diff(
    engine: &QueryEngine<'_>,
    declared: &BTreeSet<String>,
    package: &str,
) -> DiffResponse {
    let diff = engine.diff(declared, package);
    DiffResponse {
        package: package.to_string(),
        found: diff.is_some(),
        extra: diff.as_ref().map(|d| d.extra.clone()).unwrap_or_default(),
        missing: diff.map(|d| d.missing).unwrap_or_default(),
    }
}

impl fmt::Display for DiffResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.found {
            return writeln!(f, "package {} not found", self.package);
        }
        for package in &self.extra {
            writeln!(f, "- {}", package)?;
        }
        for package in &self.missing {
            writeln!(f, "+ {}", package)?;
        }
        Ok(())
    }
}

impl QueryResponse for DiffResponse {
    fn found(&self) -> bool {
        self.found
    }
}

/// Read a declared-requirements list: one package name per line, blank lines
/// and `#` comments ignored. Names go through the normalizer.
pub fn read_declared<R: BufRead>(reader: R, naming: &NameNormalizer) -> Result<BTreeSet<String>> {
    let mut declared = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        declared.insert(naming.declared_name(line));
    }
    Ok(declared)
}

// ─── list / stats ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub count: usize,
    pub packages: Vec<String>,
}

pub fn query_list(engine: &QueryEngine<'_>) -> ListResponse {
    let packages = owned(engine.list());
    ListResponse {
        count: packages.len(),
        packages,
    }
}

impl fmt::Display for ListResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for package in &self.packages {
            writeln!(f, "{}", package)?;
        }
        Ok(())
    }
}

impl QueryResponse for ListResponse {
    fn found(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequiredCount {
    pub package: String,
    pub dependents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub stats: IndexStats,
    pub most_required: Vec<RequiredCount>,
}

pub fn query_stats(engine: &QueryEngine<'_>, top: usize) -> StatsResponse {
    StatsResponse {
        stats: engine.stats(),
        most_required: engine
            .most_required(top)
            .into_iter()
            .map(|(package, dependents)| RequiredCount {
                package: package.to_string(),
                dependents,
            })
            .collect(),
    }
}

impl fmt::Display for StatsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Packages:          {}", self.stats.packages)?;
        writeln!(f, "Classes:           {}", self.stats.symbols)?;
        writeln!(f, "Provided classes:  {}", self.stats.provided_classes)?;
        writeln!(f, "Duplicate classes: {}", self.stats.conflicts)?;
        writeln!(f, "Dependencies:      {}", self.stats.edges)?;
        if !self.most_required.is_empty() {
            writeln!(f)?;
            writeln!(f, "Most required:")?;
            for entry in &self.most_required {
                writeln!(f, "  {:>6}  {}", entry.dependents, entry.package)?;
            }
        }
        Ok(())
    }
}

impl QueryResponse for StatsResponse {
    fn found(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{build, DependencyIndex, ExtractionRecord};

    fn sample() -> DependencyIndex {
        build(vec![
            Ok(ExtractionRecord::new("P1", ["a.B"], Vec::<String>::new())),
            Ok(ExtractionRecord::new("P2", ["c.D"], ["a.B", "x.Y"])),
            Ok(ExtractionRecord::new("P3", ["e.F"], ["c.D"])),
        ])
    }

    #[test]
    fn test_provides_response() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_provides(&engine, "P1");
        assert!(response.found());
        assert_eq!(response.count, 1);
        assert_eq!(response.to_string(), "a.B\n");

        let response = query_provides(&engine, "ghost");
        assert!(!response.found());
        assert_eq!(response.to_string(), "package ghost not found\n");
    }

    #[test]
    fn test_requires_response_text() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_requires(&engine, &["P2", "ghost"]);
        assert!(!response.found());
        assert_eq!(
            response.to_string(),
            "P2:\n  P1\n  unresolved classes:\n    x.Y\nghost: package not found\n"
        );
    }

    #[test]
    fn test_requires_response_json() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_requires(&engine, &["P2"]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["found"], true);
        assert_eq!(json["results"][0]["packages"][0], "P1");
        assert_eq!(json["results"][0]["unresolved"][0], "x.Y");
    }

    #[test]
    fn test_what_provides_response() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        assert_eq!(query_what_provides(&engine, "a/B").to_string(), "P1\n");
        let missing = query_what_provides(&engine, "x.Y");
        assert!(!missing.found());
        assert_eq!(missing.package, None);
    }

    #[test]
    fn test_what_requires_found_but_empty() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_what_requires(&engine, "P3");
        assert!(response.found());
        assert_eq!(response.count, 0);
        assert_eq!(response.to_string(), "");
    }

    #[test]
    fn test_why_response() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_why(&engine, "P2", "P1", false);
        assert!(response.found());
        assert_eq!(response.to_string(), "P2 requires P1 because of:\n  a.B\n");

        let response = query_why(&engine, "P1", "P2", false);
        assert!(!response.found());
        assert!(response.found);
        assert_eq!(response.to_string(), "P1 does not directly require P2\n");

        let response = query_why(&engine, "P1", "ghost", false);
        assert!(!response.found);
        assert_eq!(response.to_string(), "package ghost not found\n");
    }

    #[test]
    fn test_why_transitive_response() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let response = query_why(&engine, "P3", "P1", true);
        assert!(!response.dependency);
        assert!(response.found());
        assert_eq!(
            response.to_string(),
            "P3 does not directly require P1\ndependency chain:\n  P3 -> P2: c.D\n  P2 -> P1: a.B\n"
        );

        let response = query_why(&engine, "P1", "P3", true);
        assert!(!response.found());
        assert!(response.to_string().ends_with("P1 does not transitively require P3\n"));
    }

    #[test]
    fn test_why_json_omits_path_unless_asked() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let json = serde_json::to_value(query_why(&engine, "P2", "P1", false)).unwrap();
        assert!(json.get("path").is_none());
        assert!(json.get("missing").is_none());
        assert_eq!(json["classes"][0], "a.B");
    }

    #[test]
    fn test_diff_response() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        let declared: BTreeSet<String> = ["P1", "P3"].iter().map(|s| s.to_string()).collect();
        let response = query_diff(&engine, &declared, "P2");
        assert!(response.found());
        assert_eq!(response.extra, vec!["P3".to_string()]);
        assert!(response.missing.is_empty());
        assert_eq!(response.to_string(), "- P3\n");
    }

    #[test]
    fn test_read_declared_skips_comments() {
        let naming = NameNormalizer::new(&crate::config::NamingConfig::default()).unwrap();
        let text = "# runtime deps\nP1\n\n  junit-4.11-3.fc20.noarch.rpm  \nP3 # optional\n";
        let declared = read_declared(text.as_bytes(), &naming).unwrap();
        let names: Vec<&str> = declared.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["P1", "P3", "junit"]);
    }

    #[test]
    fn test_list_and_stats_responses() {
        let index = sample();
        let engine = QueryEngine::new(&index);
        assert_eq!(query_list(&engine).to_string(), "P1\nP2\nP3\n");
        let stats = query_stats(&engine, 5);
        assert_eq!(stats.stats.packages, 3);
        assert_eq!(stats.most_required.len(), 2);
        assert!(stats.to_string().starts_with("Packages:          3\n"));
    }
}
