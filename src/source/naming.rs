//! Package names derived from archive file names.

use regex::Regex;

use crate::config::NamingConfig;
use crate::error::{DepsError, Result};

/// Maps archive file names to package names.
///
/// `foo-1.2-3.fc20.noarch.rpm` becomes `foo`; `bar.jar` becomes `@jar@bar.jar`
/// with the default configuration.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    rpm_suffix: Regex,
    jar_prefix: String,
}

impl NameNormalizer {
    pub fn new(config: &NamingConfig) -> Result<Self> {
        let rpm_suffix = Regex::new(&config.rpm_suffix).map_err(|e| {
            DepsError::Config(format!("invalid naming.rpm_suffix pattern: {}", e))
        })?;
        Ok(Self {
            rpm_suffix,
            jar_prefix: config.jar_prefix.clone(),
        })
    }

    /// Package name for an archive file name.
    pub fn package_name(&self, file_name: &str) -> String {
        if let Some(stem) = file_name.strip_suffix(".rpm") {
            self.rpm_suffix.replace(stem, "").into_owned()
        } else if is_bare_archive(file_name) {
            format!("{}{}", self.jar_prefix, file_name)
        } else {
            file_name.to_string()
        }
    }

    /// Normalize a name from a declared-requirements list. Plain package names
    /// pass through; RPM file names are stripped like build inputs.
    pub fn declared_name(&self, name: &str) -> String {
        let name = name.trim();
        match name.strip_suffix(".rpm") {
            Some(stem) => self.rpm_suffix.replace(stem, "").into_owned(),
            None => name.to_string(),
        }
    }
}

fn is_bare_archive(file_name: &str) -> bool {
    [".jar", ".war", ".ear"]
        .iter()
        .any(|ext| file_name.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> NameNormalizer {
        NameNormalizer::new(&NamingConfig::default()).unwrap()
    }

    #[test]
    fn test_rpm_nevra_stripped() {
        let n = normalizer();
        assert_eq!(n.package_name("foo-1.2-3.fc20.noarch.rpm"), "foo");
        assert_eq!(
            n.package_name("apache-commons-lang-2.6-12.fc20.noarch.rpm"),
            "apache-commons-lang"
        );
    }

    #[test]
    fn test_bare_archive_gets_prefix() {
        let n = normalizer();
        assert_eq!(n.package_name("bcel.jar"), "@jar@bcel.jar");
    }

    #[test]
    fn test_other_names_untouched() {
        let n = normalizer();
        assert_eq!(n.package_name("mypkg"), "mypkg");
    }

    #[test]
    fn test_declared_names() {
        let n = normalizer();
        assert_eq!(n.declared_name(" junit "), "junit");
        assert_eq!(n.declared_name("junit-4.11-8.fc20.noarch.rpm"), "junit");
    }

    #[test]
    fn test_custom_pattern() {
        let config = NamingConfig {
            rpm_suffix: r"-\d.*$".to_string(),
            jar_prefix: "jar:".to_string(),
        };
        let n = NameNormalizer::new(&config).unwrap();
        assert_eq!(n.package_name("foo-bar-1.0-1.rpm"), "foo-bar");
        assert_eq!(n.package_name("x.jar"), "jar:x.jar");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = NamingConfig {
            rpm_suffix: "(".to_string(),
            ..NamingConfig::default()
        };
        assert!(matches!(
            NameNormalizer::new(&config),
            Err(DepsError::Config(_))
        ));
    }
}
