//! Build Profile Token Filtering
//!
//! Copies a build profile while substituting `${name}` and `@name@` tokens.
//! Unknown tokens are left as they are so that r.js-level placeholders
//! survive filtering.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.\-]+)\}|@([A-Za-z0-9_.\-]+)@").expect("token pattern is valid")
});

/// Prefix that routes a token to the process environment
const ENV_PREFIX: &str = "env.";

/// Filtering errors
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Copy `source` to `target`, substituting tokens on the way
pub trait TokenFilter {
    fn copy_filtered(&self, source: &Path, target: &Path) -> Result<(), FilterError>;
}

/// Substitutes tokens from a property map and, optionally, the environment
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    properties: BTreeMap<String, String>,
    use_env: bool,
}

impl PropertyFilter {
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self {
            properties,
            use_env: true,
        }
    }

    /// Enable or disable `${env.NAME}` lookups
    pub fn with_env(mut self, use_env: bool) -> Self {
        self.use_env = use_env;
        self
    }

    /// Add or replace one property
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.properties.get(name) {
            return Some(value.clone());
        }
        if self.use_env {
            if let Some(var) = name.strip_prefix(ENV_PREFIX) {
                return std::env::var(var).ok();
            }
        }
        None
    }

    /// Substitute every known token in `text`
    pub fn apply(&self, text: &str) -> String {
        TOKEN
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                self.lookup(name).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

impl TokenFilter for PropertyFilter {
    fn copy_filtered(&self, source: &Path, target: &Path) -> Result<(), FilterError> {
        let text = fs::read_to_string(source).map_err(|source_err| FilterError::Read {
            path: source.to_path_buf(),
            source: source_err,
        })?;

        fs::write(target, self.apply(&text)).map_err(|source| FilterError::Write {
            path: target.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PropertyFilter {
        let mut properties = BTreeMap::new();
        properties.insert("project.version".to_string(), "1.4.2".to_string());
        properties.insert("outDir".to_string(), "target/js".to_string());
        PropertyFilter::new(properties).with_env(false)
    }

    #[test]
    fn test_substitutes_both_delimiters() {
        let text = r#"({ dir: "${outDir}", banner: "v@project.version@" })"#;
        assert_eq!(
            filter().apply(text),
            r#"({ dir: "target/js", banner: "v1.4.2" })"#
        );
    }

    #[test]
    fn test_unknown_tokens_left_alone() {
        let text = "paths: { jquery: '${cdn.jquery}' }, mail: 'dev@example@'";
        assert_eq!(filter().apply(text), text);
    }

    #[test]
    fn test_env_lookup_requires_opt_in() {
        let path = std::env::var("PATH").unwrap_or_default();
        let with_env = PropertyFilter::default().with_env(true);
        assert_eq!(with_env.apply("${env.PATH}"), path);

        let without_env = PropertyFilter::default().with_env(false);
        assert_eq!(without_env.apply("${env.PATH}"), "${env.PATH}");
    }

    #[test]
    fn test_set_overrides_existing_property() {
        let mut filter = filter();
        filter.set("outDir", "dist");
        assert_eq!(filter.apply("${outDir}"), "dist");
    }

    #[test]
    fn test_copy_reports_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = filter()
            .copy_filtered(&dir.path().join("absent.js"), &dir.path().join("out.js"))
            .unwrap_err();
        assert!(matches!(err, FilterError::Read { .. }));
    }
}
