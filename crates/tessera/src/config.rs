//! YAML configuration for caches and sources.
//!
//! ```yaml
//! case_sensitive: false
//! strict_undefined: true
//! std_functions: true
//! source:
//!   kind: directory
//!   root: ./templates
//!   extensions: [html, gohtml]
//! ```
//!
//! Other source kinds:
//!
//! ```yaml
//! source:
//!   kind: pattern
//!   root: ./templates
//!   pattern: '^(pages|partials)/.*\.html$'
//! ---
//! source:
//!   kind: files
//!   root: ./templates
//!   paths: [layout.html, Page.html]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::functions::Functions;
use crate::source::{DirSource, FileListSource, Source};
use crate::template::Unit;

/// Cache settings loadable from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Match keys exactly instead of case-folding them.
    pub case_sensitive: bool,
    /// Fail rendering on undefined variables.
    pub strict_undefined: bool,
    /// Register [`Functions::std`].
    pub std_functions: bool,
    /// Where templates are loaded from.
    pub source: Option<SourceConfig>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            strict_undefined: false,
            std_functions: true,
            source: None,
        }
    }
}

/// A template source described in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SourceConfig {
    /// A directory tree; every file when `extensions` is empty.
    Directory {
        root: PathBuf,
        #[serde(default)]
        extensions: Vec<String>,
    },
    /// A directory tree filtered by a regular expression.
    Pattern { root: PathBuf, pattern: String },
    /// An explicit list of root-relative files.
    Files { root: PathBuf, paths: Vec<PathBuf> },
}

impl CacheConfig {
    /// Parses a configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Self::from_yaml(&yaml)
    }

    /// Applies these settings to a cache.
    pub fn apply<U: Unit>(&self, cache: &mut Cache<U>) {
        cache
            .case_sensitive(self.case_sensitive)
            .strict_undefined(self.strict_undefined);
        if self.std_functions {
            cache.functions(Functions::std());
        }
    }

    /// Creates a cache configured with these settings.
    pub fn build<U: Unit>(&self) -> Cache<U> {
        let mut cache = Cache::new();
        self.apply(&mut cache);
        cache
    }

    /// Creates a configured cache and loads it from the configured source.
    ///
    /// A configuration without a source yields an empty cache.
    pub fn load<U: Unit>(&self) -> Result<Cache<U>> {
        let cache = self.build();
        if let Some(source) = &self.source {
            cache.load(source.build()?.as_ref())?;
        }
        Ok(cache)
    }
}

impl SourceConfig {
    /// Builds the described source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a pattern that does not compile.
    pub fn build(&self) -> Result<Box<dyn Source>> {
        Ok(match self {
            SourceConfig::Directory { root, extensions } if extensions.is_empty() => {
                Box::new(DirSource::new(root))
            }
            SourceConfig::Directory { root, extensions } => {
                Box::new(DirSource::new(root).match_extensions(extensions))
            }
            SourceConfig::Pattern { root, pattern } => {
                Box::new(DirSource::new(root).match_pattern(pattern)?)
            }
            SourceConfig::Files { root, paths } => {
                Box::new(FileListSource::new(root, paths.iter().cloned()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextCache;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::from_yaml("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
        assert!(config.std_functions);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_directory_source() {
        let config = CacheConfig::from_yaml(
            "case_sensitive: true\nsource:\n  kind: directory\n  root: ./t\n  extensions: [html]\n",
        )
        .unwrap();
        assert!(config.case_sensitive);
        assert_eq!(
            config.source,
            Some(SourceConfig::Directory {
                root: PathBuf::from("./t"),
                extensions: vec!["html".into()],
            })
        );
    }

    #[test]
    fn test_files_source() {
        let config = CacheConfig::from_yaml(
            "source:\n  kind: files\n  root: t\n  paths: [a.tmpl, b/c.tmpl]\n",
        )
        .unwrap();
        let source = config.source.unwrap().build().unwrap();
        let index = source.resolve().unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["a", "b/c"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            CacheConfig::from_yaml("case_sensitiv: true"),
            Err(Error::Config(_))
        ));
        assert!(CacheConfig::from_yaml("source:\n  kind: ftp\n  root: x\n").is_err());
    }

    #[test]
    fn test_bad_pattern() {
        let source = SourceConfig::Pattern {
            root: PathBuf::from("."),
            pattern: "(".into(),
        };
        assert!(matches!(source.build(), Err(Error::InvalidPattern(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("Total.tmpl"), "{{ mul(a, 3) }}").unwrap();
        fs::write(templates.join("notes.md"), "ignored").unwrap();

        let config_path = dir.path().join("tessera.yaml");
        fs::write(
            &config_path,
            format!(
                "source:\n  kind: directory\n  root: {}\n  extensions: [tmpl]\n",
                templates.display()
            ),
        )
        .unwrap();

        let config = CacheConfig::from_file(&config_path).unwrap();
        let cache: TextCache = config.load().unwrap();
        assert_eq!(cache.keys(), vec!["total"]);
        assert_eq!(cache.builder("Total").with("a", 4).exec_str().unwrap(), "12");
    }

    #[test]
    fn test_missing_config_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            CacheConfig::from_file(dir.path().join("nope.yaml")),
            Err(Error::Source { .. })
        ));
    }
}
