//! Template sources.
//!
//! A [`Source`] tells the cache which templates exist and how to read them.
//! Loading happens in two phases:
//!
//! 1. Enumeration: [`Source::resolve`] builds a [`SourceIndex`] mapping each
//!    logical name (for example `"admin/Dashboard"`) to a [`Locator`].
//! 2. Reading: [`Source::read`] returns raw bytes for a locator, on demand,
//!    while the dependency graph is resolved.
//!
//! Three sources are provided:
//!
//! | Source | Enumerates |
//! |--------|------------|
//! | [`DirSource`] | A directory tree, filtered by extension or regex |
//! | [`FileListSource`] | An explicit ordered list of root-relative paths |
//! | [`MemorySource`] | An ordered in-memory name to bytes table |
//!
//! For file-backed sources the logical name is the root-relative path with
//! `/` separators and the final extension stripped: `partials/nav.html`
//! becomes `partials/nav`.

mod dir;
mod files;
mod memory;

use std::collections::HashMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub use dir::{DirSource, Filter};
pub use files::FileListSource;
pub use memory::MemorySource;

use crate::error::{Error, Result};

/// Where the raw bytes of one template live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A file on disk.
    File(PathBuf),
    /// An entry of an in-memory source, addressed by its name.
    Memory(String),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::File(path) => write!(f, "{}", path.display()),
            Locator::Memory(name) => write!(f, "memory:{}", name),
        }
    }
}

/// Provides the set of available templates and their contents.
pub trait Source: Send + Sync {
    /// Enumerates the available templates.
    ///
    /// # Errors
    ///
    /// Fails if enumeration fails or two locators map to the same logical name.
    fn resolve(&self) -> Result<SourceIndex>;

    /// Reads the raw bytes behind a locator produced by [`resolve`](Self::resolve)
    /// or [`find`](Self::find).
    fn read(&self, locator: &Locator) -> Result<Vec<u8>>;

    /// Locates a dependency that enumeration did not list.
    ///
    /// Only consulted for names referenced by directives, never for deciding
    /// which templates are exported. Finds nothing by default.
    fn find(&self, _name: &str) -> Result<Option<Locator>> {
        Ok(None)
    }
}

/// Logical template names in enumeration order, with their locators.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    names: Vec<String>,
    locators: HashMap<String, Locator>,
}

impl SourceIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a logical name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Collision`] if the name is already registered.
    pub fn insert(&mut self, name: impl Into<String>, locator: Locator) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.locators.get(&name) {
            return Err(Error::Collision {
                name,
                existing: existing.clone(),
                conflicting: locator,
            });
        }
        self.names.push(name.clone());
        self.locators.insert(name, locator);
        Ok(())
    }

    /// Returns the locator registered for a logical name.
    pub fn locator(&self, name: &str) -> Option<&Locator> {
        self.locators.get(name)
    }

    /// Returns true if the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.locators.contains_key(name)
    }

    /// Iterates over logical names in enumeration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Derives a logical name from a root-relative path.
///
/// Components are joined with `/` and the final extension is removed.
/// Returns `None` for paths that escape the root or have no file name.
pub fn logical_name(relative: &Path) -> Option<String> {
    let stripped = relative.with_extension("");
    let mut parts = Vec::new();
    for component in stripped.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_name_strips_extension() {
        assert_eq!(
            logical_name(Path::new("page.html")).as_deref(),
            Some("page")
        );
        assert_eq!(
            logical_name(Path::new("partials/nav.tmpl")).as_deref(),
            Some("partials/nav")
        );
    }

    #[test]
    fn test_logical_name_strips_only_final_extension() {
        assert_eq!(
            logical_name(Path::new("mail/welcome.txt.tmpl")).as_deref(),
            Some("mail/welcome.txt")
        );
    }

    #[test]
    fn test_logical_name_without_extension() {
        assert_eq!(logical_name(Path::new("./README")).as_deref(), Some("README"));
    }

    #[test]
    fn test_logical_name_rejects_escaping_paths() {
        assert_eq!(logical_name(Path::new("../secret.tmpl")), None);
        assert_eq!(logical_name(Path::new("/etc/passwd")), None);
        assert_eq!(logical_name(Path::new("")), None);
    }

    #[test]
    fn test_index_preserves_order() {
        let mut index = SourceIndex::new();
        index.insert("b", Locator::Memory("b".into())).unwrap();
        index.insert("a", Locator::Memory("a".into())).unwrap();
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(index.len(), 2);
        assert!(index.contains("a"));
        assert!(!index.contains("c"));
    }

    #[test]
    fn test_index_rejects_duplicate_names() {
        let mut index = SourceIndex::new();
        index
            .insert("page", Locator::File(PathBuf::from("t/page.tmpl")))
            .unwrap();
        let err = index
            .insert("page", Locator::File(PathBuf::from("t/page.html")))
            .unwrap_err();
        match err {
            Error::Collision {
                name,
                existing,
                conflicting,
            } => {
                assert_eq!(name, "page");
                assert_eq!(existing, Locator::File(PathBuf::from("t/page.tmpl")));
                assert_eq!(conflicting, Locator::File(PathBuf::from("t/page.html")));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::Memory("nav".into()).to_string(), "memory:nav");
        assert_eq!(
            Locator::File(PathBuf::from("t/nav.html")).to_string(),
            "t/nav.html"
        );
    }
}
