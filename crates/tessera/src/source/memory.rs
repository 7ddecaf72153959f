//! In-memory template source.

use super::{Locator, Source, SourceIndex};
use crate::error::{Error, Result};

/// Templates held in memory as an ordered name to bytes table.
///
/// ```rust
/// use tessera::{MemorySource, TextCache};
///
/// let source = MemorySource::new()
///     .add("base", "[{% block body %}{% endblock %}]")
///     .add("Page", "{{extend \"base\"}}{% block body %}{{ name }}{% endblock %}");
///
/// let cache = TextCache::new();
/// cache.load(&source).unwrap();
/// let out = cache.builder("page").with("name", "tessera").exec_str().unwrap();
/// assert_eq!(out, "[tessera]");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template. Adding the same name twice makes enumeration fail.
    pub fn add(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(name, content);
        self
    }

    /// Adds a template in place.
    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.entries.push((name.into(), content.into()));
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N, C> FromIterator<(N, C)> for MemorySource
where
    N: Into<String>,
    C: Into<Vec<u8>>,
{
    fn from_iter<T: IntoIterator<Item = (N, C)>>(iter: T) -> Self {
        let mut source = MemorySource::new();
        for (name, content) in iter {
            source.insert(name, content);
        }
        source
    }
}

impl Source for MemorySource {
    fn resolve(&self) -> Result<SourceIndex> {
        let mut index = SourceIndex::new();
        for (name, _) in &self.entries {
            index.insert(name.clone(), Locator::Memory(name.clone()))?;
        }
        Ok(index)
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        let not_found = |what: &str| {
            Error::io(
                what,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such in-memory template"),
            )
        };

        match locator {
            Locator::Memory(name) => self
                .entries
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, content)| content.clone())
                .ok_or_else(|| not_found(name.as_str())),
            Locator::File(path) => Err(not_found(path.to_string_lossy().as_ref())),
        }
    }
}
