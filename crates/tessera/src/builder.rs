//! Per-call execution handle.

use std::collections::BTreeMap;
use std::io::Write;

use minijinja::Value;
use serde::Serialize;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::template::Unit;

/// Named data values passed to a template.
pub type DataMap = BTreeMap<String, Value>;

/// Accumulates data for one execution of a cached template.
///
/// Created with [`Cache::builder`]. Nothing is looked up and no lock is taken
/// until [`exec`](Self::exec) or [`exec_str`](Self::exec_str) is called, so a
/// builder for a key that does not exist only fails when executed.
///
/// ```rust
/// use tessera::{Functions, MemorySource, TextCache};
///
/// let mut cache = TextCache::new();
/// cache.functions(Functions::std());
/// cache
///     .load(&MemorySource::new().add("Sum", "{{ a }} + {{ b }} = {{ add(a, b) }}"))
///     .unwrap();
///
/// let out = cache.builder("sum").with("a", 1).with("b", 2).exec_str().unwrap();
/// assert_eq!(out, "1 + 2 = 3");
/// ```
#[must_use = "a builder does nothing until executed"]
pub struct Builder<'a, U: Unit> {
    cache: &'a Cache<U>,
    key: String,
    data: DataMap,
}

impl<'a, U: Unit> Builder<'a, U> {
    pub(crate) fn new(cache: &'a Cache<U>, key: String) -> Self {
        Self {
            cache,
            key,
            data: DataMap::new(),
        }
    }

    /// The key this builder executes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Data bound so far.
    pub fn data(&self) -> &DataMap {
        &self.data
    }

    /// Binds one value, available in the template as `{{ key }}`.
    ///
    /// Binding a key again replaces the earlier value.
    pub fn with<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        self.data.insert(key.into(), Value::from_serialize(&value));
        self
    }

    /// Binds several values; equivalent to calling [`with`](Self::with) for each.
    pub fn with_all<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Serialize,
    {
        for (key, value) in values {
            self.data.insert(key.into(), Value::from_serialize(&value));
        }
        self
    }

    /// Looks up the template and renders it into `sink`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the key is not cached, [`Error::Render`] if
    /// rendering fails.
    pub fn exec<W: Write>(self, mut sink: W) -> Result<()> {
        self.cache.exec(&mut sink, &self.key, &self.data)
    }

    /// Looks up the template and renders it into a string.
    pub fn exec_str(self) -> Result<String> {
        let key = self.key.clone();
        let mut buf = Vec::new();
        self.exec(&mut buf)?;
        String::from_utf8(buf).map_err(|source| Error::Encoding { name: key, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySource, TextCache};
    use serde::Serialize;

    fn cache() -> TextCache {
        let cache = TextCache::new();
        cache
            .load(&MemorySource::new().add("Hello", "Hello {{ name }}{{ suffix }}"))
            .unwrap();
        cache
    }

    #[test]
    fn test_with_overwrites() {
        let cache = cache();
        let builder = cache.builder("hello").with("name", "a").with("name", "b");
        assert_eq!(builder.data().len(), 1);
        assert_eq!(builder.exec_str().unwrap(), "Hello b");
    }

    #[test]
    fn test_with_all_matches_sequential_with() {
        let cache = cache();
        let all = cache
            .builder("hello")
            .with_all([("name", "x"), ("suffix", "!")])
            .exec_str()
            .unwrap();
        let one_by_one = cache
            .builder("hello")
            .with("name", "x")
            .with("suffix", "!")
            .exec_str()
            .unwrap();
        assert_eq!(all, one_by_one);
        assert_eq!(all, "Hello x!");
    }

    #[test]
    fn test_structured_values() {
        #[derive(Serialize)]
        struct User {
            name: String,
        }

        let cache = TextCache::new();
        cache
            .load(&MemorySource::new().add("Card", "{{ user.name }}:{{ tags | join(\",\") }}"))
            .unwrap();
        let out = cache
            .builder("card")
            .with("user", User { name: "ada".into() })
            .with("tags", vec!["x", "y"])
            .exec_str()
            .unwrap();
        assert_eq!(out, "ada:x,y");
    }

    #[test]
    fn test_exec_to_sink() {
        let cache = cache();
        let mut out = Vec::new();
        cache
            .builder("Hello")
            .with("name", "sink")
            .exec(&mut out)
            .unwrap();
        assert_eq!(out, b"Hello sink");
    }

    #[test]
    fn test_missing_key_fails_only_on_exec() {
        let cache = cache();
        let builder = cache.builder("doesnotexist").with("name", "x");
        assert_eq!(builder.key(), "doesnotexist");
        let err = builder.exec_str().unwrap_err();
        assert!(matches!(err, Error::NotFound(ref key) if key == "doesnotexist"));
    }
}
