//! Concurrent cache of compiled templates.
//!
//! A [`Cache`] owns one generation of compiled templates keyed by normalized
//! name. [`Cache::load`] builds a complete new generation from a [`Source`]
//! under an exclusive lock and swaps it in only once everything compiled; if
//! anything fails the previous generation stays live. Lookups take a shared
//! lock just long enough to clone the compiled unit out of the map, so a slow
//! render never holds the lock.
//!
//! Configuration (functions, export rule, case sensitivity) takes `&mut self`
//! and therefore happens before the cache is shared between threads.
//!
//! ```rust
//! use tessera::{Functions, MemorySource, TextCache};
//!
//! let source = MemorySource::new()
//!     .add("base", "{% include \"greeting\" %} {% block message %}{% endblock %}")
//!     .add("greeting", "{{ Greeting }}!")
//!     .add(
//!         "Smolbotbot",
//!         "{{extend \"base\"}}\n{{include \"greeting\"}}\n\
//!          {% block message %}The small robot of the day is {{ Robot }}. \
//!          1 + 1 = {{ add(1, 1) }}{% endblock %}",
//!     );
//!
//! let mut cache = TextCache::new();
//! cache.functions(Functions::std());
//! cache.load(&source).unwrap();
//!
//! let out = cache
//!     .builder("smolbotbot")
//!     .with("Greeting", "Hello")
//!     .with("Robot", "Teabot")
//!     .exec_str()
//!     .unwrap();
//! assert_eq!(out, "Hello! The small robot of the day is Teabot. 1 + 1 = 2");
//! ```

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, PoisonError, RwLock};

use tessera_directive::Directives;

use crate::builder::{Builder, DataMap};
use crate::error::{Error, Result};
use crate::functions::Functions;
use crate::source::{Locator, Source, SourceIndex};
use crate::template::{assemble, HtmlUnit, Resolver, Settings, TextUnit, Unit};

/// Cache of HTML-escaping templates.
pub type HtmlCache = Cache<HtmlUnit>;

/// Cache of plain-text templates.
pub type TextCache = Cache<TextUnit>;

/// Decides which templates are independently executable.
///
/// Templates that are not exported are still compiled into the templates
/// that depend on them, but cannot be looked up on their own.
#[derive(Clone)]
pub struct ExportRule(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl ExportRule {
    /// Creates a rule from a predicate over logical names.
    pub fn new(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Exports every template.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Applies the rule.
    pub fn is_exported(&self, name: &str) -> bool {
        (self.0)(name)
    }
}

impl Default for ExportRule {
    /// Exports names whose base name starts with an uppercase letter.
    fn default() -> Self {
        Self::new(starts_uppercase)
    }
}

impl fmt::Debug for ExportRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExportRule(..)")
    }
}

/// Returns true if the last `/`-separated segment starts with an uppercase letter.
pub fn starts_uppercase(name: &str) -> bool {
    name.rsplit('/')
        .next()
        .and_then(|base| base.chars().next())
        .is_some_and(char::is_uppercase)
}

type Generation<U> = HashMap<String, Arc<U>>;

/// Thread-safe cache of compiled templates.
pub struct Cache<U: Unit> {
    templates: RwLock<Generation<U>>,
    settings: Settings,
    export: ExportRule,
    case_sensitive: bool,
}

impl<U: Unit> Default for Cache<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: Unit> fmt::Debug for Cache<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("templates", &self.keys())
            .field("functions", &self.settings.functions.names().collect::<Vec<_>>())
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

impl<U: Unit> Cache<U> {
    /// Creates an empty, case-insensitive cache with no functions.
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
            settings: Settings::default(),
            export: ExportRule::default(),
            case_sensitive: false,
        }
    }

    /// Adds functions to the registry used by subsequent loads.
    ///
    /// Functions with an already registered name replace the earlier ones.
    pub fn functions(&mut self, functions: Functions) -> &mut Self {
        self.settings.functions.extend(functions);
        self
    }

    /// Replaces the export rule.
    pub fn export_rule(&mut self, rule: ExportRule) -> &mut Self {
        self.export = rule;
        self
    }

    /// Makes key lookups case-sensitive. Caches are case-insensitive by default.
    pub fn case_sensitive(&mut self, case_sensitive: bool) -> &mut Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Makes rendering fail on undefined variables.
    pub fn strict_undefined(&mut self, strict: bool) -> &mut Self {
        self.settings.strict_undefined = strict;
        self
    }

    /// Normalizes a template name into a cache key.
    pub fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Replaces the cached templates with the ones compiled from `source`.
    ///
    /// # Errors
    ///
    /// Fails on enumeration or read errors, name collisions, malformed
    /// directives, dependency cycles, unknown dependencies and template syntax
    /// errors. On failure the previously loaded templates remain in use.
    pub fn load<S: Source + ?Sized>(&self, source: &S) -> Result<()> {
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);

        match self.compile(source) {
            Ok(generation) => {
                tracing::info!(templates = generation.len(), "loaded template generation");
                *templates = generation;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    live = templates.len(),
                    "template load failed, keeping previous generation"
                );
                Err(err)
            }
        }
    }

    /// Returns an execution handle for `key`.
    ///
    /// The key is not checked until the builder is executed.
    pub fn builder(&self, key: impl Into<String>) -> Builder<'_, U> {
        Builder::new(self, key.into())
    }

    /// Returns true if `key` is in the current generation.
    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Keys of the current generation, sorted.
    pub fn keys(&self) -> Vec<String> {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = templates.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of templates in the current generation.
    pub fn len(&self) -> usize {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn exec(&self, sink: &mut dyn Write, key: &str, data: &DataMap) -> Result<()> {
        let unit = self
            .lookup(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        unit.execute(data, sink).map_err(|source| Error::Render {
            key: key.to_string(),
            source,
        })
    }

    fn lookup(&self, key: &str) -> Option<Arc<U>> {
        let templates = self.templates.read().unwrap_or_else(PoisonError::into_inner);
        templates.get(&self.key(key)).cloned()
    }

    fn compile<S: Source + ?Sized>(&self, source: &S) -> Result<Generation<U>> {
        let index = source.resolve()?;
        self.check_keys(&index)?;

        let mut resolver = Resolver::new(|name: &str| read_directives(source, &index, name));
        let mut generation = HashMap::new();

        for name in index.names() {
            if !self.export.is_exported(name) {
                continue;
            }
            resolver.resolve(name)?;
            let Some(composition) = resolver.composition(name) else {
                continue;
            };

            let unit: U = assemble(&composition, &self.settings)?;
            tracing::debug!(
                template = name,
                parts = ?composition.names().collect::<Vec<_>>(),
                "compiled template"
            );
            generation.insert(self.key(name), Arc::new(unit));
        }

        Ok(generation)
    }

    fn check_keys(&self, index: &SourceIndex) -> Result<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for name in index.names() {
            match seen.entry(self.key(name)) {
                Entry::Vacant(slot) => {
                    slot.insert(name);
                }
                Entry::Occupied(slot) => {
                    let locator = |n: &str| {
                        index
                            .locator(n)
                            .cloned()
                            .unwrap_or_else(|| Locator::Memory(n.to_string()))
                    };
                    return Err(Error::Collision {
                        name: slot.key().clone(),
                        existing: locator(*slot.get()),
                        conflicting: locator(name),
                    });
                }
            }
        }
        Ok(())
    }
}

fn read_directives<S: Source + ?Sized>(
    source: &S,
    index: &SourceIndex,
    name: &str,
) -> Result<Option<Directives>> {
    let locator = match index.locator(name) {
        Some(locator) => locator.clone(),
        None => match source.find(name)? {
            Some(locator) => locator,
            None => return Ok(None),
        },
    };

    let bytes = source.read(&locator)?;
    let text = String::from_utf8(bytes).map_err(|source| Error::Encoding {
        name: name.to_string(),
        source,
    })?;
    tessera_directive::parse(&text)
        .map(Some)
        .map_err(|source| Error::Directive {
            name: name.to_string(),
            source,
        })
}
