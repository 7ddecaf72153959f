//! # Tessera - Composable Template Cache
//!
//! `tessera` loads a set of named templates, resolves how they compose with
//! each other and serves the compiled results from a thread-safe cache.
//!
//! ## Core Concepts
//!
//! - [`Source`]: Where templates come from ([`DirSource`], [`FileListSource`], [`MemorySource`])
//! - Directives: `{{extend "a" "b"}}` and `{{include "c"}}` lines declare dependencies
//! - [`Resolver`]: Flattens the dependency graph of a template into one ordered composition
//! - [`Unit`]: A compiled composition ([`HtmlUnit`] escapes output, [`TextUnit`] does not)
//! - [`Cache`]: Holds the compiled units of exported templates, reloadable at runtime
//! - [`Builder`]: Binds data for one execution of a cached template
//! - [`Functions`]: Callables available inside every template
//!
//! ## Quick Start
//!
//! ```rust
//! use tessera::{Functions, MemorySource, TextCache};
//!
//! let source = MemorySource::new()
//!     .add("layout", "== {% block body %}{% endblock %} ==")
//!     .add("Report", "{{extend \"layout\"}}\n{% block body %}{{ count }} x 2 = {{ mul(count, 2) }}{% endblock %}\n");
//!
//! let mut cache = TextCache::new();
//! cache.functions(Functions::std());
//! cache.load(&source).unwrap();
//!
//! let out = cache.builder("report").with("count", 3).exec_str().unwrap();
//! assert_eq!(out, "== 3 x 2 = 6 ==");
//! ```
//!
//! ## Composition
//!
//! A template's leading directives name the templates it depends on. For a
//! template `T` the composition order is every transitively extended template,
//! then `T` itself, then every transitively included template, each name once.
//! The first entry is the root whose layout gets rendered. Every later entry
//! can be pulled in by name with `{% include "name" %}`, and its
//! `{% block %}`s override the same blocks of the entries before it, so an
//! extending template fills in the blocks its ancestors declare.
//!
//! ## Exporting
//!
//! Only exported templates become cache keys. By default a template is
//! exported when its base name starts with an uppercase letter, so
//! `pages/Home` is a key and `partials/nav` is not. See [`ExportRule`].
//!
//! ## Configuration
//!
//! Caches can be configured in code or from YAML with [`CacheConfig`].

mod builder;
mod cache;
pub mod config;
mod error;
mod functions;
pub mod source;
pub mod template;

pub use builder::{Builder, DataMap};
pub use cache::{starts_uppercase, Cache, ExportRule, HtmlCache, TextCache};
pub use config::{CacheConfig, SourceConfig};
pub use error::{Error, Result};
pub use functions::Functions;
pub use source::{
    logical_name, DirSource, FileListSource, Filter, Locator, MemorySource, Source, SourceIndex,
};
pub use template::{assemble, Composition, HtmlUnit, Record, Resolver, Settings, TextUnit, Unit};

pub use minijinja::Value;
pub use tessera_directive::{DirectiveError, DirectiveKind, Directives};
