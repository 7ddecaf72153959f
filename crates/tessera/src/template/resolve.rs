//! Dependency resolution for extend/include graphs.
//!
//! [`Resolver`] turns the directives of individual templates into a flat,
//! duplicate-free composition order per template:
//!
//! ```text
//! [ancestors (outermost first)..., template, includes (first seen first)...]
//! ```
//!
//! Each name is parsed and resolved at most once per resolver; the table of
//! resolved [`Record`]s is shared by every template resolved through it, so
//! diamonds cost nothing extra. Cycles are reported as [`Error::Cycle`].
//!
//! # Merge Rule
//!
//! For each direct parent `P` (in directive order) the template's ancestor
//! list receives `P`'s ancestors, then `P`, then `P`'s includes. Each direct
//! include `I` contributes `I`'s ancestors, then `I`, then `I`'s includes to
//! the include list. A name already placed anywhere in either list is skipped,
//! so the first occurrence wins and no name appears twice.

use std::collections::{HashMap, HashSet};

use tessera_directive::Directives;

use crate::error::{Error, Result};

/// A template with its transitive dependencies resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Renderable body, directives removed.
    pub body: String,
    /// Every name composed before this template, outermost first.
    pub extends: Vec<String>,
    /// Every name composed after this template, in discovery order.
    pub includes: Vec<String>,
}

/// The ordered `(name, body)` pairs that make up one compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> Composition<'a> {
    /// The first entry, which becomes the root of the compiled unit.
    pub fn root(&self) -> (&'a str, &'a str) {
        self.entries[0]
    }

    /// Every entry after the root, in order.
    pub fn definitions(&self) -> &[(&'a str, &'a str)] {
        &self.entries[1..]
    }

    /// All names, root first.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.iter().map(|&(name, _)| name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Memoizing resolver over a lookup function.
///
/// The lookup receives a template name and returns its parsed directives, or
/// `None` if no such template exists.
pub struct Resolver<F> {
    table: HashMap<String, Record>,
    visiting: Vec<String>,
    lookup: F,
}

impl<F> Resolver<F>
where
    F: FnMut(&str) -> Result<Option<Directives>>,
{
    pub fn new(lookup: F) -> Self {
        Self {
            table: HashMap::new(),
            visiting: Vec::new(),
            lookup,
        }
    }

    /// Resolves `name` and everything it depends on.
    ///
    /// Resolving an already resolved name is a no-op.
    ///
    /// # Errors
    ///
    /// - [`Error::Cycle`] if `name` transitively depends on itself.
    /// - [`Error::MissingDependency`] if a referenced name does not exist.
    /// - [`Error::NotFound`] if `name` itself does not exist.
    /// - Whatever the lookup function returns.
    pub fn resolve(&mut self, name: &str) -> Result<&Record> {
        if !self.table.contains_key(name) {
            self.resolve_new(name)?;
        }
        self.table
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Returns the resolved record for `name`, if any.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.table.get(name)
    }

    /// Builds the composition order of a resolved template.
    pub fn composition(&self, name: &str) -> Option<Composition<'_>> {
        let (name, record) = self.table.get_key_value(name)?;
        let entry = |dep: &String| {
            self.table
                .get_key_value(dep)
                .map(|(n, r)| (n.as_str(), r.body.as_str()))
        };

        let mut entries: Vec<(&str, &str)> = record.extends.iter().filter_map(entry).collect();
        entries.push((name.as_str(), record.body.as_str()));
        entries.extend(record.includes.iter().filter_map(entry));
        Some(Composition { entries })
    }

    /// Number of resolved templates.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn resolve_new(&mut self, name: &str) -> Result<()> {
        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut chain = self.visiting[start..].to_vec();
            chain.push(name.to_string());
            return Err(Error::Cycle { chain });
        }

        let Some(raw) = (self.lookup)(name)? else {
            return Err(match self.visiting.last() {
                Some(parent) => Error::MissingDependency {
                    name: name.to_string(),
                    referenced_by: parent.clone(),
                },
                None => Error::NotFound(name.to_string()),
            });
        };

        self.visiting.push(name.to_string());
        let merged = self.merge(&raw);
        self.visiting.pop();
        let (extends, includes) = merged?;

        tracing::debug!(
            template = name,
            extends = ?extends,
            includes = ?includes,
            "resolved template dependencies"
        );

        self.table.insert(
            name.to_string(),
            Record {
                body: raw.body,
                extends,
                includes,
            },
        );
        Ok(())
    }

    fn merge(&mut self, raw: &Directives) -> Result<(Vec<String>, Vec<String>)> {
        let mut seen = HashSet::new();

        let mut extends = Vec::new();
        for parent in &raw.extends {
            let record = self.resolve(parent)?;
            push_closure(&mut extends, &mut seen, parent, record);
        }

        let mut includes = Vec::new();
        for included in &raw.includes {
            let record = self.resolve(included)?;
            push_closure(&mut includes, &mut seen, included, record);
        }

        Ok((extends, includes))
    }
}

fn push_closure(out: &mut Vec<String>, seen: &mut HashSet<String>, name: &str, record: &Record) {
    let closure = record
        .extends
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .chain(record.includes.iter().map(String::as_str));

    for dep in closure {
        if seen.insert(dep.to_string()) {
            out.push(dep.to_string());
        }
    }
}
