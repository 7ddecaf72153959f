//! Directory-tree template source.

use std::io;
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use super::{logical_name, Locator, Source, SourceIndex};
use crate::error::{Error, Result};

/// Selects which files of a directory tree are templates.
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Every regular file.
    #[default]
    All,
    /// Files whose final extension is one of these (stored without the dot).
    Extensions(Vec<String>),
    /// Files whose `/`-separated root-relative path matches this expression.
    Pattern(Regex),
}

impl Filter {
    fn matches(&self, relative: &Path) -> bool {
        match self {
            Filter::All => true,
            Filter::Extensions(extensions) => relative
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e == ext)),
            Filter::Pattern(pattern) => pattern.is_match(&slash_path(relative)),
        }
    }
}

/// Templates discovered by walking a directory tree.
///
/// Files are visited in file-name order so enumeration is deterministic.
///
/// ```rust,ignore
/// use tessera::DirSource;
///
/// let source = DirSource::new("./templates").match_extensions(["html", "gohtml"]);
/// let partials = DirSource::new("./templates").match_pattern(r"^partials/.*\.html$")?;
/// ```
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
    filter: Filter,
}

impl DirSource {
    /// Creates a source that treats every file under `root` as a template.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: Filter::All,
        }
    }

    /// Restricts the source to files with one of the given extensions.
    ///
    /// Extensions may be written with or without the leading dot.
    pub fn match_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
            .collect();
        self.filter = Filter::Extensions(extensions);
        self
    }

    /// Restricts the source to paths matching a regular expression.
    ///
    /// The expression is matched against the root-relative path, `/`-separated,
    /// extension included. It selects the templates that are enumerated;
    /// dependencies named by directives are still found by path when the
    /// pattern does not match them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the expression does not compile.
    pub fn match_pattern(mut self, pattern: &str) -> Result<Self> {
        self.filter = Filter::Pattern(Regex::new(pattern)?);
        Ok(self)
    }

    /// The directory this source walks.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Source for DirSource {
    fn resolve(&self) -> Result<SourceIndex> {
        let mut index = SourceIndex::new();

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|err| walk_error(&self.root, err))?;
            if entry.file_type().is_dir() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.filter.matches(relative) {
                continue;
            }
            let Some(name) = logical_name(relative) else {
                continue;
            };

            index.insert(name, Locator::File(entry.path().to_path_buf()))?;
        }

        tracing::debug!(
            root = %self.root.display(),
            templates = index.len(),
            "enumerated template directory"
        );
        Ok(index)
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        read_locator(locator)
    }

    /// Looks `name` up on disk, whatever its extension, when a pattern filter
    /// may have skipped it. Other filters enumerate every candidate already.
    fn find(&self, name: &str) -> Result<Option<Locator>> {
        if !matches!(self.filter, Filter::Pattern(_)) {
            return Ok(None);
        }
        let relative = Path::new(name);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Ok(None);
        }

        let wanted = self.root.join(relative);
        let Some(dir) = wanted.parent() else {
            return Ok(None);
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io(dir, err)),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let path = entry.map_err(|err| Error::io(dir, err))?.path();
            if path.is_file() && path.with_extension("") == wanted {
                candidates.push(path);
            }
        }
        candidates.sort();

        let mut candidates = candidates.into_iter();
        let Some(first) = candidates.next() else {
            return Ok(None);
        };
        if let Some(second) = candidates.next() {
            return Err(Error::Collision {
                name: name.to_string(),
                existing: Locator::File(first),
                conflicting: Locator::File(second),
            });
        }

        tracing::debug!(template = name, path = %first.display(), "found unlisted dependency");
        Ok(Some(Locator::File(first)))
    }
}

pub(super) fn read_locator(locator: &Locator) -> Result<Vec<u8>> {
    match locator {
        Locator::File(path) => std::fs::read(path).map_err(|err| Error::io(path, err)),
        Locator::Memory(name) => Err(Error::io(
            name,
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "in-memory locator passed to a file source",
            ),
        )),
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file.as_bytes()).unwrap();
        }
        dir
    }

    fn names(source: &DirSource) -> Vec<String> {
        source
            .resolve()
            .unwrap()
            .names()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_walk_all_files_sorted() {
        let dir = tree(&["b.tmpl", "a.tmpl", "sub/c.tmpl"]);
        let source = DirSource::new(dir.path());
        assert_eq!(names(&source), vec!["a", "b", "sub/c"]);
    }

    #[test]
    fn test_extension_filter_accepts_dotted_and_plain() {
        let dir = tree(&["a.tmpl", "b.html", "c.txt"]);
        let source = DirSource::new(dir.path()).match_extensions([".tmpl", "html"]);
        assert_eq!(names(&source), vec!["a", "b"]);
    }

    #[test]
    fn test_pattern_filter_matches_relative_path() {
        let dir = tree(&["partials/nav.html", "Page.html", "notes.md"]);
        let source = DirSource::new(dir.path())
            .match_pattern(r"\.html$")
            .unwrap();
        assert_eq!(names(&source), vec!["Page", "partials/nav"]);

        let only_partials = DirSource::new(dir.path())
            .match_pattern(r"^partials/")
            .unwrap();
        assert_eq!(names(&only_partials), vec!["partials/nav"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = DirSource::new(".").match_pattern("(").unwrap_err();
        assert!(matches!(err, Error::InvalidPattern(_)));
    }

    #[test]
    fn test_same_name_different_extensions_collide() {
        let dir = tree(&["page.html", "page.tmpl"]);
        let source = DirSource::new(dir.path()).match_extensions(["html", "tmpl"]);
        let err = source.resolve().unwrap_err();
        assert!(matches!(err, Error::Collision { ref name, .. } if name == "page"));
    }

    #[test]
    fn test_missing_root_is_source_error() {
        let dir = TempDir::new().unwrap();
        let source = DirSource::new(dir.path().join("nope"));
        assert!(matches!(source.resolve(), Err(Error::Source { .. })));
    }

    #[test]
    fn test_read_returns_bytes() {
        let dir = tree(&["a.tmpl"]);
        let source = DirSource::new(dir.path());
        let index = source.resolve().unwrap();
        let bytes = source.read(index.locator("a").unwrap()).unwrap();
        assert_eq!(bytes, b"a.tmpl");
    }

    #[test]
    fn test_read_rejects_memory_locator() {
        let source = DirSource::new(".");
        assert!(source.read(&Locator::Memory("a".into())).is_err());
    }

    #[test]
    fn test_find_ignores_pattern() {
        let dir = tree(&["partials/nav.html", "Page.html", "notes.md"]);
        let source = DirSource::new(dir.path()).match_pattern(r"^Page").unwrap();

        assert_eq!(names(&source), vec!["Page"]);
        assert_eq!(
            source.find("partials/nav").unwrap(),
            Some(Locator::File(dir.path().join("partials/nav.html")))
        );
        assert_eq!(
            source.find("notes").unwrap(),
            Some(Locator::File(dir.path().join("notes.md")))
        );
        assert_eq!(source.find("partials/ghost").unwrap(), None);
        assert_eq!(source.find("missing/dir").unwrap(), None);
        assert_eq!(source.find("../escape").unwrap(), None);
    }

    #[test]
    fn test_find_ambiguous_is_collision() {
        let dir = tree(&["Page.html", "nav.html", "nav.tmpl"]);
        let source = DirSource::new(dir.path()).match_pattern(r"^Page").unwrap();
        assert!(matches!(
            source.find("nav"),
            Err(Error::Collision { ref name, .. }) if name == "nav"
        ));
    }

    #[test]
    fn test_find_only_for_pattern_filter() {
        let dir = tree(&["a.tmpl", "b.txt"]);
        let source = DirSource::new(dir.path()).match_extensions(["tmpl"]);
        assert_eq!(source.find("b").unwrap(), None);
    }
}
