//! Explicit file-list template source.

use std::path::{Path, PathBuf};

use super::dir::read_locator;
use super::{logical_name, Locator, Source, SourceIndex};
use crate::error::{Error, Result};

/// Templates named by an explicit, ordered list of root-relative paths.
///
/// Paths are not checked during enumeration; a missing file fails when it is
/// first read.
#[derive(Debug, Clone)]
pub struct FileListSource {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl FileListSource {
    /// Creates a source for `paths`, each relative to `root`.
    pub fn new<I, P>(root: impl Into<PathBuf>, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            root: root.into(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// The directory the listed paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Source for FileListSource {
    fn resolve(&self) -> Result<SourceIndex> {
        let mut index = SourceIndex::new();
        for path in &self.paths {
            let name = logical_name(path).ok_or_else(|| {
                Error::io(
                    path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "template path must be relative to the source root",
                    ),
                )
            })?;
            index.insert(name, Locator::File(self.root.join(path)))?;
        }
        Ok(index)
    }

    fn read(&self, locator: &Locator) -> Result<Vec<u8>> {
        read_locator(locator)
    }
}
