use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Chainable, Result};

/// An opaque locator for a raw document. Resolved against a [`Fetcher`]'s
/// base directory at fetch time; immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef(PathBuf);

impl DocumentRef {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        DocumentRef(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for DocumentRef {
    fn from(path: &str) -> Self {
        DocumentRef::new(path)
    }
}

/// Retrieves raw document text for a [`DocumentRef`]. Exactly one attempt
/// per call; a failure is surfaced as a single chained error carrying the
/// underlying cause.
#[derive(Debug, Clone)]
pub struct Fetcher {
    base: PathBuf,
}

impl Fetcher {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Fetcher { base: base.into() }
    }

    pub fn fetch(&self, doc: &DocumentRef) -> Result<String> {
        let path = self.base.join(doc.path());
        fs::read_to_string(&path).chain(error! {
            "failed to fetch document",
            "path" => path.display(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_is_an_error() {
        let fetcher = Fetcher::new(std::env::temp_dir());
        let result = fetcher.fetch(&DocumentRef::from("no-such-document.md"));
        let error = result.unwrap_err().to_string();
        assert!(error.contains("failed to fetch document"));
        assert!(error.contains("no-such-document.md"));
    }
}
