use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// A host-owned HTML container that the pipeline mutates but does not own.
///
/// Clones share the same underlying buffer, so a host can hand one handle to
/// the pipeline and keep another for reading. All writes are whole-content
/// replacements except [`patch`](Target::patch), which substitutes a single
/// previously written fragment in place and exists for asynchronous
/// enhancements. Whole-content rewrites that run concurrently with patches
/// must go through [`update`](Target::update) so a patch can never land
/// between the read and the write.
#[derive(Debug, Clone, Default)]
pub struct Target {
    html: Arc<Mutex<String>>,
}

impl Target {
    pub fn new() -> Self {
        Target::default()
    }

    /// A snapshot of the current content.
    pub fn html(&self) -> String {
        self.html.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.html.lock().is_empty()
    }

    /// Atomically replaces the entire content.
    pub fn replace<S: Into<String>>(&self, html: S) {
        *self.html.lock() = html.into();
    }

    /// Rewrites the entire content while holding the lock, so no patch can
    /// interleave between reading the current content and writing the
    /// rewritten one. `f` must not touch this target.
    pub fn update<F>(&self, f: F) -> Result<()>
        where F: FnOnce(&str) -> Result<String>
    {
        let mut html = self.html.lock();
        let rewritten = f(&html)?;
        *html = rewritten;
        Ok(())
    }

    /// Replaces the first occurrence of `needle` with `replacement`. Returns
    /// `false` if `needle` is no longer present, in which case the content is
    /// left untouched.
    pub fn patch(&self, needle: &str, replacement: &str) -> bool {
        let mut html = self.html.lock();
        match html.find(needle) {
            Some(start) => {
                html.replace_range(start..start + needle.len(), replacement);
                true
            }
            None => false,
        }
    }
}
