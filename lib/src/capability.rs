use std::sync::Arc;

use crate::error::Result;
use crate::pipeline::MarkupRenderer;

/// Renders one diagram source into displayable markup, typically SVG.
///
/// Invoked off the rendering path, once per converted diagram block, via
/// [`enhance::spawn`](crate::enhance::spawn).
pub trait Diagrammer: Send + Sync {
    fn render(&self, source: &str) -> Result<String>;
}

/// Typesets math notation in a fully rendered fragment, returning the
/// rewritten fragment. Invoked at most once per render pass, off the
/// rendering path.
pub trait Typesetter: Send + Sync {
    fn typeset(&self, html: &str) -> Result<String>;
}

/// The set of capabilities backing a [`PageRenderer`](crate::page::PageRenderer).
///
/// Every capability except `markup` is optional: an absent capability makes
/// the corresponding stage a no-op without affecting any other stage. An
/// absent `markup` capability is a fatal configuration error, surfaced the
/// same way as a failed fetch.
#[derive(Clone)]
pub struct Capabilities {
    pub markup: Option<MarkupRenderer>,
    pub highlight: bool,
    pub tables: bool,
    /// Reserved fenced-code language tag for diagram blocks, matched
    /// case-sensitively.
    pub diagram_marker: String,
    pub diagrammer: Option<Arc<dyn Diagrammer>>,
    pub typesetter: Option<Arc<dyn Typesetter>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities {
            markup: Some(MarkupRenderer::default()),
            highlight: true,
            tables: true,
            diagram_marker: "mermaid".into(),
            diagrammer: None,
            typesetter: None,
        }
    }
}
