use pulldown_cmark_escape::escape_html;

use crate::capability::Capabilities;
use crate::enhance::{self, TaskHandle};
use crate::error::Error;
use crate::fetch::{DocumentRef, Fetcher};
use crate::pipeline::{
    DiagramBlocks, Entry, MarkupRenderer, Pipeline, StageFailure, SyntaxHighlight, TableStyling,
    TocBuilder,
};
use crate::target::Target;

/// The host-owned surfaces one render pass mutates. The pipeline writes into
/// them but has no lifecycle responsibility beyond the pass.
#[derive(Debug, Default, Clone)]
pub struct HostPage {
    pub document: Option<DocumentRef>,
    pub content: Option<Target>,
    pub navigation: Option<Target>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The document could not be retrieved.
    Fetch,
    /// No markup renderer is configured; nothing can be rendered.
    RenderUnavailable,
}

/// A fatal, user-visible failure. The content target holds a single visible
/// error element; no stages ran and no TOC was synthesized.
#[derive(Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub error: Error,
}

/// The result of one render pass.
#[derive(Debug)]
pub enum Outcome {
    /// No document reference or no content target was configured. Nothing
    /// happened; this is not an error.
    Skipped,
    Failed(Failure),
    Rendered(Report),
}

#[derive(Debug)]
pub struct Report {
    /// Synthesized navigation entries, whether or not a navigation target
    /// received them.
    pub toc: Vec<Entry>,
    /// Isolated, non-fatal stage errors.
    pub failures: Vec<StageFailure>,
    /// Completion signals for in-flight diagram and typesetting tasks.
    pub enhancements: Vec<TaskHandle>,
}

/// Runs the whole flow for one page: fetch, markup rendering, the stage set
/// in declared order, TOC synthesis into the navigation target, then
/// fire-and-forget enhancements.
pub struct PageRenderer {
    fetcher: Fetcher,
    capabilities: Capabilities,
}

impl PageRenderer {
    pub fn new(fetcher: Fetcher, capabilities: Capabilities) -> Self {
        PageRenderer { fetcher, capabilities }
    }

    pub fn render(&self, page: &HostPage) -> Outcome {
        let (Some(document), Some(content)) = (&page.document, &page.content) else {
            tracing::debug!("nothing to render: no document reference or content target");
            return Outcome::Skipped;
        };

        let raw = match self.fetcher.fetch(document) {
            Ok(raw) => raw,
            Err(error) => return Outcome::Failed(fail(content, FailureKind::Fetch, error)),
        };

        let Some(renderer) = self.capabilities.markup else {
            let error = error!("no markup renderer is configured");
            return Outcome::Failed(fail(content, FailureKind::RenderUnavailable, error));
        };

        let mut output = self.pipeline(renderer).run(&raw);
        content.replace(std::mem::take(&mut output.html));

        match &page.navigation {
            Some(nav) => nav.replace(TocBuilder::render_list(&output.toc)),
            None => tracing::debug!("no navigation target: toc synthesis skipped"),
        }

        let mut enhancements = vec![];
        if let Some(diagrammer) = &self.capabilities.diagrammer {
            for block in output.diagrams {
                let diagrammer = diagrammer.clone();
                let target = content.clone();
                enhancements.push(enhance::spawn("diagram", move || {
                    let rendered = diagrammer.render(&block.source)?;
                    let replacement = format!(
                        r#"<div class="diagram rendered" data-slot="{}">{rendered}</div>"#,
                        block.slot,
                    );

                    match target.patch(&block.placeholder(), &replacement) {
                        true => Ok(()),
                        false => err! {
                            "diagram container vanished before rendering",
                            "slot" => block.slot,
                        },
                    }
                }));
            }
        }

        if let Some(typesetter) = &self.capabilities.typesetter {
            let typesetter = typesetter.clone();
            let target = content.clone();
            enhancements.push(enhance::spawn("typeset", move || {
                // Whole-content rewrite under the target lock; in-flight
                // diagram patches cannot interleave.
                target.update(|html| typesetter.typeset(html))
            }));
        }

        Outcome::Rendered(Report {
            toc: output.toc,
            failures: output.failures,
            enhancements,
        })
    }

    fn pipeline(&self, renderer: MarkupRenderer) -> Pipeline {
        let caps = &self.capabilities;
        let mut pipeline = Pipeline::new(renderer);
        if caps.diagrammer.is_some() {
            pipeline = pipeline.with_diagrams(DiagramBlocks::new(&*caps.diagram_marker));
        }

        if caps.highlight {
            pipeline = pipeline.with_highlight(SyntaxHighlight::excluding(&*caps.diagram_marker));
        }

        if caps.tables {
            pipeline = pipeline.with_tables(TableStyling::default());
        }

        pipeline
    }
}

/// Replaces the target's entire content with a single visible error element.
fn fail(content: &Target, kind: FailureKind, error: Error) -> Failure {
    let mut markup = String::from(r#"<p class="render-error">failed to render page: "#);
    let _ = escape_html(&mut markup, error.to_string().trim());
    markup.push_str("</p>");
    content.replace(markup);

    Failure { kind, error }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> PageRenderer {
        PageRenderer::new(Fetcher::new(std::env::temp_dir()), Capabilities::default())
    }

    #[test]
    fn missing_document_reference_is_a_silent_no_op() {
        let page = HostPage {
            document: None,
            content: Some(Target::new()),
            navigation: Some(Target::new()),
        };

        assert!(matches!(renderer().render(&page), Outcome::Skipped));
        assert!(page.content.unwrap().is_empty());
        assert!(page.navigation.unwrap().is_empty());
    }

    #[test]
    fn missing_content_target_is_a_silent_no_op() {
        let page = HostPage {
            document: Some(DocumentRef::from("doc.md")),
            content: None,
            navigation: Some(Target::new()),
        };

        assert!(matches!(renderer().render(&page), Outcome::Skipped));
    }

    #[test]
    fn missing_markup_renderer_is_fatal_and_visible() {
        let mut capabilities = Capabilities::default();
        capabilities.markup = None;

        let renderer = PageRenderer::new(Fetcher::new("."), capabilities);
        let page = HostPage {
            document: Some(DocumentRef::from("Cargo.toml")),
            content: Some(Target::new()),
            navigation: None,
        };

        let outcome = renderer.render(&page);
        let Outcome::Failed(failure) = outcome else { panic!("expected failure") };
        assert_eq!(failure.kind, FailureKind::RenderUnavailable);

        let content = page.content.unwrap().html();
        assert!(content.starts_with(r#"<p class="render-error">"#));
    }
}
