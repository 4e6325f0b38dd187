use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use pulldown_cmark_escape::escape_html;

use super::Stage;

/// A diagram source lifted out of the document, awaiting asynchronous
/// rendering by an external capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    pub slot: usize,
    /// The fence body, byte for byte.
    pub source: String,
}

impl DiagramBlock {
    /// The container markup this block occupies in the rendered fragment.
    pub fn placeholder(&self) -> String {
        placeholder(self.slot, &self.source)
    }
}

/// Replaces fenced code blocks tagged with the reserved diagram marker by a
/// plain container holding the raw source as its text content.
///
/// Precondition: runs before [`SyntaxHighlight`](super::SyntaxHighlight), so
/// a diagram source is never tokenized as code.
#[derive(Debug, Clone)]
pub struct DiagramBlocks {
    marker: String,
    blocks: Vec<DiagramBlock>,
}

impl DiagramBlocks {
    pub const NAME: &'static str = "diagram-blocks";

    /// `marker` is matched case-sensitively against the first token of the
    /// fence info string.
    pub fn new<S: Into<String>>(marker: S) -> Self {
        DiagramBlocks { marker: marker.into(), blocks: vec![] }
    }

    pub fn take_blocks(&mut self) -> Vec<DiagramBlock> {
        std::mem::take(&mut self.blocks)
    }
}

struct DiagramIterator<'a, I: Iterator<Item = Event<'a>>> {
    marker: &'a str,
    blocks: &'a mut Vec<DiagramBlock>,
    pending: Option<String>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for DiagramIterator<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label)))
                    if lang_token(&label) == self.marker =>
                {
                    self.pending = Some(String::new());
                }
                Event::Text(text) if self.pending.is_some() => {
                    self.pending.as_mut().unwrap().push_str(&text);
                }
                Event::End(TagEnd::CodeBlock) if self.pending.is_some() => {
                    let source = self.pending.take().unwrap();
                    let slot = self.blocks.len();
                    let html = placeholder(slot, &source);
                    self.blocks.push(DiagramBlock { slot, source });
                    return Some(Event::Html(html.into()));
                }
                event => return Some(event),
            }
        }
    }
}

impl Stage for DiagramBlocks {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.blocks.clear();

        DiagramIterator {
            marker: &self.marker,
            blocks: &mut self.blocks,
            pending: None,
            inner: events,
        }
    }
}

fn lang_token(label: &str) -> &str {
    label.split_once(',').map(|(prefix, _)| prefix).unwrap_or(label)
}

fn placeholder(slot: usize, source: &str) -> String {
    let mut div = format!("<div class=\"diagram\" data-slot=\"{slot}\">");
    let _ = escape_html(&mut div, source);
    div.push_str("</div>");
    div
}

#[cfg(test)]
mod tests {
    use pulldown_cmark::html;

    use super::*;
    use crate::pipeline::MarkupRenderer;

    fn convert(input: &str, marker: &str) -> (String, Vec<DiagramBlock>) {
        let input = input.to_string();
        let mut stage = DiagramBlocks::new(marker);
        let mut out = String::new();
        {
            let events = stage.remap(MarkupRenderer::default().parse(&input));
            html::push_html(&mut out, events);
        }

        (out, stage.take_blocks())
    }

    #[test]
    fn diagram_source_is_preserved_verbatim() {
        let input = "```mermaid\ngraph TD;\n  A --> B;\n  B --> C<D>;\n```\n";
        let (out, blocks) = convert(input, "mermaid");

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].source, "graph TD;\n  A --> B;\n  B --> C<D>;\n");
        assert!(out.contains(r#"<div class="diagram" data-slot="0">"#));
        assert!(out.contains("B --&gt; C&lt;D&gt;"));
        assert!(!out.contains("<pre>"));
    }

    #[test]
    fn marker_is_case_sensitive() {
        let (out, blocks) = convert("```Mermaid\ngraph TD;\n```\n", "mermaid");
        assert!(blocks.is_empty());
        assert!(out.contains("<pre>"));
    }

    #[test]
    fn untagged_blocks_are_untouched() {
        let (out, blocks) = convert("```rust\nfn main() {}\n```\n", "mermaid");
        assert!(blocks.is_empty());
        assert!(out.contains("fn main"));
    }
}
