use std::fmt::Write;

use pulldown_cmark::{Event, Tag, TagEnd};
use pulldown_cmark_escape::escape_html;
use serde::Serialize;

use super::Stage;
use crate::error::{Chainable, Result};

/// One synthesized navigation entry. Entries are flat and in document order;
/// exactly the first is active.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Entry {
    pub label: String,
    pub level: usize,
    /// `"#"` followed by the heading's assigned id.
    pub href: String,
    pub active: bool,
}

/// Collects level 1-3 headings into [`Entry`]s.
///
/// Precondition: runs after [`HeadingIds`](super::HeadingIds), and after
/// every content-shaping stage, so labels and hrefs reflect the final
/// rendered headings.
#[derive(Debug, Default)]
pub struct TocBuilder {
    entries: Vec<Entry>,
    current: Option<Entry>,
}

impl TocBuilder {
    pub const NAME: &'static str = "toc";

    pub fn take_entries(&mut self) -> Vec<Entry> {
        std::mem::take(&mut self.entries)
    }

    /// Renders entries as one list element, the unit of atomic navigation
    /// replacement.
    pub fn render_list(entries: &[Entry]) -> String {
        let mut out = String::from(r#"<ul class="toc">"#);
        for entry in entries {
            let class = if entry.active { r#" class="active""# } else { "" };
            let _ = write!(&mut out, r#"<li{class} data-level="{}"><a href="{}">"#,
                entry.level, entry.href);
            let _ = escape_html(&mut out, &entry.label);
            out.push_str("</a></li>");
        }

        out.push_str("</ul>");
        out
    }

    /// Serializes entries for hosts that consume the TOC as data rather than
    /// markup.
    pub fn render_json(entries: &[Entry]) -> Result<String> {
        serde_json::to_string(entries).chain(error!("failed to serialize toc entries"))
    }
}

impl Stage for TocBuilder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.entries.clear();
        self.current = None;

        events.inspect(|ev| match ev {
            Event::Start(Tag::Heading { level, id, .. }) if (*level as usize) <= 3 => {
                self.current = Some(Entry {
                    label: String::new(),
                    level: *level as usize,
                    href: format!("#{}", id.as_deref().unwrap_or_default()),
                    active: self.entries.is_empty(),
                });
            }
            Event::Text(text) | Event::Code(text) if self.current.is_some() => {
                self.current.as_mut().unwrap().label.push_str(text);
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(entry) = self.current.take() {
                    self.entries.push(entry);
                }
            }
            _ => {}
        })
    }
}
