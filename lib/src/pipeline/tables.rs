use std::fmt::Write;

use pulldown_cmark::{Alignment, Event, Tag, TagEnd};

use super::Stage;

const TABLE_STYLE: &str = "border-collapse: collapse; width: 100%;";
const CELL_STYLE: &str = "border: 1px solid #d9d9d9; padding: 6px 13px;";
const SHADED_ROW_STYLE: &str = "background-color: #f2f2f2;";

/// Inline presentation contract for every table in the fragment: collapsed
/// borders, full width, alternating body-row shading (even data-row indices,
/// zero-based). Inline so tables read correctly even when no stylesheet
/// loads.
#[derive(Debug, Default, Clone)]
pub struct TableStyling;

impl TableStyling {
    pub const NAME: &'static str = "table-styling";
}

struct TableIterator<'a, I: Iterator<Item = Event<'a>>> {
    alignments: Vec<Alignment>,
    column: usize,
    row: usize,
    in_head: bool,
    in_body: bool,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for TableIterator<'a, I> {
    type Item = Event<'a>;

    #[allow(unused_must_use)]
    fn next(&mut self) -> Option<Self::Item> {
        let html = match self.inner.next()? {
            Event::Start(Tag::Table(alignments)) => {
                self.alignments = alignments;
                self.in_head = false;
                self.in_body = false;
                format!(r#"<table style="{TABLE_STYLE}">"#)
            }
            Event::End(TagEnd::Table) => {
                let mut html = String::new();
                if self.in_body {
                    self.in_body = false;
                    html.push_str("</tbody>");
                }

                html.push_str("</table>");
                html
            }
            Event::Start(Tag::TableHead) => {
                self.in_head = true;
                self.column = 0;
                "<thead><tr>".into()
            }
            Event::End(TagEnd::TableHead) => {
                self.in_head = false;
                self.in_body = true;
                self.row = 0;
                "</tr></thead><tbody>".into()
            }
            Event::Start(Tag::TableRow) => {
                self.column = 0;
                if self.row % 2 == 0 {
                    format!(r#"<tr style="{SHADED_ROW_STYLE}">"#)
                } else {
                    "<tr>".into()
                }
            }
            Event::End(TagEnd::TableRow) => {
                self.row += 1;
                "</tr>".into()
            }
            Event::Start(Tag::TableCell) => {
                let mut style = String::from(CELL_STYLE);
                match self.alignments.get(self.column) {
                    Some(Alignment::Left) => style.push_str(" text-align: left;"),
                    Some(Alignment::Center) => style.push_str(" text-align: center;"),
                    Some(Alignment::Right) => style.push_str(" text-align: right;"),
                    _ => {}
                }

                self.column += 1;

                let mut html = String::new();
                let cell = if self.in_head { "th" } else { "td" };
                write!(&mut html, r#"<{cell} style="{style}">"#);
                html
            }
            Event::End(TagEnd::TableCell) => {
                if self.in_head { "</th>".into() } else { "</td>".into() }
            }
            event => return Some(event),
        };

        Some(Event::Html(html.into()))
    }
}

impl Stage for TableStyling {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        TableIterator {
            alignments: vec![],
            column: 0,
            row: 0,
            in_head: false,
            in_body: false,
            inner: events,
        }
    }
}

#[cfg(test)]
mod tests {
    use pulldown_cmark::html;

    use super::*;
    use crate::pipeline::MarkupRenderer;

    fn style(input: &str) -> String {
        let input = input.to_string();
        let mut stage = TableStyling::default();
        let mut out = String::new();
        let events = stage.remap(MarkupRenderer::default().parse(&input));
        html::push_html(&mut out, events);
        out
    }

    const TABLE: &str = "\
| h1 | h2 |
|:---|---:|
| a  | b  |
| c  | d  |
| e  | f  |
";

    #[test]
    fn tables_get_the_full_presentation_contract() {
        let out = style(TABLE);
        assert!(out.contains(TABLE_STYLE));
        assert_eq!(out.matches(CELL_STYLE).count(), 8);
        assert!(out.contains("text-align: left;"));
        assert!(out.contains("text-align: right;"));
    }

    #[test]
    fn even_data_rows_are_shaded() {
        let out = style(TABLE);
        // Rows a/b and e/f shade; c/d does not. The header row never does.
        assert_eq!(out.matches(SHADED_ROW_STYLE).count(), 2);
        let shaded = format!(r#"<tr style="{SHADED_ROW_STYLE}">"#);
        let first = out.find(&shaded).unwrap();
        assert!(out.find("<thead>").unwrap() < first);
        assert!(out.find("<tbody>").unwrap() < first);
    }

    #[test]
    fn every_table_is_styled() {
        let two = format!("{TABLE}\nsome text\n\n{TABLE}");
        let out = style(&two);
        assert_eq!(out.matches(TABLE_STYLE).count(), 2);
    }
}
