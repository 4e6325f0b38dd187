use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use syntect::html::{ClassedHTMLGenerator, ClassStyle};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use super::Stage;
use crate::error::Result;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

static DEFAULT_SYNTAX: Lazy<&'static SyntaxReference>
    = Lazy::new(|| SYNTAX_SET.find_syntax_plain_text());

/// Language-aware highlighting for fenced code blocks. Unknown languages
/// fall back to plain text. Runs once per pass over each block, so already
/// highlighted markup is never re-tokenized.
#[derive(Default, Clone)]
pub struct SyntaxHighlight {
    exclude: Option<String>,
    /// Lines the tokenizer could not parse this pass. Reported and reset by
    /// `finalize`.
    pub(super) errors: usize,
}

pub struct Highlighter<'a, I> {
    generator: Option<ClassedHTMLGenerator<'static>>,
    exclude: Option<&'a str>,
    errors: &'a mut usize,
    lines: usize,
    inner: I,
}

impl SyntaxHighlight {
    pub const NAME: &'static str = "syntax-highlight";

    /// Leaves blocks whose language tag equals `marker` (case-sensitive)
    /// untouched. Diagram sources stay out of the tokenizer this way even
    /// when the conversion stage is absent.
    pub fn excluding<S: Into<String>>(marker: S) -> Self {
        SyntaxHighlight { exclude: Some(marker.into()), errors: 0 }
    }

    #[inline]
    pub fn warm_up() {
        rayon::spawn(|| { Lazy::force(&SYNTAX_SET); });
        rayon::spawn(|| { Lazy::force(&DEFAULT_SYNTAX); });
    }
}

impl Stage for SyntaxHighlight {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        Highlighter {
            generator: None,
            exclude: self.exclude.as_deref(),
            errors: &mut self.errors,
            lines: 0,
            inner: events,
        }
    }

    fn finalize(&mut self) -> Result<()> {
        match std::mem::take(&mut self.errors) {
            0 => Ok(()),
            n => err! {
                "highlighting skipped unparseable code",
                "lines" => n,
            },
        }
    }
}

fn html_generator(syntax: &SyntaxReference) -> ClassedHTMLGenerator<'_> {
    ClassedHTMLGenerator::new_with_class_style(syntax, &*SYNTAX_SET, ClassStyle::Spaced)
}

#[allow(unused_must_use)]
fn code_div(lines: usize, code: String) -> String {
    use std::fmt::Write;

    let mut div = String::new();
    write!(&mut div, "<div class=\"code\" style=\"display: flex;\">");

    write!(&mut div, "<pre class=\"line-nums\">");
    for i in 1..=lines {
        if i < lines { write!(&mut div, "{}\n", i); }
        else { write!(&mut div, "{}", i); }
    }
    write!(&mut div, "</pre>");

    write!(&mut div, "<pre class=\"code\">{}</pre>", code);
    write!(&mut div, "</div>");

    div
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for Highlighter<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label))) => {
                    let lang = label.split_once(',')
                        .map(|(prefix, _)| prefix)
                        .unwrap_or(&*label);

                    if self.exclude == Some(lang) {
                        return Some(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(label))));
                    }

                    let syntax = SYNTAX_SET.find_syntax_by_token(lang)
                        .unwrap_or_else(|| &*DEFAULT_SYNTAX);

                    self.generator = Some(html_generator(syntax));
                    self.lines = 0;
                }
                Event::Text(text) if self.generator.is_some() => {
                    let generator = self.generator.as_mut().unwrap();
                    let lines = memchr::memrchr_iter(b'\n', text.as_bytes()).count();
                    self.lines += lines;
                    if generator.parse_html_for_line_which_includes_newline(&text).is_err() {
                        *self.errors += lines.max(1);
                    }
                }
                Event::End(TagEnd::CodeBlock) if self.generator.is_some() => {
                    let generator = self.generator.take().unwrap();
                    let code_html = code_div(self.lines, generator.finalize());
                    return Some(Event::Html(code_html.into()));
                },
                ev => return Some(ev),
            }
        }
    }
}
