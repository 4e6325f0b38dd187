use std::collections::VecDeque;

use pulldown_cmark::{Event, Tag, TagEnd};
use rustc_hash::FxHashMap;

use super::Stage;
use crate::util;

/// Assigns stable, pass-unique ids to level 1-3 headings.
///
/// Authored ids are reused and recorded; missing ids are derived by
/// slugifying the final heading text. A derived slug that collides with any
/// id already assigned this pass gets a numeric suffix.
#[derive(Debug, Default)]
pub struct HeadingIds {
    seen: FxHashMap<String, usize>,
}

impl HeadingIds {
    pub const NAME: &'static str = "heading-ids";
}

struct HeadingIterator<'a, I: Iterator<Item = Event<'a>>> {
    stack: VecDeque<Event<'a>>,
    seen: &'a mut FxHashMap<String, usize>,
    inner: I,
}

impl<'a, I: Iterator<Item = Event<'a>>> Iterator for HeadingIterator<'a, I> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.stack.pop_front() {
            return Some(event);
        }

        match self.inner.next()? {
            Event::Start(Tag::Heading { level, id: Some(id), classes, attrs })
                if (level as usize) <= 3 =>
            {
                self.seen.entry(id.to_string()).or_insert(1);
                Some(Event::Start(Tag::Heading { level, id: Some(id), classes, attrs }))
            }
            Event::Start(Tag::Heading { level, id: None, classes, attrs })
                if (level as usize) <= 3 =>
            {
                let mut text = String::new();
                loop {
                    let event = self.inner.next()?;
                    if let Event::Text(ref s) | Event::Code(ref s) = event {
                        text.push_str(s);
                    } else if let Event::End(TagEnd::Heading(..)) = event {
                        break;
                    }

                    self.stack.push_back(event);
                }

                let id = assign(self.seen, &text);
                let tag = Tag::Heading { level, id: Some(id.into()), classes, attrs };
                self.stack.push_back(Event::End(TagEnd::Heading(level)));
                Some(Event::Start(tag))
            },
            event => Some(event)
        }
    }
}

/// Derives a slug for `text` that is unique against `seen`, records it, and
/// returns it.
fn assign(seen: &mut FxHashMap<String, usize>, text: &str) -> String {
    let mut id = util::slugify(text);
    if id.is_empty() {
        id.push_str("section");
    }

    match seen.get(&id).copied() {
        None => {
            seen.insert(id.clone(), 1);
            id
        }
        Some(mut n) => {
            let mut candidate = format!("{id}-{n}");
            while seen.contains_key(&candidate) {
                n += 1;
                candidate = format!("{id}-{n}");
            }

            seen.insert(id, n + 1);
            seen.insert(candidate.clone(), 1);
            candidate
        }
    }
}

impl Stage for HeadingIds {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn remap<'a, I>(&'a mut self, events: I) -> impl Iterator<Item = Event<'a>> + 'a
        where I: Iterator<Item = Event<'a>> + 'a
    {
        self.seen.clear();

        HeadingIterator {
            seen: &mut self.seen,
            inner: events,
            stack: VecDeque::with_capacity(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen() -> FxHashMap<String, usize> {
        FxHashMap::default()
    }

    #[test]
    fn identical_texts_get_distinct_ids() {
        let mut seen = seen();
        assert_eq!(assign(&mut seen, "Title"), "title");
        assert_eq!(assign(&mut seen, "Title"), "title-1");
        assert_eq!(assign(&mut seen, "Title"), "title-2");
    }

    #[test]
    fn suffixes_never_collide_with_authored_ids() {
        let mut seen = seen();
        // "title-1" plays the part of an authored id recorded earlier.
        seen.insert("title-1".into(), 1);
        assert_eq!(assign(&mut seen, "Title"), "title");
        assert_eq!(assign(&mut seen, "Title"), "title-2");
    }

    #[test]
    fn empty_text_still_yields_an_id() {
        let mut seen = seen();
        assert_eq!(assign(&mut seen, "!!!"), "section");
        assert_eq!(assign(&mut seen, ""), "section-1");
    }
}
