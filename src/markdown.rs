//! Converts markdown bodies to HTML. This is the only place that knows about
//! `pulldown_cmark`; the rest of the crate treats [`to_html`] as an opaque
//! `render(text) -> html` function.

use std::collections::HashSet;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};

use crate::slug::path_segment;

// The id given to a heading whose text yields no path segment.
const FALLBACK_HEADING_ID: &str = "section";

/// Converts `markdown` to HTML.
///
/// * `base_path` is the site's base path (e.g., `/blog-root`, or empty for a
///   site deployed at the domain root). Root-relative link and image
///   destinations are prefixed with it so that a post linking to `/about/`
///   still resolves when the site is deployed under a sub-path.
///
/// Every heading gets an `id` derived from its text plus a trailing
/// `header-anchor` permalink, so `#section` links work.
pub fn to_html(markdown: &str, base_path: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let event_converter = EventConverter { base_path };
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    let events = anchor_headings(
        Parser::new_ext(markdown, options).map(|ev| event_converter.convert(ev)),
    );
    html::push_html(&mut out, events.into_iter());
    out
}

// Replaces each heading's start and end tags with raw HTML carrying an id
// and a permalink. A heading's events are buffered until it closes because
// the id depends on its full text.
fn anchor_headings<'b, I>(events: I) -> Vec<Event<'b>>
where
    I: Iterator<Item = Event<'b>>,
{
    let mut out = Vec::new();
    let mut ids = HeadingIds::default();
    let mut open: Option<(u32, Vec<Event<'b>>)> = None;

    for ev in events {
        open = match (open, ev) {
            (None, Event::Start(Tag::Heading(level))) => Some((level, Vec::new())),
            (None, ev) => {
                out.push(ev);
                None
            }
            (Some((level, inner)), Event::End(Tag::Heading(_))) => {
                let id = ids.next(&heading_text(&inner));
                out.push(Event::Html(
                    format!(r#"<h{} id="{}" tabindex="-1">"#, level, id).into(),
                ));
                out.extend(inner);
                out.push(Event::Html(
                    format!(
                        r##" <a class="header-anchor" href="#{}" aria-hidden="true">#</a></h{}>"##,
                        id, level
                    )
                    .into(),
                ));
                out.push(Event::Html(CowStr::Borrowed("\n")));
                None
            }
            (Some((level, mut inner)), ev) => {
                inner.push(ev);
                Some((level, inner))
            }
        };
    }
    out
}

fn heading_text(events: &[Event]) -> String {
    let mut text = String::new();
    for ev in events {
        if let Event::Text(s) | Event::Code(s) = ev {
            text.push_str(s);
        }
    }
    text
}

// Hands out unique heading ids within one document: a repeated id gets
// `-1`, `-2`, ... appended.
#[derive(Default)]
struct HeadingIds(HashSet<String>);

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let base = match path_segment(text) {
            segment if segment.is_empty() => FALLBACK_HEADING_ID.to_owned(),
            segment => segment,
        };
        let mut id = base.clone();
        let mut n = 0;
        while self.0.contains(&id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }
        self.0.insert(id.clone());
        id
    }
}

struct EventConverter<'a> {
    base_path: &'a str,
}

impl<'a> EventConverter<'a> {
    fn convert_tag<'b>(&self, tag: Tag<'b>) -> Tag<'b> {
        match tag {
            Tag::Link(link, url, title) if Self::is_internal(link) => {
                Tag::Link(link, self.convert_url(url), title)
            }
            Tag::Image(link, url, title) if Self::is_internal(link) => {
                Tag::Image(link, self.convert_url(url), title)
            }
            _ => tag,
        }
    }

    // Autolinks and emails are always absolute, so there's nothing to
    // rebase.
    fn is_internal(link: LinkType) -> bool {
        !matches!(link, LinkType::Autolink | LinkType::Email)
    }

    fn convert_url<'b>(&self, url: CowStr<'b>) -> CowStr<'b> {
        match rebase(self.base_path, &url) {
            Some(rebased) => CowStr::Boxed(rebased.into_boxed_str()),
            None => url,
        }
    }

    fn convert<'b>(&self, ev: Event<'b>) -> Event<'b> {
        match ev {
            Event::Start(tag) => Event::Start(self.convert_tag(tag)),
            Event::End(tag) => Event::End(self.convert_tag(tag)),
            _ => ev,
        }
    }
}

/// Prefixes a root-relative `url` with `base_path`. Returns `None` when the
/// URL should be left alone: there is no base path, the URL isn't
/// root-relative, it's protocol-relative (`//host/...`), or it already starts
/// with the base path.
fn rebase(base_path: &str, url: &str) -> Option<String> {
    if base_path.is_empty() || !url.starts_with('/') || url.starts_with("//") {
        return None;
    }
    if url == base_path
        || url
            .strip_prefix(base_path)
            .map_or(false, |rest| rest.starts_with('/'))
    {
        return None;
    }
    Some(format!("{}{}", base_path, url))
}
