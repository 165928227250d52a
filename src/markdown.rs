//! The boundary to the off-the-shelf markdown converter.
//!
//! The pipeline treats document bodies as opaque until render time; this
//! module feeds them through `pulldown-cmark` with two event interceptions:
//! headings are demoted two levels (subordinate to the site and post
//! titles), and internal links to other source documents (`foo.md`) are
//! rewritten to the target's permalink. A relative link whose target is not a
//! known source file is logged as a warning and left untouched; a broken
//! cross-link is an authoring smell, not a build failure.

use std::path::Path;

use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag};
use url::Url;

use crate::warn;

const MARKDOWN_EXTENSION: &str = ".md";

/// Maps relative source paths (`posts/`-relative, `/`-separated) to their
/// permalinks, for rewriting internal links.
#[derive(Debug, Default)]
pub struct LinkMap {
    targets: std::collections::BTreeMap<String, Url>,
}

impl LinkMap {
    pub fn new() -> LinkMap {
        LinkMap::default()
    }

    pub fn insert(&mut self, source: &Path, url: &Url) {
        self.targets
            .insert(source.to_string_lossy().replace('\\', "/"), url.clone());
    }

    /// Resolves a relative link `target` written in the document at
    /// `source`, returning the permalink it should point at.
    fn resolve(&self, source: &Path, target: &str) -> Option<&Url> {
        let from_dir = source.parent().unwrap_or_else(|| Path::new(""));
        self.targets.get(&normalize(from_dir, target))
    }
}

/// Joins `target` onto `from_dir` and collapses `.` and `..` components into
/// a `/`-separated key.
fn normalize(from_dir: &Path, target: &str) -> String {
    let mut components: Vec<&str> = from_dir
        .to_str()
        .unwrap_or_default()
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect();
    for component in target.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }
    components.join("/")
}

/// True for link targets this pipeline may rewrite: relative paths into the
/// source tree, as opposed to absolute URLs, anchors, or scheme-ful links.
fn is_internal(target: &str) -> bool {
    !target.is_empty()
        && !target.starts_with('/')
        && !target.starts_with('#')
        && !target.contains(':')
}

/// Converts markdown to HTML, appending the result to `out`. `source` is the
/// relative path of the document being converted, used both to resolve its
/// relative links and to attribute warnings.
pub fn to_html(out: &mut String, markdown: &str, source: &Path, links: &LinkMap) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(tag) => Event::Start(convert_tag(tag, source, links)),
        // End events carry the heading level too; both sides must agree or
        // the output closes with the original tag.
        Event::End(Tag::Heading(level)) => Event::End(Tag::Heading(demote(level))),
        other => other,
    });
    html::push_html(out, events);
}

/// Post headings sit below the site title (h1) and the post title (h2), so
/// `#` becomes h3, clamped at h6.
fn demote(level: u32) -> u32 {
    (level + 2).min(6)
}

fn convert_tag<'a>(tag: Tag<'a>, source: &Path, links: &LinkMap) -> Tag<'a> {
    match tag {
        Tag::Heading(level) => Tag::Heading(demote(level)),

        Tag::Link(
            kind @ (LinkType::Inline
            | LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Shortcut
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown),
            target,
            title,
        ) if is_internal(&target) && target.ends_with(MARKDOWN_EXTENSION) => {
            match links.resolve(source, &target) {
                Some(url) => Tag::Link(
                    kind,
                    CowStr::Boxed(url.to_string().into_boxed_str()),
                    title,
                ),
                None => {
                    warn!("link"; "{}: unknown internal link target `{}`", source.display(), target);
                    Tag::Link(kind, target, title)
                }
            }
        }
        other => other,
    }
}
