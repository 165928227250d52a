//! Templates rendered documents into output HTML files: one page per
//! document plus the chronological and taxonomy listings.
//!
//! Every output page is an `index.html` inside its own directory, so
//! permalinks stay extension-free. Templates receive a `Value::Object` with
//! an `item` field (the document, or the listing page), `prev`/`next`
//! navigation URLs, and the site-level `home_page` and `feed_url`.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use gtmpl::{Template, Value};
use thiserror::Error;
use url::Url;

use crate::page::{self, PageSlice};
use crate::permalink::Permalink;
use crate::post::Document;
use crate::repo::Repository;
use crate::taxonomy::{Kind, Term};
use crate::{debug, log};

/// A document whose markdown has been converted to HTML. The slice handed to
/// [`Writer::write_site`] is parallel to the repository's published sequence.
pub struct RenderedPost<'a> {
    pub document: &'a Document,
    pub permalink: &'a Permalink,
    /// Full body HTML.
    pub body: String,
    /// Above-the-fold HTML for listing and feed contexts.
    pub summary: String,
    /// Whether `summary` is a truncation of `body`.
    pub summarized: bool,
}

/// Templates pages and writes them to disk.
pub struct Writer<'a> {
    pub post_template: &'a Template,
    pub listing_template: &'a Template,
    pub output_directory: &'a Path,
    pub base_url: &'a Url,
    pub page_size: usize,
    /// Title for the site-wide chronological listing.
    pub site_title: &'a str,
    pub home_page: &'a Url,
    pub feed_url: &'a Url,
}

impl<'a> Writer<'a> {
    /// Writes every post page and every listing page. `posts` must be in the
    /// repository's published order, since listing membership is expressed
    /// as indexes into that sequence.
    pub fn write_site(&self, posts: &[RenderedPost], repo: &Repository) -> Result<(), Error> {
        let mut pages = self.post_pages(posts)?;
        pages.extend(self.listing_pages(self.site_title, "", &posts.iter().collect::<Vec<_>>())?);
        let terms = repo
            .taxonomy()
            .categories()
            .map(|term| (Kind::Category, term))
            .chain(repo.taxonomy().tags().map(|term| (Kind::Tag, term)));
        for (kind, term) in terms {
            pages.extend(self.term_pages(kind, term, posts)?);
        }

        log!("write"; "writing {} pages under {}", pages.len(), self.output_directory.display());
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for page in &pages {
            if let Some(dir) = page.file.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            self.write_page(page)?;
        }
        Ok(())
    }

    fn post_pages(&self, posts: &[RenderedPost]) -> Result<Vec<OutputPage<'a>>, Error> {
        posts
            .iter()
            .enumerate()
            .map(|(i, post)| {
                Ok(OutputPage {
                    item: post_value(post, self.base_url)?,
                    file: self.output_directory.join(post.permalink.rel_file()),
                    // `posts` is newest-first, so the previous (newer) post
                    // sits at i - 1.
                    prev: (i > 0).then(|| posts[i - 1].permalink.url.clone()),
                    next: (i + 1 < posts.len()).then(|| posts[i + 1].permalink.url.clone()),
                    template: self.post_template,
                })
            })
            .collect()
    }

    fn term_pages(
        &self,
        kind: Kind,
        term: &Term,
        posts: &[RenderedPost],
    ) -> Result<Vec<OutputPage<'a>>, Error> {
        let members: Vec<&RenderedPost> = term
            .members()
            .iter()
            .map(|&index| &posts[index])
            .collect();
        self.listing_pages(
            &term.name,
            &format!("{}/{}", kind.as_str(), term.slug),
            &members,
        )
    }

    /// Paginates `members` into listing pages rooted at `base` (`""` for the
    /// chronological listing).
    fn listing_pages(
        &self,
        title: &str,
        base: &str,
        members: &[&RenderedPost],
    ) -> Result<Vec<OutputPage<'a>>, Error> {
        page::paginate(members, self.page_size)
            .into_iter()
            .map(|slice| {
                let prev = self.neighbor_url(base, slice.prev())?;
                let next = self.neighbor_url(base, slice.next())?;
                Ok(OutputPage {
                    item: listing_value(title, &slice, self.base_url)?,
                    file: self
                        .output_directory
                        .join(page::page_file(base, slice.number)),
                    prev,
                    next,
                    template: self.listing_template,
                })
            })
            .collect()
    }

    fn neighbor_url(&self, base: &str, number: Option<usize>) -> Result<Option<Url>, Error> {
        number
            .map(|n| page::page_url(self.base_url, base, n))
            .transpose()
            .map_err(Error::from)
    }

    fn write_page(&self, page: &OutputPage) -> Result<(), Error> {
        debug!("write"; "{}", page.file.display());
        let mut value = page.to_value();
        if let Value::Object(object) = &mut value {
            object.insert(
                "home_page".to_owned(),
                Value::String(self.home_page.to_string()),
            );
            object.insert(
                "feed_url".to_owned(),
                Value::String(self.feed_url.to_string()),
            );
        }
        page.template.execute(
            &mut File::create(&page.file)?,
            &gtmpl::Context::from(value).map_err(Error::Template)?,
        )?;
        Ok(())
    }
}

/// One output HTML file, ready to template.
struct OutputPage<'a> {
    /// The page's main item: a post object or a listing object.
    item: Value,
    file: PathBuf,
    prev: Option<Url>,
    next: Option<Url>,
    template: &'a Template,
}

impl OutputPage<'_> {
    fn to_value(&self) -> Value {
        let url_or_nil = |url: &Option<Url>| match url {
            Some(url) => Value::String(url.to_string()),
            None => Value::Nil,
        };

        let mut object: HashMap<String, Value> = HashMap::new();
        object.insert("item".to_owned(), self.item.clone());
        object.insert("prev".to_owned(), url_or_nil(&self.prev));
        object.insert("next".to_owned(), url_or_nil(&self.next));
        Value::Object(object)
    }
}

/// The template value for a full post page.
fn post_value(post: &RenderedPost, base_url: &Url) -> Result<Value, Error> {
    let mut object = post_metadata(post, base_url)?;
    object.insert("body".to_owned(), Value::String(post.body.clone()));
    Ok(Value::Object(object))
}

/// The template value for a post inside a listing: summary instead of body,
/// plus a flag the theme can use to render a "read more" link.
fn summary_value(post: &RenderedPost, base_url: &Url) -> Result<Value, Error> {
    let mut object = post_metadata(post, base_url)?;
    object.insert("summary".to_owned(), Value::String(post.summary.clone()));
    object.insert("summarized".to_owned(), Value::Bool(post.summarized));
    Ok(Value::Object(object))
}

fn post_metadata(post: &RenderedPost, base_url: &Url) -> Result<HashMap<String, Value>, Error> {
    let mut object: HashMap<String, Value> = HashMap::new();
    object.insert(
        "title".to_owned(),
        Value::String(post.document.title.clone()),
    );
    object.insert(
        "date".to_owned(),
        Value::String(post.document.date.format("%Y-%m-%d").to_string()),
    );
    object.insert(
        "url".to_owned(),
        Value::String(post.permalink.url.to_string()),
    );
    object.insert(
        "author".to_owned(),
        match &post.document.author {
            Some(author) => Value::String(author.clone()),
            None => Value::Nil,
        },
    );
    object.insert(
        "categories".to_owned(),
        term_links(&post.document.categories, Kind::Category, base_url)?,
    );
    object.insert(
        "tags".to_owned(),
        term_links(&post.document.tags, Kind::Tag, base_url)?,
    );
    Ok(object)
}

/// Term references as `{name, url}` objects. The URLs are built against the
/// base URL exactly the way the listing writer builds its page URLs, so a
/// chip always points at the first listing page for that term, including
/// when the base URL carries a path prefix.
fn term_links(names: &[String], kind: Kind, base_url: &Url) -> Result<Value, Error> {
    let mut items = Vec::new();
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let listing = format!("{}/{}", kind.as_str(), slug::slugify(name));
        let url = page::page_url(base_url, &listing, 1)?;
        let mut object: HashMap<String, Value> = HashMap::new();
        object.insert("name".to_owned(), Value::String(name.to_owned()));
        object.insert("url".to_owned(), Value::String(url.to_string()));
        items.push(Value::Object(object));
    }
    Ok(Value::Array(items))
}

fn listing_value(
    title: &str,
    slice: &PageSlice<&RenderedPost>,
    base_url: &Url,
) -> Result<Value, Error> {
    let mut object: HashMap<String, Value> = HashMap::new();
    object.insert("title".to_owned(), Value::String(title.to_owned()));
    object.insert("page".to_owned(), Value::from(slice.number as u64));
    object.insert("total_pages".to_owned(), Value::from(slice.total as u64));
    let posts = slice
        .items
        .iter()
        .map(|post| summary_value(post, base_url))
        .collect::<Result<Vec<Value>, Error>>()?;
    object.insert("posts".to_owned(), Value::Array(posts));
    Ok(Value::Object(object))
}

#[derive(Debug, Error)]
pub enum Error {
    /// An error during templating.
    #[error("template: {0}")]
    Template(String),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::permalink::{Pattern, Resolver, DEFAULT_PATTERN};

    fn document(path: &str, date: &str) -> Document {
        Document {
            source_path: PathBuf::from(path),
            title: format!("Title of {path}"),
            date: crate::frontmatter::parse_date(date).unwrap(),
            author: None,
            categories: Vec::new(),
            tags: vec!["Rust".to_owned()],
            draft: false,
            body: format!("body of {path}"),
        }
    }

    fn template(text: &str) -> Template {
        let mut template = Template::default();
        template.parse(text).unwrap();
        template
    }

    struct Fixture {
        repo: Repository,
        documents: Vec<Document>,
        permalinks: Vec<Permalink>,
    }

    fn fixture(paths_and_dates: &[(&str, &str)]) -> Fixture {
        let resolver = Resolver::new(
            Url::parse("https://example.org/").unwrap(),
            Pattern::parse(DEFAULT_PATTERN).unwrap(),
        );
        let documents: Vec<Document> = paths_and_dates
            .iter()
            .map(|&(path, date)| document(path, date))
            .collect();
        let repo = Repository::build(documents, &resolver, false).unwrap();
        let documents: Vec<Document> = repo.all().to_vec();
        let permalinks: Vec<Permalink> = (0..repo.len())
            .map(|i| repo.permalink(i).clone())
            .collect();
        Fixture {
            repo,
            documents,
            permalinks,
        }
    }

    fn rendered<'a>(fixture: &'a Fixture) -> Vec<RenderedPost<'a>> {
        fixture
            .documents
            .iter()
            .zip(fixture.permalinks.iter())
            .map(|(document, permalink)| RenderedPost {
                document,
                permalink,
                body: format!("<p>{}</p>", document.body),
                summary: format!("<p>{}</p>", document.body),
                summarized: false,
            })
            .collect()
    }

    fn write_site(fixture: &Fixture, dir: &Path, page_size: usize) {
        let base_url = Url::parse("https://example.org/").unwrap();
        let feed_url = base_url.join("feed.xml").unwrap();
        let post_template = template("{{ .item.title }} prev={{ .prev }} next={{ .next }}");
        let listing_template = template(
            "{{ .item.title }}:{{ range .item.posts }} {{ .title }}{{ end }} next={{ .next }}",
        );
        let writer = Writer {
            post_template: &post_template,
            listing_template: &listing_template,
            output_directory: dir,
            base_url: &base_url,
            page_size,
            site_title: "Example Site",
            home_page: &base_url,
            feed_url: &feed_url,
        };
        writer.write_site(&rendered(fixture), &fixture.repo).unwrap();
    }

    const THREE_POSTS: &[(&str, &str)] = &[
        ("first.md", "2024-01-31"),
        ("second.md", "2024-02-02"),
        ("third.md", "2024-02-06"),
    ];

    #[test]
    fn test_post_pages_and_navigation() {
        let dir = tempfile::tempdir().unwrap();
        write_site(&fixture(THREE_POSTS), dir.path(), 10);

        let newest =
            fs::read_to_string(dir.path().join("post/2024/02/06/third/index.html")).unwrap();
        assert!(newest.contains("Title of third.md"), "got: {newest}");
        // The newest post has no newer neighbor.
        assert!(!newest.contains("prev=https"), "got: {newest}");
        assert!(
            newest.contains("next=https://example.org/post/2024/02/02/second/"),
            "got: {newest}",
        );

        let middle =
            fs::read_to_string(dir.path().join("post/2024/02/02/second/index.html")).unwrap();
        assert!(
            middle.contains("prev=https://example.org/post/2024/02/06/third/"),
            "got: {middle}",
        );
    }

    #[test]
    fn test_chronological_listing_is_paginated() {
        let dir = tempfile::tempdir().unwrap();
        write_site(&fixture(THREE_POSTS), dir.path(), 2);

        let front = fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(front.contains("Example Site:"), "got: {front}");
        assert!(
            front.contains("Title of third.md") && front.contains("Title of second.md"),
            "got: {front}",
        );
        assert!(!front.contains("Title of first.md"), "got: {front}");
        assert!(
            front.contains("next=https://example.org/page/2/"),
            "got: {front}",
        );

        let second = fs::read_to_string(dir.path().join("page/2/index.html")).unwrap();
        assert!(second.contains("Title of first.md"), "got: {second}");
        assert!(!second.contains("next=https"), "got: {second}");
    }

    #[test]
    fn test_tag_listing_contains_every_member() {
        let dir = tempfile::tempdir().unwrap();
        write_site(&fixture(THREE_POSTS), dir.path(), 10);

        let listing = fs::read_to_string(dir.path().join("tag/rust/index.html")).unwrap();
        assert!(listing.contains("Rust:"), "got: {listing}");
        for stem in ["third", "second", "first"] {
            assert!(listing.contains(&format!("Title of {stem}.md")), "got: {listing}");
        }
    }

    fn term_urls(links: Value) -> Vec<String> {
        match links {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(object) => match object.get("url") {
                        Some(Value::String(url)) => url.clone(),
                        other => panic!("expected url string, got {other:?}"),
                    },
                    other => panic!("expected object, got {other:?}"),
                })
                .collect(),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_term_links_skip_blank_names() {
        let base = Url::parse("https://example.org/").unwrap();
        let links = term_links(&["Rust".to_owned(), "  ".to_owned()], Kind::Tag, &base).unwrap();
        assert_eq!(term_urls(links), ["https://example.org/tag/rust/"]);
    }

    #[test]
    fn test_term_links_respect_base_url_path() {
        // A base URL with a path prefix must keep it; the chip has to land
        // on the same URL the listing writer publishes under.
        let base = Url::parse("https://example.org/blog/").unwrap();
        let links = term_links(&["Rust".to_owned()], Kind::Tag, &base).unwrap();
        let expected = page::page_url(&base, "tag/rust", 1).unwrap();
        assert_eq!(expected.as_str(), "https://example.org/blog/tag/rust/");
        assert_eq!(term_urls(links), [expected.as_str()]);
    }
}
