//! Stitches together the high-level steps of a build: parsing the source
//! documents ([`crate::post`]), freezing them into the repository
//! ([`crate::repo`]), rendering markdown bodies ([`crate::markdown`]),
//! writing post and listing pages ([`crate::write`]), and generating the
//! Atom feed ([`crate::feed`]).
//!
//! A build is all-or-nothing: any error aborts before the output directory
//! is replaced, and two builds over the same source tree produce
//! byte-identical output.

use std::fs::File;
use std::path::{Path, PathBuf};

use gtmpl::Template;
use thiserror::Error;

use crate::cache::Cache;
use crate::config::Config;
use crate::feed::{self, FeedConfig, FEED_FILE};
use crate::log;
use crate::markdown::{self, LinkMap};
use crate::permalink::Resolver;
use crate::post;
use crate::repo::{self, Repository};
use crate::write::{self, RenderedPost, Writer};

/// Builds the site described by `config` from scratch.
pub fn build_site(config: &Config) -> Result<()> {
    build_site_with_cache(config, None)
}

/// Builds the site, reusing parses from `cache` for source files whose
/// contents are unchanged. Long-running callers (a watch loop) pass the same
/// cache across builds; one-shot builds pass `None`.
pub fn build_site_with_cache(config: &Config, cache: Option<&Cache>) -> Result<()> {
    let documents = post::parse_posts(&config.posts_source_directory, config.threads, cache)?;
    log!("build"; "parsed {} documents from {}", documents.len(), config.posts_source_directory.display());

    let resolver = Resolver::new(config.base_url.clone(), config.permalink_pattern.clone());
    let repo = Repository::build(documents, &resolver, config.include_drafts)?;
    if repo.draft_count() > 0 {
        log!("build"; "excluding {} drafts (use --drafts to include them)", repo.draft_count());
    }

    let post_template = parse_template(config.post_template.iter())?;
    let listing_template = parse_template(config.listing_template.iter())?;

    // Markdown stays opaque until here. The link map covers drafts too, so a
    // published post may point at a draft's future location.
    let mut links = LinkMap::new();
    for (document, permalink) in repo.entries() {
        links.insert(&document.source_path, &permalink.url);
    }
    for (document, permalink) in repo.draft_entries() {
        links.insert(&document.source_path, &permalink.url);
    }
    let posts = render_posts(&repo, &links);

    // Everything that can fail before touching disk has run; now replace the
    // output tree. Only the managed output directory is deleted, never
    // anything above it.
    rmdir(&config.output_directory)?;
    std::fs::create_dir_all(&config.output_directory)?;

    let feed_url = config
        .base_url
        .join(FEED_FILE)
        .map_err(write::Error::from)?;
    let writer = Writer {
        post_template: &post_template,
        listing_template: &listing_template,
        output_directory: &config.output_directory,
        base_url: &config.base_url,
        page_size: config.page_size,
        site_title: &config.title,
        home_page: &config.base_url,
        feed_url: &feed_url,
    };
    writer.write_site(&posts, &repo)?;

    let entries: Vec<_> = repo.entries().take(config.feed_size).collect();
    feed::write_feed(
        &FeedConfig {
            title: config.title.clone(),
            author: config.author.clone(),
            home_page: config.base_url.clone(),
            feed_url,
        },
        &entries,
        File::create(config.output_directory.join(FEED_FILE))?,
    )?;

    log!("build"; "wrote {} posts to {}", repo.len(), config.output_directory.display());
    Ok(())
}

/// Converts every published document's body and summary to HTML, in
/// repository order.
fn render_posts<'a>(repo: &'a Repository, links: &LinkMap) -> Vec<RenderedPost<'a>> {
    repo.entries()
        .map(|(document, permalink)| {
            let mut body = String::new();
            markdown::to_html(&mut body, &document.body, &document.source_path, links);
            let (summary_markdown, summarized) = document.summary();
            let mut summary = String::new();
            markdown::to_html(&mut summary, summary_markdown, &document.source_path, links);
            RenderedPost {
                document,
                permalink,
                body,
                summary,
                summarized,
            }
        })
        .collect()
}

/// Loads the listed template files, concatenates their contents, and parses
/// the result into a template. Splitting a template across files lets themes
/// share a base layout.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .map_err(|err| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err,
            })?
            .read_to_string(&mut contents)?;
        contents.push(' ');
    }

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

/// Removes `dir` and everything under it; a missing directory is fine.
fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) => match err.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] post::Error),

    #[error(transparent)]
    Repo(#[from] repo::Error),

    #[error(transparent)]
    Write(#[from] write::Error),

    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error("cleaning directory `{path}`: {err}", path = .path.display())]
    Clean { path: PathBuf, err: std::io::Error },

    #[error("opening template file `{path}`: {err}", path = .path.display())]
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    #[error("parsing template: {0}")]
    ParseTemplate(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;
    use crate::config::Options;

    const POST_TEMPLATE: &str =
        "<h2>{{ .item.title }}</h2>{{ .item.body }}<a href=\"{{ .home_page }}\">home</a>";
    const LISTING_TEMPLATE: &str = "<h1>{{ .item.title }}</h1>\
        {{ range .item.posts }}<article><a href=\"{{ .url }}\">{{ .title }}</a>\
        {{ .summary }}</article>{{ end }}";

    fn write_file(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Lays out a complete project with three posts tagged `Rust`.
    fn project(root: &Path, extra_project_yaml: &str) {
        write_file(
            &root.join("beorc.yaml"),
            &format!("title: Example Site\nbase_url: https://example.org/\n{extra_project_yaml}"),
        );
        write_file(
            &root.join("theme/theme.yaml"),
            "post_template: [post.html]\nlisting_template: [listing.html]\n",
        );
        write_file(&root.join("theme/post.html"), POST_TEMPLATE);
        write_file(&root.join("theme/listing.html"), LISTING_TEMPLATE);

        for (name, date) in [
            ("first.md", "2024-01-31"),
            ("second.md", "2024-02-02"),
            ("third.md", "2024-02-06"),
        ] {
            write_file(
                &root.join("posts").join(name),
                &format!(
                    "---\ntitle: Title of {name}\ndate: {date}\ntags: [Rust]\n---\nBody of {name}.\n"
                ),
            );
        }
    }

    fn config(root: &Path, extra_project_yaml: &str) -> Config {
        project(root, extra_project_yaml);
        Config::from_directory(
            root,
            Options {
                threads: Some(1),
                ..Options::default()
            },
        )
        .unwrap()
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join("public").join(rel)).unwrap()
    }

    #[test]
    fn test_full_build() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        build_site(&config(dir.path(), ""))?;

        let post = read(dir.path(), "post/2024/02/06/third/index.html");
        assert!(post.contains("<h2>Title of third.md</h2>"), "got: {post}");
        assert!(post.contains("<p>Body of third.md.</p>"), "got: {post}");

        let front = read(dir.path(), "index.html");
        assert!(front.contains("<h1>Example Site</h1>"), "got: {front}");
        // Newest first.
        let third = front.find("Title of third.md").unwrap();
        let first = front.find("Title of first.md").unwrap();
        assert!(third < first, "got: {front}");
        Ok(())
    }

    #[test]
    fn test_listing_pagination() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        build_site(&config(dir.path(), "page_size: 2\n"))?;

        let front = read(dir.path(), "index.html");
        assert!(front.contains("Title of third.md"), "got: {front}");
        assert!(front.contains("Title of second.md"), "got: {front}");
        assert!(!front.contains("Title of first.md"), "got: {front}");

        let second = read(dir.path(), "page/2/index.html");
        assert!(second.contains("Title of first.md"), "got: {second}");
        assert!(!dir.path().join("public/page/3").exists());
        Ok(())
    }

    #[test]
    fn test_tag_listing() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        build_site(&config(dir.path(), ""))?;

        let listing = read(dir.path(), "tag/rust/index.html");
        assert!(listing.contains("<h1>Rust</h1>"), "got: {listing}");
        for name in ["first.md", "second.md", "third.md"] {
            assert!(listing.contains(&format!("Title of {name}")), "got: {listing}");
        }
        Ok(())
    }

    #[test]
    fn test_feed_respects_feed_size() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        build_site(&config(dir.path(), "feed_size: 2\n"))?;

        let feed = read(dir.path(), "feed.xml");
        assert!(feed.contains("Title of third.md"), "got: {feed}");
        assert!(feed.contains("Title of second.md"), "got: {feed}");
        assert!(!feed.contains("Title of first.md"), "got: {feed}");
        Ok(())
    }

    #[test]
    fn test_rebuild_is_byte_identical() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "");
        build_site(&config)?;
        let first: Vec<(PathBuf, Vec<u8>)> = snapshot(&config.output_directory);
        build_site(&config)?;
        assert_eq!(first, snapshot(&config.output_directory));
        Ok(())
    }

    #[test]
    fn test_internal_links_are_rewritten() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "");
        write_file(
            &dir.path().join("posts/linking.md"),
            "---\ntitle: Linking\ndate: 2024-02-07\n---\nSee [the second post](second.md).\n",
        );
        build_site(&config)?;

        let post = read(dir.path(), "post/2024/02/07/linking/index.html");
        assert!(
            post.contains("https://example.org/post/2024/02/02/second/"),
            "got: {post}",
        );
        Ok(())
    }

    #[test]
    fn test_drafts_are_excluded_by_default() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "");
        write_file(
            &dir.path().join("posts/wip.md"),
            "---\ntitle: Work in Progress\ndate: 2024-02-08\ndraft: true\n---\nNot yet.\n",
        );
        build_site(&config)?;

        assert!(!dir.path().join("public/post/2024/02/08/wip").exists());
        let front = read(dir.path(), "index.html");
        assert!(!front.contains("Work in Progress"), "got: {front}");
        Ok(())
    }

    #[test]
    fn test_missing_date_aborts_before_output_is_touched() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "");
        build_site(&config).unwrap();
        let before = snapshot(&config.output_directory);

        write_file(
            &dir.path().join("posts/broken.md"),
            "---\ntitle: No Date\n---\nbody\n",
        );
        let err = build_site(&config).unwrap_err();
        assert!(err.to_string().contains("broken.md"), "got: {err}");
        // The previous output survives a failed build untouched.
        assert_eq!(before, snapshot(&config.output_directory));
    }

    #[test]
    fn test_cache_reuse_produces_identical_output() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), "");
        let cache = Cache::default();
        build_site_with_cache(&config, Some(&cache))?;
        let first = snapshot(&config.output_directory);
        assert_eq!(cache.len(), 3);

        build_site_with_cache(&config, Some(&cache))?;
        assert_eq!(first, snapshot(&config.output_directory));
        Ok(())
    }

    fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                files.push((entry.path().to_owned(), fs::read(entry.path()).unwrap()));
            }
        }
        files
    }
}
