//! Defines the [`Document`] type and the logic for parsing documents from the
//! file system into memory. Parsing one document has no cross-document
//! dependency, so [`parse_posts`] fans the source files out over a worker
//! pool; the caller assembles the results into a
//! [`crate::repo::Repository`], which acts as the barrier before any
//! downstream component runs.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::cache::Cache;
use crate::frontmatter;

const MARKDOWN_EXTENSION: &str = "md";

/// The excerpt marker: body text above it becomes the document's summary.
pub const FOLD_TAG: &str = "<!-- more -->";

/// Fallback summary length (in bytes, truncated to a character boundary) for
/// documents without an explicit excerpt marker.
const SUMMARY_LIMIT: usize = 480;

/// One parsed source document. Created once per build from a source file and
/// immutable thereafter; everything derived from it (taxonomy membership,
/// permalinks, pages) lives in separate lookup tables rather than on the
/// document itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Source file path relative to the posts directory. Doubles as the
    /// deterministic tie-break key when publish dates are equal.
    pub source_path: PathBuf,
    pub title: String,
    pub date: NaiveDateTime,
    pub author: Option<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub draft: bool,
    /// Raw body text, opaque until the markdown converter runs at render
    /// time.
    pub body: String,
}

impl Document {
    /// The source file stem, from which the document's slug is derived.
    pub fn stem(&self) -> &str {
        self.source_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    /// Returns the document's summary text and whether it was truncated. The
    /// summary is everything above the [`FOLD_TAG`] marker when present,
    /// otherwise a fixed-length prefix cut at a character boundary so
    /// multi-byte characters are never split.
    pub fn summary(&self) -> (&str, bool) {
        if let Some(i) = self.body.find(FOLD_TAG) {
            return (self.body[..i].trim_end(), true);
        }
        if self.body.len() <= SUMMARY_LIMIT {
            return (&self.body, false);
        }
        let mut end = SUMMARY_LIMIT;
        while !self.body.is_char_boundary(end) {
            end -= 1;
        }
        (&self.body[..end], true)
    }
}

/// The site-wide chronological rule: publish date descending, source path
/// ascending when dates are equal. Every ordered sequence in the build (the
/// site index, taxonomy member lists, listing pages) uses this one rule.
pub fn chronological(a: &Document, b: &Document) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| a.source_path.cmp(&b.source_path))
}

/// Walks `source_directory` for post files (extension `.md`) and parses each
/// into a [`Document`]. With `threads >= 2` the files are parsed on a worker
/// pool; the result order is unspecified either way, since chronological
/// order is always recomputed by the repository.
///
/// When a `cache` is provided, each file's content hash is checked against it
/// before parsing and hits are reused.
pub fn parse_posts(
    source_directory: &Path,
    threads: usize,
    cache: Option<&Cache>,
) -> Result<Vec<Document>, Error> {
    let entries = scan(source_directory)?;
    if threads < 2 {
        entries
            .iter()
            .map(|(relative, absolute)| process_entry(relative, absolute, cache))
            .collect()
    } else {
        parse_posts_parallel(entries, threads, cache)
    }
}

fn parse_posts_parallel(
    entries: Vec<(PathBuf, PathBuf)>,
    threads: usize,
    cache: Option<&Cache>,
) -> Result<Vec<Document>, Error> {
    let (tx, rx) = crossbeam_channel::unbounded::<(PathBuf, PathBuf)>();

    std::thread::scope(|scope| {
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            let rx = rx.clone();
            workers.push(scope.spawn(move || -> Result<Vec<Document>, Error> {
                let mut parsed = Vec::new();
                for (relative, absolute) in rx {
                    parsed.push(process_entry(&relative, &absolute, cache)?);
                }
                Ok(parsed)
            }));
        }
        drop(rx);

        for entry in entries {
            // A send failure means every worker already bailed with an
            // error; the error surfaces at join below.
            if tx.send(entry).is_err() {
                break;
            }
        }
        drop(tx);

        let mut documents = Vec::new();
        for worker in workers {
            documents.extend(worker.join().expect("parser worker panicked")?);
        }
        Ok(documents)
    })
}

/// Collects `(relative, absolute)` paths of every markdown file under
/// `source_directory`, sorted by relative path for determinism.
fn scan(source_directory: &Path) -> Result<Vec<(PathBuf, PathBuf)>, Error> {
    let mut entries = Vec::new();
    for result in walkdir::WalkDir::new(source_directory).sort_by_file_name() {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some(MARKDOWN_EXTENSION) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_directory)
            // source_directory is always an ancestor of its entries
            .expect("walked entry outside the source directory")
            .to_owned();
        entries.push((relative, entry.path().to_owned()));
    }
    entries.sort();
    Ok(entries)
}

fn process_entry(
    relative: &Path,
    absolute: &Path,
    cache: Option<&Cache>,
) -> Result<Document, Error> {
    let contents = fs::read_to_string(absolute).map_err(|source| Error::Read {
        path: relative.to_owned(),
        source,
    })?;

    if let Some(cache) = cache {
        if let Some(document) = cache.lookup(relative, &contents) {
            return Ok(document);
        }
    }

    let (frontmatter, body) =
        frontmatter::parse(&contents).map_err(|source| Error::Document {
            path: relative.to_owned(),
            source,
        })?;

    let document = Document {
        source_path: relative.to_owned(),
        // Both accessors were validated by `frontmatter::parse`.
        title: frontmatter
            .require_title()
            .map_err(annotate(relative))?
            .to_owned(),
        date: frontmatter.require_date().map_err(annotate(relative))?,
        author: frontmatter.author.clone(),
        categories: frontmatter.categories.clone(),
        tags: frontmatter.tags.clone(),
        draft: frontmatter.draft,
        body: body.to_owned(),
    };

    if let Some(cache) = cache {
        cache.store(relative, &contents, &document);
    }
    Ok(document)
}

fn annotate(path: &Path) -> impl Fn(frontmatter::Error) -> Error + '_ {
    move |source| Error::Document {
        path: path.to_owned(),
        source,
    }
}

/// Represents an error parsing documents. Every variant names the offending
/// source file so the fault is locatable without re-running verbose.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a source file's front matter is rejected.
    #[error("{path}: {source}", path = .path.display())]
    Document {
        path: PathBuf,
        source: frontmatter::Error,
    },

    /// Returned when a source file cannot be read.
    #[error("{path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Returned for I/O problems while walking the source tree.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    fn write_post(dir: &Path, name: &str, date: &str, tags: &str) {
        fs::write(
            dir.join(name),
            format!("---\ntitle: {name}\ndate: {date}\ntags: {tags}\n---\nbody of {name}\n"),
        )
        .unwrap();
    }

    fn make(path: &str, date: &str) -> Document {
        Document {
            source_path: PathBuf::from(path),
            title: path.to_owned(),
            date: crate::frontmatter::parse_date(date).unwrap(),
            author: None,
            categories: Vec::new(),
            tags: Vec::new(),
            draft: false,
            body: String::new(),
        }
    }

    #[test]
    fn test_parse_posts() -> Result<(), Error> {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "first.md", "2024-01-31", "[Rust]");
        write_post(dir.path(), "second.md", "2024-02-02", "[Rust]");
        write_post(dir.path(), "third.md", "2024-02-06", "[Rust]");
        fs::write(dir.path().join("notes.txt"), "not a post").unwrap();

        let documents = parse_posts(dir.path(), 1, None)?;
        assert_eq!(documents.len(), 3);
        assert!(documents
            .iter()
            .all(|d| d.tags == vec!["Rust".to_owned()] && !d.draft));
        Ok(())
    }

    #[test]
    fn test_parse_posts_parallel_matches_single_threaded() -> Result<(), Error> {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            write_post(dir.path(), &format!("post-{i:02}.md"), "2024-01-01", "[]");
        }

        let mut single = parse_posts(dir.path(), 1, None)?;
        let mut parallel = parse_posts(dir.path(), 4, None)?;
        single.sort_by(chronological);
        parallel.sort_by(chronological);
        assert_eq!(single, parallel);
        Ok(())
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.md"), "---\ntitle: No date\n---\n").unwrap();

        let err = parse_posts(dir.path(), 1, None).unwrap_err();
        assert!(err.to_string().contains("broken.md"), "got: {err}");
        assert!(err.to_string().contains("date"), "got: {err}");
    }

    #[test]
    fn test_nested_directories_are_scanned() -> Result<(), Error> {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("2024")).unwrap();
        write_post(&dir.path().join("2024"), "nested.md", "2024-03-01", "[]");

        let documents = parse_posts(dir.path(), 1, None)?;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].source_path, PathBuf::from("2024/nested.md"));
        Ok(())
    }

    #[test]
    fn test_summary_fold_tag() {
        let mut document = make("a.md", "2024-01-01");
        document.body = format!("above the fold\n\n{FOLD_TAG}\n\nbelow the fold");
        assert_eq!(document.summary(), ("above the fold", true));
    }

    #[test]
    fn test_summary_never_splits_a_character() {
        let mut document = make("a.md", "2024-01-01");
        document.body = "é".repeat(SUMMARY_LIMIT);
        let (summary, truncated) = document.summary();
        assert!(truncated);
        assert!(summary.len() <= SUMMARY_LIMIT);
        assert!(summary.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_short_body_is_not_truncated() {
        let mut document = make("a.md", "2024-01-01");
        document.body = "short".to_owned();
        assert_eq!(document.summary(), ("short", false));
    }

    #[test]
    fn test_chronological_tie_break() {
        let newer = make("z.md", "2024-02-06");
        let older = make("a.md", "2024-01-31");
        let older_sibling = make("b.md", "2024-01-31");

        assert_eq!(chronological(&newer, &older), Ordering::Less);
        assert_eq!(chronological(&older, &older_sibling), Ordering::Less);
    }
}
