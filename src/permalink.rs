//! Resolves each document to a slug and a canonical output location.
//!
//! A slug is derived from the source file stem (not the title, so retitling a
//! post never moves it), and the output location comes from expanding the
//! configured permalink pattern, e.g. `post/:year/:month/:day/:slug`. Both
//! are pure functions of the document, which is what makes two builds over
//! the same tree byte-identical.

use chrono::{Datelike, NaiveDateTime};
use thiserror::Error;
use url::Url;

use crate::post::Document;

/// The default permalink pattern for post pages.
pub const DEFAULT_PATTERN: &str = "post/:year/:month/:day/:slug";

/// A parsed permalink pattern: a `/`-separated sequence of literal components
/// and placeholder tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    segments: Vec<Segment>,
    raw: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Year,
    Month,
    Day,
    Slug,
}

impl Pattern {
    /// Parses a pattern string. Recognized tokens are `:year`, `:month`,
    /// `:day`, and `:slug`; anything else starting with `:` is rejected so a
    /// typo never silently becomes a literal path component.
    pub fn parse(raw: &str) -> Result<Pattern, Error> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(Error::EmptyPattern);
        }
        let segments = trimmed
            .split('/')
            .map(|component| match component {
                ":year" => Ok(Segment::Year),
                ":month" => Ok(Segment::Month),
                ":day" => Ok(Segment::Day),
                ":slug" => Ok(Segment::Slug),
                other if other.starts_with(':') => Err(Error::UnknownToken {
                    token: other.to_owned(),
                    pattern: raw.to_owned(),
                }),
                other => Ok(Segment::Literal(other.to_owned())),
            })
            .collect::<Result<_, _>>()?;
        Ok(Pattern {
            segments,
            raw: raw.to_owned(),
        })
    }

    /// Expands the pattern for a slug and date into a relative directory,
    /// e.g. `post/2024/02/06/hello-world`.
    pub fn expand(&self, slug: &str, date: &NaiveDateTime) -> String {
        let components: Vec<String> = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(literal) => literal.clone(),
                Segment::Year => format!("{:04}", date.year()),
                Segment::Month => format!("{:02}", date.month()),
                Segment::Day => format!("{:02}", date.day()),
                Segment::Slug => slug.to_owned(),
            })
            .collect();
        components.join("/")
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// The resolved output identity of one document or listing: its slug, its
/// output directory relative to the site root, and its absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Permalink {
    pub slug: String,
    /// Relative output directory, e.g. `post/2024/02/06/hello-world`.
    pub rel_dir: String,
    pub url: Url,
}

impl Permalink {
    /// The output file backing this permalink.
    pub fn rel_file(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.rel_dir).join("index.html")
    }
}

/// Computes [`Permalink`]s from documents. Same input, same output, on every
/// run.
#[derive(Debug, Clone)]
pub struct Resolver {
    base_url: Url,
    pattern: Pattern,
}

impl Resolver {
    pub fn new(base_url: Url, pattern: Pattern) -> Resolver {
        Resolver { base_url, pattern }
    }

    pub fn resolve(&self, document: &Document) -> Result<Permalink, Error> {
        let slug = slug::slugify(document.stem());
        let rel_dir = self.pattern.expand(&slug, &document.date);
        let url = self.base_url.join(&format!("{rel_dir}/"))?;
        Ok(Permalink { slug, rel_dir, url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("unknown permalink pattern token `{token}` in `{pattern}`")]
    UnknownToken { token: String, pattern: String },

    #[error("permalink pattern has no components")]
    EmptyPattern,

    #[error(transparent)]
    Url(#[from] url::ParseError),
}
