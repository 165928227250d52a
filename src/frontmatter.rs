//! Splits a source document into its front matter and body, and decodes the
//! front matter into a typed [`Frontmatter`] record. This is a pure transform:
//! no I/O happens here, and the body is handed back as an opaque `&str` for
//! the markdown converter to deal with later.
//!
//! A source document must be structured as follows:
//!
//! 1. Initial front-matter fence (`---`)
//! 2. YAML front matter with fields `title`, `date`, and optionally `author`,
//!    `categories`, `tags`, and `draft`
//! 3. Terminal front-matter fence (`---`)
//! 4. Document body
//!
//! For example:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2024-02-06
//! tags: [greet]
//! ---
//! # Hello
//!
//! World
//! ```
//!
//! Unrecognized keys are preserved in [`Frontmatter::extra`] so that a
//! parse/serialize/parse round trip is lossless and future fields are never
//! fatal.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const FENCE: &str = "---";

fn is_false(b: &bool) -> bool {
    !*b
}

/// The decoded front-matter record. `title` and `date` are modeled as options
/// so that their absence can be reported precisely, but [`parse`] guarantees
/// both are present and well-formed before returning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub draft: bool,

    /// Fields the schema doesn't recognize. Preserved verbatim so documents
    /// round-trip and newer fields never break older builds.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Frontmatter {
    /// The validated, non-empty title.
    pub fn require_title(&self) -> Result<&str, Error> {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => Ok(title),
            _ => Err(Error::MissingRequiredField("title")),
        }
    }

    /// The validated publish date.
    pub fn require_date(&self) -> Result<NaiveDateTime, Error> {
        match self.date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => parse_date(date),
            _ => Err(Error::MissingRequiredField("date")),
        }
    }
}

/// Splits `input` into a validated [`Frontmatter`] and the remaining body
/// text. The body starts on the line after the closing fence.
pub fn parse(input: &str) -> Result<(Frontmatter, &str), Error> {
    if !input.starts_with(FENCE) {
        return Err(Error::MalformedMetadata(
            "document must begin with a `---` fence".to_owned(),
        ));
    }
    let rest = &input[FENCE.len()..];
    let offset = closing_fence(rest).ok_or_else(|| {
        Error::MalformedMetadata("missing closing `---` fence".to_owned())
    })?;

    let frontmatter: Frontmatter = serde_yaml::from_str(&rest[..offset])
        .map_err(|e| Error::MalformedMetadata(e.to_string()))?;

    // Fail fast on the required fields so callers never see a half-valid
    // record.
    frontmatter.require_title()?;
    frontmatter.require_date()?;

    let body = rest[offset + 1 + FENCE.len()..]
        .strip_prefix('\n')
        .or_else(|| rest[offset + 1 + FENCE.len()..].strip_prefix("\r\n"))
        .unwrap_or(&rest[offset + 1 + FENCE.len()..]);
    Ok((frontmatter, body))
}

/// Locates the closing fence: the byte offset of a newline followed by a
/// line that is exactly `---`. A line that merely starts with `---` (which
/// YAML permits inside quoted and block scalars) does not end the block.
fn closing_fence(rest: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(i) = rest[from..].find("\n---") {
        let at = from + i;
        let after = &rest[at + 1 + FENCE.len()..];
        if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Parses a publish date. Accepts a plain calendar date (`2024-02-06`), a
/// date-time with or without a `T` separator, or a full RFC 3339 timestamp
/// (normalized to its UTC naive form).
pub fn parse_date(s: &str) -> Result<NaiveDateTime, Error> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(Error::InvalidDate(s.to_owned()))
}

/// Represents an error decoding a document's front matter. All variants are
/// build-fatal; the caller annotates them with the offending source path.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// The metadata block is absent, unclosed, or not a decodable mapping.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// `title` or `date` is absent or empty.
    #[error("missing required field `{0}`")]
    MissingRequiredField(&'static str),

    /// The date string cannot be parsed to a calendar date.
    #[error("invalid date `{0}`: expected ISO-8601, e.g. `2024-02-06` or `2024-02-06T08:30:00`")]
    InvalidDate(String),
}
