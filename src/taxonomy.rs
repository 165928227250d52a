//! Derives the category and tag indexes from the published document
//! sequence.
//!
//! Term names are whitespace-trimmed and Unicode-lowercased before being used
//! as map keys, so `Rust` and `rust ` collapse into one term; the display
//! name kept for that key is the first-seen original casing. Member lists are
//! re-sorted by the site-wide chronological rule so a term's listing always
//! agrees with the global listing.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::post::{chronological, Document};
use crate::warn;

/// The taxonomy a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Category,
    Tag,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Category => "category",
            Kind::Tag => "tag",
        }
    }
}

/// One taxonomy term and its members. Members are indexes into the published
/// document sequence, kept in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Display name: the first-seen original casing for this term.
    pub name: String,
    /// URL-safe name used in listing paths, e.g. `tag/<slug>/`.
    pub slug: String,
    members: Vec<usize>,
}

impl Term {
    pub fn members(&self) -> &[usize] {
        &self.members
    }
}

/// The derived category and tag maps, keyed by normalized term name.
/// Recomputed on every build from the current document set; never authored
/// directly.
#[derive(Debug, Default, PartialEq)]
pub struct Index {
    categories: BTreeMap<String, Term>,
    tags: BTreeMap<String, Term>,
}

/// Normalizes a term name into its map key.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Index {
    /// Builds the index over the published sequence. Terms carried only by
    /// `excluded_drafts` end up with zero members; they are logged as
    /// warnings and omitted, never an error.
    pub fn build(published: &[Document], excluded_drafts: &[Document]) -> Result<Index, Error> {
        fn categories_of(d: &Document) -> &[String] {
            &d.categories
        }
        fn tags_of(d: &Document) -> &[String] {
            &d.tags
        }
        let categories = collect(published, excluded_drafts, Kind::Category, categories_of)?;
        let tags = collect(published, excluded_drafts, Kind::Tag, tags_of)?;
        Ok(Index { categories, tags })
    }

    /// Looks up a category by (raw or normalized) name. Unknown terms are not
    /// an error.
    pub fn category(&self, name: &str) -> Option<&Term> {
        self.categories.get(&normalize(name))
    }

    /// Looks up a tag by (raw or normalized) name.
    pub fn tag(&self, name: &str) -> Option<&Term> {
        self.tags.get(&normalize(name))
    }

    /// All categories, ordered by normalized name.
    pub fn categories(&self) -> impl Iterator<Item = &Term> {
        self.categories.values()
    }

    /// All tags, ordered by normalized name.
    pub fn tags(&self) -> impl Iterator<Item = &Term> {
        self.tags.values()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

fn collect(
    published: &[Document],
    excluded_drafts: &[Document],
    kind: Kind,
    names: fn(&Document) -> &[String],
) -> Result<BTreeMap<String, Term>, Error> {
    let mut terms: BTreeMap<String, Term> = BTreeMap::new();
    for (index, document) in published.iter().enumerate() {
        for raw in names(document) {
            let key = normalize(raw);
            if key.is_empty() {
                continue;
            }
            let display = raw.trim();
            terms
                .entry(key)
                .or_insert_with(|| Term {
                    name: display.to_owned(),
                    slug: slug::slugify(display),
                    members: Vec::new(),
                })
                .members
                .push(index);
        }
    }

    for term in terms.values_mut() {
        term.members
            .sort_by(|&a, &b| chronological(&published[a], &published[b]));
        term.members.dedup();
    }

    // Two distinct terms must never share a listing path.
    let mut slugs: BTreeMap<&str, &str> = BTreeMap::new();
    for term in terms.values() {
        if let Some(first) = slugs.insert(&term.slug, &term.name) {
            return Err(Error::DuplicateSlug {
                kind: kind.as_str(),
                slug: term.slug.clone(),
                first: first.to_owned(),
                second: term.name.clone(),
            });
        }
    }

    // Terms held only by excluded drafts would produce empty listings; warn
    // and drop them instead.
    let mut orphaned = BTreeSet::new();
    for document in excluded_drafts {
        for raw in names(document) {
            let key = normalize(raw);
            if !key.is_empty() && !terms.contains_key(&key) {
                orphaned.insert(raw.trim().to_owned());
            }
        }
    }
    for name in orphaned {
        warn!("taxonomy"; "{} `{}` has no published documents; skipping its listing", kind.as_str(), name);
    }

    Ok(terms)
}

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Two distinct terms slugify to the same listing path.
    #[error("duplicate slug `{slug}`: {kind} terms `{first}` and `{second}` resolve to the same listing path")]
    DuplicateSlug {
        kind: &'static str,
        slug: String,
        first: String,
        second: String,
    },
}
