//! The in-memory content repository: every parsed document, indexed and
//! frozen after the parse barrier.
//!
//! [`Repository::build`] accepts documents in whatever order the parser
//! workers produced them; the published sequence is always recomputed from
//! the chronological rule, so insertion order never leaks into the output.
//! Drafts are retained internally (preview builds promote them with
//! `include_drafts`) but excluded from the default published sequence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::permalink::{self, Permalink, Resolver};
use crate::post::{chronological, Document};
use crate::taxonomy;

/// The immutable-after-build site index. Once constructed it is only read,
/// so downstream components can share it freely without locking.
#[derive(Debug)]
pub struct Repository {
    /// Published documents in chronological order (date descending, source
    /// path tie-break).
    documents: Vec<Document>,
    /// Permalinks parallel to `documents`.
    permalinks: Vec<Permalink>,
    /// Excluded drafts, kept for preview tooling and taxonomy warnings.
    drafts: Vec<(Document, Permalink)>,
    by_slug: BTreeMap<String, usize>,
    taxonomy: taxonomy::Index,
}

impl Repository {
    /// Builds the repository. Fails with [`Error::DuplicateSlug`] when two
    /// documents resolve to the same slug or output path; the error names
    /// both source files and there is no silent suffixing.
    pub fn build(
        mut documents: Vec<Document>,
        resolver: &Resolver,
        include_drafts: bool,
    ) -> Result<Repository, Error> {
        // Deterministic collision attribution: whichever file sorts first is
        // reported as the original, regardless of parse order.
        documents.sort_by(|a, b| a.source_path.cmp(&b.source_path));

        let mut claimed_slugs: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut claimed_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
        let mut resolved = Vec::with_capacity(documents.len());
        for document in documents {
            let permalink = resolver.resolve(&document)?;
            for (identifier, claimed) in [
                (permalink.slug.clone(), &mut claimed_slugs),
                (permalink.rel_dir.clone(), &mut claimed_paths),
            ] {
                if let Some(first) = claimed.insert(identifier.clone(), document.source_path.clone())
                {
                    return Err(Error::DuplicateSlug {
                        slug: identifier,
                        first,
                        second: document.source_path,
                    });
                }
            }
            resolved.push((document, permalink));
        }

        let (mut published, drafts): (Vec<_>, Vec<_>) = resolved
            .into_iter()
            .partition(|(document, _)| include_drafts || !document.draft);

        published.sort_by(|a, b| chronological(&a.0, &b.0));
        let (documents, permalinks): (Vec<_>, Vec<_>) = published.into_iter().unzip();

        let by_slug = permalinks
            .iter()
            .enumerate()
            .map(|(index, permalink)| (permalink.slug.clone(), index))
            .collect();

        let draft_documents: Vec<Document> =
            drafts.iter().map(|(document, _)| document.clone()).collect();
        let taxonomy = taxonomy::Index::build(&documents, &draft_documents)?;

        Ok(Repository {
            documents,
            permalinks,
            drafts,
            by_slug,
            taxonomy,
        })
    }

    /// The chronologically ordered, drafts-excluded document sequence.
    pub fn all(&self) -> &[Document] {
        &self.documents
    }

    /// Published documents zipped with their permalinks, in chronological
    /// order.
    pub fn entries(&self) -> impl Iterator<Item = (&Document, &Permalink)> {
        self.documents.iter().zip(self.permalinks.iter())
    }

    pub fn get(&self, index: usize) -> (&Document, &Permalink) {
        (&self.documents[index], &self.permalinks[index])
    }

    pub fn permalink(&self, index: usize) -> &Permalink {
        &self.permalinks[index]
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Looks up a published document by slug.
    pub fn by_slug(&self, slug: &str) -> Option<(&Document, &Permalink)> {
        self.by_slug.get(slug).map(|&index| self.get(index))
    }

    /// Ordered members of a category. An unknown term yields an empty
    /// result, not an error.
    pub fn by_category(&self, name: &str) -> Vec<&Document> {
        self.term_members(self.taxonomy.category(name))
    }

    /// Ordered members of a tag.
    pub fn by_tag(&self, name: &str) -> Vec<&Document> {
        self.term_members(self.taxonomy.tag(name))
    }

    fn term_members(&self, term: Option<&taxonomy::Term>) -> Vec<&Document> {
        term.map(|term| {
            term.members()
                .iter()
                .map(|&index| &self.documents[index])
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn taxonomy(&self) -> &taxonomy::Index {
        &self.taxonomy
    }

    /// Drafts excluded from the published sequence.
    pub fn drafts(&self) -> impl Iterator<Item = &Document> {
        self.drafts.iter().map(|(document, _)| document)
    }

    /// Excluded drafts with the permalinks they would publish under.
    pub fn draft_entries(&self) -> impl Iterator<Item = (&Document, &Permalink)> {
        self.drafts
            .iter()
            .map(|(document, permalink)| (document, permalink))
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Two documents resolved to the same slug or output path.
    #[error(
        "duplicate slug `{slug}`: `{first}` and `{second}` resolve to the same output location",
        first = .first.display(),
        second = .second.display(),
    )]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error(transparent)]
    Permalink(#[from] permalink::Error),

    #[error(transparent)]
    Taxonomy(#[from] taxonomy::Error),
}
