//! Builds the Atom syndication feed from the most recent published
//! documents.
//!
//! The feed is part of the deterministic output tree: its `updated` stamp is
//! the newest entry's publish date, never the wall clock, so rebuilding an
//! unchanged source tree reproduces the feed byte for byte.

use std::io::Write;

use atom_syndication::{
    Entry, EntryBuilder, Feed, FeedBuilder, FixedDateTime, GeneratorBuilder, Link, LinkBuilder,
    Person, PersonBuilder, Text,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::config::Author;
use crate::permalink::Permalink;
use crate::post::Document;

/// The default number of feed entries, used when the project file doesn't
/// configure one.
pub const DEFAULT_FEED_SIZE: usize = 10;

/// The feed's well-known location in the output tree.
pub const FEED_FILE: &str = "feed.xml";

/// Bundled site-level feed metadata.
pub struct FeedConfig {
    pub title: String,
    pub author: Option<Author>,
    pub home_page: Url,
    pub feed_url: Url,
}

/// Creates a feed from site metadata and the most recent published
/// `entries` (already limited to the configured feed size, newest first) and
/// writes it to `w`.
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    entries: &[(&Document, &Permalink)],
    w: W,
) -> Result<(), Error> {
    feed(config, entries).write_to(w)?;
    Ok(())
}

fn feed(config: &FeedConfig, entries: &[(&Document, &Permalink)]) -> Feed {
    // The newest entry date; for an empty site the epoch, which is at least
    // stable across rebuilds.
    let updated = entries
        .iter()
        .map(|(document, _)| document.date)
        .max()
        .map(atom_date)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset());

    let self_link: Link = LinkBuilder::default()
        .href(config.feed_url.to_string())
        .rel("self".to_string())
        .mime_type(Some("application/atom+xml".to_string()))
        .build();
    let alternate_link: Link = LinkBuilder::default()
        .href(config.home_page.to_string())
        .rel("alternate".to_string())
        .build();

    FeedBuilder::default()
        .title(Text::plain(config.title.clone()))
        .id(config.home_page.to_string())
        .updated(updated)
        .authors(people(config.author.as_ref()))
        .links(vec![self_link, alternate_link])
        .generator(Some(
            GeneratorBuilder::default().value("beorc").build(),
        ))
        .entries(
            entries
                .iter()
                .map(|&(document, permalink)| entry(config, document, permalink))
                .collect::<Vec<Entry>>(),
        )
        .build()
}

fn entry(config: &FeedConfig, document: &Document, permalink: &Permalink) -> Entry {
    let date = atom_date(document.date);
    let link: Link = LinkBuilder::default()
        .href(permalink.url.to_string())
        .rel("alternate".to_string())
        .build();
    let (summary, _) = document.summary();
    let own_author = document.author.as_ref().map(|name| Author {
        name: name.clone(),
        email: None,
    });

    EntryBuilder::default()
        .title(Text::plain(document.title.clone()))
        .id(permalink.url.to_string())
        .updated(date)
        .published(Some(date))
        .links(vec![link])
        .summary(Some(Text::plain(summary.to_owned())))
        .authors(people(own_author.as_ref().or(config.author.as_ref())))
        .build()
}

fn people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => vec![PersonBuilder::default()
            .name(author.name.clone())
            .email(author.email.clone())
            .build()],
        None => Vec::new(),
    }
}

fn atom_date(date: NaiveDateTime) -> FixedDateTime {
    date.and_utc().fixed_offset()
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Atom(#[from] atom_syndication::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
