//! The library code for the `beorc` static site generator. A build is a
//! fixed pipeline over a tree of markdown source files:
//!
//! 1. Parsing documents from source files on disk ([`crate::post`]), with
//!    YAML front matter handled by [`crate::frontmatter`]
//! 2. Freezing them into the content repository ([`crate::repo`]), which
//!    resolves permalinks ([`crate::permalink`]) and derives the category
//!    and tag indexes ([`crate::taxonomy`])
//! 3. Converting bodies to HTML ([`crate::markdown`]) and writing post and
//!    paginated listing pages to disk ([`crate::write`], [`crate::page`]),
//!    plus the Atom feed ([`crate::feed`])
//!
//! The repository is the barrier between steps 1 and 3: nothing downstream
//! runs until every source file has parsed successfully, and after that the
//! repository never changes. That is what makes the whole build
//! deterministic; two builds over the same source tree produce
//! byte-identical output. [`crate::build`] stitches the steps together.

pub mod build;
pub mod cache;
pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod logger;
pub mod markdown;
pub mod page;
pub mod permalink;
pub mod post;
pub mod repo;
pub mod taxonomy;
pub mod write;
