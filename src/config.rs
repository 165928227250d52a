//! Project configuration: the `beorc.yaml` project file plus the theme's
//! template manifest, resolved into one flat [`Config`] value that gets
//! threaded through the build.
//!
//! The project file is discovered by walking parent directories from the
//! invocation directory, so the CLI works from anywhere inside a project.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::feed::DEFAULT_FEED_SIZE;
use crate::page::DEFAULT_PAGE_SIZE;
use crate::permalink::{Pattern, DEFAULT_PATTERN};

pub const PROJECT_FILE: &str = "beorc.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Deserialize)]
struct FeedSize(usize);
impl Default for FeedSize {
    fn default() -> Self {
        FeedSize(DEFAULT_FEED_SIZE)
    }
}

/// The raw project file.
#[derive(Deserialize)]
struct Project {
    title: String,
    #[serde(default)]
    author: Option<Author>,
    base_url: Url,
    #[serde(default)]
    permalink_pattern: Option<String>,
    #[serde(default)]
    page_size: PageSize,
    #[serde(default)]
    feed_size: FeedSize,
}

/// The raw theme manifest (`theme/theme.yaml`). Each template is the
/// concatenation of the listed files, so themes can share a base layout.
#[derive(Deserialize)]
struct Theme {
    post_template: Vec<PathBuf>,
    listing_template: Vec<PathBuf>,
}

/// Build knobs that come from the command line rather than the project
/// file.
#[derive(Debug, Default, Clone)]
pub struct Options {
    pub output_directory: Option<PathBuf>,
    pub threads: Option<usize>,
    pub include_drafts: bool,
}

/// The fully resolved configuration consumed by the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub title: String,
    pub author: Option<Author>,
    /// Prefix for absolute links; always ends in `/`.
    pub base_url: Url,
    pub permalink_pattern: Pattern,
    pub page_size: usize,
    pub feed_size: usize,
    pub include_drafts: bool,
    pub threads: usize,
    pub posts_source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub post_template: Vec<PathBuf>,
    pub listing_template: Vec<PathBuf>,
}

impl Config {
    /// Finds `beorc.yaml` in `dir` or any parent directory and loads it.
    pub fn from_directory(dir: &Path, options: Options) -> Result<Config, Error> {
        let mut current = dir;
        loop {
            let path = current.join(PROJECT_FILE);
            if path.exists() {
                return Config::from_project_file(&path, options);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return Err(Error::ProjectFileNotFound(dir.to_owned())),
            }
        }
    }

    /// Loads and validates the project file at `path`.
    pub fn from_project_file(path: &Path, options: Options) -> Result<Config, Error> {
        let project: Project = read_yaml(path)?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));

        let theme_dir = project_root.join("theme");
        let theme: Theme = read_yaml(&theme_dir.join("theme.yaml"))?;

        if project.page_size.0 < 1 {
            return Err(Error::UnknownConfigurationValue {
                field: "page_size",
                value: project.page_size.0.to_string(),
                reason: "page size must be at least 1".to_owned(),
            });
        }
        if project.feed_size.0 < 1 {
            return Err(Error::UnknownConfigurationValue {
                field: "feed_size",
                value: project.feed_size.0.to_string(),
                reason: "feed size must be at least 1".to_owned(),
            });
        }

        let raw_pattern = project
            .permalink_pattern
            .as_deref()
            .unwrap_or(DEFAULT_PATTERN);
        let permalink_pattern =
            Pattern::parse(raw_pattern).map_err(|e| Error::UnknownConfigurationValue {
                field: "permalink_pattern",
                value: raw_pattern.to_owned(),
                reason: e.to_string(),
            })?;

        let mut base_url = project.base_url;
        if base_url.cannot_be_a_base() {
            return Err(Error::UnknownConfigurationValue {
                field: "base_url",
                value: base_url.to_string(),
                reason: "base URL must be an absolute http(s) URL".to_owned(),
            });
        }
        // `Url::join` treats a base without a trailing slash as a file.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Config {
            title: project.title,
            author: project.author,
            base_url,
            permalink_pattern,
            page_size: project.page_size.0,
            feed_size: project.feed_size.0,
            include_drafts: options.include_drafts,
            threads: options.threads.unwrap_or_else(num_cpus::get),
            posts_source_directory: project_root.join("posts"),
            output_directory: options
                .output_directory
                .unwrap_or_else(|| project_root.join("public")),
            post_template: theme
                .post_template
                .iter()
                .map(|relative| theme_dir.join(relative))
                .collect(),
            listing_template: theme
                .listing_template
                .iter()
                .map(|relative| theme_dir.join(relative))
                .collect(),
        })
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_owned(),
        source,
    })?;
    serde_yaml::from_reader(file).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not find `{PROJECT_FILE}` in `{dir}` or any parent directory", dir = .0.display())]
    ProjectFileNotFound(PathBuf),

    #[error("{path}: {source}", path = .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: {source}", path = .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unknown configuration value for `{field}` (`{value}`): {reason}")]
    UnknownConfigurationValue {
        field: &'static str,
        value: String,
        reason: String,
    },
}
