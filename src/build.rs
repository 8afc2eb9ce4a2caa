//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading documents
//! ([`crate::document`]), normalizing them into posts ([`crate::post`]),
//! indexing the posts ([`crate::index`]), rendering pages
//! ([`crate::write`]), and finally replacing the output directory with the
//! static assets and rendered pages.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::{info, warn};
use thiserror::Error;
use walkdir::WalkDir;

use crate::config::Config;
use crate::document::{self, is_about, ABOUT_DOCUMENT};
use crate::index::{self, build_indices};
use crate::markdown;
use crate::post::{self, Normalizer, Post};
use crate::template::{self, Templates};
use crate::write::{self, write_pages, Writer};

/// What a successful build produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub posts: usize,
    pub pages: usize,
}

/// Builds the site described by `config`, dating undated posts with today's
/// local date.
pub fn build_site(config: &Config) -> Result<Summary> {
    build_site_on(config, Local::now().naive_local().date())
}

/// Builds the site described by `config`. `today` is the date assigned to
/// posts that don't declare one.
///
/// Every page is rendered in memory before the output directory is touched,
/// so a failing build leaves the previous output in place.
pub fn build_site_on(config: &Config, today: NaiveDate) -> Result<Summary> {
    let render = |body: &str| markdown::to_html(body, &config.base_path);

    let (posts, about_html) = load_posts(config, today, &render)?;
    info!("loaded {} posts", posts.len());

    let indices = build_indices(&posts)?;
    let templates = Templates::load(&config.templates_directory)?;
    let writer = Writer {
        templates: &templates,
        base_path: &config.base_path,
        site_title: &config.title,
    };
    let pages = writer.pages(&indices, about_html.as_deref())?;

    rmdir(&config.output_directory)?;
    fs::create_dir_all(&config.output_directory).map_err(|err| Error::Io {
        path: config.output_directory.clone(),
        err,
    })?;
    copy_dir(&config.public_directory, &config.output_directory)?;
    write_pages(&config.output_directory, &pages)?;

    info!(
        "wrote {} pages to `{}`",
        pages.len(),
        config.output_directory.display()
    );
    Ok(Summary {
        posts: posts.len(),
        pages: pages.len(),
    })
}

// Loads every post in lexicographic path order, plus the rendered about
// document if there is one.
fn load_posts<R>(
    config: &Config,
    today: NaiveDate,
    render: &R,
) -> Result<(Vec<Post>, Option<String>)>
where
    R: Fn(&str) -> String,
{
    let root = &config.content_directory;
    if !root.is_dir() {
        warn!(
            "content directory `{}` not found; building an empty site",
            root.display()
        );
    }

    let normalizer = Normalizer::new(&config.base_path, today);
    let mut posts = Vec::new();
    let mut about_html = None;
    for relative_path in document::discover(root)? {
        let source = document::load(root, &relative_path)?;
        if is_about(&relative_path) {
            about_html = Some(render(&source.body));
        } else {
            posts.push(normalizer.normalize(source, render)?);
        }
    }

    if about_html.is_none() {
        info!("no `{}` found; using a placeholder about page", ABOUT_DOCUMENT);
    }
    Ok((posts, about_html))
}

/// Copies the contents of `src` into `dst`. A missing `src` is skipped.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        info!("no static directory at `{}`; skipping", src.display());
        return Ok(());
    }

    for result in WalkDir::new(src).min_depth(1) {
        let entry = result?;
        // strip_prefix() can't fail; every entry lives under `src`
        let relative = match entry.path().strip_prefix(src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = dst.join(relative);
        let copied = if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
        } else {
            fs::copy(entry.path(), &target).map(|_| ())
        };
        copied.map_err(|err| Error::Io { path: target, err })?;
    }
    Ok(())
}

// Removes `dir`, treating a missing directory as already removed.
fn rmdir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

/// The result of a site build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Each variant wraps the error of one
/// pipeline stage; every one of them aborts the build.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned for errors discovering or reading documents.
    #[error(transparent)]
    Document(#[from] document::Error),

    /// Returned for errors resolving a document into a post.
    #[error(transparent)]
    Post(#[from] post::Error),

    /// Returned for site-wide consistency errors such as duplicate URLs.
    #[error(transparent)]
    Index(#[from] index::Error),

    /// Returned for errors loading templates.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// Returned for errors rendering or writing pages.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned for I/O problems while cleaning the output directory.
    #[error("Cleaning directory '{}': {}", .path.display(), .err)]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when walking the static asset directory fails.
    #[error("copying static assets: {0}")]
    Assets(#[from] walkdir::Error),

    /// Returned for other I/O errors, such as copying static assets.
    #[error("'{}': {}", .path.display(), .err)]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
