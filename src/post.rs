//! Defines the [`Post`] record and the [`Normalizer`] that builds one from a
//! loaded [`Document`]. Normalization resolves every optional frontmatter
//! field to a concrete value (see [`Normalizer::normalize`]), so nothing
//! downstream ever has to deal with missing metadata.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::Value;
use thiserror::Error;

use crate::document::{Document, Frontmatter};
use crate::slug::slugify;

/// The category assigned to posts whose frontmatter doesn't name one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The normalized record for one source document. Posts are immutable once
/// built; indices hold references to them rather than copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// The post's slug; unique across the site.
    pub id: String,

    pub title: String,

    pub date: NaiveDate,

    /// Four-digit year, derived from `date`.
    pub year: String,

    /// Two-digit, zero-padded month, derived from `date`.
    pub month: String,

    pub category: String,

    /// Tags in source order. Duplicates are preserved.
    pub tags: Vec<String>,

    /// An empty summary means "no summary".
    pub summary: String,

    /// The site-relative URL of the post's page, including the base path,
    /// e.g. `/base/blog/2024/05/second/`.
    pub url: String,

    /// The rendered markdown body.
    pub html: String,

    /// The source document's path relative to the content directory. Used
    /// for error reporting.
    pub source: PathBuf,
}

impl Post {
    /// Returns the post's date formatted as `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    /// Returns the output file path for the post's page, relative to the
    /// output directory.
    pub fn output_path(&self) -> PathBuf {
        Path::new("blog")
            .join(&self.year)
            .join(&self.month)
            .join(&self.id)
            .join("index.html")
    }

    /// Returns true if the post has a non-empty summary.
    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }
}

/// Builds the URL of a post page: `{base_path}/blog/{year}/{month}/{id}/`.
pub fn post_url(base_path: &str, year: &str, month: &str, id: &str) -> String {
    format!("{}/blog/{}/{}/{}/", base_path, year, month, id)
}

/// Converts [`Document`]s into [`Post`]s.
pub struct Normalizer<'a> {
    /// `base_path` prefixes every post URL. It is either empty or begins
    /// with a `/` and has no trailing slash.
    base_path: &'a str,

    /// `today` is the date assigned to documents that don't declare one.
    /// It's fixed once per build so every undated post agrees.
    today: NaiveDate,
}

impl<'a> Normalizer<'a> {
    /// Constructs a new normalizer. See fields on [`Normalizer`] for argument
    /// descriptions.
    pub fn new(base_path: &'a str, today: NaiveDate) -> Normalizer<'a> {
        Normalizer { base_path, today }
    }

    /// Resolves `document` into a [`Post`]. `render` converts the markdown
    /// body to HTML and is called exactly once.
    ///
    /// * title: frontmatter `title`, else the file stem.
    /// * date: frontmatter `date`, else today. A date that is present but
    ///   can't be parsed is an error, never a silent fallback.
    /// * slug: frontmatter `slug` (verbatim), else the slugified file stem.
    /// * tags: a YAML sequence, or a comma-separated string.
    /// * category: frontmatter `category`, else [`DEFAULT_CATEGORY`].
    pub fn normalize<R>(&self, document: Document, render: R) -> Result<Post>
    where
        R: FnOnce(&str) -> String,
    {
        let path = document.path.clone();
        self._normalize(document, render)
            .map_err(|err| Error::Annotated {
                path,
                err: Box::new(err),
            })
    }

    fn _normalize<R>(&self, document: Document, render: R) -> Result<Post>
    where
        R: FnOnce(&str) -> String,
    {
        let resolved = resolve(&document.path, document.frontmatter)?;
        let date = resolved.date.unwrap_or(self.today);
        let year = date.format("%Y").to_string();
        let month = date.format("%m").to_string();
        let url = post_url(self.base_path, &year, &month, &resolved.id);

        Ok(Post {
            url,
            id: resolved.id,
            title: resolved.title,
            date,
            year,
            month,
            category: resolved.category,
            tags: resolved.tags,
            summary: resolved.summary,
            html: render(&document.body),
            source: document.path,
        })
    }
}

// The frontmatter with every field resolved except the date fallback, which
// depends on the normalizer's build date.
struct Resolved {
    id: String,
    title: String,
    date: Option<NaiveDate>,
    category: String,
    tags: Vec<String>,
    summary: String,
}

fn resolve(path: &Path, frontmatter: Frontmatter) -> Result<Resolved> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| Error::InvalidFileName(path.to_owned()))?;

    let id = match non_empty(frontmatter.slug) {
        Some(slug) => check_slug(slug)?,
        None => slugify(stem),
    };
    if id.is_empty() {
        return Err(Error::EmptySlug(stem.to_owned()));
    }

    Ok(Resolved {
        id,
        title: non_empty(frontmatter.title).unwrap_or_else(|| stem.to_owned()),
        date: resolve_date(frontmatter.date.as_ref())?,
        category: non_empty(frontmatter.category)
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
        tags: resolve_tags(frontmatter.tags.as_ref())?,
        summary: frontmatter.summary.unwrap_or_default(),
    })
}

// An explicit slug becomes one directory of the output path, so it must not
// contain separators or name the current or parent directory.
fn check_slug(slug: String) -> Result<String> {
    if slug.contains(&['/', '\\'][..]) || slug == "." || slug == ".." {
        return Err(Error::InvalidSlug(slug));
    }
    Ok(slug)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

/// Resolves the frontmatter `date` value. `Ok(None)` means the document
/// didn't declare a date.
fn resolve_date(value: Option<&Value>) -> Result<Option<NaiveDate>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_date(s).map(Some),
        Some(Value::Number(n)) => parse_date(&n.to_string()).map(Some),
        Some(_) => Err(Error::InvalidDate {
            value: String::from("<non-scalar value>"),
            reason: String::from("expected a date string"),
        }),
    }
}

/// Parses a calendar date. Accepts `YYYY-MM-DD`, RFC 3339 timestamps,
/// `YYYY-MM-DD HH:MM:SS` (with either a space or a `T` separator), and YAML's
/// `YYYY-MM-DD HH:MM:SS +HH:MM`; only the date part is kept.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let err = match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => return Ok(date),
        Err(err) => err,
    };
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.naive_local().date());
    }
    if let Ok(datetime) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %:z") {
        return Ok(datetime.naive_local().date());
    }
    for format in &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(datetime.date());
        }
    }
    Err(Error::InvalidDate {
        value: raw.to_owned(),
        reason: err.to_string(),
    })
}

/// Resolves the frontmatter `tags` value. A sequence has each element
/// stringified; a scalar is split on commas; anything else is an error.
/// Blank tags are dropped either way.
fn resolve_tags(value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => {
            let mut tags = Vec::with_capacity(items.len());
            for item in items {
                let tag = scalar_to_string(item).ok_or(Error::InvalidTags)?;
                if !tag.trim().is_empty() {
                    tags.push(tag);
                }
            }
            Ok(tags)
        }
        Some(scalar) => match scalar_to_string(scalar) {
            Some(s) => Ok(s
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect()),
            None => Err(Error::InvalidTags),
        },
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::from("null")),
        _ => None,
    }
}

/// Represents the result of a [`Post`]-normalizing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error normalizing a [`Post`].
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a document declares a date that can't be parsed.
    #[error("invalid date `{value}`: {reason}")]
    InvalidDate { value: String, reason: String },

    /// Returned when `tags` is neither a sequence of scalars nor a string.
    #[error("tags must be a list or a comma-separated string")]
    InvalidTags,

    /// Returned when neither the frontmatter nor the file name yields a
    /// usable slug.
    #[error("`{0}` slugifies to an empty string; set `slug` in the frontmatter")]
    EmptySlug(String),

    /// Returned when an explicit slug would not be a single path segment.
    #[error("slug `{0}` must not contain `/` or `\\`, or be `.` or `..`")]
    InvalidSlug(String),

    /// Returned when a source file name isn't valid UTF-8.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(PathBuf),

    /// An error with the path of the offending document.
    #[error("normalizing `{}`: {}", .path.display(), .err)]
    Annotated {
        path: PathBuf,
        #[source]
        err: Box<Error>,
    },
}
