//! Discovers source documents on disk and splits each into its YAML
//! frontmatter ([`Frontmatter`]) and markdown body. See [`discover`] and
//! [`load`].

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;
use walkdir::WalkDir;

/// The extension (without the leading dot) of source documents.
pub const MARKDOWN_EXTENSION: &str = "md";

/// The content-root-relative path of the document rendered as the static
/// "about" page instead of as a post.
pub const ABOUT_DOCUMENT: &str = "about.md";

const FENCE: &str = "---";

/// The metadata block at the top of a document. Every field is optional;
/// absent fields are resolved by [`crate::post::Normalizer`].
#[derive(Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    /// Kept as a raw YAML value so that [`crate::post`] can distinguish a
    /// missing date from one that fails to parse.
    #[serde(default)]
    pub date: Option<Value>,

    #[serde(default)]
    pub slug: Option<String>,

    /// Either a sequence of tags or a comma-separated string.
    #[serde(default)]
    pub tags: Option<Value>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,
}

/// A source document read from disk but not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// The document's path relative to the content directory.
    pub path: PathBuf,
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Recursively collects the paths of all markdown documents under `root`,
/// relative to `root` and sorted lexicographically. Sorting here is what
/// makes post order deterministic when two posts share a date. A missing
/// `root` yields no documents rather than an error.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        debug!("content directory `{}` does not exist", root.display());
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for result in WalkDir::new(root) {
        let entry = result?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|e| e.to_str())
                == Some(MARKDOWN_EXTENSION)
        {
            // strip_prefix() can't fail; every entry lives under `root`
            if let Ok(relative) = entry.path().strip_prefix(root) {
                paths.push(relative.to_owned());
            }
        }
    }

    paths.sort();
    Ok(paths)
}

/// Returns true if `relative_path` names the reserved about document.
pub fn is_about(relative_path: &Path) -> bool {
    relative_path == Path::new(ABOUT_DOCUMENT)
}

/// Reads and splits the document at `root.join(relative_path)`.
pub fn load(root: &Path, relative_path: &Path) -> Result<Document> {
    let full_path = root.join(relative_path);
    let contents = fs::read_to_string(&full_path).map_err(|err| Error::Read {
        path: full_path.clone(),
        err,
    })?;

    let (frontmatter, body) = parse(&contents).map_err(|err| Error::Annotated {
        path: full_path,
        err: Box::new(err),
    })?;

    debug!("loaded `{}`", relative_path.display());
    Ok(Document {
        path: relative_path.to_owned(),
        frontmatter,
        body: body.to_owned(),
    })
}

/// Splits `input` into its frontmatter and body. Input that doesn't open
/// with a `---` line has no frontmatter; its entire text is the body.
pub fn parse(input: &str) -> Result<(Frontmatter, &str)> {
    let (yaml, body) = match split_frontmatter(input)? {
        Some(parts) => parts,
        None => return Ok((Frontmatter::default(), input)),
    };

    // `serde_yaml` refuses an empty document, but an empty block just means
    // "no metadata".
    if yaml.trim().is_empty() {
        return Ok((Frontmatter::default(), body));
    }

    let frontmatter = match serde_yaml::from_str::<Option<Frontmatter>>(yaml)? {
        Some(frontmatter) => frontmatter,
        None => Frontmatter::default(),
    };
    Ok((frontmatter, body))
}

fn split_frontmatter(input: &str) -> Result<Option<(&str, &str)>> {
    let rest = match strip_fence_line(input) {
        Some(rest) => rest,
        None => return Ok(None),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            return Ok(Some((&rest[..offset], &rest[offset + line.len()..])));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

// Returns the text following an opening `---` line, if `input` starts with
// one.
fn strip_fence_line(input: &str) -> Option<&str> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let rest = input.strip_prefix(FENCE)?;
    let (line, after) = match rest.find('\n') {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (rest, ""),
    };
    if line.trim().is_empty() {
        Some(after)
    } else {
        None
    }
}

/// Represents the result of a document-loading operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error discovering or loading a document.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a document opens a frontmatter fence (`---`) but never
    /// closes it.
    #[error("Missing closing `---`")]
    FrontmatterMissingEndFence,

    /// Returned when the frontmatter isn't valid YAML or has fields of the
    /// wrong type.
    #[error("malformed frontmatter: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),

    /// Returned when a document can't be read.
    #[error("reading `{}`: {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when walking the content directory fails.
    #[error("walking content directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// An error annotated with the path of the document that caused it.
    #[error("parsing `{}`: {}", .path.display(), .err)]
    Annotated {
        path: PathBuf,
        #[source]
        err: Box<Error>,
    },
}
