//! Defines [`Config`], which locates a project's inputs and outputs and holds
//! the site-wide settings (title and base path).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The environment variable that overrides the site's base path.
pub const BASE_PATH_VAR: &str = "BASE_PATH";

/// The optional project settings file, relative to the project root.
pub const PROJECT_FILE: &str = "site.yaml";

const DEFAULT_TITLE: &str = "Blog";

#[derive(Deserialize, Default)]
struct Project {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    base_path: Option<String>,
}

/// Everything a build needs to know about where to read and write.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Markdown documents, searched recursively.
    pub content_directory: PathBuf,

    /// Optional template overrides (`base.html`, `post.html`, `list.html`,
    /// `page.html`).
    pub templates_directory: PathBuf,

    /// Static assets copied verbatim into the output root.
    pub public_directory: PathBuf,

    /// Removed and recreated on every build.
    pub output_directory: PathBuf,

    /// Either empty or `/`-prefixed with no trailing slash.
    pub base_path: String,

    pub title: String,
}

impl Config {
    /// Builds a [`Config`] for the project rooted at `root`. `site.yaml` is
    /// read if it exists. `base_path`, when given (usually from
    /// [`BASE_PATH_VAR`]), takes precedence over the project file's value.
    pub fn from_directory(root: &Path, base_path: Option<&str>) -> Result<Config> {
        let project_file = root.join(PROJECT_FILE);
        let project = if project_file.is_file() {
            load_project(&project_file)?
        } else {
            Project::default()
        };

        Ok(Config {
            content_directory: root.join("content"),
            templates_directory: root.join("templates"),
            public_directory: root.join("public"),
            output_directory: root.join("dist"),
            base_path: normalize_base_path(
                base_path.or_else(|| project.base_path.as_deref()).unwrap_or(""),
            ),
            title: project.title.unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
        })
    }

    /// Replaces the output directory.
    pub fn with_output_directory(mut self, output_directory: PathBuf) -> Config {
        self.output_directory = output_directory;
        self
    }
}

fn load_project(path: &Path) -> Result<Project> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Opening project file `{}`", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Project::default());
    }
    serde_yaml::from_str::<Option<Project>>(&contents)
        .map(Option::unwrap_or_default)
        .with_context(|| format!("Loading configuration from `{}`", path.display()))
}

/// Normalizes a base path to either `""` or `/a[/b...]`: surrounding
/// whitespace and slashes are trimmed and a single leading slash added.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
