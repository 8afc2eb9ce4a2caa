//! Loads the site's templates and fills them in. Templates use Go template
//! syntax via [`gtmpl`]. Each template is read from the project's templates
//! directory when a file with the right name exists there, otherwise a
//! built-in default is used.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use gtmpl::{Context, Template, Value};
use log::debug;
use thiserror::Error;

const BASE_TEMPLATE: &str = include_str!("../theme/base.html");
const POST_TEMPLATE: &str = include_str!("../theme/post.html");
const LIST_TEMPLATE: &str = include_str!("../theme/list.html");
const PAGE_TEMPLATE: &str = include_str!("../theme/page.html");

/// The parsed templates needed to render a site.
pub struct Templates {
    /// The page shell. Fields: `site_title`, `title`, `base`, `content`.
    pub base: Template,

    /// The body of a post page. Fields: `title`, `date`, `category`,
    /// `category_url`, `tags`, `summary`, `content`.
    pub post: Template,

    /// The body of a listing page. Fields: `hero`, `title`, `description`,
    /// `base`, `posts` (each with `title`, `url`, `date`, `category`,
    /// `summary`).
    pub list: Template,

    /// The body of a static page. Fields: `title`, `content`.
    pub page: Template,
}

impl Templates {
    /// Loads templates from `directory`, falling back to the built-in
    /// defaults for any template file that doesn't exist. A missing
    /// directory means "use all defaults".
    pub fn load(directory: &Path) -> Result<Templates> {
        Ok(Templates {
            base: load_one(directory, "base", BASE_TEMPLATE)?,
            post: load_one(directory, "post", POST_TEMPLATE)?,
            list: load_one(directory, "list", LIST_TEMPLATE)?,
            page: load_one(directory, "page", PAGE_TEMPLATE)?,
        })
    }

    /// Returns the built-in templates.
    pub fn builtin() -> Result<Templates> {
        Ok(Templates {
            base: parse("base", BASE_TEMPLATE)?,
            post: parse("post", POST_TEMPLATE)?,
            list: parse("list", LIST_TEMPLATE)?,
            page: parse("page", PAGE_TEMPLATE)?,
        })
    }
}

fn load_one(directory: &Path, name: &str, default: &str) -> Result<Template> {
    let path = directory.join(format!("{}.html", name));
    if !path.is_file() {
        return parse(name, default);
    }

    debug!("using template `{}`", path.display());
    let contents = fs::read_to_string(&path).map_err(|err| Error::Read {
        path: path.clone(),
        err,
    })?;
    parse(name, &contents)
}

fn parse(name: &str, contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template
        .parse(contents)
        .map_err(|err| Error::Parse {
            name: name.to_owned(),
            err,
        })?;
    Ok(template)
}

/// Fills `template` with `fields`. Referencing a field that isn't present in
/// `fields` is an error rather than an empty substitution.
pub fn fill(template: &Template, fields: Fields) -> Result<String> {
    let context = Context::from(fields.into_value()).map_err(Error::Execute)?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context).map_err(Error::Execute)?;
    String::from_utf8(out).map_err(|err| Error::Execute(err.to_string()))
}

/// A set of named template fields. Converts into a [`Value::Object`].
#[derive(Default, Clone)]
pub struct Fields(HashMap<String, Value>);

impl Fields {
    /// Returns an empty set of fields.
    pub fn new() -> Fields {
        Fields::default()
    }

    /// Adds a string field.
    pub fn string<S: Into<String>>(mut self, name: &str, value: S) -> Fields {
        self.0.insert(name.to_owned(), Value::String(value.into()));
        self
    }

    /// Adds a boolean field.
    pub fn boolean(mut self, name: &str, value: bool) -> Fields {
        self.0.insert(name.to_owned(), Value::Bool(value));
        self
    }

    /// Adds a list field, each element of which is itself a set of fields.
    pub fn list(mut self, name: &str, items: Vec<Fields>) -> Fields {
        self.0.insert(
            name.to_owned(),
            Value::Array(items.into_iter().map(Fields::into_value).collect()),
        );
        self
    }

    /// Converts the fields into the object a template is executed against.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// The result of a templating operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or filling a template.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a template file exists but can't be read.
    #[error("reading template `{}`: {}", .path.display(), .err)]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when a template can't be parsed.
    #[error("parsing template `{name}`: {err}")]
    Parse { name: String, err: String },

    /// Returned when a template fails to execute, including when it refers
    /// to a field that wasn't provided.
    #[error("executing template: {0}")]
    Execute(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fill() -> Result<()> {
        let template = parse("t", "<h1>{{.title}}</h1>{{if .hero}}hero{{end}}")?;
        assert_eq!(
            "<h1>Hi</h1>hero",
            fill(
                &template,
                Fields::new().string("title", "Hi").boolean("hero", true)
            )?
        );
        Ok(())
    }

    #[test]
    fn test_fill_does_not_escape_html() -> Result<()> {
        let template = parse("t", "<div>{{.content}}</div>")?;
        assert_eq!(
            "<div><p>a &amp; b</p></div>",
            fill(&template, Fields::new().string("content", "<p>a &amp; b</p>"))?
        );
        Ok(())
    }

    #[test]
    fn test_fill_list() -> Result<()> {
        let template = parse(
            "t",
            "{{if .posts}}{{range .posts}}[{{.title}}]{{end}}{{else}}empty{{end}}",
        )?;
        let posts = vec![
            Fields::new().string("title", "one"),
            Fields::new().string("title", "two"),
        ];
        assert_eq!(
            "[one][two]",
            fill(&template, Fields::new().list("posts", posts))?
        );
        assert_eq!(
            "empty",
            fill(&template, Fields::new().list("posts", Vec::new()))?
        );
        Ok(())
    }

    #[test]
    fn test_fill_missing_field_is_error() -> Result<()> {
        let top = parse("t", "<h1>{{.nope}}</h1>")?;
        assert!(matches!(
            fill(&top, Fields::new().string("title", "Hi")),
            Err(Error::Execute(_))
        ));

        let nested = parse("t", "{{range .posts}}[{{.nope}}]{{end}}")?;
        let posts = vec![Fields::new().string("title", "one")];
        assert!(matches!(
            fill(&nested, Fields::new().list("posts", posts)),
            Err(Error::Execute(_))
        ));
        Ok(())
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse("broken", "{{if .x}}never closed"),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn test_builtin_templates_parse() -> Result<()> {
        Templates::builtin().map(|_| ())
    }

    #[test]
    fn test_load_prefers_project_templates() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("page.html"), "custom {{.title}}")?;
        let templates = Templates::load(dir.path())?;
        assert_eq!(
            "custom About",
            fill(
                &templates.page,
                Fields::new().string("title", "About").string("content", "")
            )?
        );
        Ok(())
    }
}
