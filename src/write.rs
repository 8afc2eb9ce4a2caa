//! Renders [`Post`]s and [`Indices`] into HTML [`Page`]s and writes them to
//! disk. Rendering ([`Writer::pages`]) is kept separate from writing
//! ([`write_pages`]) so that a build can render everything before it touches
//! the output directory.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::index::{Group, Indices};
use crate::post::Post;
use crate::slug::path_segment;
use crate::template::{self, Fields, Templates};

/// The number of posts listed on the home page.
pub const HOME_PAGE_SIZE: usize = 5;

/// Shown in place of the about page body when there's no about document.
pub const ABOUT_PLACEHOLDER: &str = "<p>The about page is still being written.</p>";

/// An output HTML file.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The target location, relative to the output directory.
    pub path: PathBuf,

    /// The fully rendered document.
    pub html: String,
}

/// Responsible for templating every page of the site.
pub struct Writer<'a> {
    pub templates: &'a Templates,

    /// The site's base path; empty or `/`-prefixed without a trailing slash.
    /// Prefixes every link the writer generates.
    pub base_path: &'a str,

    /// Shown in the page shell of every page.
    pub site_title: &'a str,
}

impl Writer<'_> {
    /// Renders every page of the site: one page per post, the home page, the
    /// full blog list, one listing per year-month, category and tag, and the
    /// about page. `about_html` is the rendered about document, if there is
    /// one.
    pub fn pages(&self, indices: &Indices, about_html: Option<&str>) -> Result<Vec<Page>> {
        let mut pages = Vec::new();

        for post in &indices.chronological {
            pages.push(self.post_page(post)?);
        }

        let latest = &indices.chronological
            [..indices.chronological.len().min(HOME_PAGE_SIZE)];
        pages.push(self.list_page(
            PathBuf::from("index.html"),
            "Home",
            "Latest posts",
            latest,
            true,
        )?);

        pages.push(self.list_page(
            Path::new("blog").join("index.html"),
            "Blog",
            "All posts",
            &indices.chronological,
            false,
        )?);

        pages.extend(self.year_month_pages(&indices.by_year_month)?);
        pages.extend(self.taxonomy_pages(
            "categories",
            "Category",
            "category",
            &indices.by_category,
        )?);
        pages.extend(self.taxonomy_pages("tags", "Tag", "tag", &indices.by_tag)?);

        pages.push(self.about_page(about_html)?);
        Ok(pages)
    }

    /// Applies the base template around an already rendered `content`.
    fn shell(&self, title: &str, content: String) -> Result<String> {
        Ok(template::fill(
            &self.templates.base,
            Fields::new()
                .string("site_title", self.site_title)
                .string("title", title)
                .string("base", self.base_path)
                .string("content", content),
        )?)
    }

    fn post_page(&self, post: &Post) -> Result<Page> {
        let content = template::fill(
            &self.templates.post,
            Fields::new()
                .string("title", post.title.as_str())
                .string("date", post.date_string())
                .string("category", post.category.as_str())
                .string("category_url", self.taxonomy_url("categories", &post.category))
                .string("tags", self.tag_links(&post.tags))
                .string("summary", post.summary.as_str())
                .string("content", post.html.as_str()),
        )?;
        Ok(Page {
            path: post.output_path(),
            html: self.shell(&post.title, content)?,
        })
    }

    fn tag_links(&self, tags: &[String]) -> String {
        if tags.is_empty() {
            return String::from("No tags");
        }
        tags.iter()
            .map(|tag| {
                format!(
                    r#"<a href="{}">{}</a>"#,
                    self.taxonomy_url("tags", tag),
                    tag
                )
            })
            .collect::<Vec<String>>()
            .join(", ")
    }

    /// `{base_path}/{section}/{segment}/`, e.g. `/base/tags/rust/`. Must
    /// agree with the paths written by [`Writer::taxonomy_pages`].
    fn taxonomy_url(&self, section: &str, name: &str) -> String {
        format!("{}/{}/{}/", self.base_path, section, path_segment(name))
    }

    fn list_page(
        &self,
        path: PathBuf,
        title: &str,
        description: &str,
        posts: &[&Post],
        hero: bool,
    ) -> Result<Page> {
        let content = template::fill(
            &self.templates.list,
            Fields::new()
                .boolean("hero", hero)
                .string("title", title)
                .string("description", description)
                .string("base", self.base_path)
                .list("posts", posts.iter().map(|p| summarize(p)).collect()),
        )?;
        Ok(Page {
            path,
            html: self.shell(title, content)?,
        })
    }

    fn year_month_pages(&self, group: &Group) -> Result<Vec<Page>> {
        let mut pages = Vec::with_capacity(group.len());
        for (key, posts) in group {
            let (year, month) = key
                .split_once('-')
                .ok_or_else(|| Error::YearMonthKey(key.clone()))?;
            pages.push(self.list_page(
                Path::new("blog").join(year).join(month).join("index.html"),
                &format!("Posts from {}", key),
                &format!("Everything published in {}", key),
                posts,
                false,
            )?);
        }
        Ok(pages)
    }

    fn taxonomy_pages(
        &self,
        section: &str,
        label: &str,
        noun: &str,
        group: &Group,
    ) -> Result<Vec<Page>> {
        let mut pages = Vec::with_capacity(group.len());
        for (name, posts) in group {
            pages.push(self.list_page(
                Path::new(section).join(path_segment(name)).join("index.html"),
                &format!("{}: {}", label, name),
                &format!("Posts in the {} {}", noun, name),
                posts,
                false,
            )?);
        }
        Ok(pages)
    }

    fn about_page(&self, about_html: Option<&str>) -> Result<Page> {
        let content = template::fill(
            &self.templates.page,
            Fields::new()
                .string("title", "About")
                .string("content", about_html.unwrap_or(ABOUT_PLACEHOLDER)),
        )?;
        Ok(Page {
            path: Path::new("about").join("index.html"),
            html: self.shell("About", content)?,
        })
    }
}

/// Converts a [`Post`] into the fields of one listing entry.
fn summarize(post: &Post) -> Fields {
    Fields::new()
        .string("title", post.title.as_str())
        .string("url", post.url.as_str())
        .string("date", post.date_string())
        .string("category", post.category.as_str())
        .string("summary", post.summary.as_str())
}

/// Writes `pages` beneath `output_directory`, creating parent directories as
/// needed.
pub fn write_pages(output_directory: &Path, pages: &[Page]) -> Result<()> {
    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for page in pages {
        let file_path = output_directory.join(&page.path);
        if let Some(dir) = file_path.parent() {
            if seen_dirs.insert(dir.to_owned()) {
                fs::create_dir_all(dir).map_err(|err| Error::Io {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        fs::write(&file_path, &page.html).map_err(|err| Error::Io {
            path: file_path.clone(),
            err,
        })?;
        debug!("wrote `{}`", file_path.display());
    }
    Ok(())
}

/// The result of a fallible page-rendering operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-rendering or page-writing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An error during templating.
    #[error(transparent)]
    Template(#[from] template::Error),

    /// Returned for a year-month group key that isn't `{year}-{month}`.
    #[error("malformed year-month key `{0}`")]
    YearMonthKey(String),

    /// An error writing the output files.
    #[error("writing `{}`: {}", .path.display(), .err)]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::build_indices;
    use chrono::NaiveDate;

    fn post(id: &str, day: u32, category: &str, tags: &[&str]) -> Post {
        let date = NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
        Post {
            url: crate::post::post_url("/base", "2024", "05", id),
            id: id.to_owned(),
            title: format!("Title {}", id),
            date,
            year: String::from("2024"),
            month: String::from("05"),
            category: category.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            summary: String::new(),
            html: format!("<p>body of {}</p>", id),
            source: PathBuf::from(format!("{}.md", id)),
        }
    }

    fn render(posts: &[Post], about: Option<&str>) -> Vec<Page> {
        let templates = Templates::builtin().unwrap();
        let writer = Writer {
            templates: &templates,
            base_path: "/base",
            site_title: "Test Site",
        };
        writer
            .pages(&build_indices(posts).unwrap(), about)
            .unwrap()
    }

    fn find<'a>(pages: &'a [Page], path: &str) -> &'a Page {
        pages
            .iter()
            .find(|p| p.path == Path::new(path))
            .unwrap_or_else(|| panic!("no page at `{}`", path))
    }

    #[test]
    fn test_page_paths() {
        let posts = vec![
            post("a", 1, "Web Dev", &["Rust Lang", "cli"]),
            post("b", 2, "Go", &[]),
        ];
        let mut paths: Vec<PathBuf> = render(&posts, None)
            .into_iter()
            .map(|p| p.path)
            .collect();
        paths.sort();

        let mut wanted: Vec<PathBuf> = vec![
            "about/index.html",
            "blog/2024/05/a/index.html",
            "blog/2024/05/b/index.html",
            "blog/2024/05/index.html",
            "blog/index.html",
            "categories/go/index.html",
            "categories/web-dev/index.html",
            "index.html",
            "tags/cli/index.html",
            "tags/rust-lang/index.html",
        ]
        .into_iter()
        .map(PathBuf::from)
        .collect();
        wanted.sort();

        assert_eq!(wanted, paths);
    }

    #[test]
    fn test_home_page_lists_latest_five_with_hero() {
        let posts: Vec<Post> = (1..=7)
            .map(|day| post(&format!("p{}", day), day, "Go", &[]))
            .collect();
        let pages = render(&posts, None);

        let home = &find(&pages, "index.html").html;
        assert!(home.contains("hero-image"));
        for day in 3..=7 {
            assert!(home.contains(&format!("Title p{}", day)), "p{}", day);
        }
        assert!(!home.contains("Title p2"));
        assert!(!home.contains("Title p1"));
        let p7 = home.find("Title p7").unwrap();
        let p3 = home.find("Title p3").unwrap();
        assert!(p7 < p3);

        let blog = &find(&pages, "blog/index.html").html;
        assert!(!blog.contains("hero-image"));
        assert!(blog.contains("Title p1"));
    }

    #[test]
    fn test_post_page_links_use_base_path() {
        let pages = render(&[post("a", 1, "Web Dev", &["Rust Lang"])], None);
        let html = &find(&pages, "blog/2024/05/a/index.html").html;
        assert!(html.contains("<p>body of a</p>"));
        assert!(html.contains(r#"href="/base/categories/web-dev/""#), "{}", html);
        assert!(html.contains(r#"<a href="/base/tags/rust-lang/">Rust Lang</a>"#), "{}", html);
        assert!(html.contains(r#"href="/base/style.css""#), "{}", html);
    }

    #[test]
    fn test_non_ascii_taxonomy_links_match_paths() {
        let pages = render(&[post("a", 1, "개발", &["러스트 입문"])], None);
        find(&pages, "categories/개발/index.html");
        find(&pages, "tags/러스트-입문/index.html");

        let html = &find(&pages, "blog/2024/05/a/index.html").html;
        assert!(html.contains(r#"href="/base/categories/개발/""#), "{}", html);
        assert!(
            html.contains(r#"<a href="/base/tags/러스트-입문/">러스트 입문</a>"#),
            "{}",
            html
        );
    }

    #[test]
    fn test_post_without_tags() {
        let pages = render(&[post("a", 1, "Go", &[])], None);
        assert!(find(&pages, "blog/2024/05/a/index.html").html.contains("No tags"));
    }

    #[test]
    fn test_empty_site() {
        let pages = render(&[], None);
        assert_eq!(3, pages.len());
        assert!(find(&pages, "index.html").html.contains("No posts yet."));
        assert!(find(&pages, "about/index.html").html.contains(ABOUT_PLACEHOLDER));
    }

    #[test]
    fn test_about_page() {
        let pages = render(&[], Some("<p>Hi, I write things.</p>"));
        let html = &find(&pages, "about/index.html").html;
        assert!(html.contains("<p>Hi, I write things.</p>"));
        assert!(!html.contains(ABOUT_PLACEHOLDER));
    }

    #[test]
    fn test_write_pages_creates_directories() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let pages = vec![
            Page {
                path: PathBuf::from("a/b/c/index.html"),
                html: String::from("deep"),
            },
            Page {
                path: PathBuf::from("index.html"),
                html: String::from("root"),
            },
        ];
        write_pages(dir.path(), &pages)?;
        assert_eq!("deep", fs::read_to_string(dir.path().join("a/b/c/index.html"))?);
        assert_eq!("root", fs::read_to_string(dir.path().join("index.html"))?);
        Ok(())
    }
}
