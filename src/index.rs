//! Groups [`Post`]s into the listings the site renders: the full
//! chronological list plus one group per year-month, category, and tag. See
//! [`build_indices`].
//!
//! Every listing is ordered newest first. Posts with the same date keep the
//! order in which they were handed to [`build_indices`], which in a build is
//! the lexicographic order of their source paths.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use thiserror::Error;

use crate::post::Post;
use crate::slug::path_segment;

/// A mapping from a group key to the posts in that group, newest first.
pub type Group<'a> = BTreeMap<String, Vec<&'a Post>>;

/// All of the listings for a site. Groups hold references into the slice
/// passed to [`build_indices`].
#[derive(Debug, Default)]
pub struct Indices<'a> {
    /// Every post, newest first.
    pub chronological: Vec<&'a Post>,

    /// Keyed by `"{year}-{month}"`, e.g. `"2024-05"`.
    pub by_year_month: Group<'a>,

    /// Keyed by the raw category string.
    pub by_category: Group<'a>,

    /// Keyed by the raw tag string.
    pub by_tag: Group<'a>,
}

/// Returns the year-month group key for `post`.
pub fn year_month_key(post: &Post) -> String {
    format!("{}-{}", post.year, post.month)
}

/// Sorts `posts` newest first. The sort is stable, so posts with equal dates
/// keep their relative order.
pub fn sort_chronologically(posts: &mut [&Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Builds all [`Indices`] for `posts`.
///
/// Fails if two posts resolve to the same URL, or if two different
/// categories (or tags) map to the same listing page (see
/// [`crate::slug::path_segment`]).
pub fn build_indices(posts: &[Post]) -> Result<Indices<'_>> {
    check_unique_urls(posts)?;

    let mut chronological: Vec<&Post> = posts.iter().collect();
    sort_chronologically(&mut chronological);

    // Folding over the already-sorted list keeps every group sorted as well.
    let indices = chronological.iter().fold(
        Indices {
            chronological: chronological.clone(),
            ..Indices::default()
        },
        |mut indices, &post| {
            push(&mut indices.by_year_month, year_month_key(post), post);
            push(&mut indices.by_category, post.category.clone(), post);
            for tag in &post.tags {
                push(&mut indices.by_tag, tag.clone(), post);
            }
            indices
        },
    );

    check_slugs("category", &indices.by_category)?;
    check_slugs("tag", &indices.by_tag)?;
    Ok(indices)
}

fn push<'a>(group: &mut Group<'a>, key: String, post: &'a Post) {
    match group.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(vec![post]);
        }
        Entry::Occupied(mut entry) => entry.get_mut().push(post),
    }
}

fn check_unique_urls(posts: &[Post]) -> Result<()> {
    let mut seen: HashMap<&str, &Post> = HashMap::with_capacity(posts.len());
    for post in posts {
        if let Some(first) = seen.insert(&post.url, post) {
            return Err(Error::DuplicateUrl {
                url: post.url.clone(),
                first: first.source.clone(),
                second: post.source.clone(),
            });
        }
    }
    Ok(())
}

// Two keys whose path segments match would be written to the same listing
// page.
fn check_slugs(kind: &'static str, group: &Group) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(group.len());
    for key in group.keys() {
        let slug = path_segment(key);
        if let Some(first) = seen.insert(slug.clone(), key) {
            return Err(Error::SlugCollision {
                kind,
                slug,
                first: first.to_owned(),
                second: key.clone(),
            });
        }
    }
    Ok(())
}

/// The result of an indexing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a site-wide consistency problem found while indexing.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when two posts resolve to the same URL.
    #[error(
        "duplicate post URL `{url}` produced by `{}` and `{}`",
        .first.display(),
        .second.display()
    )]
    DuplicateUrl {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when two distinct category or tag names share a slug.
    #[error("{kind}s `{first}` and `{second}` both map to the page `{slug}`")]
    SlugCollision {
        kind: &'static str,
        slug: String,
        first: String,
        second: String,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::NaiveDate;

    fn post(source: &str, id: &str, date: (i32, u32, u32), category: &str, tags: &[&str]) -> Post {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        let year = date.format("%Y").to_string();
        let month = date.format("%m").to_string();
        Post {
            url: crate::post::post_url("", &year, &month, id),
            id: id.to_owned(),
            title: id.to_owned(),
            date,
            year,
            month,
            category: category.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            summary: String::new(),
            html: String::new(),
            source: PathBuf::from(source),
        }
    }

    fn ids(posts: &[&Post]) -> Vec<String> {
        posts.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_chronological_newest_first_with_stable_ties() -> Result<()> {
        let posts = vec![
            post("a.md", "a", (2024, 1, 1), "x", &[]),
            post("b.md", "b", (2024, 3, 1), "x", &[]),
            post("c.md", "c", (2024, 1, 1), "x", &[]),
            post("d.md", "d", (2023, 12, 31), "x", &[]),
        ];
        let indices = build_indices(&posts)?;
        assert_eq!(vec!["b", "a", "c", "d"], ids(&indices.chronological));
        assert_eq!(vec!["a", "c"], ids(&indices.by_year_month["2024-01"]));
        assert_eq!(vec!["b", "a", "c", "d"], ids(&indices.by_category["x"]));
        Ok(())
    }

    #[test]
    fn test_every_post_in_one_month_and_one_category() -> Result<()> {
        let posts = vec![
            post("a.md", "a", (2024, 1, 5), "Go", &["a", "b"]),
            post("b.md", "b", (2024, 2, 5), "Rust", &["b"]),
            post("c.md", "c", (2024, 2, 6), "Go", &[]),
        ];
        let indices = build_indices(&posts)?;

        for p in &posts {
            let months = indices
                .by_year_month
                .values()
                .filter(|group| group.iter().any(|q| q.id == p.id))
                .count();
            let categories = indices
                .by_category
                .values()
                .filter(|group| group.iter().any(|q| q.id == p.id))
                .count();
            assert_eq!(1, months, "{}", p.id);
            assert_eq!(1, categories, "{}", p.id);
        }

        assert_eq!(
            vec!["2024-01", "2024-02"],
            indices.by_year_month.keys().collect::<Vec<_>>()
        );
        assert_eq!(vec!["c", "a"], ids(&indices.by_category["Go"]));
        Ok(())
    }

    #[test]
    fn test_tag_fan_out() -> Result<()> {
        let posts = vec![
            post("a.md", "a", (2024, 1, 5), "Go", &["a", "b"]),
            post("b.md", "b", (2024, 2, 5), "Go", &["b"]),
        ];
        let indices = build_indices(&posts)?;
        assert_eq!(vec!["a"], ids(&indices.by_tag["a"]));
        assert_eq!(vec!["b", "a"], ids(&indices.by_tag["b"]));
        assert_eq!(1, indices.by_category.len());
        Ok(())
    }

    #[test]
    fn test_repeated_tag_is_kept() -> Result<()> {
        let posts = vec![post("a.md", "a", (2024, 1, 5), "Go", &["x", "x"])];
        let indices = build_indices(&posts)?;
        assert_eq!(vec!["a", "a"], ids(&indices.by_tag["x"]));
        Ok(())
    }

    #[test]
    fn test_duplicate_url() {
        let posts = vec![
            post("2024/one.md", "same", (2024, 1, 5), "Go", &[]),
            post("2024/two.md", "same", (2024, 1, 20), "Go", &[]),
        ];
        match build_indices(&posts) {
            Err(Error::DuplicateUrl { url, first, second }) => {
                assert_eq!("/blog/2024/01/same/", url);
                assert_eq!(PathBuf::from("2024/one.md"), first);
                assert_eq!(PathBuf::from("2024/two.md"), second);
            }
            other => panic!("wanted DuplicateUrl; found {:?}", other),
        }
    }

    #[test]
    fn test_same_slug_in_different_months_is_fine() -> Result<()> {
        let posts = vec![
            post("a.md", "same", (2024, 1, 5), "Go", &[]),
            post("b.md", "same", (2024, 2, 5), "Go", &[]),
        ];
        assert_eq!(2, build_indices(&posts)?.chronological.len());
        Ok(())
    }

    #[test]
    fn test_category_slug_collision() {
        let posts = vec![
            post("a.md", "a", (2024, 1, 5), "Go", &[]),
            post("b.md", "b", (2024, 2, 5), "go", &[]),
        ];
        assert!(matches!(
            build_indices(&posts),
            Err(Error::SlugCollision { kind: "category", .. })
        ));
    }

    #[test]
    fn test_non_ascii_taxonomies_are_indexed() -> Result<()> {
        let posts = vec![
            post("a.md", "a", (2024, 1, 5), "개발", &["러스트", "???"]),
            post("b.md", "b", (2024, 2, 5), "개발", &["러스트"]),
        ];
        let indices = build_indices(&posts)?;
        assert_eq!(vec!["b", "a"], ids(&indices.by_category["개발"]));
        assert_eq!(vec!["b", "a"], ids(&indices.by_tag["러스트"]));
        assert_eq!(vec!["a"], ids(&indices.by_tag["???"]));
        Ok(())
    }

    #[test]
    fn test_non_ascii_tag_collision() {
        let posts = vec![
            post("a.md", "a", (2024, 1, 5), "Go", &["러스트 입문"]),
            post("b.md", "b", (2024, 2, 5), "Go", &["러스트  입문"]),
        ];
        assert!(matches!(
            build_indices(&posts),
            Err(Error::SlugCollision { kind: "tag", .. })
        ));
    }

    #[test]
    fn test_no_posts() -> Result<()> {
        let indices = build_indices(&[])?;
        assert!(indices.chronological.is_empty());
        assert!(indices.by_tag.is_empty());
        Ok(())
    }
}
