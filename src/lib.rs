//! The library code for the `quire` static blog generator. A build is a
//! one-way pipeline:
//!
//! 1. Discovering and reading source documents ([`crate::document`])
//! 2. Normalizing each document into a [`crate::post::Post`]
//!    ([`crate::post`])
//! 3. Grouping the posts into listings ([`crate::index`])
//! 4. Rendering the posts and listings to HTML pages ([`crate::write`])
//!
//! The third step is where the site's invariants are checked: every post URL
//! must be unique, and every listing is ordered newest first with ties broken
//! by source path. Each listing (all posts, one per month, one per category,
//! one per tag) is rendered as a single page.
//!
//! [`crate::build::build_site`] runs the whole pipeline and replaces the
//! output directory with the result.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod document;
pub mod index;
pub mod markdown;
pub mod post;
pub mod slug;
pub mod template;
pub mod write;
