//! Defines [`slugify`], the function used to turn free text (file stems,
//! category names, tag names) into URL path segments, and [`path_segment`],
//! which falls back to a non-empty segment where [`slugify`] gives up.

use unicode_normalization::UnicodeNormalization;

/// Converts `text` into a lowercase, hyphenated URL segment.
///
/// The text is first decomposed (NFKD) so that accented letters split into a
/// base letter plus a combining mark. Everything that isn't an ASCII word
/// character (`[A-Za-z0-9_]`), whitespace, or a hyphen is then dropped, the
/// result is trimmed, each run of whitespace becomes a single `-`, and the
/// whole thing is lowercased.
///
/// ```
/// assert_eq!(quire::slug::slugify("Héllo, World!"), "hello-world");
/// ```
///
/// Existing hyphens are kept verbatim, so `"a - b"` becomes `"a---b"`. Text
/// made entirely of non-ASCII letters (e.g. Hangul) slugifies to the empty
/// string; callers decide whether that is acceptable.
pub fn slugify(text: &str) -> String {
    let kept: String = text
        .nfkd()
        .filter(|c| is_word_char(*c) || c.is_whitespace() || *c == '-')
        .collect();

    kept.split_whitespace()
        .collect::<Vec<&str>>()
        .join("-")
        .to_lowercase()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Converts `text` into a URL path segment that is never empty for
/// non-empty input.
///
/// This is [`slugify`] when that yields something. Otherwise Unicode letters
/// and digits are kept (NFC-normalized, whitespace runs joined with `-`,
/// lowercased), so `"개발"` stays `"개발"`. Text with no letters or digits at
/// all becomes the lowercase hex of its UTF-8 bytes.
///
/// ```
/// use quire::slug::path_segment;
/// assert_eq!(path_segment("Web Dev"), "web-dev");
/// assert_eq!(path_segment("러스트 입문"), "러스트-입문");
/// assert_eq!(path_segment("???"), "3f3f3f");
/// ```
pub fn path_segment(text: &str) -> String {
    let slug = slugify(text);
    if !slug.is_empty() {
        return slug;
    }

    let kept: String = text
        .nfc()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
        .collect();
    let unicode = kept
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join("-")
        .to_lowercase();
    if !unicode.is_empty() {
        return unicode;
    }

    text.bytes().map(|b| format!("{:02x}", b)).collect()
}
