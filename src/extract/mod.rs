//! Image descriptor extraction from search page bodies.
//!
//! A search page arrives as a script snippet that appends an HTML fragment
//! to the results grid, e.g. `insertAdjacentHTML('beforeend', '<div>...</div>')`.
//! This module pulls that fragment out, unescapes it, and reads the image
//! URLs from the `img` elements inside.
//!
//! A body without a recognizable fragment, or a fragment without images,
//! yields an empty list. That is the normal end-of-results signal and is
//! not an error; transport failures are reported by the page source.

mod descriptor;

pub use descriptor::ImageDescriptor;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument, trace};

/// Matches the quoted fragment argument of the `beforeend` insertion call.
#[allow(clippy::expect_used)]
static FRAGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\('beforeend',\s*'(.*)'\)").expect("fragment regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector is valid"));

/// Extracts image descriptors from a search page body.
///
/// The result is deduplicated by identifier (first appearance wins) and
/// otherwise keeps page order.
///
/// # Examples
///
/// ```
/// use harvester_core::extract_images;
///
/// let body = r#"$('.grid').insertAdjacentHTML('beforeend', '<img srcset=\"https://i.test/p/1.jpeg?w=500 1x\">')"#;
/// let images = extract_images(body);
/// assert_eq!(images.len(), 1);
/// assert_eq!(images[0].identifier(), "1");
///
/// assert!(extract_images("<html>no results</html>").is_empty());
/// ```
#[must_use]
#[instrument(skip(body), fields(body_len = body.len()))]
pub fn extract_images(body: &str) -> Vec<ImageDescriptor> {
    let Some(fragment) = find_fragment(body) else {
        debug!("no image fragment in page body");
        return Vec::new();
    };

    let mut seen_urls = HashSet::new();
    let mut seen_identifiers = HashSet::new();
    let mut images = Vec::new();

    for url in image_urls(&fragment) {
        if url.is_empty() || !seen_urls.insert(url.clone()) {
            continue;
        }
        let Some(descriptor) = ImageDescriptor::from_url(url) else {
            continue;
        };
        if seen_identifiers.insert(descriptor.identifier().to_string()) {
            images.push(descriptor);
        } else {
            trace!(url = %descriptor.url(), "dropping duplicate identifier");
        }
    }

    debug!(images = images.len(), "extracted images");
    images
}

/// Returns the unescaped HTML fragment embedded in a page body.
#[must_use]
pub fn find_fragment(body: &str) -> Option<String> {
    FRAGMENT_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape_js(m.as_str()))
}

/// Collects one candidate URL per `img` element, in document order.
fn image_urls(fragment: &str) -> Vec<String> {
    let document = Html::parse_fragment(fragment);
    document
        .select(&IMG_SELECTOR)
        .filter_map(|img| {
            let element = img.value();
            element.attr("srcset").or_else(|| element.attr("src"))
        })
        .map(|raw| candidate_url(&raw.replace("\\\"", "")).to_string())
        .collect()
}

/// Reduces a `srcset`/`src` value to a bare image URL.
///
/// Everything from the first `?` is dropped; without a query the first
/// whitespace- or comma-delimited token is taken.
fn candidate_url(raw: &str) -> &str {
    let raw = raw.trim();
    let end = raw
        .find('?')
        .or_else(|| raw.find(|c: char| c.is_whitespace() || c == ','))
        .unwrap_or(raw.len());
    raw[..end].trim()
}

/// Undoes the escapes of a single-quoted JavaScript string literal.
fn unescape_js(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(esc @ ('\\' | '\'' | '"' | '/')) => out.push(esc),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
