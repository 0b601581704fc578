// src/fetch/html.rs
// =============================================================================
// This module pulls what we need out of a gallery page's HTML.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
//
// And the `url` crate to resolve relative image sources against the page URL.
//
// Note: scraper's Html is not Send. Every function here parses and drops the
// document before returning, so async callers never hold it across an await.
// =============================================================================

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

// Extracts image URLs from a page
//
// Parameters:
//   html: the page content
//   page_url: URL of the page (for resolving relative sources)
//   image_host: only sources containing this string are kept
//
// Returns: absolute http(s) image URLs, duplicates removed, in page order
//
// Example:
//   html = "<img src='//images.example.com/a.jpg'>"
//   page_url = "https://example.com/p1/cats.html"
//   result = ["https://images.example.com/a.jpg"]
pub fn extract_image_urls(html: &str, page_url: &Url, image_host: &str) -> Vec<Url> {
    let mut images = Vec::new();
    let Ok(selector) = Selector::parse("img[src]") else {
        return images;
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        if !src.contains(image_host) {
            continue;
        }
        // Absolute sources parse as-is, relative ones are joined to the page
        let Ok(url) = page_url.join(src) else {
            continue;
        };
        if matches!(url.scheme(), "http" | "https") && seen.insert(url.clone()) {
            images.push(url);
        }
    }

    images
}

// Reads the site's page count from the pagination label
//
// The label's first text looks like "1 of 27" or "Page 1 of 27": the count
// is the last number in it.
pub fn parse_page_count(html: &str) -> Option<u32> {
    let selector = Selector::parse("li.pag-text").ok()?;
    let document = Html::parse_document(html);

    let label = document.select(&selector).next()?;
    let text = label.text().next()?;
    text.split_whitespace()
        .rev()
        .find_map(|word| word.parse().ok())
}

// The name an image is saved under: the last segment of its path
pub fn image_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .last()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}
