//! Link Extractor (component D) — HTML → outbound URL set.

use indexmap::IndexSet;
use scraper::{Html, Selector};
use url::Url;

/// Path suffixes rejected case-insensitively, per §4.D.
const REJECTED_EXTENSIONS: &[&str] = &[
    ".zip", ".pdf", ".exe", ".tar.gz", ".tgz", ".dmg", ".rar", ".7z",
];

/// Parse `html`, resolve every anchor `href` against `base`, and return the
/// deduplicated set of surviving absolute HTTP(S) URLs, in the order their
/// anchors first appear in the document — the Crawler relies on this
/// ordering for deterministic same-depth BFS enqueue order (§4.E, S1/S2).
pub fn extract_links(html: &str, base: &Url) -> IndexSet<Url> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a").expect("static selector is valid");

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve(base, href))
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| !has_rejected_extension(url))
        .collect()
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute);
    }
    base.join(href).ok()
}

fn has_rejected_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    REJECTED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
