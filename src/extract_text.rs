//! HTML→Text Extractor (component G) — strip HTML to plain text.

use scraper::{Html, Selector};

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "li", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "blockquote", "pre",
];

/// Strips `script`/`style` content and joins the remaining text nodes,
/// separating block-level elements with newlines. Heuristic by design
/// (§4.G) — its output is what the Gopher filter measures, not a faithful
/// rendering of the page.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let skip_selector = Selector::parse("script, style").expect("static selector is valid");
    let skip_ids: std::collections::HashSet<_> = document
        .select(&skip_selector)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let block_selector =
        Selector::parse(&BLOCK_TAGS.join(",")).expect("static selector is valid");
    let block_ids: std::collections::HashSet<_> = document
        .select(&block_selector)
        .map(|el| el.id())
        .collect();

    let mut out = String::new();
    for node in document.tree.nodes() {
        if skip_ids.contains(&node.id()) {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        } else if block_ids.contains(&node.id()) && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    out.trim().to_string()
}
