// ABOUTME: Readable-text extraction from a page's main region (article, main, body, then whole document).
// ABOUTME: Skips script/style/noscript/svg/template subtrees and collapses whitespace.

use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};

use crate::text::{collapse_whitespace, decode_entities, strip_weird_characters};

static REGION_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

const SKIPPED: &[&str] = &["script", "style", "noscript", "svg", "template"];

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
            }
            Node::Element(el) => {
                if SKIPPED.contains(&el.name()) {
                    out.push(' ');
                    continue;
                }
                out.push(' ');
                collect_text(child, out);
                out.push(' ');
            }
            _ => {}
        }
    }
}

/// Readable text of the page's main region.
pub fn extract_readable_text(doc: &Html) -> String {
    let region = REGION_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .map(|el| *el)
        .unwrap_or_else(|| doc.tree.root());

    let mut raw = String::new();
    collect_text(region, &mut raw);
    let decoded = decode_entities(&raw);
    collapse_whitespace(&strip_weird_characters(&decoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_over_body() {
        let doc = Html::parse_document(
            "<html><body><nav>Menu</nav><article><h1>Head</h1><p>Body&nbsp;text</p></article></body></html>",
        );
        assert_eq!(extract_readable_text(&doc), "Head Body text");
    }

    #[test]
    fn falls_back_to_main_then_body() {
        let doc = Html::parse_document("<body><main><p>Main part</p></main><p>Other</p></body>");
        assert_eq!(extract_readable_text(&doc), "Main part");

        let doc = Html::parse_document("<body><div>Just <b>body</b></div></body>");
        assert_eq!(extract_readable_text(&doc), "Just body");
    }

    #[test]
    fn skips_non_content_subtrees() {
        let doc = Html::parse_document(
            "<body><p>Keep</p><script>var x = 1;</script><style>p{}</style><svg><text>icon</text></svg><noscript>enable js</noscript><p>this</p></body>",
        );
        assert_eq!(extract_readable_text(&doc), "Keep this");
    }

    #[test]
    fn empty_document_yields_empty_text() {
        let doc = Html::parse_document("");
        assert_eq!(extract_readable_text(&doc), "");
    }
}
