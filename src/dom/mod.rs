//! Section content trees.
//!
//! Rendering engines hand the indexer an [`ArenaDom`] per section. This module
//! parses XHTML into that arena and runs CSS selector lists over it in
//! document order.
//!
//! ```
//! use readsync::dom::{parse_html, select_all, parse_selector_list};
//!
//! let dom = parse_html("<h1>Intro</h1><p>Body <span>text</span></p>");
//! let selectors = parse_selector_list("h1, span").unwrap();
//! let hits = select_all(&dom, dom.document(), &selectors);
//! assert_eq!(hits.len(), 2);
//! ```

mod arena;
mod element_ref;
mod tree_sink;

pub use arena::{ArenaDom, Attribute, Children, Descendants, Node, NodeData, NodeId};
pub use element_ref::{DomSelectors, ElementRef};

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::parser::{ParseRelative, Selector, SelectorList};

use crate::error::{Error, Result};
use tree_sink::ArenaSink;

/// Parse an HTML or XHTML document into an arena DOM.
///
/// Parsing is lenient; malformed markup is repaired the way browsers do.
pub fn parse_html(html: &str) -> ArenaDom {
    parse_document(ArenaSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Parse raw document bytes, honouring an XML declaration's encoding.
pub fn parse_html_bytes(bytes: &[u8]) -> ArenaDom {
    let hint = crate::util::extract_xml_encoding(bytes);
    let text = crate::util::decode_text(bytes, hint);
    parse_html(&text)
}

/// Parse a comma separated selector list such as `img, a, h1`.
pub fn parse_selector_list(css: &str) -> Result<Vec<Selector<DomSelectors>>> {
    let mut input = cssparser::ParserInput::new(css);
    let mut parser = cssparser::Parser::new(&mut input);
    let list = SelectorList::parse(&DomSelectors, &mut parser, ParseRelative::No)
        .map_err(|e| Error::InvalidSelector(format!("{css:?}: {:?}", e.kind)))?;
    Ok(list.slice().to_vec())
}

/// Whether `id` matches any of `selectors`.
pub fn matches_any(dom: &ArenaDom, id: NodeId, selectors: &[Selector<DomSelectors>]) -> bool {
    if !dom.is_element(id) {
        return false;
    }
    let mut caches = SelectorCaches::default();
    let mut context = MatchingContext::new(
        selectors::matching::MatchingMode::Normal,
        None,
        &mut caches,
        selectors::context::QuirksMode::NoQuirks,
        selectors::matching::NeedsSelectorFlags::No,
        selectors::matching::MatchingForInvalidation::No,
    );
    let elem = ElementRef::new(dom, id);
    selectors
        .iter()
        .any(|s| selectors::matching::matches_selector(s, 0, None, &elem, &mut context))
}

/// Elements under `root` matching any selector, in document order.
///
/// Like `querySelectorAll`, an element matching several selectors appears
/// once, at its own position in the tree.
pub fn select_all(
    dom: &ArenaDom,
    root: NodeId,
    selectors: &[Selector<DomSelectors>],
) -> Vec<NodeId> {
    dom.descendants(root)
        .filter(|&id| matches_any(dom, id, selectors))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dom: &ArenaDom, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| dom.element_name(id).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_select_all_is_document_order_not_selector_order() {
        let dom = parse_html(
            r#"<body>
                <span>one</span>
                <h2>two</h2>
                <p><a href="x.html">three</a><img alt="four"></p>
                <h1>five</h1>
            </body>"#,
        );
        let selectors = parse_selector_list("img, a, h1, h2, h3, span").unwrap();

        let hits = select_all(&dom, dom.document(), &selectors);
        assert_eq!(names(&dom, &hits), ["span", "h2", "a", "img", "h1"]);
    }

    #[test]
    fn test_nested_matches_parent_first() {
        let dom = parse_html(r#"<a href="n.html"><span>note</span></a>"#);
        let selectors = parse_selector_list("span, a").unwrap();

        let hits = select_all(&dom, dom.document(), &selectors);
        assert_eq!(names(&dom, &hits), ["a", "span"]);
    }

    #[test]
    fn test_class_and_descendant_selectors() {
        let dom = parse_html(
            r#"<div class="chapter"><p class="intro">Hello</p></div><p class="intro">Bye</p>"#,
        );
        let selectors = parse_selector_list("div.chapter .intro").unwrap();

        let hits = select_all(&dom, dom.document(), &selectors);
        assert_eq!(hits.len(), 1);
        assert_eq!(dom.text_content(hits[0]), "Hello");
    }

    #[test]
    fn test_link_pseudo_class() {
        let dom = parse_html(r#"<a href="x.html">go</a><a name="anchor">stay</a>"#);
        let selectors = parse_selector_list("a:link").unwrap();

        let hits = select_all(&dom, dom.document(), &selectors);
        assert_eq!(hits.len(), 1);
        assert_eq!(dom.text_content(hits[0]), "go");
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        assert!(matches!(
            parse_selector_list("h1 >>> ??"),
            Err(Error::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_parse_html_bytes_uses_declared_encoding() {
        // "café" in Windows-1252
        let bytes = b"<?xml version=\"1.0\" encoding=\"windows-1252\"?><p>caf\xe9</p>";
        let dom = parse_html_bytes(bytes);
        assert_eq!(dom.text_content(dom.body().unwrap()), "café");
    }
}
