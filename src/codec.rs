//! Canonical positions for narratable content.
//!
//! Turns "this element" or "this text inside this element" into the engine's
//! own position identifier. Only the engine ever builds a [`Pid`]; this module
//! decides what to ask it for.

use crate::dom::{ArenaDom, NodeId};
use crate::engine::{RenderingEngine, Section};
use crate::error::AnchorFailure;
use crate::position::Pid;
use crate::util::find_char_range;

/// How an element is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMode {
    /// Anchor the whole element. Used for images, whose alt text is not part
    /// of the element's text content.
    WholeNode,
    /// Anchor the first occurrence of the text inside the element.
    SubRange,
}

/// Anchor `text` on `node`, issuing at most one engine call.
///
/// Surrounding whitespace is not narrated, so the trimmed text is what gets
/// located and anchored. Text that is empty after trimming, or that does not
/// occur verbatim in the element, fails without calling the engine.
pub fn anchor<E>(
    engine: &E,
    section: &Section,
    dom: &ArenaDom,
    node: NodeId,
    text: Option<&str>,
    mode: AnchorMode,
) -> Result<Pid, AnchorFailure>
where
    E: RenderingEngine + ?Sized,
{
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AnchorFailure::EmptyText);
    }

    match mode {
        AnchorMode::WholeNode => Ok(engine.anchor_node(section, node)?),
        AnchorMode::SubRange => {
            let content = dom.text_content(node);
            let (start, end) = find_char_range(&content, text)
                .ok_or_else(|| AnchorFailure::TextNotFound(text.to_string()))?;
            Ok(engine.anchor_range(section, node, start, end)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::error::EngineError;
    use crate::paginated::PaginatedBook;

    fn fixture(html: &str) -> (PaginatedBook, Section) {
        let book = PaginatedBook::from_html([("ch.xhtml", html)], &ReaderConfig::default());
        let section = book.sections().next().unwrap().clone();
        (book, section)
    }

    #[test]
    fn test_sub_range_anchors_trimmed_text() {
        let (book, section) = fixture("<h1>  Intro  </h1>");
        let dom = book.content_tree(&section).unwrap();
        let h1 = dom.find_by_tag("h1").unwrap();

        let text = Some("  Intro  ");
        let pid = anchor(&book, &section, dom, h1, text, AnchorMode::SubRange).unwrap();
        assert_eq!(pid.as_str(), "epubcfi(/6/2!/4/2,/1:2,/1:7)");
    }

    #[test]
    fn test_whole_node_anchors_element() {
        let (book, section) = fixture(r#"<p>x</p><img alt="A map">"#);
        let dom = book.content_tree(&section).unwrap();
        let img = dom.find_by_tag("img").unwrap();

        let pid = anchor(&book, &section, dom, img, Some("A map"), AnchorMode::WholeNode).unwrap();
        assert_eq!(pid.as_str(), "epubcfi(/6/2!/4/4)");
    }

    #[test]
    fn test_empty_text_fails() {
        let (book, section) = fixture(r#"<img alt=""><span>   </span>"#);
        let dom = book.content_tree(&section).unwrap();
        let img = dom.find_by_tag("img").unwrap();
        let span = dom.find_by_tag("span").unwrap();

        for (node, text, mode) in [
            (img, Some(""), AnchorMode::WholeNode),
            (img, None, AnchorMode::WholeNode),
            (span, Some("   "), AnchorMode::SubRange),
        ] {
            assert_eq!(
                anchor(&book, &section, dom, node, text, mode),
                Err(AnchorFailure::EmptyText)
            );
        }
    }

    #[test]
    fn test_text_not_found_fails() {
        let (book, section) = fixture("<span>visible</span>");
        let dom = book.content_tree(&section).unwrap();
        let span = dom.find_by_tag("span").unwrap();

        assert_eq!(
            anchor(&book, &section, dom, span, Some("hidden"), AnchorMode::SubRange),
            Err(AnchorFailure::TextNotFound("hidden".to_string()))
        );
    }

    #[test]
    fn test_engine_errors_are_wrapped() {
        let (book, section) = fixture("<span>text</span>");
        let dom = book.content_tree(&section).unwrap();
        let stranger = Section {
            index: 7,
            ..section.clone()
        };
        let span = dom.find_by_tag("span").unwrap();

        assert_eq!(
            anchor(&book, &stranger, dom, span, Some("text"), AnchorMode::SubRange),
            Err(AnchorFailure::Engine(EngineError::SectionOutOfRange(7)))
        );
    }
}
