//! Narration index for the displayed section.
//!
//! Walks a section's content tree, picks the elements a screen reader would
//! announce, and anchors each one. The resulting [`ContentIndex`] is what a
//! text-to-speech host reads from, unit by unit, in document order.

use std::fmt;

use html5ever::LocalName;
use selectors::parser::Selector;
use serde::{Deserialize, Serialize};

use crate::codec::{self, AnchorMode};
use crate::config::ReaderConfig;
use crate::dom::{self, DomSelectors};
use crate::engine::{RenderingEngine, Section};
use crate::error::{AnchorFailure, EngineError, Result};
use crate::position::Pid;

/// A piece of content with the position it was anchored at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarratableUnit {
    pub text: String,
    pub position: Pid,
}

/// What kind of element a unit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// `<img>`; narrated through its alt text.
    Image,
    /// `<h1>` .. `<h6>`.
    Heading(u8),
    /// `<a>`.
    Link,
    /// Anything else the selector picked, typically `<span>`.
    Inline,
}

impl UnitKind {
    /// Classify an element by tag name.
    pub fn of(name: &LocalName) -> Self {
        match name.as_ref() {
            "img" => UnitKind::Image,
            "a" => UnitKind::Link,
            "h1" => UnitKind::Heading(1),
            "h2" => UnitKind::Heading(2),
            "h3" => UnitKind::Heading(3),
            "h4" => UnitKind::Heading(4),
            "h5" => UnitKind::Heading(5),
            "h6" => UnitKind::Heading(6),
            _ => UnitKind::Inline,
        }
    }

    fn anchor_mode(self) -> AnchorMode {
        match self {
            UnitKind::Image => AnchorMode::WholeNode,
            _ => AnchorMode::SubRange,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Image => f.write_str("image"),
            UnitKind::Heading(level) => write!(f, "h{level}"),
            UnitKind::Link => f.write_str("link"),
            UnitKind::Inline => f.write_str("inline"),
        }
    }
}

/// A unit that was dropped from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub kind: UnitKind,
    pub reason: AnchorFailure,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.reason)
    }
}

/// Narratable units of one section, in document order.
///
/// Partial indexes are normal: units that could not be anchored are listed
/// in `failures` and left out of `units`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentIndex {
    pub section: Section,
    pub units: Vec<NarratableUnit>,
    pub failures: Vec<UnitFailure>,
}

/// Compiled selector list choosing narratable elements.
#[derive(Debug, Clone)]
pub struct NarrationSelector {
    source: String,
    selectors: Vec<Selector<DomSelectors>>,
}

impl NarrationSelector {
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            source: source.to_string(),
            selectors: dom::parse_selector_list(source)?,
        })
    }

    pub fn from_config(config: &ReaderConfig) -> Result<Self> {
        Self::parse(&config.selector)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn selectors(&self) -> &[Selector<DomSelectors>] {
        &self.selectors
    }
}

/// Index the section the engine currently displays.
///
/// Fails only when the engine cannot say which section is displayed or hand
/// over its content; per-unit anchoring failures end up in the result.
pub fn build_index<E>(
    engine: &E,
    selector: &NarrationSelector,
) -> std::result::Result<ContentIndex, EngineError>
where
    E: RenderingEngine + ?Sized,
{
    let section = engine.current_section()?;
    index_section(engine, section, selector)
}

/// Index a given section.
pub fn index_section<E>(
    engine: &E,
    section: Section,
    selector: &NarrationSelector,
) -> std::result::Result<ContentIndex, EngineError>
where
    E: RenderingEngine + ?Sized,
{
    let tree = engine.content_tree(&section)?;

    let mut units = Vec::new();
    let mut failures = Vec::new();
    for node in dom::select_all(tree, tree.document(), selector.selectors()) {
        let Some(name) = tree.element_name(node) else {
            continue;
        };
        let kind = UnitKind::of(name);
        let text = match kind {
            UnitKind::Image => tree.get_attr(node, "alt").map(str::to_string),
            _ => Some(tree.text_content(node)),
        };

        match codec::anchor(engine, &section, tree, node, text.as_deref(), kind.anchor_mode()) {
            Ok(position) => units.push(NarratableUnit {
                text: text.unwrap_or_default().trim().to_string(),
                position,
            }),
            Err(reason) => {
                log::debug!("section {}: skipping {kind}: {reason}", section.index);
                failures.push(UnitFailure { kind, reason });
            }
        }
    }

    Ok(ContentIndex {
        section,
        units,
        failures,
    })
}
