//! Boundary with the pagination engine.
//!
//! The synchronizer never lays out or addresses content itself. Everything it
//! knows about the document comes through [`RenderingEngine`]: which section
//! is displayed, the section's content tree, how to turn a node or a text
//! range into a [`Pid`], and how two positions are ordered.
//!
//! Page-change notifications are delivered by whoever drives the engine,
//! by calling [`crate::ReadingSession::relocated`] with the [`Relocation`]
//! the engine produced.

use std::cmp::Ordering;

use crate::dom::{ArenaDom, NodeId};
use crate::error::EngineError;
use crate::position::{Pid, Relocation};

/// A displayed unit of content (usually one spine item).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Stable position of the section within the document.
    pub index: usize,
    /// Document path of the section, e.g. `OEBPS/text/ch03.xhtml`.
    pub href: String,
    /// Manifest id, when the document has one.
    pub idref: Option<String>,
}

/// Capabilities the synchronizer consumes from a rendering engine.
pub trait RenderingEngine {
    /// The page currently on screen, read fresh from the engine.
    fn current_location(&self) -> Result<Relocation, EngineError>;

    /// Map a position to reading progress in `[0, 1]`.
    fn percentage_from_position(&self, position: &Pid) -> Result<f64, EngineError>;

    /// Total order over positions of one document.
    fn compare(&self, a: &Pid, b: &Pid) -> Result<Ordering, EngineError>;

    /// The section currently rendered.
    fn current_section(&self) -> Result<Section, EngineError>;

    /// The queryable content tree of `section`.
    fn content_tree(&self, section: &Section) -> Result<&ArenaDom, EngineError>;

    /// Anchor the characters `[start, end)` of `node`'s text content.
    fn anchor_range(
        &self,
        section: &Section,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Pid, EngineError>;

    /// Anchor `node` as a whole.
    fn anchor_node(&self, section: &Section, node: NodeId) -> Result<Pid, EngineError>;
}

impl<E: RenderingEngine + ?Sized> RenderingEngine for &E {
    fn current_location(&self) -> Result<Relocation, EngineError> {
        (**self).current_location()
    }

    fn percentage_from_position(&self, position: &Pid) -> Result<f64, EngineError> {
        (**self).percentage_from_position(position)
    }

    fn compare(&self, a: &Pid, b: &Pid) -> Result<Ordering, EngineError> {
        (**self).compare(a, b)
    }

    fn current_section(&self) -> Result<Section, EngineError> {
        (**self).current_section()
    }

    fn content_tree(&self, section: &Section) -> Result<&ArenaDom, EngineError> {
        (**self).content_tree(section)
    }

    fn anchor_range(
        &self,
        section: &Section,
        node: NodeId,
        start: usize,
        end: usize,
    ) -> Result<Pid, EngineError> {
        (**self).anchor_range(section, node, start, end)
    }

    fn anchor_node(&self, section: &Section, node: NodeId) -> Result<Pid, EngineError> {
        (**self).anchor_node(section, node)
    }
}
