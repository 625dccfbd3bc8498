//! Reading positions as the engine reports them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque position identifier issued by a rendering engine.
///
/// The string is engine-defined (an EPUB CFI for [`crate::PaginatedBook`]).
/// Nothing outside the engine interprets it; ordering two positions always
/// goes through [`crate::RenderingEngine::compare`], which is why `Pid` has no
/// `Ord` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(String);

impl Pid {
    /// Wrap an engine-produced identifier.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of the engine's page-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// First visible position.
    pub start: Pid,
    /// Last visible position.
    pub end: Pid,
    /// Index of the section the page belongs to.
    pub section_index: usize,
}

/// Where the visible page currently is.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSnapshot {
    pub section_index: usize,
    /// Reading progress through the whole document, in `[0, 1]`.
    pub progress_fraction: f64,
    pub start: Pid,
    pub end: Pid,
}
