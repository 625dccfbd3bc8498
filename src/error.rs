//! Error types for readsync operations.

use thiserror::Error;

/// Errors that can occur while loading a book or setting up a session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Invalid narration selector: {0}")]
    InvalidSelector(String),

    #[error("Rendering engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Failures raised by a rendering engine.
///
/// When `current_section` or `content_tree` return one of these, the indexing
/// pass for that relocation is abandoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("no section is displayed")]
    NotDisplayed,

    #[error("section {0} does not exist")]
    SectionOutOfRange(usize),

    #[error("invalid position: {0}")]
    InvalidPosition(String),

    #[error("invalid range {start}..{end} for text of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("node is not part of the section content")]
    NodeNotFound,

    #[error("engine unavailable: {0}")]
    Unavailable(String),
}

/// Why a single narratable unit could not be anchored.
///
/// Always recoverable: the unit is dropped and indexing continues.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorFailure {
    #[error("element has no text to anchor")]
    EmptyText,

    #[error("text {0:?} not found in element")]
    TextNotFound(String),

    #[error("anchoring failed: {0}")]
    Engine(#[from] EngineError),
}

pub type Result<T> = std::result::Result<T, Error>;
