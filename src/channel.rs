//! Outbound messages to the host.
//!
//! Everything the synchronizer tells the outside world goes through a
//! [`MessageSink`]. Sending is fire-and-forget: a sink that cannot deliver a
//! message drops it, and emission never fails the operation that caused it.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::indexer::NarratableUnit;
use crate::position::LocationSnapshot;

/// A message for the host, serialized as JSON with a `tag` discriminator.
///
/// ```
/// use readsync::Message;
///
/// let json = serde_json::to_string(&Message::AdvanceRequested).unwrap();
/// assert_eq!(json, r#"{"tag":"AdvanceRequested"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag")]
pub enum Message {
    /// The session is ready.
    StartupNotice,

    /// The visible page moved.
    #[serde(rename_all = "camelCase")]
    LocationSnapshot {
        section_index: usize,
        progress_fraction: f64,
        #[serde(rename = "startPID")]
        start_pid: String,
        #[serde(rename = "endPID")]
        end_pid: String,
        /// Section seen before this relocation; `null` on the first one.
        previous_section_index: Option<usize>,
    },

    /// Narratable units of a newly displayed section.
    #[serde(rename_all = "camelCase")]
    SectionIndex {
        section_index: usize,
        units: Vec<NarratableUnit>,
    },

    /// The narration target lies past the visible page.
    AdvanceRequested,

    /// A unit, or a whole indexing pass, could not be completed.
    #[serde(rename_all = "camelCase")]
    IndexingError { section_index: usize, reason: String },
}

impl Message {
    pub fn location(snapshot: &LocationSnapshot, previous_section_index: Option<usize>) -> Self {
        Message::LocationSnapshot {
            section_index: snapshot.section_index,
            progress_fraction: snapshot.progress_fraction,
            start_pid: snapshot.start.as_str().to_string(),
            end_pid: snapshot.end.as_str().to_string(),
            previous_section_index,
        }
    }

    /// The `tag` value this message serializes with.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::StartupNotice => "StartupNotice",
            Message::LocationSnapshot { .. } => "LocationSnapshot",
            Message::SectionIndex { .. } => "SectionIndex",
            Message::AdvanceRequested => "AdvanceRequested",
            Message::IndexingError { .. } => "IndexingError",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Destination for outbound messages.
pub trait MessageSink {
    fn send(&mut self, message: Message);
}

impl MessageSink for Vec<Message> {
    fn send(&mut self, message: Message) {
        self.push(message);
    }
}

impl<S: MessageSink + ?Sized> MessageSink for &mut S {
    fn send(&mut self, message: Message) {
        (**self).send(message);
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    fn send(&mut self, message: Message) {
        (**self).send(message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn send(&mut self, _message: Message) {}
}

/// Writes one JSON document per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn send(&mut self, message: Message) {
        let result = serde_json::to_writer(&mut self.writer, &message)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush());
        if let Err(e) = result {
            log::debug!("dropped {} message: {e}", message.tag());
        }
    }
}

/// In-memory log of sent messages.
///
/// Clones share the same log, so a test can hand one clone to a session and
/// inspect the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    messages: Rc<RefCell<Vec<Message>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything sent so far.
    pub fn messages(&self) -> Vec<Message> {
        self.messages.borrow().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.messages.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }
}

impl MessageSink for RecordingSink {
    fn send(&mut self, message: Message) {
        self.messages.borrow_mut().push(message);
    }
}
