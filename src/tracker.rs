//! Page-change handling.
//!
//! [`RelocationTracker`] turns each relocation into a location snapshot and,
//! when the displayed section changed, a fresh narration index.

use crate::channel::{Message, MessageSink};
use crate::engine::RenderingEngine;
use crate::error::EngineError;
use crate::indexer::{self, ContentIndex, NarrationSelector};
use crate::position::{LocationSnapshot, Relocation};

/// Where the tracker is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TrackerState {
    /// No relocation seen yet.
    #[default]
    Idle,
    Located(LocationSnapshot),
}

/// Reacts to relocation events.
#[derive(Debug, Clone)]
pub struct RelocationTracker {
    selector: NarrationSelector,
    state: TrackerState,
    /// Section of the previous relocation, reported in snapshots.
    last_section_index: Option<usize>,
    /// Section the current index was built for. Only updated by a pass that
    /// got through to the content tree.
    indexed_section: Option<usize>,
    /// Relocation section the current index answers. Differs from
    /// `indexed_section` when the engine disagrees with its own relocations.
    handled_section: Option<usize>,
}

impl RelocationTracker {
    pub fn new(selector: NarrationSelector) -> Self {
        Self {
            selector,
            state: TrackerState::Idle,
            last_section_index: None,
            indexed_section: None,
            handled_section: None,
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&LocationSnapshot> {
        match &self.state {
            TrackerState::Idle => None,
            TrackerState::Located(snapshot) => Some(snapshot),
        }
    }

    pub fn last_section_index(&self) -> Option<usize> {
        self.last_section_index
    }

    pub fn indexed_section(&self) -> Option<usize> {
        self.indexed_section
    }

    pub fn selector(&self) -> &NarrationSelector {
        &self.selector
    }

    /// Handle one relocation.
    ///
    /// Always emits exactly one [`Message::LocationSnapshot`]. When the
    /// relocation lands in a section other than the one last indexed, the
    /// section is indexed and its messages follow the snapshot.
    pub fn on_relocated<E, S>(&mut self, engine: &E, relocation: &Relocation, sink: &mut S)
    where
        E: RenderingEngine + ?Sized,
        S: MessageSink + ?Sized,
    {
        let progress_fraction = match engine.percentage_from_position(&relocation.start) {
            Ok(fraction) => fraction.clamp(0.0, 1.0),
            Err(e) => {
                let previous = self.snapshot().map_or(0.0, |s| s.progress_fraction);
                log::warn!("progress unavailable at {}: {e}; keeping {previous}", relocation.start);
                previous
            }
        };

        let snapshot = LocationSnapshot {
            section_index: relocation.section_index,
            progress_fraction,
            start: relocation.start.clone(),
            end: relocation.end.clone(),
        };
        sink.send(Message::location(&snapshot, self.last_section_index));
        self.state = TrackerState::Located(snapshot);
        self.last_section_index = Some(relocation.section_index);

        let section = Some(relocation.section_index);
        if self.handled_section != section
            && self.indexed_section != section
            && self.reindex(engine, sink).is_some()
        {
            self.handled_section = section;
        }
    }

    /// Index the engine's current section and emit the result, regardless of
    /// whether it changed. Returns the index when the pass could run.
    pub fn reindex<E, S>(&mut self, engine: &E, sink: &mut S) -> Option<ContentIndex>
    where
        E: RenderingEngine + ?Sized,
        S: MessageSink + ?Sized,
    {
        match indexer::build_index(engine, &self.selector) {
            Ok(index) => {
                let section_index = index.section.index;
                for failure in &index.failures {
                    sink.send(Message::IndexingError {
                        section_index,
                        reason: failure.to_string(),
                    });
                }
                log::info!(
                    "indexed section {section_index} ({}): {} units, {} skipped",
                    index.section.href,
                    index.units.len(),
                    index.failures.len()
                );
                sink.send(Message::SectionIndex {
                    section_index,
                    units: index.units.clone(),
                });
                self.indexed_section = Some(section_index);
                Some(index)
            }
            Err(e) => {
                self.report_unavailable(&e, sink);
                None
            }
        }
    }

    fn report_unavailable<S>(&self, error: &EngineError, sink: &mut S)
    where
        S: MessageSink + ?Sized,
    {
        // Before any relocation the book is assumed to open at its first section.
        let section_index = self.last_section_index.unwrap_or(0);
        log::warn!("indexing section {section_index} failed: {error}");
        sink.send(Message::IndexingError {
            section_index,
            reason: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::*;
    use crate::config::{DEFAULT_NARRATION_SELECTOR, ReaderConfig};
    use crate::dom::{ArenaDom, NodeId};
    use crate::engine::Section;
    use crate::paginated::PaginatedBook;
    use crate::position::Pid;

    fn tracker() -> RelocationTracker {
        RelocationTracker::new(NarrationSelector::parse(DEFAULT_NARRATION_SELECTOR).unwrap())
    }

    fn book(docs: &[&str]) -> PaginatedBook {
        let config = ReaderConfig::new().with_chars_per_page(8);
        PaginatedBook::from_html(
            docs.iter()
                .enumerate()
                .map(|(i, html)| (format!("ch{i}.xhtml"), *html)),
            &config,
        )
    }

    fn tags(messages: &[Message]) -> Vec<&'static str> {
        messages.iter().map(Message::tag).collect()
    }

    #[test]
    fn test_first_relocation_snapshots_then_indexes() {
        let mut book = book(&["<h1>Hello</h1>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let relocation = book.display(0).unwrap();
        tracker.on_relocated(&book, &relocation, &mut sink);

        assert_eq!(tags(&sink), ["LocationSnapshot", "SectionIndex"]);
        assert!(matches!(
            sink[0],
            Message::LocationSnapshot {
                section_index: 0,
                previous_section_index: None,
                ..
            }
        ));
        assert_eq!(tracker.indexed_section(), Some(0));
        assert_eq!(tracker.snapshot().unwrap().start, relocation.start);
    }

    #[test]
    fn test_same_section_only_snapshots() {
        let mut book = book(&["<h1>Long enough to span pages</h1>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let first = book.display(0).unwrap();
        tracker.on_relocated(&book, &first, &mut sink);
        sink.clear();

        let second = book.next_page().unwrap();
        tracker.on_relocated(&book, &second, &mut sink);

        assert_eq!(tags(&sink), ["LocationSnapshot"]);
        assert!(matches!(
            sink[0],
            Message::LocationSnapshot {
                previous_section_index: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_failures_precede_section_index() {
        let mut book = book(&[r#"<h1>Intro</h1><img alt="">"#]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let relocation = book.display(0).unwrap();
        tracker.on_relocated(&book, &relocation, &mut sink);

        assert_eq!(tags(&sink), ["LocationSnapshot", "IndexingError", "SectionIndex"]);
    }

    /// Engine that can paginate but not hand out content.
    struct Blind<'a> {
        inner: &'a PaginatedBook,
        progress: bool,
    }

    impl RenderingEngine for Blind<'_> {
        fn current_location(&self) -> Result<Relocation, EngineError> {
            self.inner.current_location()
        }
        fn percentage_from_position(&self, position: &Pid) -> Result<f64, EngineError> {
            if self.progress {
                self.inner.percentage_from_position(position)
            } else {
                Err(EngineError::Unavailable("no layout".into()))
            }
        }
        fn compare(&self, a: &Pid, b: &Pid) -> Result<Ordering, EngineError> {
            self.inner.compare(a, b)
        }
        fn current_section(&self) -> Result<Section, EngineError> {
            Err(EngineError::Unavailable("busy".into()))
        }
        fn content_tree(&self, section: &Section) -> Result<&ArenaDom, EngineError> {
            self.inner.content_tree(section)
        }
        fn anchor_range(
            &self,
            section: &Section,
            node: NodeId,
            start: usize,
            end: usize,
        ) -> Result<Pid, EngineError> {
            self.inner.anchor_range(section, node, start, end)
        }
        fn anchor_node(&self, section: &Section, node: NodeId) -> Result<Pid, EngineError> {
            self.inner.anchor_node(section, node)
        }
    }

    #[test]
    fn test_unavailable_engine_reports_once_and_retries() {
        let mut book = book(&["<h1>Hello there, reader</h1>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let first = book.display(0).unwrap();
        let blind = Blind {
            inner: &book,
            progress: true,
        };
        tracker.on_relocated(&blind, &first, &mut sink);
        assert_eq!(tags(&sink), ["LocationSnapshot", "IndexingError"]);
        assert_eq!(tracker.indexed_section(), None);
        sink.clear();

        let second = book.next_page().unwrap();
        tracker.on_relocated(&book, &second, &mut sink);
        assert_eq!(tags(&sink), ["LocationSnapshot", "SectionIndex"]);
    }

    #[test]
    fn test_unavailable_before_relocation_still_reports() {
        let book = book(&["<h1>Hello</h1>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let blind = Blind {
            inner: &book,
            progress: true,
        };
        assert!(tracker.reindex(&blind, &mut sink).is_none());
        assert_eq!(tags(&sink), ["IndexingError"]);
        assert!(matches!(
            sink[0],
            Message::IndexingError {
                section_index: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_disagreeing_engine_indexes_once() {
        let mut book = book(&["<h1>Long enough to span pages</h1>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        let mut first = book.display(0).unwrap();
        first.section_index = 4;
        tracker.on_relocated(&book, &first, &mut sink);
        assert_eq!(tags(&sink), ["LocationSnapshot", "SectionIndex"]);
        assert_eq!(tracker.indexed_section(), Some(0));
        sink.clear();

        let mut second = book.next_page().unwrap();
        second.section_index = 4;
        tracker.on_relocated(&book, &second, &mut sink);
        assert_eq!(tags(&sink), ["LocationSnapshot"]);
    }

    #[test]
    fn test_missing_progress_keeps_previous_fraction() {
        let mut book = book(&["<p>aaaaaaaa</p>", "<p>bbbbbbbb</p>"]);
        let mut tracker = tracker();
        let mut sink: Vec<Message> = Vec::new();

        book.display(0).unwrap();
        let second = book.next_page().unwrap();
        tracker.on_relocated(&book, &second, &mut sink);
        assert_eq!(tracker.snapshot().unwrap().progress_fraction, 0.5);

        let blind = Blind {
            inner: &book,
            progress: false,
        };
        tracker.on_relocated(&blind, &second, &mut sink);
        assert_eq!(tracker.snapshot().unwrap().progress_fraction, 0.5);
    }
}
