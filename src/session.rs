//! A reading session over one rendering engine.

use std::cell::RefCell;
use std::rc::Rc;

use crate::advance;
use crate::channel::{Message, MessageSink};
use crate::config::ReaderConfig;
use crate::engine::RenderingEngine;
use crate::error::{EngineError, Result};
use crate::indexer::{ContentIndex, NarrationSelector};
use crate::position::{LocationSnapshot, Pid, Relocation};
use crate::tracker::RelocationTracker;

/// Connects an engine's events to the host's message sink.
///
/// ```
/// use readsync::{Message, PaginatedBook, ReaderConfig, ReadingSession, RecordingSink};
///
/// let config = ReaderConfig::default();
/// let book = PaginatedBook::from_html([("ch1.xhtml", "<h1>Intro</h1>")], &config);
/// let log = RecordingSink::new();
/// let mut session = ReadingSession::new(book, log.clone(), &config).unwrap();
///
/// session.start();
/// let relocation = session.engine_mut().display(0).unwrap();
/// session.relocated(&relocation);
///
/// let tags: Vec<_> = log.messages().iter().map(Message::tag).collect();
/// assert_eq!(tags, ["StartupNotice", "LocationSnapshot", "SectionIndex"]);
/// ```
pub struct ReadingSession<E, S> {
    engine: E,
    sink: S,
    tracker: RelocationTracker,
}

impl<E: RenderingEngine, S: MessageSink> ReadingSession<E, S> {
    /// Fails only if the configured narration selector does not parse.
    pub fn new(engine: E, sink: S, config: &ReaderConfig) -> Result<Self> {
        let selector = NarrationSelector::from_config(config)?;
        Ok(Self {
            engine,
            sink,
            tracker: RelocationTracker::new(selector),
        })
    }

    /// Announce readiness to the host.
    pub fn start(&mut self) {
        self.sink.send(Message::StartupNotice);
    }

    /// Handle the engine's page-change notification.
    pub fn relocated(&mut self, relocation: &Relocation) {
        self.tracker
            .on_relocated(&self.engine, relocation, &mut self.sink);
    }

    pub fn should_advance(&mut self, target: &Pid) -> std::result::Result<bool, EngineError> {
        advance::should_advance(&self.engine, target, &mut self.sink)
    }

    /// Rebuild and re-emit the index of the displayed section.
    pub fn reindex(&mut self) -> Option<ContentIndex> {
        self.tracker.reindex(&self.engine, &mut self.sink)
    }

    pub fn snapshot(&self) -> Option<&LocationSnapshot> {
        self.tracker.snapshot()
    }

    pub fn last_section_index(&self) -> Option<usize> {
        self.tracker.last_section_index()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access for host-side navigation. Relocations it produces must
    /// still be passed to [`ReadingSession::relocated`].
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_parts(self) -> (E, S) {
        (self.engine, self.sink)
    }
}

/// Shared handle for hosts that deliver events through callbacks.
///
/// Event handlers may fire while a previous handler is still running (an
/// engine that reports a relocation from inside an indexing pass, say). Such
/// a relocation is dropped rather than starting a second pass.
pub struct SharedSession<E, S> {
    inner: Rc<RefCell<ReadingSession<E, S>>>,
}

impl<E, S> Clone for SharedSession<E, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: RenderingEngine, S: MessageSink> SharedSession<E, S> {
    pub fn new(session: ReadingSession<E, S>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
        }
    }

    /// Returns `false` if the event was ignored because the session is busy.
    pub fn relocated(&self, relocation: &Relocation) -> bool {
        match self.inner.try_borrow_mut() {
            Ok(mut session) => {
                session.relocated(relocation);
                true
            }
            Err(_) => {
                log::debug!(
                    "ignoring relocation to section {} during an active pass",
                    relocation.section_index
                );
                false
            }
        }
    }

    pub fn should_advance(&self, target: &Pid) -> std::result::Result<bool, EngineError> {
        let mut session = self
            .inner
            .try_borrow_mut()
            .map_err(|_| EngineError::Unavailable("session is busy".to_string()))?;
        session.should_advance(target)
    }

    pub fn reindex(&self) -> Option<ContentIndex> {
        match self.inner.try_borrow_mut() {
            Ok(mut session) => session.reindex(),
            Err(_) => {
                log::debug!("ignoring reindex during an active pass");
                None
            }
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.try_borrow_mut().is_err()
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// Panics if called from inside another `with` on the same session.
    pub fn with<R>(&self, f: impl FnOnce(&mut ReadingSession<E, S>) -> R) -> R {
        f(&mut *self.inner.borrow_mut())
    }
}
