//! # readsync
//!
//! Reading-position synchronization and narration indexing for paginated
//! ebooks.
//!
//! A host renders a document with some pagination engine and forwards the
//! engine's page-change notifications to a [`ReadingSession`]. The session
//! answers with messages for the host: where the reader is and how far along,
//! which pieces of the displayed section a screen reader should announce (each
//! with a position the engine can navigate to), and whether narration has
//! moved past the visible page.
//!
//! ## Features
//!
//! - Location snapshots with reading progress on every relocation
//! - Narration index (headings, links, inline spans, images with alt text)
//!   rebuilt whenever the displayed section changes
//! - Page-advance decisions against the live engine location
//! - JSON messages with a `tag` discriminator, sent to any [`MessageSink`]
//! - A reference engine, [`PaginatedBook`], loading EPUBs and addressing
//!   content with EPUB CFIs
//!
//! ## Quick Start
//!
//! ```
//! use readsync::{Message, PaginatedBook, ReaderConfig, ReadingSession, RecordingSink};
//!
//! let config = ReaderConfig::default().with_chars_per_page(16);
//! let book = PaginatedBook::from_html(
//!     [("ch1.xhtml", "<h1>Intro</h1><p>A few words of text.</p>")],
//!     &config,
//! );
//! let log = RecordingSink::new();
//! let mut session = ReadingSession::new(book, log.clone(), &config)?;
//!
//! session.start();
//! let relocation = session.engine_mut().display(0)?;
//! session.relocated(&relocation);
//!
//! let Some(Message::SectionIndex { units, .. }) = log.messages().pop() else {
//!     panic!("expected an index");
//! };
//! assert_eq!(units[0].text, "Intro");
//! assert!(!session.should_advance(&units[0].position)?);
//! # Ok::<(), readsync::Error>(())
//! ```
//!
//! Hosts with their own renderer implement [`RenderingEngine`] over it
//! instead of using [`PaginatedBook`].

pub mod advance;
pub mod cfi;
pub mod channel;
pub mod codec;
pub mod config;
pub mod dom;
pub mod engine;
pub mod epub;
pub mod error;
pub mod indexer;
pub mod paginated;
pub mod position;
pub mod session;
pub mod tracker;
pub(crate) mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use channel::{JsonLinesSink, Message, MessageSink, NullSink, RecordingSink};
pub use config::ReaderConfig;
pub use engine::{RenderingEngine, Section};
pub use error::{AnchorFailure, EngineError, Error, Result};
pub use indexer::{ContentIndex, NarratableUnit, NarrationSelector};
pub use paginated::PaginatedBook;
pub use position::{LocationSnapshot, Pid, Relocation};
pub use session::{ReadingSession, SharedSession};
