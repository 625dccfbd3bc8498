//! WASM bindings for running a reading session inside a web view.
//!
//! Messages are delivered to a JavaScript callback as JSON strings, the same
//! documents the JSON-lines sink writes.

use wasm_bindgen::prelude::*;

use crate::channel::{Message, MessageSink};
use crate::config::ReaderConfig;
use crate::engine::RenderingEngine;
use crate::paginated::PaginatedBook;
use crate::position::Pid;
use crate::session::ReadingSession;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Sink that hands each message to a JavaScript function.
pub struct PostMessageSink {
    callback: js_sys::Function,
}

impl PostMessageSink {
    pub fn new(callback: js_sys::Function) -> Self {
        Self { callback }
    }
}

impl MessageSink for PostMessageSink {
    fn send(&mut self, message: Message) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::debug!("dropped {} message: {e}", message.tag());
                return;
            }
        };
        if let Err(e) = self.callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            log::debug!("postMessage callback failed for {}: {e:?}", message.tag());
        }
    }
}

/// A reading session over an EPUB, driven from JavaScript.
#[wasm_bindgen]
pub struct Reader {
    session: ReadingSession<PaginatedBook, PostMessageSink>,
}

#[wasm_bindgen]
impl Reader {
    /// Load an EPUB and announce startup through `on_message`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        data: &[u8],
        on_message: js_sys::Function,
        chars_per_page: Option<usize>,
    ) -> Result<Reader, JsValue> {
        let mut config = ReaderConfig::default();
        if let Some(chars) = chars_per_page {
            config = config.with_chars_per_page(chars);
        }
        let book = crate::epub::from_bytes(data, &config).map_err(js_error)?;
        let mut session = ReadingSession::new(book, PostMessageSink::new(on_message), &config)
            .map_err(js_error)?;
        session.start();
        Ok(Reader { session })
    }

    #[wasm_bindgen(js_name = sectionCount)]
    pub fn section_count(&self) -> usize {
        self.session.engine().section_count()
    }

    pub fn display(&mut self, section: usize) -> Result<(), JsValue> {
        let relocation = self.session.engine_mut().display(section).map_err(js_error)?;
        self.session.relocated(&relocation);
        Ok(())
    }

    #[wasm_bindgen(js_name = displayPosition)]
    pub fn display_position(&mut self, pid: &str) -> Result<(), JsValue> {
        let relocation = self
            .session
            .engine_mut()
            .display_position(&Pid::new(pid))
            .map_err(js_error)?;
        self.session.relocated(&relocation);
        Ok(())
    }

    /// Returns `false` at the end of the book.
    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&mut self) -> bool {
        match self.session.engine_mut().next_page() {
            Some(relocation) => {
                self.session.relocated(&relocation);
                true
            }
            None => false,
        }
    }

    /// Returns `false` at the start of the book.
    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&mut self) -> bool {
        match self.session.engine_mut().prev_page() {
            Some(relocation) => {
                self.session.relocated(&relocation);
                true
            }
            None => false,
        }
    }

    #[wasm_bindgen(js_name = shouldAdvance)]
    pub fn should_advance(&mut self, pid: &str) -> Result<bool, JsValue> {
        self.session
            .should_advance(&Pid::new(pid))
            .map_err(js_error)
    }

    pub fn reindex(&mut self) {
        self.session.reindex();
    }
}

/// Order two positions of `data`: -1, 0 or 1.
#[wasm_bindgen(js_name = comparePositions)]
pub fn compare_positions(data: &[u8], a: &str, b: &str) -> Result<i32, JsValue> {
    let book = crate::epub::from_bytes(data, &ReaderConfig::default()).map_err(js_error)?;
    let ordering = book
        .compare(&Pid::new(a), &Pid::new(b))
        .map_err(js_error)?;
    Ok(ordering as i32)
}
