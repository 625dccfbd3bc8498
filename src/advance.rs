//! Whether narration has run past the visible page.

use std::cmp::Ordering;

use crate::channel::{Message, MessageSink};
use crate::engine::RenderingEngine;
use crate::error::EngineError;
use crate::position::Pid;

/// Decide whether the page must turn to reach `target`.
///
/// The visible end is read fresh from the engine, not from the last
/// relocation, so a page turned since then is accounted for. Returns `true`
/// and emits one [`Message::AdvanceRequested`] only when `target` lies
/// strictly after the last visible position; turning the page is left to the
/// host. Engine failures propagate and emit nothing.
pub fn should_advance<E, S>(engine: &E, target: &Pid, sink: &mut S) -> Result<bool, EngineError>
where
    E: RenderingEngine + ?Sized,
    S: MessageSink + ?Sized,
{
    let visible = engine.current_location()?;
    let advance = engine.compare(target, &visible.end)? == Ordering::Greater;
    log::debug!("target {target} vs visible end {}: advance={advance}", visible.end);
    if advance {
        sink.send(Message::AdvanceRequested);
    }
    Ok(advance)
}
