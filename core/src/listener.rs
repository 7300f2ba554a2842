//! Notification sinks.
//!
//! RULE: Listeners observe, they never feed back into the core.
//! The engine calls on_event() on each registered listener, in
//! registration order, for every event it emits.

use crate::event::GameEvent;

/// The contract every collaborator sink (audio cues, score UI) fulfills.
pub trait GameListener: Send {
    /// Unique stable name, used in logs.
    fn name(&self) -> &'static str;

    fn on_event(&mut self, event: &GameEvent);
}

/// Logs every event at debug level. Handy default for headless runs.
pub struct LogListener;

impl GameListener for LogListener {
    fn name(&self) -> &'static str { "log" }

    fn on_event(&mut self, event: &GameEvent) {
        log::debug!("event: {event:?}");
    }
}
