//! The event pipeline: a pluggable [`EventSource`] feeding an
//! [`EventManager`] that dispatches to registered handlers within a tick
//! boundary.

use crate::EngineError;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// A tagged event record. `tick` is the tick it must be dispatched on;
/// `timestamp` is informational wall-clock metadata, never used for
/// ordering during replay.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub kind: String,
    pub input_type: Option<String>,
    pub tick: f64,
    pub timestamp: f64,
    pub params: serde_json::Value,
}

/// A pluggable producer of due events.
pub trait EventSource {
    /// Returns and removes every event due at or before `current_tick`, in
    /// `(tick, insertion)` order.
    fn get_next_events(&mut self, current_tick: f64) -> Vec<Event>;
    fn has_more_events(&self) -> bool;
    fn reset(&mut self) {}

    /// Whether events from this source should be observed by an attached
    /// recorder. `true` only for sources fed by real external input --
    /// replaying a [`RecordedSource`] must not re-record the replay.
    fn is_live(&self) -> bool {
        false
    }
}

fn now_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Events originating from external runtime input, queued by the host and
/// drained on every `get_next_events` call.
#[derive(Default)]
pub struct LiveSource {
    queued: Vec<Event>,
}

impl LiveSource {
    pub fn new() -> Self {
        Self { queued: Vec::new() }
    }

    pub fn queue_input(&mut self, input_type: &str, params: serde_json::Value) {
        self.queued.push(Event {
            kind: "USER_INPUT".to_owned(),
            input_type: Some(input_type.to_owned()),
            tick: 0.0,
            timestamp: now_millis(),
            params,
        });
    }
}

impl EventSource for LiveSource {
    fn get_next_events(&mut self, current_tick: f64) -> Vec<Event> {
        let mut out = std::mem::take(&mut self.queued);
        for event in out.iter_mut() {
            event.tick = current_tick;
        }
        out
    }

    fn has_more_events(&self) -> bool {
        !self.queued.is_empty()
    }

    fn reset(&mut self) {
        self.queued.clear();
    }

    fn is_live(&self) -> bool {
        true
    }
}

/// An event source that replays a fixed, pre-sorted list of events.
pub struct RecordedSource {
    events: Vec<Event>,
    cursor: usize,
}

impl RecordedSource {
    /// `events` must be sorted non-decreasing by `tick`; this is the same
    /// invariant a [`crate::recorder::Recording`] upholds.
    pub fn new(events: Vec<Event>) -> Self {
        Self { events, cursor: 0 }
    }
}

impl EventSource for RecordedSource {
    fn get_next_events(&mut self, current_tick: f64) -> Vec<Event> {
        let mut out = Vec::new();
        while self.cursor < self.events.len() && self.events[self.cursor].tick <= current_tick {
            out.push(self.events[self.cursor].clone());
            self.cursor += 1;
        }
        out
    }

    fn has_more_events(&self) -> bool {
        self.cursor < self.events.len()
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

type HandlerKey = (String, Option<String>);
type Handler = Box<dyn FnMut(&Event)>;

/// Owns the active [`EventSource`] and the `(kind, input_type)` keyed
/// handler table, and dispatches due events to matching handlers in
/// registration order.
pub struct EventManager {
    source: Box<dyn EventSource>,
    handlers: HashMap<HandlerKey, Vec<Handler>>,
}

impl EventManager {
    pub fn new(source: Box<dyn EventSource>) -> Self {
        Self {
            source,
            handlers: HashMap::new(),
        }
    }

    pub fn set_source(&mut self, source: Box<dyn EventSource>) {
        self.source = source;
    }

    pub fn source(&self) -> &dyn EventSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn EventSource {
        self.source.as_mut()
    }

    /// Registers `handler` for events matching `(kind, input_type)`. Pass
    /// `None` for `input_type` to match events that themselves carry no
    /// input type (e.g. `OBJECT_UPDATE`), not as a wildcard.
    pub fn on(&mut self, kind: &str, input_type: Option<&str>, handler: impl FnMut(&Event) + 'static) {
        let key = (kind.to_owned(), input_type.map(str::to_owned));
        self.handlers.entry(key).or_default().push(Box::new(handler));
    }

    /// Pulls every event due at `current_tick` from the active source and
    /// dispatches each to its matching handlers, in source order. Returns
    /// the events that were dispatched, so the caller (the engine) can feed
    /// them to a recorder when the source is live.
    ///
    /// A handler that panics is caught and logged; it does not prevent
    /// remaining handlers (for this event or later due events) from running.
    pub fn pump(&mut self, current_tick: f64) -> Vec<Event> {
        let due = self.source.get_next_events(current_tick);
        for event in &due {
            let key = (event.kind.clone(), event.input_type.clone());
            if let Some(list) = self.handlers.get_mut(&key) {
                for handler in list.iter_mut() {
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                        let detail = panic_message(payload.as_ref());
                        let fault = EngineError::HandlerFault {
                            kind: event.kind.clone(),
                            input_type: event.input_type.clone(),
                            detail,
                        };
                        warn!(error = %fault, tick = event.tick, "event handler panicked; dispatch continues");
                    }
                }
            }
        }
        due
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
