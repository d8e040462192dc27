//! Recording capture: [`GameRecorder`] observes a running engine and
//! produces a portable [`Recording`] that [`crate::replay::ReplayManager`]
//! can play back bit-for-bit.

use crate::event::Event;
use crate::EngineError;
use detsim_core::serializer::{SerializedValue, Serializer, TypeRegistry};
use serde::{Deserialize, Serialize};

/// A self-contained, portable capture of one session: the seed, every
/// externally originated event, and the sequence of tick deltas that
/// advanced the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub seed: String,
    pub events: Vec<Event>,
    pub delta_ticks: Vec<f64>,
    pub total_ticks: f64,
    pub game_config: Option<serde_json::Value>,
}

const TOTAL_TICKS_TOLERANCE: f64 = 1e-3;

impl Recording {
    /// Checks the invariants a well-formed recording must satisfy before
    /// it is handed to a replay: events sorted non-decreasing by tick,
    /// every event within `total_ticks`, every delta positive, and
    /// `sum(delta_ticks)` matching `total_ticks` within tolerance.
    pub fn validate(&self) -> Result<(), EngineError> {
        for pair in self.events.windows(2) {
            if pair[1].tick < pair[0].tick {
                return Err(EngineError::InvalidRecording {
                    reason: format!(
                        "events are not sorted non-decreasing by tick ({} before {})",
                        pair[0].tick, pair[1].tick
                    ),
                });
            }
        }
        for event in &self.events {
            if event.tick > self.total_ticks {
                return Err(EngineError::InvalidRecording {
                    reason: format!(
                        "event at tick {} exceeds total_ticks {}",
                        event.tick, self.total_ticks
                    ),
                });
            }
        }
        for delta in &self.delta_ticks {
            if *delta <= 0.0 {
                return Err(EngineError::InvalidRecording {
                    reason: format!("delta_ticks must all be positive, found {delta}"),
                });
            }
        }
        let sum: f64 = self.delta_ticks.iter().sum();
        if (sum - self.total_ticks).abs() > TOTAL_TICKS_TOLERANCE {
            return Err(EngineError::InvalidRecording {
                reason: format!(
                    "sum(delta_ticks) = {sum} does not match total_ticks = {}",
                    self.total_ticks
                ),
            });
        }
        Ok(())
    }

    /// Serializes this recording through the registered-type serializer
    /// (§4.8's `{__type,__data}` wrapping) rather than bare `serde_json`, so
    /// a `game_config`/event `params` payload built from host-registered
    /// types round-trips via their registered hooks instead of degrading to
    /// an untyped record on the wire.
    pub fn to_wire(&self, registry: &TypeRegistry) -> Result<SerializedValue, EngineError> {
        let raw = serde_json::to_value(self).expect("Recording is always representable as JSON");
        let wrapped = Serializer::new(registry).serialize_value(&raw)?;
        Ok(wrapped)
    }

    /// Reconstructs a `Recording` from a value produced by
    /// [`Recording::to_wire`] with the same registry.
    pub fn from_wire(wire: &SerializedValue, registry: &TypeRegistry) -> Result<Recording, EngineError> {
        let raw = Serializer::new(registry).deserialize_value(wire)?;
        serde_json::from_value(raw).map_err(|e| EngineError::InvalidRecording {
            reason: format!("wire value did not match the recording schema: {e}"),
        })
    }
}

/// Attaches to a running [`crate::engine::Engine`] via
/// [`crate::engine::Engine::set_recorder`] and accumulates a [`Recording`].
pub struct GameRecorder {
    seed: String,
    game_config: Option<serde_json::Value>,
    events: Vec<Event>,
    delta_ticks: Vec<f64>,
    total_ticks: f64,
}

impl GameRecorder {
    pub fn start(seed: impl Into<String>, game_config: Option<serde_json::Value>) -> Self {
        Self {
            seed: seed.into(),
            game_config,
            events: Vec::new(),
            delta_ticks: Vec::new(),
            total_ticks: 0.0,
        }
    }

    /// Records one `update` call's delta. Called for every tick while
    /// attached, regardless of which event source is active.
    pub fn record_tick(&mut self, delta_ticks: f64) {
        debug_assert!(delta_ticks > 0.0);
        self.delta_ticks.push(delta_ticks);
        self.total_ticks += delta_ticks;
    }

    /// Records events dispatched via the live input path. The engine must
    /// not call this for events sourced from a `RecordedSource` -- doing so
    /// would re-record a replay.
    pub fn record_events(&mut self, events: &[Event]) {
        if let (Some(last), Some(first_new)) = (self.events.last(), events.first()) {
            debug_assert!(
                first_new.tick >= last.tick,
                "recorded events must arrive in non-decreasing tick order"
            );
        }
        self.events.extend_from_slice(events);
    }

    pub fn total_ticks_so_far(&self) -> f64 {
        self.total_ticks
    }

    /// Finalizes the capture into an immutable, portable [`Recording`].
    pub fn finish(self) -> Recording {
        Recording {
            seed: self.seed,
            events: self.events,
            delta_ticks: self.delta_ticks,
            total_ticks: self.total_ticks,
            game_config: self.game_config,
        }
    }
}
