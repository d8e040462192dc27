//! Detsim engine -- the tick loop and lifecycle state machine, the event
//! source protocol and its built-in sources, the recorder and replayer, and
//! the external collaborator contracts. Built on top of `detsim-core`'s
//! leaf primitives.

#![deny(unsafe_code)]

pub mod engine;
pub mod event;
pub mod external;
pub mod recorder;
pub mod replay;
pub mod snapshot;

use crate::engine::GameState;

/// Errors produced by `detsim-engine` operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested action is not valid in the engine's current lifecycle
    /// state.
    #[error("cannot {action} while engine is in state {state:?}")]
    BadState { action: String, state: GameState },

    /// A lookup by id found nothing.
    #[error("no object with id '{id}' found in group '{type_name}'")]
    NotFound { type_name: String, id: String },

    /// A [`recorder::Recording`] failed one of its structural invariants.
    #[error("recording is invalid: {reason}")]
    InvalidRecording { reason: String },

    /// A registered event handler panicked during dispatch. Caught
    /// per-handler; the tick continues and remaining handlers still run.
    #[error("event handler for '{kind}' (input_type={input_type:?}) panicked: {detail}")]
    HandlerFault {
        kind: String,
        input_type: Option<String>,
        detail: String,
    },

    /// Propagated from `detsim-core` (e.g. a timer's firing pass exceeded
    /// its iteration bound).
    #[error(transparent)]
    Core(#[from] detsim_core::CoreError),
}

pub mod prelude {
    pub use crate::engine::{DestroyedReentrancyPolicy, Engine, EngineConfig, GameState, PrunePolicy};
    pub use crate::event::{Event, EventManager, EventSource, LiveSource, RecordedSource};
    pub use crate::external::{HeadlessLoader, Loader};
    pub use crate::recorder::{GameRecorder, Recording};
    pub use crate::replay::ReplayManager;
    pub use crate::snapshot::state_hash;
    pub use crate::EngineError;
}
