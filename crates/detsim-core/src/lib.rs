//! Detsim core -- leaf primitives for a deterministic, tick-driven
//! simulation: vectors, the serializer and its type registry, a generic
//! event emitter, the ALEA PRNG, the timer wheel, the point-keyed collision
//! grid, and the object/object-group model.
//!
//! Nothing in this crate knows about ticks-as-a-loop, event sources, or
//! recording -- those live one layer up, in `detsim-engine`. This crate is
//! the set of inert building blocks an engine is assembled from.
//!
//! # Quick start
//!
//! ```
//! use detsim_core::prelude::*;
//!
//! let mut prng = Alea::new("demo-seed");
//! let roll = prng.random_int(1, 6);
//! assert!((1..=6).contains(&roll));
//! ```

#![deny(unsafe_code)]

pub mod collision;
pub mod emitter;
pub mod object;
pub mod ordered_map;
pub mod prng;
pub mod serializer;
pub mod timer;
pub mod vector2d;

/// Errors produced by `detsim-core` operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A timer's re-entrant firing pass exceeded the bounded iteration
    /// limit within a single tick.
    #[error("timer firing pass exceeded {limit} iterations in a single tick")]
    TimerLimitExceeded { limit: u32 },

    /// The serializer encountered a self-referential structure.
    #[error("circular reference detected while serializing (recursion limit {limit})")]
    CycleDetected { limit: u32 },

    /// A `__type` tag referenced a name absent from the type registry.
    #[error("type '{name}' is not registered")]
    UnknownType { name: String },

    /// A registered type's `deserialize` hook failed to reconstruct a value.
    #[error("failed to deserialize value of type '{type_name}': {details}")]
    DeserializationFailed { type_name: String, details: String },

    /// A timer callback panicked during invocation. Caught per-timer; the
    /// firing pass continues with the remaining due timers.
    #[error("timer '{id}' callback panicked: {detail}")]
    HandlerFault { id: u64, detail: String },
}

pub mod prelude {
    pub use crate::collision::CollisionGrid;
    pub use crate::emitter::{EventEmitter, HandlerId};
    pub use crate::object::{DestroyedReentrancyPolicy, GameObject, ObjectCore, ObjectGroup};
    pub use crate::ordered_map::OrderedMap;
    pub use crate::prng::Alea;
    pub use crate::serializer::{SerializedValue, Serializer, TypeRegistry};
    pub use crate::timer::{Timer, TimerId};
    pub use crate::vector2d::Vector2D;
    pub use crate::CoreError;
}
