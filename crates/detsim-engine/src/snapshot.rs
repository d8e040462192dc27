//! State hashing: a debugging/test convenience layered on top of the
//! engine's existing accessors. Recordings remain the canonical portable
//! format for replay; this is a cheap way to compare two engines' states in
//! a test (or a long-running determinism monitor) without hand-listing
//! every field.

use crate::engine::Engine;
use detsim_core::serializer::{Serializer, TypeRegistry};

/// Serializes the hashable slice of `engine`'s state (seed, total ticks,
/// lifecycle state, and every group's objects) through the registered-type
/// serializer (§4.8's `{__type,__data}` wrapping, not bare `serde_json`) to
/// a canonical JSON byte stream, then hashes it with BLAKE3. Two engines
/// with identical observable state produce the same hash; this says
/// nothing about engines that differ only in non-hashed internals.
pub fn state_hash(engine: &Engine) -> String {
    let mut groups = serde_json::Map::new();
    for type_name in engine.registered_types() {
        let group = engine
            .get_object_group(type_name)
            .expect("registered_types only yields names with a group");
        let objects: Vec<serde_json::Value> = group.iter().map(|o| o.snapshot_value()).collect();
        groups.insert(type_name.clone(), serde_json::Value::Array(objects));
    }

    let hashable = serde_json::json!({
        "seed": engine.seed(),
        "total_ticks": engine.total_ticks(),
        "state": format!("{:?}", engine.state()),
        "groups": groups,
    });

    let registry = TypeRegistry::new();
    let wrapped = Serializer::new(&registry)
        .serialize_value(&hashable)
        .expect("engine snapshot values are depth-bounded JSON, never cyclic");
    let bytes = serde_json::to_vec(&wrapped).expect("wrapped snapshot must serialize to JSON");
    blake3::hash(&bytes).to_hex().to_string()
}
