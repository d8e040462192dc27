//! Point-keyed spatial collision index.
//!
//! Coordinates are hashed by their exact IEEE-754 bit pattern rather than a
//! rounded string, so two points are considered the same key if and only if
//! their `x` and `y` components compare bit-equal.

use crate::emitter::EventEmitter;
use crate::vector2d::Vector2D;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

type GridKey = (u64, u64);

fn key_of(point: &Vector2D) -> GridKey {
    (point.x.to_bits(), point.y.to_bits())
}

/// Emitted whenever the grid's contents change.
#[derive(Debug, Clone, Copy)]
pub struct PointsChanged;

/// A point-keyed spatial index mapping exact coordinates to the set of
/// sources occupying them, plus a reverse index for O(|sources of s|)
/// removal of everything owned by one source.
pub struct CollisionGrid<S> {
    buckets: HashMap<GridKey, Vec<S>>,
    reverse: HashMap<S, HashSet<GridKey>>,
    pub events: EventEmitter<PointsChanged>,
}

impl<S> CollisionGrid<S>
where
    S: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            buckets: HashMap::new(),
            reverse: HashMap::new(),
            events: EventEmitter::new(),
        }
    }

    /// Registers `source` at `point`. Returns `false` (no-op) if this exact
    /// `(source, point)` pair is already present.
    pub fn add(&mut self, point: &Vector2D, source: S) -> bool {
        let key = key_of(point);
        let bucket = self.buckets.entry(key).or_default();
        if bucket.contains(&source) {
            return false;
        }
        bucket.push(source.clone());
        self.reverse.entry(source).or_default().insert(key);
        self.events.emit("POINTS_CHANGED", &PointsChanged);
        true
    }

    /// Removes `source` from `point`. Returns `false` if it was not there.
    pub fn remove(&mut self, point: &Vector2D, source: &S) -> bool {
        let key = key_of(point);
        let removed = match self.buckets.get_mut(&key) {
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|s| s != source);
                if bucket.is_empty() {
                    self.buckets.remove(&key);
                }
                bucket.len() != before
            }
            None => false,
        };
        if removed {
            if let Some(keys) = self.reverse.get_mut(source) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.reverse.remove(source);
                }
            }
            self.events.emit("POINTS_CHANGED", &PointsChanged);
        }
        removed
    }

    /// Removes every point owned by `source`. Returns `false` if `source`
    /// occupied no points.
    pub fn remove_source(&mut self, source: &S) -> bool {
        let Some(keys) = self.reverse.remove(source) else {
            return false;
        };
        if keys.is_empty() {
            return false;
        }
        for key in &keys {
            if let Some(bucket) = self.buckets.get_mut(key) {
                bucket.retain(|s| s != source);
                if bucket.is_empty() {
                    self.buckets.remove(key);
                }
            }
        }
        self.events.emit("POINTS_CHANGED", &PointsChanged);
        true
    }

    /// Sources occupying `point`, in insertion order.
    pub fn contains_point(&self, point: &Vector2D) -> &[S] {
        self.buckets
            .get(&key_of(point))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.reverse.clear();
        self.events.emit("POINTS_CHANGED", &PointsChanged);
    }

    pub fn source_count(&self) -> usize {
        self.reverse.len()
    }
}

impl<S> Default for CollisionGrid<S>
where
    S: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
