//! The object model: a common mutable core shared by every simulated
//! object, the [`GameObject`] trait concrete object types implement on top
//! of it, and [`ObjectGroup`], the insertion-ordered per-type container the
//! engine keeps objects in.

use crate::emitter::EventEmitter;
use crate::ordered_map::OrderedMap;
use crate::vector2d::Vector2D;

/// Events an [`ObjectCore`] emits as its fields change. Observers receive a
/// reference to the value at emission time; they do not receive a handle to
/// subscribe to future changes of the same field.
#[derive(Debug, Clone, Copy)]
pub enum ObjectEvent {
    PositionChanged { old: Vector2D, new: Vector2D },
    VelocityChanged { old: Vector2D, new: Vector2D },
    SizeChanged { old: Vector2D, new: Vector2D },
    RotationChanged { old: f64, new: f64 },
    HealthChanged { current: f64, max: f64 },
    MaxHealthChanged { old: f64, new: f64 },
    Destroyed,
}

/// Whether a destroyed object's `DESTROYED` event may fire again on
/// subsequent `destroy()` calls. Only `NoReemission` is implemented today;
/// the type exists so an engine's choice is explicit, inspectable
/// configuration threaded onto every registered object rather than a
/// silent constant buried in `ObjectCore::destroy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestroyedReentrancyPolicy {
    #[default]
    NoReemission,
}

/// Shared mutable state and emission logic for every simulated object.
///
/// `ObjectCore` does not know how to update itself per tick beyond applying
/// velocity -- concrete [`GameObject`] implementations own their own
/// `update` behavior and call into `ObjectCore`'s mutators to change state
/// in a way that keeps invariants (health clamping, destroyed latching,
/// single-emission) and event notification consistent.
pub struct ObjectCore {
    id: String,
    position: Vector2D,
    velocity: Vector2D,
    size: Vector2D,
    rotation: f64,
    health: f64,
    max_health: f64,
    destroyed: bool,
    reentrancy: DestroyedReentrancyPolicy,
    pub events: EventEmitter<ObjectEvent>,
}

impl ObjectCore {
    pub fn new(id: impl Into<String>, position: Vector2D, size: Vector2D, max_health: f64) -> Self {
        Self {
            id: id.into(),
            position,
            velocity: Vector2D::ZERO,
            size,
            rotation: 0.0,
            health: max_health,
            max_health,
            destroyed: false,
            reentrancy: DestroyedReentrancyPolicy::default(),
            events: EventEmitter::new(),
        }
    }

    /// Sets the policy consulted by [`ObjectCore::destroy`] on repeat calls.
    /// The engine applies its own `EngineConfig::destroyed_reentrancy` to
    /// every object at registration time.
    pub fn set_reentrancy_policy(&mut self, policy: DestroyedReentrancyPolicy) {
        self.reentrancy = policy;
    }

    pub fn reentrancy_policy(&self) -> DestroyedReentrancyPolicy {
        self.reentrancy
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Vector2D {
        self.position
    }

    pub fn velocity(&self) -> Vector2D {
        self.velocity
    }

    pub fn size(&self) -> Vector2D {
        self.size
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn health(&self) -> f64 {
        self.health
    }

    pub fn max_health(&self) -> f64 {
        self.max_health
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn set_position(&mut self, new: Vector2D) {
        let old = self.position;
        if old == new {
            return;
        }
        self.position = new;
        self.events
            .emit("POSITION_CHANGED", &ObjectEvent::PositionChanged { old, new });
    }

    pub fn set_velocity(&mut self, new: Vector2D) {
        let old = self.velocity;
        if old == new {
            return;
        }
        self.velocity = new;
        self.events
            .emit("VELOCITY_CHANGED", &ObjectEvent::VelocityChanged { old, new });
    }

    pub fn set_size(&mut self, new: Vector2D) {
        let old = self.size;
        if old == new {
            return;
        }
        self.size = new;
        self.events.emit("SIZE_CHANGED", &ObjectEvent::SizeChanged { old, new });
    }

    pub fn set_rotation(&mut self, new: f64) {
        let old = self.rotation;
        if old == new {
            return;
        }
        self.rotation = new;
        self.events
            .emit("ROTATION_CHANGED", &ObjectEvent::RotationChanged { old, new });
    }

    /// Sets max health, clamping current health down if it now exceeds it.
    pub fn set_max_health(&mut self, new_max: f64) {
        let old = self.max_health;
        if old == new_max {
            return;
        }
        self.max_health = new_max;
        self.events
            .emit("MAX_HEALTH_CHANGED", &ObjectEvent::MaxHealthChanged { old, new: new_max });
        if self.health > self.max_health {
            self.set_health(self.max_health);
        }
    }

    /// Clamps `value` to `[0, max_health]`. Reaching 0 destroys the object
    /// (see [`ObjectCore::destroy`]); calls on an already-destroyed object
    /// still clamp and emit `HEALTH_CHANGED` but never re-emit `DESTROYED`.
    pub fn set_health(&mut self, value: f64) {
        let clamped = value.clamp(0.0, self.max_health);
        if clamped == self.health {
            return;
        }
        self.health = clamped;
        self.events.emit(
            "HEALTH_CHANGED",
            &ObjectEvent::HealthChanged {
                current: self.health,
                max: self.max_health,
            },
        );
        if self.health <= 0.0 {
            self.destroy();
        }
    }

    pub fn take_damage(&mut self, amount: f64) {
        self.set_health(self.health - amount.max(0.0));
    }

    pub fn heal(&mut self, amount: f64) {
        self.set_health(self.health + amount.max(0.0));
    }

    /// Marks the object destroyed. Idempotent under `NoReemission` (the
    /// only policy implemented): only the transition into `destroyed = true`
    /// emits `DESTROYED`.
    pub fn destroy(&mut self) {
        if self.destroyed {
            match self.reentrancy {
                DestroyedReentrancyPolicy::NoReemission => {}
            }
            return;
        }
        self.destroyed = true;
        self.events.emit("DESTROYED", &ObjectEvent::Destroyed);
    }

    /// Applies `velocity * delta_ticks` to `position` for a non-destroyed
    /// object. Concrete [`GameObject::update`] implementations call this
    /// (directly or via the trait's default) once per tick.
    pub fn advance(&mut self, delta_ticks: f64) {
        if self.destroyed {
            return;
        }
        let new_position = self.position + self.velocity.scale(delta_ticks);
        self.set_position(new_position);
    }
}

/// The behavior every simulated object type implements on top of
/// [`ObjectCore`].
pub trait GameObject {
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    fn id(&self) -> &str {
        self.core().id()
    }

    fn is_destroyed(&self) -> bool {
        self.core().is_destroyed()
    }

    /// A plain-data summary of this object's core fields, used by
    /// `detsim-engine`'s state-hashing convenience. Types with additional
    /// state worth covering in a determinism check override this; the
    /// default covers everything `ObjectCore` tracks.
    fn snapshot_value(&self) -> serde_json::Value {
        let core = self.core();
        serde_json::json!({
            "id": core.id(),
            "position": { "x": core.position().x, "y": core.position().y },
            "velocity": { "x": core.velocity().x, "y": core.velocity().y },
            "size": { "x": core.size().x, "y": core.size().y },
            "rotation": core.rotation(),
            "health": core.health(),
            "max_health": core.max_health(),
            "destroyed": core.is_destroyed(),
        })
    }

    /// Advances this object by one tick. The default implementation only
    /// applies velocity to position; types with bespoke per-tick behavior
    /// override this and typically still call `self.core_mut().advance(..)`.
    fn update(&mut self, delta_ticks: f64, _total_ticks: f64) {
        self.core_mut().advance(delta_ticks);
    }
}

impl GameObject for Box<dyn GameObject> {
    fn core(&self) -> &ObjectCore {
        (**self).core()
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        (**self).core_mut()
    }

    fn update(&mut self, delta_ticks: f64, total_ticks: f64) {
        (**self).update(delta_ticks, total_ticks)
    }
}

/// Insertion-ordered container of objects of one declared type.
pub struct ObjectGroup<O: GameObject> {
    objects: OrderedMap<String, O>,
    pub events: EventEmitter<GroupEvent>,
}

#[derive(Debug, Clone)]
pub enum GroupEvent {
    ItemAdded { id: String },
    ItemRemoved { id: String },
    ListCleared,
    DestroyedItemsCleared { ids: Vec<String> },
}

impl<O: GameObject> ObjectGroup<O> {
    pub fn new() -> Self {
        Self {
            objects: OrderedMap::new(),
            events: EventEmitter::new(),
        }
    }

    /// Registers `obj` under its id. Idempotent: re-adding an id already
    /// present replaces its value in place without disturbing its position
    /// in iteration order, and does not emit `ITEM_ADDED` again.
    pub fn add(&mut self, obj: O) {
        let id = obj.id().to_owned();
        let is_new = !self.objects.contains_key(&id);
        self.objects.insert(id.clone(), obj);
        if is_new {
            self.events.emit("ITEM_ADDED", &GroupEvent::ItemAdded { id });
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<O> {
        let removed = self.objects.remove(&id.to_owned());
        if removed.is_some() {
            self.events.emit(
                "ITEM_REMOVED",
                &GroupEvent::ItemRemoved { id: id.to_owned() },
            );
        }
        removed
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.objects.contains_key(&id.to_owned())
    }

    pub fn get_by_id(&self, id: &str) -> Option<&O> {
        self.objects.get(&id.to_owned())
    }

    pub fn get_by_id_mut(&mut self, id: &str) -> Option<&mut O> {
        self.objects.get_mut(&id.to_owned())
    }

    pub fn get_all_active(&self) -> impl Iterator<Item = &O> {
        self.objects.values().filter(|o| !o.is_destroyed())
    }

    /// Every object in insertion order, including destroyed ones.
    pub fn iter(&self) -> impl Iterator<Item = &O> {
        self.objects.values()
    }

    pub fn size(&self) -> usize {
        self.objects.len()
    }

    pub fn active_size(&self) -> usize {
        self.get_all_active().count()
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.events.emit("LIST_CLEARED", &GroupEvent::ListCleared);
    }

    pub fn clear_and_destroy(&mut self) {
        for obj in self.objects.iter_mut().map(|(_, v)| v) {
            obj.core_mut().destroy();
        }
        self.clear();
    }

    /// Removes every destroyed object, emitting `DESTROYED_ITEMS_CLEARED`
    /// with the full set of removed ids if any were removed.
    pub fn clear_destroyed(&mut self) {
        let destroyed_ids: Vec<String> = self
            .objects
            .iter()
            .filter(|(_, o)| o.is_destroyed())
            .map(|(id, _)| id.clone())
            .collect();
        if destroyed_ids.is_empty() {
            return;
        }
        for id in &destroyed_ids {
            self.objects.remove(id);
        }
        self.events.emit(
            "DESTROYED_ITEMS_CLEARED",
            &GroupEvent::DestroyedItemsCleared { ids: destroyed_ids },
        );
    }

    /// Updates every non-destroyed object in insertion order.
    pub fn update(&mut self, delta_ticks: f64, total_ticks: f64) {
        for (_, obj) in self.objects.iter_mut() {
            if !obj.is_destroyed() {
                obj.update(delta_ticks, total_ticks);
            }
        }
    }
}

impl<O: GameObject> Default for ObjectGroup<O> {
    fn default() -> Self {
        Self::new()
    }
}
