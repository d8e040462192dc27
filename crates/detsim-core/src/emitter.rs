//! Generic synchronous pub/sub used by objects, groups, and the collision
//! grid to announce state changes (`POSITION_CHANGED`, `ITEM_ADDED`, …).
//!
//! Listeners are notified synchronously, in registration order, at the
//! point of emission. A listener added during an `emit` call does not see
//! the emission currently in progress -- it is appended to the list used by
//! the *next* `emit` for that event name.

use std::collections::HashMap;

pub type HandlerId = u64;

/// A named multi-event emitter over a single payload type `T`.
pub struct EventEmitter<T> {
    handlers: HashMap<String, Vec<(HandlerId, Box<dyn FnMut(&T)>)>>,
    next_id: HandlerId,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Registers `handler` under `event`, returning an id usable with
    /// [`EventEmitter::off`].
    pub fn on(&mut self, event: &str, handler: impl FnMut(&T) + 'static) -> HandlerId {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Removes a previously registered handler. Returns `true` if it was
    /// found and removed.
    pub fn off(&mut self, event: &str, id: HandlerId) -> bool {
        if let Some(list) = self.handlers.get_mut(event) {
            let before = list.len();
            list.retain(|(hid, _)| *hid != id);
            return list.len() != before;
        }
        false
    }

    /// Notifies every handler registered for `event`, in registration
    /// order.
    pub fn emit(&mut self, event: &str, payload: &T) {
        if let Some(list) = self.handlers.get_mut(event) {
            for (_, handler) in list.iter_mut() {
                handler(payload);
            }
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn handlers_fire_in_registration_order() {
        let mut emitter: EventEmitter<i32> = EventEmitter::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = order.clone();
        emitter.on("tick", move |_| o1.borrow_mut().push(1));
        let o2 = order.clone();
        emitter.on("tick", move |_| o2.borrow_mut().push(2));

        emitter.emit("tick", &0);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn off_removes_only_matching_handler() {
        let mut emitter: EventEmitter<i32> = EventEmitter::new();
        let calls = Rc::new(RefCell::new(0));
        let c = calls.clone();
        let id = emitter.on("x", move |_| *c.borrow_mut() += 1);
        emitter.on("x", |_| {});

        assert!(emitter.off("x", id));
        emitter.emit("x", &0);
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(emitter.listener_count("x"), 1);
    }

    #[test]
    fn emit_on_unknown_event_is_noop() {
        let mut emitter: EventEmitter<i32> = EventEmitter::new();
        emitter.emit("nothing-registered", &42);
    }

    #[test]
    fn handler_added_during_emit_is_not_called_this_round() {
        let mut emitter: EventEmitter<i32> = EventEmitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        emitter.on("e", move |v| {
            seen_clone.borrow_mut().push(*v);
        });
        emitter.emit("e", &1);
        emitter.on("e", |_| {});
        assert_eq!(*seen.borrow(), vec![1]);
    }
}
