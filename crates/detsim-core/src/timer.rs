//! Tick-indexed timer wheel: `setTimeout`/`setInterval` in ticks rather than
//! wall-clock time.
//!
//! Firing order within a tick is `(target_tick, id)` ascending. A callback
//! may itself schedule new timers; if those become due within the same
//! tick, they fire in the same pass. The pass is bounded to guard against a
//! callback that perpetually reschedules itself at the current tick.

use crate::CoreError;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

pub type TimerId = u64;

/// Re-entrant firing passes within a single `update` call are capped at
/// this many iterations; exceeding it is a bug in calling code (a callback
/// that keeps scheduling more immediately-due work), not a recoverable
/// condition.
const MAX_FIRING_PASSES: u32 = 1000;

struct TimerEntry {
    target_tick: f64,
    interval: Option<f64>,
    paused: bool,
    callback: Box<dyn FnMut(&mut Timer)>,
}

/// Owns every scheduled timer and drives their firing during `update`.
pub struct Timer {
    entries: HashMap<TimerId, TimerEntry>,
    next_id: TimerId,
    current_tick: f64,
    update_start_tick: f64,
    in_update: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 0,
            current_tick: 0.0,
            update_start_tick: 0.0,
            in_update: false,
        }
    }

    fn base_tick(&self) -> f64 {
        if self.in_update {
            self.update_start_tick
        } else {
            self.current_tick
        }
    }

    /// Schedules a one-shot callback `ticks` ticks from the current base
    /// tick (the tick at entry to the in-progress `update`, if called from
    /// within a callback; otherwise the current tick).
    pub fn set_timeout(&mut self, ticks: f64, callback: impl FnMut(&mut Timer) + 'static) -> TimerId {
        let target = self.base_tick() + ticks;
        self.insert(target, None, callback)
    }

    /// Schedules a repeating callback. `ticks` is both the initial delay
    /// and the repeat interval. An interval of `0` repeats once per
    /// subsequent tick rather than looping forever within one `update`.
    pub fn set_interval(&mut self, ticks: f64, callback: impl FnMut(&mut Timer) + 'static) -> TimerId {
        let target = self.base_tick() + ticks;
        let interval = if ticks <= 0.0 { 1.0 } else { ticks };
        self.insert(target, Some(interval), callback)
    }

    fn insert(
        &mut self,
        target_tick: f64,
        interval: Option<f64>,
        callback: impl FnMut(&mut Timer) + 'static,
    ) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            TimerEntry {
                target_tick,
                interval,
                paused: false,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Cancels a timer. Returns `true` if it existed.
    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn pause_timer(&mut self, id: TimerId) -> bool {
        match self.entries.get_mut(&id) {
            Some(e) => {
                e.paused = true;
                true
            }
            None => false,
        }
    }

    pub fn resume_timer(&mut self, id: TimerId) -> bool {
        match self.entries.get_mut(&id) {
            Some(e) => {
                e.paused = false;
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.entries.get(&id).map_or(false, |e| !e.paused)
    }

    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    /// Advances the wheel to `total_tick` and fires every timer whose
    /// `target_tick` has been reached, in `(target_tick, id)` order,
    /// re-entrantly picking up newly-due timers scheduled by callbacks
    /// within the same pass.
    pub fn update(&mut self, total_tick: f64) -> Result<(), CoreError> {
        self.current_tick = total_tick;
        self.update_start_tick = total_tick;
        self.in_update = true;

        let mut passes = 0u32;
        loop {
            let mut due: Vec<TimerId> = self
                .entries
                .iter()
                .filter(|(_, e)| !e.paused && e.target_tick <= total_tick)
                .map(|(id, _)| *id)
                .collect();
            if due.is_empty() {
                break;
            }
            due.sort_by(|a, b| {
                let ea = &self.entries[a];
                let eb = &self.entries[b];
                ea.target_tick
                    .partial_cmp(&eb.target_tick)
                    .unwrap()
                    .then(a.cmp(b))
            });

            for id in due {
                let Some(mut entry) = self.entries.remove(&id) else {
                    continue;
                };
                let mut callback = std::mem::replace(&mut entry.callback, Box::new(|_| {}));
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(self))) {
                    let detail = panic_message(payload.as_ref());
                    let fault = CoreError::HandlerFault { id, detail };
                    warn!(error = %fault, "timer callback panicked; firing pass continues");
                }
                if let Some(interval) = entry.interval {
                    entry.target_tick += interval;
                    entry.callback = callback;
                    self.entries.insert(id, entry);
                }
            }

            passes += 1;
            if passes > MAX_FIRING_PASSES {
                self.in_update = false;
                return Err(CoreError::TimerLimitExceeded {
                    limit: MAX_FIRING_PASSES,
                });
            }
        }

        self.in_update = false;
        Ok(())
    }

    /// Clears all timers and resets the current tick; the id counter is
    /// untouched so ids remain unique across a `reset`.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.current_tick = 0.0;
        self.update_start_tick = 0.0;
        self.in_update = false;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
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
