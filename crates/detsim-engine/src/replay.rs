//! Replaying a [`Recording`] into a fresh engine.
//!
//! Mirrors the validate-before-mutate, restore-then-drive shape a
//! deterministic replay needs: a corrupt recording must be rejected before
//! any engine state changes, and every tick must apply its events before
//! the corresponding `update` call advances object state.

use crate::engine::{Engine, EngineConfig};
use crate::event::RecordedSource;
use crate::recorder::Recording;
use anyhow::Context;

/// Drives an [`Engine`] through a previously captured [`Recording`].
pub struct ReplayManager<'a> {
    engine: &'a mut Engine,
}

impl<'a> ReplayManager<'a> {
    pub fn new(engine: &'a mut Engine) -> Self {
        Self { engine }
    }

    /// Resets the engine with the recording's seed, installs a
    /// [`RecordedSource`] over its events, starts it, and drives it through
    /// every recorded delta tick. On exhaustion, pauses the engine unless
    /// `pause_on_end` is `false`, in which case it ends it instead.
    pub fn replay(&mut self, recording: &Recording, pause_on_end: bool) -> anyhow::Result<()> {
        recording
            .validate()
            .context("recording failed validation before replay")?;

        let mut config = EngineConfig::new(recording.seed.clone());
        config.prune_policy = self.engine.config().prune_policy;
        config.destroyed_reentrancy = self.engine.config().destroyed_reentrancy;
        config.checkpoint_interval = self.engine.config().checkpoint_interval;
        config.game_config = recording.game_config.clone();
        self.engine
            .reset(Some(config))
            .context("engine reset failed before replay")?;

        self.engine
            .set_event_source(Box::new(RecordedSource::new(recording.events.clone())));
        self.engine.start().context("engine failed to start for replay")?;

        for (index, &delta) in recording.delta_ticks.iter().enumerate() {
            self.engine
                .update(delta)
                .with_context(|| format!("engine update failed at replay step {index}"))?;
        }

        if pause_on_end {
            self.engine.pause().context("engine failed to pause at end of replay")?;
        } else {
            self.engine.end().context("engine failed to end at end of replay")?;
        }
        Ok(())
    }
}
