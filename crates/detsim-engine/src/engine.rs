//! The tick loop and lifecycle state machine.
//!
//! `Engine` owns the PRNG, timer wheel, collision grid, object groups, and
//! event manager, and drives one canonical tick per `update` call. Handlers
//! registered on the event manager and timer callbacks are plain closures
//! over their own captured state; if they need to mutate the engine itself
//! (e.g. to register a new object in response to an event), the host is
//! expected to give them a shared, interior-mutable handle to it
//! (`Rc<RefCell<Engine>>`) rather than the engine threading `&mut self`
//! through every callback -- the same trade-off the tick loop this is
//! descended from made for its `CommandBuffer`-deferred system closures.
//! The setup hook (see [`Engine::set_setup_hook`]) is the one exception:
//! `reset` is not itself invoked from inside a callback, so it can hand the
//! hook a direct `&mut Engine`.

use crate::event::{Event, EventManager, EventSource, LiveSource};
use crate::recorder::GameRecorder;
use crate::snapshot::state_hash;
use crate::EngineError;
use detsim_core::collision::CollisionGrid;
pub use detsim_core::object::DestroyedReentrancyPolicy;
use detsim_core::object::GameObject;
use detsim_core::ordered_map::OrderedMap;
use detsim_core::prng::Alea;
use detsim_core::timer::{Timer, TimerId};
use detsim_core::object::ObjectGroup;
use tracing::{debug, warn};

/// Finite lifecycle states. Events and object updates only fire in
/// `Playing`; ticks never advance outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Whether destroyed objects are pruned from their group automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrunePolicy {
    /// Destroyed objects remain in their group (as plain data) until the
    /// caller explicitly prunes a group.
    Manual,
    /// Every tick, every group has its destroyed objects removed after
    /// object updates run.
    EveryTick,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub seed: String,
    pub prune_policy: PrunePolicy,
    /// Applied to every object at [`Engine::register_object`] time, so the
    /// object layer never hardcodes the choice itself.
    pub destroyed_reentrancy: DestroyedReentrancyPolicy,
    /// When nonzero, `update` logs a `state_hash` checkpoint at debug level
    /// every `checkpoint_interval` ticks. `0` disables checkpoint logging.
    pub checkpoint_interval: u64,
    /// Opaque host configuration handed to the registered setup hook on
    /// every `reset` (see [`Engine::set_setup_hook`]), and round-tripped
    /// through a [`crate::recorder::Recording`] so a replay can recreate it.
    pub game_config: Option<serde_json::Value>,
}

impl EngineConfig {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            prune_policy: PrunePolicy::Manual,
            destroyed_reentrancy: DestroyedReentrancyPolicy::default(),
            checkpoint_interval: 0,
            game_config: None,
        }
    }
}

type SetupHook = Box<dyn FnMut(&mut Engine, Option<&serde_json::Value>) -> Result<(), EngineError>>;

/// The tick-driven simulation engine.
pub struct Engine {
    state: GameState,
    total_ticks: f64,
    checkpoint_counter: u64,
    config: EngineConfig,
    prng: Alea,
    timer: Timer,
    pub collision: CollisionGrid<String>,
    groups: OrderedMap<String, ObjectGroup<Box<dyn GameObject>>>,
    event_manager: EventManager,
    recorder: Option<GameRecorder>,
    setup_hook: Option<SetupHook>,
    in_update: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let prng = Alea::new(&config.seed);
        Self {
            state: GameState::Ready,
            total_ticks: 0.0,
            checkpoint_counter: 0,
            prng,
            timer: Timer::new(),
            collision: CollisionGrid::new(),
            groups: OrderedMap::new(),
            event_manager: EventManager::new(Box::new(LiveSource::new())),
            recorder: None,
            setup_hook: None,
            in_update: false,
            config,
        }
    }

    /// Registers the closure invoked by [`Engine::reset`] once the engine
    /// has been set to `Ready`, receiving a direct `&mut Engine` handle
    /// (the same take-then-restore technique [`detsim_core::timer::Timer`]
    /// uses for its own callbacks) and the active `config.game_config`.
    /// Replaces any previously registered hook.
    pub fn set_setup_hook(
        &mut self,
        hook: impl FnMut(&mut Engine, Option<&serde_json::Value>) -> Result<(), EngineError> + 'static,
    ) {
        self.setup_hook = Some(Box::new(hook));
    }

    pub fn clear_setup_hook(&mut self) {
        self.setup_hook = None;
    }

    // -- lifecycle ----------------------------------------------------

    /// Reverts to a fresh `Ready` state: clears groups, the timer, and the
    /// collision grid, reseeds the PRNG from `config.seed` (re-using the
    /// existing seed if `config` is `None`), then -- if a setup hook is
    /// registered -- invokes it with `config.game_config`, so it can
    /// recreate the initial object population. Fails if called from inside
    /// an in-progress `update`, and propagates any error the hook returns.
    pub fn reset(&mut self, config: Option<EngineConfig>) -> Result<(), EngineError> {
        if self.in_update {
            return Err(EngineError::BadState {
                action: "reset".into(),
                state: self.state,
            });
        }
        if let Some(config) = config {
            self.config = config;
        }
        self.prng = Alea::new(&self.config.seed);
        self.timer.reset();
        self.collision.clear();
        self.groups.clear();
        self.total_ticks = 0.0;
        self.checkpoint_counter = 0;
        self.state = GameState::Ready;
        debug!(seed = %self.config.seed, "engine reset to Ready");

        let game_config = self.config.game_config.clone();
        if let Some(mut hook) = self.setup_hook.take() {
            let result = hook(self, game_config.as_ref());
            self.setup_hook = Some(hook);
            result?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        self.require_state(&[GameState::Ready], "start")?;
        self.state = GameState::Playing;
        debug!("engine started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.require_state(&[GameState::Playing], "pause")?;
        self.state = GameState::Paused;
        debug!("engine paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.require_state(&[GameState::Paused], "resume")?;
        self.state = GameState::Playing;
        debug!("engine resumed");
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), EngineError> {
        self.state = GameState::Ended;
        debug!("engine ended");
        Ok(())
    }

    fn require_state(&self, allowed: &[GameState], action: &str) -> Result<(), EngineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::BadState {
                action: action.to_owned(),
                state: self.state,
            })
        }
    }

    // -- the canonical tick step ---------------------------------------

    /// Advances the simulation by `delta_ticks` (which must be `> 0`):
    /// pumps due events, advances the timer wheel, updates every
    /// non-destroyed object in every group, and, per `config.prune_policy`,
    /// prunes destroyed objects. Returns the events that were dispatched.
    pub fn update(&mut self, delta_ticks: f64) -> Result<Vec<Event>, EngineError> {
        self.require_state(&[GameState::Playing], "update")?;
        if !(delta_ticks > 0.0) {
            return Err(EngineError::BadState {
                action: "update(0)".into(),
                state: self.state,
            });
        }

        self.in_update = true;
        self.total_ticks += delta_ticks;

        let dispatched = self.event_manager.pump(self.total_ticks);

        if let Some(recorder) = &mut self.recorder {
            recorder.record_tick(delta_ticks);
            if self.event_manager.source().is_live() {
                recorder.record_events(&dispatched);
            }
        }

        if let Err(err) = self.timer.update(self.total_ticks) {
            warn!(error = %err, "timer firing pass aborted");
            self.in_update = false;
            return Err(err.into());
        }

        for group in self.groups.values_mut() {
            group.update(delta_ticks, self.total_ticks);
        }

        if self.config.prune_policy == PrunePolicy::EveryTick {
            for group in self.groups.values_mut() {
                group.clear_destroyed();
            }
        }

        self.in_update = false;

        if self.config.checkpoint_interval > 0 {
            self.checkpoint_counter += 1;
            if self.checkpoint_counter % self.config.checkpoint_interval == 0 {
                let hash = state_hash(self);
                debug!(tick = self.total_ticks, %hash, "checkpoint");
            }
        }

        Ok(dispatched)
    }

    // -- objects ---------------------------------------------------------

    /// Registers `obj` into the group for `type_name`, creating the group
    /// if this is its first member. Re-registering an id already present in
    /// that group is idempotent. The object's reentrancy policy is set from
    /// `config.destroyed_reentrancy`.
    pub fn register_object(&mut self, type_name: &str, mut obj: Box<dyn GameObject>) {
        obj.core_mut().set_reentrancy_policy(self.config.destroyed_reentrancy);
        if !self.groups.contains_key(&type_name.to_owned()) {
            self.groups.insert(type_name.to_owned(), ObjectGroup::new());
        }
        self.groups.get_mut(&type_name.to_owned()).unwrap().add(obj);
    }

    pub fn get_object_group(&self, type_name: &str) -> Option<&ObjectGroup<Box<dyn GameObject>>> {
        self.groups.get(&type_name.to_owned())
    }

    pub fn get_object_group_mut(&mut self, type_name: &str) -> Option<&mut ObjectGroup<Box<dyn GameObject>>> {
        self.groups.get_mut(&type_name.to_owned())
    }

    /// Looks up a single object by group and id, failing with
    /// [`EngineError::NotFound`] rather than returning `Option` -- useful at
    /// call sites (e.g. event handlers resolving an id from `params`) where
    /// a miss is an error condition, not an expected case to match on.
    pub fn get_object(&self, type_name: &str, id: &str) -> Result<&Box<dyn GameObject>, EngineError> {
        self.get_object_group(type_name)
            .and_then(|group| group.get_by_id(id))
            .ok_or_else(|| EngineError::NotFound {
                type_name: type_name.to_owned(),
                id: id.to_owned(),
            })
    }

    pub fn get_object_mut(&mut self, type_name: &str, id: &str) -> Result<&mut Box<dyn GameObject>, EngineError> {
        let err = EngineError::NotFound {
            type_name: type_name.to_owned(),
            id: id.to_owned(),
        };
        self.get_object_group_mut(type_name)
            .and_then(|group| group.get_by_id_mut(id))
            .ok_or(err)
    }

    pub fn registered_types(&self) -> impl Iterator<Item = &String> {
        self.groups.keys()
    }

    // -- timers ------------------------------------------------------------

    pub fn set_timeout(&mut self, ticks: f64, callback: impl FnMut(&mut Timer) + 'static) -> TimerId {
        self.timer.set_timeout(ticks, callback)
    }

    pub fn set_interval(&mut self, ticks: f64, callback: impl FnMut(&mut Timer) + 'static) -> TimerId {
        self.timer.set_interval(ticks, callback)
    }

    pub fn clear_timer(&mut self, id: TimerId) -> bool {
        self.timer.clear_timer(id)
    }

    pub fn pause_timer(&mut self, id: TimerId) -> bool {
        self.timer.pause_timer(id)
    }

    pub fn resume_timer(&mut self, id: TimerId) -> bool {
        self.timer.resume_timer(id)
    }

    // -- event source / recorder --------------------------------------------

    pub fn set_event_source(&mut self, source: Box<dyn EventSource>) {
        self.event_manager.set_source(source);
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn event_manager_mut(&mut self) -> &mut EventManager {
        &mut self.event_manager
    }

    pub fn set_recorder(&mut self, recorder: GameRecorder) {
        self.recorder = Some(recorder);
    }

    pub fn clear_recorder(&mut self) -> Option<GameRecorder> {
        self.recorder.take()
    }

    pub fn recorder(&self) -> Option<&GameRecorder> {
        self.recorder.as_ref()
    }

    // -- accessors -----------------------------------------------------

    pub fn total_ticks(&self) -> f64 {
        self.total_ticks
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn seed(&self) -> &str {
        &self.config.seed
    }

    pub fn prng(&mut self) -> &mut Alea {
        &mut self.prng
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detsim_core::object::ObjectCore;
    use detsim_core::vector2d::Vector2D;

    struct Dummy {
        core: ObjectCore,
    }

    impl Dummy {
        fn new(id: &str) -> Self {
            Self {
                core: ObjectCore::new(id, Vector2D::ZERO, Vector2D::new(1.0, 1.0), 10.0),
            }
        }
    }

    impl GameObject for Dummy {
        fn core(&self) -> &ObjectCore {
            &self.core
        }
        fn core_mut(&mut self) -> &mut ObjectCore {
            &mut self.core
        }
    }

    #[test]
    fn update_before_start_is_bad_state() {
        let mut engine = Engine::new(EngineConfig::new("gameobject-test"));
        assert!(matches!(engine.update(1.0), Err(EngineError::BadState { .. })));
    }

    #[test]
    fn update_zero_is_rejected() {
        let mut engine = Engine::new(EngineConfig::new("gameobject-test"));
        engine.start().unwrap();
        assert!(matches!(engine.update(0.0), Err(EngineError::BadState { .. })));
        assert_eq!(engine.total_ticks(), 0.0);
    }

    #[test]
    fn pause_resume_round_trip() {
        let mut engine = Engine::new(EngineConfig::new("s"));
        engine.start().unwrap();
        engine.pause().unwrap();
        assert_eq!(engine.state(), GameState::Paused);
        assert!(matches!(engine.update(1.0), Err(EngineError::BadState { .. })));
        engine.resume().unwrap();
        assert_eq!(engine.state(), GameState::Playing);
        engine.update(1.0).unwrap();
        assert_eq!(engine.total_ticks(), 1.0);
    }

    #[test]
    fn reset_clears_ticks_and_groups() {
        let mut engine = Engine::new(EngineConfig::new("s"));
        engine.start().unwrap();
        engine.update(5.0).unwrap();
        engine.reset(None).unwrap();
        assert_eq!(engine.total_ticks(), 0.0);
        assert_eq!(engine.state(), GameState::Ready);
    }

    #[test]
    fn two_fresh_engines_same_seed_same_prng_stream() {
        let mut a = Engine::new(EngineConfig::new("prng-test-123"));
        let mut b = Engine::new(EngineConfig::new("prng-test-123"));
        let seq_a: Vec<f64> = (0..50).map(|_| a.prng().next_f64()).collect();
        let seq_b: Vec<f64> = (0..50).map(|_| b.prng().next_f64()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn get_object_reports_not_found_for_unknown_id_and_group() {
        let mut engine = Engine::new(EngineConfig::new("s"));
        engine.register_object("dummy", Box::new(Dummy::new("a")));

        assert!(engine.get_object("dummy", "a").is_ok());
        assert!(matches!(
            engine.get_object("dummy", "missing"),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            engine.get_object("no-such-group", "a"),
            Err(EngineError::NotFound { .. })
        ));
        assert!(engine.get_object_mut("dummy", "a").is_ok());
    }

    #[test]
    fn registered_object_picks_up_configured_reentrancy_policy() {
        let mut engine = Engine::new(EngineConfig::new("s"));
        engine.register_object("dummy", Box::new(Dummy::new("a")));
        let obj = engine.get_object("dummy", "a").unwrap();
        assert_eq!(
            obj.core().reentrancy_policy(),
            DestroyedReentrancyPolicy::NoReemission
        );
    }

    #[test]
    fn setup_hook_recreates_initial_population_on_reset() {
        let mut engine = Engine::new(EngineConfig::new("gameobject-test"));
        engine.set_setup_hook(|engine, game_config| {
            let count = game_config
                .and_then(|v| v.get("count"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0);
            for i in 0..count {
                engine.register_object("dummy", Box::new(Dummy::new(&format!("d{i}"))));
            }
            Ok(())
        });

        let mut config = EngineConfig::new("gameobject-test");
        config.game_config = Some(serde_json::json!({"count": 3}));
        engine.reset(Some(config)).unwrap();

        assert_eq!(engine.get_object_group("dummy").unwrap().size(), 3);
    }

    #[test]
    fn checkpoint_interval_zero_logs_nothing_and_does_not_panic() {
        let mut engine = Engine::new(EngineConfig::new("s"));
        engine.start().unwrap();
        engine.update(1.0).unwrap();
        engine.update(1.0).unwrap();
    }

    #[test]
    fn checkpoint_interval_triggers_a_hash_every_n_ticks() {
        let mut config = EngineConfig::new("s");
        config.checkpoint_interval = 2;
        let mut engine = Engine::new(config);
        engine.start().unwrap();
        engine.update(1.0).unwrap();
        engine.update(1.0).unwrap();
        engine.update(1.0).unwrap();
        assert_eq!(engine.total_ticks(), 3.0);
    }
}
