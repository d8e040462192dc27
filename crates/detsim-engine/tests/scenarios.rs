use detsim_core::object::{GameObject, ObjectCore};
use detsim_core::vector2d::Vector2D;
use detsim_engine::engine::{Engine, EngineConfig};
use detsim_engine::recorder::GameRecorder;
use detsim_engine::replay::ReplayManager;
use detsim_engine::snapshot::state_hash;

struct Projectile {
    core: ObjectCore,
}

impl Projectile {
    fn new(id: &str, position: Vector2D, velocity: Vector2D) -> Self {
        let mut core = ObjectCore::new(id, position, Vector2D::new(1.0, 1.0), 1.0);
        core.set_velocity(velocity);
        Self { core }
    }
}

impl GameObject for Projectile {
    fn core(&self) -> &ObjectCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }
}

fn spawn_circle_of_projectiles(engine: &mut Engine, center: Vector2D, radius: f64, count: usize) {
    for i in 0..count {
        let angle = (i as f64) * std::f64::consts::TAU / count as f64;
        let offset = Vector2D::new(radius * angle.cos(), radius * angle.sin());
        let position = center + offset;
        let inward = (center - position).normalize().scale(0.5);
        engine.register_object(
            "projectile",
            Box::new(Projectile::new(&format!("proj-{i}"), position, inward)),
        );
    }
}

/// Scenario: health damage and destruction emit their events exactly once,
/// seeded for reproducibility even though this particular scenario makes no
/// PRNG calls.
#[test]
fn snake_style_damage_and_destruction() {
    let mut engine = Engine::new(EngineConfig::new("gameobject-test"));
    let mut player = Projectile::new("player", Vector2D::new(10.0, 20.0), Vector2D::ZERO);
    player.core_mut().set_max_health(100.0);
    player.core_mut().set_health(100.0);

    player.core_mut().take_damage(25.0);
    assert_eq!(player.core().health(), 75.0);
    assert!(!player.core().is_destroyed());

    player.core_mut().take_damage(999_999.0);
    assert_eq!(player.core().health(), 0.0);
    assert!(player.core().is_destroyed());

    engine.register_object("player", Box::new(player));
}

/// Scenario: timer ordering under `(target_tick, id)` with a callback that
/// schedules a same-tick follow-up.
#[test]
fn timer_ordering_through_the_engine() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut engine = Engine::new(EngineConfig::new("timer-test"));
    engine.start().unwrap();

    let order = Rc::new(RefCell::new(Vec::new()));
    let o1 = order.clone();
    engine.set_timeout(5.0, move |_| o1.borrow_mut().push("a"));
    let o2 = order.clone();
    engine.set_timeout(5.0, move |t| {
        o2.borrow_mut().push("b");
        let o3 = o2.clone();
        t.set_timeout(0.0, move |_| o3.borrow_mut().push("c"));
    });

    engine.update(5.0).unwrap();
    assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
}

/// Scenario: two independently driven engines with the same seed, the same
/// scripted PRNG-driven velocity rewrites every 20 ticks, and the same
/// object population produce bit-identical state hashes at every
/// checkpoint. A recording itself captures only the seed, events, and
/// deltas; `setup_hook_recreates_population_on_reset_and_replay` below
/// covers the complementary piece, recreating the initial population from
/// `game_config` via the setup hook.
#[test]
fn seeded_runs_with_scripted_prng_draws_match_at_every_checkpoint() {
    fn drive(seed: &str) -> Vec<String> {
        let mut engine = Engine::new(EngineConfig::new(seed));
        spawn_circle_of_projectiles(&mut engine, Vector2D::new(50.0, 50.0), 20.0, 10);
        engine.start().unwrap();

        let mut hashes = Vec::new();
        for tick in 1..=100u32 {
            if tick % 20 == 0 {
                let roll = engine.prng().random();
                if let Some(group) = engine.get_object_group_mut("projectile") {
                    if let Some(obj) = group.get_by_id_mut("proj-0") {
                        obj.core_mut().set_velocity(Vector2D::new(roll, -roll));
                    }
                }
            }
            engine.update(1.0).unwrap();
            if matches!(tick, 25 | 50 | 75 | 100) {
                hashes.push(state_hash(&engine));
            }
        }
        hashes
    }

    let a = drive("interaction-test");
    let b = drive("interaction-test");
    assert_eq!(a, b);
    assert_eq!(a.len(), 4);
}

/// Scenario: a recording produced by a live session replays into a fresh
/// engine and reaches the same total tick count.
#[test]
fn recorded_session_replays_to_the_same_total_ticks() {
    let mut engine = Engine::new(EngineConfig::new("interaction-test"));
    engine.set_recorder(GameRecorder::start("interaction-test", None));
    engine.start().unwrap();
    for _ in 0..100 {
        engine.update(1.0).unwrap();
    }
    let recording = engine.clear_recorder().unwrap().finish();
    assert!(recording.validate().is_ok());

    let mut replayed = Engine::new(EngineConfig::new("interaction-test"));
    ReplayManager::new(&mut replayed).replay(&recording, true).unwrap();
    assert!((replayed.total_ticks() - 100.0).abs() < 1e-10);
}

/// Scenario: 500 objects, half destroyed, pruned in one pass.
#[test]
fn five_hundred_object_group_pruning() {
    let mut engine = Engine::new(EngineConfig::new("group-pruning-test"));
    for i in 0..500 {
        engine.register_object(
            "brick",
            Box::new(Projectile::new(&format!("brick-{i}"), Vector2D::ZERO, Vector2D::ZERO)),
        );
    }
    {
        let group = engine.get_object_group_mut("brick").unwrap();
        for i in 0..250 {
            group
                .get_by_id_mut(&format!("brick-{i}"))
                .unwrap()
                .core_mut()
                .destroy();
        }
        assert_eq!(group.size(), 500);
        assert_eq!(group.active_size(), 250);
        group.clear_destroyed();
        assert_eq!(group.size(), 250);
    }
}

/// Scenario: a setup hook reads `game_config` to recreate the initial
/// object population on `reset`, and a replay -- which resets the engine
/// with the recorded `game_config` -- recreates the same population and
/// reaches the same state hash as the original session.
#[test]
fn setup_hook_recreates_population_on_reset_and_replay() {
    fn spawn_from_config(engine: &mut Engine, game_config: Option<&serde_json::Value>) {
        let count = game_config
            .and_then(|v| v.get("count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        for i in 0..count {
            engine.register_object(
                "projectile",
                Box::new(Projectile::new(&format!("proj-{i}"), Vector2D::ZERO, Vector2D::ZERO)),
            );
        }
    }

    let mut original = Engine::new(EngineConfig::new("interaction-test"));
    original.set_setup_hook(|engine, game_config| {
        spawn_from_config(engine, game_config);
        Ok(())
    });
    let mut config = EngineConfig::new("interaction-test");
    config.game_config = Some(serde_json::json!({"count": 5}));
    original.reset(Some(config)).unwrap();
    original.set_recorder(GameRecorder::start("interaction-test", Some(serde_json::json!({"count": 5}))));
    original.start().unwrap();
    for _ in 0..10 {
        original.update(1.0).unwrap();
    }
    original.pause().unwrap();
    let original_hash = state_hash(&original);
    let recording = original.clear_recorder().unwrap().finish();

    let mut replayed = Engine::new(EngineConfig::new("interaction-test"));
    replayed.set_setup_hook(|engine, game_config| {
        spawn_from_config(engine, game_config);
        Ok(())
    });
    ReplayManager::new(&mut replayed).replay(&recording, true).unwrap();

    assert_eq!(replayed.get_object_group("projectile").unwrap().size(), 5);
    assert_eq!(state_hash(&replayed), original_hash);
}

/// Scenario: an out-of-order recording is rejected before it touches the
/// replay target engine.
#[test]
fn invalid_recording_is_rejected_by_replay() {
    use detsim_engine::event::Event;
    use detsim_engine::recorder::Recording;

    let bad_recording = Recording {
        seed: "interaction-test".into(),
        events: vec![
            Event {
                kind: "USER_INPUT".into(),
                input_type: Some("fire".into()),
                tick: 5.0,
                timestamp: 0.0,
                params: serde_json::Value::Null,
            },
            Event {
                kind: "USER_INPUT".into(),
                input_type: Some("fire".into()),
                tick: 2.0,
                timestamp: 0.0,
                params: serde_json::Value::Null,
            },
        ],
        delta_ticks: vec![5.0],
        total_ticks: 5.0,
        game_config: None,
    };

    let mut engine = Engine::new(EngineConfig::new("untouched-seed"));
    let result = ReplayManager::new(&mut engine).replay(&bad_recording, true);
    assert!(result.is_err());
    assert_eq!(engine.seed(), "untouched-seed");
}
