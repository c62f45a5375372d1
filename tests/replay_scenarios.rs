//! Replay scenarios exercised through the public API
//!
//! Covers incremental advance, determinism, slicing, mirror involution and
//! the spawner's handling of unusable timelines.

use mirror_clone_rs::{
    config::GameConfig,
    core::{
        ActionEvent, ActionKind, ActionPayload, EntityId, EntityState, Kinematics, PlaybackRate,
        RunId, Tick, Vec2,
    },
    game::{CloneKind, CloneSpawner, CloneVariant, DespawnReason, EntityStatus, MutationKind},
    replay::{
        EventTransform, MirrorAxes, Mutation, PlaybackStatus, ReplayDriver, TransformChain,
        TransformedReplayDriver,
    },
    timeline::{OrderPolicy, Timeline, TimelineKey, TimelineRecorder, TimelineStore},
};
use similar_asserts::assert_eq;

fn key(entity: u32) -> TimelineKey {
    TimelineKey::new(RunId::new(1), EntityId::new(entity))
}

/// A zig-zag with dashes and shots, 120 ticks long
fn busy_events() -> Vec<ActionEvent> {
    let mut events = Vec::new();
    for t in (0..120u64).step_by(7) {
        let dir = if (t / 7) % 2 == 0 { Vec2::new(3.0, 1.0) } else { Vec2::new(-2.0, 2.5) };
        events.push(ActionEvent::movement(Tick::new(t), dir));
        if t % 3 == 0 {
            events.push(ActionEvent::shot(Tick::new(t), Vec2::new(0.0, -1.0)));
        }
        if t % 35 == 0 {
            events.push(ActionEvent::new(Tick::new(t), ActionKind::Dash, ActionPayload::toward(dir)));
        }
    }
    events
}

fn busy_store() -> TimelineStore {
    let mut store = TimelineStore::new();
    let timeline = Timeline::from_events(key(0), Kinematics::at(Vec2::new(200.0, 200.0)), busy_events())
        .and_then(|t| t.with_horizon(Tick::new(120)))
        .unwrap();
    store.insert(timeline).unwrap();
    store
}

fn mutated_chain() -> TransformChain {
    TransformChain::new()
        .with(Mutation::Mirror {
            axes: MirrorAxes::Both,
            arena: Vec2::new(800.0, 600.0),
        })
        .with(Mutation::Unstable { seed: 77, jitter: 0.5 })
}

#[test]
fn test_move_then_shoot_scenario() {
    let mut store = TimelineStore::new();
    store
        .insert(
            Timeline::from_events(
                key(0),
                Kinematics::at(Vec2::ZERO),
                vec![
                    ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
                    ActionEvent::shot(Tick::new(5), Vec2::new(0.0, 1.0)),
                ],
            )
            .unwrap(),
        )
        .unwrap();

    let mut driver = ReplayDriver::bind_in(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE).unwrap();
    let step = driver.advance(Tick::new(10), &store).unwrap();

    assert_eq!(driver.state().position(), Vec2::new(5.0, 0.0));
    assert_eq!(driver.state().shots_fired, 1);
    assert_eq!(step.shots().count(), 1);
    assert_eq!(step.status, PlaybackStatus::Overrun);
}

#[test]
fn test_fast_mutation_reaches_tick_ten_at_five() {
    let mut store = TimelineStore::new();
    store
        .insert(
            Timeline::from_events(
                key(0),
                Kinematics::at(Vec2::new(100.0, 100.0)),
                vec![
                    ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
                    ActionEvent::shot(Tick::new(10), Vec2::new(0.0, 1.0)),
                ],
            )
            .unwrap(),
        )
        .unwrap();
    let chain = TransformChain::new().with(Mutation::Fast {
        rate: PlaybackRate::times(2).unwrap(),
    });
    let mut driver =
        TransformedReplayDriver::bind(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE, chain).unwrap();

    let early = driver.advance(Tick::new(4), &store).unwrap();
    assert_eq!(early.source_tick, Some(Tick::new(8)));
    assert_eq!(early.shots().count(), 0);

    let step = driver.advance(Tick::new(5), &store).unwrap();
    assert_eq!(step.source_tick, Some(Tick::new(10)));
    assert_eq!(step.shots().count(), 1);
}

#[test]
fn test_incremental_advance_matches_direct_advance() {
    let store = busy_store();
    let pairs = [(0u64, 1u64), (3, 50), (49, 50), (60, 119), (100, 200)];

    for (t1, t2) in pairs {
        let bind = || {
            TransformedReplayDriver::bind(
                &store,
                key(0),
                Tick::new(4),
                Tick::ZERO,
                PlaybackRate::ONE,
                mutated_chain(),
            )
            .unwrap()
        };
        let mut stepped = bind();
        stepped.advance(Tick::new(t1), &store).unwrap();
        let stepped_result = stepped.advance(Tick::new(t2), &store).unwrap();

        let mut direct = bind();
        let direct_result = direct.advance(Tick::new(t2), &store).unwrap();

        assert_eq!(stepped.state(), direct.state(), "advancing {t1} then {t2}");
        assert_eq!(stepped_result.status, direct_result.status);
        assert_eq!(stepped_result.source_tick, direct_result.source_tick);
    }
}

#[test]
fn test_replay_is_deterministic() {
    let store = busy_store();
    let trajectory = || -> Vec<EntityState> {
        let mut driver = TransformedReplayDriver::bind(
            &store,
            key(0),
            Tick::ZERO,
            Tick::ZERO,
            PlaybackRate::new(3, 2).unwrap(),
            mutated_chain(),
        )
        .unwrap();
        (0..100)
            .map(|t| {
                driver.advance(Tick::new(t), &store).unwrap();
                *driver.state()
            })
            .collect()
    };
    assert_eq!(trajectory(), trajectory());
}

#[test]
fn test_slice_reproduces_events_in_range() {
    let mut store = busy_store();
    let (from, to) = (Tick::new(20), Tick::new(60));
    store.slice(key(0), from, to, key(5)).unwrap();

    let source = store.get(key(0)).unwrap();
    let expected: Vec<ActionEvent> = source
        .events()
        .iter()
        .filter(|e| e.tick() >= from && e.tick() < to)
        .map(|e| e.at_tick(Tick::new(e.tick().since(from))))
        .collect();
    let slice = store.get(key(5)).unwrap();
    assert_eq!(slice.events(), expected.as_slice());
    assert_eq!(slice.horizon(), Some(Tick::new(39)));

    // Replaying the slice retraces the source over the same ticks
    let mut original = ReplayDriver::bind_in(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE).unwrap();
    original.advance(Tick::new(59), &store).unwrap();
    let mut sliced = ReplayDriver::bind_in(&store, key(5), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE).unwrap();
    let step = sliced.advance(Tick::new(39), &store).unwrap();

    assert_eq!(sliced.state().position(), original.state().position());
    let replayed_discrete: Vec<ActionEvent> = step.actions.iter().copied().collect();
    let expected_discrete: Vec<ActionEvent> =
        expected.iter().filter(|e| e.kind().is_discrete()).copied().collect();
    assert_eq!(replayed_discrete, expected_discrete);
}

#[test]
fn test_mirror_is_an_involution() {
    let mirror = Mutation::Mirror {
        axes: MirrorAxes::Horizontal,
        arena: Vec2::new(800.0, 600.0),
    };
    let event = ActionEvent::new(
        Tick::new(3),
        ActionKind::Shoot,
        ActionPayload::aimed(Vec2::new(1.5, -2.0), Vec2::new(120.25, 80.5)),
    );

    let once = mirror.transform(&event);
    assert_eq!(once.payload().direction, Vec2::new(-1.5, -2.0));
    assert_eq!(once.payload().target, Some(Vec2::new(679.75, 80.5)));
    assert_eq!(mirror.transform(&once), event);
}

#[test]
fn test_empty_timeline_spawns_despawned_entity() {
    let config = GameConfig::default();
    let mut store = TimelineStore::with_params(config.motion_params());
    store
        .insert(Timeline::new(key(0), Kinematics::at(Vec2::new(10.0, 10.0))))
        .unwrap();

    let spawner = CloneSpawner::new(&config);
    for variant in CloneVariant::ALL {
        for mutation in MutationKind::ALL {
            let entity = spawner.spawn(
                EntityId::new(9),
                CloneKind::clone_of(variant, mutation, 3),
                key(0),
                Tick::ZERO,
                Tick::new(100),
                &store,
            );
            assert_eq!(entity.status, EntityStatus::Despawned(DespawnReason::EmptyTimeline));
            assert!(entity.driver.is_none());
        }
    }
}

#[test]
fn test_live_timeline_stalls_at_committed_horizon() {
    let mut store = TimelineStore::new();
    let mut recorder =
        TimelineRecorder::start(&mut store, key(0), Kinematics::at(Vec2::new(50.0, 50.0)), OrderPolicy::Strict)
            .unwrap();
    recorder
        .record(Tick::new(0), ActionKind::Move, ActionPayload::toward(Vec2::new(2.0, 0.0)))
        .unwrap();
    recorder.commit(Tick::new(0), &mut store).unwrap();

    // A fast reader starting at 0 outruns the capture immediately
    let chain = TransformChain::new().with(Mutation::Fast {
        rate: PlaybackRate::times(2).unwrap(),
    });
    let mut reader =
        TransformedReplayDriver::bind(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE, chain).unwrap();
    assert_eq!(reader.advance(Tick::new(0), &store).unwrap().status, PlaybackStatus::Playing);

    for t in 1..=10u64 {
        recorder.commit(Tick::new(t), &mut store).unwrap();
        let step = reader.advance(Tick::new(t), &store).unwrap();
        assert_eq!(step.status, PlaybackStatus::Stalled);
        assert_eq!(step.source_tick, Some(Tick::new(t)));
    }
    assert_eq!(reader.state().position(), Vec2::new(70.0, 50.0));

    recorder.finish(&mut store).unwrap();
    let step = reader.advance(Tick::new(11), &store).unwrap();
    assert_eq!(step.status, PlaybackStatus::Overrun);
}
