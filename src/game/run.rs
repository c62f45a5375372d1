//! A single run of the game
//!
//! `Run` owns everything a run needs: the timeline store, the entities, the
//! player's recorder and the spawn director. Nothing is global; the
//! simulation loop borrows a run and steps it one tick at a time.

use crate::config::{GameConfig, OverrunPolicy};
use crate::core::{
    ActionKind, ActionPayload, EntityId, EntityStore, Kinematics, PlaybackRate, RunId, Tick, Vec2,
};
use crate::game::combat::CombatResolver;
use crate::game::controller::{InputView, PlayerInput};
use crate::game::director::{EchoMeter, SpawnDirector};
use crate::game::driver::Driver;
use crate::game::entity::{DespawnReason, Entity, EntityKind};
use crate::game::logger::{LogCategory, RunLogger, VerbosityLevel};
use crate::game::snapshot::{
    LifecycleEvent, RunRecord, SpawnRecord, SpawnSource, WorldSnapshot, RECORD_VERSION,
};
use crate::game::spawner::{CloneKind, CloneSpawner};
use crate::game::state_hash::compute_state_hash;
use crate::replay::{PlaybackStatus, ReplayDriver};
use crate::timeline::{TimelineKey, TimelineRecorder, TimelineStore};
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Actions planned for one tick, in recording order
pub type PlannedActions = SmallVec<[(ActionKind, ActionPayload); 4]>;

/// Turns raw input into recorded actions
///
/// Owns the player's cooldowns and dash window. Movement is only recorded
/// when the velocity changes, so a player holding one direction produces a
/// single Move event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pilot {
    dash_cooldown_left: u32,
    dash_left: u32,
    dash_direction: Vec2,
    shoot_cooldown_left: u32,
    last_velocity: Vec2,
}

impl Pilot {
    pub fn dash_ready(&self) -> bool {
        self.dash_cooldown_left == 0 && self.dash_left == 0
    }

    pub fn plan(
        &mut self,
        tick: Tick,
        input: &PlayerInput,
        player: &Kinematics,
        echo: &mut EchoMeter,
        config: &GameConfig,
    ) -> PlannedActions {
        let mut actions = PlannedActions::new();
        self.dash_cooldown_left = self.dash_cooldown_left.saturating_sub(1);
        self.shoot_cooldown_left = self.shoot_cooldown_left.saturating_sub(1);

        if input.dash && self.dash_ready() {
            let direction = if input.movement.is_zero() {
                player.facing
            } else {
                input.movement.normalized()
            };
            self.dash_direction = direction;
            self.dash_left = config.dash_ticks;
            self.dash_cooldown_left = config.dash_cooldown;
            actions.push((ActionKind::Dash, ActionPayload::toward(direction)));
        }

        let velocity = if self.dash_left > 0 {
            self.dash_left -= 1;
            self.dash_direction * config.dash_speed
        } else {
            input.movement.normalized() * config.player_speed
        };
        if velocity != self.last_velocity {
            self.last_velocity = velocity;
            actions.push((ActionKind::Move, ActionPayload::toward(velocity)));
        }

        if let Some(target) = input.aim {
            if self.shoot_cooldown_left == 0 {
                let aimed = (target - player.position).normalized();
                let direction = if aimed.is_zero() { player.facing } else { aimed };
                self.shoot_cooldown_left = config.shoot_cooldown;
                actions.push((ActionKind::Shoot, ActionPayload::aimed(direction, target)));
            }
        }

        if input.echo && tick.as_u64() >= config.echo_delay && echo.try_spend() {
            actions.push((ActionKind::Echo, ActionPayload::none()));
        }

        actions
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    /// Actions the player recorded
    pub recorded: usize,
    /// Shots fired by every entity, player included
    pub shots: u32,
    pub spawned: u32,
    pub despawned: SmallVec<[(EntityId, DespawnReason); 4]>,
    pub kills: u32,
    pub player_hits: u32,
}

/// Build the entity a spawn record describes
///
/// Live spawns read the player's timeline at their start tick. Slice spawns
/// first copy the slice under the spawned entity's own key and replay it from
/// its beginning. A failed slice yields a stillborn entity, like any other
/// unbindable timeline.
pub(crate) fn realize_spawn(
    config: &GameConfig,
    store: &mut TimelineStore,
    player_key: TimelineKey,
    record: &SpawnRecord,
) -> Entity {
    let spawner = CloneSpawner::new(config);
    match record.source {
        SpawnSource::Live { start } => {
            spawner.spawn(record.entity, record.kind, player_key, start, record.tick, store)
        }
        SpawnSource::Slice { from, to } => {
            let slice_key = TimelineKey::new(player_key.run, record.entity);
            match store.slice(player_key, from, to, slice_key) {
                Ok(key) => spawner.spawn(record.entity, record.kind, key, Tick::ZERO, record.tick, store),
                Err(err) => {
                    let mut entity = Entity::stillborn(
                        record.entity,
                        record.kind.entity,
                        DespawnReason::for_error(&err),
                    );
                    entity.variant = record.kind.variant;
                    entity.mutation = record.kind.mutation;
                    entity
                }
            }
        }
    }
}

/// Advance every active entity but `skip` to `tick`
///
/// A driver failure despawns the entity instead of failing the tick. An
/// entity whose source is exhausted despawns when its kind's overrun policy
/// says so. Returns the number of shots fired.
pub(crate) fn advance_entities(
    tick: Tick,
    skip: EntityId,
    store: &TimelineStore,
    entities: &mut EntityStore<Entity>,
    config: &GameConfig,
) -> u32 {
    let mut shots = 0;
    let ids: SmallVec<[EntityId; 32]> = entities.ids().collect();
    for id in ids {
        if id == skip {
            continue;
        }
        let Ok(entity) = entities.get_mut(id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let Some(driver) = entity.driver.as_mut() else {
            entity.despawn(DespawnReason::DriverFault);
            continue;
        };
        match driver.advance(tick, store) {
            Ok(step) => {
                shots += step.shots().count() as u32;
                if step.status == PlaybackStatus::Overrun
                    && config.overrun_policy(entity.kind) == OverrunPolicy::Despawn
                {
                    entity.despawn(DespawnReason::Exhausted);
                }
            }
            Err(err) => entity.despawn(DespawnReason::for_error(&err)),
        }
    }
    shots
}

/// Remove despawned entities, appending a lifecycle event for each
pub(crate) fn cull(
    tick: Tick,
    entities: &mut EntityStore<Entity>,
    lifecycle: &mut Vec<LifecycleEvent>,
) -> SmallVec<[(EntityId, DespawnReason); 4]> {
    let mut culled = SmallVec::new();
    for (id, entity) in entities.drain_filter(Entity::is_active) {
        let reason = entity.despawn_reason().unwrap_or(DespawnReason::DriverFault);
        lifecycle.push(LifecycleEvent::Despawned {
            tick,
            entity: id,
            reason,
        });
        culled.push((id, reason));
    }
    culled
}

pub struct Run {
    id: RunId,
    seed: u64,
    config: GameConfig,
    store: TimelineStore,
    entities: EntityStore<Entity>,
    player: EntityId,
    recorder: TimelineRecorder,
    pilot: Pilot,
    director: SpawnDirector,
    echo: EchoMeter,
    /// Next tick to simulate
    tick: Tick,
    lifecycle: Vec<LifecycleEvent>,
    pub logger: RunLogger,
}

impl Run {
    /// Start a run: open the player's capture and create the player
    pub fn new(id: RunId, seed: u64, config: GameConfig) -> Result<Self> {
        config.validate()?;
        let mut store = TimelineStore::with_params(config.motion_params());
        let mut entities = EntityStore::new();

        let player = entities.next_id();
        let key = TimelineKey::new(id, player);
        let origin = Kinematics::at(config.spawn_point());
        let recorder = TimelineRecorder::start(&mut store, key, origin, config.record_policy())?;
        let driver = ReplayDriver::bind_in(&store, key, Tick::ZERO, Tick::ZERO, PlaybackRate::ONE)?;
        entities.insert(
            player,
            Entity::new(player, EntityKind::Player, config.player_health, Driver::LiveInput(driver)),
        );

        Ok(Run {
            id,
            seed,
            director: SpawnDirector::new(seed, &config)?,
            echo: EchoMeter::new(&config),
            config,
            store,
            entities,
            player,
            recorder,
            pilot: Pilot::default(),
            tick: Tick::ZERO,
            lifecycle: Vec::new(),
            logger: RunLogger::new(),
        })
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Next tick to simulate, which is also the number of ticks simulated
    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn store(&self) -> &TimelineStore {
        &self.store
    }

    pub fn entities(&self) -> &EntityStore<Entity> {
        &self.entities
    }

    pub fn player_id(&self) -> EntityId {
        self.player
    }

    pub fn player_key(&self) -> TimelineKey {
        self.recorder.key()
    }

    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(self.player).ok()
    }

    pub fn echo_meter(&self) -> &EchoMeter {
        &self.echo
    }

    pub fn recorder(&self) -> &TimelineRecorder {
        &self.recorder
    }

    pub fn lifecycle(&self) -> &[LifecycleEvent] {
        &self.lifecycle
    }

    /// The run is over once the player is gone
    pub fn is_over(&self) -> bool {
        !self.player().is_some_and(Entity::is_active)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self.tick, &self.entities)
    }

    pub fn state_hash(&self) -> u64 {
        compute_state_hash(&self.snapshot())
    }

    /// What a controller sees before choosing the next input
    pub fn input_view(&self) -> InputView {
        let position = self
            .player()
            .and_then(Entity::position)
            .unwrap_or_else(|| self.config.spawn_point());
        let nearest_hostile = self
            .entities
            .iter()
            .filter(|(_, e)| e.is_active() && e.kind.is_hostile())
            .filter_map(|(_, e)| e.position())
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)));
        InputView {
            tick: self.tick,
            position,
            arena: self.config.arena(),
            echo_energy: self.echo.energy(),
            dash_ready: self.pilot.dash_ready(),
            nearest_hostile,
        }
    }

    /// Simulate one tick with `input` as the player's intent
    ///
    /// Driver failures of replaying entities despawn them; only failures of
    /// the player's own capture are returned as errors.
    pub fn step(&mut self, input: &PlayerInput, combat: &mut dyn CombatResolver) -> Result<TickReport> {
        let t = self.tick;
        let mut report = TickReport {
            tick: t,
            ..TickReport::default()
        };

        self.echo.regen();
        let kinematics = self
            .player()
            .and_then(Entity::state)
            .map(|state| state.kinematics)
            .ok_or(MirrorError::EntityNotFound(self.player.as_u32()))?;
        let actions = self
            .pilot
            .plan(t, input, &kinematics, &mut self.echo, &self.config);
        for (kind, payload) in &actions {
            self.recorder.record(t, *kind, *payload)?;
        }
        report.recorded = actions.len();
        self.recorder.commit(t, &mut self.store)?;

        let player_step = self
            .entities
            .get_mut(self.player)?
            .driver
            .as_mut()
            .ok_or(MirrorError::EntityNotFound(self.player.as_u32()))?
            .advance(t, &self.store)?;
        report.shots += player_step.shots().count() as u32;

        let mut spawns: SmallVec<[SpawnRecord; 2]> = SmallVec::new();
        if actions.iter().any(|(kind, _)| *kind == ActionKind::Echo) {
            if let Some(from) = t.checked_rewind(self.config.echo_delay) {
                spawns.push(SpawnRecord {
                    tick: t,
                    entity: self.entities.next_id(),
                    kind: CloneKind::echo(),
                    source: SpawnSource::Slice { from, to: t },
                });
            }
        }
        for order in self.director.tick(t, &self.config) {
            if let Some(start) = t.checked_rewind(order.delay) {
                spawns.push(SpawnRecord {
                    tick: t,
                    entity: self.entities.next_id(),
                    kind: order.kind,
                    source: SpawnSource::Live { start },
                });
            }
        }
        let player_key = self.player_key();
        for record in spawns {
            let entity = realize_spawn(&self.config, &mut self.store, player_key, &record);
            self.logger.tick_event(
                VerbosityLevel::Normal,
                LogCategory::Spawn,
                t,
                format_args!(
                    "{} {} {:?}/{:?} from {:?}",
                    record.kind.entity, record.entity, record.kind.variant, record.kind.mutation, record.source
                ),
            );
            self.entities.insert(record.entity, entity);
            self.lifecycle.push(LifecycleEvent::Spawned(record));
            report.spawned += 1;
        }

        report.shots += advance_entities(t, self.player, &self.store, &mut self.entities, &self.config);

        let combat_report = combat.resolve(t, self.player, &mut self.entities);
        report.kills = combat_report.kills.len() as u32;
        report.player_hits = combat_report.player_hits;

        report.despawned = cull(t, &mut self.entities, &mut self.lifecycle);
        for (id, reason) in &report.despawned {
            self.logger
                .tick_event(VerbosityLevel::Normal, LogCategory::Despawn, t, format_args!("{} despawned: {}", id, reason));
        }

        self.tick = t.next();
        Ok(report)
    }

    /// End the run and keep only what the replay viewer needs
    ///
    /// The player timeline is sealed, every remaining entity is despawned
    /// with `RunEnded`, and every derived timeline is released.
    pub fn finish(self) -> Result<RunRecord> {
        let final_hash = self.state_hash();
        let Run {
            id,
            seed,
            config,
            mut store,
            mut entities,
            recorder,
            tick,
            mut lifecycle,
            ..
        } = self;

        let player_key = recorder.finish(&mut store)?;
        for (entity, _) in entities.drain_filter(|_| false) {
            lifecycle.push(LifecycleEvent::Despawned {
                tick,
                entity,
                reason: DespawnReason::RunEnded,
            });
        }
        store.release_run(id, &[player_key]);
        let player = store
            .remove(player_key)
            .ok_or(MirrorError::TimelineNotFound(player_key))?;

        Ok(RunRecord {
            version: RECORD_VERSION,
            run_id: id,
            seed,
            config,
            player,
            lifecycle,
            final_tick: tick,
            final_hash,
        })
    }
}
