//! Post-game replay viewer
//!
//! Rebuilds a finished run from its `RunRecord` without any live input. The
//! player timeline is re-committed one tick at a time into a fresh store, so
//! every clone reading it sees exactly the horizon it saw during the run and
//! stalls where it stalled. Spawns and despawns come from the recorded
//! lifecycle; combat is not re-resolved.

use crate::core::{EntityId, EntityStore, PlaybackRate, Tick};
use crate::game::driver::Driver;
use crate::game::entity::{Entity, EntityKind};
use crate::game::run::{advance_entities, cull, realize_spawn};
use crate::game::snapshot::{LifecycleEvent, RunRecord, SpawnRecord, WorldSnapshot};
use crate::game::state_hash::compute_state_hash;
use crate::replay::ReplayDriver;
use crate::timeline::{CaptureHandle, CommitBatch, TimelineStore};
use crate::Result;
use smallvec::SmallVec;

/// Slowest playback speed, in half-speed steps (0.5x)
const MIN_SPEED_HALVES: u32 = 1;
/// Fastest playback speed, in half-speed steps (4x)
const MAX_SPEED_HALVES: u32 = 8;

pub struct ReplayViewer {
    record: RunRecord,
    store: TimelineStore,
    entities: EntityStore<Entity>,
    player: EntityId,
    handle: CaptureHandle,
    /// Next tick to simulate
    tick: Tick,
    paused: bool,
    speed_halves: u32,
    /// Half-ticks owed to playback at the current speed
    accumulator: u32,
}

impl ReplayViewer {
    pub fn new(record: RunRecord) -> Result<Self> {
        record.config.validate()?;
        record.validate()?;
        let (store, entities, handle) = Self::rebuild(&record)?;
        Ok(ReplayViewer {
            player: record.player.key().entity,
            record,
            store,
            entities,
            handle,
            tick: Tick::ZERO,
            paused: false,
            speed_halves: 2,
            accumulator: 0,
        })
    }

    /// Fresh store and entity set positioned before tick 0
    fn rebuild(record: &RunRecord) -> Result<(TimelineStore, EntityStore<Entity>, CaptureHandle)> {
        let config = &record.config;
        let key = record.player.key();
        let mut store = TimelineStore::with_params(config.motion_params());
        let handle = store.begin_capture(key, *record.player.origin())?;
        let driver = ReplayDriver::bind_in(&store, key, Tick::ZERO, Tick::ZERO, PlaybackRate::ONE)?;

        let mut entities = EntityStore::new();
        entities.insert(
            key.entity,
            Entity::new(key.entity, EntityKind::Player, config.player_health, Driver::LiveInput(driver)),
        );
        Ok((store, entities, handle))
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn total_ticks(&self) -> Tick {
        self.record.final_tick
    }

    pub fn is_finished(&self) -> bool {
        self.tick >= self.record.final_tick
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Playback speed multiplier, 0.5 to 4.0
    pub fn speed(&self) -> f32 {
        self.speed_halves as f32 / 2.0
    }

    pub fn speed_up(&mut self) {
        self.speed_halves = (self.speed_halves + 1).min(MAX_SPEED_HALVES);
    }

    pub fn speed_down(&mut self) {
        self.speed_halves = self.speed_halves.saturating_sub(1).max(MIN_SPEED_HALVES);
    }

    /// Seconds of the run shown so far
    pub fn playback_time(&self) -> f64 {
        self.tick.as_u64() as f64 / f64::from(self.record.config.fps)
    }

    pub fn total_time(&self) -> f64 {
        self.record.final_tick.as_u64() as f64 / f64::from(self.record.config.fps)
    }

    /// Advance by one display frame at the current speed
    ///
    /// Returns the number of ticks simulated, which is zero while paused or
    /// finished and alternates between zero and one at half speed.
    pub fn update(&mut self) -> Result<u32> {
        if self.paused {
            return Ok(0);
        }
        self.accumulator += self.speed_halves;
        let due = self.accumulator / 2;
        self.accumulator %= 2;

        let mut advanced = 0;
        for _ in 0..due {
            if self.is_finished() {
                break;
            }
            self.step_tick()?;
            advanced += 1;
        }
        Ok(advanced)
    }

    /// Jump to `target`, clamped to the end of the run
    ///
    /// Seeking backwards rebuilds from tick 0, since drivers only move forward.
    pub fn seek(&mut self, target: Tick) -> Result<()> {
        let target = target.min(self.record.final_tick);
        if target < self.tick {
            let (store, entities, handle) = Self::rebuild(&self.record)?;
            self.store = store;
            self.entities = entities;
            self.handle = handle;
            self.tick = Tick::ZERO;
            self.accumulator = 0;
        }
        while self.tick < target {
            self.step_tick()?;
        }
        Ok(())
    }

    /// Simulate the next tick of the recorded run
    pub fn step_tick(&mut self) -> Result<()> {
        if self.is_finished() {
            return Ok(());
        }
        let t = self.tick;
        let player_key = self.record.player.key();

        if self.record.player.horizon().is_some_and(|h| t <= h) {
            let events = self.record.player.events_at(t).to_vec();
            self.store.commit(&self.handle, CommitBatch::new(events, t))?;
        }

        if let Ok(player) = self.entities.get_mut(self.player) {
            if let (true, Some(driver)) = (player.is_active(), player.driver.as_mut()) {
                driver.advance(t, &self.store)?;
            }
        }

        let spawns: SmallVec<[SpawnRecord; 2]> = self
            .record
            .lifecycle_at(t)
            .filter_map(|event| match event {
                LifecycleEvent::Spawned(record) => Some(*record),
                LifecycleEvent::Despawned { .. } => None,
            })
            .collect();
        for spawn in &spawns {
            let entity = realize_spawn(&self.record.config, &mut self.store, player_key, spawn);
            self.entities.insert(spawn.entity, entity);
        }

        advance_entities(t, self.player, &self.store, &mut self.entities, &self.record.config);

        for event in self.record.lifecycle_at(t) {
            if let LifecycleEvent::Despawned { entity, reason, .. } = event {
                if let Ok(entity) = self.entities.get_mut(*entity) {
                    entity.despawn(*reason);
                }
            }
        }
        let mut culled = Vec::new();
        cull(t, &mut self.entities, &mut culled);

        self.tick = t.next();
        Ok(())
    }

    /// Snapshot of the current frame
    pub fn frame(&self) -> WorldSnapshot {
        WorldSnapshot::capture(self.tick, &self.entities)
    }

    /// Play to the end and return the final state hash
    pub fn run_to_end(&mut self) -> Result<u64> {
        while !self.is_finished() {
            self.step_tick()?;
        }
        Ok(compute_state_hash(&self.frame()))
    }

    /// Whether the rebuilt run ends in the recorded state
    pub fn verify(&mut self) -> Result<bool> {
        let hash = self.run_to_end()?;
        Ok(hash == self.record.final_hash)
    }
}
