//! World snapshots and persisted run records
//!
//! A `WorldSnapshot` is the immutable view of a run published at a tick
//! boundary. A `RunRecord` is everything the replay viewer needs to rebuild a
//! finished run: the player timeline, the lifecycle of every other entity, and
//! the final state hash to check the rebuild against.

use crate::config::GameConfig;
use crate::core::{EntityId, EntityStore, RunId, Tick, Vec2};
use crate::game::entity::{CloneVariant, DespawnReason, Entity, EntityKind, MutationKind};
use crate::game::spawner::CloneKind;
use crate::timeline::Timeline;
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format version of saved run records
pub const RECORD_VERSION: u32 = 1;

/// Observable state of one entity
///
/// Health is left out: the replay viewer does not resolve combat, it only
/// replays the despawns combat caused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: EntityKind,
    pub variant: CloneVariant,
    pub mutation: MutationKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub dashing: bool,
    pub shots_fired: u32,
    pub dashes: u32,
    pub echoes: u32,
    /// Last source tick the entity's driver has folded
    pub source_tick: Option<Tick>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of ticks simulated so far
    pub tick: Tick,
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Snapshot of the active entities, in insertion order
    pub fn capture(tick: Tick, entities: &EntityStore<Entity>) -> Self {
        let entities = entities
            .iter()
            .filter(|(_, entity)| entity.is_active())
            .filter_map(|(id, entity)| {
                let state = entity.state()?;
                Some(EntitySnapshot {
                    id,
                    kind: entity.kind,
                    variant: entity.variant,
                    mutation: entity.mutation,
                    position: state.position(),
                    velocity: state.velocity(),
                    dashing: state.is_dashing(),
                    shots_fired: state.shots_fired,
                    dashes: state.dashes,
                    echoes: state.echoes,
                    source_tick: state.tick,
                })
            })
            .collect();
        WorldSnapshot { tick, entities }
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities.iter().filter(|e| e.kind == kind).count()
    }
}

/// Where a spawned entity's timeline comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnSource {
    /// Reads the player's timeline directly, starting at `start`
    Live { start: Tick },
    /// Replays a copy of the player's `[from, to)` from its beginning
    Slice { from: Tick, to: Tick },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRecord {
    pub tick: Tick,
    pub entity: EntityId,
    pub kind: CloneKind,
    pub source: SpawnSource,
}

/// Spawn or despawn of a non-player entity, or the player's death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Spawned(SpawnRecord),
    Despawned {
        tick: Tick,
        entity: EntityId,
        reason: DespawnReason,
    },
}

impl LifecycleEvent {
    pub fn tick(&self) -> Tick {
        match self {
            LifecycleEvent::Spawned(record) => record.tick,
            LifecycleEvent::Despawned { tick, .. } => *tick,
        }
    }
}

/// A finished run, as retained for the replay viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub version: u32,
    pub run_id: RunId,
    pub seed: u64,
    pub config: GameConfig,
    /// The sealed player timeline
    pub player: Timeline,
    /// Ordered by tick
    pub lifecycle: Vec<LifecycleEvent>,
    /// Number of ticks the run simulated
    pub final_tick: Tick,
    pub final_hash: u64,
}

impl RunRecord {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a record, rejecting other format versions and corrupt records
    pub fn from_json(json: &str) -> Result<Self> {
        let record: RunRecord = serde_json::from_str(json)?;
        if record.version != RECORD_VERSION {
            return Err(MirrorError::SerializationError(format!(
                "run record version {} (expected {})",
                record.version, RECORD_VERSION
            )));
        }
        record.validate()?;
        Ok(record)
    }

    /// Check the invariants a finished run guarantees
    ///
    /// The player timeline is well ordered and covers every simulated tick
    /// and no more, and the lifecycle is ordered by tick within the run.
    pub fn validate(&self) -> Result<()> {
        fn corrupt(msg: String) -> Result<()> {
            Err(MirrorError::CorruptRecord(msg))
        }

        self.player.validate()?;
        if self.player.key().run != self.run_id {
            return corrupt(format!(
                "player timeline {} belongs to another run than {}",
                self.player.key(),
                self.run_id
            ));
        }
        if self.final_tick.as_u64() != self.player.duration() {
            return corrupt(format!(
                "final tick {} but the player timeline covers {} ticks",
                self.final_tick,
                self.player.duration()
            ));
        }
        if let Some(pair) = self.lifecycle.windows(2).find(|w| w[1].tick() < w[0].tick()) {
            return corrupt(format!(
                "lifecycle event at tick {} follows tick {}",
                pair[1].tick(),
                pair[0].tick()
            ));
        }
        for event in &self.lifecycle {
            let late = match event {
                LifecycleEvent::Spawned(record) => record.tick >= self.final_tick,
                LifecycleEvent::Despawned { tick, .. } => *tick > self.final_tick,
            };
            if late {
                return corrupt(format!("lifecycle event at tick {} after the run ended", event.tick()));
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Lifecycle events at exactly `tick`
    pub fn lifecycle_at(&self, tick: Tick) -> impl Iterator<Item = &LifecycleEvent> {
        let start = self.lifecycle.partition_point(|e| e.tick() < tick);
        self.lifecycle[start..]
            .iter()
            .take_while(move |e| e.tick() == tick)
    }

    pub fn spawn_count(&self) -> usize {
        self.lifecycle
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Spawned(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec2;
    use crate::game::combat::NoCombat;
    use crate::game::controller::PlayerInput;
    use crate::game::run::Run;

    fn short_record() -> RunRecord {
        let config = GameConfig {
            clone_delay: 5,
            delayed_clone_delay: 5,
            clone_spawn_interval: 8.0,
            min_spawn_interval: 4.0,
            ..GameConfig::default()
        };
        let mut run = Run::new(RunId::new(4), 8, config).unwrap();
        for t in 0..30u64 {
            let heading = if t < 15 { Vec2::new(1.0, 0.0) } else { Vec2::new(0.0, 1.0) };
            run.step(&PlayerInput::moving(heading), &mut NoCombat).unwrap();
        }
        run.finish().unwrap()
    }

    #[test]
    fn test_finished_record_is_valid() {
        let record = short_record();
        record.validate().unwrap();
        assert!(record.spawn_count() > 0);
        assert_eq!(RunRecord::from_json(&record.to_json().unwrap()).unwrap(), record);
    }

    #[test]
    fn test_final_tick_must_match_player_timeline() {
        let mut record = short_record();
        record.final_tick = Tick::new(u64::MAX);
        assert!(matches!(record.validate(), Err(MirrorError::CorruptRecord(_))));

        let mut record = short_record();
        record.final_tick = Tick::new(29);
        assert!(matches!(record.validate(), Err(MirrorError::CorruptRecord(_))));
    }

    #[test]
    fn test_lifecycle_must_be_ordered() {
        let mut record = short_record();
        record.lifecycle.reverse();
        assert!(matches!(record.validate(), Err(MirrorError::CorruptRecord(_))));

        let mut record = short_record();
        record.run_id = RunId::new(99);
        assert!(matches!(record.validate(), Err(MirrorError::CorruptRecord(_))));
    }
}
