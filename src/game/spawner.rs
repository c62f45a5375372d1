//! Clone Spawner
//!
//! Builds replay-driven entities. The spawner resolves a kind into a base
//! rate and a transform chain, binds the driver, and never fails: a timeline
//! that cannot drive an entity yields one that is born despawned.

use crate::config::GameConfig;
use crate::core::{EntityId, PlaybackRate, Tick};
use crate::game::driver::Driver;
use crate::game::entity::{CloneVariant, DespawnReason, Entity, EntityKind, MutationKind};
use crate::replay::{MirrorAxes, Mutation, ReplayDriver, TransformChain, TransformedReplayDriver};
use crate::timeline::{TimelineKey, TimelineStore};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Salt separating the shooter stream from the unstable stream of one clone
const SHOOTER_SALT: u64 = 0xA5A5_0000_5A5A;

/// Everything that decides how a spawned entity replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneKind {
    pub entity: EntityKind,
    pub variant: CloneVariant,
    pub mutation: MutationKind,
    /// Seed of the entity's seeded transforms
    pub seed: u64,
}

impl CloneKind {
    pub fn clone_of(variant: CloneVariant, mutation: MutationKind, seed: u64) -> Self {
        CloneKind {
            entity: EntityKind::Clone,
            variant,
            mutation,
            seed,
        }
    }

    pub fn boss() -> Self {
        CloneKind {
            entity: EntityKind::Boss,
            variant: CloneVariant::Normal,
            mutation: MutationKind::Normal,
            seed: 0,
        }
    }

    pub fn echo() -> Self {
        CloneKind {
            entity: EntityKind::Ally,
            variant: CloneVariant::Normal,
            mutation: MutationKind::Normal,
            seed: 0,
        }
    }
}

pub struct CloneSpawner<'c> {
    config: &'c GameConfig,
}

impl<'c> CloneSpawner<'c> {
    pub fn new(config: &'c GameConfig) -> Self {
        CloneSpawner { config }
    }

    /// Base rate and transform chain for `kind`
    ///
    /// The Fast variant and the Fast mutation share one rate factor rather
    /// than compounding.
    pub fn transforms(&self, kind: &CloneKind) -> Result<(PlaybackRate, TransformChain)> {
        let base = match kind.entity {
            EntityKind::Boss => self.config.boss_playback()?,
            _ => PlaybackRate::ONE,
        };

        let mut chain = TransformChain::new();
        if kind.variant == CloneVariant::Fast || kind.mutation == MutationKind::Fast {
            chain.push(Mutation::Fast {
                rate: self.config.fast_playback()?,
            });
        }
        match kind.mutation {
            MutationKind::Mirror => chain.push(Mutation::Mirror {
                axes: MirrorAxes::Horizontal,
                arena: self.config.arena(),
            }),
            MutationKind::Unstable => chain.push(Mutation::Unstable {
                seed: kind.seed,
                jitter: self.config.unstable_jitter,
            }),
            MutationKind::Normal | MutationKind::Fast => {}
        }
        if kind.variant == CloneVariant::Shooter {
            chain.push(Mutation::Volley {
                seed: kind.seed ^ SHOOTER_SALT,
                chance_permille: self.config.shooter_chance_permille,
            });
        }
        Ok((base, chain))
    }

    fn health(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Boss => self.config.boss_health,
            EntityKind::Player => self.config.player_health,
            EntityKind::Clone | EntityKind::Ally => self.config.clone_health,
        }
    }

    fn bind(
        &self,
        kind: &CloneKind,
        timeline: TimelineKey,
        start_tick: Tick,
        now: Tick,
        store: &TimelineStore,
    ) -> Result<Driver> {
        let (base, chain) = self.transforms(kind)?;
        if chain.is_empty() {
            let driver = ReplayDriver::bind_in(store, timeline, start_tick, now, base)?;
            Ok(Driver::Replay(driver))
        } else {
            let driver =
                TransformedReplayDriver::bind(store, timeline, start_tick, now, base, chain)?;
            Ok(Driver::Transformed(driver))
        }
    }

    /// Entity replaying `timeline` so that simulation tick `now` shows the
    /// timeline's `start_tick`
    pub fn spawn(
        &self,
        id: EntityId,
        kind: CloneKind,
        timeline: TimelineKey,
        start_tick: Tick,
        now: Tick,
        store: &TimelineStore,
    ) -> Entity {
        match self.bind(&kind, timeline, start_tick, now, store) {
            Ok(driver) => {
                let mut entity = Entity::new(id, kind.entity, self.health(kind.entity), driver);
                entity.variant = kind.variant;
                entity.mutation = kind.mutation;
                entity
            }
            Err(err) => {
                let mut entity =
                    Entity::stillborn(id, kind.entity, DespawnReason::for_error(&err));
                entity.variant = kind.variant;
                entity.mutation = kind.mutation;
                entity
            }
        }
    }
}
