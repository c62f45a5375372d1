//! Simulation entities

use crate::core::{EntityId, EntityState, Vec2};
use crate::game::driver::Driver;
use crate::MirrorError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// The live player
    Player,
    /// Hostile replay of the player
    Clone,
    /// Echo summoned by the player
    Ally,
    /// Hostile replay with more health and a faster rate
    Boss,
}

impl EntityKind {
    pub fn is_hostile(self) -> bool {
        matches!(self, EntityKind::Clone | EntityKind::Boss)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Player => "player",
            EntityKind::Clone => "clone",
            EntityKind::Ally => "echo",
            EntityKind::Boss => "boss",
        };
        f.write_str(name)
    }
}

/// Behavioural variant of a clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CloneVariant {
    #[default]
    Normal,
    /// Replays at the fast rate
    Fast,
    /// Needs a longer history before it appears
    Delayed,
    /// Fires extra seeded shots
    Shooter,
}

impl CloneVariant {
    /// In the order of `GameConfig::variant_weights`
    pub const ALL: [CloneVariant; 4] = [
        CloneVariant::Normal,
        CloneVariant::Fast,
        CloneVariant::Delayed,
        CloneVariant::Shooter,
    ];
}

/// Mutation applied on top of the variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MutationKind {
    #[default]
    Normal,
    Fast,
    Mirror,
    Unstable,
}

impl MutationKind {
    /// In the order of `GameConfig::mutation_weights`
    pub const ALL: [MutationKind; 4] = [
        MutationKind::Normal,
        MutationKind::Fast,
        MutationKind::Mirror,
        MutationKind::Unstable,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DespawnReason {
    /// The source timeline covers no ticks
    EmptyTimeline,
    /// The source timeline is not in the store
    MissingTimeline,
    /// The requested start tick is past the source horizon
    InvalidStart,
    /// Any other driver failure
    DriverFault,
    /// Ran past the end of its source under a despawn overrun policy
    Exhausted,
    /// Health reached zero
    Killed,
    /// Still alive when the run ended
    RunEnded,
}

impl DespawnReason {
    /// Reason an entity is removed when its driver fails with `err`
    pub fn for_error(err: &MirrorError) -> Self {
        match err {
            MirrorError::EmptyTimeline(_) => DespawnReason::EmptyTimeline,
            MirrorError::TimelineNotFound(_) => DespawnReason::MissingTimeline,
            MirrorError::StartBeyondHorizon { .. } => DespawnReason::InvalidStart,
            _ => DespawnReason::DriverFault,
        }
    }
}

impl fmt::Display for DespawnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DespawnReason::EmptyTimeline => "empty timeline",
            DespawnReason::MissingTimeline => "missing timeline",
            DespawnReason::InvalidStart => "start beyond horizon",
            DespawnReason::DriverFault => "driver fault",
            DespawnReason::Exhausted => "history exhausted",
            DespawnReason::Killed => "killed",
            DespawnReason::RunEnded => "run ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityStatus {
    Active,
    Despawned(DespawnReason),
}

/// An entity of the simulation
///
/// Every entity is driven by a timeline; `driver` is `None` only for an
/// entity whose driver could not be bound, which is born despawned.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub variant: CloneVariant,
    pub mutation: MutationKind,
    pub health: u32,
    pub driver: Option<Driver>,
    pub status: EntityStatus,
}

impl Entity {
    pub fn new(id: EntityId, kind: EntityKind, health: u32, driver: Driver) -> Self {
        Entity {
            id,
            kind,
            variant: CloneVariant::Normal,
            mutation: MutationKind::Normal,
            health,
            driver: Some(driver),
            status: EntityStatus::Active,
        }
    }

    /// Entity that failed to bind and never becomes active
    pub fn stillborn(id: EntityId, kind: EntityKind, reason: DespawnReason) -> Self {
        Entity {
            id,
            kind,
            variant: CloneVariant::Normal,
            mutation: MutationKind::Normal,
            health: 0,
            driver: None,
            status: EntityStatus::Despawned(reason),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }

    pub fn despawn_reason(&self) -> Option<DespawnReason> {
        match self.status {
            EntityStatus::Active => None,
            EntityStatus::Despawned(reason) => Some(reason),
        }
    }

    /// Mark despawned; the first reason wins
    pub fn despawn(&mut self, reason: DespawnReason) {
        if self.is_active() {
            self.status = EntityStatus::Despawned(reason);
        }
    }

    pub fn state(&self) -> Option<&EntityState> {
        self.driver.as_ref().map(Driver::state)
    }

    pub fn position(&self) -> Option<Vec2> {
        self.state().map(EntityState::position)
    }

    pub fn is_dashing(&self) -> bool {
        self.state().is_some_and(EntityState::is_dashing)
    }

    /// Apply damage; despawns as killed at zero health and returns whether it died
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.despawn(DespawnReason::Killed);
            return true;
        }
        false
    }
}
