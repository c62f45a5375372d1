//! Combat resolution hook
//!
//! Combat is not part of the replay core. The simulation loop calls a
//! `CombatResolver` once per tick after every entity has moved; it may only
//! change health and mark entities despawned.

use crate::config::GameConfig;
use crate::core::{EntityId, EntityStore, Tick};
use crate::game::entity::Entity;
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Hostiles killed this tick
    pub kills: SmallVec<[EntityId; 4]>,
    /// Contacts that damaged the player
    pub player_hits: u32,
}

pub trait CombatResolver {
    fn name(&self) -> &str;

    fn resolve(
        &mut self,
        tick: Tick,
        player: EntityId,
        entities: &mut EntityStore<Entity>,
    ) -> CombatReport;
}

/// Resolver that never changes anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCombat;

impl CombatResolver for NoCombat {
    fn name(&self) -> &str {
        "none"
    }

    fn resolve(&mut self, _: Tick, _: EntityId, _: &mut EntityStore<Entity>) -> CombatReport {
        CombatReport::default()
    }
}

/// Contact damage between the player and hostiles
///
/// A hostile touching a dashing player takes a hit; touching a player who is
/// not dashing hurts the player instead.
#[derive(Debug, Clone, Copy)]
pub struct ContactDamage {
    pub radius: f32,
}

impl ContactDamage {
    pub fn from_config(config: &GameConfig) -> Self {
        ContactDamage {
            radius: config.contact_radius,
        }
    }
}

impl CombatResolver for ContactDamage {
    fn name(&self) -> &str {
        "contact"
    }

    fn resolve(
        &mut self,
        _tick: Tick,
        player: EntityId,
        entities: &mut EntityStore<Entity>,
    ) -> CombatReport {
        let mut report = CombatReport::default();
        let Ok(player_entity) = entities.get(player) else {
            return report;
        };
        let (Some(player_pos), true) = (player_entity.position(), player_entity.is_active()) else {
            return report;
        };
        let dashing = player_entity.is_dashing();

        let hostiles: SmallVec<[EntityId; 16]> = entities
            .iter()
            .filter(|(id, e)| *id != player && e.is_active() && e.kind.is_hostile())
            .filter(|(_, e)| {
                e.position()
                    .is_some_and(|p| p.distance(player_pos) <= self.radius)
            })
            .map(|(id, _)| id)
            .collect();

        for id in hostiles {
            if dashing {
                if let Ok(hostile) = entities.get_mut(id) {
                    if hostile.take_damage(1) {
                        report.kills.push(id);
                    }
                }
            } else {
                report.player_hits += 1;
            }
        }

        if report.player_hits > 0 {
            if let Ok(player_entity) = entities.get_mut(player) {
                player_entity.take_damage(report.player_hits);
            }
        }
        report
    }
}
