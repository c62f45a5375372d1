//! Spawn scheduling and the echo energy meter

use crate::config::GameConfig;
use crate::core::Tick;
use crate::game::entity::{CloneVariant, MutationKind};
use crate::game::spawner::CloneKind;
use crate::Result;
use crate::MirrorError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A spawn the director wants this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOrder {
    pub kind: CloneKind,
    /// Ticks of player history the spawn replays behind the present
    pub delay: u64,
}

/// Decides when clones and bosses appear
///
/// The clone interval shrinks geometrically after every clone attempt. All
/// random choices come from the director's own ChaCha12 stream, seeded from
/// the run seed, so the schedule is a pure function of the seed.
#[derive(Debug, Clone)]
pub struct SpawnDirector {
    interval: f64,
    since_clone: u64,
    since_boss: u64,
    rng: ChaCha12Rng,
    variants: WeightedIndex<u32>,
    mutations: WeightedIndex<u32>,
}

impl SpawnDirector {
    pub fn new(seed: u64, config: &GameConfig) -> Result<Self> {
        let variants = WeightedIndex::new(config.variant_weights)
            .map_err(|e| MirrorError::InvalidConfig(format!("variant_weights: {e}")))?;
        let mutations = WeightedIndex::new(config.mutation_weights)
            .map_err(|e| MirrorError::InvalidConfig(format!("mutation_weights: {e}")))?;
        Ok(SpawnDirector {
            interval: config.clone_spawn_interval,
            since_clone: 0,
            since_boss: 0,
            rng: ChaCha12Rng::seed_from_u64(seed),
            variants,
            mutations,
        })
    }

    /// Current clone interval in ticks
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Spawns due at `now`
    ///
    /// An order whose delay exceeds the history recorded so far is dropped,
    /// but still resets its timer.
    pub fn tick(&mut self, now: Tick, config: &GameConfig) -> SmallVec<[SpawnOrder; 2]> {
        let mut orders = SmallVec::new();

        self.since_clone += 1;
        if self.since_clone >= self.interval as u64 {
            self.since_clone = 0;
            self.interval = (self.interval * config.spawn_acceleration).max(config.min_spawn_interval);

            let variant = CloneVariant::ALL[self.variants.sample(&mut self.rng)];
            let mutation = MutationKind::ALL[self.mutations.sample(&mut self.rng)];
            let seed: u64 = self.rng.gen();
            let delay = if variant == CloneVariant::Delayed {
                config.delayed_clone_delay
            } else {
                config.clone_delay
            };
            if now.as_u64() >= delay {
                orders.push(SpawnOrder {
                    kind: CloneKind::clone_of(variant, mutation, seed),
                    delay,
                });
            }
        }

        self.since_boss += 1;
        if now.as_u64() >= config.boss_first_tick && self.since_boss >= config.boss_interval {
            self.since_boss = 0;
            if now.as_u64() >= config.clone_delay {
                orders.push(SpawnOrder {
                    kind: CloneKind::boss(),
                    delay: config.clone_delay,
                });
            }
        }

        orders
    }
}

/// Echo energy, kept in units of 1/fps so that regeneration is exact
///
/// Widened to u64 so that any u32 energy and frame rate fit without overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoMeter {
    energy: u64,
    max: u64,
    cost: u64,
    regen_per_tick: u64,
    fps: u32,
}

impl EchoMeter {
    /// Starts full
    pub fn new(config: &GameConfig) -> Self {
        let fps = u64::from(config.fps);
        let max = u64::from(config.echo_max_energy) * fps;
        EchoMeter {
            energy: max,
            max,
            cost: u64::from(config.echo_cost) * fps,
            regen_per_tick: u64::from(config.echo_regen_per_second),
            fps: config.fps,
        }
    }

    pub fn regen(&mut self) {
        self.energy = (self.energy + self.regen_per_tick).min(self.max);
    }

    pub fn can_spend(&self) -> bool {
        self.energy >= self.cost
    }

    /// Spend one echo's worth of energy if available
    pub fn try_spend(&mut self) -> bool {
        if !self.can_spend() {
            return false;
        }
        self.energy -= self.cost;
        true
    }

    /// Energy in whole units
    pub fn energy(&self) -> f32 {
        (self.energy as f64 / f64::from(self.fps)) as f32
    }

    pub fn ratio(&self) -> f32 {
        if self.max == 0 {
            return 0.0;
        }
        (self.energy as f64 / self.max as f64) as f32
    }
}
