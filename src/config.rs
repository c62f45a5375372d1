//! Game configuration
//!
//! Every field has a default matching the shipped game, so a config file only
//! needs to list what it changes.

use crate::core::{MotionParams, PlaybackRate, Vec2};
use crate::game::EntityKind;
use crate::timeline::OrderPolicy;
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What happens to a replaying entity once its source runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrunPolicy {
    /// Stay at the last reconstructed state
    HoldLast,
    /// Remove the entity
    Despawn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub fps: u32,
    pub arena_width: f32,
    pub arena_height: f32,

    pub player_speed: f32,
    pub player_health: u32,
    pub dash_speed: f32,
    pub dash_ticks: u32,
    pub dash_cooldown: u32,
    pub shoot_cooldown: u32,

    /// History a clone needs before it can appear, in ticks
    pub clone_delay: u64,
    /// Delay used by the Delayed variant
    pub delayed_clone_delay: u64,
    pub clone_spawn_interval: f64,
    pub min_spawn_interval: f64,
    pub spawn_acceleration: f64,
    pub fast_rate: u32,
    /// Normal, fast, delayed, shooter
    pub variant_weights: [u32; 4],
    /// Normal, fast, mirror, unstable
    pub mutation_weights: [u32; 4],
    pub unstable_jitter: f32,
    /// Chance per tick of an extra shooter shot, in thousandths
    pub shooter_chance_permille: u32,
    pub clone_health: u32,

    pub boss_first_tick: u64,
    pub boss_interval: u64,
    pub boss_rate_num: u32,
    pub boss_rate_den: u32,
    pub boss_health: u32,

    pub echo_max_energy: u32,
    pub echo_cost: u32,
    pub echo_regen_per_second: u32,
    pub echo_delay: u64,

    pub contact_radius: f32,

    pub clone_overrun: OverrunPolicy,
    pub boss_overrun: OverrunPolicy,
    pub ally_overrun: OverrunPolicy,

    /// Order policy of the player recorder (build default when absent)
    pub record_policy: Option<OrderPolicy>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            fps: 60,
            arena_width: 800.0,
            arena_height: 600.0,
            player_speed: 4.0,
            player_health: 1,
            dash_speed: 12.0,
            dash_ticks: 12,
            dash_cooldown: 120,
            shoot_cooldown: 10,
            clone_delay: 300,
            delayed_clone_delay: 600,
            clone_spawn_interval: 300.0,
            min_spawn_interval: 90.0,
            spawn_acceleration: 0.97,
            fast_rate: 2,
            variant_weights: [40, 25, 20, 15],
            mutation_weights: [40, 25, 20, 15],
            unstable_jitter: 0.5,
            shooter_chance_permille: 30,
            clone_health: 1,
            boss_first_tick: 3600,
            boss_interval: 1800,
            boss_rate_num: 3,
            boss_rate_den: 2,
            boss_health: 5,
            echo_max_energy: 100,
            echo_cost: 25,
            echo_regen_per_second: 10,
            echo_delay: 300,
            contact_radius: 24.0,
            clone_overrun: OverrunPolicy::HoldLast,
            boss_overrun: OverrunPolicy::HoldLast,
            ally_overrun: OverrunPolicy::Despawn,
            record_policy: None,
        }
    }
}

impl GameConfig {
    /// Load a JSON config file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GameConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: &str) -> Result<()> {
            Err(MirrorError::InvalidConfig(msg.to_string()))
        }

        if self.fps == 0 {
            return invalid("fps must be positive");
        }
        if !(self.arena_width > 0.0 && self.arena_height > 0.0) {
            return invalid("arena must have a positive size");
        }
        if self.min_spawn_interval < 1.0 || self.clone_spawn_interval < self.min_spawn_interval {
            return invalid("spawn interval must be at least min_spawn_interval (>= 1)");
        }
        if !(self.spawn_acceleration > 0.0 && self.spawn_acceleration <= 1.0) {
            return invalid("spawn_acceleration must be in (0, 1]");
        }
        if self.variant_weights.iter().sum::<u32>() == 0 {
            return invalid("variant_weights must not all be zero");
        }
        if self.mutation_weights.iter().sum::<u32>() == 0 {
            return invalid("mutation_weights must not all be zero");
        }
        if !(self.unstable_jitter >= 0.0) {
            return invalid("unstable_jitter must not be negative");
        }
        if self.shooter_chance_permille > 1000 {
            return invalid("shooter_chance_permille must be at most 1000");
        }
        if self.clone_delay == 0 || self.delayed_clone_delay == 0 {
            return invalid("clone delays must be at least one tick");
        }
        if self.echo_delay == 0 {
            return invalid("echo_delay must be at least one tick");
        }
        if self.echo_cost > self.echo_max_energy {
            return invalid("echo_cost exceeds echo_max_energy");
        }
        if self.boss_interval == 0 {
            return invalid("boss_interval must be positive");
        }
        self.fast_playback()?;
        self.boss_playback()?;
        Ok(())
    }

    pub fn arena(&self) -> Vec2 {
        Vec2::new(self.arena_width, self.arena_height)
    }

    pub fn motion_params(&self) -> MotionParams {
        MotionParams {
            arena: self.arena(),
            dash_ticks: self.dash_ticks,
        }
    }

    pub fn fast_playback(&self) -> Result<PlaybackRate> {
        PlaybackRate::times(self.fast_rate)
    }

    pub fn boss_playback(&self) -> Result<PlaybackRate> {
        PlaybackRate::new(self.boss_rate_num, self.boss_rate_den)
    }

    /// Overrun policy of a replaying entity of `kind`
    pub fn overrun_policy(&self, kind: EntityKind) -> OverrunPolicy {
        match kind {
            EntityKind::Clone => self.clone_overrun,
            EntityKind::Boss => self.boss_overrun,
            EntityKind::Ally => self.ally_overrun,
            // The player reads its own live capture and never overruns
            EntityKind::Player => OverrunPolicy::HoldLast,
        }
    }

    pub fn record_policy(&self) -> OrderPolicy {
        self.record_policy.unwrap_or_default()
    }

    /// Center of the arena, where the player starts
    pub fn spawn_point(&self) -> Vec2 {
        Vec2::new(self.arena_width / 2.0, self.arena_height / 2.0)
    }
}
