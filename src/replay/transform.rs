//! Pure event transforms applied on top of a replay
//!
//! A transform never mutates recorded events: it maps each source event to a
//! new one as a function of the event and its own parameters (including a
//! fixed seed), so a transformed replay is as deterministic as a plain one.

use crate::core::{ActionEvent, ActionKind, Kinematics, PlaybackRate, Tick, Vec2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::SplitMix64;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Mapping from recorded events to replayed events
pub trait EventTransform {
    /// Map one source event (pure)
    fn transform(&self, event: &ActionEvent) -> ActionEvent;

    /// Map the state the replay starts from
    fn map_origin(&self, origin: Kinematics) -> Kinematics {
        origin
    }

    /// Additional event emitted at `tick`; `shot_recorded` tells whether the
    /// source already fired at this tick
    fn extra_event(&self, _tick: Tick, _shot_recorded: bool) -> Option<ActionEvent> {
        None
    }

    /// Factor applied to the replay rate
    fn rate(&self) -> PlaybackRate {
        PlaybackRate::ONE
    }
}

/// Plain replay
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl EventTransform for Identity {
    fn transform(&self, event: &ActionEvent) -> ActionEvent {
        *event
    }
}

/// Axes negated by a mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorAxes {
    Horizontal,
    Vertical,
    Both,
}

impl MirrorAxes {
    fn flips_x(self) -> bool {
        matches!(self, MirrorAxes::Horizontal | MirrorAxes::Both)
    }

    fn flips_y(self) -> bool {
        matches!(self, MirrorAxes::Vertical | MirrorAxes::Both)
    }

    /// Negate the mirrored components of a direction
    pub fn negate(self, v: Vec2) -> Vec2 {
        Vec2::new(
            if self.flips_x() { -v.x } else { v.x },
            if self.flips_y() { -v.y } else { v.y },
        )
    }

    /// Reflect a point across the center of the arena
    pub fn reflect(self, p: Vec2, arena: Vec2) -> Vec2 {
        Vec2::new(
            if self.flips_x() { arena.x - p.x } else { p.x },
            if self.flips_y() { arena.y - p.y } else { p.y },
        )
    }
}

/// Transform attached to a clone at spawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Replay faster than real time
    Fast { rate: PlaybackRate },
    /// Reflect movement and aim across the arena
    Mirror { axes: MirrorAxes, arena: Vec2 },
    /// Bounded seeded jitter of every direction
    Unstable { seed: u64, jitter: f32 },
    /// Seeded extra shots on ticks where the source did not fire
    Volley { seed: u64, chance_permille: u32 },
}

const VOLLEY_SALT: u64 = 0x5EED_F1BE;

/// Seed for one (tick, kind) decision of a seeded transform
fn event_seed(seed: u64, tick: Tick, salt: u64) -> u64 {
    seed ^ tick.as_u64().wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ salt.rotate_left(32)
}

impl EventTransform for Mutation {
    fn transform(&self, event: &ActionEvent) -> ActionEvent {
        match *self {
            Mutation::Fast { .. } | Mutation::Volley { .. } => *event,
            Mutation::Mirror { axes, arena } => {
                if event.kind() == ActionKind::Echo {
                    return *event;
                }
                let mut payload = *event.payload();
                payload.direction = axes.negate(payload.direction);
                payload.target = payload.target.map(|t| axes.reflect(t, arena));
                event.with_payload(payload)
            }
            Mutation::Unstable { seed, jitter } => {
                let direction = event.payload().direction;
                if event.kind() == ActionKind::Echo || direction.is_zero() {
                    return *event;
                }
                let mut rng =
                    SplitMix64::seed_from_u64(event_seed(seed, event.tick(), event.kind().ordinal() as u64));
                let offset = Vec2::new(
                    rng.gen_range(-jitter..=jitter),
                    rng.gen_range(-jitter..=jitter),
                );
                let mut payload = *event.payload();
                payload.direction = direction + offset;
                event.with_payload(payload)
            }
        }
    }

    fn map_origin(&self, origin: Kinematics) -> Kinematics {
        match *self {
            Mutation::Mirror { axes, arena } => Kinematics {
                position: axes.reflect(origin.position, arena),
                velocity: axes.negate(origin.velocity),
                facing: axes.negate(origin.facing),
                dash_ticks_left: origin.dash_ticks_left,
            },
            _ => origin,
        }
    }

    fn extra_event(&self, tick: Tick, shot_recorded: bool) -> Option<ActionEvent> {
        match *self {
            Mutation::Volley {
                seed,
                chance_permille,
            } if !shot_recorded => {
                let mut rng = SplitMix64::seed_from_u64(event_seed(seed, tick, VOLLEY_SALT));
                (rng.gen_range(0..1000) < chance_permille)
                    .then(|| ActionEvent::shot(tick, Vec2::new(1.0, 0.0)))
            }
            _ => None,
        }
    }

    fn rate(&self) -> PlaybackRate {
        match *self {
            Mutation::Fast { rate } => rate,
            _ => PlaybackRate::ONE,
        }
    }
}

/// Mutations applied in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformChain(SmallVec<[Mutation; 2]>);

impl TransformChain {
    pub fn new() -> Self {
        TransformChain(SmallVec::new())
    }

    pub fn with(mut self, mutation: Mutation) -> Self {
        self.0.push(mutation);
        self
    }

    pub fn push(&mut self, mutation: Mutation) {
        self.0.push(mutation);
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl EventTransform for TransformChain {
    fn transform(&self, event: &ActionEvent) -> ActionEvent {
        self.0.iter().fold(*event, |e, m| m.transform(&e))
    }

    fn map_origin(&self, origin: Kinematics) -> Kinematics {
        self.0.iter().fold(origin, |k, m| m.map_origin(k))
    }

    fn extra_event(&self, tick: Tick, shot_recorded: bool) -> Option<ActionEvent> {
        self.0
            .iter()
            .find_map(|m| m.extra_event(tick, shot_recorded))
    }

    fn rate(&self) -> PlaybackRate {
        self.0
            .iter()
            .fold(PlaybackRate::ONE, |rate, m| rate.then(m.rate()))
    }
}
