//! Motion fold shared by live capture, slicing and replay
//!
//! Every consumer of a timeline reconstructs state with the same two
//! primitives: `apply` folds the events of a tick, `step` integrates one tick.
//! Keeping a single implementation is what makes a clone land exactly where
//! the player was.

use crate::core::{ActionEvent, ActionKind, ActionPayload, Tick, Vec2};
use serde::{Deserialize, Serialize};

/// Parameters the fold needs beyond the events themselves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionParams {
    /// Arena size; positions are clamped into `[0, arena]`
    pub arena: Vec2,
    /// Length of a dash window in ticks
    pub dash_ticks: u32,
}

impl Default for MotionParams {
    fn default() -> Self {
        MotionParams {
            arena: Vec2::new(800.0, 600.0),
            dash_ticks: 12,
        }
    }
}

/// Position, velocity and dash window of an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Vec2,
    pub dash_ticks_left: u32,
}

impl Kinematics {
    /// At rest at `position`, facing right
    pub fn at(position: Vec2) -> Self {
        Kinematics {
            position,
            velocity: Vec2::ZERO,
            facing: Vec2::new(1.0, 0.0),
            dash_ticks_left: 0,
        }
    }

    pub fn is_dashing(&self) -> bool {
        self.dash_ticks_left > 0
    }

    /// Fold one event into the kinematic part of the state
    pub fn apply(&mut self, event: &ActionEvent, params: &MotionParams) {
        match event.kind() {
            ActionKind::Move => {
                let velocity = event.payload().direction;
                self.velocity = velocity;
                if !velocity.is_zero() {
                    self.facing = velocity.normalized();
                }
            }
            ActionKind::Dash => {
                self.dash_ticks_left = params.dash_ticks;
            }
            ActionKind::Shoot | ActionKind::Echo => {}
        }
    }

    /// Integrate one tick
    pub fn step(&mut self, params: &MotionParams) {
        self.position = (self.position + self.velocity).clamp_to(params.arena);
        self.dash_ticks_left = self.dash_ticks_left.saturating_sub(1);
    }
}

/// Reconstructed state of an entity driven by a timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Last source tick folded into this state
    pub tick: Option<Tick>,
    pub kinematics: Kinematics,
    pub shots_fired: u32,
    pub dashes: u32,
    pub echoes: u32,
    pub last_shot: Option<ActionPayload>,
}

impl EntityState {
    pub fn new(kinematics: Kinematics) -> Self {
        EntityState {
            tick: None,
            kinematics,
            shots_fired: 0,
            dashes: 0,
            echoes: 0,
            last_shot: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.kinematics.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.kinematics.velocity
    }

    pub fn is_dashing(&self) -> bool {
        self.kinematics.is_dashing()
    }

    /// Fold one event, updating kinematics and action counters
    pub fn apply(&mut self, event: &ActionEvent, params: &MotionParams) {
        self.kinematics.apply(event, params);
        match event.kind() {
            ActionKind::Shoot => {
                self.shots_fired += 1;
                self.last_shot = Some(*event.payload());
            }
            ActionKind::Dash => self.dashes += 1,
            ActionKind::Echo => self.echoes += 1,
            ActionKind::Move => {}
        }
    }

    pub fn step(&mut self, params: &MotionParams) {
        self.kinematics.step(params);
    }
}

/// Kinematics entering `tick`: events before `tick` folded, ticks `0..tick` integrated
///
/// `events` must be ordered by tick and start at the timeline's tick 0.
pub fn kinematics_entering(
    origin: Kinematics,
    events: &[ActionEvent],
    tick: Tick,
    params: &MotionParams,
) -> Kinematics {
    fold_kinematics(origin, Tick::ZERO, events, tick, params)
}

/// Carry `state`, the kinematics entering `from`, forward to entering `to`
///
/// `events` must be ordered by tick with none before `from`; events at or
/// after `to` are ignored.
pub fn fold_kinematics(
    state: Kinematics,
    from: Tick,
    events: &[ActionEvent],
    to: Tick,
    params: &MotionParams,
) -> Kinematics {
    let mut k = state;
    let mut cursor = 0;
    for t in from.as_u64()..to.as_u64() {
        while cursor < events.len() && events[cursor].tick().as_u64() == t {
            k.apply(&events[cursor], params);
            cursor += 1;
        }
        k.step(params);
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_sets_velocity_and_facing() {
        let params = MotionParams::default();
        let mut k = Kinematics::at(Vec2::new(10.0, 10.0));
        k.apply(&ActionEvent::movement(Tick::ZERO, Vec2::new(0.0, -2.0)), &params);
        assert_eq!(k.velocity, Vec2::new(0.0, -2.0));
        assert_eq!(k.facing, Vec2::new(0.0, -1.0));

        // Stopping keeps the last facing
        k.apply(&ActionEvent::movement(Tick::new(1), Vec2::ZERO), &params);
        assert_eq!(k.facing, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_step_clamps_to_arena() {
        let params = MotionParams {
            arena: Vec2::new(20.0, 20.0),
            dash_ticks: 2,
        };
        let mut k = Kinematics::at(Vec2::new(19.0, 1.0));
        k.velocity = Vec2::new(3.0, -3.0);
        k.dash_ticks_left = 1;
        k.step(&params);
        assert_eq!(k.position, Vec2::new(20.0, 0.0));
        assert!(!k.is_dashing());
    }

    #[test]
    fn test_kinematics_entering() {
        let params = MotionParams::default();
        let events = vec![
            ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
            ActionEvent::movement(Tick::new(3), Vec2::new(0.0, 2.0)),
        ];
        let origin = Kinematics::at(Vec2::new(100.0, 100.0));

        // Ticks 0,1,2 move right, tick 3 moves down
        let k = kinematics_entering(origin, &events, Tick::new(4), &params);
        assert_eq!(k.position, Vec2::new(103.0, 102.0));
        assert_eq!(k.velocity, Vec2::new(0.0, 2.0));

        let k0 = kinematics_entering(origin, &events, Tick::ZERO, &params);
        assert_eq!(k0, origin);
    }

    #[test]
    fn test_fold_resumes_midway() {
        let params = MotionParams::default();
        let events = vec![
            ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
            ActionEvent::new(Tick::new(2), ActionKind::Dash, ActionPayload::none()),
            ActionEvent::movement(Tick::new(5), Vec2::new(0.0, -1.0)),
        ];
        let origin = Kinematics::at(Vec2::new(50.0, 50.0));

        let halfway = kinematics_entering(origin, &events, Tick::new(4), &params);
        let rest: Vec<_> = events.iter().filter(|e| e.tick() >= Tick::new(4)).copied().collect();
        let resumed = fold_kinematics(halfway, Tick::new(4), &rest, Tick::new(9), &params);
        assert_eq!(resumed, kinematics_entering(origin, &events, Tick::new(9), &params));
        assert_eq!(resumed.position, Vec2::new(55.0, 46.0));
    }
}
