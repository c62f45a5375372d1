//! Random controller for testing and sweeps
//!
//! Wanders in one of eight directions for a random number of ticks, fires at
//! the nearest hostile now and then, and occasionally dashes or summons an
//! echo. Seeded, so a given seed always produces the same run.

use crate::core::Vec2;
use crate::game::controller::{InputController, InputView, PlayerInput};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

const HEADINGS: [Vec2; 9] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(-1.0, 1.0),
    Vec2::new(-1.0, 0.0),
    Vec2::new(-1.0, -1.0),
    Vec2::new(0.0, -1.0),
    Vec2::new(1.0, -1.0),
];

/// A controller that makes seeded random choices
///
/// Serializable with its RNG state, so a paused run resumes the same stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomController {
    rng: ChaCha12Rng,
    heading: Vec2,
    hold: u32,
}

impl RandomController {
    pub fn with_seed(seed: u64) -> Self {
        RandomController {
            rng: ChaCha12Rng::seed_from_u64(seed),
            heading: Vec2::ZERO,
            hold: 0,
        }
    }

    /// Steer back toward the middle when close to a wall
    fn away_from_walls(&self, view: &InputView, heading: Vec2) -> Vec2 {
        let margin = 40.0;
        let mut h = heading;
        if view.position.x < margin {
            h.x = 1.0;
        } else if view.position.x > view.arena.x - margin {
            h.x = -1.0;
        }
        if view.position.y < margin {
            h.y = 1.0;
        } else if view.position.y > view.arena.y - margin {
            h.y = -1.0;
        }
        h
    }
}

impl InputController for RandomController {
    fn name(&self) -> &str {
        "random"
    }

    fn next_input(&mut self, view: &InputView) -> PlayerInput {
        if self.hold == 0 {
            self.heading = HEADINGS[self.rng.gen_range(0..HEADINGS.len())];
            self.hold = self.rng.gen_range(15..60);
        }
        self.hold -= 1;

        let aim = if self.rng.gen_bool(0.2) {
            let random_point = Vec2::new(
                self.rng.gen_range(0.0..view.arena.x),
                self.rng.gen_range(0.0..view.arena.y),
            );
            Some(view.nearest_hostile.unwrap_or(random_point))
        } else {
            None
        };

        PlayerInput {
            movement: self.away_from_walls(view, self.heading),
            aim,
            dash: self.rng.gen_bool(0.01),
            echo: self.rng.gen_bool(0.005),
        }
    }
}
