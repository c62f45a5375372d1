//! Input controller trait and the view it decides from
//!
//! The simulation loop asks the controller for the player's input once per
//! tick. Keyboard and mouse glue would implement this trait; the crate ships
//! headless controllers for automated runs.

use crate::core::{Tick, Vec2};
use serde::{Deserialize, Serialize};

/// Raw player intent for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerInput {
    /// Desired movement direction (any length; zero stands still)
    pub movement: Vec2,
    /// Point to shoot at, if the trigger is held
    pub aim: Option<Vec2>,
    pub dash: bool,
    pub echo: bool,
}

impl PlayerInput {
    pub fn idle() -> Self {
        PlayerInput::default()
    }

    pub fn moving(direction: Vec2) -> Self {
        PlayerInput {
            movement: direction,
            ..PlayerInput::default()
        }
    }
}

/// Read-only view of the world for controllers
#[derive(Debug, Clone, Copy)]
pub struct InputView {
    pub tick: Tick,
    pub position: Vec2,
    pub arena: Vec2,
    pub echo_energy: f32,
    pub dash_ready: bool,
    /// Position of the closest active hostile
    pub nearest_hostile: Option<Vec2>,
}

pub trait InputController {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Input for the tick described by `view`
    fn next_input(&mut self, view: &InputView) -> PlayerInput;
}
