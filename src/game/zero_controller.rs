//! Idle controller
//!
//! Never moves, never shoots. Useful for runs that only need the clock to
//! advance and for benchmarking the replay machinery in isolation.

use crate::game::controller::{InputController, InputView, PlayerInput};

#[derive(Debug, Clone, Copy, Default)]
pub struct IdleController;

impl IdleController {
    pub fn new() -> Self {
        IdleController
    }
}

impl InputController for IdleController {
    fn name(&self) -> &str {
        "idle"
    }

    fn next_input(&mut self, _view: &InputView) -> PlayerInput {
        PlayerInput::idle()
    }
}
