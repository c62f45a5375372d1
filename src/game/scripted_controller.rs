//! Scripted controller for deterministic testing
//!
//! Follows a fixed list of steps, each holding one input for a number of
//! ticks. Once the script is exhausted the player stands still.

use crate::game::controller::{InputController, InputView, PlayerInput};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hold `input` for `ticks` ticks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub ticks: u64,
    #[serde(default)]
    pub input: PlayerInput,
}

/// Serializable with its position, so a saved controller resumes mid-script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedController {
    steps: Vec<ScriptStep>,
    /// Current step
    pub current_index: usize,
    /// Ticks already spent in the current step
    pub elapsed: u64,
}

impl ScriptedController {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        ScriptedController {
            steps,
            current_index: 0,
            elapsed: 0,
        }
    }

    /// Parse a JSON list of steps
    pub fn from_json(json: &str) -> Result<Self> {
        let steps: Vec<ScriptStep> = serde_json::from_str(json)?;
        Ok(Self::new(steps))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Total ticks covered by the script
    pub fn len_ticks(&self) -> u64 {
        self.steps.iter().map(|s| s.ticks).sum()
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.steps.len()
    }
}

impl InputController for ScriptedController {
    fn name(&self) -> &str {
        "script"
    }

    fn next_input(&mut self, _view: &InputView) -> PlayerInput {
        while let Some(step) = self.steps.get(self.current_index) {
            if self.elapsed < step.ticks {
                self.elapsed += 1;
                return step.input;
            }
            self.current_index += 1;
            self.elapsed = 0;
        }
        PlayerInput::idle()
    }
}
