//! Recorded actions
//!
//! An `ActionEvent` is one discrete thing an entity did at one tick. Events
//! are immutable once built; transforms produce new events instead of editing
//! recorded ones.

use crate::core::{Tick, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a recorded action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Set the per-tick velocity (zero stops)
    Move,
    /// Fire once in the payload direction
    Shoot,
    /// Start a dash window in the payload direction
    Dash,
    /// Summon an echo ally
    Echo,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Move,
        ActionKind::Shoot,
        ActionKind::Dash,
        ActionKind::Echo,
    ];

    /// Bit used to track which kinds were seen within a single tick
    pub fn bit(self) -> u8 {
        match self {
            ActionKind::Move => 1,
            ActionKind::Shoot => 1 << 1,
            ActionKind::Dash => 1 << 2,
            ActionKind::Echo => 1 << 3,
        }
    }

    /// Whether this kind is reported as a discrete action during replay
    pub fn is_discrete(self) -> bool {
        !matches!(self, ActionKind::Move)
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Move => "move",
            ActionKind::Shoot => "shoot",
            ActionKind::Dash => "dash",
            ActionKind::Echo => "echo",
        };
        f.write_str(name)
    }
}

/// Direction vector and optional target point of an action
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionPayload {
    pub direction: Vec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Vec2>,
}

impl ActionPayload {
    pub fn toward(direction: Vec2) -> Self {
        ActionPayload {
            direction,
            target: None,
        }
    }

    pub fn aimed(direction: Vec2, target: Vec2) -> Self {
        ActionPayload {
            direction,
            target: Some(target),
        }
    }

    pub fn none() -> Self {
        ActionPayload::default()
    }
}

/// One recorded action of one entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    tick: Tick,
    kind: ActionKind,
    payload: ActionPayload,
}

impl ActionEvent {
    pub fn new(tick: Tick, kind: ActionKind, payload: ActionPayload) -> Self {
        ActionEvent {
            tick,
            kind,
            payload,
        }
    }

    pub fn movement(tick: Tick, velocity: Vec2) -> Self {
        Self::new(tick, ActionKind::Move, ActionPayload::toward(velocity))
    }

    pub fn shot(tick: Tick, direction: Vec2) -> Self {
        Self::new(tick, ActionKind::Shoot, ActionPayload::toward(direction))
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn payload(&self) -> &ActionPayload {
        &self.payload
    }

    /// Same action with a different payload
    pub fn with_payload(&self, payload: ActionPayload) -> Self {
        ActionEvent {
            tick: self.tick,
            kind: self.kind,
            payload,
        }
    }

    /// Same action moved to another tick (used when slicing)
    pub fn at_tick(&self, tick: Tick) -> Self {
        ActionEvent {
            tick,
            kind: self.kind,
            payload: self.payload,
        }
    }
}

impl fmt::Display for ActionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} {} {}", self.tick, self.kind, self.payload.direction)?;
        if let Some(target) = self.payload.target {
            write!(f, " -> {}", target)?;
        }
        Ok(())
    }
}
