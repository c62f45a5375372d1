//! Core simulation types

pub mod action;
pub mod entity;
pub mod motion;
pub mod types;

pub use action::{ActionEvent, ActionKind, ActionPayload};
pub use entity::{EntityId, EntityStore};
pub use motion::{fold_kinematics, kinematics_entering, EntityState, Kinematics, MotionParams};
pub use types::{PlaybackRate, RunId, Tick, Vec2};
