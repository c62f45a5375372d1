//! Mirror Clone Survival - replay core
//!
//! Records the player's actions as a timeline and replays them, live or
//! sliced, as clones, bosses and echo allies. A finished run can be rebuilt
//! tick for tick by the replay viewer.

pub mod config;
pub mod core;
pub mod error;
pub mod game;
pub mod replay;
pub mod sweep;
pub mod timeline;

pub use error::{MirrorError, Result};
