//! Deterministic playback of timelines
//!
//! - `driver`: reconstructs an entity's state from a timeline, tick by tick
//! - `transform`: pure event transforms behind clone mutations
//! - `viewer`: rebuilds a finished run from its record for spectation

pub mod driver;
pub mod transform;
pub mod viewer;

pub use driver::{PlaybackStatus, ReplayDriver, ReplayStep, TransformedReplayDriver};
pub use transform::{EventTransform, Identity, MirrorAxes, Mutation, TransformChain};
pub use viewer::ReplayViewer;
