//! Action timelines: data model, live capture and storage

pub mod model;
pub mod recorder;
pub mod store;

pub use model::{Timeline, TimelineKey};
pub use recorder::{OrderPolicy, TimelineRecorder};
pub use store::{CaptureHandle, CommitBatch, TimelineStore, TimelineView};
