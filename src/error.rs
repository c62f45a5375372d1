//! Error types for the replay core

use crate::core::{ActionKind, Tick};
use crate::timeline::TimelineKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Out-of-order event: {kind} at tick {tick} after tick {last}")]
    OutOfOrder {
        tick: Tick,
        kind: ActionKind,
        last: Tick,
    },

    #[error("Timeline not found: {0}")]
    TimelineNotFound(TimelineKey),

    #[error("Timeline is empty: {0}")]
    EmptyTimeline(TimelineKey),

    #[error("Timeline already exists: {0}")]
    DuplicateTimeline(TimelineKey),

    #[error("Timeline is sealed: {0}")]
    TimelineSealed(TimelineKey),

    #[error("Stale or foreign capture handle for {0}")]
    StaleHandle(TimelineKey),

    #[error("Invalid commit for {key}: through tick {through} is behind horizon {horizon}")]
    InvalidCommit {
        key: TimelineKey,
        through: Tick,
        horizon: Tick,
    },

    #[error("Invalid slice of {key}: [{from}, {to})")]
    InvalidSlice { key: TimelineKey, from: Tick, to: Tick },

    #[error("Non-monotonic advance: tick {requested} requested after {last}")]
    NonMonotonic { requested: Tick, last: Tick },

    #[error("Start tick {start} is beyond the horizon of {key}")]
    StartBeyondHorizon { key: TimelineKey, start: Tick },

    #[error("Entity not found: {0}")]
    EntityNotFound(u32),

    #[error("Invalid playback rate: {num}/{den}")]
    InvalidRate { num: u32, den: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Corrupt run record: {0}")]
    CorruptRecord(String),
}

/// Broad class of a failure, deciding how the simulation reacts to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Misuse of an API; fatal to the run in strict mode
    Programmer,
    /// Missing or inconsistent data; the dependent entity is despawned
    DataIntegrity,
    /// Files, parsing, configuration
    Environment,
}

impl MirrorError {
    pub fn class(&self) -> ErrorClass {
        match self {
            MirrorError::OutOfOrder { .. }
            | MirrorError::NonMonotonic { .. }
            | MirrorError::StaleHandle(_)
            | MirrorError::TimelineSealed(_)
            | MirrorError::DuplicateTimeline(_)
            | MirrorError::InvalidCommit { .. }
            | MirrorError::InvalidSlice { .. }
            | MirrorError::InvalidRate { .. }
            | MirrorError::EntityNotFound(_) => ErrorClass::Programmer,
            MirrorError::TimelineNotFound(_)
            | MirrorError::EmptyTimeline(_)
            | MirrorError::StartBeyondHorizon { .. } => ErrorClass::DataIntegrity,
            MirrorError::InvalidConfig(_)
            | MirrorError::IoError(_)
            | MirrorError::SerializationError(_)
            | MirrorError::CorruptRecord(_) => ErrorClass::Environment,
        }
    }

    pub fn is_data_integrity(&self) -> bool {
        self.class() == ErrorClass::DataIntegrity
    }
}

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
