//! Entity drivers
//!
//! Every entity is updated through one capability, `advance(tick)`, whatever
//! feeds it: the player's own live capture, a plain replay, or a mutated one.

use crate::core::{EntityState, Tick};
use crate::replay::{PlaybackStatus, ReplayDriver, ReplayStep, TransformedReplayDriver};
use crate::timeline::{TimelineKey, TimelineStore};
use crate::Result;

#[derive(Debug, Clone)]
pub enum Driver {
    /// Reads the player's timeline as it is being committed
    LiveInput(ReplayDriver),
    Replay(ReplayDriver),
    Transformed(TransformedReplayDriver),
}

impl Driver {
    pub fn advance(&mut self, tick: Tick, store: &TimelineStore) -> Result<ReplayStep> {
        match self {
            Driver::LiveInput(driver) | Driver::Replay(driver) => driver.advance(tick, store),
            Driver::Transformed(driver) => driver.advance(tick, store),
        }
    }

    pub fn state(&self) -> &EntityState {
        match self {
            Driver::LiveInput(driver) | Driver::Replay(driver) => driver.state(),
            Driver::Transformed(driver) => driver.state(),
        }
    }

    pub fn source(&self) -> TimelineKey {
        self.replay().source()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.replay().status()
    }

    fn replay(&self) -> &ReplayDriver {
        match self {
            Driver::LiveInput(driver) | Driver::Replay(driver) => driver,
            Driver::Transformed(driver) => driver.base(),
        }
    }
}
