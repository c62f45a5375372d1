//! Timeline data model
//!
//! A `Timeline` is the ordered action history of one entity, either captured
//! live from the player or derived as a slice of another timeline.

use crate::core::{
    fold_kinematics, ActionEvent, ActionKind, EntityId, Kinematics, MotionParams, RunId, Tick,
};
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a timeline: the run it belongs to and the entity it describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimelineKey {
    pub run: RunId,
    pub entity: EntityId,
}

impl TimelineKey {
    pub fn new(run: RunId, entity: EntityId) -> Self {
        TimelineKey { run, entity }
    }
}

impl fmt::Display for TimelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.run, self.entity)
    }
}

/// Tracks the last tick seen and which kinds already occurred in it
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct OrderCursor {
    last: Option<Tick>,
    kinds: u8,
}

impl OrderCursor {
    pub(crate) fn last(&self) -> Option<Tick> {
        self.last
    }

    /// Whether `kind` was already seen at `tick`
    pub(crate) fn seen(&self, tick: Tick, kind: ActionKind) -> bool {
        self.last == Some(tick) && self.kinds & kind.bit() != 0
    }

    pub(crate) fn check(&self, tick: Tick, kind: ActionKind) -> Result<()> {
        if let Some(last) = self.last {
            if tick < last || self.seen(tick, kind) {
                return Err(MirrorError::OutOfOrder { tick, kind, last });
            }
        }
        Ok(())
    }

    /// Record an event that already passed `check`
    pub(crate) fn admit(&mut self, tick: Tick, kind: ActionKind) {
        if self.last != Some(tick) {
            self.last = Some(tick);
            self.kinds = 0;
        }
        self.kinds |= kind.bit();
    }
}

/// Spacing of cached kinematics checkpoints, in ticks
pub const CHECKPOINT_TICKS: u64 = 256;

/// Kinematics entering every `CHECKPOINT_TICKS`-th tick of the covered range
///
/// `states[i]` is the state entering tick `(i + 1) * CHECKPOINT_TICKS`. The
/// cache is only valid for the motion parameters it was built with.
#[derive(Clone, Default)]
struct Checkpoints {
    params: Option<MotionParams>,
    states: Vec<Kinematics>,
}

impl fmt::Debug for Checkpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} checkpoints", self.states.len())
    }
}

/// Ordered action history of one entity
///
/// `origin` is the kinematic state entering tick 0 and `horizon` the last tick
/// the timeline covers. A timeline with no horizon covers no ticks at all and
/// cannot drive an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    key: TimelineKey,
    origin: Kinematics,
    events: Vec<ActionEvent>,
    horizon: Option<Tick>,
    #[serde(skip)]
    checkpoints: Checkpoints,
}

/// Equal when the recorded history is equal; the checkpoint cache is ignored
impl PartialEq for Timeline {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.origin == other.origin
            && self.events == other.events
            && self.horizon == other.horizon
    }
}

impl Timeline {
    /// Empty timeline, as created when a capture begins
    pub fn new(key: TimelineKey, origin: Kinematics) -> Self {
        Timeline {
            key,
            origin,
            events: Vec::new(),
            horizon: None,
            checkpoints: Checkpoints::default(),
        }
    }

    /// Build a timeline from already-recorded events
    ///
    /// The horizon is the tick of the last event. Events must be ordered by
    /// tick with at most one event of each kind per tick.
    pub fn from_events(
        key: TimelineKey,
        origin: Kinematics,
        events: Vec<ActionEvent>,
    ) -> Result<Self> {
        let mut cursor = OrderCursor::default();
        for event in &events {
            cursor.check(event.tick(), event.kind())?;
            cursor.admit(event.tick(), event.kind());
        }
        let horizon = cursor.last();
        Ok(Timeline {
            key,
            origin,
            events,
            horizon,
            checkpoints: Checkpoints::default(),
        })
    }

    /// Check a timeline that did not come through `from_events` or a store,
    /// such as one read from a saved record
    ///
    /// Events must be ordered with at most one of each kind per tick, and
    /// none may lie past the horizon.
    pub fn validate(&self) -> Result<()> {
        let mut cursor = OrderCursor::default();
        for event in &self.events {
            cursor.check(event.tick(), event.kind())?;
            cursor.admit(event.tick(), event.kind());
        }
        match (cursor.last(), self.horizon) {
            (Some(last), None) => Err(MirrorError::InvalidCommit {
                key: self.key,
                through: Tick::ZERO,
                horizon: last,
            }),
            (Some(last), Some(horizon)) if last > horizon => Err(MirrorError::InvalidCommit {
                key: self.key,
                through: horizon,
                horizon: last,
            }),
            _ => Ok(()),
        }
    }

    /// Extend the covered range past the last event (idle tail)
    pub fn with_horizon(mut self, horizon: Tick) -> Result<Self> {
        if let Some(last) = self.events.last() {
            if horizon < last.tick() {
                return Err(MirrorError::InvalidCommit {
                    key: self.key,
                    through: horizon,
                    horizon: last.tick(),
                });
            }
        }
        self.horizon = Some(horizon);
        Ok(self)
    }

    pub fn key(&self) -> TimelineKey {
        self.key
    }

    pub fn origin(&self) -> &Kinematics {
        &self.origin
    }

    pub fn events(&self) -> &[ActionEvent] {
        &self.events
    }

    pub fn horizon(&self) -> Option<Tick> {
        self.horizon
    }

    /// Number of ticks covered (`horizon + 1`, or 0)
    pub fn duration(&self) -> u64 {
        self.horizon.map_or(0, |h| h.as_u64() + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.horizon.is_none()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events recorded at exactly `tick`
    pub fn events_at(&self, tick: Tick) -> &[ActionEvent] {
        self.events_in(tick, tick.next())
    }

    /// Events with tick in `[from, to)`
    pub fn events_in(&self, from: Tick, to: Tick) -> &[ActionEvent] {
        let start = self.events.partition_point(|e| e.tick() < from);
        let end = self.events.partition_point(|e| e.tick() < to);
        if start >= end {
            return &[];
        }
        &self.events[start..end]
    }

    /// Kinematic state entering `tick`
    ///
    /// Folds from the nearest cached checkpoint at or before `tick` when the
    /// cache was built with `params`, otherwise from the origin.
    pub fn kinematics_entering(&self, tick: Tick, params: &MotionParams) -> Kinematics {
        let mut from = Tick::ZERO;
        let mut state = self.origin;
        if self.checkpoints.params.as_ref() == Some(params) {
            let reached = (tick.as_u64() / CHECKPOINT_TICKS).min(self.checkpoints.states.len() as u64);
            if reached > 0 {
                from = Tick::new(reached * CHECKPOINT_TICKS);
                state = self.checkpoints.states[reached as usize - 1];
            }
        }
        fold_kinematics(state, from, self.events_in(from, tick), tick, params)
    }

    /// Extend the checkpoint cache over the committed range
    ///
    /// A checkpoint entering tick `T` needs every event before `T`, so it is
    /// only built once the horizon reaches `T - 1`.
    pub(crate) fn refresh_checkpoints(&mut self, params: &MotionParams) {
        if self.checkpoints.params.as_ref() != Some(params) {
            self.checkpoints = Checkpoints {
                params: Some(*params),
                states: Vec::new(),
            };
        }
        loop {
            let built = self.checkpoints.states.len() as u64;
            let next = Tick::new((built + 1) * CHECKPOINT_TICKS);
            if next.as_u64() > self.duration() {
                break;
            }
            let from = Tick::new(built * CHECKPOINT_TICKS);
            let state = match self.checkpoints.states.last() {
                Some(state) => *state,
                None => self.origin,
            };
            let state = fold_kinematics(state, from, self.events_in(from, next), next, params);
            self.checkpoints.states.push(state);
        }
    }

    #[cfg(test)]
    fn checkpoint_count(&self) -> usize {
        self.checkpoints.states.len()
    }

    /// Copy of the events with tick in `[from, to)`, reindexed to start at 0
    ///
    /// The slice's origin is the state entering `from`, so replaying the slice
    /// from 0 retraces the source from `from`. Ticks past the source horizon
    /// are not covered by the slice.
    pub fn slice(
        &self,
        from: Tick,
        to: Tick,
        new_key: TimelineKey,
        params: &MotionParams,
    ) -> Result<Timeline> {
        if from >= to {
            return Err(MirrorError::InvalidSlice {
                key: self.key,
                from,
                to,
            });
        }
        let horizon = self.horizon.ok_or(MirrorError::EmptyTimeline(self.key))?;
        if from > horizon {
            return Err(MirrorError::StartBeyondHorizon {
                key: self.key,
                start: from,
            });
        }

        let last = horizon.min(Tick::new(to.as_u64() - 1));
        let events = self
            .events_in(from, last.next())
            .iter()
            .map(|e| e.at_tick(Tick::new(e.tick().since(from))))
            .collect();

        Ok(Timeline {
            key: new_key,
            origin: self.kinematics_entering(from, params),
            events,
            horizon: Some(Tick::new(last.since(from))),
            checkpoints: Checkpoints::default(),
        })
    }

    /// Append committed events and move the horizon to `through`
    pub(crate) fn append(&mut self, events: Vec<ActionEvent>, through: Tick) {
        self.events.extend(events);
        self.horizon = Some(through);
    }
}
