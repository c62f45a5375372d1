//! Timeline Recorder
//!
//! Captures the action events of the live entity. Events stay pending in the
//! recorder until the simulation loop commits a tick, at which point they are
//! published to the store and become visible to replay drivers.

use crate::core::{ActionEvent, ActionKind, ActionPayload, Kinematics, Tick};
use crate::timeline::model::{OrderCursor, TimelineKey};
use crate::timeline::store::{CaptureHandle, CommitBatch, TimelineStore};
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};

/// What to do with an event that arrives out of order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderPolicy {
    /// Reject with `OutOfOrder`
    Strict,
    /// Move the event forward to the earliest legal tick; drop a duplicate kind
    Clamp,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            OrderPolicy::Strict
        } else {
            OrderPolicy::Clamp
        }
    }
}

/// Writer for one live timeline
#[derive(Debug)]
pub struct TimelineRecorder {
    handle: CaptureHandle,
    pending: Vec<ActionEvent>,
    cursor: OrderCursor,
    committed_through: Option<Tick>,
    policy: OrderPolicy,
    clamped: u32,
    dropped: u32,
}

impl TimelineRecorder {
    /// Begin capturing `key` in `store`
    pub fn start(
        store: &mut TimelineStore,
        key: TimelineKey,
        origin: Kinematics,
        policy: OrderPolicy,
    ) -> Result<Self> {
        let handle = store.begin_capture(key, origin)?;
        Ok(TimelineRecorder {
            handle,
            pending: Vec::new(),
            cursor: OrderCursor::default(),
            committed_through: None,
            policy,
            clamped: 0,
            dropped: 0,
        })
    }

    pub fn key(&self) -> TimelineKey {
        self.handle.key()
    }

    pub fn policy(&self) -> OrderPolicy {
        self.policy
    }

    pub fn committed_through(&self) -> Option<Tick> {
        self.committed_through
    }

    pub fn pending(&self) -> &[ActionEvent] {
        &self.pending
    }

    /// Events moved forward under the clamp policy
    pub fn clamped(&self) -> u32 {
        self.clamped
    }

    /// Events discarded under the clamp policy
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Earliest tick a new event may carry
    fn floor(&self) -> Tick {
        let after_commit = self.committed_through.map_or(Tick::ZERO, Tick::next);
        match self.cursor.last() {
            Some(last) => last.max(after_commit),
            None => after_commit,
        }
    }

    /// Append one event for the live entity
    pub fn record(&mut self, tick: Tick, kind: ActionKind, payload: ActionPayload) -> Result<()> {
        let floor = self.floor();
        let legal = tick >= floor && !self.cursor.seen(tick, kind);

        let tick = if legal {
            tick
        } else {
            match self.policy {
                OrderPolicy::Strict => {
                    return Err(MirrorError::OutOfOrder {
                        tick,
                        kind,
                        last: self.cursor.last().max(self.committed_through).unwrap_or(floor),
                    });
                }
                OrderPolicy::Clamp => {
                    let clamped = tick.max(floor);
                    if self.cursor.seen(clamped, kind) {
                        self.dropped += 1;
                        return Ok(());
                    }
                    self.clamped += 1;
                    clamped
                }
            }
        };

        self.cursor.admit(tick, kind);
        self.pending.push(ActionEvent::new(tick, kind, payload));
        Ok(())
    }

    /// Publish pending events with tick `<= through`
    ///
    /// Returns the number of events published. Committing a tick that is
    /// already committed is a no-op.
    pub fn commit(&mut self, through: Tick, store: &mut TimelineStore) -> Result<usize> {
        if self.committed_through.is_some_and(|c| through <= c) {
            return Ok(0);
        }
        let split = self.pending.partition_point(|e| e.tick() <= through);
        let events: Vec<ActionEvent> = self.pending.drain(..split).collect();
        let published = events.len();
        store.commit(&self.handle, CommitBatch::new(events, through))?;
        self.committed_through = Some(through);
        Ok(published)
    }

    /// Commit everything still pending and seal the timeline
    pub fn finish(mut self, store: &mut TimelineStore) -> Result<TimelineKey> {
        if let Some(last) = self.pending.last().map(|e| e.tick()) {
            let through = self.committed_through.map_or(last, |c| c.max(last));
            self.commit(through, store)?;
        }
        let key = self.key();
        store.seal(self.handle)?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityId, RunId, Vec2};

    fn setup(policy: OrderPolicy) -> (TimelineStore, TimelineRecorder) {
        let mut store = TimelineStore::new();
        let key = TimelineKey::new(RunId::new(1), EntityId::new(0));
        let recorder =
            TimelineRecorder::start(&mut store, key, Kinematics::at(Vec2::ZERO), policy).unwrap();
        (store, recorder)
    }

    fn aim() -> ActionPayload {
        ActionPayload::toward(Vec2::new(1.0, 0.0))
    }

    #[test]
    fn test_strict_rejects_out_of_order() {
        let (_, mut recorder) = setup(OrderPolicy::Strict);
        recorder.record(Tick::new(5), ActionKind::Shoot, aim()).unwrap();
        recorder.record(Tick::new(5), ActionKind::Move, aim()).unwrap();

        let err = recorder
            .record(Tick::new(4), ActionKind::Shoot, aim())
            .unwrap_err();
        assert!(matches!(
            err,
            MirrorError::OutOfOrder { tick, last, .. } if tick == Tick::new(4) && last == Tick::new(5)
        ));

        let err = recorder
            .record(Tick::new(5), ActionKind::Shoot, aim())
            .unwrap_err();
        assert!(matches!(err, MirrorError::OutOfOrder { .. }));
        assert_eq!(recorder.pending().len(), 2);
    }

    #[test]
    fn test_clamp_moves_events_forward() {
        let (_, mut recorder) = setup(OrderPolicy::Clamp);
        recorder.record(Tick::new(5), ActionKind::Shoot, aim()).unwrap();
        recorder.record(Tick::new(3), ActionKind::Move, aim()).unwrap();
        recorder.record(Tick::new(2), ActionKind::Shoot, aim()).unwrap();

        let ticks: Vec<u64> = recorder.pending().iter().map(|e| e.tick().as_u64()).collect();
        assert_eq!(ticks, vec![5, 5]);
        assert_eq!(recorder.clamped(), 1);
        assert_eq!(recorder.dropped(), 1);
    }

    #[test]
    fn test_commit_publishes_through_tick() {
        let (mut store, mut recorder) = setup(OrderPolicy::Strict);
        recorder.record(Tick::new(0), ActionKind::Move, aim()).unwrap();
        recorder.record(Tick::new(3), ActionKind::Shoot, aim()).unwrap();

        assert_eq!(recorder.commit(Tick::new(1), &mut store).unwrap(), 1);
        let view = store.view(recorder.key()).unwrap();
        assert_eq!(view.timeline.len(), 1);
        assert_eq!(view.timeline.horizon(), Some(Tick::new(1)));

        // Already committed
        assert_eq!(recorder.commit(Tick::new(1), &mut store).unwrap(), 0);

        // Recording into the committed past is out of order
        assert!(recorder.record(Tick::new(1), ActionKind::Dash, aim()).is_err());

        let key = recorder.finish(&mut store).unwrap();
        let timeline = store.get(key).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.horizon(), Some(Tick::new(3)));
        assert!(!store.is_live(key));
    }

    #[test]
    fn test_finish_without_events_leaves_empty_timeline() {
        let (mut store, recorder) = setup(OrderPolicy::Strict);
        let key = recorder.finish(&mut store).unwrap();
        assert!(store.get(key).unwrap().is_empty());
    }
}
