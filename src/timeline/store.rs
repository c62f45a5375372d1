//! Timeline Store
//!
//! Owns every timeline of every run, keyed by (run id, entity id). Timelines
//! being captured are only readable up to their last committed tick; drivers
//! read through `view` and never hold references across ticks.

use crate::core::{ActionEvent, Kinematics, MotionParams, RunId, Tick};
use crate::timeline::model::{OrderCursor, Timeline, TimelineKey};
use crate::{MirrorError, Result};
use rustc_hash::FxHashMap;

/// Exclusive right to append to one timeline
///
/// Not `Clone`: there is exactly one writer per captured timeline. The token
/// ties the handle to the capture it was issued for, so a handle that
/// outlives its capture is rejected.
#[derive(Debug, PartialEq, Eq)]
pub struct CaptureHandle {
    key: TimelineKey,
    token: u64,
}

impl CaptureHandle {
    pub fn key(&self) -> TimelineKey {
        self.key
    }
}

/// Events published by one commit, all with tick `<= through`
#[derive(Debug, Clone, PartialEq)]
pub struct CommitBatch {
    pub events: Vec<ActionEvent>,
    pub through: Tick,
}

impl CommitBatch {
    pub fn new(events: Vec<ActionEvent>, through: Tick) -> Self {
        CommitBatch { events, through }
    }

    /// Advance the horizon without new events
    pub fn empty(through: Tick) -> Self {
        CommitBatch {
            events: Vec::new(),
            through,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Capturing { token: u64 },
    Sealed,
}

#[derive(Debug, Clone)]
struct Slot {
    timeline: Timeline,
    state: SlotState,
}

/// Read access to a stored timeline
#[derive(Debug, Clone, Copy)]
pub struct TimelineView<'a> {
    pub timeline: &'a Timeline,
    /// Still being captured: the horizon may move forward
    pub live: bool,
}

/// Collection of timelines keyed by (run id, entity id)
#[derive(Debug, Clone)]
pub struct TimelineStore {
    slots: FxHashMap<TimelineKey, Slot>,
    params: MotionParams,
    next_token: u64,
}

impl TimelineStore {
    pub fn new() -> Self {
        Self::with_params(MotionParams::default())
    }

    /// Store whose slices fold motion with `params`
    pub fn with_params(params: MotionParams) -> Self {
        TimelineStore {
            slots: FxHashMap::default(),
            params,
            next_token: 1,
        }
    }

    pub fn motion_params(&self) -> &MotionParams {
        &self.params
    }

    /// Create an empty timeline and hand out its single capture handle
    pub fn begin_capture(&mut self, key: TimelineKey, origin: Kinematics) -> Result<CaptureHandle> {
        if self.slots.contains_key(&key) {
            return Err(MirrorError::DuplicateTimeline(key));
        }
        let token = self.next_token;
        self.next_token += 1;
        self.slots.insert(
            key,
            Slot {
                timeline: Timeline::new(key, origin),
                state: SlotState::Capturing { token },
            },
        );
        Ok(CaptureHandle { key, token })
    }

    fn capturing_slot(&mut self, handle: &CaptureHandle) -> Result<&mut Slot> {
        let slot = self
            .slots
            .get_mut(&handle.key)
            .ok_or(MirrorError::StaleHandle(handle.key))?;
        match slot.state {
            SlotState::Capturing { token } if token == handle.token => Ok(slot),
            SlotState::Capturing { .. } => Err(MirrorError::StaleHandle(handle.key)),
            SlotState::Sealed => Err(MirrorError::TimelineSealed(handle.key)),
        }
    }

    /// Publish a batch of events and move the committed horizon to `batch.through`
    ///
    /// The horizon must strictly advance and every event must fall in
    /// `(old horizon, through]`.
    pub fn commit(&mut self, handle: &CaptureHandle, batch: CommitBatch) -> Result<()> {
        let params = self.params;
        let slot = self.capturing_slot(handle)?;
        let timeline = &slot.timeline;
        let key = timeline.key();

        if let Some(horizon) = timeline.horizon() {
            let stale = batch.through <= horizon || batch.events.iter().any(|e| e.tick() <= horizon);
            if stale {
                return Err(MirrorError::InvalidCommit {
                    key,
                    through: batch.through,
                    horizon,
                });
            }
        }

        let mut cursor = OrderCursor::default();
        for event in &batch.events {
            if event.tick() > batch.through {
                return Err(MirrorError::InvalidCommit {
                    key,
                    through: batch.through,
                    horizon: event.tick(),
                });
            }
            cursor.check(event.tick(), event.kind())?;
            cursor.admit(event.tick(), event.kind());
        }

        slot.timeline.append(batch.events, batch.through);
        slot.timeline.refresh_checkpoints(&params);
        Ok(())
    }

    /// End a capture; the timeline becomes immutable
    pub fn seal(&mut self, handle: CaptureHandle) -> Result<()> {
        let slot = self.capturing_slot(&handle)?;
        slot.state = SlotState::Sealed;
        Ok(())
    }

    /// Add an immutable timeline (a derived slice or a loaded record)
    pub fn insert(&mut self, mut timeline: Timeline) -> Result<()> {
        let key = timeline.key();
        if self.slots.contains_key(&key) {
            return Err(MirrorError::DuplicateTimeline(key));
        }
        timeline.refresh_checkpoints(&self.params);
        self.slots.insert(
            key,
            Slot {
                timeline,
                state: SlotState::Sealed,
            },
        );
        Ok(())
    }

    /// Committed part of a timeline
    pub fn get(&self, key: TimelineKey) -> Result<&Timeline> {
        self.slots
            .get(&key)
            .map(|slot| &slot.timeline)
            .ok_or(MirrorError::TimelineNotFound(key))
    }

    pub fn view(&self, key: TimelineKey) -> Result<TimelineView<'_>> {
        let slot = self
            .slots
            .get(&key)
            .ok_or(MirrorError::TimelineNotFound(key))?;
        Ok(TimelineView {
            timeline: &slot.timeline,
            live: matches!(slot.state, SlotState::Capturing { .. }),
        })
    }

    pub fn contains(&self, key: TimelineKey) -> bool {
        self.slots.contains_key(&key)
    }

    pub fn is_live(&self, key: TimelineKey) -> bool {
        self.slots
            .get(&key)
            .map(|slot| matches!(slot.state, SlotState::Capturing { .. }))
            .unwrap_or(false)
    }

    /// Copy `[from, to)` of a timeline into a new sealed timeline under `new_key`
    ///
    /// Only committed events are visible, so slicing a live capture never
    /// copies anything past its committed horizon.
    pub fn slice(
        &mut self,
        key: TimelineKey,
        from: Tick,
        to: Tick,
        new_key: TimelineKey,
    ) -> Result<TimelineKey> {
        if self.slots.contains_key(&new_key) {
            return Err(MirrorError::DuplicateTimeline(new_key));
        }
        let sliced = self.get(key)?.slice(from, to, new_key, &self.params)?;
        self.insert(sliced)?;
        Ok(new_key)
    }

    /// Drop every timeline of `run` except those in `retain`
    ///
    /// Returns the number of timelines released.
    pub fn release_run(&mut self, run: RunId, retain: &[TimelineKey]) -> usize {
        let before = self.slots.len();
        self.slots
            .retain(|key, _| key.run != run || retain.contains(key));
        before - self.slots.len()
    }

    pub fn remove(&mut self, key: TimelineKey) -> Option<Timeline> {
        self.slots.remove(&key).map(|slot| slot.timeline)
    }

    /// Keys of one run, sorted
    pub fn keys_for_run(&self, run: RunId) -> Vec<TimelineKey> {
        let mut keys: Vec<_> = self.slots.keys().filter(|k| k.run == run).copied().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{kinematics_entering, EntityId, Vec2};

    fn key(run: u32, entity: u32) -> TimelineKey {
        TimelineKey::new(RunId::new(run), EntityId::new(entity))
    }

    #[test]
    fn test_view_is_limited_to_committed_events() {
        let mut store = TimelineStore::new();
        let handle = store
            .begin_capture(key(1, 0), Kinematics::at(Vec2::ZERO))
            .unwrap();

        let view = store.view(key(1, 0)).unwrap();
        assert!(view.live);
        assert!(view.timeline.is_empty());

        store
            .commit(
                &handle,
                CommitBatch::new(
                    vec![ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0))],
                    Tick::new(2),
                ),
            )
            .unwrap();
        let view = store.view(key(1, 0)).unwrap();
        assert_eq!(view.timeline.horizon(), Some(Tick::new(2)));
        assert_eq!(view.timeline.len(), 1);
    }

    #[test]
    fn test_commit_must_advance() {
        let mut store = TimelineStore::new();
        let handle = store
            .begin_capture(key(1, 0), Kinematics::at(Vec2::ZERO))
            .unwrap();
        store.commit(&handle, CommitBatch::empty(Tick::new(5))).unwrap();

        let err = store
            .commit(&handle, CommitBatch::empty(Tick::new(5)))
            .unwrap_err();
        assert!(matches!(err, MirrorError::InvalidCommit { .. }));

        // Event at an already committed tick
        let err = store
            .commit(
                &handle,
                CommitBatch::new(
                    vec![ActionEvent::shot(Tick::new(4), Vec2::new(1.0, 0.0))],
                    Tick::new(6),
                ),
            )
            .unwrap_err();
        assert!(matches!(err, MirrorError::InvalidCommit { .. }));
    }

    #[test]
    fn test_seal_rejects_further_commits() {
        let mut store = TimelineStore::new();
        let handle = store
            .begin_capture(key(1, 0), Kinematics::at(Vec2::ZERO))
            .unwrap();
        let forged = CaptureHandle {
            key: key(1, 0),
            token: handle.token,
        };
        store.seal(handle).unwrap();
        assert!(!store.is_live(key(1, 0)));

        let err = store
            .commit(&forged, CommitBatch::empty(Tick::new(1)))
            .unwrap_err();
        assert!(matches!(err, MirrorError::TimelineSealed(_)));
    }

    #[test]
    fn test_foreign_handle_is_stale() {
        let mut store = TimelineStore::new();
        let handle = store
            .begin_capture(key(1, 0), Kinematics::at(Vec2::ZERO))
            .unwrap();
        let foreign = CaptureHandle {
            key: key(1, 0),
            token: handle.token + 100,
        };
        assert!(matches!(
            store.commit(&foreign, CommitBatch::empty(Tick::new(1))),
            Err(MirrorError::StaleHandle(_))
        ));
        assert!(matches!(
            store.begin_capture(key(1, 0), Kinematics::at(Vec2::ZERO)),
            Err(MirrorError::DuplicateTimeline(_))
        ));
    }

    #[test]
    fn test_slice_and_release() {
        let mut store = TimelineStore::new();
        let source = Timeline::from_events(
            key(1, 0),
            Kinematics::at(Vec2::ZERO),
            vec![
                ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
                ActionEvent::shot(Tick::new(8), Vec2::new(1.0, 0.0)),
            ],
        )
        .unwrap();
        store.insert(source).unwrap();
        store.insert(Timeline::new(key(2, 0), Kinematics::at(Vec2::ZERO))).unwrap();

        let sliced = store
            .slice(key(1, 0), Tick::new(4), Tick::new(10), key(1, 5))
            .unwrap();
        let slice = store.get(sliced).unwrap();
        assert_eq!(slice.events().len(), 1);
        assert_eq!(slice.events()[0].tick(), Tick::new(4));

        assert!(matches!(
            store.slice(key(1, 7), Tick::ZERO, Tick::new(1), key(1, 8)),
            Err(MirrorError::TimelineNotFound(_))
        ));

        let released = store.release_run(RunId::new(1), &[key(1, 0)]);
        assert_eq!(released, 1);
        assert_eq!(store.keys_for_run(RunId::new(1)), vec![key(1, 0)]);
        assert!(store.contains(key(2, 0)));
    }

    #[test]
    fn test_long_capture_slices_from_checkpoints() {
        let mut store = TimelineStore::new();
        let origin = Kinematics::at(Vec2::new(400.0, 300.0));
        let handle = store.begin_capture(key(1, 0), origin).unwrap();
        for t in 0..900u64 {
            let events = if t % 50 == 0 {
                let turn = if (t / 50) % 2 == 0 { Vec2::new(2.0, -1.5) } else { Vec2::new(-2.5, 1.0) };
                vec![ActionEvent::movement(Tick::new(t), turn)]
            } else {
                Vec::new()
            };
            store.commit(&handle, CommitBatch::new(events, Tick::new(t))).unwrap();
        }

        let params = *store.motion_params();
        let events = store.get(key(1, 0)).unwrap().events().to_vec();
        for (i, from) in [0u64, 255, 256, 513, 899].into_iter().enumerate() {
            let new_key = key(1, 10 + i as u32);
            store.slice(key(1, 0), Tick::new(from), Tick::new(from + 40), new_key).unwrap();
            assert_eq!(
                *store.get(new_key).unwrap().origin(),
                kinematics_entering(origin, &events, Tick::new(from), &params),
                "slice from {}",
                from
            );
        }
    }
}
