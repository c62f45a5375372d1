//! Replay Driver
//!
//! Reconstructs an entity's state from a timeline. The driver keeps a
//! monotone cursor into its source: each `advance` folds only the source
//! ticks it has not folded yet, so advancing to T1 and then to T2 gives the
//! same state as advancing straight to T2.

use crate::core::{ActionEvent, ActionKind, EntityState, MotionParams, PlaybackRate, Tick};
use crate::replay::transform::{EventTransform, Identity, TransformChain};
use crate::timeline::{Timeline, TimelineKey, TimelineStore};
use crate::{MirrorError, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Where a driver stands relative to its source horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// Target tick is within the source
    Playing,
    /// Waiting at the committed horizon of a live timeline
    Stalled,
    /// Target tick lies past the horizon of a sealed timeline
    Overrun,
}

/// Result of one `advance`
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub status: PlaybackStatus,
    /// Last source tick folded so far
    pub source_tick: Option<Tick>,
    /// Discrete actions (shots, dashes, echoes) folded during this advance
    pub actions: SmallVec<[ActionEvent; 4]>,
}

impl ReplayStep {
    pub fn shots(&self) -> impl Iterator<Item = &ActionEvent> {
        self.actions.iter().filter(|e| e.kind() == ActionKind::Shoot)
    }
}

/// Deterministic playback of one timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDriver {
    source: TimelineKey,
    /// Source tick the entity starts from
    start: Tick,
    /// Simulation tick at which the entity appeared
    spawn_tick: Tick,
    rate: PlaybackRate,
    params: MotionParams,
    state: EntityState,
    /// Next source tick to fold
    next_tick: Tick,
    last_sim_tick: Option<Tick>,
    status: PlaybackStatus,
}

impl ReplayDriver {
    /// Bind a driver to `timeline`, seeking to the state at `start`
    ///
    /// `live` tells whether the timeline is still being captured. A sealed
    /// timeline must cover `start`; a live one may still be empty when the
    /// driver starts at tick 0.
    #[allow(clippy::too_many_arguments)]
    pub fn bind<T: EventTransform>(
        timeline: &Timeline,
        live: bool,
        start: Tick,
        spawn_tick: Tick,
        rate: PlaybackRate,
        params: MotionParams,
        transform: &T,
    ) -> Result<Self> {
        let key = timeline.key();
        match timeline.horizon() {
            None if !live => return Err(MirrorError::EmptyTimeline(key)),
            None if start > Tick::ZERO => {
                return Err(MirrorError::StartBeyondHorizon { key, start });
            }
            Some(horizon) if start > horizon => {
                return Err(MirrorError::StartBeyondHorizon { key, start });
            }
            _ => {}
        }

        let origin = transform.map_origin(timeline.kinematics_entering(start, &params));
        Ok(ReplayDriver {
            source: key,
            start,
            spawn_tick,
            rate,
            params,
            state: EntityState::new(origin),
            next_tick: start,
            last_sim_tick: None,
            status: PlaybackStatus::Playing,
        })
    }

    /// Bind from the store, resolving the live flag there
    pub fn bind_in(
        store: &TimelineStore,
        source: TimelineKey,
        start: Tick,
        spawn_tick: Tick,
        rate: PlaybackRate,
    ) -> Result<Self> {
        let view = store.view(source)?;
        Self::bind(
            view.timeline,
            view.live,
            start,
            spawn_tick,
            rate,
            *store.motion_params(),
            &Identity,
        )
    }

    pub fn source(&self) -> TimelineKey {
        self.source
    }

    pub fn start(&self) -> Tick {
        self.start
    }

    pub fn spawn_tick(&self) -> Tick {
        self.spawn_tick
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Source tick the driver should have reached at `sim_tick`
    pub fn target_for(&self, sim_tick: Tick) -> Tick {
        self.start
            .offset(self.rate.scale(sim_tick.since(self.spawn_tick)))
    }

    /// Advance to simulation tick `sim_tick` with no transform
    pub fn advance(&mut self, sim_tick: Tick, store: &TimelineStore) -> Result<ReplayStep> {
        self.advance_with(sim_tick, store, &Identity)
    }

    /// Advance to simulation tick `sim_tick`, mapping every source event
    /// through `transform` before folding it
    pub fn advance_with<T: EventTransform>(
        &mut self,
        sim_tick: Tick,
        store: &TimelineStore,
        transform: &T,
    ) -> Result<ReplayStep> {
        if let Some(last) = self.last_sim_tick {
            if sim_tick < last {
                return Err(MirrorError::NonMonotonic {
                    requested: sim_tick,
                    last,
                });
            }
        }

        let view = store.view(self.source)?;
        let timeline = view.timeline;
        let mut actions = SmallVec::new();

        let Some(horizon) = timeline.horizon() else {
            if !view.live {
                return Err(MirrorError::EmptyTimeline(self.source));
            }
            self.last_sim_tick = Some(sim_tick);
            self.status = PlaybackStatus::Stalled;
            return Ok(self.step_result(actions));
        };

        let target = self.target_for(sim_tick);
        let limit = target.min(horizon);
        self.status = if target <= horizon {
            PlaybackStatus::Playing
        } else if view.live {
            PlaybackStatus::Stalled
        } else {
            PlaybackStatus::Overrun
        };

        let mut tick = self.next_tick;
        while tick <= limit {
            if tick > self.start {
                self.state.step(&self.params);
            }
            let mut shot_recorded = false;
            for event in timeline.events_at(tick) {
                let event = transform.transform(event);
                shot_recorded |= event.kind() == ActionKind::Shoot;
                self.fold(event, &mut actions);
            }
            if let Some(extra) = transform.extra_event(tick, shot_recorded) {
                self.fold(extra, &mut actions);
            }
            self.state.tick = Some(tick);
            tick = tick.next();
        }
        self.next_tick = tick;
        self.last_sim_tick = Some(sim_tick);

        Ok(self.step_result(actions))
    }

    fn fold(&mut self, event: ActionEvent, actions: &mut SmallVec<[ActionEvent; 4]>) {
        self.state.apply(&event, &self.params);
        if event.kind().is_discrete() {
            actions.push(event);
        }
    }

    fn step_result(&self, actions: SmallVec<[ActionEvent; 4]>) -> ReplayStep {
        ReplayStep {
            status: self.status,
            source_tick: self.state.tick,
            actions,
        }
    }
}

/// Replay driver wrapped in a chain of mutations
///
/// The base driver is bound with the chain's combined rate, so a Fast
/// mutation simply makes the cursor move faster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedReplayDriver {
    base: ReplayDriver,
    chain: TransformChain,
}

impl TransformedReplayDriver {
    pub fn bind(
        store: &TimelineStore,
        source: TimelineKey,
        start: Tick,
        spawn_tick: Tick,
        base_rate: PlaybackRate,
        chain: TransformChain,
    ) -> Result<Self> {
        let view = store.view(source)?;
        let base = ReplayDriver::bind(
            view.timeline,
            view.live,
            start,
            spawn_tick,
            base_rate.then(chain.rate()),
            *store.motion_params(),
            &chain,
        )?;
        Ok(TransformedReplayDriver { base, chain })
    }

    pub fn chain(&self) -> &TransformChain {
        &self.chain
    }

    pub fn base(&self) -> &ReplayDriver {
        &self.base
    }

    pub fn state(&self) -> &EntityState {
        self.base.state()
    }

    pub fn advance(&mut self, sim_tick: Tick, store: &TimelineStore) -> Result<ReplayStep> {
        self.base.advance_with(sim_tick, store, &self.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionPayload, EntityId, Kinematics, RunId, Vec2};
    use crate::replay::transform::{MirrorAxes, Mutation};
    use crate::timeline::{OrderPolicy, TimelineRecorder};

    fn key(entity: u32) -> TimelineKey {
        TimelineKey::new(RunId::new(1), EntityId::new(entity))
    }

    fn store_with(events: Vec<ActionEvent>) -> TimelineStore {
        let mut store = TimelineStore::new();
        store
            .insert(
                Timeline::from_events(key(0), Kinematics::at(Vec2::new(100.0, 100.0)), events)
                    .unwrap(),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_move_then_shoot() {
        let store = store_with(vec![
            ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 0.0)),
            ActionEvent::shot(Tick::new(5), Vec2::new(0.0, 1.0)),
        ]);
        let mut driver =
            ReplayDriver::bind_in(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE)
                .unwrap();

        let step = driver.advance(Tick::new(10), &store).unwrap();
        assert_eq!(step.status, PlaybackStatus::Overrun);
        assert_eq!(step.source_tick, Some(Tick::new(5)));
        assert_eq!(step.shots().count(), 1);
        assert_eq!(driver.state().position(), Vec2::new(105.0, 100.0));
        assert_eq!(driver.state().shots_fired, 1);
    }

    #[test]
    fn test_advance_is_incremental() {
        let events = vec![
            ActionEvent::movement(Tick::new(0), Vec2::new(1.0, 2.0)),
            ActionEvent::movement(Tick::new(4), Vec2::new(-1.0, 0.0)),
            ActionEvent::shot(Tick::new(6), Vec2::new(1.0, 0.0)),
        ];
        let store = store_with(events);
        let bind =
            || ReplayDriver::bind_in(&store, key(0), Tick::new(1), Tick::new(20), PlaybackRate::ONE);

        let mut stepwise = bind().unwrap();
        for t in 20..=30 {
            stepwise.advance(Tick::new(t), &store).unwrap();
        }
        let mut direct = bind().unwrap();
        direct.advance(Tick::new(30), &store).unwrap();
        assert_eq!(stepwise.state(), direct.state());

        // Same tick twice folds nothing new
        let again = direct.advance(Tick::new(30), &store).unwrap();
        assert!(again.actions.is_empty());

        let err = direct.advance(Tick::new(29), &store).unwrap_err();
        assert!(matches!(err, MirrorError::NonMonotonic { .. }));
    }

    #[test]
    fn test_fast_reaches_event_at_half_time() {
        let store = store_with(vec![ActionEvent::shot(Tick::new(10), Vec2::new(1.0, 0.0))]);
        let chain = TransformChain::new().with(Mutation::Fast {
            rate: PlaybackRate::times(2).unwrap(),
        });
        let mut driver = TransformedReplayDriver::bind(
            &store,
            key(0),
            Tick::ZERO,
            Tick::ZERO,
            PlaybackRate::ONE,
            chain,
        )
        .unwrap();

        let step = driver.advance(Tick::new(4), &store).unwrap();
        assert_eq!(step.shots().count(), 0);
        let step = driver.advance(Tick::new(5), &store).unwrap();
        assert_eq!(step.shots().count(), 1);
        assert_eq!(step.source_tick, Some(Tick::new(10)));
    }

    #[test]
    fn test_mirror_retraces_reflected_path() {
        let store = store_with(vec![ActionEvent::movement(Tick::new(0), Vec2::new(3.0, 1.0))]);
        let store = {
            let mut store = store;
            let timeline = store.remove(key(0)).unwrap().with_horizon(Tick::new(20)).unwrap();
            store.insert(timeline).unwrap();
            store
        };
        let chain = TransformChain::new().with(Mutation::Mirror {
            axes: MirrorAxes::Horizontal,
            arena: Vec2::new(800.0, 600.0),
        });
        let mut plain =
            ReplayDriver::bind_in(&store, key(0), Tick::new(2), Tick::ZERO, PlaybackRate::ONE)
                .unwrap();
        let mut mirrored = TransformedReplayDriver::bind(
            &store,
            key(0),
            Tick::new(2),
            Tick::ZERO,
            PlaybackRate::ONE,
            chain,
        )
        .unwrap();

        plain.advance(Tick::new(10), &store).unwrap();
        mirrored.advance(Tick::new(10), &store).unwrap();
        let p = plain.state().position();
        let m = mirrored.state().position();
        assert_eq!(m.x, 800.0 - p.x);
        assert_eq!(m.y, p.y);
    }

    #[test]
    fn test_live_timeline_stalls_at_committed_horizon() {
        let mut store = TimelineStore::new();
        let mut recorder = TimelineRecorder::start(
            &mut store,
            key(0),
            Kinematics::at(Vec2::ZERO),
            OrderPolicy::Strict,
        )
        .unwrap();
        recorder
            .record(Tick::new(0), ActionKind::Move, ActionPayload::toward(Vec2::new(1.0, 0.0)))
            .unwrap();
        recorder.commit(Tick::new(3), &mut store).unwrap();

        let mut driver = ReplayDriver::bind_in(
            &store,
            key(0),
            Tick::ZERO,
            Tick::ZERO,
            PlaybackRate::times(2).unwrap(),
        )
        .unwrap();
        let step = driver.advance(Tick::new(4), &store).unwrap();
        assert_eq!(step.status, PlaybackStatus::Stalled);
        assert_eq!(step.source_tick, Some(Tick::new(3)));

        recorder
            .record(Tick::new(5), ActionKind::Shoot, ActionPayload::toward(Vec2::new(0.0, 1.0)))
            .unwrap();
        recorder.commit(Tick::new(9), &mut store).unwrap();
        let step = driver.advance(Tick::new(4), &store).unwrap();
        assert_eq!(step.status, PlaybackStatus::Playing);
        assert_eq!(step.shots().count(), 1);
        assert_eq!(driver.state().position(), Vec2::new(8.0, 0.0));
    }

    #[test]
    fn test_bind_rejects_empty_and_unreachable() {
        let mut store = TimelineStore::new();
        store
            .insert(Timeline::new(key(0), Kinematics::at(Vec2::ZERO)))
            .unwrap();
        assert!(matches!(
            ReplayDriver::bind_in(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE),
            Err(MirrorError::EmptyTimeline(_))
        ));
        assert!(matches!(
            ReplayDriver::bind_in(&store, key(5), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE),
            Err(MirrorError::TimelineNotFound(_))
        ));

        let store = store_with(vec![ActionEvent::shot(Tick::new(3), Vec2::new(1.0, 0.0))]);
        assert!(matches!(
            ReplayDriver::bind_in(&store, key(0), Tick::new(4), Tick::ZERO, PlaybackRate::ONE),
            Err(MirrorError::StartBeyondHorizon { .. })
        ));
    }

    #[test]
    fn test_removed_source_is_reported() {
        let mut store = store_with(vec![ActionEvent::shot(Tick::new(3), Vec2::new(1.0, 0.0))]);
        let mut driver =
            ReplayDriver::bind_in(&store, key(0), Tick::ZERO, Tick::ZERO, PlaybackRate::ONE)
                .unwrap();
        store.remove(key(0));
        assert!(matches!(
            driver.advance(Tick::new(1), &store),
            Err(MirrorError::TimelineNotFound(_))
        ));
    }
}
