//! Seed sweep: many independent runs in parallel
//!
//! Each seed is a separate `Run` owned by one rayon task, so runs never share
//! state. Optionally every run is rebuilt by the replay viewer to check that
//! its record reproduces the final state.

use crate::config::GameConfig;
use crate::core::RunId;
use crate::game::{
    GameLoop, IdleController, InputController, RandomController, Run, RunEndReason, RunSummary,
    VerbosityLevel,
};
use crate::replay::ReplayViewer;
use crate::Result;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Controller used for every run of a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepController {
    Idle,
    /// Random controller seeded with the run seed
    Random,
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub first_seed: u64,
    pub runs: u64,
    pub max_ticks: u64,
    pub controller: SweepController,
    pub config: GameConfig,
    /// Rebuild each run from its record and compare hashes
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedOutcome {
    pub seed: u64,
    pub summary: RunSummary,
    /// `None` when verification was not requested
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SweepStats {
    pub runs: usize,
    pub deaths: usize,
    pub tick_limits: usize,
    pub total_ticks: u64,
    pub total_spawned: u64,
    pub total_kills: u64,
    pub mismatches: Vec<u64>,
    pub elapsed: Duration,
}

impl SweepStats {
    pub fn average_ticks(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.total_ticks as f64 / self.runs as f64
    }

    pub fn ticks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_ticks as f64 / secs
    }
}

/// Play one seed to completion
pub fn run_seed(index: u64, seed: u64, options: &SweepOptions) -> Result<SeedOutcome> {
    let run_id = RunId::new((index % u64::from(u32::MAX)) as u32 + 1);
    let mut run = Run::new(run_id, seed, options.config.clone())?;
    let mut controller: Box<dyn InputController> = match options.controller {
        SweepController::Idle => Box::new(IdleController::new()),
        SweepController::Random => Box::new(RandomController::with_seed(seed)),
    };

    let summary = GameLoop::new(&mut run)
        .with_max_ticks(options.max_ticks)
        .with_verbosity(VerbosityLevel::Silent)
        .run(controller.as_mut())?;

    let verified = if options.verify {
        let record = run.finish()?;
        Some(ReplayViewer::new(record)?.verify()?)
    } else {
        None
    };
    Ok(SeedOutcome {
        seed,
        summary,
        verified,
    })
}

/// Run every seed of the sweep in parallel; outcomes are ordered by seed
pub fn run_sweep(options: &SweepOptions) -> Result<(Vec<SeedOutcome>, SweepStats)> {
    let start = Instant::now();
    let outcomes = (0..options.runs)
        .into_par_iter()
        .map(|i| run_seed(i, options.first_seed.wrapping_add(i), options))
        .collect::<Result<Vec<_>>>()?;

    let mut stats = SweepStats {
        runs: outcomes.len(),
        elapsed: start.elapsed(),
        ..SweepStats::default()
    };
    for outcome in &outcomes {
        match outcome.summary.end_reason {
            RunEndReason::PlayerDeath => stats.deaths += 1,
            RunEndReason::TickLimit => stats.tick_limits += 1,
        }
        stats.total_ticks += outcome.summary.ticks;
        stats.total_spawned += u64::from(outcome.summary.spawned);
        stats.total_kills += u64::from(outcome.summary.kills);
        if outcome.verified == Some(false) {
            stats.mismatches.push(outcome.seed);
        }
    }
    Ok((outcomes, stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(verify: bool) -> SweepOptions {
        SweepOptions {
            first_seed: 100,
            runs: 4,
            max_ticks: 300,
            controller: SweepController::Random,
            config: GameConfig {
                clone_delay: 60,
                delayed_clone_delay: 90,
                clone_spawn_interval: 80.0,
                min_spawn_interval: 30.0,
                echo_delay: 60,
                ..GameConfig::default()
            },
            verify,
        }
    }

    #[test]
    fn test_sweep_is_ordered_and_reproducible() {
        let (first, stats) = run_sweep(&options(false)).unwrap();
        let (second, _) = run_sweep(&options(false)).unwrap();
        assert_eq!(first, second);
        assert_eq!(stats.runs, 4);
        let seeds: Vec<u64> = first.iter().map(|o| o.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_sweep_verifies_records() {
        let (outcomes, stats) = run_sweep(&options(true)).unwrap();
        assert!(outcomes.iter().all(|o| o.verified == Some(true)));
        assert!(stats.mismatches.is_empty());
    }
}
