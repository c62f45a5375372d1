//! Performance benchmarks for the replay core
//!
//! Measures three things with Criterion.rs:
//!
//! 1. **Run** - simulate a seeded run with a random controller
//! 2. **Viewer** - rebuild a finished run from its record
//! 3. **Driver** - replay one long timeline with a mutation chain
//!
//! Allocation totals for a warmup run are reported through stats_alloc.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mirror_clone_rs::{
    config::GameConfig,
    core::{ActionEvent, EntityId, Kinematics, PlaybackRate, RunId, Tick, Vec2},
    game::{GameLoop, RandomController, Run, RunRecord, VerbosityLevel},
    replay::{MirrorAxes, Mutation, ReplayViewer, TransformChain, TransformedReplayDriver},
    timeline::{Timeline, TimelineKey, TimelineStore},
    Result,
};
use stats_alloc::{Region, StatsAlloc, INSTRUMENTED_SYSTEM};
use std::alloc::System;
use std::time::Duration;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

const RUN_TICKS: u64 = 3_600;

/// Metrics collected during a run
#[derive(Debug, Clone)]
struct RunMetrics {
    ticks: u64,
    spawned: u32,
    duration: Duration,
    bytes_allocated: usize,
    bytes_deallocated: usize,
}

impl RunMetrics {
    fn ticks_per_sec(&self) -> f64 {
        self.ticks as f64 / self.duration.as_secs_f64()
    }

    fn bytes_per_tick(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.bytes_allocated as f64 / self.ticks as f64
        }
    }
}

fn play(seed: u64) -> Result<Run> {
    let mut run = Run::new(RunId::new(1), seed, GameConfig::default())?;
    GameLoop::new(&mut run)
        .with_max_ticks(RUN_TICKS)
        .with_verbosity(VerbosityLevel::Silent)
        .run(&mut RandomController::with_seed(seed))?;
    Ok(run)
}

fn run_with_metrics(seed: u64) -> Result<RunMetrics> {
    let reg = Region::new(GLOBAL);
    let start = std::time::Instant::now();
    let run = play(seed)?;
    let duration = start.elapsed();
    let stats = reg.change();

    Ok(RunMetrics {
        ticks: run.tick().as_u64(),
        spawned: run.lifecycle().len() as u32,
        duration,
        bytes_allocated: stats.bytes_allocated,
        bytes_deallocated: stats.bytes_deallocated,
    })
}

/// Benchmark: simulate a fresh run each iteration
fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_execution");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(20));

    let seed = 42u64;
    println!("\nWarmup run (seed {}):", seed);
    if let Ok(metrics) = run_with_metrics(seed) {
        println!("  Ticks: {}", metrics.ticks);
        println!("  Lifecycle events: {}", metrics.spawned);
        println!("  Duration: {:?}", metrics.duration);
        println!("  Ticks/sec: {:.2}", metrics.ticks_per_sec());
        println!("  Bytes allocated: {}", metrics.bytes_allocated);
        println!("  Bytes deallocated: {}", metrics.bytes_deallocated);
        println!("  Bytes/tick: {:.2}", metrics.bytes_per_tick());
    }

    group.bench_with_input(BenchmarkId::new("fresh", seed), &seed, |b, &seed| {
        b.iter(|| play(black_box(seed)).expect("Run should complete successfully"));
    });
    group.finish();
}

/// Benchmark: rebuild a finished run from its record
fn bench_viewer(c: &mut Criterion) {
    let record: RunRecord = match play(42).and_then(Run::finish) {
        Ok(record) => record,
        Err(e) => {
            eprintln!("Skipping benchmark - failed to record run: {}", e);
            return;
        }
    };

    let mut group = c.benchmark_group("replay_viewer");
    group.sample_size(10);
    group.bench_function("run_to_end", |b| {
        b.iter(|| {
            let mut viewer = ReplayViewer::new(record.clone()).expect("Record should load");
            viewer.run_to_end().expect("Replay should complete")
        });
    });
    group.finish();
}

/// Benchmark: one mirrored fast driver over a long timeline
fn bench_driver(c: &mut Criterion) {
    let key = TimelineKey::new(RunId::new(1), EntityId::new(0));
    let events: Vec<ActionEvent> = (0..RUN_TICKS)
        .step_by(15)
        .map(|t| {
            let angle = t as f32 * 0.1;
            ActionEvent::movement(Tick::new(t), Vec2::new(angle.cos() * 4.0, angle.sin() * 4.0))
        })
        .collect();
    let mut store = TimelineStore::new();
    let timeline = Timeline::from_events(key, Kinematics::at(Vec2::new(400.0, 300.0)), events)
        .and_then(|t| t.with_horizon(Tick::new(RUN_TICKS)))
        .expect("Timeline should build");
    store.insert(timeline).expect("Timeline should insert");

    let config = GameConfig::default();
    let chain = TransformChain::new()
        .with(Mutation::Fast {
            rate: config.fast_playback().expect("Fast rate should be valid"),
        })
        .with(Mutation::Mirror {
            axes: MirrorAxes::Both,
            arena: config.arena(),
        });

    c.bench_function("driver_mirror_fast", |b| {
        b.iter(|| {
            let mut driver = TransformedReplayDriver::bind(
                &store,
                key,
                Tick::ZERO,
                Tick::ZERO,
                PlaybackRate::ONE,
                chain.clone(),
            )
            .expect("Driver should bind");
            for t in 0..RUN_TICKS / 2 {
                driver.advance(Tick::new(t), &store).expect("Advance should succeed");
            }
            black_box(driver.state().position())
        });
    });
}

criterion_group!(benches, bench_run, bench_viewer, bench_driver);
criterion_main!(benches);
