//! Profiling binary for run execution
//!
//! Plays runs in a tight loop for profiling with cargo-flamegraph. Unlike the
//! Criterion benchmarks, this has minimal overhead and produces cleaner
//! flamegraphs.
//!
//! Usage:
//!   cargo flamegraph --bin profile

use mirror_clone_rs::{
    config::GameConfig,
    core::RunId,
    game::{GameLoop, RandomController, Run, VerbosityLevel},
    replay::ReplayViewer,
};

fn main() -> anyhow::Result<()> {
    // Allow overriding iterations via environment variable
    let iterations: u64 = std::env::var("PROFILE_ITERATIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);

    println!("Profiling run execution...");
    println!("Running {} runs of up to 3600 ticks, each replayed once", iterations);
    println!();

    let config = GameConfig::default();
    for i in 0..iterations {
        let seed = 42 + i;
        let mut run = Run::new(RunId::new(1), seed, config.clone())?;
        let mut controller = RandomController::with_seed(seed);
        GameLoop::new(&mut run)
            .with_max_ticks(3600)
            .with_verbosity(VerbosityLevel::Silent)
            .run(&mut controller)?;

        let mut viewer = ReplayViewer::new(run.finish()?)?;
        viewer.run_to_end()?;

        // Print progress every 50 runs
        if (i + 1) % 50 == 0 {
            println!("Completed {} runs", i + 1);
        }
    }

    println!();
    println!("Profiling complete! {} runs executed.", iterations);
    Ok(())
}
