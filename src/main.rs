//! Mirror Clone Survival - headless runner
//!
//! Plays runs with scripted or random input, saves run records, and replays
//! them through the post-game viewer.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use mirror_clone_rs::{
    config::GameConfig,
    core::{RunId, Tick},
    game::{
        format_hash, GameLoop, IdleController, InputController, RandomController, Run, RunRecord,
        ScriptedController, VerbosityLevel,
    },
    replay::ReplayViewer,
    sweep::{run_sweep, SweepController, SweepOptions},
};
use std::path::{Path, PathBuf};

/// Controller type for the player
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ControllerType {
    /// Stands still
    Idle,
    /// Makes seeded random choices
    Random,
    /// Follows a JSON input script (requires --script)
    Script,
}

/// Verbosity level for run output (custom parser supporting both names and numbers)
#[derive(Debug, Clone, Copy)]
struct VerbosityArg(VerbosityLevel);

impl std::str::FromStr for VerbosityArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "0" => Ok(VerbosityArg(VerbosityLevel::Silent)),
            "minimal" | "1" => Ok(VerbosityArg(VerbosityLevel::Minimal)),
            "normal" | "2" => Ok(VerbosityArg(VerbosityLevel::Normal)),
            "verbose" | "3" => Ok(VerbosityArg(VerbosityLevel::Verbose)),
            _ => Err(format!(
                "invalid verbosity level '{s}' (expected: silent/0, minimal/1, normal/2, verbose/3)"
            )),
        }
    }
}

impl From<VerbosityArg> for VerbosityLevel {
    fn from(arg: VerbosityArg) -> Self {
        arg.0
    }
}

#[derive(Parser)]
#[command(name = "mirror")]
#[command(about = "Mirror Clone Survival - record, replay and verify runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one run
    Run {
        /// Game config JSON (defaults when omitted)
        #[arg(long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,

        /// Run seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Player controller type
        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        /// Input script for the script controller
        #[arg(long, value_name = "SCRIPT_FILE")]
        script: Option<PathBuf>,

        /// Stop after this many ticks
        #[arg(long, default_value_t = 36_000)]
        max_ticks: u64,

        /// Verbosity level (0=silent, 1=minimal, 2=normal, 3=verbose)
        #[arg(long, default_value = "normal", short = 'v')]
        verbosity: VerbosityArg,

        /// Save the run record here
        #[arg(long, short = 'o', value_name = "RECORD_FILE")]
        record: Option<PathBuf>,
    },

    /// Play back a saved run record
    View {
        #[arg(value_name = "RECORD_FILE")]
        record: PathBuf,

        /// Playback speed, 0.5 to 4.0 in steps of 0.5
        #[arg(long, default_value_t = 1.0)]
        speed: f32,

        /// Start from this tick
        #[arg(long, default_value_t = 0)]
        seek: u64,

        /// Print a frame every N ticks
        #[arg(long, default_value_t = 60)]
        every: u64,
    },

    /// Rebuild a run record and compare its final state hash
    Verify {
        #[arg(value_name = "RECORD_FILE")]
        record: PathBuf,
    },

    /// Play many seeds in parallel and report statistics
    Sweep {
        /// Number of runs
        #[arg(long, short = 'n', default_value_t = 100)]
        runs: u64,

        /// First seed; run i uses seed + i
        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 7_200)]
        max_ticks: u64,

        /// Idle or random
        #[arg(long, value_enum, default_value = "random")]
        controller: ControllerType,

        #[arg(long, value_name = "CONFIG_FILE")]
        config: Option<PathBuf>,

        /// Also rebuild each run from its record
        #[arg(long)]
        verify: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            seed,
            controller,
            script,
            max_ticks,
            verbosity,
            record,
        } => run_game(config, seed, controller, script, max_ticks, verbosity, record)?,
        Commands::View {
            record,
            speed,
            seek,
            every,
        } => view_record(&record, speed, seek, every)?,
        Commands::Verify { record } => verify_record(&record)?,
        Commands::Sweep {
            runs,
            seed,
            max_ticks,
            controller,
            config,
            verify,
        } => sweep(runs, seed, max_ticks, controller, config, verify)?,
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<GameConfig> {
    match path {
        Some(path) => GameConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(GameConfig::default()),
    }
}

fn load_record(path: &Path) -> anyhow::Result<RunRecord> {
    RunRecord::load(path).with_context(|| format!("loading run record {}", path.display()))
}

#[allow(clippy::too_many_arguments)]
fn run_game(
    config: Option<PathBuf>,
    seed: u64,
    controller: ControllerType,
    script: Option<PathBuf>,
    max_ticks: u64,
    verbosity: VerbosityArg,
    record: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config.as_deref())?;
    let mut controller: Box<dyn InputController> = match controller {
        ControllerType::Idle => Box::new(IdleController::new()),
        ControllerType::Random => Box::new(RandomController::with_seed(seed)),
        ControllerType::Script => {
            let Some(path) = script else {
                bail!("--controller script requires --script");
            };
            Box::new(
                ScriptedController::load_from_file(&path)
                    .with_context(|| format!("loading script {}", path.display()))?,
            )
        }
    };

    let mut run = Run::new(RunId::new(1), seed, config).context("starting run")?;
    let summary = GameLoop::new(&mut run)
        .with_max_ticks(max_ticks)
        .with_verbosity(verbosity.into())
        .run(controller.as_mut())
        .context("running simulation")?;

    println!(
        "ticks: {}  spawned: {}  killed: {}  shots: {}  hash: {}",
        summary.ticks,
        summary.spawned,
        summary.kills,
        summary.shots,
        format_hash(summary.final_hash)
    );

    if let Some(path) = record {
        let run_record = run.finish().context("finishing run")?;
        run_record
            .save(&path)
            .with_context(|| format!("saving run record {}", path.display()))?;
        println!("record saved to {}", path.display());
    }
    Ok(())
}

fn view_record(path: &Path, speed: f32, seek: u64, every: u64) -> anyhow::Result<()> {
    let mut viewer = ReplayViewer::new(load_record(path)?)?;
    if !(0.5..=4.0).contains(&speed) {
        bail!("speed must be between 0.5 and 4.0");
    }
    while viewer.speed() < speed {
        viewer.speed_up();
    }
    while viewer.speed() > speed {
        viewer.speed_down();
    }
    viewer.seek(Tick::new(seek))?;

    let every = every.max(1);
    let mut frames = 0u64;
    while !viewer.is_finished() {
        viewer.update()?;
        frames += 1;
        if viewer.tick().as_u64() % every == 0 {
            let frame = viewer.frame();
            println!(
                "[{:>7.2}s / {:.2}s] frame {}: {} entities",
                viewer.playback_time(),
                viewer.total_time(),
                frames,
                frame.entities.len()
            );
            for entity in &frame.entities {
                println!("    {} {} at {}", entity.kind, entity.id, entity.position);
            }
        }
    }
    Ok(())
}

fn verify_record(path: &Path) -> anyhow::Result<()> {
    let record = load_record(path)?;
    let expected = record.final_hash;
    let mut viewer = ReplayViewer::new(record)?;
    let actual = viewer.run_to_end().context("replaying record")?;
    if actual != expected {
        bail!(
            "hash mismatch: recorded {} replayed {}",
            format_hash(expected),
            format_hash(actual)
        );
    }
    println!("ok: {} ticks, hash {}", viewer.total_ticks(), format_hash(actual));
    Ok(())
}

fn sweep(
    runs: u64,
    first_seed: u64,
    max_ticks: u64,
    controller: ControllerType,
    config: Option<PathBuf>,
    verify: bool,
) -> anyhow::Result<()> {
    let controller = match controller {
        ControllerType::Idle => SweepController::Idle,
        ControllerType::Random => SweepController::Random,
        ControllerType::Script => bail!("sweeps support idle and random controllers only"),
    };
    let options = SweepOptions {
        first_seed,
        runs,
        max_ticks,
        controller,
        config: load_config(config.as_deref())?,
        verify,
    };

    println!("=== Mirror Clone Survival - Seed Sweep ===\n");
    println!("Running {runs} runs from seed {first_seed} ({max_ticks} ticks max)\n");
    let (_, stats) = run_sweep(&options).context("running sweep")?;

    println!("Runs:          {}", stats.runs);
    println!("Player deaths: {}", stats.deaths);
    println!("Survived:      {}", stats.tick_limits);
    println!("Avg ticks:     {:.1}", stats.average_ticks());
    println!("Spawned:       {}", stats.total_spawned);
    println!("Killed:        {}", stats.total_kills);
    println!(
        "Elapsed:       {:.2}s ({:.0} ticks/s)",
        stats.elapsed.as_secs_f64(),
        stats.ticks_per_second()
    );
    if verify {
        if stats.mismatches.is_empty() {
            println!("Replay check:  all runs reproduced");
        } else {
            bail!("replay mismatch for seeds {:?}", stats.mismatches);
        }
    }
    Ok(())
}
