//! Simulation loop
//!
//! Drives a `Run` one tick at a time: asks the controller for input, steps
//! the run, and checks the end conditions.

/// Macro for conditional logging that avoids allocation when feature is disabled
///
/// When the verbose-logging feature is disabled this becomes a no-op at
/// compile time, so per-tick reports cost nothing in benchmarks.
macro_rules! log_if_verbose {
    ($self:expr, $tick:expr, $($arg:tt)*) => {
        #[cfg(feature = "verbose-logging")]
        {
            $self.run.logger.tick_event(
                VerbosityLevel::Verbose,
                LogCategory::Actions,
                $tick,
                format_args!($($arg)*),
            );
        }
        #[cfg(not(feature = "verbose-logging"))]
        {
            let _ = (&$self, $tick); // Suppress unused variable warning
        }
    };
}

use crate::game::combat::{CombatResolver, ContactDamage};
use crate::game::controller::InputController;
use crate::game::logger::{LogCategory, VerbosityLevel};
use crate::game::run::{Run, TickReport};
use crate::game::state_hash::format_hash;
use crate::Result;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEndReason {
    /// The player's health reached zero
    PlayerDeath,
    /// Reached the tick limit
    TickLimit,
}

/// Result of running to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub end_reason: RunEndReason,
    /// Ticks simulated
    pub ticks: u64,
    pub spawned: u32,
    pub kills: u32,
    pub shots: u32,
    /// State hash at the end of the last tick
    pub final_hash: u64,
}

/// Simulation loop manager
pub struct GameLoop<'a> {
    pub run: &'a mut Run,
    combat: Box<dyn CombatResolver + 'a>,
    /// Absolute tick at which the loop stops
    max_ticks: u64,
    spawned: u32,
    kills: u32,
    shots: u32,
}

impl<'a> GameLoop<'a> {
    /// Loop over `run` with contact damage and a ten-minute limit
    pub fn new(run: &'a mut Run) -> Self {
        let combat = Box::new(ContactDamage::from_config(run.config()));
        let max_ticks = u64::from(run.config().fps) * 600;
        GameLoop {
            run,
            combat,
            max_ticks,
            spawned: 0,
            kills: 0,
            shots: 0,
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_verbosity(mut self, verbosity: VerbosityLevel) -> Self {
        self.run.logger.set_verbosity(verbosity);
        self
    }

    /// Replace the combat resolver
    pub fn with_combat(mut self, combat: Box<dyn CombatResolver + 'a>) -> Self {
        self.combat = combat;
        self
    }

    /// Whether the loop would stop before the next tick
    pub fn end_reason(&self) -> Option<RunEndReason> {
        if self.run.is_over() {
            Some(RunEndReason::PlayerDeath)
        } else if self.run.tick().as_u64() >= self.max_ticks {
            Some(RunEndReason::TickLimit)
        } else {
            None
        }
    }

    /// Simulate one tick
    pub fn step(&mut self, controller: &mut dyn InputController) -> Result<TickReport> {
        let view = self.run.input_view();
        let input = controller.next_input(&view);
        let report = self.run.step(&input, self.combat.as_mut())?;

        self.spawned += report.spawned;
        self.kills += report.kills;
        self.shots += report.shots;
        if report.recorded > 0 || report.shots > 0 || report.player_hits > 0 {
            log_if_verbose!(
                self,
                report.tick,
                "{} actions, {} shots, {} hits, {} entities",
                report.recorded,
                report.shots,
                report.player_hits,
                self.run.entities().len()
            );
        }
        Ok(report)
    }

    /// Run until the player dies or the tick limit is reached
    pub fn run(&mut self, controller: &mut dyn InputController) -> Result<RunSummary> {
        self.run.logger.normal(&format!(
            "{} seed {} with {} controller, {} resolver",
            self.run.id(),
            self.run.seed(),
            controller.name(),
            self.combat.name()
        ));

        let end_reason = loop {
            if let Some(reason) = self.end_reason() {
                break reason;
            }
            self.step(controller)?;
        };

        let summary = RunSummary {
            end_reason,
            ticks: self.run.tick().as_u64(),
            spawned: self.spawned,
            kills: self.kills,
            shots: self.shots,
            final_hash: self.run.state_hash(),
        };
        self.run.logger.minimal(&format!(
            "{} ended by {:?} after {} ticks ({} spawned, {} killed), hash {}",
            self.run.id(),
            summary.end_reason,
            summary.ticks,
            summary.spawned,
            summary.kills,
            format_hash(summary.final_hash)
        ));
        Ok(summary)
    }
}
