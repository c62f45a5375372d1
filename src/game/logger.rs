//! Run logger with in-memory capture
//!
//! Messages go to stdout, to an in-memory journal, or both. Per-tick lines are
//! formatted in a bump arena that is reset after every line, so a long run
//! does not churn the global allocator for messages nobody reads.

use crate::core::Tick;
use bumpalo::Bump;
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::fmt::{self, Write as FmtWrite};

/// Verbosity level for run output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    Silent = 0,
    /// Run start and outcome
    Minimal = 1,
    /// Spawns and despawns too
    #[default]
    Normal = 2,
    /// Per-tick action reports
    Verbose = 3,
}

/// Output destination for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OutputMode {
    #[default]
    Stdout,
    /// Journal only, nothing printed
    Memory,
    Both,
}

/// What a journal entry is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogCategory {
    /// Run start and end
    Run,
    Spawn,
    Despawn,
    /// Per-tick action summary
    Actions,
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogCategory::Run => "run",
            LogCategory::Spawn => "spawn",
            LogCategory::Despawn => "despawn",
            LogCategory::Actions => "actions",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: VerbosityLevel,
    pub category: LogCategory,
    /// Tick the entry refers to, if any
    pub tick: Option<Tick>,
    pub message: String,
}

pub struct RunLogger {
    verbosity: VerbosityLevel,
    output_mode: OutputMode,
    /// Scratch arena for tick lines, reset after each one
    scratch: RefCell<Bump>,
    journal: RefCell<Vec<LogEntry>>,
}

impl RunLogger {
    pub fn new() -> Self {
        Self::with_verbosity(VerbosityLevel::default())
    }

    pub fn with_verbosity(verbosity: VerbosityLevel) -> Self {
        RunLogger {
            verbosity,
            output_mode: OutputMode::default(),
            scratch: RefCell::new(Bump::new()),
            journal: RefCell::new(Vec::new()),
        }
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: VerbosityLevel) {
        self.verbosity = verbosity;
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    pub fn set_output_mode(&mut self, mode: OutputMode) {
        self.output_mode = mode;
    }

    fn journaling(&self) -> bool {
        matches!(self.output_mode, OutputMode::Memory | OutputMode::Both)
    }

    fn printing(&self) -> bool {
        matches!(self.output_mode, OutputMode::Stdout | OutputMode::Both)
    }

    /// Whether a message at `level` would go anywhere
    ///
    /// The journal keeps every level; stdout only what the verbosity allows.
    #[inline]
    pub fn enabled(&self, level: VerbosityLevel) -> bool {
        level != VerbosityLevel::Silent && (self.journaling() || level <= self.verbosity)
    }

    /// Journaled entries, oldest first
    pub fn entries(&self) -> Ref<'_, [LogEntry]> {
        Ref::map(self.journal.borrow(), |v| v.as_slice())
    }

    /// Number of journaled entries in `category`
    pub fn count(&self, category: LogCategory) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|e| e.category == category)
            .count()
    }

    pub fn clear(&mut self) {
        self.journal.get_mut().clear();
        self.scratch.get_mut().reset();
    }

    fn emit(&self, level: VerbosityLevel, category: LogCategory, tick: Option<Tick>, message: &str) {
        if self.journaling() {
            self.journal.borrow_mut().push(LogEntry {
                level,
                category,
                tick,
                message: message.to_string(),
            });
        }
        if self.printing() && level <= self.verbosity {
            match level {
                VerbosityLevel::Minimal => println!("{}", message),
                _ => println!("  {}", message),
            }
        }
    }

    #[inline]
    pub fn minimal(&self, message: &str) {
        if self.enabled(VerbosityLevel::Minimal) {
            self.emit(VerbosityLevel::Minimal, LogCategory::Run, None, message);
        }
    }

    #[inline]
    pub fn normal(&self, message: &str) {
        if self.enabled(VerbosityLevel::Normal) {
            self.emit(VerbosityLevel::Normal, LogCategory::Run, None, message);
        }
    }

    /// Log a per-tick line, formatted in the scratch arena
    pub fn tick_event(
        &self,
        level: VerbosityLevel,
        category: LogCategory,
        tick: Tick,
        args: fmt::Arguments<'_>,
    ) {
        if !self.enabled(level) {
            return;
        }
        {
            let bump = self.scratch.borrow();
            let mut line = bumpalo::collections::String::new_in(&bump);
            // Writing into a bump string cannot fail
            let _ = write!(line, "[{:>6}] {}", tick, args);
            self.emit(level, category, Some(tick), &line);
        }
        self.scratch.borrow_mut().reset();
    }
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLogger")
            .field("verbosity", &self.verbosity)
            .field("output_mode", &self.output_mode)
            .field("entries", &self.journal.borrow().len())
            .finish()
    }
}
