//! Entities, spawning and the simulation loop

pub mod combat;
pub mod controller;
pub mod director;
pub mod driver;
pub mod entity;
pub mod game_loop;
pub mod logger;
pub mod random_controller;
pub mod run;
pub mod scripted_controller;
pub mod snapshot;
pub mod spawner;
pub mod state_hash;
pub mod zero_controller;

pub use combat::{CombatReport, CombatResolver, ContactDamage, NoCombat};
pub use controller::{InputController, InputView, PlayerInput};
pub use director::{EchoMeter, SpawnDirector, SpawnOrder};
pub use driver::Driver;
pub use entity::{CloneVariant, DespawnReason, Entity, EntityKind, EntityStatus, MutationKind};
pub use game_loop::{GameLoop, RunEndReason, RunSummary};
pub use logger::{LogCategory, LogEntry, OutputMode, RunLogger, VerbosityLevel};
pub use random_controller::RandomController;
pub use run::{Pilot, Run, TickReport};
pub use scripted_controller::{ScriptStep, ScriptedController};
pub use snapshot::{
    EntitySnapshot, LifecycleEvent, RunRecord, SpawnRecord, SpawnSource, WorldSnapshot,
    RECORD_VERSION,
};
pub use spawner::{CloneKind, CloneSpawner};
pub use state_hash::{compute_state_hash, format_hash};
pub use zero_controller::IdleController;
