//! Deterministic state hashing
//!
//! A snapshot is serialized to canonical JSON and hashed with FxHasher, whose
//! output does not depend on a per-process random key. Two runs, or a run and
//! its replay, are in the same state exactly when their hashes agree.

use crate::game::snapshot::WorldSnapshot;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Compute a deterministic hash of a world snapshot
pub fn compute_state_hash(snapshot: &WorldSnapshot) -> u64 {
    let canonical = match serde_json::to_string(snapshot) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Warning: Failed to serialize snapshot for hashing: {}", e);
            return 0;
        }
    };

    let mut hasher = FxHasher::default();
    canonical.hash(&mut hasher);
    hasher.finish()
}

/// Format a hash for display (first 16 hex chars)
pub fn format_hash(hash: u64) -> String {
    format!("{:016x}", hash)
}
