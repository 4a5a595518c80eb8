//! Core functionality module
//!
//! Contains path filtering, file snapshots, and state tracking

pub mod events;
pub mod filter;
pub mod state;
pub mod tracker;

// Re-export main types
pub use events::{AppEvent, EventKind, FileEvent, IgnoreReason, Outcome};
pub use filter::{PatternMatcher, EXCLUDED_SUBSTRING};
pub use state::{ContentHash, FileState, BLOCK_SIZE};
pub use tracker::{FileStateTracker, StateReader};
