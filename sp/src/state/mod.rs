//! Generation status tracking
//!
//! [`GenerationStateMachine`] holds the rules; [`StatusHandle`] runs one
//! machine per session inside an actor that persists every change so a
//! reloaded client picks up where it left off.

mod machine;
mod messages;
mod progress;
mod snapshot;
mod tracker;

pub use machine::{GenerationStateMachine, MAX_IN_FLIGHT_PROGRESS, STALE_MESSAGE};
pub use messages::{StateError, StateResponse, StatusCommand};
pub use progress::{estimate_progress, spawn_progress_ticker};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use tracker::StatusHandle;
