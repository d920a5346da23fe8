//! Debug artifacts
//!
//! Every pipeline attempt leaves its prompt, raw response and any error
//! behind as a named file so operators can inspect failures after the fact.
//!
//! # Layout
//!
//! ```text
//! {artifacts.dir}/
//! ├── 20261019T101500.123456Z-000001-prompt.txt
//! ├── 20261019T101512.004211Z-000002-response.txt
//! ├── 20261019T101512.010932Z-000003-error.json
//! └── 20261019T101540.551002Z-000006-local_plan.json
//! ```

mod backend;
mod error;
mod report;
mod store;

pub use backend::{ArtifactBackend, FsBackend, MemoryBackend, ObjectMeta};
pub use error::ArtifactError;
pub use report::ErrorReport;
pub use store::{ArtifactKind, DebugArtifact, DebugArtifactStore, validate_name};
