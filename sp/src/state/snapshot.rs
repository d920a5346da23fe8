//! Persisted generation snapshots
//!
//! A snapshot is the serialized [`GenerationRequest`]; an idle session has no
//! snapshot at all.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::StateError;
use crate::artifacts::validate_name;
use crate::domain::GenerationRequest;

/// Durable home for one session's snapshot
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Option<GenerationRequest>, StateError>;

    fn save(&self, request: &GenerationRequest) -> Result<(), StateError>;

    fn clear(&self) -> Result<(), StateError>;
}

/// One JSON file per session
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `{dir}/{session}.json`, rejecting session names that are not plain filenames
    pub fn for_session(dir: impl AsRef<Path>, session: &str) -> Result<Self, StateError> {
        validate_name(session).map_err(|e| StateError::Snapshot(e.to_string()))?;
        Ok(Self::new(dir.as_ref().join(format!("{session}.json"))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<GenerationRequest>, StateError> {
        debug!(path = %self.path.display(), "FileSnapshotStore::load: called");
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::Snapshot(format!("{}: {e}", self.path.display()))),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StateError::Snapshot(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, request: &GenerationRequest) -> Result<(), StateError> {
        debug!(path = %self.path.display(), status = %request.status, "FileSnapshotStore::save: called");
        let snapshot_err = |e: std::io::Error| StateError::Snapshot(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(snapshot_err)?;
        }
        let json = serde_json::to_vec_pretty(request).map_err(|e| StateError::Snapshot(e.to_string()))?;

        // Write-then-rename so a crash never leaves a torn snapshot
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(snapshot_err)?;
        fs::rename(&tmp, &self.path).map_err(snapshot_err)
    }

    fn clear(&self) -> Result<(), StateError> {
        debug!(path = %self.path.display(), "FileSnapshotStore::clear: called");
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::Snapshot(format!("{}: {e}", self.path.display()))),
        }
    }
}

/// In-process snapshot, for tests
#[derive(Default)]
pub struct MemorySnapshotStore {
    slot: Mutex<Option<GenerationRequest>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(request: GenerationRequest) -> Self {
        Self {
            slot: Mutex::new(Some(request)),
        }
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Option<GenerationRequest>, StateError> {
        Ok(self.slot.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, request: &GenerationRequest) -> Result<(), StateError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = Some(request.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StateError> {
        *self.slot.lock().unwrap_or_else(|p| p.into_inner()) = None;
        Ok(())
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<GenerationRequest>, StateError> {
        (**self).load()
    }

    fn save(&self, request: &GenerationRequest) -> Result<(), StateError> {
        (**self).save(request)
    }

    fn clear(&self) -> Result<(), StateError> {
        (**self).clear()
    }
}
