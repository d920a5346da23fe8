//! DebugArtifactStore - append-only named artifacts
//!
//! Filenames are generated here, never taken from the pipeline, and carry a
//! UTC timestamp plus a per-store counter so concurrent writers cannot
//! collide. Operators read and delete by filename; those names are checked
//! against path traversal before reaching the backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ArtifactBackend, ArtifactError, FsBackend, MemoryBackend};

const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";

/// Attempts to find a free name before giving up
const MAX_NAME_ATTEMPTS: u32 = 16;

/// What an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Prompt,
    Response,
    Error,
    LocalPlan,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [Self::Prompt, Self::Response, Self::Error, Self::LocalPlan];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
            Self::Error => "error",
            Self::LocalPlan => "local_plan",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Prompt | Self::Response => "txt",
            Self::Error | Self::LocalPlan => "json",
        }
    }

    /// Infer the kind from a filename by substring match
    pub fn from_filename(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| name.contains(kind.as_str()))
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown artifact kind {s:?} (expected prompt, response, error or local_plan)"))
    }
}

/// Listing row for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugArtifact {
    pub id: String,
    #[serde(rename = "name")]
    pub filename: String,
    #[serde(rename = "type")]
    pub kind: Option<ArtifactKind>,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "created")]
    pub created_at: DateTime<Utc>,
}

/// Reject names that could escape the artifact directory
pub fn validate_name(name: &str) -> Result<(), ArtifactError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains('\0')
        || name.split(['/', '\\']).any(|segment| segment == "..")
        || name.contains(['/', '\\']);
    if invalid {
        debug!(%name, "validate_name: rejected");
        return Err(ArtifactError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Timestamp encoded in a generated filename, if it has one
fn timestamp_from_name(name: &str) -> Option<DateTime<Utc>> {
    let prefix = name.split('-').next()?;
    NaiveDateTime::parse_from_str(prefix, TIMESTAMP_PARSE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn id_from_name(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
        .to_string()
}

/// Append-only store of debug artifacts
pub struct DebugArtifactStore {
    backend: Box<dyn ArtifactBackend>,
    counter: Mutex<u64>,
}

impl DebugArtifactStore {
    pub fn new(backend: Box<dyn ArtifactBackend>) -> Self {
        Self {
            backend,
            counter: Mutex::new(0),
        }
    }

    /// Store backed by a directory
    pub fn open_dir(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        Ok(Self::new(Box::new(FsBackend::open(dir)?)))
    }

    /// Store backed by memory
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::new()))
    }

    /// Persist content under a freshly generated name
    pub fn write(&self, kind: ArtifactKind, content: &[u8]) -> Result<String, ArtifactError> {
        debug!(%kind, size = content.len(), "DebugArtifactStore::write: called");
        // Held across the backend write so names are assigned and claimed in order
        let mut counter = self.counter.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        for _ in 0..MAX_NAME_ATTEMPTS {
            *counter += 1;
            let filename = format!(
                "{}-{:06}-{}.{}",
                Utc::now().format(TIMESTAMP_FORMAT),
                *counter,
                kind.as_str(),
                kind.extension()
            );
            match self.backend.put(&filename, content) {
                Ok(()) => {
                    info!(%filename, size = content.len(), "Wrote debug artifact");
                    return Ok(filename);
                }
                Err(ArtifactError::AlreadyExists(_)) => {
                    debug!(%filename, "DebugArtifactStore::write: name taken, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ArtifactError::AlreadyExists(format!("no free {kind} artifact name")))
    }

    /// Persist a value as pretty-printed JSON
    pub fn write_json<T: Serialize>(&self, kind: ArtifactKind, value: &T) -> Result<String, ArtifactError> {
        let json = serde_json::to_vec_pretty(value)?;
        self.write(kind, &json)
    }

    /// Write on the blocking pool so async callers never stall a runtime worker
    pub async fn append(self: &Arc<Self>, kind: ArtifactKind, content: Vec<u8>) -> Result<String, ArtifactError> {
        let store = Arc::clone(self);
        tokio::task::spawn_blocking(move || store.write(kind, &content)).await?
    }

    pub async fn append_json<T: Serialize>(self: &Arc<Self>, kind: ArtifactKind, value: &T) -> Result<String, ArtifactError> {
        let json = serde_json::to_vec_pretty(value)?;
        self.append(kind, json).await
    }

    /// All artifacts, newest first
    pub fn list(&self) -> Result<Vec<DebugArtifact>, ArtifactError> {
        debug!("DebugArtifactStore::list: called");
        let mut artifacts: Vec<DebugArtifact> = self
            .backend
            .list()?
            .into_iter()
            .map(|meta| DebugArtifact {
                id: id_from_name(&meta.key),
                kind: ArtifactKind::from_filename(&meta.key),
                size_bytes: meta.size,
                created_at: timestamp_from_name(&meta.key).unwrap_or(meta.modified),
                filename: meta.key,
            })
            .collect();

        artifacts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(artifacts)
    }

    /// Raw content of an artifact
    pub fn read(&self, filename: &str) -> Result<Vec<u8>, ArtifactError> {
        debug!(%filename, "DebugArtifactStore::read: called");
        validate_name(filename)?;
        self.backend.get(filename)
    }

    /// Content of an artifact as text (lossy for non-UTF-8 bytes)
    pub fn read_to_string(&self, filename: &str) -> Result<String, ArtifactError> {
        Ok(String::from_utf8_lossy(&self.read(filename)?).into_owned())
    }

    /// Remove an artifact (operator action)
    pub fn delete(&self, filename: &str) -> Result<(), ArtifactError> {
        debug!(%filename, "DebugArtifactStore::delete: called");
        validate_name(filename)?;
        self.backend.delete(filename)?;
        info!(%filename, "Deleted debug artifact");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    #[test]
    fn test_write_generates_kind_named_files() {
        let store = DebugArtifactStore::in_memory();
        let prompt = store.write(ArtifactKind::Prompt, b"hello").unwrap();
        let plan = store.write_json(ArtifactKind::LocalPlan, &serde_json::json!({"a": 1})).unwrap();

        assert!(prompt.ends_with("-000001-prompt.txt"));
        assert!(plan.ends_with("-000002-local_plan.json"));
        assert_eq!(store.read_to_string(&prompt).unwrap(), "hello");
        assert!(timestamp_from_name(&prompt).is_some());
    }

    #[test]
    fn test_list_newest_first_with_inferred_kind() {
        let store = DebugArtifactStore::in_memory();
        let first = store.write(ArtifactKind::Prompt, b"p").unwrap();
        let second = store.write(ArtifactKind::Response, b"resp").unwrap();
        let third = store.write(ArtifactKind::Error, b"{}").unwrap();

        let listed = store.list().unwrap();
        let names: Vec<_> = listed.iter().map(|a| a.filename.clone()).collect();
        assert_eq!(names, vec![third, second, first]);
        assert_eq!(listed[0].kind, Some(ArtifactKind::Error));
        assert_eq!(listed[1].kind, Some(ArtifactKind::Response));
        assert_eq!(listed[1].size_bytes, 4);
        assert!(!listed[2].id.ends_with(".txt"));
    }

    #[test]
    fn test_listing_serializes_operator_fields() {
        let store = DebugArtifactStore::in_memory();
        store.write(ArtifactKind::LocalPlan, b"{}").unwrap();
        let json = serde_json::to_value(&store.list().unwrap()[0]).unwrap();
        assert_eq!(json["type"], "local_plan");
        assert_eq!(json["size"], 2);
        assert!(json["name"].as_str().unwrap().ends_with(".json"));
        assert!(json.get("id").is_some());
        assert!(json.get("created").is_some());
    }

    #[test]
    fn test_unknown_files_listed_without_kind() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("notes.md"), "operator notes").unwrap();
        let store = DebugArtifactStore::open_dir(temp.path()).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, None);
        assert_eq!(listed[0].id, "notes");
    }

    #[test]
    fn test_kind_from_filename() {
        assert_eq!(ArtifactKind::from_filename("x-prompt.txt"), Some(ArtifactKind::Prompt));
        assert_eq!(ArtifactKind::from_filename("x-local_plan.json"), Some(ArtifactKind::LocalPlan));
        assert_eq!(ArtifactKind::from_filename("debug_response_1.txt"), Some(ArtifactKind::Response));
        assert_eq!(ArtifactKind::from_filename("readme"), None);
        assert_eq!("error".parse::<ArtifactKind>(), Ok(ArtifactKind::Error));
        assert!("bogus".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let store = DebugArtifactStore::in_memory();
        for name in ["../etc/passwd", "..", "a/../../b", "..\\secret", "dir/file.txt", ""] {
            assert!(
                matches!(store.read(name), Err(ArtifactError::InvalidName(_))),
                "read should reject {name:?}"
            );
            assert!(
                matches!(store.delete(name), Err(ArtifactError::InvalidName(_))),
                "delete should reject {name:?}"
            );
        }
        assert!(validate_name("20261019T101500.123456Z-000001-prompt.txt").is_ok());
        assert!(validate_name("weird..name.txt").is_ok());
    }

    #[test]
    fn test_read_and_delete_missing() {
        let store = DebugArtifactStore::in_memory();
        assert!(matches!(store.read("nope.txt"), Err(ArtifactError::NotFound(_))));
        assert!(matches!(store.delete("nope.txt"), Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_delete_removes_from_listing() {
        let temp = TempDir::new().unwrap();
        let store = DebugArtifactStore::open_dir(temp.path()).unwrap();
        let name = store.write(ArtifactKind::Response, b"raw").unwrap();
        store.delete(&name).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_writes_never_collide() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(DebugArtifactStore::open_dir(temp.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    (0..25)
                        .map(|_| store.write(ArtifactKind::Response, b"x").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(names.insert(name));
            }
        }
        assert_eq!(names.len(), 200);
        assert_eq!(store.list().unwrap().len(), 200);
    }

    #[tokio::test]
    async fn test_append_from_async_tasks() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(DebugArtifactStore::open_dir(temp.path()).unwrap());

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.append(ArtifactKind::Prompt, format!("prompt {i}").into_bytes()).await })
            })
            .collect();
        let mut names = HashSet::new();
        for task in tasks {
            assert!(names.insert(task.await.unwrap().unwrap()));
        }

        let report = serde_json::json!({ "stage": "llm" });
        let name = store.append_json(ArtifactKind::Error, &report).await.unwrap();
        assert!(name.ends_with("-error.json"));
        assert_eq!(store.list().unwrap().len(), 11);
    }
}
