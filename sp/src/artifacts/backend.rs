//! Key-to-bytes storage behind the artifact store

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::ArtifactError;

/// Metadata for one stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Flat key-to-bytes storage
///
/// Keys are validated by the artifact store before they reach a backend.
/// `put` never overwrites: an existing key is an error.
pub trait ArtifactBackend: Send + Sync {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError>;

    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError>;

    fn list(&self) -> Result<Vec<ObjectMeta>, ArtifactError>;

    fn delete(&self, key: &str) -> Result<(), ArtifactError>;
}

/// Backend storing each artifact as a file in one directory
pub struct FsBackend {
    dir: PathBuf,
}

impl FsBackend {
    /// Open or create the artifact directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(?dir, "FsBackend::open: opened artifact directory");
        Ok(Self { dir })
    }
}

fn not_found(key: &str) -> impl FnOnce(std::io::Error) -> ArtifactError {
    move |e| {
        if e.kind() == ErrorKind::NotFound {
            ArtifactError::NotFound(key.to_string())
        } else {
            ArtifactError::Io(e)
        }
    }
}

impl ArtifactBackend for FsBackend {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let path = self.dir.join(key);
        debug!(?path, size = bytes.len(), "FsBackend::put: called");
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    ArtifactError::AlreadyExists(key.to_string())
                } else {
                    ArtifactError::Io(e)
                }
            })?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        fs::read(self.dir.join(key)).map_err(not_found(key))
    }

    fn list(&self) -> Result<Vec<ObjectMeta>, ArtifactError> {
        let mut objects = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(key) = entry.file_name().to_str().map(str::to_string) else {
                debug!(path = ?entry.path(), "FsBackend::list: skipping non-UTF-8 file name");
                continue;
            };
            let modified = metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now());
            objects.push(ObjectMeta {
                key,
                size: metadata.len(),
                modified,
            });
        }
        Ok(objects)
    }

    fn delete(&self, key: &str) -> Result<(), ArtifactError> {
        fs::remove_file(self.dir.join(key)).map_err(not_found(key))
    }
}

/// In-memory backend for tests
#[derive(Default)]
pub struct MemoryBackend {
    objects: Mutex<BTreeMap<String, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, (Vec<u8>, DateTime<Utc>)>> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ArtifactBackend for MemoryBackend {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let mut objects = self.objects();
        if objects.contains_key(key) {
            return Err(ArtifactError::AlreadyExists(key.to_string()));
        }
        objects.insert(key.to_string(), (bytes.to_vec(), Utc::now()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, ArtifactError> {
        self.objects()
            .get(key)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| ArtifactError::NotFound(key.to_string()))
    }

    fn list(&self) -> Result<Vec<ObjectMeta>, ArtifactError> {
        Ok(self
            .objects()
            .iter()
            .map(|(key, (bytes, modified))| ObjectMeta {
                key: key.clone(),
                size: bytes.len() as u64,
                modified: *modified,
            })
            .collect())
    }

    fn delete(&self, key: &str) -> Result<(), ArtifactError> {
        self.objects()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ArtifactError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(backend: &dyn ArtifactBackend) {
        backend.put("a.txt", b"alpha").unwrap();
        assert!(matches!(backend.put("a.txt", b"again"), Err(ArtifactError::AlreadyExists(_))));
        assert_eq!(backend.get("a.txt").unwrap(), b"alpha");

        let listed = backend.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "a.txt");
        assert_eq!(listed[0].size, 5);

        backend.delete("a.txt").unwrap();
        assert!(matches!(backend.get("a.txt"), Err(ArtifactError::NotFound(_))));
        assert!(matches!(backend.delete("a.txt"), Err(ArtifactError::NotFound(_))));
    }

    #[test]
    fn test_fs_backend() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::open(temp.path().join("debug")).unwrap();
        exercise(&backend);
    }

    #[test]
    fn test_fs_backend_ignores_directories() {
        let temp = TempDir::new().unwrap();
        let backend = FsBackend::open(temp.path()).unwrap();
        fs::create_dir(temp.path().join("subdir")).unwrap();
        backend.put("x.json", b"{}").unwrap();
        let keys: Vec<_> = backend.list().unwrap().into_iter().map(|o| o.key).collect();
        assert_eq!(keys, vec!["x.json".to_string()]);
    }

    #[test]
    fn test_memory_backend() {
        exercise(&MemoryBackend::new());
    }
}
