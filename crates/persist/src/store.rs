//! Storage collaborators.
//!
//! The writer never touches the filesystem or a key/value store directly; it
//! goes through these traits so hosts can plug in whatever storage they run
//! on. Two families of backends ship here:
//!
//! - [`LocalFileStore`]: the real filesystem, atomic replace via a sibling
//!   temp file
//! - `InMemory*`: lock-guarded maps, for tests and dry runs
//!
//! All backends are `Send + Sync`. The manifest in particular is shared by
//! every pipeline of a batch, so appends are serialized behind a mutex.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::DirBuilder;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::PersistError;

/// Filesystem operations the writer needs.
pub trait FileStore: Send + Sync {
    /// Whether anything exists at `path`.
    fn exists(&self, path: &Path) -> bool;
    /// Create `path` (and missing parents) with the given permission mode.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<(), PersistError>;
    /// Write `content` to `path`, superseding any existing file atomically.
    fn write_replace(&self, path: &Path, content: &[u8]) -> Result<(), PersistError>;
    /// Remove the file at `path`. A missing file is not an error.
    fn delete(&self, path: &Path) -> Result<(), PersistError>;
}

/// Key/value store for template metadata, keyed by template stem.
pub trait MetadataStore: Send + Sync {
    fn set(&self, key: &str, metadata: &Map<String, Value>) -> Result<(), PersistError>;
    fn get(&self, key: &str) -> Result<Option<Map<String, Value>>, PersistError>;
}

/// Append-only list store for staged template paths.
pub trait ManifestStore: Send + Sync {
    fn append(&self, key: &str, path: &Path) -> Result<(), PersistError>;
    fn entries(&self, key: &str) -> Result<Vec<PathBuf>, PersistError>;
}

/// Permission bits of templates written by [`LocalFileStore`].
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// [`FileStore`] over the local filesystem.
#[derive(Debug, Clone, Copy)]
pub struct LocalFileStore {
    file_mode: u32,
}

impl Default for LocalFileStore {
    fn default() -> Self {
        Self {
            file_mode: DEFAULT_FILE_MODE,
        }
    }
}

impl LocalFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode applied to every written file; the staging temp file starts
    /// out owner-only.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }
}

impl FileStore for LocalFileStore {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<(), PersistError> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(path).map_err(|err| PersistError::CreateDir {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    fn write_replace(&self, path: &Path, content: &[u8]) -> Result<(), PersistError> {
        let write_err = |reason: String| PersistError::Write {
            path: path.to_path_buf(),
            reason,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(parent).map_err(|err| write_err(err.to_string()))?;
        staged
            .write_all(content)
            .and_then(|()| staged.flush())
            .map_err(|err| write_err(err.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            staged
                .as_file()
                .set_permissions(std::fs::Permissions::from_mode(self.file_mode))
                .map_err(|err| write_err(err.to_string()))?;
        }
        staged
            .persist(path)
            .map_err(|err| write_err(err.error.to_string()))?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), PersistError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistError::Delete {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }),
        }
    }
}

/// In-memory [`FileStore`]. Writes fail unless the parent directory was
/// created first, like a real filesystem.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    state: RwLock<FsState>,
}

#[derive(Debug, Default)]
struct FsState {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store in which `dirs` already exist.
    pub fn with_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            state.dirs.extend(dirs.into_iter().map(Into::into));
        }
        store
    }

    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.files.get(path).cloned())
    }

    /// Every file path currently stored, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state
            .read()
            .map(|state| state.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl FileStore for InMemoryFileStore {
    fn exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .map(|state| state.dirs.contains(path) || state.files.contains_key(path))
            .unwrap_or(false)
    }

    fn create_dir(&self, path: &Path, _mode: u32) -> Result<(), PersistError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PersistError::backend("poisoned lock"))?;
        for ancestor in path.ancestors() {
            if !ancestor.as_os_str().is_empty() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        Ok(())
    }

    fn write_replace(&self, path: &Path, content: &[u8]) -> Result<(), PersistError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PersistError::backend("poisoned lock"))?;
        let parent_ok = path
            .parent()
            .is_some_and(|parent| state.dirs.contains(parent));
        if !parent_ok {
            return Err(PersistError::Write {
                path: path.to_path_buf(),
                reason: "no such directory".into(),
            });
        }
        state.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<(), PersistError> {
        self.state
            .write()
            .map_err(|_| PersistError::backend("poisoned lock"))?
            .files
            .remove(path);
        Ok(())
    }
}

/// In-memory [`MetadataStore`].
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    records: RwLock<BTreeMap<String, Map<String, Value>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored record, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, Map<String, Value>> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn set(&self, key: &str, metadata: &Map<String, Value>) -> Result<(), PersistError> {
        self.records
            .write()
            .map_err(|_| PersistError::backend("poisoned lock"))?
            .insert(key.to_string(), metadata.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Map<String, Value>>, PersistError> {
        let guard = self
            .records
            .read()
            .map_err(|_| PersistError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }
}

/// In-memory [`ManifestStore`]; appends from any thread are serialized.
#[derive(Debug, Default)]
pub struct InMemoryManifest {
    lists: Mutex<BTreeMap<String, Vec<PathBuf>>>,
}

impl InMemoryManifest {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManifestStore for InMemoryManifest {
    fn append(&self, key: &str, path: &Path) -> Result<(), PersistError> {
        self.lists
            .lock()
            .map_err(|_| PersistError::backend("poisoned lock"))?
            .entry(key.to_string())
            .or_default()
            .push(path.to_path_buf());
        Ok(())
    }

    fn entries(&self, key: &str) -> Result<Vec<PathBuf>, PersistError> {
        let guard = self
            .lists
            .lock()
            .map_err(|_| PersistError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn local_store_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new();
        let path = dir.path().join("a.html.twig");

        store.write_replace(&path, b"first version").expect("write");
        store.write_replace(&path, b"v2").expect("rewrite");
        assert_eq!(std::fs::read(&path).expect("read"), b"v2");
    }

    #[cfg(unix)]
    #[test]
    fn local_store_writes_world_readable_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.html.twig");
        let mode = |path: &Path| {
            std::fs::metadata(path)
                .expect("metadata")
                .permissions()
                .mode()
                & 0o777
        };

        LocalFileStore::new().write_replace(&path, b"x").expect("write");
        assert_eq!(mode(&path), DEFAULT_FILE_MODE);

        LocalFileStore::new()
            .with_file_mode(0o640)
            .write_replace(&path, b"y")
            .expect("rewrite");
        assert_eq!(mode(&path), 0o640);
    }

    #[test]
    fn local_store_creates_nested_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new();
        let nested = dir.path().join("cohesion").join("templates");
        assert!(!store.exists(&nested));
        store.create_dir(&nested, 0o777).expect("mkdir");
        assert!(store.exists(&nested));
    }

    #[test]
    fn local_store_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new();
        let path = dir.path().join("missing").join("a.html.twig");
        assert!(matches!(
            store.write_replace(&path, b"x"),
            Err(PersistError::Write { .. })
        ));
    }

    #[test]
    fn local_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalFileStore::new();
        let path = dir.path().join("gone.html.twig");
        store.write_replace(&path, b"x").expect("write");
        store.delete(&path).expect("delete");
        store.delete(&path).expect("delete again");
        assert!(!store.exists(&path));
    }

    #[test]
    fn in_memory_store_requires_parent_dir() {
        let store = InMemoryFileStore::new();
        let path = Path::new("/templates/a.html.twig");
        assert!(store.write_replace(path, b"x").is_err());

        store.create_dir(Path::new("/templates"), 0o777).expect("mkdir");
        store.write_replace(path, b"x").expect("write");
        assert_eq!(store.read(path), Some(b"x".to_vec()));
        assert_eq!(store.paths(), vec![path.to_path_buf()]);
    }

    #[test]
    fn metadata_round_trips_by_key() {
        let store = InMemoryMetadataStore::new();
        let meta = json!({"filename": "a"}).as_object().cloned().expect("object");
        store.set("a", &meta).expect("set");
        assert_eq!(store.get("a").expect("get"), Some(meta));
        assert_eq!(store.get("b").expect("get"), None);
    }

    #[test]
    fn manifest_appends_per_key() {
        let manifest = InMemoryManifest::new();
        manifest.append("k", Path::new("/tmp/a")).expect("append");
        manifest.append("k", Path::new("/tmp/a")).expect("append duplicate");
        manifest.append("other", Path::new("/tmp/b")).expect("append");
        assert_eq!(manifest.entries("k").expect("entries").len(), 2);
        assert!(manifest.entries("missing").expect("entries").is_empty());
    }
}
