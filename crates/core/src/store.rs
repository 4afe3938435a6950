//! Document collections.
//!
//! A [`Collection`] keeps its documents in memory behind a reader/writer lock and, when opened
//! on a directory, mirrors every write to one JSON file per document:
//!
//! ```text
//! <service_dir>/
//!   <collection>/
//!     <s1>/
//!       <s2>/
//!         <id>.json
//! ```
//!
//! Writes go through [`Collection::write`], which runs a closure against a [`WriteTxn`] while
//! the write lock is held. Uniqueness checks made inside the closure therefore see every
//! committed document and no concurrent writer can slip in between the check and the insert.
//! Staged changes are applied only when the closure returns `Ok`.

use crate::constants::DOCUMENT_EXTENSION;
use crate::{CoreError, CoreResult};
use healthcure_uuid::RecordId;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A value stored in a [`Collection`].
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Directory name of the collection.
    const COLLECTION: &'static str;

    fn id(&self) -> RecordId;
}

/// Staged writes against a collection, see [`Collection::write`].
pub struct WriteTxn<'a, T> {
    docs: &'a HashMap<RecordId, T>,
    puts: Vec<T>,
    removes: Vec<RecordId>,
}

impl<'a, T: Document> WriteTxn<'a, T> {
    /// Committed document with this id. Staged writes are not visible.
    pub fn get(&self, id: &RecordId) -> Option<&'a T> {
        self.docs.get(id)
    }

    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<&'a T> {
        self.docs.values().find(|doc| pred(doc))
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<&'a T> {
        self.docs.values().filter(|doc| pred(doc)).collect()
    }

    /// Stage an insert or full replacement.
    pub fn put(&mut self, doc: T) {
        self.puts.push(doc);
    }

    pub fn remove(&mut self, id: RecordId) {
        self.removes.push(id);
    }
}

pub struct Collection<T> {
    dir: Option<PathBuf>,
    docs: RwLock<HashMap<RecordId, T>>,
}

impl<T: Document> Collection<T> {
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            docs: RwLock::new(HashMap::new()),
        }
    }

    /// Opens (creating if needed) `service_dir/<COLLECTION>` and loads every stored document.
    ///
    /// Files that cannot be parsed are logged and skipped.
    pub fn open(service_dir: &Path) -> CoreResult<Self> {
        let dir = service_dir.join(T::COLLECTION);
        fs::create_dir_all(&dir).map_err(|source| CoreError::StorageDirCreation {
            path: dir.clone(),
            source,
        })?;

        let mut docs = HashMap::new();
        for path in document_files(&dir)? {
            let raw = fs::read_to_string(&path).map_err(|source| CoreError::FileRead {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str::<T>(&raw) {
                Ok(doc) => {
                    docs.insert(doc.id(), doc);
                }
                Err(e) => {
                    tracing::warn!("failed to parse {}: {}", path.display(), e);
                }
            }
        }

        tracing::debug!("loaded {} {} documents", docs.len(), T::COLLECTION);

        Ok(Self {
            dir: Some(dir),
            docs: RwLock::new(docs),
        })
    }

    /// Opens on disk when `service_dir` is set, otherwise in memory.
    pub fn open_or_memory(service_dir: Option<&Path>) -> CoreResult<Self> {
        match service_dir {
            Some(dir) => Self::open(dir),
            None => Ok(Self::in_memory()),
        }
    }

    pub fn get(&self, id: &RecordId) -> CoreResult<Option<T>> {
        let docs = self.read_lock()?;
        Ok(docs.get(id).cloned())
    }

    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> CoreResult<Option<T>> {
        let docs = self.read_lock()?;
        Ok(docs.values().find(|doc| pred(doc)).cloned())
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> CoreResult<Vec<T>> {
        let docs = self.read_lock()?;
        Ok(docs.values().filter(|doc| pred(doc)).cloned().collect())
    }

    pub fn count(&self, pred: impl Fn(&T) -> bool) -> CoreResult<usize> {
        let docs = self.read_lock()?;
        Ok(docs.values().filter(|doc| pred(doc)).count())
    }

    /// Runs `f` under the write lock and commits its staged changes if it succeeds.
    pub fn write<R>(&self, f: impl FnOnce(&mut WriteTxn<'_, T>) -> CoreResult<R>) -> CoreResult<R> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| CoreError::LockPoisoned(T::COLLECTION))?;

        let mut txn = WriteTxn {
            docs: &*docs,
            puts: Vec::new(),
            removes: Vec::new(),
        };
        let result = f(&mut txn)?;
        let WriteTxn { puts, removes, .. } = txn;

        for doc in puts {
            self.persist(&doc)?;
            docs.insert(doc.id(), doc);
        }
        for id in removes {
            self.unlink(&id)?;
            docs.remove(&id);
        }

        Ok(result)
    }

    pub fn insert(&self, doc: T) -> CoreResult<T> {
        self.write(|txn| {
            txn.put(doc.clone());
            Ok(doc)
        })
    }

    /// Applies `f` to a copy of the document and stores the result.
    pub fn update(
        &self,
        id: &RecordId,
        not_found: &'static str,
        f: impl FnOnce(&mut T) -> CoreResult<()>,
    ) -> CoreResult<T> {
        self.write(|txn| {
            let mut doc = txn.get(id).cloned().ok_or(CoreError::NotFound(not_found))?;
            f(&mut doc)?;
            txn.put(doc.clone());
            Ok(doc)
        })
    }

    /// Removes a document, returning it if it existed.
    pub fn remove(&self, id: &RecordId) -> CoreResult<Option<T>> {
        self.write(|txn| {
            let existing = txn.get(id).cloned();
            if existing.is_some() {
                txn.remove(*id);
            }
            Ok(existing)
        })
    }

    fn read_lock(&self) -> CoreResult<std::sync::RwLockReadGuard<'_, HashMap<RecordId, T>>> {
        self.docs
            .read()
            .map_err(|_| CoreError::LockPoisoned(T::COLLECTION))
    }

    fn persist(&self, doc: &T) -> CoreResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let path = doc.id().sharded_file(dir, DOCUMENT_EXTENSION);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CoreError::StorageDirCreation {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let raw = serde_json::to_vec_pretty(doc).map_err(CoreError::Serialization)?;

        // Write-then-rename so a crash never leaves a half-written document behind.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|source| CoreError::FileWrite {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| CoreError::FileWrite {
            path: path.clone(),
            source,
        })
    }

    fn unlink(&self, id: &RecordId) -> CoreResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let path = id.sharded_file(dir, DOCUMENT_EXTENSION);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoreError::FileRemove { path, source }),
        }
    }
}

/// Lists `dir/<s1>/<s2>/*.json`.
fn document_files(dir: &Path) -> CoreResult<Vec<PathBuf>> {
    fn subdirs(path: &Path) -> CoreResult<Vec<PathBuf>> {
        let entries = fs::read_dir(path).map_err(|source| CoreError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_dir())
            .collect())
    }

    let mut files = Vec::new();
    for s1 in subdirs(dir)? {
        for s2 in subdirs(&s1)? {
            let entries = fs::read_dir(&s2).map_err(|source| CoreError::FileRead {
                path: s2.clone(),
                source,
            })?;
            files.extend(entries.flatten().map(|entry| entry.path()).filter(|p| {
                p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
            }));
        }
    }
    Ok(files)
}
