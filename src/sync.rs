use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::storage::{DocumentStore, StorageError, StoredDocument};

// Task and standard-task documents are namespaced per user; the project
// list is one document shared by everyone.
pub const PROJECTS_KEY: &str = "projects";

pub fn tasks_key(user: &str) -> String {
    format!("tasks/{user}")
}

pub fn standard_tasks_key(user: &str) -> String {
    format!("standard_tasks/{user}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied,
    Ignored,
}

// Tracks one collection document. Foreign updates are detected by the
// monotonic revision counter, never by comparing contents; a remote
// snapshot replaces the local collection wholesale when it is newer.
#[derive(Debug)]
pub struct SyncedDocument {
    key: String,
    revision: u64,
}

impl SyncedDocument {
    pub fn open<T: DeserializeOwned>(
        store: &impl DocumentStore,
        key: &str,
    ) -> Result<(Self, Vec<T>), StorageError> {
        match store.load(key) {
            Some(document) => {
                let items =
                    serde_json::from_value(document.data).map_err(StorageError::JsonDecode)?;
                Ok((
                    Self {
                        key: key.to_string(),
                        revision: document.revision,
                    },
                    items,
                ))
            }
            None => Ok((
                Self {
                    key: key.to_string(),
                    revision: 0,
                },
                Vec::new(),
            )),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn commit<T: Serialize>(
        &mut self,
        store: &mut impl DocumentStore,
        items: &[T],
    ) -> Result<(), StorageError> {
        let data = serde_json::to_value(items).map_err(StorageError::JsonEncode)?;
        let next = self.revision + 1;
        store.save(StoredDocument {
            key: self.key.clone(),
            revision: next,
            data,
        })?;
        self.revision = next;
        Ok(())
    }

    pub fn apply_remote<T: DeserializeOwned>(
        &mut self,
        remote: &StoredDocument,
        items: &mut Vec<T>,
    ) -> Result<RemoteOutcome, StorageError> {
        if remote.key != self.key || remote.revision <= self.revision {
            return Ok(RemoteOutcome::Ignored);
        }
        *items = serde_json::from_value(remote.data.clone()).map_err(StorageError::JsonDecode)?;
        self.revision = remote.revision;
        Ok(RemoteOutcome::Applied)
    }
}
