//! Remote object-store abstraction
//!
//! The orchestrator and remote retention only see this trait; the Google
//! Drive client in [`super::drive`] is the production implementation.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// An object stored in a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Opaque id assigned by the store
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub folder_id: String,
}

/// Result of deleting a remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object was already gone
    NotFound,
}

pub trait RemoteStore: Send + Sync {
    /// All live (non-trashed) objects whose parent is `folder_id`
    fn list_objects(&self, folder_id: &str) -> Result<Vec<RemoteObject>>;

    /// Upload a local file into `folder_id`, returning the created object
    fn upload(&self, folder_id: &str, local_path: &Path) -> Result<RemoteObject>;

    fn delete(&self, object_id: &str) -> Result<DeleteOutcome>;
}

/// Mock implementation for testing
/// Available for use in external test crates
pub mod mock {
    use super::*;
    use chrono::Duration;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Recorded operation call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RemoteCall {
        List { folder_id: String },
        Upload { folder_id: String, path: PathBuf },
        Delete { object_id: String },
    }

    /// In-memory remote store
    ///
    /// Folders keep objects in listing order. Uploaded objects get a
    /// timestamp one second after the newest object already in the store.
    #[derive(Clone, Default)]
    pub struct MockRemoteStore {
        /// Recorded operation calls
        pub calls: Arc<Mutex<Vec<RemoteCall>>>,
        folders: Arc<Mutex<HashMap<String, Vec<RemoteObject>>>>,
        next_id: Arc<Mutex<u64>>,
        should_fail_upload: Arc<Mutex<bool>>,
        /// Number of upcoming `list_objects` calls that fail
        failing_lists: Arc<Mutex<usize>>,
        failing_deletes: Arc<Mutex<HashSet<String>>>,
    }

    impl MockRemoteStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a folder with existing objects (kept in the given order)
        pub fn with_objects(self, folder_id: &str, objects: Vec<RemoteObject>) -> Self {
            self.folders
                .lock()
                .unwrap()
                .entry(folder_id.to_string())
                .or_default()
                .extend(objects);
            self
        }

        /// Configure upload to fail
        pub fn with_failing_upload(self) -> Self {
            *self.should_fail_upload.lock().unwrap() = true;
            self
        }

        /// Configure every listing to fail
        pub fn with_failing_list(self) -> Self {
            *self.failing_lists.lock().unwrap() = usize::MAX;
            self
        }

        /// Configure the next `count` listings to fail
        pub fn with_failing_lists(self, count: usize) -> Self {
            *self.failing_lists.lock().unwrap() = count;
            self
        }

        /// Configure deletion of a specific object to fail
        pub fn with_failing_delete(self, object_id: &str) -> Self {
            self.failing_deletes
                .lock()
                .unwrap()
                .insert(object_id.to_string());
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<RemoteCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Objects currently in a folder, in listing order
        pub fn objects(&self, folder_id: &str) -> Vec<RemoteObject> {
            self.folders
                .lock()
                .unwrap()
                .get(folder_id)
                .cloned()
                .unwrap_or_default()
        }

        pub fn upload_called(&self) -> bool {
            self.upload_count() > 0
        }

        pub fn upload_count(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| matches!(c, RemoteCall::Upload { .. }))
                .count()
        }

        /// Ids passed to `delete`, in call order
        pub fn deleted_ids(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter_map(|c| match c {
                    RemoteCall::Delete { object_id } => Some(object_id.clone()),
                    _ => None,
                })
                .collect()
        }

        fn record_call(&self, call: RemoteCall) {
            self.calls.lock().unwrap().push(call);
        }

        fn next_timestamp(&self) -> DateTime<Utc> {
            self.folders
                .lock()
                .unwrap()
                .values()
                .flatten()
                .map(|o| o.created_at)
                .max()
                .map(|newest| newest + Duration::seconds(1))
                .unwrap_or_else(Utc::now)
        }
    }

    impl RemoteStore for MockRemoteStore {
        fn list_objects(&self, folder_id: &str) -> Result<Vec<RemoteObject>> {
            self.record_call(RemoteCall::List {
                folder_id: folder_id.to_string(),
            });
            {
                let mut failing = self.failing_lists.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    anyhow::bail!("Mock list failure: connection reset by peer");
                }
            }
            Ok(self.objects(folder_id))
        }

        fn upload(&self, folder_id: &str, local_path: &Path) -> Result<RemoteObject> {
            self.record_call(RemoteCall::Upload {
                folder_id: folder_id.to_string(),
                path: local_path.to_path_buf(),
            });
            if *self.should_fail_upload.lock().unwrap() {
                anyhow::bail!("Mock upload failure");
            }

            let id = {
                let mut next = self.next_id.lock().unwrap();
                *next += 1;
                format!("uploaded-{}", *next)
            };
            let object = RemoteObject {
                id,
                name: local_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
                created_at: self.next_timestamp(),
                folder_id: folder_id.to_string(),
            };
            self.folders
                .lock()
                .unwrap()
                .entry(folder_id.to_string())
                .or_default()
                .push(object.clone());
            Ok(object)
        }

        fn delete(&self, object_id: &str) -> Result<DeleteOutcome> {
            self.record_call(RemoteCall::Delete {
                object_id: object_id.to_string(),
            });
            if self.failing_deletes.lock().unwrap().contains(object_id) {
                anyhow::bail!("Mock delete failure for {}", object_id);
            }

            let mut folders = self.folders.lock().unwrap();
            for objects in folders.values_mut() {
                if let Some(pos) = objects.iter().position(|o| o.id == object_id) {
                    objects.remove(pos);
                    return Ok(DeleteOutcome::Deleted);
                }
            }
            Ok(DeleteOutcome::NotFound)
        }
    }
}
