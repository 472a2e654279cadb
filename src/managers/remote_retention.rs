//! Remote retention - keep only the newest object in a Drive folder
//!
//! Nothing here can fail a job. A folder that cannot be listed, or an object
//! that cannot be deleted, is reported as a [`RetentionWarning`].

use super::retention::{self, RetentionDomain, RetentionOutcome, RetentionWarning};
use crate::utils::{DeleteOutcome, RemoteObject, RemoteStore};
use std::time::Duration;
use tracing::{debug, info, warn};

struct RemoteDomain<'a> {
    store: &'a dyn RemoteStore,
}

impl RetentionDomain for RemoteDomain<'_> {
    type Scope = str;
    type Item = RemoteObject;

    fn list(&self, folder_id: &str) -> anyhow::Result<Vec<RemoteObject>> {
        self.store.list_objects(folder_id)
    }

    fn delete(&self, object: &RemoteObject) -> anyhow::Result<()> {
        match self.store.delete(&object.id)? {
            DeleteOutcome::Deleted => {}
            DeleteOutcome::NotFound => debug!("Object {} was already gone", object.id),
        }
        Ok(())
    }
}

pub struct RemoteRetentionManager<'a> {
    store: &'a dyn RemoteStore,
    settle_delay: Duration,
}

impl<'a> RemoteRetentionManager<'a> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            settle_delay: Duration::ZERO,
        }
    }

    /// Wait this long before listing, so a fresh upload shows up in the listing
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Keep the newest object in `folder_id`, delete the others
    ///
    /// An empty folder yields `kept: None` and no deletions.
    pub fn retain_latest(&self, folder_id: &str) -> RetentionOutcome<RemoteObject> {
        if !self.settle_delay.is_zero() {
            debug!("Waiting {:?} before listing folder {}", self.settle_delay, folder_id);
            std::thread::sleep(self.settle_delay);
        }

        let domain = RemoteDomain { store: self.store };
        match retention::retain_latest(&domain, folder_id) {
            Ok(outcome) => {
                if outcome.kept.is_none() {
                    info!("No files found in remote folder {}", folder_id);
                }
                outcome
            }
            Err(e) => {
                warn!("Failed to list remote folder {}: {:#}", folder_id, e);
                let mut outcome = RetentionOutcome::empty();
                outcome
                    .warnings
                    .push(RetentionWarning::new(format!("folder {}", folder_id), format!("{:#}", e)));
                outcome
            }
        }
    }
}
