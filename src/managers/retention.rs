//! Retain-latest-by-timestamp
//!
//! One routine serves both storage domains: list the candidates in a scope,
//! keep the newest, delete the rest. Individual deletion failures never abort
//! the pass; they are collected as [`RetentionWarning`]s next to the result.

use crate::utils::{LocalArtifact, RemoteObject};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, info, warn};

/// Something retention can order by age
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;

    /// Human-readable identity used in logs and warnings
    fn label(&self) -> String;

    /// Ordering between items with equal timestamps; the greater item wins.
    /// `Equal` keeps listing order, so the first listed item wins.
    fn tie_break(&self, _other: &Self) -> Ordering {
        Ordering::Equal
    }
}

/// The list/delete capability pair retention runs against
pub trait RetentionDomain {
    type Scope: ?Sized;
    type Item: Timestamped + Clone;

    fn list(&self, scope: &Self::Scope) -> Result<Vec<Self::Item>>;

    fn delete(&self, item: &Self::Item) -> Result<()>;
}

/// A cleanup step that failed without failing the job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionWarning {
    /// Path, object id or folder the failure concerns
    pub target: String,
    pub cause: String,
}

impl RetentionWarning {
    pub fn new(target: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            target: target.into(),
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for RetentionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.cause)
    }
}

/// Result of one retention pass
#[derive(Debug, Clone)]
pub struct RetentionOutcome<T> {
    /// The newest item; `None` when the scope was empty
    pub kept: Option<T>,
    pub removed: Vec<T>,
    pub warnings: Vec<RetentionWarning>,
}

impl<T> RetentionOutcome<T> {
    pub fn empty() -> Self {
        Self {
            kept: None,
            removed: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Index of the newest item, honoring [`Timestamped::tie_break`]
pub fn select_latest<T: Timestamped>(items: &[T]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, item) in items.iter().enumerate() {
        best = match best {
            None => Some(index),
            Some(current) => {
                let incumbent = &items[current];
                let order = item
                    .created_at()
                    .cmp(&incumbent.created_at())
                    .then_with(|| item.tie_break(incumbent));
                if order == Ordering::Greater {
                    Some(index)
                } else {
                    Some(current)
                }
            }
        };
    }
    best
}

/// Keep the newest item in `scope` and delete every other one
///
/// Only a listing failure is returned as an error; deletions are best-effort.
pub fn retain_latest<D: RetentionDomain>(domain: &D, scope: &D::Scope) -> Result<RetentionOutcome<D::Item>> {
    let items = domain.list(scope)?;
    let Some(winner) = select_latest(&items) else {
        return Ok(RetentionOutcome::empty());
    };

    let kept = items[winner].clone();
    info!("Keeping latest backup: {}", kept.label());
    debug!("{} older backup(s) to remove", items.len() - 1);

    let mut removed = Vec::new();
    let mut warnings = Vec::new();
    for (index, item) in items.into_iter().enumerate() {
        if index == winner {
            continue;
        }
        match domain.delete(&item) {
            Ok(()) => {
                info!("Removed old backup: {}", item.label());
                removed.push(item);
            }
            Err(e) => {
                warn!("Failed to remove {}: {:#}", item.label(), e);
                warnings.push(RetentionWarning::new(item.label(), format!("{:#}", e)));
            }
        }
    }

    Ok(RetentionOutcome {
        kept: Some(kept),
        removed,
        warnings,
    })
}

impl Timestamped for LocalArtifact {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }

    /// Lexically greater path wins, so timestamp ties resolve the same way every run
    fn tie_break(&self, other: &Self) -> Ordering {
        self.path.cmp(&other.path)
    }
}

impl Timestamped for RemoteObject {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn label(&self) -> String {
        format!("{} (ID: {})", self.name, self.id)
    }
}
