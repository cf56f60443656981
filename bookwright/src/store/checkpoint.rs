//! Checkpoint and pause-flag persistence.
//!
//! The checkpoint is deliberately tiny and separate from the project
//! record: the project carries full chapter text, but checkpoint writes
//! happen after every module and must stay cheap. Write failures are
//! logged and swallowed; the current run keeps its in-memory state and
//! only resumability degrades.

use crate::errors::StorageError;
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Durable resume state for one project's generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Owning project.
    pub project_id: Uuid,
    /// Index of the next roadmap module to process.
    pub next_index: usize,
    /// Roadmap module ids already completed. Only completed modules are
    /// ever listed here; an in-flight module is never checkpointed.
    pub completed_module_ids: Vec<String>,
    /// When this checkpoint was written.
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Creates a checkpoint stamped with the current time.
    #[must_use]
    pub fn new(project_id: Uuid, next_index: usize, completed_module_ids: Vec<String>) -> Self {
        Self {
            project_id,
            next_index,
            completed_module_ids,
            saved_at: Utc::now(),
        }
    }
}

/// Checkpoint and pause-flag access over a [`KeyValueStore`].
#[derive(Clone)]
pub struct CheckpointStore {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointStore").finish_non_exhaustive()
    }
}

const PAUSE_SENTINEL: &str = "1";

fn checkpoint_key(project_id: Uuid) -> String {
    format!("checkpoint_{project_id}")
}

fn pause_key(project_id: Uuid) -> String {
    format!("pause_flag_{project_id}")
}

impl CheckpointStore {
    /// Creates a store over the given backend.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persists a checkpoint. Failures are logged, never propagated.
    pub async fn save(&self, checkpoint: &Checkpoint) {
        let key = checkpoint_key(checkpoint.project_id);
        let payload = match serde_json::to_string(checkpoint) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to serialize checkpoint");
                return;
            }
        };
        if let Err(e) = self.kv.set(&key, &payload).await {
            tracing::warn!(key = %key, error = %e, "checkpoint write failed, continuing in-memory");
        }
    }

    /// Loads the checkpoint for a project, if one exists and parses.
    ///
    /// A corrupt or unreadable checkpoint is treated as absent.
    pub async fn load(&self, project_id: Uuid) -> Option<Checkpoint> {
        let key = checkpoint_key(project_id);
        let raw = match self.kv.get(&key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "checkpoint read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "discarding corrupt checkpoint");
                None
            }
        }
    }

    /// Removes the checkpoint.
    ///
    /// # Errors
    ///
    /// Propagates the storage failure; callers that do not care (the
    /// completion path) log and ignore it.
    pub async fn clear(&self, project_id: Uuid) -> Result<(), StorageError> {
        self.kv.remove(&checkpoint_key(project_id)).await
    }

    /// Sets the durable pause flag.
    pub async fn set_pause_flag(&self, project_id: Uuid) {
        let key = pause_key(project_id);
        if let Err(e) = self.kv.set(&key, PAUSE_SENTINEL).await {
            tracing::warn!(key = %key, error = %e, "pause flag write failed");
        }
    }

    /// Clears the pause flag.
    pub async fn clear_pause_flag(&self, project_id: Uuid) {
        let key = pause_key(project_id);
        if let Err(e) = self.kv.remove(&key).await {
            tracing::warn!(key = %key, error = %e, "pause flag clear failed");
        }
    }

    /// Returns true if the pause flag is set.
    ///
    /// A read failure counts as "not paused" so a broken store can
    /// never wedge a run.
    pub async fn is_paused(&self, project_id: Uuid) -> bool {
        match self.kv.get(&pause_key(project_id)).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                tracing::warn!(project_id = %project_id, error = %e, "pause flag read failed");
                false
            }
        }
    }
}
