//! Create/update/delete/run-now operations on scheduled updates.
//!
//! This is what the API layer calls; it owns validation and the initial
//! `next_run` computation so invalid recurrences are never stored.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use refresh_core::model::{
    NewScheduledUpdate, RunRecord, RunResult, ScheduledUpdate, ScheduledUpdatePatch,
};
use refresh_core::ValidationError;

use crate::engine::ExecutionEngine;
use crate::recurrence;
use crate::store::{ScheduledUpdateStore, StoreError};

/// Errors surfaced to API callers.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("scheduled update not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct ScheduledUpdateService {
    store: Arc<dyn ScheduledUpdateStore>,
    engine: ExecutionEngine,
}

impl ScheduledUpdateService {
    pub fn new(store: Arc<dyn ScheduledUpdateStore>, engine: ExecutionEngine) -> Self {
        Self { store, engine }
    }

    /// Validate and create a scheduled update with its initial `next_run`.
    pub async fn create(&self, input: NewScheduledUpdate) -> Result<ScheduledUpdate, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        recurrence::validate_spec(&input.recurrence)?;

        let next_run = recurrence::next_run(&input.recurrence, Utc::now());
        let created = self.store.insert(input, next_run).await?;
        info!(
            update_id = %created.id,
            name = %created.name,
            next_run = ?created.next_run,
            "scheduled update created"
        );
        Ok(created)
    }

    /// Partial update. A replaced recurrence is re-validated and `next_run`
    /// recomputed from now — never left stale.
    pub async fn update(
        &self,
        id: Uuid,
        patch: ScheduledUpdatePatch,
    ) -> Result<ScheduledUpdate, ServiceError> {
        let mut record = self
            .store
            .get(id)
            .await?
            .ok_or(ServiceError::NotFound(id))?;

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            record.name = name;
        }
        if let Some(agent_id) = patch.agent_id {
            record.agent_id = agent_id;
        }
        if let Some(target_base_ids) = patch.target_base_ids {
            record.target_base_ids = target_base_ids;
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        if let Some(options) = patch.options {
            record.options = options;
        }
        if let Some(spec) = patch.recurrence {
            recurrence::validate_spec(&spec)?;
            record.next_run = recurrence::next_run(&spec, Utc::now());
            record.recurrence = spec;
        }

        Ok(self.store.update(record).await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        Ok(self.store.delete(id).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ScheduledUpdate>, ServiceError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list_for_owner(
        &self,
        owner_id: &str,
    ) -> Result<Vec<ScheduledUpdate>, ServiceError> {
        Ok(self.store.list_for_owner(owner_id).await?)
    }

    /// Manual "run now": execute immediately, record the outcome, return it.
    ///
    /// The recurring cadence is untouched — `next_run` stays where the
    /// schedule put it. Batch-level failures (including an unknown or
    /// unreadable record) come back as `success: false`, never as an error.
    pub async fn run_now(&self, id: Uuid) -> RunResult {
        let update = match self.store.get(id).await {
            Ok(Some(update)) => update,
            Ok(None) => {
                return RunResult {
                    success: false,
                    message: format!("scheduled update not found: {}", id),
                    items_processed: 0,
                }
            }
            Err(e) => {
                warn!(update_id = %id, error = %e, "failed to load scheduled update");
                return RunResult {
                    success: false,
                    message: format!("failed to load scheduled update: {}", e),
                    items_processed: 0,
                };
            }
        };

        let result = self.engine.execute(&update, true).await;

        let record = RunRecord {
            timestamp: Utc::now(),
            items_processed: result.items_processed,
            success: result.success,
            triggered_manually: true,
        };
        if let Err(e) = self.store.append_run(id, record).await {
            warn!(update_id = %id, error = %e, "failed to record manual run");
        }

        result
    }
}
