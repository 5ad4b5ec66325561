//! Store and registry trait definitions and shared error types.
//!
//! The production system keeps scheduled updates and the content registry
//! in a relational store; this crate only depends on these boundaries.
//! [`MemoryStore`](crate::memory_store) and [`FileStore`](crate::file_store)
//! are the bundled implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use refresh_core::content::{ContentBase, ContentBaseId, ContentItem, ContentItemId};
use refresh_core::model::{NewScheduledUpdate, RunRecord, ScheduledUpdate};

/// Errors from the scheduled-update store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("scheduled update not found: {0}")]
    NotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from the content registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("content item not found: {0}")]
    ItemNotFound(ContentItemId),

    #[error("refresh failed for item {item_id}: {reason}")]
    RefreshFailed { item_id: ContentItemId, reason: String },

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for [`ScheduledUpdate`] records.
#[async_trait]
pub trait ScheduledUpdateStore: Send + Sync {
    /// Insert a new record; the store assigns id and timestamps.
    ///
    /// `next_run` is computed by the caller (the service layer owns the
    /// recurrence calculator; the store stays a dumb persistence boundary).
    async fn insert(
        &self,
        new: NewScheduledUpdate,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<ScheduledUpdate, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledUpdate>, StoreError>;

    async fn list(&self) -> Result<Vec<ScheduledUpdate>, StoreError>;

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ScheduledUpdate>, StoreError>;

    /// Replace a record wholesale, refreshing `updated_at`.
    async fn update(&self, record: ScheduledUpdate) -> Result<ScheduledUpdate, StoreError>;

    /// Returns true if a record was deleted.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Active records whose `next_run` has arrived. Pure read.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledUpdate>, StoreError>;

    /// Exclusive claim before execution: compare-and-set on `next_run`.
    ///
    /// Succeeds only while the stored `next_run` still equals
    /// `expected_next_run`, atomically replacing it with `new_next_run`.
    /// A false return means another worker (or a concurrent recurrence
    /// update) got there first and the caller must skip the record.
    async fn claim_due(
        &self,
        id: Uuid,
        expected_next_run: DateTime<Utc>,
        new_next_run: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError>;

    /// Atomic read-modify-write appending one run record.
    ///
    /// Applies the run-history ledger (bounded history, `last_run`)
    /// in a single store operation; `next_run` is never touched here.
    async fn append_run(&self, id: Uuid, record: RunRecord)
        -> Result<ScheduledUpdate, StoreError>;
}

/// Read/refresh boundary to the external content-base registry.
#[async_trait]
pub trait ContentRegistry: Send + Sync {
    /// Fetch one content base; `None` when it no longer exists.
    async fn get_base(&self, base_id: ContentBaseId)
        -> Result<Option<ContentBase>, RegistryError>;

    /// Member items of a content base.
    async fn list_items(&self, base_id: ContentBaseId)
        -> Result<Vec<ContentItem>, RegistryError>;

    /// Stamp an item for refresh; the re-embedding pipeline behind the
    /// registry picks it up from there.
    async fn mark_for_refresh(&self, item_id: ContentItemId) -> Result<(), RegistryError>;
}
