//! In-memory store and registry implementations.
//!
//! Used by the test suite and embeddable for single-process deployments.
//! All mutation happens under one `RwLock` write guard per operation, so
//! `claim_due` and `append_run` get their atomicity from the lock.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use refresh_core::content::{ContentBase, ContentBaseId, ContentItem, ContentItemId};
use refresh_core::model::{NewScheduledUpdate, RunRecord, ScheduledUpdate};

use crate::history;
use crate::store::{ContentRegistry, RegistryError, ScheduledUpdateStore, StoreError};

/// Map-backed [`ScheduledUpdateStore`].
#[derive(Default, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<Uuid, ScheduledUpdate>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScheduledUpdateStore for MemoryStore {
    async fn insert(
        &self,
        new: NewScheduledUpdate,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<ScheduledUpdate, StoreError> {
        let now = Utc::now();
        let record = ScheduledUpdate {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            agent_id: new.agent_id,
            target_base_ids: new.target_base_ids,
            name: new.name,
            recurrence: new.recurrence,
            active: new.active,
            options: new.options,
            last_run: None,
            next_run,
            run_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.records.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledUpdate>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let mut all: Vec<ScheduledUpdate> = self.records.read().await.values().cloned().collect();
        all.sort_by_key(|u| u.created_at);
        Ok(all)
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let mut owned: Vec<ScheduledUpdate> = self
            .records
            .read()
            .await
            .values()
            .filter(|u| u.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by_key(|u| u.created_at);
        Ok(owned)
    }

    async fn update(&self, mut record: ScheduledUpdate) -> Result<ScheduledUpdate, StoreError> {
        let mut records = self.records.write().await;
        if !records.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        record.updated_at = Utc::now();
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(&id).is_some())
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let mut due: Vec<ScheduledUpdate> = self
            .records
            .read()
            .await
            .values()
            .filter(|u| u.active && u.next_run.map(|n| n <= now).unwrap_or(false))
            .cloned()
            .collect();
        due.sort_by_key(|u| u.next_run);
        Ok(due)
    }

    async fn claim_due(
        &self,
        id: Uuid,
        expected_next_run: DateTime<Utc>,
        new_next_run: Option<DateTime<Utc>>,
    ) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if record.next_run != Some(expected_next_run) {
            return Ok(false);
        }
        record.next_run = new_next_run;
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn append_run(
        &self,
        id: Uuid,
        record: RunRecord,
    ) -> Result<ScheduledUpdate, StoreError> {
        let mut records = self.records.write().await;
        let update = records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        history::apply_run(update, record);
        Ok(update.clone())
    }
}

/// Map-backed [`ContentRegistry`] with seeding helpers.
#[derive(Default, Clone)]
pub struct MemoryRegistry {
    bases: Arc<RwLock<HashMap<ContentBaseId, ContentBase>>>,
    items: Arc<RwLock<HashMap<ContentItemId, ContentItem>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_base(&self, base: ContentBase) {
        self.bases.write().await.insert(base.id, base);
    }

    pub async fn add_item(&self, item: ContentItem) {
        self.items.write().await.insert(item.id, item);
    }

    /// Current `updated_at` of an item, for asserting refresh stamps.
    pub async fn item_updated_at(&self, item_id: ContentItemId) -> Option<DateTime<Utc>> {
        self.items.read().await.get(&item_id).map(|i| i.updated_at)
    }
}

#[async_trait]
impl ContentRegistry for MemoryRegistry {
    async fn get_base(
        &self,
        base_id: ContentBaseId,
    ) -> Result<Option<ContentBase>, RegistryError> {
        Ok(self.bases.read().await.get(&base_id).cloned())
    }

    async fn list_items(
        &self,
        base_id: ContentBaseId,
    ) -> Result<Vec<ContentItem>, RegistryError> {
        let mut members: Vec<ContentItem> = self
            .items
            .read()
            .await
            .values()
            .filter(|i| i.base_id == base_id)
            .cloned()
            .collect();
        members.sort_by_key(|i| i.id);
        Ok(members)
    }

    async fn mark_for_refresh(&self, item_id: ContentItemId) -> Result<(), RegistryError> {
        let mut items = self.items.write().await;
        let item = items
            .get_mut(&item_id)
            .ok_or(RegistryError::ItemNotFound(item_id))?;
        item.updated_at = Utc::now();
        Ok(())
    }
}
