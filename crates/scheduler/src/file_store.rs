//! JSON-file-backed store and registry.
//!
//! Records live in `{data_dir}/scheduled-updates.json` and
//! `{data_dir}/content-bases.json`. Every operation is a load / mutate /
//! save pass under one mutex, which is what makes `claim_due` and
//! `append_run` atomic for a single worker process. Multi-process
//! deployments need a real store behind the traits; the conditional
//! claim keeps them from double-executing either way.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use refresh_core::content::{ContentBase, ContentBaseId, ContentItem, ContentItemId};
use refresh_core::model::{NewScheduledUpdate, RunRecord, ScheduledUpdate};

use crate::history;
use crate::store::{ContentRegistry, RegistryError, ScheduledUpdateStore, StoreError};

const UPDATES_FILE: &str = "scheduled-updates.json";
const BASES_FILE: &str = "content-bases.json";

fn load_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn save_json<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(records)?;
    std::fs::write(path, data)?;
    Ok(())
}

/// [`ScheduledUpdateStore`] persisting to a single JSON file.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(UPDATES_FILE),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<Vec<ScheduledUpdate>, StoreError> {
        load_json(&self.path)
    }

    fn save(&self, records: &[ScheduledUpdate]) -> Result<(), StoreError> {
        save_json(&self.path, records)
    }
}

#[async_trait]
impl ScheduledUpdateStore for FileStore {
    async fn insert(
        &self,
        new: NewScheduledUpdate,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<ScheduledUpdate, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
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
        records.push(record.clone());
        self.save(&records)?;
        info!(update_id = %record.id, name = %record.name, "scheduled update created");
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<ScheduledUpdate>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.into_iter().find(|u| u.id == id))
    }

    async fn list(&self) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let _guard = self.lock.lock().await;
        self.load()
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()?
            .into_iter()
            .filter(|u| u.owner_id == owner_id)
            .collect())
    }

    async fn update(&self, mut record: ScheduledUpdate) -> Result<ScheduledUpdate, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let slot = records
            .iter_mut()
            .find(|u| u.id == record.id)
            .ok_or(StoreError::NotFound(record.id))?;
        record.updated_at = Utc::now();
        *slot = record.clone();
        self.save(&records)?;
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|u| u.id != id);
        let removed = records.len() < before;
        if removed {
            self.save(&records)?;
            info!(update_id = %id, "scheduled update deleted");
        }
        Ok(removed)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledUpdate>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut due: Vec<ScheduledUpdate> = self
            .load()?
            .into_iter()
            .filter(|u| u.active && u.next_run.map(|n| n <= now).unwrap_or(false))
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
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if record.next_run != Some(expected_next_run) {
            return Ok(false);
        }
        record.next_run = new_next_run;
        record.updated_at = Utc::now();
        self.save(&records)?;
        Ok(true)
    }

    async fn append_run(
        &self,
        id: Uuid,
        run: RunRecord,
    ) -> Result<ScheduledUpdate, StoreError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound(id))?;
        history::apply_run(record, run);
        let updated = record.clone();
        self.save(&records)?;
        Ok(updated)
    }
}

/// On-disk shape of one content base with its member items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBaseRecord {
    pub id: ContentBaseId,
    pub owner_id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<ContentItem>,
}

/// [`ContentRegistry`] persisting to a single JSON file.
#[derive(Clone)]
pub struct FileRegistry {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl FileRegistry {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(BASES_FILE),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn load(&self) -> Result<Vec<ContentBaseRecord>, RegistryError> {
        load_json(&self.path).map_err(|e| RegistryError::Unavailable(e.to_string()))
    }

    fn save(&self, records: &[ContentBaseRecord]) -> Result<(), RegistryError> {
        save_json(&self.path, records).map_err(|e| RegistryError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl ContentRegistry for FileRegistry {
    async fn get_base(
        &self,
        base_id: ContentBaseId,
    ) -> Result<Option<ContentBase>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load()?.into_iter().find(|b| b.id == base_id).map(|b| {
            ContentBase {
                id: b.id,
                owner_id: b.owner_id,
                name: b.name,
            }
        }))
    }

    async fn list_items(
        &self,
        base_id: ContentBaseId,
    ) -> Result<Vec<ContentItem>, RegistryError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load()?
            .into_iter()
            .find(|b| b.id == base_id)
            .map(|b| b.items)
            .unwrap_or_default())
    }

    async fn mark_for_refresh(&self, item_id: ContentItemId) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let item = records
            .iter_mut()
            .flat_map(|b| b.items.iter_mut())
            .find(|i| i.id == item_id)
            .ok_or(RegistryError::ItemNotFound(item_id))?;
        item.updated_at = Utc::now();
        self.save(&records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use refresh_core::content::SourceType;
    use refresh_core::model::{Frequency, RecurrenceSpec, RefreshOptions};

    fn new_update(name: &str) -> NewScheduledUpdate {
        NewScheduledUpdate {
            owner_id: "acct-1".to_string(),
            agent_id: Some("agent-7".to_string()),
            target_base_ids: vec![1, 2],
            name: name.to_string(),
            recurrence: RecurrenceSpec {
                frequency: Frequency::Weekly,
                interval: 1,
                day_of_week: Some(3),
                day_of_month: None,
                specific_time: Some("09:00".to_string()),
                cron_expression: None,
            },
            active: true,
            options: RefreshOptions::default(),
        }
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let next = Some(Utc::now() + Duration::days(1));
        let created = {
            let store = FileStore::new(dir.path());
            store.insert(new_update("weekly"), next).await.unwrap()
        };

        let reopened = FileStore::new(dir.path());
        let fetched = reopened.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "weekly");
        assert_eq!(fetched.next_run, next);
        assert_eq!(fetched.recurrence, created.recurrence);
    }

    #[tokio::test]
    async fn claim_then_stale_claim() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let expected = Utc::now() - Duration::minutes(5);
        let created = store.insert(new_update("a"), Some(expected)).await.unwrap();

        let advanced = Some(expected + Duration::days(7));
        assert!(store.claim_due(created.id, expected, advanced).await.unwrap());
        assert!(!store.claim_due(created.id, expected, advanced).await.unwrap());
    }

    #[tokio::test]
    async fn append_run_persists_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let created = store.insert(new_update("a"), None).await.unwrap();

        let ts = Utc::now();
        store
            .append_run(
                created.id,
                RunRecord {
                    timestamp: ts,
                    items_processed: 2,
                    success: true,
                    triggered_manually: true,
                },
            )
            .await
            .unwrap();

        let reopened = FileStore::new(dir.path());
        let fetched = reopened.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.run_history.len(), 1);
        assert_eq!(fetched.last_run, Some(ts));
    }

    #[tokio::test]
    async fn registry_round_trip_and_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FileRegistry::new(dir.path());
        let stale = Utc::now() - Duration::days(30);
        registry
            .save(&[ContentBaseRecord {
                id: 1,
                owner_id: "acct-1".to_string(),
                name: "docs".to_string(),
                items: vec![ContentItem {
                    id: 5,
                    base_id: 1,
                    title: "readme".to_string(),
                    source_type: SourceType::Url,
                    tags: vec!["api".to_string()],
                    updated_at: stale,
                }],
            }])
            .unwrap();

        assert!(registry.get_base(1).await.unwrap().is_some());
        assert!(registry.get_base(9).await.unwrap().is_none());
        assert_eq!(registry.list_items(1).await.unwrap().len(), 1);

        registry.mark_for_refresh(5).await.unwrap();
        let items = registry.list_items(1).await.unwrap();
        assert!(items[0].updated_at > stale);
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.list().await.unwrap().is_empty());
        assert!(store
            .list_due(Utc::now())
            .await
            .unwrap()
            .is_empty());

        let registry = FileRegistry::new(dir.path());
        assert!(registry.list_items(1).await.unwrap().is_empty());
    }
}
