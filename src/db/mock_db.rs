#![allow(dead_code)]
// In-memory repository implementations used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::SubscriptionRecord;
use crate::models::workspace::{BillingContact, WorkspaceRole};

use super::gateway_event_log_repository::GatewayEventLogRepository;
use super::subscription_repository::SubscriptionRepository;
use super::workspace_repository::WorkspaceRepository;

#[derive(Default)]
pub struct MockSubscriptionStore {
    pub records: Mutex<HashMap<Uuid, SubscriptionRecord>>,
    pub should_fail: Mutex<bool>,
    /// When > 0, the next `compare_and_update` calls report a conflict even
    /// when the watermark matches, to exercise the retry path.
    pub forced_conflicts: Mutex<usize>,
}

impl MockSubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, record: SubscriptionRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.workspace_id, record);
    }

    pub fn get(&self, workspace_id: Uuid) -> Option<SubscriptionRecord> {
        self.records.lock().unwrap().get(&workspace_id).cloned()
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionStore {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        if *self.should_fail.lock().unwrap() {
            return Err(sqlx::Error::Protocol("mock subscription store failure".into()));
        }
        Ok(self.records.lock().unwrap().get(&workspace_id).cloned())
    }

    async fn create_trial(&self, record: &SubscriptionRecord) -> Result<bool, sqlx::Error> {
        if *self.should_fail.lock().unwrap() {
            return Err(sqlx::Error::Protocol("mock subscription store failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.workspace_id) {
            return Ok(false);
        }
        records.insert(record.workspace_id, record.clone());
        Ok(true)
    }

    async fn compare_and_update(
        &self,
        expected_sequence: i64,
        record: &SubscriptionRecord,
    ) -> Result<bool, sqlx::Error> {
        if *self.should_fail.lock().unwrap() {
            return Err(sqlx::Error::Protocol("mock subscription store failure".into()));
        }

        {
            let mut forced = self.forced_conflicts.lock().unwrap();
            if *forced > 0 {
                *forced -= 1;
                return Ok(false);
            }
        }

        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.workspace_id) {
            Some(stored) if stored.last_event_sequence == expected_sequence => {
                *stored = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MockWorkspaceDirectory {
    pub roles: Mutex<HashMap<(Uuid, Uuid), WorkspaceRole>>,
    pub contacts: Mutex<HashMap<Uuid, BillingContact>>,
}

impl MockWorkspaceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_member(&self, workspace_id: Uuid, user_id: Uuid, role: WorkspaceRole) {
        self.roles
            .lock()
            .unwrap()
            .insert((workspace_id, user_id), role);
    }

    pub fn set_contact(&self, workspace_id: Uuid, contact: BillingContact) {
        self.contacts.lock().unwrap().insert(workspace_id, contact);
    }
}

#[async_trait]
impl WorkspaceRepository for MockWorkspaceDirectory {
    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceRole>, sqlx::Error> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(workspace_id, user_id))
            .copied())
    }

    async fn billing_contact(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<BillingContact>, sqlx::Error> {
        Ok(self.contacts.lock().unwrap().get(&workspace_id).cloned())
    }
}

#[derive(Default)]
pub struct MockGatewayEventLog {
    pub seen: Mutex<HashSet<String>>,
}

impl MockGatewayEventLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GatewayEventLogRepository for MockGatewayEventLog {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        Ok(self.seen.lock().unwrap().contains(event_id))
    }

    async fn record_event(&self, event_id: &str) -> Result<(), sqlx::Error> {
        self.seen.lock().unwrap().insert(event_id.to_string());
        Ok(())
    }
}
