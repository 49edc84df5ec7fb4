use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::SubscriptionRecord;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<SubscriptionRecord>, sqlx::Error>;

    /// Inserts the provisioning-time trial record. Returns `false` when a
    /// record already exists for the workspace (the insert is a no-op then,
    /// preserving the one-record-per-workspace invariant).
    async fn create_trial(&self, record: &SubscriptionRecord) -> Result<bool, sqlx::Error>;

    /// Conditional write: applies `record` only while the stored watermark
    /// still equals `expected_sequence`. Returns `false` on conflict so the
    /// caller can re-read and retry; this is what serializes concurrent
    /// writers per workspace.
    async fn compare_and_update(
        &self,
        expected_sequence: i64,
        record: &SubscriptionRecord,
    ) -> Result<bool, sqlx::Error>;
}
