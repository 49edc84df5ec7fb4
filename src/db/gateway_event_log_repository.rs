use async_trait::async_trait;

/// Dedupe log for gateway webhook deliveries. The merge itself is already
/// idempotent; this short-circuits exact redeliveries before they touch the
/// subscription row.
#[async_trait]
pub trait GatewayEventLogRepository: Send + Sync {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error>;

    async fn record_event(&self, event_id: &str) -> Result<(), sqlx::Error>;
}
