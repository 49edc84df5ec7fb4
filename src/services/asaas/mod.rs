pub mod live;
pub mod mock;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

use types::{CreateSubscriptionRequest, CustomerProfile, GatewaySubscription};

#[derive(Debug, Error)]
pub enum AsaasServiceError {
    /// The gateway could not be reached or answered with a 5xx.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
    /// The gateway understood the request and refused it (4xx).
    #[error("payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("failed to decode gateway response: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Outbound seam to the payment gateway. Only the transition orchestrator
/// calls this; webhook reconciliation and access checks never do.
#[async_trait]
pub trait AsaasService: Send + Sync {
    /// Finds the customer by email and updates it, or creates one. Returns
    /// the gateway customer id.
    async fn upsert_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<String, AsaasServiceError>;

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, AsaasServiceError>;

    /// Best-effort removal. A subscription the gateway no longer knows about
    /// counts as cancelled.
    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AsaasServiceError>;
}
