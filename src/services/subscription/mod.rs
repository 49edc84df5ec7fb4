pub mod access;
pub mod reconcile;
pub mod transition;

use std::sync::Arc;

use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::db::gateway_event_log_repository::GatewayEventLogRepository;
use crate::db::subscription_repository::SubscriptionRepository;
use crate::db::workspace_repository::WorkspaceRepository;
use crate::models::plan::{member_limit, SubscriptionStatus};
use crate::models::subscription::SubscriptionRecord;
use crate::services::asaas::{AsaasService, AsaasServiceError};

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),
    #[error("payment gateway rejected the request: {0}")]
    GatewayRejected(String),
    #[error("caller is not allowed to manage this workspace")]
    Unauthorized,
    #[error("workspace has no subscription record")]
    WorkspaceNotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AsaasServiceError> for BillingError {
    fn from(err: AsaasServiceError) -> Self {
        match err {
            AsaasServiceError::Rejected(msg) => BillingError::GatewayRejected(msg),
            AsaasServiceError::Unavailable(msg) => BillingError::GatewayUnavailable(msg),
            AsaasServiceError::Serde(err) => BillingError::GatewayUnavailable(err.to_string()),
        }
    }
}

/// Billing core. Owns every write to `workspace_subscriptions`; the three
/// entry points (`change_plan`, `apply_event`, `check_access`) live in the
/// sibling modules.
pub struct SubscriptionService {
    pub(crate) subscriptions: Arc<dyn SubscriptionRepository>,
    pub(crate) workspaces: Arc<dyn WorkspaceRepository>,
    pub(crate) gateway: Arc<dyn AsaasService>,
    pub(crate) event_log: Arc<dyn GatewayEventLogRepository>,
    pub(crate) trial_days: i64,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        workspaces: Arc<dyn WorkspaceRepository>,
        gateway: Arc<dyn AsaasService>,
        event_log: Arc<dyn GatewayEventLogRepository>,
        trial_days: i64,
    ) -> Self {
        Self {
            subscriptions,
            workspaces,
            gateway,
            event_log,
            trial_days,
        }
    }

    /// Provisions the one subscription record a workspace ever gets. Called
    /// by workspace creation; a second call returns the existing record
    /// untouched.
    pub async fn start_trial(&self, workspace_id: Uuid) -> Result<SubscriptionRecord, BillingError> {
        let now = OffsetDateTime::now_utc();
        let record = SubscriptionRecord {
            workspace_id,
            plan: None,
            status: SubscriptionStatus::Trialing,
            external_subscription_id: None,
            trial_ends_at: Some(now + Duration::days(self.trial_days)),
            member_limit: member_limit(None, SubscriptionStatus::Trialing),
            updated_at: now,
            last_event_sequence: 0,
        };

        if self.subscriptions.create_trial(&record).await? {
            info!(%workspace_id, trial_days = self.trial_days, "trial started");
            return Ok(record);
        }

        self.subscriptions
            .find(workspace_id)
            .await?
            .ok_or(BillingError::WorkspaceNotFound)
    }

    /// Read path for the billing page. Any workspace member may look.
    pub async fn current_subscription(
        &self,
        workspace_id: Uuid,
        caller: Uuid,
    ) -> Result<SubscriptionRecord, BillingError> {
        let role = self.workspaces.member_role(workspace_id, caller).await?;
        if role.is_none() {
            return Err(BillingError::Unauthorized);
        }

        self.subscriptions
            .find(workspace_id)
            .await?
            .ok_or(BillingError::WorkspaceNotFound)
    }
}

pub(crate) fn now_unix_millis() -> i64 {
    let now = OffsetDateTime::now_utc();
    now.unix_timestamp() * 1_000 + i64::from(now.millisecond())
}
