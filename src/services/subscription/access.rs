use serde::Serialize;
use time::OffsetDateTime;
use tracing::error;
use uuid::Uuid;

use crate::models::plan::SubscriptionStatus;
use crate::models::subscription::SubscriptionRecord;

use super::SubscriptionService;

/// Verdict for one write attempt against a workspace. `reason` is safe to
/// show end users; `upgrade_required` tells the frontend to point at the
/// billing page instead of a retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub upgrade_required: bool,
}

impl AccessDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            upgrade_required: false,
        }
    }

    fn deny(reason: &str, upgrade_required: bool) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.to_string()),
            upgrade_required,
        }
    }
}

/// Pure decision over the cached record. Split out so the trial boundary can
/// be tested with an explicit clock.
pub fn evaluate(record: Option<&SubscriptionRecord>, now: OffsetDateTime) -> AccessDecision {
    let Some(record) = record else {
        return AccessDecision::deny("workspace not found", false);
    };

    match record.status {
        SubscriptionStatus::Active => AccessDecision::allow(),
        SubscriptionStatus::Trialing => match record.trial_ends_at {
            Some(ends_at) if now >= ends_at => AccessDecision::deny(
                "your trial has ended, choose a plan to keep editing",
                true,
            ),
            _ => AccessDecision::allow(),
        },
        SubscriptionStatus::PastDue => AccessDecision::deny(
            "your subscription payment is overdue",
            true,
        ),
        SubscriptionStatus::Canceled => AccessDecision::deny(
            "your subscription has been canceled",
            true,
        ),
    }
}

impl SubscriptionService {
    /// Request-path gate. One indexed read, no gateway traffic, and any
    /// repository failure denies rather than erroring.
    pub async fn check_access(&self, workspace_id: Uuid) -> AccessDecision {
        match self.subscriptions.find(workspace_id).await {
            Ok(record) => evaluate(record.as_ref(), OffsetDateTime::now_utc()),
            Err(err) => {
                error!(%workspace_id, error = %err, "access check could not read subscription");
                AccessDecision::deny("subscription state unavailable", false)
            }
        }
    }
}
