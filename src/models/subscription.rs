use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::plan::{Plan, SubscriptionStatus};

/// Local projection of a workspace's subscription state. One row per
/// workspace for its whole lifetime; cancellation is a status transition,
/// never a deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SubscriptionRecord {
    pub workspace_id: Uuid,
    pub plan: Option<Plan>,
    pub status: SubscriptionStatus,
    /// The gateway's subscription id; null while trialing without payment.
    pub external_subscription_id: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    /// Derived via the plan catalog on every write, never hand-edited.
    pub member_limit: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    /// Watermark (unix milliseconds) of the last applied write. Writes with
    /// an older watermark are discarded as stale.
    pub last_event_sequence: i64,
}

/// What the billing UI needs to render the current plan and trial countdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub plan: Option<Plan>,
    pub status: SubscriptionStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub trial_ends_at: Option<OffsetDateTime>,
    pub member_limit: i32,
}

impl From<&SubscriptionRecord> for SubscriptionView {
    fn from(record: &SubscriptionRecord) -> Self {
        SubscriptionView {
            id: record.workspace_id,
            plan: record.plan,
            status: record.status,
            trial_ends_at: record.trial_ends_at,
            member_limit: record.member_limit,
        }
    }
}
