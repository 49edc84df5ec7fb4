use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::plan::{member_limit, SubscriptionStatus};
use crate::models::subscription::SubscriptionRecord;
use crate::services::asaas::types::AsaasWebhookEvent;

use super::{now_unix_millis, BillingError, SubscriptionService};

const EVENT_TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const MAX_UPDATE_ATTEMPTS: usize = 5;

/// What a webhook delivery did to the local record. `Stale` and `Ignored`
/// are still acknowledged to the gateway; only a repository error bubbles
/// up so the delivery gets retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Ignored,
    Stale,
}

struct EventChange {
    workspace_id: Uuid,
    status: SubscriptionStatus,
    subscription_id: Option<String>,
}

fn map_payment_event(event: &str) -> Option<SubscriptionStatus> {
    match event {
        "PAYMENT_CONFIRMED" | "PAYMENT_RECEIVED" => Some(SubscriptionStatus::Active),
        // Deletions and refunds degrade to past_due rather than canceling;
        // cancellation only arrives via the subscription resource itself.
        "PAYMENT_OVERDUE" | "PAYMENT_DELETED" | "PAYMENT_REFUNDED" => {
            Some(SubscriptionStatus::PastDue)
        }
        _ => None,
    }
}

fn map_subscription_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "ACTIVE" => Some(SubscriptionStatus::Active),
        "INACTIVE" | "EXPIRED" => Some(SubscriptionStatus::Canceled),
        "OVERDUE" => Some(SubscriptionStatus::PastDue),
        _ => None,
    }
}

/// Gateway events carry the workspace id in `externalReference`.
fn correlate(external_reference: Option<&str>) -> Option<Uuid> {
    external_reference.and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Gateway emission time as unix milliseconds; arrival time when the field
/// is missing or malformed.
fn event_watermark(date_created: Option<&str>) -> i64 {
    date_created
        .and_then(|raw| PrimitiveDateTime::parse(raw, EVENT_TIMESTAMP_FORMAT).ok())
        .map(|parsed| parsed.assume_utc().unix_timestamp() * 1_000)
        .unwrap_or_else(now_unix_millis)
}

/// Pure merge of one mapped change into the record. `None` means the change
/// is dropped by a state-machine guard. Same inputs always produce the same
/// output, which is what makes redelivery harmless.
fn merge(
    record: &SubscriptionRecord,
    status: SubscriptionStatus,
    subscription_id: Option<&str>,
    watermark: i64,
) -> Option<SubscriptionRecord> {
    // Canceled is terminal for the webhook stream; only an explicit plan
    // change revives the workspace.
    if record.status == SubscriptionStatus::Canceled {
        return None;
    }

    let external_subscription_id = subscription_id
        .map(str::to_string)
        .or_else(|| record.external_subscription_id.clone());

    // An active record always names its gateway subscription.
    if status == SubscriptionStatus::Active && external_subscription_id.is_none() {
        return None;
    }

    Some(SubscriptionRecord {
        workspace_id: record.workspace_id,
        plan: record.plan,
        status,
        external_subscription_id,
        trial_ends_at: if status == SubscriptionStatus::Active {
            None
        } else {
            record.trial_ends_at
        },
        member_limit: member_limit(record.plan, status),
        updated_at: OffsetDateTime::now_utc(),
        last_event_sequence: watermark,
    })
}

impl SubscriptionService {
    /// Reconciles one webhook delivery into the local cache. Never calls the
    /// gateway; everything needed is in the payload and the record.
    pub async fn apply_event(
        &self,
        event: &AsaasWebhookEvent,
    ) -> Result<ApplyOutcome, BillingError> {
        if let Some(event_id) = event.id.as_deref() {
            if self.event_log.has_processed_event(event_id).await? {
                debug!(event_id, "webhook redelivery, already processed");
                return Ok(ApplyOutcome::Ignored);
            }
        }

        let watermark = event_watermark(event.date_created.as_deref());
        let mut changes = Vec::new();

        if let Some(payment) = &event.payment {
            if let Some(status) = map_payment_event(&event.event) {
                match correlate(payment.external_reference.as_deref()) {
                    Some(workspace_id) => changes.push(EventChange {
                        workspace_id,
                        status,
                        subscription_id: payment.subscription.clone(),
                    }),
                    None => warn!(
                        event = %event.event,
                        payment_id = %payment.id,
                        "payment event carries no workspace reference"
                    ),
                }
            }
        }

        if let Some(subscription) = &event.subscription {
            if let Some(status) = map_subscription_status(&subscription.status) {
                match correlate(subscription.external_reference.as_deref()) {
                    Some(workspace_id) => changes.push(EventChange {
                        workspace_id,
                        status,
                        subscription_id: Some(subscription.id.clone()),
                    }),
                    None => warn!(
                        event = %event.event,
                        subscription_id = %subscription.id,
                        "subscription event carries no workspace reference"
                    ),
                }
            }
        }

        let mut applied = false;
        let mut stale = false;
        for change in &changes {
            match self.apply_change(change, watermark).await? {
                ApplyOutcome::Applied => applied = true,
                ApplyOutcome::Stale => stale = true,
                ApplyOutcome::Ignored => {}
            }
        }

        if let Some(event_id) = event.id.as_deref() {
            self.event_log.record_event(event_id).await?;
        }

        Ok(if applied {
            ApplyOutcome::Applied
        } else if stale {
            ApplyOutcome::Stale
        } else {
            ApplyOutcome::Ignored
        })
    }

    async fn apply_change(
        &self,
        change: &EventChange,
        watermark: i64,
    ) -> Result<ApplyOutcome, BillingError> {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let Some(record) = self.subscriptions.find(change.workspace_id).await? else {
                warn!(
                    workspace_id = %change.workspace_id,
                    "webhook for workspace without a subscription record"
                );
                return Ok(ApplyOutcome::Ignored);
            };

            if watermark < record.last_event_sequence {
                debug!(
                    workspace_id = %change.workspace_id,
                    watermark,
                    record_watermark = record.last_event_sequence,
                    "stale webhook discarded"
                );
                return Ok(ApplyOutcome::Stale);
            }

            let Some(updated) = merge(
                &record,
                change.status,
                change.subscription_id.as_deref(),
                watermark,
            ) else {
                return Ok(ApplyOutcome::Ignored);
            };

            if self
                .subscriptions
                .compare_and_update(record.last_event_sequence, &updated)
                .await?
            {
                info!(
                    workspace_id = %change.workspace_id,
                    status = ?updated.status,
                    watermark,
                    "webhook applied"
                );
                return Ok(ApplyOutcome::Applied);
            }
        }

        Err(BillingError::Database(sqlx::Error::Protocol(
            "subscription row stayed contended during reconcile".into(),
        )))
    }
}
