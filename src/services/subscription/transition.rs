use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::plan::{member_limit, Plan, SubscriptionStatus};
use crate::models::subscription::SubscriptionRecord;
use crate::services::asaas::types::{BillingType, CreateSubscriptionRequest, CustomerProfile};

use super::{now_unix_millis, BillingError, SubscriptionService};

const DUE_DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

// The gateway hosts the card payment form at a well-known path keyed on the
// subscription id.
const CHECKOUT_URL_BASE: &str = "https://www.asaas.com/c";

// Conflicts only come from concurrent webhooks on the same workspace, so a
// handful of retries is plenty.
const MAX_UPDATE_ATTEMPTS: usize = 5;

/// One calendar month out, day clamped to the target month's length.
fn next_monthly_due_date(today: Date) -> String {
    let (year, month) = match today.month() {
        Month::December => (today.year() + 1, Month::January),
        other => (today.year(), other.next()),
    };
    let day = today.day().min(time::util::days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day)
        .unwrap_or(today)
        .format(DUE_DATE_FORMAT)
        .unwrap_or_else(|_| today.to_string())
}

/// Outcome of a plan change. `checkout_url` is only set for card billing,
/// where the buyer still has to complete payment on the gateway's hosted
/// form; the other billing methods charge through their own channels.
#[derive(Debug, Clone)]
pub struct PlanTransition {
    pub record: SubscriptionRecord,
    pub checkout_url: Option<String>,
}

impl SubscriptionService {
    /// Moves a workspace onto `plan`. Gateway work happens first; the local
    /// record is only written once the replacement subscription exists, so a
    /// gateway failure leaves the record untouched.
    pub async fn change_plan(
        &self,
        workspace_id: Uuid,
        caller: Uuid,
        plan: Plan,
        billing_type: BillingType,
    ) -> Result<PlanTransition, BillingError> {
        let role = self.workspaces.member_role(workspace_id, caller).await?;
        if !role.is_some_and(|role| role.can_manage_billing()) {
            return Err(BillingError::Unauthorized);
        }

        let mut current = self
            .subscriptions
            .find(workspace_id)
            .await?
            .ok_or(BillingError::WorkspaceNotFound)?;

        // Best-effort: a dangling gateway subscription costs money but does
        // not block the transition, and the webhook stream keys on the new id.
        if let Some(existing) = current.external_subscription_id.as_deref() {
            if let Err(err) = self.gateway.cancel_subscription(existing).await {
                warn!(
                    %workspace_id,
                    subscription_id = existing,
                    error = %err,
                    "could not cancel previous gateway subscription"
                );
            }
        }

        let contact = self
            .workspaces
            .billing_contact(workspace_id)
            .await?
            .ok_or(BillingError::WorkspaceNotFound)?;

        let customer_id = self
            .gateway
            .upsert_customer(&CustomerProfile {
                name: contact.name,
                email: contact.email,
                phone: contact.phone,
            })
            .await?;

        let config = plan.config();
        let created = self
            .gateway
            .create_subscription(&CreateSubscriptionRequest {
                customer: customer_id,
                billing_type,
                value: config.value,
                next_due_date: next_monthly_due_date(OffsetDateTime::now_utc().date()),
                cycle: "MONTHLY".to_string(),
                description: config.description.to_string(),
                external_reference: workspace_id.to_string(),
            })
            .await?;

        let checkout_url = (billing_type == BillingType::CreditCard)
            .then(|| format!("{CHECKOUT_URL_BASE}/{}", created.id));

        let status = if created.status.eq_ignore_ascii_case("ACTIVE") {
            SubscriptionStatus::Active
        } else {
            // First charge still pending (boleto/pix); the confirmation
            // webhook flips the record to active.
            SubscriptionStatus::Trialing
        };

        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let expected = current.last_event_sequence;
            let updated = SubscriptionRecord {
                workspace_id,
                plan: Some(plan),
                status,
                external_subscription_id: Some(created.id.clone()),
                trial_ends_at: if status == SubscriptionStatus::Active {
                    None
                } else {
                    current.trial_ends_at
                },
                member_limit: member_limit(Some(plan), status),
                updated_at: OffsetDateTime::now_utc(),
                // Stamped past the old watermark so webhooks emitted before
                // this transition land as stale.
                last_event_sequence: now_unix_millis().max(expected + 1),
            };

            if self
                .subscriptions
                .compare_and_update(expected, &updated)
                .await?
            {
                info!(
                    %workspace_id,
                    plan = config.name,
                    status = ?updated.status,
                    subscription_id = %created.id,
                    "plan transition applied"
                );
                return Ok(PlanTransition {
                    record: updated,
                    checkout_url: checkout_url.clone(),
                });
            }

            current = self
                .subscriptions
                .find(workspace_id)
                .await?
                .ok_or(BillingError::WorkspaceNotFound)?;
        }

        Err(BillingError::Database(sqlx::Error::Protocol(
            "subscription row stayed contended during plan transition".into(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use time::Duration;
    use uuid::Uuid;

    use crate::models::plan::{Plan, SubscriptionStatus};
    use crate::models::workspace::{BillingContact, WorkspaceRole};
    use crate::services::asaas::mock::FailingCall;
    use crate::services::asaas::types::BillingType;
    use crate::services::subscription::tests::harness;
    use crate::services::subscription::BillingError;

    use super::next_monthly_due_date;

    fn seeded_workspace(
        h: &crate::services::subscription::tests::Harness,
        role: WorkspaceRole,
    ) -> (Uuid, Uuid) {
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        h.directory.add_member(workspace_id, caller, role);
        h.directory.set_contact(
            workspace_id,
            BillingContact {
                name: "Ana Souza".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
        );
        (workspace_id, caller)
    }

    #[test]
    fn due_date_is_one_month_out_with_day_clamped() {
        assert_eq!(next_monthly_due_date(date!(2025 - 03 - 15)), "2025-04-15");
        assert_eq!(next_monthly_due_date(date!(2025 - 01 - 31)), "2025-02-28");
        assert_eq!(next_monthly_due_date(date!(2024 - 01 - 31)), "2024-02-29");
        assert_eq!(next_monthly_due_date(date!(2025 - 12 - 10)), "2026-01-10");
    }

    #[tokio::test]
    async fn change_plan_activates_and_clears_trial() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        h.service.start_trial(workspace_id).await.unwrap();

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::CreditCard)
            .await
            .unwrap();

        let record = &transition.record;
        assert_eq!(record.plan, Some(Plan::Pro));
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_mock_1"));
        assert_eq!(record.trial_ends_at, None);
        assert_eq!(record.member_limit, 5);
        assert!(record.last_event_sequence > 0);

        let created = h.gateway.created_subscriptions.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].external_reference, workspace_id.to_string());
        assert_eq!(created[0].cycle, "MONTHLY");
        assert_eq!(created[0].value, 69.0);
    }

    #[tokio::test]
    async fn change_plan_cancels_previous_gateway_subscription() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Admin);
        let mut record = h.service.start_trial(workspace_id).await.unwrap();
        record.external_subscription_id = Some("sub_old".to_string());
        h.store.seed(record);

        h.service
            .change_plan(workspace_id, caller, Plan::Business, BillingType::Pix)
            .await
            .unwrap();

        let cancelled = h.gateway.cancelled_subscriptions.lock().unwrap();
        assert_eq!(cancelled.as_slice(), ["sub_old"]);
    }

    #[tokio::test]
    async fn change_plan_survives_cancel_failure() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        let mut record = h.service.start_trial(workspace_id).await.unwrap();
        record.external_subscription_id = Some("sub_old".to_string());
        h.store.seed(record);
        h.gateway.fail_on(FailingCall::CancelSubscription);

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Starter, BillingType::Boleto)
            .await
            .unwrap();

        assert_eq!(transition.record.plan, Some(Plan::Starter));
        assert_eq!(transition.record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn card_billing_returns_the_hosted_checkout_url() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        h.service.start_trial(workspace_id).await.unwrap();

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::CreditCard)
            .await
            .unwrap();

        assert_eq!(
            transition.checkout_url.as_deref(),
            Some("https://www.asaas.com/c/sub_mock_1")
        );
    }

    #[tokio::test]
    async fn non_card_billing_has_no_checkout_url() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        h.service.start_trial(workspace_id).await.unwrap();

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::Pix)
            .await
            .unwrap();

        assert_eq!(transition.checkout_url, None);
    }

    #[tokio::test]
    async fn change_plan_rejects_plain_members() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Member);
        h.service.start_trial(workspace_id).await.unwrap();

        let err = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::Pix)
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Unauthorized));
    }

    #[tokio::test]
    async fn change_plan_leaves_record_untouched_when_create_fails() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        let before = h.service.start_trial(workspace_id).await.unwrap();
        h.gateway.fail_on(FailingCall::CreateSubscription);

        let err = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::CreditCard)
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::GatewayUnavailable(_)));
        let after = h.store.get(workspace_id).unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.plan, None);
        assert_eq!(after.last_event_sequence, before.last_event_sequence);
    }

    #[tokio::test]
    async fn change_plan_retries_past_watermark_conflicts() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        h.service.start_trial(workspace_id).await.unwrap();
        *h.store.forced_conflicts.lock().unwrap() = 2;

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::Pix)
            .await
            .unwrap();

        assert_eq!(transition.record.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn change_plan_watermark_moves_strictly_forward() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);
        let mut record = h.service.start_trial(workspace_id).await.unwrap();
        // Watermark from the far future, e.g. a clock-skewed webhook.
        record.last_event_sequence = (time::OffsetDateTime::now_utc() + Duration::days(365))
            .unix_timestamp()
            * 1_000;
        let skewed = record.last_event_sequence;
        h.store.seed(record);

        let transition = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::Pix)
            .await
            .unwrap();

        assert_eq!(transition.record.last_event_sequence, skewed + 1);
    }

    #[tokio::test]
    async fn change_plan_for_unknown_workspace_is_not_found() {
        let h = harness();
        let (workspace_id, caller) = seeded_workspace(&h, WorkspaceRole::Owner);

        let err = h
            .service
            .change_plan(workspace_id, caller, Plan::Pro, BillingType::Pix)
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::WorkspaceNotFound));
    }
}
