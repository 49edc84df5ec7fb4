use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::subscription::SubscriptionRecord;

use super::subscription_repository::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find(&self, workspace_id: Uuid) -> Result<Option<SubscriptionRecord>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionRecord>(
            r#"
            SELECT workspace_id, plan, status, external_subscription_id,
                   trial_ends_at, member_limit, updated_at, last_event_sequence
            FROM workspace_subscriptions
            WHERE workspace_id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_trial(&self, record: &SubscriptionRecord) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO workspace_subscriptions
                (workspace_id, plan, status, external_subscription_id,
                 trial_ends_at, member_limit, updated_at, last_event_sequence)
            VALUES ($1, $2, $3, $4, $5, $6, now(), $7)
            ON CONFLICT (workspace_id) DO NOTHING
            "#,
        )
        .bind(record.workspace_id)
        .bind(record.plan)
        .bind(record.status)
        .bind(record.external_subscription_id.as_deref())
        .bind(record.trial_ends_at)
        .bind(record.member_limit)
        .bind(record.last_event_sequence)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn compare_and_update(
        &self,
        expected_sequence: i64,
        record: &SubscriptionRecord,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE workspace_subscriptions
            SET plan = $3,
                status = $4,
                external_subscription_id = $5,
                trial_ends_at = $6,
                member_limit = $7,
                updated_at = now(),
                last_event_sequence = $8
            WHERE workspace_id = $1 AND last_event_sequence = $2
            "#,
        )
        .bind(record.workspace_id)
        .bind(expected_sequence)
        .bind(record.plan)
        .bind(record.status)
        .bind(record.external_subscription_id.as_deref())
        .bind(record.trial_ends_at)
        .bind(record.member_limit)
        .bind(record.last_event_sequence)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
