use async_trait::async_trait;
use sqlx::PgPool;

use super::gateway_event_log_repository::GatewayEventLogRepository;

pub struct PostgresGatewayEventLogRepository {
    pub pool: PgPool,
}

#[async_trait]
impl GatewayEventLogRepository for PostgresGatewayEventLogRepository {
    async fn has_processed_event(&self, event_id: &str) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM gateway_event_log WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }

    async fn record_event(&self, event_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO gateway_event_log (event_id)
            VALUES ($1)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
