use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::workspace::{BillingContact, WorkspaceRole};

use super::workspace_repository::WorkspaceRepository;

pub struct PostgresWorkspaceRepository {
    pub pool: PgPool,
}

#[async_trait]
impl WorkspaceRepository for PostgresWorkspaceRepository {
    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceRole>, sqlx::Error> {
        sqlx::query_scalar::<_, WorkspaceRole>(
            r#"
            SELECT role
            FROM workspace_members
            WHERE workspace_id = $1 AND user_id = $2
            "#,
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn billing_contact(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<BillingContact>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(p.full_name, w.name) AS name,
                   p.email,
                   p.whatsapp
            FROM workspaces w
            JOIN profiles p ON p.id = w.owner_id
            WHERE w.id = $1
            "#,
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| BillingContact {
            name: row.get("name"),
            email: row.get("email"),
            phone: row.get("whatsapp"),
        }))
    }
}
