use async_trait::async_trait;
use uuid::Uuid;

use crate::models::workspace::{BillingContact, WorkspaceRole};

#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    /// Role of `user_id` in the workspace, or `None` when not a member.
    async fn member_role(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<WorkspaceRole>, sqlx::Error>;

    /// Billing contact for the workspace (owner profile, workspace name as
    /// fallback). `None` when the workspace does not exist.
    async fn billing_contact(
        &self,
        workspace_id: Uuid,
    ) -> Result<Option<BillingContact>, sqlx::Error>;
}
