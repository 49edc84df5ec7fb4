use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "workspace_role")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
}

impl WorkspaceRole {
    /// Only owners and admins may change the workspace plan.
    pub fn can_manage_billing(&self) -> bool {
        matches!(self, WorkspaceRole::Owner | WorkspaceRole::Admin)
    }
}

/// Who the gateway should bill for a workspace. Sourced from the owner's
/// profile; falls back to the workspace name when the profile has no name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_and_admin_manage_billing() {
        assert!(WorkspaceRole::Owner.can_manage_billing());
        assert!(WorkspaceRole::Admin.can_manage_billing());
        assert!(!WorkspaceRole::Member.can_manage_billing());
    }
}
