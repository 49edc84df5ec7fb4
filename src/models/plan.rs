use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Paid tiers sold through the billing gateway. A workspace that has never
/// picked a plan carries `None` (trial-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_plan")]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Starter,
    Pro,
    Business,
}

impl Plan {
    /// Member seats included when the plan itself is authoritative
    /// (i.e. the workspace is not trialing).
    pub fn base_member_limit(&self) -> i32 {
        match self {
            Plan::Starter => 1,
            Plan::Pro => 5,
            Plan::Business => 15,
        }
    }

    pub fn config(&self) -> PlanConfig {
        match self {
            Plan::Starter => PlanConfig {
                value: 49.00,
                name: "Starter",
                description: "Plano Starter - Symples",
            },
            Plan::Pro => PlanConfig {
                value: 69.00,
                name: "Pro",
                description: "Plano Pro - Symples",
            },
            Plan::Business => PlanConfig {
                value: 129.00,
                name: "Business",
                description: "Plano Business - Symples",
            },
        }
    }
}

/// Monthly price and gateway charge copy for a plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanConfig {
    /// Monthly value in BRL, as the gateway expects it.
    pub value: f64,
    /// Display name shown in billing copy and logs.
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status")]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Canceled,
}

/// Seat limit for a (plan, status) pair. Trialing workspaces get the top
/// tier's limit regardless of plan; a missing plan falls back to the lowest
/// tier rather than unlimited.
pub fn member_limit(plan: Option<Plan>, status: SubscriptionStatus) -> i32 {
    if status == SubscriptionStatus::Trialing {
        return Plan::Business.base_member_limit();
    }

    match plan {
        Some(plan) => plan.base_member_limit(),
        None => Plan::Starter.base_member_limit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trialing_always_grants_the_business_limit() {
        for plan in [None, Some(Plan::Starter), Some(Plan::Pro), Some(Plan::Business)] {
            assert_eq!(member_limit(plan, SubscriptionStatus::Trialing), 15);
        }
    }

    #[test]
    fn non_trialing_limits_follow_the_plan() {
        for status in [
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
        ] {
            assert_eq!(member_limit(Some(Plan::Starter), status), 1);
            assert_eq!(member_limit(Some(Plan::Pro), status), 5);
            assert_eq!(member_limit(Some(Plan::Business), status), 15);
        }
    }

    #[test]
    fn missing_plan_fails_closed_to_the_lowest_limit() {
        assert_eq!(member_limit(None, SubscriptionStatus::Active), 1);
        assert_eq!(member_limit(None, SubscriptionStatus::Canceled), 1);
    }

    #[test]
    fn plan_prices_match_the_published_table() {
        assert_eq!(Plan::Starter.config().value, 49.00);
        assert_eq!(Plan::Pro.config().value, 69.00);
        assert_eq!(Plan::Business.config().value, 129.00);
    }

    #[test]
    fn plan_display_names_match_the_published_table() {
        assert_eq!(Plan::Starter.config().name, "Starter");
        assert_eq!(Plan::Pro.config().name, "Pro");
        assert_eq!(Plan::Business.config().name, "Business");
    }
}
