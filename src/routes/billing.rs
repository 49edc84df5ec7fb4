use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::plan::Plan;
use crate::models::subscription::SubscriptionView;
use crate::responses::JsonResponse;
use crate::routes::auth::AuthUser;
use crate::services::asaas::types::BillingType;
use crate::services::subscription::BillingError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SubscriptionQuery {
    pub workspace_id: Uuid,
}

#[derive(Deserialize)]
pub struct ChangePlanRequest {
    pub workspace_id: Uuid,
    pub plan: Plan,
    pub billing_type: BillingType,
}

/// Plan-change response. `checkout_url` is present for card billing only;
/// the frontend redirects there so the buyer can finish paying.
#[derive(Serialize)]
pub struct ChangePlanResponse {
    #[serde(flatten)]
    pub subscription: SubscriptionView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

pub async fn get_subscription(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<SubscriptionQuery>,
) -> Response {
    match app_state
        .subscriptions
        .current_subscription(query.workspace_id, auth.user_id)
        .await
    {
        Ok(record) => Json(SubscriptionView::from(&record)).into_response(),
        Err(err) => billing_error_response(err),
    }
}

pub async fn change_plan(
    State(app_state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ChangePlanRequest>,
) -> Response {
    match app_state
        .subscriptions
        .change_plan(
            request.workspace_id,
            auth.user_id,
            request.plan,
            request.billing_type,
        )
        .await
    {
        Ok(transition) => Json(ChangePlanResponse {
            subscription: SubscriptionView::from(&transition.record),
            checkout_url: transition.checkout_url,
        })
        .into_response(),
        Err(err) => billing_error_response(err),
    }
}

// Provider error text never reaches the client; it lands in the logs only.
fn billing_error_response(err: BillingError) -> Response {
    match err {
        BillingError::Unauthorized => {
            JsonResponse::forbidden("You are not allowed to manage billing for this workspace")
                .into_response()
        }
        BillingError::WorkspaceNotFound => {
            JsonResponse::not_found("Workspace subscription not found").into_response()
        }
        BillingError::GatewayRejected(msg) => {
            warn!(error = %msg, "gateway rejected a billing request");
            JsonResponse::error_with_code(
                StatusCode::BAD_REQUEST,
                "The payment provider rejected the request",
                "gateway_rejected",
            )
            .into_response()
        }
        BillingError::GatewayUnavailable(msg) => {
            error!(error = %msg, "gateway unavailable during a billing request");
            JsonResponse::error_with_code(
                StatusCode::SERVICE_UNAVAILABLE,
                "The payment provider is temporarily unavailable, try again shortly",
                "gateway_unavailable",
            )
            .into_response()
        }
        BillingError::Database(err) => {
            error!(error = %err, "billing request failed on the database");
            JsonResponse::server_error("Something went wrong").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, post};
    use axum::{Extension, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::{AsaasSettings, Config};
    use crate::db::mock_db::{MockGatewayEventLog, MockSubscriptionStore, MockWorkspaceDirectory};
    use crate::models::workspace::{BillingContact, WorkspaceRole};
    use crate::routes::auth::AuthUser;
    use crate::services::asaas::mock::{FailingCall, MockAsaasService};
    use crate::services::subscription::SubscriptionService;
    use crate::state::AppState;

    use super::{change_plan, get_subscription};

    struct TestApp {
        store: Arc<MockSubscriptionStore>,
        directory: Arc<MockWorkspaceDirectory>,
        gateway: Arc<MockAsaasService>,
        state: AppState,
    }

    fn test_app() -> TestApp {
        let store = Arc::new(MockSubscriptionStore::new());
        let directory = Arc::new(MockWorkspaceDirectory::new());
        let gateway = Arc::new(MockAsaasService::new());
        let event_log = Arc::new(MockGatewayEventLog::new());

        let service = Arc::new(SubscriptionService::new(
            store.clone(),
            directory.clone(),
            gateway.clone(),
            event_log,
            7,
        ));
        let config = Arc::new(Config {
            database_url: String::new(),
            frontend_origin: "http://localhost:5173".to_string(),
            trial_days: 7,
            asaas: AsaasSettings {
                api_url: "http://localhost".to_string(),
                api_key: "test-key".to_string(),
                webhook_token: Some("whsec".to_string()),
                timeout_seconds: 5,
            },
        });

        let state = AppState {
            subscriptions: service,
            config,
        };

        TestApp {
            store,
            directory,
            gateway,
            state,
        }
    }

    fn router(state: AppState, caller: Uuid) -> Router {
        Router::new()
            .route("/api/billing/subscription", get(get_subscription))
            .route("/api/billing/plan", post(change_plan))
            .layer(Extension(AuthUser { user_id: caller }))
            .with_state(state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_subscription_renders_the_view_for_members() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        app.directory
            .add_member(workspace_id, caller, WorkspaceRole::Member);
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();

        let response = router(app.state.clone(), caller)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/billing/subscription?workspace_id={workspace_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "trialing");
        assert_eq!(json["member_limit"], 15);
        assert!(json["trial_ends_at"].is_string());
    }

    #[tokio::test]
    async fn get_subscription_rejects_non_members() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();

        let response = router(app.state.clone(), Uuid::new_v4())
            .oneshot(
                Request::builder()
                    .uri(format!("/api/billing/subscription?workspace_id={workspace_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn change_plan_returns_the_updated_view() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        app.directory
            .add_member(workspace_id, caller, WorkspaceRole::Owner);
        app.directory.set_contact(
            workspace_id,
            BillingContact {
                name: "Ana Souza".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
        );
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();

        let response = router(app.state.clone(), caller)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/billing/plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "workspace_id": workspace_id,
                            "plan": "pro",
                            "billing_type": "PIX"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["plan"], "pro");
        assert_eq!(json["status"], "active");
        assert_eq!(json["member_limit"], 5);
        // Pix charges through its own channel, no hosted checkout.
        assert!(json.get("checkout_url").is_none());
        assert_eq!(app.gateway.created_subscriptions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn change_plan_with_card_returns_a_checkout_url() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        app.directory
            .add_member(workspace_id, caller, WorkspaceRole::Owner);
        app.directory.set_contact(
            workspace_id,
            BillingContact {
                name: "Ana Souza".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
        );
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();

        let response = router(app.state.clone(), caller)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/billing/plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "workspace_id": workspace_id,
                            "plan": "pro",
                            "billing_type": "CREDIT_CARD"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["checkout_url"], "https://www.asaas.com/c/sub_mock_1");
        assert_eq!(json["plan"], "pro");
    }

    #[tokio::test]
    async fn change_plan_maps_gateway_outage_to_503_with_code() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        app.directory
            .add_member(workspace_id, caller, WorkspaceRole::Owner);
        app.directory.set_contact(
            workspace_id,
            BillingContact {
                name: "Ana Souza".to_string(),
                email: "ana@example.com".to_string(),
                phone: None,
            },
        );
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();
        app.gateway.fail_on(FailingCall::CreateSubscription);

        let response = router(app.state.clone(), caller)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/billing/plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "workspace_id": workspace_id,
                            "plan": "business",
                            "billing_type": "BOLETO"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["code"], "gateway_unavailable");

        // Local record stayed on the trial.
        let record = app.store.get(workspace_id).unwrap();
        assert_eq!(record.plan, None);
    }

    #[tokio::test]
    async fn change_plan_is_owner_or_admin_only() {
        let app = test_app();
        let workspace_id = Uuid::new_v4();
        let caller = Uuid::new_v4();
        app.directory
            .add_member(workspace_id, caller, WorkspaceRole::Member);
        app.state
            .subscriptions
            .start_trial(workspace_id)
            .await
            .unwrap();

        let response = router(app.state.clone(), caller)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/billing/plan")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({
                            "workspace_id": workspace_id,
                            "plan": "starter",
                            "billing_type": "CREDIT_CARD"
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let app = test_app();

        let response = Router::new()
            .route("/api/billing/subscription", get(get_subscription))
            .with_state(app.state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!(
                        "/api/billing/subscription?workspace_id={}",
                        Uuid::new_v4()
                    ))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
