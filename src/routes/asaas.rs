use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, info, warn};

use crate::responses::JsonResponse;
use crate::services::asaas::types::AsaasWebhookEvent;
use crate::services::subscription::reconcile::ApplyOutcome;
use crate::state::AppState;

/// Webhook receiver for the payment gateway. Always acknowledges with
/// `{"received": true}` once the event was looked at; only an internal
/// failure answers 500 so the gateway queues a redelivery.
pub async fn asaas_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    if let Some(expected) = app_state.config.asaas.webhook_token.as_deref() {
        let provided = headers
            .get("asaas-access-token")
            .and_then(|h| h.to_str().ok());
        if provided != Some(expected) {
            warn!("asaas webhook rejected, missing or wrong access token");
            return JsonResponse::unauthorized("invalid webhook token").into_response();
        }
    }

    let event: AsaasWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            warn!(error = %err, "asaas webhook with unparseable payload");
            return JsonResponse::bad_request("invalid webhook payload").into_response();
        }
    };

    match app_state.subscriptions.apply_event(&event).await {
        Ok(outcome) => {
            if outcome == ApplyOutcome::Applied {
                info!(event = %event.event, "asaas webhook applied");
            }
            Json(json!({ "received": true })).into_response()
        }
        Err(err) => {
            error!(error = %err, event = %event.event, "asaas webhook processing failed");
            JsonResponse::server_error("webhook processing failed").into_response()
        }
    }
}
