use serde::{Deserialize, Serialize};

/// Billing methods the gateway accepts for recurring charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingType {
    Boleto,
    CreditCard,
    Pix,
    DebitCard,
}

/// Customer payload for create/update. The gateway keys idempotence on the
/// email, not on this struct's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    /// Gateway customer id, from `upsert_customer`.
    pub customer: String,
    pub billing_type: BillingType,
    pub value: f64,
    /// First charge date, `YYYY-MM-DD`.
    pub next_due_date: String,
    pub cycle: String,
    pub description: String,
    /// Workspace id; echoed back on every webhook so events can be
    /// correlated without a side table.
    pub external_reference: String,
}

/// Subset of the gateway's subscription resource we act on. The status stays
/// a raw string here; it is translated into the local vocabulary at the
/// reconciliation seam only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Inbound webhook delivery. The gateway sends a discriminating `event` name
/// plus optional payment and/or subscription sub-objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasWebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    pub event: String,
    /// `YYYY-MM-DD HH:MM:SS`, the gateway's emission time. Used as the
    /// ordering watermark when present.
    #[serde(default)]
    pub date_created: Option<String>,
    #[serde(default)]
    pub payment: Option<PaymentPayload>,
    #[serde(default)]
    pub subscription: Option<SubscriptionPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub id: String,
    /// Gateway subscription id this charge belongs to, when recurring.
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPayload {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Paged list envelope the gateway wraps collection responses in.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerResource {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billing_type_serializes_in_gateway_vocabulary() {
        assert_eq!(
            serde_json::to_string(&BillingType::CreditCard).unwrap(),
            "\"CREDIT_CARD\""
        );
        assert_eq!(serde_json::to_string(&BillingType::Pix).unwrap(), "\"PIX\"");
    }

    #[test]
    fn webhook_event_parses_with_partial_payloads() {
        let raw = serde_json::json!({
            "id": "evt_0001",
            "event": "PAYMENT_CONFIRMED",
            "dateCreated": "2025-03-01 12:00:00",
            "payment": {
                "id": "pay_123",
                "subscription": "sub_123",
                "status": "CONFIRMED",
                "externalReference": "7c9e6679-7425-40de-944b-e07fc1f90ae7"
            }
        });

        let event: AsaasWebhookEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event, "PAYMENT_CONFIRMED");
        assert!(event.subscription.is_none());
        let payment = event.payment.unwrap();
        assert_eq!(payment.subscription.as_deref(), Some("sub_123"));
        assert!(payment.external_reference.is_some());
    }
}
