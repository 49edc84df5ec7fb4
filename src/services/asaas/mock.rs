#![allow(dead_code)]
// Scripted gateway used by service and route tests.

use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{CreateSubscriptionRequest, CustomerProfile, GatewaySubscription};
use super::{AsaasService, AsaasServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailingCall {
    UpsertCustomer,
    CreateSubscription,
    CancelSubscription,
}

#[derive(Default)]
pub struct MockAsaasService {
    pub upserted_customers: Mutex<Vec<CustomerProfile>>,
    pub created_subscriptions: Mutex<Vec<CreateSubscriptionRequest>>,
    pub cancelled_subscriptions: Mutex<Vec<String>>,
    pub failing_call: Mutex<Option<FailingCall>>,
    pub next_subscription_id: Mutex<String>,
}

impl MockAsaasService {
    pub fn new() -> Self {
        Self {
            next_subscription_id: Mutex::new("sub_mock_1".to_string()),
            ..Self::default()
        }
    }

    pub fn fail_on(&self, call: FailingCall) {
        *self.failing_call.lock().unwrap() = Some(call);
    }

    fn check(&self, call: FailingCall) -> Result<(), AsaasServiceError> {
        if *self.failing_call.lock().unwrap() == Some(call) {
            return Err(AsaasServiceError::Unavailable("scripted failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AsaasService for MockAsaasService {
    async fn upsert_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<String, AsaasServiceError> {
        self.check(FailingCall::UpsertCustomer)?;
        self.upserted_customers.lock().unwrap().push(profile.clone());
        Ok(format!("cus_{}", profile.email.replace(['@', '.'], "_")))
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, AsaasServiceError> {
        self.check(FailingCall::CreateSubscription)?;
        self.created_subscriptions.lock().unwrap().push(request.clone());
        Ok(GatewaySubscription {
            id: self.next_subscription_id.lock().unwrap().clone(),
            status: "ACTIVE".to_string(),
            external_reference: Some(request.external_reference.clone()),
        })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AsaasServiceError> {
        self.check(FailingCall::CancelSubscription)?;
        self.cancelled_subscriptions
            .lock()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }
}
