use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::config::AsaasSettings;

use super::types::{
    CreateSubscriptionRequest, CustomerProfile, CustomerResource, GatewaySubscription,
    ListResponse,
};
use super::{AsaasService, AsaasServiceError};

pub struct LiveAsaasService {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LiveAsaasService {
    pub fn new(settings: &AsaasSettings) -> Self {
        // Startup-only; a client without the configured timeout is worse
        // than refusing to boot.
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .expect("Failed to build Asaas HTTP client");

        Self {
            client,
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_error(response: reqwest::Response) -> AsaasServiceError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            AsaasServiceError::Unavailable(format!("{status}: {body}"))
        } else {
            AsaasServiceError::Rejected(format!("{status}: {body}"))
        }
    }
}

#[async_trait]
impl AsaasService for LiveAsaasService {
    async fn upsert_customer(
        &self,
        profile: &CustomerProfile,
    ) -> Result<String, AsaasServiceError> {
        // Lookup and update are best-effort; a fresh create below covers
        // both a missing customer and a failed lookup.
        let lookup = self
            .client
            .get(self.url("/customers"))
            .header("access_token", &self.api_key)
            .query(&[("email", profile.email.as_str())])
            .send()
            .await;

        if let Ok(response) = lookup {
            if response.status().is_success() {
                let listed: Result<ListResponse<CustomerResource>, _> = response.json().await;
                if let Ok(listed) = listed {
                    if let Some(existing) = listed.data.first() {
                        let update = self
                            .client
                            .put(self.url(&format!("/customers/{}", existing.id)))
                            .header("access_token", &self.api_key)
                            .json(profile)
                            .send()
                            .await;

                        if let Err(err) = update {
                            warn!(error = %err, "customer update failed, keeping existing record");
                        }

                        return Ok(existing.id.clone());
                    }
                }
            }
        }

        let response = self
            .client
            .post(self.url("/customers"))
            .header("access_token", &self.api_key)
            .json(profile)
            .send()
            .await
            .map_err(|err| AsaasServiceError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let created: CustomerResource = response
            .json()
            .await
            .map_err(|err| AsaasServiceError::Unavailable(err.to_string()))?;

        Ok(created.id)
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, AsaasServiceError> {
        let response = self
            .client
            .post(self.url("/subscriptions"))
            .header("access_token", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| AsaasServiceError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let created: GatewaySubscription = response
            .json()
            .await
            .map_err(|err| AsaasServiceError::Unavailable(err.to_string()))?;

        Ok(created)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AsaasServiceError> {
        let response = self
            .client
            .delete(self.url(&format!("/subscriptions/{subscription_id}")))
            .header("access_token", &self.api_key)
            .send()
            .await
            .map_err(|err| AsaasServiceError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_client_error() {
            // Already gone, or the gateway refuses to cancel it again. The
            // replacement subscription proceeds either way.
            if status != StatusCode::NOT_FOUND {
                warn!(%subscription_id, %status, "cancel refused by gateway, treating as done");
            }
            return Ok(());
        }

        Err(Self::read_error(response).await)
    }
}
