// teamseat-service/src/services/customers.rs
use crate::utils::config::BillingConfig;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

// Resolves a billing customer reference to the e-mail on file
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// `Ok(None)` when the customer exists but has no e-mail, or is unknown.
    async fn customer_email(&self, customer_ref: &str) -> Result<Option<String>, String>;
}

#[derive(Deserialize)]
struct Customer {
    #[serde(default)]
    email: Option<String>,
}

pub struct StripeCustomers {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeCustomers {
    pub fn new(config: &BillingConfig, timeout_secs: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }
}

#[async_trait]
impl CustomerDirectory for StripeCustomers {
    async fn customer_email(&self, customer_ref: &str) -> Result<Option<String>, String> {
        let response = self
            .client
            .get(format!("{}/customers/{}", self.api_base, customer_ref))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        debug!("Billing customer lookup {} -> {}", customer_ref, response.status());

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(format!("billing API returned {}", response.status()));
        }

        let customer: Customer = response.json().await.map_err(|e| e.to_string())?;
        Ok(customer.email.filter(|e| !e.trim().is_empty()))
    }
}
