// teamseat-service/src/models/billing.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";

// Envelope of a billing webhook delivery, only the parts we read
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BillingEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: BillingEventData,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BillingEventData {
    pub object: serde_json::Value,
    #[serde(default)]
    pub previous_attributes: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub customer: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: SubscriptionItems,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SubscriptionItem {
    #[serde(default)]
    pub price: Option<Price>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Price {
    #[serde(default)]
    pub product: Option<String>,
}

impl SubscriptionItems {
    fn first_product(&self) -> Option<&str> {
        self.data
            .first()
            .and_then(|item| item.price.as_ref())
            .and_then(|price| price.product.as_deref())
    }
}

impl BillingEventData {
    // Product the subscription had before this update, when the items changed
    pub fn previous_product(&self) -> Option<String> {
        let items = self.previous_attributes.as_ref()?.get("items")?;
        let items: SubscriptionItems = serde_json::from_value(items.clone()).ok()?;
        items.first_product().map(str::to_string)
    }
}

impl Subscription {
    // Product of the first line item
    pub fn product_id(&self) -> Option<&str> {
        self.items.first_product()
    }

    pub fn is_live(&self) -> bool {
        matches!(self.status.as_deref(), Some("active") | Some("trialing"))
    }
}
