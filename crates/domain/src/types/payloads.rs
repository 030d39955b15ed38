//! Success payloads parsed from backend responses
//!
//! Only the fields the core needs to recognise a well-formed response are
//! typed. The full JSON is kept alongside so higher layers can build their
//! own domain objects without a second parse.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Customer state as returned by the subscribers endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub subscriber: Subscriber,
    #[serde(default)]
    pub request_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub raw: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub original_app_user_id: String,
    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entitlements: HashMap<String, Value>,
    #[serde(default)]
    pub subscriptions: HashMap<String, Value>,
    #[serde(default)]
    pub non_subscriptions: HashMap<String, Value>,
    #[serde(default)]
    pub management_url: Option<String>,
}

/// Result of logging in as a (possibly new) app user
#[derive(Debug, Clone, PartialEq)]
pub struct LogInResult {
    pub customer_info: CustomerInfo,
    /// True when the backend created the user (HTTP 201)
    pub created: bool,
}

/// Offerings catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offerings {
    #[serde(default)]
    pub current_offering_id: Option<String>,
    pub offerings: Vec<Offering>,
    #[serde(skip)]
    pub raw: Value,
}

impl Offerings {
    pub fn current(&self) -> Option<&Offering> {
        let current = self.current_offering_id.as_deref()?;
        self.offerings.iter().find(|offering| offering.identifier == current)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub identifier: String,
    pub platform_product_identifier: String,
    #[serde(default)]
    pub platform_product_plan_identifier: Option<String>,
}

/// Mapping from store products to the entitlements they unlock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntitlementMapping {
    #[serde(rename = "product_entitlement_mapping")]
    pub mappings: HashMap<String, ProductEntitlementEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntitlementEntry {
    pub product_identifier: String,
    #[serde(default)]
    pub base_plan_id: Option<String>,
    pub entitlements: Vec<String>,
}

/// Virtual currency balances for a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCurrencies {
    pub virtual_currencies: HashMap<String, VirtualCurrency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualCurrency {
    pub balance: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Web billing catalog for a set of product identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebBillingProducts {
    pub product_details: Vec<WebBillingProduct>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebBillingProduct {
    pub identifier: String,
    pub product_type: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_purchase_option_id: Option<String>,
    #[serde(default)]
    pub purchase_options: HashMap<String, Value>,
}

/// Raw acknowledgement of a diagnostics batch
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsResponse {
    pub raw: Value,
}

/// Outcome of a support ticket submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportTicketResult {
    pub sent: bool,
}

/// Customer center screen configuration, passed through untyped
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerCenterConfig {
    pub raw: Value,
}
