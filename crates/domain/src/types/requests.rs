//! Request inputs for the write endpoints
//!
//! Bodies are serialized with `skip_serializing_if` on optional fields and then
//! canonicalised again before fingerprinting, so a `None` here and an explicit
//! JSON null produce the same key.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::impl_tag_conversions;

/// Why a receipt is being posted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiationSource {
    Purchase,
    Restore,
    Queue,
}

impl_tag_conversions!(InitiationSource {
    Purchase => "purchase",
    Restore => "restore",
    Queue => "queue",
});

/// A subscriber attribute as the backend expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberAttribute {
    pub value: Option<String>,
    pub updated_at_ms: i64,
}

/// Everything the receipts endpoint needs for one purchase or restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptSubmission {
    pub fetch_token: String,
    pub app_user_id: String,
    pub is_restore: bool,
    #[serde(default)]
    pub observer_mode: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub product_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presented_offering_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presented_placement_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marketplace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_plan_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiation_source: Option<InitiationSource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, SubscriberAttribute>,
}

impl ReceiptSubmission {
    pub fn new(app_user_id: impl Into<String>, fetch_token: impl Into<String>) -> Self {
        Self {
            fetch_token: fetch_token.into(),
            app_user_id: app_user_id.into(),
            is_restore: false,
            observer_mode: false,
            product_ids: Vec::new(),
            presented_offering_identifier: None,
            presented_placement_identifier: None,
            price: None,
            currency: None,
            store_user_id: None,
            marketplace: None,
            base_plan_id: None,
            initiation_source: None,
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn restore(mut self, is_restore: bool) -> Self {
        self.is_restore = is_restore;
        self
    }

    #[must_use]
    pub fn with_product_ids(mut self, product_ids: Vec<String>) -> Self {
        self.product_ids = product_ids;
        self
    }

    #[must_use]
    pub fn with_presented_offering(mut self, offering_id: impl Into<String>) -> Self {
        self.presented_offering_identifier = Some(offering_id.into());
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: f64, currency: impl Into<String>) -> Self {
        self.price = Some(price);
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn with_store_user_id(mut self, store_user_id: impl Into<String>) -> Self {
        self.store_user_id = Some(store_user_id.into());
        self
    }

    #[must_use]
    pub fn with_base_plan_id(mut self, base_plan_id: impl Into<String>) -> Self {
        self.base_plan_id = Some(base_plan_id.into());
        self
    }

    #[must_use]
    pub const fn with_initiation_source(mut self, source: InitiationSource) -> Self {
        self.initiation_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, attribute: SubscriberAttribute) -> Self {
        self.attributes.insert(key.into(), attribute);
        self
    }
}

/// Lifecycle event emitted by a paywall screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaywallEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: PaywallEventType,
    pub app_user_id: String,
    pub session_id: Uuid,
    pub offering_id: String,
    pub paywall_revision: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl PaywallEvent {
    pub fn new(
        event_type: PaywallEventType,
        app_user_id: impl Into<String>,
        session_id: Uuid,
        offering_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            app_user_id: app_user_id.into(),
            session_id,
            offering_id: offering_id.into(),
            paywall_revision: 0,
            timestamp,
            display_mode: None,
            locale: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaywallEventType {
    Impression,
    Cancel,
    Close,
}

impl_tag_conversions!(PaywallEventType {
    Impression => "impression",
    Cancel => "cancel",
    Close => "close",
});

/// One diagnostics record; `properties` is free-form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsEntry {
    pub id: Uuid,
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl DiagnosticsEntry {
    pub const VERSION: u32 = 1;

    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: Self::VERSION,
            name: name.into(),
            properties: BTreeMap::new(),
            timestamp,
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}
