//! Backend endpoint descriptors
//!
//! An [`Endpoint`] names one logical backend operation together with the
//! parameters interpolated into its path. Equality over descriptors is what
//! feeds request fingerprinting, so two descriptors are equal exactly when
//! their variant and parameters match.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::impl_tag_conversions;

/// HTTP verb used by an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

impl_tag_conversions!(HttpMethod {
    Get => "get",
    Post => "post",
});

impl HttpMethod {
    /// Uppercase verb as it appears on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One logical backend operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "endpoint", rename_all = "snake_case")]
pub enum Endpoint {
    GetCustomerInfo { app_user_id: String },
    PostReceipt,
    GetOfferings { app_user_id: String },
    LogIn,
    GetProductEntitlementMapping,
    GetVirtualCurrencies { app_user_id: String },
    WebBillingGetProducts { app_user_id: String, product_ids: BTreeSet<String> },
    PostDiagnostics,
    PostPaywallEvents,
    PostRedeemWebPurchase,
    PostCreateSupportTicket,
    GetCustomerCenterConfig { app_user_id: String },
}

impl Endpoint {
    pub const fn method(&self) -> HttpMethod {
        match self {
            Self::GetCustomerInfo { .. }
            | Self::GetOfferings { .. }
            | Self::GetProductEntitlementMapping
            | Self::GetVirtualCurrencies { .. }
            | Self::WebBillingGetProducts { .. }
            | Self::GetCustomerCenterConfig { .. } => HttpMethod::Get,
            Self::PostReceipt
            | Self::LogIn
            | Self::PostDiagnostics
            | Self::PostPaywallEvents
            | Self::PostRedeemWebPurchase
            | Self::PostCreateSupportTicket => HttpMethod::Post,
        }
    }

    /// Stable name used in logs and metrics labels.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetCustomerInfo { .. } => "get_customer_info",
            Self::PostReceipt => "post_receipt",
            Self::GetOfferings { .. } => "get_offerings",
            Self::LogIn => "log_in",
            Self::GetProductEntitlementMapping => "get_product_entitlement_mapping",
            Self::GetVirtualCurrencies { .. } => "get_virtual_currencies",
            Self::WebBillingGetProducts { .. } => "web_billing_get_products",
            Self::PostDiagnostics => "post_diagnostics",
            Self::PostPaywallEvents => "post_paywall_events",
            Self::PostRedeemWebPurchase => "post_redeem_web_purchase",
            Self::PostCreateSupportTicket => "post_create_support_ticket",
            Self::GetCustomerCenterConfig { .. } => "get_customer_center_config",
        }
    }

    /// Path relative to the base URL, with parameters percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Self::GetCustomerInfo { app_user_id } => format!("/subscribers/{}", encode(app_user_id)),
            Self::PostReceipt => "/receipts".to_string(),
            Self::GetOfferings { app_user_id } => {
                format!("/subscribers/{}/offerings", encode(app_user_id))
            }
            Self::LogIn => "/subscribers/identify".to_string(),
            Self::GetProductEntitlementMapping => "/product_entitlement_mapping".to_string(),
            Self::GetVirtualCurrencies { app_user_id } => {
                format!("/subscribers/{}/virtual_currencies", encode(app_user_id))
            }
            Self::WebBillingGetProducts { app_user_id, product_ids } => {
                let query = product_ids
                    .iter()
                    .map(|id| format!("id={}", encode(id)))
                    .collect::<Vec<_>>()
                    .join("&");
                if query.is_empty() {
                    format!("/web-billing/{}/products", encode(app_user_id))
                } else {
                    format!("/web-billing/{}/products?{query}", encode(app_user_id))
                }
            }
            Self::PostDiagnostics => "/diagnostics".to_string(),
            Self::PostPaywallEvents => "/paywalls/events".to_string(),
            Self::PostRedeemWebPurchase => "/subscribers/redeem_purchase".to_string(),
            Self::PostCreateSupportTicket => "/customercenter/support/create-ticket".to_string(),
            Self::GetCustomerCenterConfig { app_user_id } => {
                format!("/customercenter/{}", encode(app_user_id))
            }
        }
    }

    /// Whether the transport may retry this endpoint against fallback hosts.
    pub const fn supports_fallback_base_urls(&self) -> bool {
        matches!(self, Self::GetOfferings { .. } | Self::GetProductEntitlementMapping)
    }

    /// Whether responses for this endpoint may carry a signature to verify.
    pub const fn supports_signature_verification(&self) -> bool {
        matches!(
            self,
            Self::GetCustomerInfo { .. }
                | Self::PostReceipt
                | Self::GetOfferings { .. }
                | Self::LogIn
                | Self::GetProductEntitlementMapping
                | Self::GetVirtualCurrencies { .. }
                | Self::PostRedeemWebPurchase
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method().as_str(), self.path())
    }
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
