//! Endpoint response parsers
//!
//! Each parser turns a raw [`TransportResult`] into the endpoint's payload or
//! a classified [`BackendError`]. Non-success statuses always go through
//! [`ErrorClassifier::classify_response`].

use serde::de::DeserializeOwned;
use serde_json::Value;
use tollgate_domain::{
    BackendError, CustomerCenterConfig, CustomerInfo, DiagnosticsResponse, LogInResult, Offerings,
    ProductEntitlementMapping, SupportTicketResult, TransportResult, VirtualCurrencies,
    WebBillingProducts,
};

use crate::classifier::ErrorClassifier;

/// Signature shared by every endpoint parser
pub type Parser<T> = fn(&TransportResult) -> Result<T, BackendError>;

/// Deserialize a success body into `T`; classify anything else.
pub fn json<T: DeserializeOwned>(result: &TransportResult) -> Result<T, BackendError> {
    let value = raw_json(result)?;
    serde_json::from_value(value)
        .map_err(|err| ErrorClassifier::malformed_payload(result.status, err))
}

pub fn customer_info(result: &TransportResult) -> Result<CustomerInfo, BackendError> {
    let raw = raw_json(result)?;
    let mut info: CustomerInfo = serde_json::from_value(raw.clone())
        .map_err(|err| ErrorClassifier::malformed_payload(result.status, err))?;
    info.raw = raw;
    Ok(info)
}

pub fn log_in(result: &TransportResult) -> Result<LogInResult, BackendError> {
    let customer_info = customer_info(result)?;
    Ok(LogInResult { customer_info, created: result.status == 201 })
}

pub fn offerings(result: &TransportResult) -> Result<Offerings, BackendError> {
    let raw = raw_json(result)?;
    let mut offerings: Offerings = serde_json::from_value(raw.clone())
        .map_err(|err| ErrorClassifier::malformed_payload(result.status, err))?;
    offerings.raw = raw;
    Ok(offerings)
}

pub fn product_entitlement_mapping(
    result: &TransportResult,
) -> Result<ProductEntitlementMapping, BackendError> {
    json(result)
}

pub fn virtual_currencies(result: &TransportResult) -> Result<VirtualCurrencies, BackendError> {
    json(result)
}

pub fn web_billing_products(result: &TransportResult) -> Result<WebBillingProducts, BackendError> {
    json(result)
}

pub fn diagnostics(result: &TransportResult) -> Result<DiagnosticsResponse, BackendError> {
    raw_json(result).map(|raw| DiagnosticsResponse { raw })
}

/// Paywall events carry no payload; any 2xx is success.
pub fn paywall_events(result: &TransportResult) -> Result<(), BackendError> {
    if result.is_success() {
        Ok(())
    } else {
        Err(ErrorClassifier::classify_response(result))
    }
}

pub fn support_ticket(result: &TransportResult) -> Result<SupportTicketResult, BackendError> {
    json(result)
}

pub fn customer_center_config(
    result: &TransportResult,
) -> Result<CustomerCenterConfig, BackendError> {
    raw_json(result).map(|raw| CustomerCenterConfig { raw })
}

pub fn redeem_web_purchase(result: &TransportResult) -> Result<CustomerInfo, BackendError> {
    customer_info(result)
        .map_err(|err| ErrorClassifier::enrich_redemption_error(err, &result.body))
}

/// Success body as JSON. An empty 2xx body reads as `null`.
fn raw_json(result: &TransportResult) -> Result<Value, BackendError> {
    if !result.is_success() {
        return Err(ErrorClassifier::classify_response(result));
    }
    if result.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&result.body)
        .map_err(|err| ErrorClassifier::malformed_payload(result.status, err))
}

#[cfg(test)]
mod tests {
    use tollgate_domain::ErrorKind;

    use super::*;

    const CUSTOMER: &str = r#"{"request_date": "2024-05-01T10:00:00Z",
        "subscriber": {"original_app_user_id": "user-1", "entitlements": {"pro": {}}}}"#;

    #[test]
    fn customer_info_keeps_raw_json() {
        let info = customer_info(&TransportResult::new(200, CUSTOMER)).expect("parsed");
        assert_eq!(info.subscriber.original_app_user_id, "user-1");
        assert!(info.raw["subscriber"]["entitlements"]["pro"].is_object());
    }

    #[test]
    fn log_in_reports_created_for_201() {
        assert!(log_in(&TransportResult::new(201, CUSTOMER)).expect("created").created);
        assert!(!log_in(&TransportResult::new(200, CUSTOMER)).expect("existing").created);
    }

    #[test]
    fn malformed_success_payload_is_unknown_error() {
        let error = customer_info(&TransportResult::new(200, r#"{"subscriber": {}}"#))
            .expect_err("missing original_app_user_id");
        assert_eq!(error.kind, ErrorKind::UnknownError);
        assert_eq!(error.status, Some(200));

        let error = offerings(&TransportResult::new(200, "not json")).expect_err("not json");
        assert_eq!(error.kind, ErrorKind::UnknownError);
    }

    #[test]
    fn error_statuses_are_classified() {
        let error = virtual_currencies(&TransportResult::new(500, "")).expect_err("server");
        assert!(error.is_server_error());
    }

    #[test]
    fn paywall_events_accept_any_success_body() {
        assert!(paywall_events(&TransportResult::new(200, "")).is_ok());
        assert!(paywall_events(&TransportResult::new(204, "whatever")).is_ok());
        assert!(paywall_events(&TransportResult::new(400, "{}")).is_err());
    }

    #[test]
    fn redeem_errors_surface_obfuscated_email() {
        let body = r#"{"code": 7853, "purchase_redemption_error_info": {"obfuscated_email": "a***@b.c"}}"#;
        let error = redeem_web_purchase(&TransportResult::new(400, body)).expect_err("expired");
        assert_eq!(error.kind, ErrorKind::ExpiredWebRedemptionTokenError);
        assert_eq!(error.underlying_message.as_deref(), Some("a***@b.c"));
    }
}
