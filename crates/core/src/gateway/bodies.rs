//! Request body construction
//!
//! Bodies are JSON objects with null top-level fields removed. Nested values
//! are sent as serialized, so an attribute with `"value": null` still reaches
//! the backend as an unset. Write endpoints also produce the ordered list of
//! fields the transport signs.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tollgate_domain::{
    BackendError, DiagnosticsEntry, FieldsToSign, PaywallEvent, ReceiptSubmission,
};

/// Serialize `value` into a request body object.
pub fn to_body<S: Serialize>(value: &S) -> Result<Map<String, Value>, BackendError> {
    let serialized = serde_json::to_value(value)
        .map_err(|err| BackendError::unknown(format!("failed to serialize request body: {err}")))?;
    match serialized {
        Value::Object(map) => Ok(without_null_fields(map)),
        other => Err(BackendError::unknown(format!("request body is not an object: {other}"))),
    }
}

pub fn receipt(receipt: &ReceiptSubmission) -> Result<(Map<String, Value>, FieldsToSign), BackendError> {
    let body = to_body(receipt)?;
    let fields = vec![
        ("app_user_id".to_string(), receipt.app_user_id.clone()),
        ("fetch_token".to_string(), receipt.fetch_token.clone()),
    ];
    Ok((body, fields))
}

pub fn log_in(current_app_user_id: &str, new_app_user_id: &str) -> (Map<String, Value>, FieldsToSign) {
    let body = object(json!({
        "app_user_id": current_app_user_id,
        "new_app_user_id": new_app_user_id,
    }));
    let fields = vec![
        ("app_user_id".to_string(), current_app_user_id.to_string()),
        ("new_app_user_id".to_string(), new_app_user_id.to_string()),
    ];
    (body, fields)
}

pub fn redeem_web_purchase(
    app_user_id: &str,
    redemption_token: &str,
) -> (Map<String, Value>, FieldsToSign) {
    let body = object(json!({
        "redemption_token": redemption_token,
        "app_user_id": app_user_id,
    }));
    let fields = vec![
        ("redemption_token".to_string(), redemption_token.to_string()),
        ("app_user_id".to_string(), app_user_id.to_string()),
    ];
    (body, fields)
}

pub fn support_ticket(app_user_id: &str, email: &str, description: &str) -> Map<String, Value> {
    object(json!({
        "app_user_id": app_user_id,
        "customer_email": email,
        "issue_description": description,
    }))
}

#[derive(Serialize)]
struct DiagnosticsBatch<'a> {
    entries: &'a [DiagnosticsEntry],
}

#[derive(Serialize)]
struct PaywallEventBatch<'a> {
    events: &'a [PaywallEvent],
}

pub fn diagnostics(entries: &[DiagnosticsEntry]) -> Result<Map<String, Value>, BackendError> {
    to_body(&DiagnosticsBatch { entries })
}

pub fn paywall_events(events: &[PaywallEvent]) -> Result<Map<String, Value>, BackendError> {
    to_body(&PaywallEventBatch { events })
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => without_null_fields(map),
        _ => Map::new(),
    }
}

fn without_null_fields(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, value)| !value.is_null()).collect()
}

#[cfg(test)]
mod tests {
    use tollgate_domain::SubscriberAttribute;

    use super::*;

    #[test]
    fn receipt_signs_user_then_token() {
        let submission = ReceiptSubmission::new("user-1", "token-9").with_base_plan_id("p1m");
        let (body, fields) = receipt(&submission).expect("body");
        assert_eq!(body["base_plan_id"], "p1m");
        assert!(!body.contains_key("price"));
        assert_eq!(
            fields,
            vec![
                ("app_user_id".to_string(), "user-1".to_string()),
                ("fetch_token".to_string(), "token-9".to_string()),
            ]
        );
    }

    #[test]
    fn nested_nulls_survive_in_sent_body() {
        let submission = ReceiptSubmission::new("user-1", "tok")
            .with_attribute("$email", SubscriberAttribute { value: None, updated_at_ms: 1 });
        let (body, _) = receipt(&submission).expect("body");

        let attribute = &body["attributes"]["$email"];
        assert_eq!(attribute.get("value"), Some(&Value::Null));
        assert_eq!(attribute["updated_at_ms"], 1);
        assert!(!body.contains_key("store_user_id"));
    }

    #[test]
    fn top_level_nulls_are_dropped_from_literal_bodies() {
        let body = object(json!({"app_user_id": "user-1", "email": null}));
        assert_eq!(body.len(), 1);
        assert!(!body.contains_key("email"));
    }

    #[test]
    fn redeem_signs_token_first() {
        let (_, fields) = redeem_web_purchase("user-1", "rt");
        assert_eq!(fields[0].0, "redemption_token");
        assert_eq!(fields[1].0, "app_user_id");
    }

    #[test]
    fn non_object_values_are_rejected() {
        assert!(to_body(&vec![1, 2]).is_err());
    }
}
