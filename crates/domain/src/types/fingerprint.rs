//! Request fingerprints
//!
//! A [`Fingerprint`] is the deduplication key for a logical request: the
//! endpoint descriptor plus a canonical serialization of the request body.
//! Canonical means null-valued object fields are dropped (at every depth) and
//! object keys are emitted in sorted order, so field order and explicit nulls
//! never split otherwise identical requests.

use std::fmt;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::types::endpoint::Endpoint;

/// Immutable deduplication key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    endpoint: Endpoint,
    body: Option<String>,
}

impl Fingerprint {
    /// Fingerprint for a request without a body.
    pub const fn for_endpoint(endpoint: Endpoint) -> Self {
        Self { endpoint, body: None }
    }

    /// Fingerprint for a request carrying `body`.
    pub fn new(endpoint: Endpoint, body: Option<&Value>) -> Self {
        Self { endpoint, body: body.map(canonical_json) }
    }

    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Canonical body text, if the request has one.
    pub fn canonical_body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Short SHA-256 digest used to correlate log lines.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.name().as_bytes());
        hasher.update([0]);
        hasher.update(self.endpoint.path().as_bytes());
        if let Some(body) = &self.body {
            hasher.update([0]);
            hasher.update(body.as_bytes());
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.endpoint.name(), self.digest())
    }
}

/// Serialize `value` canonically: null object fields removed, keys sorted.
pub fn canonical_json(value: &Value) -> String {
    strip_nulls(value).to_string()
}

/// Copy of `value` with every null-valued object field removed.
///
/// Array elements are kept as-is (a null inside an array is positional data).
/// Keys are inserted in lexicographic order so the serialized form is sorted
/// whether or not `serde_json` preserves insertion order.
pub fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let cleaned: Map<String, Value> =
                entries.into_iter().map(|(k, v)| (k.clone(), strip_nulls(v))).collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(strip_nulls).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn null_fields_do_not_split_fingerprints() {
        let a = Fingerprint::new(
            Endpoint::PostReceipt,
            Some(&json!({"fetch_token": "t", "price": null, "currency": "USD"})),
        );
        let b =
            Fingerprint::new(Endpoint::PostReceipt, Some(&json!({"currency": "USD", "fetch_token": "t"})));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn nested_nulls_are_removed_but_array_nulls_are_kept() {
        let canonical = canonical_json(&json!({
            "b": {"y": null, "x": 1},
            "a": [null, 2],
        }));
        assert_eq!(canonical, r#"{"a":[null,2],"b":{"x":1}}"#);
    }

    #[test]
    fn differing_values_produce_distinct_fingerprints() {
        let a = Fingerprint::new(Endpoint::PostReceipt, Some(&json!({"presented_offering_identifier": "a"})));
        let b = Fingerprint::new(Endpoint::PostReceipt, Some(&json!({"presented_offering_identifier": "b"})));
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn endpoint_parameters_are_part_of_the_key() {
        let a = Fingerprint::for_endpoint(Endpoint::GetOfferings { app_user_id: "user-1".into() });
        let b = Fingerprint::for_endpoint(Endpoint::GetOfferings { app_user_id: "user-2".into() });
        assert_ne!(a, b);
        assert!(a.canonical_body().is_none());
    }

    #[test]
    fn display_includes_endpoint_name() {
        let fp = Fingerprint::for_endpoint(Endpoint::GetProductEntitlementMapping);
        let rendered = fp.to_string();
        assert!(rendered.starts_with("get_product_entitlement_mapping#"));
        assert_eq!(rendered.len(), "get_product_entitlement_mapping#".len() + 16);
    }
}
