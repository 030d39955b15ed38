//! Error classification
//!
//! Maps transport failures and non-success responses onto the typed
//! [`BackendError`] taxonomy, and derives each endpoint family's handling
//! directive from the classified error.

use std::fmt;

use serde_json::Value;
use tollgate_domain::constants::{ERROR_CODE_FIELD, ERROR_MESSAGE_FIELD};
use tollgate_domain::{
    BackendError, BackendErrorCode, CatalogDirective, DirectedError, ErrorKind, ReceiptDirective,
    RetryDirective, TransportError, TransportResult,
};

use crate::dispatch::{DispatchFailure, FromDispatchFailure};

/// Where a classified failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    /// Transport could not reach the server
    Network,
    /// Host environment refused the request
    Permission,
    /// 5xx response
    Server,
    /// 4xx response
    Client,
    /// 2xx response whose payload failed to parse
    Malformed,
    /// 1xx/3xx response
    Unexpected,
    /// The call never ran (scheduler shut down, operation panicked)
    Dispatch,
}

impl FailureCategory {
    pub fn of(error: &BackendError) -> Self {
        match (error.kind, error.status) {
            (ErrorKind::NetworkError, _) => Self::Network,
            (ErrorKind::InsufficientPermissionsError, _) => Self::Permission,
            (_, Some(status)) if status >= 500 => Self::Server,
            (_, Some(status)) if (400..500).contains(&status) => Self::Client,
            (_, Some(status)) if (200..300).contains(&status) => Self::Malformed,
            (_, Some(_)) => Self::Unexpected,
            (_, None) => Self::Dispatch,
        }
    }
}

/// Stateless classifier for backend failures
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a failure raised before any response was received.
    pub fn classify_transport_error(error: &TransportError) -> BackendError {
        match error {
            TransportError::Network(message) => BackendError::network(message.clone()),
            TransportError::Permission(message) => {
                BackendError::insufficient_permissions(message.clone())
            }
        }
    }

    /// Classify a response that did not carry a usable success payload.
    ///
    /// 2xx responses reaching this point had a malformed payload and become
    /// [`ErrorKind::UnknownError`].
    pub fn classify_response(result: &TransportResult) -> BackendError {
        let status = result.status;
        if result.is_server_error() {
            let (code, message) = parse_error_body(&result.body);
            return with_body_details(
                BackendError::new(ErrorKind::UnknownBackendError).with_status(status),
                code,
                message,
            );
        }
        if result.is_client_error() {
            let (code, message) = parse_error_body(&result.body);
            let kind = code
                .and_then(BackendErrorCode::from_code)
                .map_or(ErrorKind::UnknownBackendError, BackendErrorCode::error_kind);
            return with_body_details(BackendError::new(kind).with_status(status), code, message);
        }
        if result.is_success() {
            return Self::malformed_payload(status, "response payload could not be parsed");
        }
        BackendError::new(ErrorKind::UnexpectedBackendResponseError)
            .with_status(status)
            .with_message(format!("unexpected status {status}"))
    }

    /// Error for a 2xx response whose payload did not have the expected shape.
    pub fn malformed_payload(status: u16, detail: impl fmt::Display) -> BackendError {
        BackendError::new(ErrorKind::UnknownError).with_status(status).with_message(detail.to_string())
    }

    /// Only a 5xx falls back to cached entitlements. Every other failure,
    /// rejected subscriber attributes included, keeps the purchase unconsumed.
    pub fn receipt_directive(error: &BackendError) -> ReceiptDirective {
        match FailureCategory::of(error) {
            FailureCategory::Server => ReceiptDirective::UseCachedEntitlementsAndDoNotConsume,
            _ => ReceiptDirective::DoNotConsume,
        }
    }

    pub fn catalog_directive(error: &BackendError) -> CatalogDirective {
        match FailureCategory::of(error) {
            FailureCategory::Client | FailureCategory::Permission => CatalogDirective::DoNotFallBack,
            FailureCategory::Network
            | FailureCategory::Server
            | FailureCategory::Malformed
            | FailureCategory::Unexpected
            | FailureCategory::Dispatch => CatalogDirective::FallBackToCache,
        }
    }

    pub fn retry_directive(error: &BackendError) -> RetryDirective {
        match FailureCategory::of(error) {
            FailureCategory::Network | FailureCategory::Server | FailureCategory::Dispatch => {
                RetryDirective::Retry
            }
            FailureCategory::Permission
            | FailureCategory::Client
            | FailureCategory::Malformed
            | FailureCategory::Unexpected => RetryDirective::DoNotRetry,
        }
    }

    /// Attach the obfuscated email to an expired redemption token error.
    pub fn enrich_redemption_error(mut error: BackendError, body: &str) -> BackendError {
        if error.kind != ErrorKind::ExpiredWebRedemptionTokenError {
            return error;
        }
        let email = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            json.get("purchase_redemption_error_info")?
                .get("obfuscated_email")?
                .as_str()
                .map(str::to_string)
        });
        if let Some(email) = email {
            error.underlying_message = Some(email);
        }
        error
    }
}

/// Extract the backend error code and message from an error body.
///
/// The code may be a JSON integer or a numeric string; anything else is
/// treated as absent.
pub fn parse_error_body(body: &str) -> (Option<i64>, Option<String>) {
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return (None, None);
    };
    let code = match map.get(ERROR_CODE_FIELD) {
        Some(Value::Number(number)) => number.as_i64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    };
    let message = map.get(ERROR_MESSAGE_FIELD).and_then(Value::as_str).map(str::to_string);
    (code, message)
}

fn with_body_details(
    mut error: BackendError,
    code: Option<i64>,
    message: Option<String>,
) -> BackendError {
    error.backend_code = code;
    error.underlying_message = message;
    error
}

/// A handling directive an endpoint family attaches to its errors
pub trait Directive: fmt::Debug + Copy + Send + 'static {
    fn for_error(error: &BackendError) -> Self;
}

impl Directive for ReceiptDirective {
    fn for_error(error: &BackendError) -> Self {
        ErrorClassifier::receipt_directive(error)
    }
}

impl Directive for CatalogDirective {
    fn for_error(error: &BackendError) -> Self {
        ErrorClassifier::catalog_directive(error)
    }
}

impl Directive for RetryDirective {
    fn for_error(error: &BackendError) -> Self {
        ErrorClassifier::retry_directive(error)
    }
}

impl<D: Directive> FromDispatchFailure for DirectedError<D> {
    fn from_dispatch_failure(failure: DispatchFailure) -> Self {
        let error = BackendError::from_dispatch_failure(failure);
        let directive = D::for_error(&error);
        Self::new(error, directive)
    }
}

/// Error type a gateway procedure reports to its caller
pub trait EndpointError: FromDispatchFailure + fmt::Display + Clone + Send + 'static {
    fn from_backend_error(error: BackendError) -> Self;
}

impl EndpointError for BackendError {
    fn from_backend_error(error: BackendError) -> Self {
        error
    }
}

impl<D: Directive> EndpointError for DirectedError<D> {
    fn from_backend_error(error: BackendError) -> Self {
        let directive = D::for_error(&error);
        Self::new(error, directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> TransportResult {
        TransportResult::new(status, body)
    }

    #[test]
    fn transport_failures_map_to_network_and_permission_kinds() {
        let network =
            ErrorClassifier::classify_transport_error(&TransportError::Network("timed out".into()));
        assert_eq!(network.kind, ErrorKind::NetworkError);
        assert!(network.is_retryable());

        let permission =
            ErrorClassifier::classify_transport_error(&TransportError::Permission("sandbox".into()));
        assert_eq!(permission.kind, ErrorKind::InsufficientPermissionsError);
        assert!(!permission.is_retryable());
    }

    #[test]
    fn server_errors_are_unknown_backend_errors_flagged_as_server() {
        let error = ErrorClassifier::classify_response(&response(503, "<html>busy</html>"));
        assert_eq!(error.kind, ErrorKind::UnknownBackendError);
        assert!(error.is_server_error());
        assert_eq!(error.status, Some(503));
    }

    #[test]
    fn client_errors_use_the_backend_code_table() {
        let error = ErrorClassifier::classify_response(&response(
            400,
            r#"{"code": 7662, "message": "bad product ids"}"#,
        ));
        assert_eq!(error.kind, ErrorKind::UnsupportedError);
        assert_eq!(error.backend_code, Some(7662));
        assert_eq!(error.underlying_message.as_deref(), Some("bad product ids"));
        assert!(!error.is_server_error());
    }

    #[test]
    fn numeric_string_codes_are_accepted() {
        let error = ErrorClassifier::classify_response(&response(400, r#"{"code": "7225"}"#));
        assert_eq!(error.kind, ErrorKind::InvalidCredentialsError);
        assert_eq!(error.known_backend_code(), Some(BackendErrorCode::InvalidApiKey));
    }

    #[test]
    fn unknown_or_missing_codes_fall_back_to_unknown_backend_error() {
        for body in [r#"{"code": 1}"#, r#"{"message": "nope"}"#, "not json", r#"{"code": "abc"}"#] {
            let error = ErrorClassifier::classify_response(&response(404, body));
            assert_eq!(error.kind, ErrorKind::UnknownBackendError, "body: {body}");
            assert!(!error.is_server_error());
        }
    }

    #[test]
    fn redirects_and_informational_statuses_are_unexpected() {
        let error = ErrorClassifier::classify_response(&response(304, ""));
        assert_eq!(error.kind, ErrorKind::UnexpectedBackendResponseError);
    }

    #[test]
    fn malformed_success_is_unknown_error() {
        let error = ErrorClassifier::classify_response(&response(200, "{"));
        assert_eq!(error.kind, ErrorKind::UnknownError);
        assert_eq!(FailureCategory::of(&error), FailureCategory::Malformed);
    }

    #[test]
    fn receipt_directives() {
        let classify = |status, body| {
            ErrorClassifier::receipt_directive(&ErrorClassifier::classify_response(&response(
                status, body,
            )))
        };
        assert_eq!(classify(500, ""), ReceiptDirective::UseCachedEntitlementsAndDoNotConsume);
        assert_eq!(classify(400, r#"{"code": 7662}"#), ReceiptDirective::DoNotConsume);
        assert_eq!(classify(400, r#"{"code": 7263}"#), ReceiptDirective::DoNotConsume);
        assert_eq!(classify(400, r#"{"code": 7264}"#), ReceiptDirective::DoNotConsume);
        assert_eq!(classify(401, r#"{"code": 7225}"#), ReceiptDirective::DoNotConsume);
        assert_eq!(classify(200, "[]"), ReceiptDirective::DoNotConsume);
        assert_eq!(
            ErrorClassifier::receipt_directive(&BackendError::network("offline")),
            ReceiptDirective::DoNotConsume
        );
    }

    #[test]
    fn catalog_directives() {
        let classify = |status| {
            ErrorClassifier::catalog_directive(&ErrorClassifier::classify_response(&response(
                status, "{}",
            )))
        };
        assert_eq!(classify(502), CatalogDirective::FallBackToCache);
        assert_eq!(classify(404), CatalogDirective::DoNotFallBack);
        assert_eq!(classify(200), CatalogDirective::FallBackToCache);
        assert_eq!(
            ErrorClassifier::catalog_directive(&BackendError::network("offline")),
            CatalogDirective::FallBackToCache
        );
        assert_eq!(
            ErrorClassifier::catalog_directive(&BackendError::insufficient_permissions("sandbox")),
            CatalogDirective::DoNotFallBack
        );
    }

    #[test]
    fn telemetry_retry_directives() {
        let classify = |status, body| {
            ErrorClassifier::retry_directive(&ErrorClassifier::classify_response(&response(
                status, body,
            )))
        };
        assert_eq!(classify(500, ""), RetryDirective::Retry);
        assert_eq!(classify(400, r#"{"code": 7226}"#), RetryDirective::DoNotRetry);
        assert_eq!(classify(422, "{}"), RetryDirective::DoNotRetry);
        assert_eq!(
            ErrorClassifier::retry_directive(&BackendError::network("offline")),
            RetryDirective::Retry
        );
        assert_eq!(
            ErrorClassifier::retry_directive(&BackendError::insufficient_permissions("blocked")),
            RetryDirective::DoNotRetry
        );
    }

    #[test]
    fn dispatch_failures_carry_family_defaults() {
        let receipt = DirectedError::<ReceiptDirective>::from_dispatch_failure(DispatchFailure::Rejected);
        assert_eq!(receipt.directive, ReceiptDirective::DoNotConsume);
        let catalog = DirectedError::<CatalogDirective>::from_dispatch_failure(DispatchFailure::Rejected);
        assert_eq!(catalog.directive, CatalogDirective::FallBackToCache);
        let telemetry = DirectedError::<RetryDirective>::from_dispatch_failure(DispatchFailure::Rejected);
        assert_eq!(telemetry.directive, RetryDirective::Retry);
        assert_eq!(telemetry.kind(), ErrorKind::UnknownError);
    }

    #[test]
    fn expired_redemption_token_carries_obfuscated_email() {
        let body = r#"{"code": 7853, "message": "expired",
            "purchase_redemption_error_info": {"obfuscated_email": "j***@example.com"}}"#;
        let error = ErrorClassifier::enrich_redemption_error(
            ErrorClassifier::classify_response(&response(400, body)),
            body,
        );
        assert_eq!(error.kind, ErrorKind::ExpiredWebRedemptionTokenError);
        assert_eq!(error.underlying_message.as_deref(), Some("j***@example.com"));

        let other = ErrorClassifier::enrich_redemption_error(
            ErrorClassifier::classify_response(&response(400, r#"{"code": 7849, "message": "invalid"}"#)),
            body,
        );
        assert_eq!(other.underlying_message.as_deref(), Some("invalid"));
    }
}
