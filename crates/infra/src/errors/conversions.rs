//! Conversions from external infrastructure errors into domain errors.

use std::error::Error as StdError;
use std::io;

use reqwest::Error as HttpError;
use tollgate_domain::{TollgateError, TransportError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TollgateError);

impl From<InfraError> for TollgateError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TollgateError> for InfraError {
    fn from(value: TollgateError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTollgateError {
    fn into_tollgate(self) -> TollgateError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TollgateError */
/* -------------------------------------------------------------------------- */

impl IntoTollgateError for HttpError {
    fn into_tollgate(self) -> TollgateError {
        if self.is_builder() {
            return TollgateError::Config(format!("invalid HTTP client settings: {self}"));
        }
        if self.is_timeout() {
            return TollgateError::Network("HTTP request timed out".into());
        }
        if self.is_connect() {
            return TollgateError::Network("HTTP connection failure".into());
        }
        if permission_denied(&self) {
            return TollgateError::Security(format!("HTTP request not permitted: {self}"));
        }
        TollgateError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_tollgate())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

/// Map a failed request onto the transport contract.
///
/// An OS-level permission refusal anywhere in the source chain becomes
/// [`TransportError::Permission`]; everything else is a network failure.
pub fn transport_error(err: &HttpError) -> TransportError {
    if permission_denied(err) {
        return TransportError::Permission(err.to_string());
    }
    let detail = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    TransportError::Network(detail)
}

fn permission_denied(err: &HttpError) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::PermissionDenied {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
