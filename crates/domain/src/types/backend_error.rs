//! Typed backend error taxonomy and handling directives
//!
//! Every failed backend call resolves to a [`BackendError`]. Endpoint
//! families that need the caller to act on a failure (consume or not, fall
//! back to a cached catalog, retry telemetry) wrap it in a [`DirectedError`]
//! carrying that family's directive.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error kinds surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    #[error("Error performing request")]
    NetworkError,
    #[error("The device or user lacks the permissions to make this request")]
    InsufficientPermissionsError,
    #[error("There was an unknown backend error")]
    UnknownBackendError,
    #[error("There was a problem with the store")]
    StoreProblemError,
    #[error("The request is not supported")]
    UnsupportedError,
    #[error("The receipt is already in use by another subscriber")]
    ReceiptAlreadyInUseError,
    #[error("The receipt is not valid")]
    InvalidReceiptError,
    #[error("There was a credentials issue")]
    InvalidCredentialsError,
    #[error("The purchase is invalid")]
    PurchaseInvalidError,
    #[error("The app user id is not valid")]
    InvalidAppUserIdError,
    #[error("Received an unexpected response from the backend")]
    UnexpectedBackendResponseError,
    #[error("There is an issue with the SDK configuration")]
    ConfigurationError,
    #[error("The user is not eligible for this offer")]
    IneligibleError,
    #[error("The subscription key is invalid")]
    InvalidAppleSubscriptionKeyError,
    #[error("One or more subscriber attributes are invalid")]
    InvalidSubscriberAttributesError,
    #[error("The web redemption token is invalid")]
    InvalidWebRedemptionTokenError,
    #[error("The web redemption token has expired")]
    ExpiredWebRedemptionTokenError,
    #[error("The web purchase has already been redeemed")]
    WebPurchaseAlreadyRedeemedError,
    #[error("Unknown error")]
    UnknownError,
}

/// Numeric error codes the backend embeds in 4xx bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendErrorCode {
    InvalidPlatform,
    StoreProblem,
    CannotTransferPurchase,
    InvalidReceiptToken,
    InvalidAppStoreSharedSecret,
    InvalidPaymentModeOrIntroPriceNotProvided,
    ProductIdForGoogleReceiptNotProvided,
    InvalidPlayStoreCredentials,
    InternalServerError,
    EmptyAppUserId,
    InvalidAuthToken,
    InvalidApiKey,
    BadRequest,
    PlayStoreQuotaExceeded,
    PlayStoreInvalidPackageName,
    PlayStoreGenericError,
    UserIneligibleForPromoOffer,
    InvalidAppleSubscriptionKey,
    InvalidSubscriberAttributes,
    InvalidSubscriberAttributesBody,
    ProductIdsMalformed,
    InvalidWebRedemptionToken,
    PurchaseBelongsToOtherUser,
    ExpiredWebRedemptionToken,
}

impl BackendErrorCode {
    /// Look up a raw code; unknown codes yield `None`.
    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            7000 => Self::InvalidPlatform,
            7101 => Self::StoreProblem,
            7102 => Self::CannotTransferPurchase,
            7103 => Self::InvalidReceiptToken,
            7104 => Self::InvalidAppStoreSharedSecret,
            7105 => Self::InvalidPaymentModeOrIntroPriceNotProvided,
            7106 => Self::ProductIdForGoogleReceiptNotProvided,
            7107 => Self::InvalidPlayStoreCredentials,
            7110 => Self::InternalServerError,
            7220 => Self::EmptyAppUserId,
            7224 => Self::InvalidAuthToken,
            7225 => Self::InvalidApiKey,
            7226 => Self::BadRequest,
            7229 => Self::PlayStoreQuotaExceeded,
            7230 => Self::PlayStoreInvalidPackageName,
            7231 => Self::PlayStoreGenericError,
            7232 => Self::UserIneligibleForPromoOffer,
            7234 => Self::InvalidAppleSubscriptionKey,
            7263 => Self::InvalidSubscriberAttributes,
            7264 => Self::InvalidSubscriberAttributesBody,
            7662 => Self::ProductIdsMalformed,
            7849 => Self::InvalidWebRedemptionToken,
            7852 => Self::PurchaseBelongsToOtherUser,
            7853 => Self::ExpiredWebRedemptionToken,
            _ => return None,
        })
    }

    pub const fn code(self) -> i64 {
        match self {
            Self::InvalidPlatform => 7000,
            Self::StoreProblem => 7101,
            Self::CannotTransferPurchase => 7102,
            Self::InvalidReceiptToken => 7103,
            Self::InvalidAppStoreSharedSecret => 7104,
            Self::InvalidPaymentModeOrIntroPriceNotProvided => 7105,
            Self::ProductIdForGoogleReceiptNotProvided => 7106,
            Self::InvalidPlayStoreCredentials => 7107,
            Self::InternalServerError => 7110,
            Self::EmptyAppUserId => 7220,
            Self::InvalidAuthToken => 7224,
            Self::InvalidApiKey => 7225,
            Self::BadRequest => 7226,
            Self::PlayStoreQuotaExceeded => 7229,
            Self::PlayStoreInvalidPackageName => 7230,
            Self::PlayStoreGenericError => 7231,
            Self::UserIneligibleForPromoOffer => 7232,
            Self::InvalidAppleSubscriptionKey => 7234,
            Self::InvalidSubscriberAttributes => 7263,
            Self::InvalidSubscriberAttributesBody => 7264,
            Self::ProductIdsMalformed => 7662,
            Self::InvalidWebRedemptionToken => 7849,
            Self::PurchaseBelongsToOtherUser => 7852,
            Self::ExpiredWebRedemptionToken => 7853,
        }
    }

    pub const fn error_kind(self) -> ErrorKind {
        match self {
            Self::InvalidPlatform | Self::PlayStoreInvalidPackageName => {
                ErrorKind::ConfigurationError
            }
            Self::StoreProblem | Self::PlayStoreQuotaExceeded | Self::PlayStoreGenericError => {
                ErrorKind::StoreProblemError
            }
            Self::CannotTransferPurchase => ErrorKind::ReceiptAlreadyInUseError,
            Self::InvalidReceiptToken => ErrorKind::InvalidReceiptError,
            Self::InvalidAppStoreSharedSecret
            | Self::InvalidPlayStoreCredentials
            | Self::InvalidAuthToken
            | Self::InvalidApiKey => ErrorKind::InvalidCredentialsError,
            Self::InvalidPaymentModeOrIntroPriceNotProvided
            | Self::ProductIdForGoogleReceiptNotProvided => ErrorKind::PurchaseInvalidError,
            Self::InternalServerError | Self::BadRequest => {
                ErrorKind::UnexpectedBackendResponseError
            }
            Self::EmptyAppUserId => ErrorKind::InvalidAppUserIdError,
            Self::UserIneligibleForPromoOffer => ErrorKind::IneligibleError,
            Self::InvalidAppleSubscriptionKey => ErrorKind::InvalidAppleSubscriptionKeyError,
            Self::InvalidSubscriberAttributes | Self::InvalidSubscriberAttributesBody => {
                ErrorKind::InvalidSubscriberAttributesError
            }
            Self::ProductIdsMalformed => ErrorKind::UnsupportedError,
            Self::InvalidWebRedemptionToken => ErrorKind::InvalidWebRedemptionTokenError,
            Self::PurchaseBelongsToOtherUser => ErrorKind::WebPurchaseAlreadyRedeemedError,
            Self::ExpiredWebRedemptionToken => ErrorKind::ExpiredWebRedemptionTokenError,
        }
    }
}

/// Typed failure of one backend call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    pub kind: ErrorKind,
    pub underlying_message: Option<String>,
    pub status: Option<u16>,
    pub backend_code: Option<i64>,
}

impl BackendError {
    pub const fn new(kind: ErrorKind) -> Self {
        Self { kind, underlying_message: None, status: None, backend_code: None }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.underlying_message = Some(message.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn with_backend_code(mut self, code: i64) -> Self {
        self.backend_code = Some(code);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkError).with_message(message)
    }

    pub fn insufficient_permissions(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientPermissionsError).with_message(message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownError).with_message(message)
    }

    /// True when the backend answered with a 5xx status.
    pub fn is_server_error(&self) -> bool {
        self.status.is_some_and(|status| status >= 500)
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::NetworkError => true,
            ErrorKind::UnknownBackendError => self.is_server_error(),
            _ => false,
        }
    }

    /// Recognized backend code, if the body carried one from the known set.
    pub fn known_backend_code(&self) -> Option<BackendErrorCode> {
        self.backend_code.and_then(BackendErrorCode::from_code)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.underlying_message {
            Some(message) => write!(f, "{}: {message}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for BackendError {}

/// What to do with a purchase whose receipt submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptDirective {
    /// Keep the purchase unconsumed so it can be submitted again
    DoNotConsume,
    /// The backend processed the request; mark attached data as synced
    MarkAsSynced,
    /// Grant entitlements from cache and keep the purchase unconsumed
    UseCachedEntitlementsAndDoNotConsume,
}

/// What to do when a catalog fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogDirective {
    FallBackToCache,
    DoNotFallBack,
}

/// Whether a failed telemetry submission should be retried later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetryDirective {
    Retry,
    DoNotRetry,
}

/// A typed error plus its endpoint family's handling directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectedError<D> {
    pub error: BackendError,
    pub directive: D,
}

impl<D> DirectedError<D> {
    pub const fn new(error: BackendError, directive: D) -> Self {
        Self { error, directive }
    }

    pub const fn kind(&self) -> ErrorKind {
        self.error.kind
    }
}

impl<D: fmt::Debug> fmt::Display for DirectedError<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.error, self.directive)
    }
}

impl<D: fmt::Debug> std::error::Error for DirectedError<D> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_round_trips_through_the_table() {
        for raw in [
            7000, 7101, 7102, 7103, 7104, 7105, 7106, 7107, 7110, 7220, 7224, 7225, 7226, 7229,
            7230, 7231, 7232, 7234, 7263, 7264, 7662, 7849, 7852, 7853,
        ] {
            let code = BackendErrorCode::from_code(raw).expect("known code");
            assert_eq!(code.code(), raw);
        }
        assert_eq!(BackendErrorCode::from_code(1234), None);
    }

    #[test]
    fn product_ids_malformed_is_unsupported() {
        assert_eq!(BackendErrorCode::ProductIdsMalformed.error_kind(), ErrorKind::UnsupportedError);
        assert_eq!(BackendErrorCode::StoreProblem.error_kind(), ErrorKind::StoreProblemError);
    }

    #[test]
    fn retryability_follows_kind_and_status() {
        assert!(BackendError::network("offline").is_retryable());
        assert!(!BackendError::insufficient_permissions("sandbox").is_retryable());
        let server = BackendError::new(ErrorKind::UnknownBackendError).with_status(503);
        assert!(server.is_server_error());
        assert!(server.is_retryable());
        let client = BackendError::new(ErrorKind::UnknownBackendError).with_status(404);
        assert!(!client.is_server_error());
        assert!(!client.is_retryable());
    }

    #[test]
    fn display_appends_underlying_message() {
        let error = BackendError::new(ErrorKind::StoreProblemError).with_message("quota");
        assert_eq!(error.to_string(), "There was a problem with the store: quota");
        assert_eq!(BackendError::new(ErrorKind::UnknownError).to_string(), "Unknown error");
    }
}
