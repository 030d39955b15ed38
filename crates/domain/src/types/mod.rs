//! Domain types
//!
//! Endpoint descriptors, fingerprints, transport contracts, the backend
//! error taxonomy and the payloads exchanged with the backend.

pub mod backend_error;
pub mod dispatch;
pub mod endpoint;
pub mod fingerprint;
pub mod payloads;
pub mod requests;
pub mod transport;

pub use backend_error::{
    BackendError, BackendErrorCode, CatalogDirective, DirectedError, ErrorKind, ReceiptDirective,
    RetryDirective,
};
pub use dispatch::{CallState, DelayTier};
pub use endpoint::{Endpoint, HttpMethod};
pub use fingerprint::{canonical_json, strip_nulls, Fingerprint};
pub use payloads::{
    CustomerCenterConfig, CustomerInfo, DiagnosticsResponse, LogInResult, Offering, Offerings,
    Package, ProductEntitlementEntry, ProductEntitlementMapping, Subscriber, SupportTicketResult,
    VirtualCurrencies, VirtualCurrency, WebBillingProduct, WebBillingProducts,
};
pub use requests::{
    DiagnosticsEntry, InitiationSource, PaywallEvent, PaywallEventType, ReceiptSubmission,
    SubscriberAttribute,
};
pub use transport::{
    join_url, FieldsToSign, ResponseOrigin, TransportError, TransportRequest, TransportResult,
    VerificationResult,
};
