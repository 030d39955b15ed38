//! Endpoint gateway
//!
//! [`Backend`] exposes one procedure per logical backend operation. Every
//! procedure builds its request, fingerprints it, and hands it to the
//! deduplicator for its endpoint family; the transport call and parse run on
//! a scheduler worker. Each procedure's callback fires exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tollgate_domain::constants::{
    HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_IS_BACKGROUNDED, HEADER_IS_SANDBOX,
    HEADER_PLATFORM, HEADER_PLATFORM_VERSION, HEADER_SDK_VERSION, SDK_VERSION,
};
use tollgate_domain::{
    BackendConfig, BackendError, CallState, CatalogDirective, CustomerCenterConfig, CustomerInfo,
    DelayTier, DiagnosticsEntry, DiagnosticsResponse, DirectedError, Endpoint, FieldsToSign,
    Fingerprint, LogInResult, Offerings, PaywallEvent, ProductEntitlementMapping,
    ReceiptDirective, ReceiptSubmission, ResponseOrigin, RetryDirective, SupportTicketResult,
    TransportRequest, VirtualCurrencies, WebBillingProducts,
};
use tracing::{debug, warn};

use super::bodies;
use super::parsers::{self, Parser};
use super::ports::Transport;
use crate::classifier::{EndpointError, ErrorClassifier};
use crate::dispatch::{
    CallDeduplicator, Dispatch, DispatchObserver, DispatchOutcome, NoopObserver, TaskScheduler,
};

type Outcome<T, E = BackendError> = Result<T, E>;

/// Request shape before headers and base URLs are attached
struct EndpointCall {
    endpoint: Endpoint,
    body: Option<Map<String, Value>>,
    fields_to_sign: Option<FieldsToSign>,
    is_backgrounded: Option<bool>,
}

impl EndpointCall {
    const fn get(endpoint: Endpoint) -> Self {
        Self { endpoint, body: None, fields_to_sign: None, is_backgrounded: None }
    }

    const fn post(endpoint: Endpoint, body: Map<String, Value>) -> Self {
        Self { endpoint, body: Some(body), fields_to_sign: None, is_backgrounded: None }
    }

    fn signed(mut self, fields: FieldsToSign) -> Self {
        self.fields_to_sign = Some(fields);
        self
    }

    const fn backgrounded(mut self, is_backgrounded: bool) -> Self {
        self.is_backgrounded = Some(is_backgrounded);
        self
    }

    fn fingerprint(&self) -> Fingerprint {
        let body = self.body.clone().map(Value::Object);
        Fingerprint::new(self.endpoint.clone(), body.as_ref())
    }
}

/// State shared by every dispatched operation
#[derive(Clone)]
struct RequestContext {
    config: BackendConfig,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn DispatchObserver>,
}

impl RequestContext {
    fn build_request(&self, call: EndpointCall) -> TransportRequest {
        let mut headers = BTreeMap::new();
        headers.insert(HEADER_AUTHORIZATION.to_string(), format!("Bearer {}", self.config.api_key));
        headers.insert(HEADER_CONTENT_TYPE.to_string(), "application/json".to_string());
        headers.insert(HEADER_PLATFORM.to_string(), self.config.platform.flavor.clone());
        headers.insert(HEADER_PLATFORM_VERSION.to_string(), self.config.platform.version.clone());
        headers.insert(HEADER_SDK_VERSION.to_string(), SDK_VERSION.to_string());
        headers.insert(HEADER_IS_SANDBOX.to_string(), self.config.is_sandbox.to_string());
        if let Some(is_backgrounded) = call.is_backgrounded {
            headers.insert(HEADER_IS_BACKGROUNDED.to_string(), is_backgrounded.to_string());
        }

        let fallback_base_urls = if call.endpoint.supports_fallback_base_urls() {
            self.config.fallback_base_urls.clone()
        } else {
            Vec::new()
        };

        TransportRequest {
            base_url: self.config.base_url.clone(),
            endpoint: call.endpoint,
            body: call.body,
            fields_to_sign: call.fields_to_sign,
            headers,
            fallback_base_urls,
        }
    }

    fn execute<T, E: EndpointError>(
        &self,
        request: &TransportRequest,
        digest: &str,
        parse: Parser<T>,
    ) -> Outcome<T, E> {
        let endpoint = request.endpoint.name();
        debug!(fingerprint = digest, endpoint, state = %CallState::InFlight, "performing request");
        let started = Instant::now();

        let parsed = match self.transport.perform_request(request) {
            Ok(response) => {
                if response.origin != ResponseOrigin::MainServer {
                    debug!(endpoint, origin = %response.origin, "response served by secondary host");
                }
                parse(&response)
            }
            Err(err) => Err(ErrorClassifier::classify_transport_error(&err)),
        };

        self.observer.on_completed(endpoint, started.elapsed(), parsed.is_ok());
        let outcome = parsed.map_err(E::from_backend_error);
        if let Err(err) = &outcome {
            warn!(endpoint, fingerprint = digest, error = %err, "backend call failed");
        }
        debug!(fingerprint = digest, endpoint, state = %CallState::Completed, "request finished");
        outcome
    }
}

/// Gateway to the subscription backend
pub struct Backend {
    ctx: Arc<RequestContext>,
    api_scheduler: Arc<dyn TaskScheduler>,
    telemetry_scheduler: Arc<dyn TaskScheduler>,
    customer_info: CallDeduplicator<Outcome<CustomerInfo>>,
    offerings: CallDeduplicator<Outcome<Offerings, DirectedError<CatalogDirective>>>,
    receipts: CallDeduplicator<Outcome<CustomerInfo, DirectedError<ReceiptDirective>>>,
    log_in: CallDeduplicator<Outcome<LogInResult>>,
    entitlement_mapping: CallDeduplicator<Outcome<ProductEntitlementMapping>>,
    virtual_currencies: CallDeduplicator<Outcome<VirtualCurrencies>>,
    web_billing: CallDeduplicator<Outcome<WebBillingProducts>>,
    customer_center: CallDeduplicator<Outcome<CustomerCenterConfig>>,
    redemptions: CallDeduplicator<Outcome<CustomerInfo>>,
    support_tickets: CallDeduplicator<Outcome<SupportTicketResult>>,
    diagnostics: CallDeduplicator<Outcome<DiagnosticsResponse, DirectedError<RetryDirective>>>,
    paywall_events: CallDeduplicator<Outcome<(), DirectedError<RetryDirective>>>,
}

impl Backend {
    /// Create a gateway. API calls run on `api_scheduler`; diagnostics and
    /// paywall events run on `telemetry_scheduler`.
    pub fn new(
        config: BackendConfig,
        transport: Arc<dyn Transport>,
        api_scheduler: Arc<dyn TaskScheduler>,
        telemetry_scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        let ctx = Arc::new(RequestContext { config, transport, observer: Arc::new(NoopObserver) });
        Self {
            customer_info: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            offerings: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            receipts: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            log_in: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            entitlement_mapping: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            virtual_currencies: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            web_billing: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            customer_center: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            redemptions: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            support_tickets: CallDeduplicator::new(Arc::clone(&api_scheduler)),
            diagnostics: CallDeduplicator::new(Arc::clone(&telemetry_scheduler)),
            paywall_events: CallDeduplicator::new(Arc::clone(&telemetry_scheduler)),
            ctx,
            api_scheduler,
            telemetry_scheduler,
        }
    }

    /// Report request traffic to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        let mut ctx = (*self.ctx).clone();
        ctx.observer = observer;
        self.ctx = Arc::new(ctx);
        self
    }

    pub fn config(&self) -> &BackendConfig {
        &self.ctx.config
    }

    /// Stop both schedulers. Later calls resolve with a dispatch failure.
    pub fn shutdown(&self) {
        self.api_scheduler.shutdown();
        self.telemetry_scheduler.shutdown();
    }

    /// Distinct requests currently in flight across every endpoint.
    pub fn in_flight(&self) -> usize {
        self.customer_info.in_flight()
            + self.offerings.in_flight()
            + self.receipts.in_flight()
            + self.log_in.in_flight()
            + self.entitlement_mapping.in_flight()
            + self.virtual_currencies.in_flight()
            + self.web_billing.in_flight()
            + self.customer_center.in_flight()
            + self.redemptions.in_flight()
            + self.support_tickets.in_flight()
            + self.diagnostics.in_flight()
            + self.paywall_events.in_flight()
    }

    pub fn get_customer_info(
        &self,
        app_user_id: &str,
        app_in_background: bool,
        on_done: impl FnOnce(Outcome<CustomerInfo>) + Send + 'static,
    ) {
        let call = EndpointCall::get(Endpoint::GetCustomerInfo { app_user_id: app_user_id.into() })
            .backgrounded(app_in_background);
        self.dispatch(
            &self.customer_info,
            call,
            DelayTier::for_background(app_in_background),
            parsers::customer_info,
            on_done,
        );
    }

    pub fn get_offerings(
        &self,
        app_user_id: &str,
        app_in_background: bool,
        on_done: impl FnOnce(Outcome<Offerings, DirectedError<CatalogDirective>>) + Send + 'static,
    ) {
        let call = EndpointCall::get(Endpoint::GetOfferings { app_user_id: app_user_id.into() });
        self.dispatch(
            &self.offerings,
            call,
            DelayTier::for_background(app_in_background),
            parsers::offerings,
            on_done,
        );
    }

    /// Post a purchase or restore receipt. Never delayed.
    pub fn post_receipt(
        &self,
        receipt: &ReceiptSubmission,
        on_done: impl FnOnce(Outcome<CustomerInfo, DirectedError<ReceiptDirective>>) + Send + 'static,
    ) {
        match bodies::receipt(receipt) {
            Ok((body, fields)) => {
                let call = EndpointCall::post(Endpoint::PostReceipt, body).signed(fields);
                self.dispatch(&self.receipts, call, DelayTier::None, parsers::customer_info, on_done);
            }
            Err(err) => on_done(Err(EndpointError::from_backend_error(err))),
        }
    }

    pub fn log_in(
        &self,
        current_app_user_id: &str,
        new_app_user_id: &str,
        on_done: impl FnOnce(Outcome<LogInResult>) + Send + 'static,
    ) {
        let (body, fields) = bodies::log_in(current_app_user_id, new_app_user_id);
        let call = EndpointCall::post(Endpoint::LogIn, body).signed(fields);
        self.dispatch(&self.log_in, call, DelayTier::None, parsers::log_in, on_done);
    }

    /// Always scheduled as a background call.
    pub fn get_product_entitlement_mapping(
        &self,
        on_done: impl FnOnce(Outcome<ProductEntitlementMapping>) + Send + 'static,
    ) {
        let call = EndpointCall::get(Endpoint::GetProductEntitlementMapping);
        self.dispatch(
            &self.entitlement_mapping,
            call,
            DelayTier::for_background(true),
            parsers::product_entitlement_mapping,
            on_done,
        );
    }

    pub fn get_virtual_currencies(
        &self,
        app_user_id: &str,
        app_in_background: bool,
        on_done: impl FnOnce(Outcome<VirtualCurrencies>) + Send + 'static,
    ) {
        let call =
            EndpointCall::get(Endpoint::GetVirtualCurrencies { app_user_id: app_user_id.into() });
        self.dispatch(
            &self.virtual_currencies,
            call,
            DelayTier::for_background(app_in_background),
            parsers::virtual_currencies,
            on_done,
        );
    }

    pub fn get_web_billing_products<I, S>(
        &self,
        app_user_id: &str,
        product_ids: I,
        on_done: impl FnOnce(Outcome<WebBillingProducts>) + Send + 'static,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let product_ids: BTreeSet<String> = product_ids.into_iter().map(Into::into).collect();
        let call = EndpointCall::get(Endpoint::WebBillingGetProducts {
            app_user_id: app_user_id.into(),
            product_ids,
        });
        self.dispatch(&self.web_billing, call, DelayTier::None, parsers::web_billing_products, on_done);
    }

    pub fn get_customer_center_config(
        &self,
        app_user_id: &str,
        on_done: impl FnOnce(Outcome<CustomerCenterConfig>) + Send + 'static,
    ) {
        let call =
            EndpointCall::get(Endpoint::GetCustomerCenterConfig { app_user_id: app_user_id.into() });
        self.dispatch(
            &self.customer_center,
            call,
            DelayTier::None,
            parsers::customer_center_config,
            on_done,
        );
    }

    pub fn post_redeem_web_purchase(
        &self,
        app_user_id: &str,
        redemption_token: &str,
        on_done: impl FnOnce(Outcome<CustomerInfo>) + Send + 'static,
    ) {
        let (body, fields) = bodies::redeem_web_purchase(app_user_id, redemption_token);
        let call = EndpointCall::post(Endpoint::PostRedeemWebPurchase, body).signed(fields);
        self.dispatch(&self.redemptions, call, DelayTier::None, parsers::redeem_web_purchase, on_done);
    }

    pub fn post_create_support_ticket(
        &self,
        app_user_id: &str,
        email: &str,
        description: &str,
        on_done: impl FnOnce(Outcome<SupportTicketResult>) + Send + 'static,
    ) {
        let body = bodies::support_ticket(app_user_id, email, description);
        let call = EndpointCall::post(Endpoint::PostCreateSupportTicket, body);
        self.dispatch(&self.support_tickets, call, DelayTier::None, parsers::support_ticket, on_done);
    }

    /// Post a diagnostics batch on the telemetry scheduler.
    pub fn post_diagnostics(
        &self,
        entries: &[DiagnosticsEntry],
        on_done: impl FnOnce(Outcome<DiagnosticsResponse, DirectedError<RetryDirective>>)
            + Send
            + 'static,
    ) {
        match bodies::diagnostics(entries) {
            Ok(body) => {
                let call = EndpointCall::post(Endpoint::PostDiagnostics, body);
                self.dispatch(&self.diagnostics, call, DelayTier::None, parsers::diagnostics, on_done);
            }
            Err(err) => on_done(Err(EndpointError::from_backend_error(err))),
        }
    }

    /// Post paywall events on the telemetry scheduler's long tier.
    pub fn post_paywall_events(
        &self,
        events: &[PaywallEvent],
        on_done: impl FnOnce(Outcome<(), DirectedError<RetryDirective>>) + Send + 'static,
    ) {
        match bodies::paywall_events(events) {
            Ok(body) => {
                let call = EndpointCall::post(Endpoint::PostPaywallEvents, body);
                self.dispatch(&self.paywall_events, call, DelayTier::Long, parsers::paywall_events, on_done);
            }
            Err(err) => on_done(Err(EndpointError::from_backend_error(err))),
        }
    }

    fn dispatch<T, E>(
        &self,
        dedup: &CallDeduplicator<Outcome<T, E>>,
        call: EndpointCall,
        tier: DelayTier,
        parse: Parser<T>,
        on_done: impl FnOnce(Outcome<T, E>) + Send + 'static,
    ) where
        T: Clone + Send + 'static,
        E: EndpointError,
        Outcome<T, E>: DispatchOutcome,
    {
        let endpoint = call.endpoint.name();
        let fingerprint = call.fingerprint();
        let digest = fingerprint.digest();
        debug!(fingerprint = %digest, endpoint, state = %CallState::Idle, "call requested");
        self.ctx.observer.on_request(endpoint);

        let request = self.ctx.build_request(call);
        let ctx = Arc::clone(&self.ctx);
        let op_digest = digest.clone();
        let operation = move || ctx.execute::<T, E>(&request, &op_digest, parse);

        match dedup.perform_with_tier(fingerprint, tier, operation, on_done) {
            Dispatch::Started => {
                debug!(fingerprint = %digest, endpoint, tier = %tier, state = %CallState::Dispatched, "call dispatched");
            }
            Dispatch::Joined => self.ctx.observer.on_coalesced(endpoint),
            Dispatch::Rejected => {
                warn!(fingerprint = %digest, endpoint, "scheduler shut down, call not dispatched");
            }
        }
    }
}
