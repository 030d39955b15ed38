//! Blocking reqwest transport
//!
//! Sends one [`TransportRequest`] to the primary host and, for
//! fallback-capable GET endpoints, to each fallback host in turn while the
//! previous attempt failed at the network level or with a 5xx.
//!
//! A request that cannot be expressed on the wire at all (unparseable URL,
//! illegal header name or value) is a configuration defect. It is reported
//! as [`TransportError::Permission`] so it is never retried or sent to a
//! fallback host.

use std::time::Duration;

use reqwest::blocking::{Client as BlockingClient, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use sha2::{Digest, Sha256};
use tollgate_core::Transport;
use tollgate_domain::constants::{
    DEFAULT_LOAD_SHEDDER_HEADER, DEFAULT_REQUEST_TIMEOUT_SECS, HEADER_POST_PARAMS_HASH, SDK_VERSION,
};
use tollgate_domain::{
    join_url, FieldsToSign, HttpMethod, ResponseOrigin, TollgateError, TransportConfig,
    TransportError, TransportRequest, TransportResult, VerificationResult,
};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::{transport_error, InfraError};

/// Blocking reqwest implementation of the core [`Transport`] port.
///
/// Must be built and called outside of an async context; scheduler workers
/// run it on tokio's blocking pool.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: BlockingClient,
    load_shedder_header: String,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Build a transport from the `[transport]` configuration section.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TollgateError> {
        Self::builder()
            .timeout(config.request_timeout())
            .load_shedder_header(config.load_shedder_header.clone())
            .build()
    }

    fn send_once(
        &self,
        base_url: &str,
        request: &TransportRequest,
    ) -> Result<TransportResult, TransportError> {
        let raw_url = join_url(base_url, &request.endpoint.path());
        let url = Url::parse(&raw_url)
            .map_err(|err| invalid_request(format!("invalid url '{raw_url}': {err}")))?;

        let method = match request.endpoint.method() {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        let mut builder = self.client.request(method, url).headers(build_headers(request)?);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(endpoint = request.endpoint.name(), base_url, "sending HTTP request");
        let response = builder.send().map_err(|err| {
            debug!(endpoint = request.endpoint.name(), error = %err, "HTTP request failed");
            transport_error(&err)
        })?;

        self.read_response(request, response)
    }

    fn read_response(
        &self,
        request: &TransportRequest,
        response: Response,
    ) -> Result<TransportResult, TransportError> {
        let status = response.status().as_u16();
        let shed = response
            .headers()
            .get(self.load_shedder_header.as_str())
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
        let body = response.text().map_err(|err| transport_error(&err))?;

        debug!(endpoint = request.endpoint.name(), status, "received HTTP response");

        let mut result = TransportResult::new(status, body);
        if shed {
            result = result.with_origin(ResponseOrigin::LoadShedder);
        }
        if request.endpoint.supports_signature_verification() {
            result = result.with_verification(VerificationResult::NotRequested);
        }
        Ok(result)
    }
}

impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(endpoint = request.endpoint.name()))]
    fn perform_request(&self, request: &TransportRequest) -> Result<TransportResult, TransportError> {
        let primary = self.send_once(&request.base_url, request);

        let may_fall_back = request.endpoint.supports_fallback_base_urls()
            && request.endpoint.method() == HttpMethod::Get
            && !request.fallback_base_urls.is_empty();
        if !may_fall_back || !should_try_fallback(&primary) {
            return primary;
        }

        let mut last = primary;
        for fallback in &request.fallback_base_urls {
            warn!(endpoint = request.endpoint.name(), fallback, "retrying against fallback host");
            last = self
                .send_once(fallback, request)
                .map(|result| result.with_origin(ResponseOrigin::FallbackHost));
            if !should_try_fallback(&last) {
                break;
            }
        }
        last
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    load_shedder_header: String,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: None,
            load_shedder_header: DEFAULT_LOAD_SHEDDER_HEADER.to_string(),
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Response header whose value `true` marks a load-shedder response.
    pub fn load_shedder_header(mut self, name: impl Into<String>) -> Self {
        self.load_shedder_header = name.into().to_ascii_lowercase();
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TollgateError> {
        let agent = self.user_agent.unwrap_or_else(|| format!("tollgate/{SDK_VERSION}"));
        let client = BlockingClient::builder()
            .timeout(self.timeout)
            .user_agent(agent)
            .no_proxy()
            .build()
            .map_err(|err| TollgateError::from(InfraError::from(err)))?;

        Ok(ReqwestTransport { client, load_shedder_header: self.load_shedder_header })
    }
}

/// `X-Post-Params-Hash` value for a list of signed fields.
///
/// Format: `<k1,k2,...>:sha256:<hex digest of the values joined by NUL>`.
pub fn post_params_hash(fields: &FieldsToSign) -> String {
    let keys = fields.iter().map(|(key, _)| key.as_str()).collect::<Vec<_>>().join(",");
    let joined = fields.iter().map(|(_, value)| value.as_str()).collect::<Vec<_>>().join("\u{0}");
    let digest = Sha256::digest(joined.as_bytes());
    format!("{keys}:sha256:{}", hex::encode(digest))
}

fn build_headers(request: &TransportRequest) -> Result<HeaderMap, TransportError> {
    let mut headers = HeaderMap::with_capacity(request.headers.len() + 1);
    for (name, value) in &request.headers {
        insert_header(&mut headers, name, value)?;
    }
    if let Some(fields) = request.fields_to_sign.as_ref().filter(|fields| !fields.is_empty()) {
        insert_header(&mut headers, HEADER_POST_PARAMS_HASH, &post_params_hash(fields))?;
    }
    Ok(headers)
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), TransportError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| invalid_request(format!("invalid header name '{name}': {err}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| invalid_request(format!("invalid value for header '{name}': {err}")))?;
    headers.insert(name, value);
    Ok(())
}

fn invalid_request(message: String) -> TransportError {
    warn!(%message, "request rejected before sending");
    TransportError::Permission(message)
}

fn should_try_fallback(outcome: &Result<TransportResult, TransportError>) -> bool {
    match outcome {
        Ok(result) => result.is_server_error(),
        Err(TransportError::Network(_)) => true,
        Err(TransportError::Permission(_)) => false,
    }
}
