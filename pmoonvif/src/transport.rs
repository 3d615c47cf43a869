//! SOAP over HTTP: one request, one answer, no retries.
//!
//! The HTTP client itself is a collaborator behind [`HttpClient`]; the
//! production implementation is [`UreqHttpClient`].

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, trace, warn};
use ureq::Agent;
use ureq::tls::TlsConfig;
use url::Url;
use xmltree::Element;

use crate::auth::{AuthKind, Credentials};
use crate::config::HttpConfig;
use crate::errors::OnvifError;
use crate::security::SecurityToken;
use crate::soap::{SoapBody, SoapEnvelope, classify_response};

pub const SOAP_CONTENT_TYPE: &str = "application/soap+xml";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    pub fn post(url: &str, body: String) -> Self {
        Self {
            method: "POST",
            url: url.to_string(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name).next()
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name).next()
    }

    /// All values of a header that may be repeated (e.g. `WWW-Authenticate`).
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + use<'a> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a, 'n>(
    headers: &'a [(String, String)],
    name: &'n str,
) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
    headers
        .iter()
        .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// HTTP/TLS collaborator. Connection pooling and certificate policy live here.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, OnvifError>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, OnvifError> {
        (**self).execute(request)
    }
}

/// Blocking HTTP client backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqHttpClient {
    agent: Agent,
}

impl UreqHttpClient {
    pub fn new(config: &HttpConfig) -> Self {
        // 4xx/5xx must not become ureq errors: SOAP faults travel in those bodies.
        let mut builder = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)));

        if config.accept_invalid_certs {
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }

        let agent: Agent = builder.build().into();
        Self { agent }
    }
}

impl HttpClient for UreqHttpClient {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, OnvifError> {
        if request.method != "POST" {
            return Err(OnvifError::transport(format!(
                "unsupported HTTP method {}",
                request.method
            )));
        }

        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_str())
            .map_err(|e| OnvifError::transport(format!("{} {}: {}", request.method, request.url, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| OnvifError::transport(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Everything the transport needs to authenticate one request.
#[derive(Debug, Clone, Copy)]
pub struct RequestAuth<'a> {
    pub kind: AuthKind,
    pub credentials: &'a Credentials,
    pub clock_skew_seconds: i64,
}

impl<'a> RequestAuth<'a> {
    /// Unauthenticated request, used for the clock probe.
    pub fn anonymous(credentials: &'a Credentials) -> Self {
        Self {
            kind: AuthKind::None,
            credentials,
            clock_skew_seconds: 0,
        }
    }
}

pub struct Transport<H> {
    http: H,
    user_agent: String,
}

impl<H: HttpClient> Transport<H> {
    pub fn new(http: H, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
        }
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    /// Sends `operation` to `endpoint` and returns the raw body of a 2xx answer.
    ///
    /// Non-2xx answers become `ProtocolFault` with status and body verbatim.
    pub fn send(
        &self,
        endpoint: &str,
        soap_action: &str,
        operation: &Element,
        auth: RequestAuth<'_>,
    ) -> Result<String, OnvifError> {
        let response = self.exchange(endpoint, soap_action, operation, auth)?;
        if (200..300).contains(&response.status) {
            Ok(response.body)
        } else {
            Err(OnvifError::ProtocolFault {
                status: response.status,
                body: response.body,
            })
        }
    }

    /// Like [`send`](Self::send), then parses and classifies the answer: a
    /// Fault inside a 2xx body is a `ProtocolFault` too.
    pub fn call(
        &self,
        endpoint: &str,
        soap_action: &str,
        operation: &Element,
        auth: RequestAuth<'_>,
    ) -> Result<SoapEnvelope, OnvifError> {
        let response = self.exchange(endpoint, soap_action, operation, auth)?;
        classify_response(response.status, &response.body)
    }

    fn exchange(
        &self,
        endpoint: &str,
        soap_action: &str,
        operation: &Element,
        auth: RequestAuth<'_>,
    ) -> Result<HttpResponse, OnvifError> {
        let mut envelope = SoapEnvelope::new(SoapBody::wrap(operation.clone()));
        if let Some(token) =
            SecurityToken::for_auth(auth.kind, auth.credentials, auth.clock_skew_seconds)
        {
            token.apply(&mut envelope);
        }
        let xml = envelope.to_xml()?;

        debug!(url = %endpoint, action = %soap_action, auth = %auth.kind, "Sending SOAP request");

        let request = HttpRequest::post(endpoint, xml)
            .with_header(
                "Content-Type",
                format!(
                    r#"{}; charset=utf-8; action="{}""#,
                    SOAP_CONTENT_TYPE, soap_action
                ),
            )
            .with_header("SOAPAction", soap_action)
            .with_header("User-Agent", self.user_agent.as_str());

        let request = match auth.kind {
            AuthKind::HttpBasic => request.with_header(
                "Authorization",
                basic_authorization(auth.credentials),
            ),
            AuthKind::WsSecurity | AuthKind::HttpDigest | AuthKind::None => request,
        };

        let mut response = self.http.execute(&request)?;

        if auth.kind == AuthKind::HttpDigest && response.status == 401 {
            match digest_authorization(&response, &request, auth.credentials) {
                Some(authorization) => {
                    trace!(url = %endpoint, "Answering digest challenge");
                    let request = request.with_header("Authorization", authorization);
                    response = self.http.execute(&request)?;
                }
                None => {
                    debug!(url = %endpoint, "401 without a usable digest challenge");
                }
            }
        }

        trace!(url = %endpoint, status = response.status, "SOAP response received");
        Ok(response)
    }
}

fn basic_authorization(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.username(), credentials.password());
    format!("Basic {}", BASE64.encode(raw))
}

fn digest_authorization(
    response: &HttpResponse,
    request: &HttpRequest,
    credentials: &Credentials,
) -> Option<String> {
    let challenge = response
        .header_values("WWW-Authenticate")
        .find(|v| v.trim_start().to_ascii_lowercase().starts_with("digest"))?;

    let uri = request_uri(&request.url);
    let context = digest_auth::AuthContext::new_post(
        credentials.username(),
        credentials.password(),
        uri.as_str(),
        Some(request.body.as_bytes()),
    );

    let mut prompt = match digest_auth::parse(challenge) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!(error = %e, "Unparsable digest challenge");
            return None;
        }
    };

    match prompt.respond(&context) {
        Ok(answer) => Some(answer.to_header_string()),
        Err(e) => {
            warn!(error = %e, "Cannot answer digest challenge");
            None
        }
    }
}

/// Path and query of a URL, as used in the digest `uri` field.
fn request_uri(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{}", parsed.path(), query),
            None => parsed.path().to_string(),
        },
        Err(_) => "/".to_string(),
    }
}
