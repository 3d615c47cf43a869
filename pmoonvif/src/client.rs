//! Entry point: builds sessions and issues requests on them.

use tracing::{debug, info};
use xmltree::{Element, XMLNode};

use crate::address::{DeviceAddress, DiscoveryRecord, select_address};
use crate::auth::Credentials;
use crate::bootstrap::{self, Target};
use crate::config::OnvifConfig;
use crate::errors::OnvifError;
use crate::session::Session;
use crate::transport::{HttpClient, Transport, UreqHttpClient};

/// ONVIF client.
///
/// Holds the configuration and the HTTP collaborator. It carries no
/// per-device state: everything about a device lives in its [`Session`].
pub struct OnvifClient<H = UreqHttpClient> {
    transport: Transport<H>,
    config: OnvifConfig,
}

impl OnvifClient<UreqHttpClient> {
    pub fn new(config: OnvifConfig) -> Self {
        let http = UreqHttpClient::new(&config.http);
        Self::with_http(http, config)
    }
}

impl<H: HttpClient> OnvifClient<H> {
    /// Client over a caller-supplied HTTP implementation.
    pub fn with_http(http: H, config: OnvifConfig) -> Self {
        let transport = Transport::new(http, config.http.user_agent.clone());
        Self { transport, config }
    }

    pub fn config(&self) -> &OnvifConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport<H> {
        &self.transport
    }

    /// Bootstraps a session against one known address.
    ///
    /// `address` may be a bare `scheme://host:port` or a full device service
    /// XAddr; without a path the configured device service path is used.
    pub fn bootstrap(&self, address: &str, credentials: Credentials) -> Result<Session, OnvifError> {
        self.bootstrap_with_scopes(address, Vec::new(), credentials)
    }

    /// Picks one address of a discovery record, then bootstraps it. The
    /// record's scopes are kept in the session.
    pub fn bootstrap_discovered(
        &self,
        record: &DiscoveryRecord,
        credentials: Credentials,
    ) -> Result<Session, OnvifError> {
        let address = select_address(&record.xaddrs, self.config.discovery).ok_or_else(|| {
            OnvifError::InvalidAddress("discovery record carries no address".to_string())
        })?;
        info!(address = %address, candidates = record.xaddrs.len(), "Bootstrapping discovered device");

        self.bootstrap_with_scopes(address, record.scopes.clone(), credentials)
    }

    fn bootstrap_with_scopes(
        &self,
        address: &str,
        scopes: Vec<String>,
        credentials: Credentials,
    ) -> Result<Session, OnvifError> {
        let (address, path) = DeviceAddress::parse(address)?;
        let target = Target {
            address,
            device_service_path: path.unwrap_or_else(|| self.config.device.service_path.clone()),
            scopes,
        };
        bootstrap::run(&self.transport, target, credentials)
    }

    /// Steady-state request on a ready session: negotiated auth, fresh
    /// security token, no retry. Returns the first element of the SOAP Body.
    pub fn call(
        &self,
        session: &Session,
        url: &str,
        action: &str,
        operation: &Element,
    ) -> Result<Element, OnvifError> {
        debug!(url = %url, action = %action, "ONVIF call");

        let envelope = self
            .transport
            .call(url, action, operation, session.request_auth())?;

        envelope
            .body
            .content
            .children
            .into_iter()
            .find_map(|node| match node {
                XMLNode::Element(element) => Some(element),
                _ => None,
            })
            .ok_or_else(|| OnvifError::malformed("Empty SOAP body"))
    }
}
