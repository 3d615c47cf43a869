//! # pmoonvif - client ONVIF
//!
//! Amorçage de session, négociation d'authentification et transport SOAP
//! pour les caméras et enregistreurs ONVIF.
//!
//! ```no_run
//! use pmoonvif::{Credentials, FeatureTag, OnvifClient, OnvifConfig};
//!
//! let client = OnvifClient::new(OnvifConfig::default());
//! let session = client.bootstrap("http://192.168.1.20", Credentials::new("admin", "admin"))?;
//! println!("auth: {}, media: {:?}", session.auth_kind, session.endpoint_url(FeatureTag::MediaV10));
//! # Ok::<(), pmoonvif::OnvifError>(())
//! ```

mod bootstrap;

pub mod address;
pub mod auth;
pub mod capabilities;
pub mod client;
pub mod config;
pub mod device_service;
pub mod errors;
pub mod security;
pub mod session;
pub mod soap;
pub mod transport;

pub use address::{AddressPreference, DeviceAddress, DiscoveryRecord, select_address};
pub use auth::{AuthAttempt, AuthKind, AuthNegotiator, AuthOutcome, Credentials, Negotiated};
pub use capabilities::{CapabilityMap, CapabilityResolver, FeatureTag, ServiceDescriptor};
pub use client::OnvifClient;
pub use config::{DeviceConfig, HttpConfig, OnvifConfig};
pub use device_service::{DeviceIdentity, DeviceManagementClient};
pub use errors::OnvifError;
pub use security::SecurityToken;
pub use session::{Session, SessionState};
pub use transport::{HttpClient, HttpRequest, HttpResponse, RequestAuth, Transport, UreqHttpClient};
