use std::fmt;

use crate::address::DeviceAddress;
use crate::auth::{AuthKind, Credentials};
use crate::capabilities::{CapabilityMap, FeatureTag};
use crate::device_service::DeviceIdentity;
use crate::transport::RequestAuth;

/// Stages of the bootstrap, in order. Each one either advances or aborts
/// the whole sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unbootstrapped,
    TimeSynced,
    AuthVerified,
    IdentityKnown,
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unbootstrapped => "unbootstrapped",
            SessionState::TimeSynced => "time-synced",
            SessionState::AuthVerified => "auth-verified",
            SessionState::IdentityKnown => "identity-known",
            SessionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// A device ready to be talked to.
///
/// Built by [`OnvifClient::bootstrap`](crate::OnvifClient::bootstrap), or by
/// hand with [`Session::new`] when the caller already knows the right values.
/// Nothing in the crate mutates a session once built: it can be shared
/// between threads freely.
#[derive(Clone)]
pub struct Session {
    pub address: DeviceAddress,
    pub device_service_path: String,
    pub credentials: Credentials,
    /// The mechanism verified to work during bootstrap.
    pub auth_kind: AuthKind,
    /// `device_time - local_time`, in seconds.
    pub clock_skew_seconds: i64,
    pub capabilities: CapabilityMap,
    pub identity: DeviceIdentity,
    pub scopes: Vec<String>,
}

impl Session {
    /// Manual construction, skipping bootstrap. No clock skew, no
    /// capabilities, no identity.
    pub fn new(
        address: DeviceAddress,
        device_service_path: impl Into<String>,
        credentials: Credentials,
        auth_kind: AuthKind,
    ) -> Self {
        Self {
            address,
            device_service_path: device_service_path.into(),
            credentials,
            auth_kind,
            clock_skew_seconds: 0,
            capabilities: CapabilityMap::default(),
            identity: DeviceIdentity::default(),
            scopes: Vec::new(),
        }
    }

    pub fn device_service_url(&self) -> String {
        self.address.url_for(&self.device_service_path)
    }

    pub fn endpoint(&self, feature: FeatureTag) -> Option<&str> {
        self.capabilities.get(feature)
    }

    pub fn endpoint_url(&self, feature: FeatureTag) -> Option<String> {
        self.endpoint(feature).map(|path| self.address.url_for(path))
    }

    pub fn request_auth(&self) -> RequestAuth<'_> {
        RequestAuth {
            kind: self.auth_kind,
            credentials: &self.credentials,
            clock_skew_seconds: self.clock_skew_seconds,
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address.to_string())
            .field("device_service_path", &self.device_service_path)
            .field("auth_kind", &self.auth_kind)
            .field("clock_skew_seconds", &self.clock_skew_seconds)
            .field("capabilities", &self.capabilities)
            .field("identity", &self.identity)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}
