//! Linear bootstrap: each stage consumes the previous one and either advances
//! or aborts the whole sequence. Only the last stage yields a [`Session`].

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::address::DeviceAddress;
use crate::auth::{AuthKind, AuthNegotiator, Credentials};
use crate::capabilities::CapabilityResolver;
use crate::device_service::{DeviceIdentity, DeviceManagementClient};
use crate::errors::OnvifError;
use crate::session::{Session, SessionState};
use crate::transport::{HttpClient, RequestAuth, Transport};

/// Where to bootstrap: the device address, its management path and the
/// scopes known from discovery.
#[derive(Clone, Debug)]
pub(crate) struct Target {
    pub address: DeviceAddress,
    pub device_service_path: String,
    pub scopes: Vec<String>,
}

impl Target {
    fn device_url(&self) -> String {
        self.address.url_for(&self.device_service_path)
    }
}

pub(crate) fn run<H: HttpClient>(
    transport: &Transport<H>,
    target: Target,
    credentials: Credentials,
) -> Result<Session, OnvifError> {
    let device_url = target.device_url();
    let device = DeviceManagementClient::new(transport, &device_url);

    info!(device = %device_url, state = %SessionState::Unbootstrapped, "Starting ONVIF bootstrap");

    Unbootstrapped {
        target,
        credentials,
    }
    .sync_time(&device)?
    .verify_auth(&device)?
    .fetch_identity(&device)?
    .resolve_capabilities(&device)
}

struct Unbootstrapped {
    target: Target,
    credentials: Credentials,
}

struct TimeSynced {
    target: Target,
    credentials: Credentials,
    clock_skew_seconds: i64,
}

struct AuthVerified {
    target: Target,
    credentials: Credentials,
    clock_skew_seconds: i64,
    auth_kind: AuthKind,
}

struct IdentityKnown {
    verified: AuthVerified,
    identity: DeviceIdentity,
}

impl Unbootstrapped {
    /// Unauthenticated clock probe. Any failure here ends the bootstrap
    /// before negotiation starts.
    fn sync_time<H: HttpClient>(
        self,
        device: &DeviceManagementClient<'_, H>,
    ) -> Result<TimeSynced, OnvifError> {
        let device_time = device.get_system_date_and_time(RequestAuth::anonymous(&self.credentials))?;
        let clock_skew_seconds = clock_skew(device_time, Utc::now());

        info!(
            state = %SessionState::TimeSynced,
            clock_skew_seconds,
            "Device clock read"
        );

        Ok(TimeSynced {
            target: self.target,
            credentials: self.credentials,
            clock_skew_seconds,
        })
    }
}

impl TimeSynced {
    /// Negotiates the auth kind with device-information probes. The identity
    /// returned by the accepted probe is only logged: the identity stage
    /// fetches it again with the verified kind and that copy replaces it.
    fn verify_auth<H: HttpClient>(
        self,
        device: &DeviceManagementClient<'_, H>,
    ) -> Result<AuthVerified, OnvifError> {
        let negotiated = AuthNegotiator::negotiate(|kind| {
            device.get_device_information(RequestAuth {
                kind,
                credentials: &self.credentials,
                clock_skew_seconds: self.clock_skew_seconds,
            })
        })?;

        info!(
            state = %SessionState::AuthVerified,
            auth = %negotiated.kind,
            probes = negotiated.attempts.len(),
            "Authentication verified"
        );
        debug!(identity = ?negotiated.probe_result, "Identity returned by the accepted probe");

        Ok(AuthVerified {
            target: self.target,
            credentials: self.credentials,
            clock_skew_seconds: self.clock_skew_seconds,
            auth_kind: negotiated.kind,
        })
    }
}

impl AuthVerified {
    fn auth(&self) -> RequestAuth<'_> {
        RequestAuth {
            kind: self.auth_kind,
            credentials: &self.credentials,
            clock_skew_seconds: self.clock_skew_seconds,
        }
    }

    fn fetch_identity<H: HttpClient>(
        self,
        device: &DeviceManagementClient<'_, H>,
    ) -> Result<IdentityKnown, OnvifError> {
        let identity = device.get_device_information(self.auth())?;

        info!(
            state = %SessionState::IdentityKnown,
            manufacturer = %identity.manufacturer,
            model = %identity.model,
            firmware = %identity.firmware_version,
            "Device identified"
        );

        Ok(IdentityKnown {
            verified: self,
            identity,
        })
    }
}

impl IdentityKnown {
    fn resolve_capabilities<H: HttpClient>(
        self,
        device: &DeviceManagementClient<'_, H>,
    ) -> Result<Session, OnvifError> {
        let services = device.get_services(self.verified.auth())?;
        let capabilities = CapabilityResolver::resolve(&services);

        info!(
            state = %SessionState::Ready,
            services = services.len(),
            features = capabilities.len(),
            "Session ready"
        );

        let AuthVerified {
            target,
            credentials,
            clock_skew_seconds,
            auth_kind,
        } = self.verified;

        Ok(Session {
            address: target.address,
            device_service_path: target.device_service_path,
            credentials,
            auth_kind,
            clock_skew_seconds,
            capabilities,
            identity: self.identity,
            scopes: target.scopes,
        })
    }
}

/// `device - local`, whole seconds.
fn clock_skew(device_time: DateTime<Utc>, local_time: DateTime<Utc>) -> i64 {
    (device_time - local_time).num_seconds()
}
