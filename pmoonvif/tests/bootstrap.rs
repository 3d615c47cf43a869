mod common;

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use common::{EVENTS_NS, FakeCamera, MEDIA_NS, operation_name};
use pmoonvif::soap::operation_element;
use pmoonvif::{
    AddressPreference, AuthKind, AuthOutcome, Credentials, DiscoveryRecord, FeatureTag,
    OnvifClient, OnvifConfig, OnvifError,
};

fn client(camera: &Arc<FakeCamera>) -> OnvifClient<Arc<FakeCamera>> {
    OnvifClient::with_http(Arc::clone(camera), OnvifConfig::default())
}

fn credentials() -> Credentials {
    Credentials::new("admin", "Sup3rSecret")
}

#[test]
fn basic_only_device_is_adopted_on_third_probe() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();

    assert_eq!(session.auth_kind, AuthKind::HttpBasic);
    assert_eq!(
        camera.operations(),
        [
            "GetSystemDateAndTime",
            // ws_security, http_digest, http_basic
            "GetDeviceInformation",
            "GetDeviceInformation",
            "GetDeviceInformation",
            // identity stage
            "GetDeviceInformation",
            "GetServices",
        ]
    );

    let requests = camera.requests();
    assert!(requests[1].body.contains("wsse:UsernameToken"));
    assert_eq!(requests[2].header("Authorization"), None);
    assert!(requests[3].header("Authorization").unwrap().starts_with("Basic "));
    assert!(
        requests[4..]
            .iter()
            .all(|r| r.header("Authorization").is_some_and(|v| v.starts_with("Basic ")))
    );
}

#[test]
fn ready_session_carries_identity_and_advertised_capabilities_only() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::WsSecurity));
    let session = client(&camera)
        .bootstrap("http://192.168.1.20:80/onvif/device_service", credentials())
        .unwrap();

    assert_eq!(session.auth_kind, AuthKind::WsSecurity);
    assert_eq!(session.identity.manufacturer, "ACME");
    assert_eq!(session.identity.model, "DomeCam 4");
    assert_eq!(session.identity.serial_number, "AC-0042");
    assert_eq!(session.endpoint(FeatureTag::MediaV10), Some("/onvif/Media"));
    assert_eq!(session.endpoint(FeatureTag::Ptz), Some("/onvif/PTZ"));
    assert_eq!(session.endpoint(FeatureTag::Recording), None);
    assert_eq!(session.endpoint(FeatureTag::Event), None);
    assert_eq!(session.capabilities.len(), 2);
    assert!(session.scopes.is_empty());

    // ws_security is tried first and wins: clock, probe, identity, services.
    assert_eq!(camera.requests().len(), 4);
}

#[test]
fn identity_stage_replaces_the_negotiation_answer() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();

    // First identity served to the accepted probe, second to the identity stage.
    assert_eq!(session.identity.hardware_id, "1A2B-2");
}

#[test]
fn ws_security_tokens_follow_the_device_clock() {
    let mut camera = FakeCamera::accepting(AuthKind::WsSecurity);
    camera.clock_offset_seconds = 3600;
    let camera = Arc::new(camera);

    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();
    assert!((3598..=3602).contains(&session.clock_skew_seconds));

    let probe = &camera.requests()[1];
    let created = probe
        .body
        .split("<wsu:Created>")
        .nth(1)
        .and_then(|rest| rest.split("</wsu:Created>").next())
        .unwrap();
    let created = NaiveDateTime::parse_from_str(created, "%Y-%m-%dT%H:%M:%SZ")
        .unwrap()
        .and_utc();
    let ahead = (created - Utc::now()).num_seconds();
    assert!((3590..=3602).contains(&ahead), "token created {ahead}s ahead");
}

#[test]
fn digest_device_gets_a_challenge_response() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpDigest));
    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();
    assert_eq!(session.auth_kind, AuthKind::HttpDigest);

    let requests = camera.requests();
    // clock, ws probe, digest probe (challenge + answer), identity x2, services x2
    assert_eq!(requests.len(), 8);
    let answered = &requests[3];
    assert_eq!(operation_name(answered), "GetDeviceInformation");
    let authorization = answered.header("Authorization").unwrap();
    assert!(authorization.starts_with("Digest "));
    assert!(authorization.contains(r#"username="admin""#));
    assert!(authorization.contains(r#"uri="/onvif/device_service""#));
}

#[test]
fn clock_failure_short_circuits_before_negotiation() {
    let mut camera = FakeCamera::accepting(AuthKind::HttpBasic);
    camera.unreachable = true;
    let camera = Arc::new(camera);

    let err = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap_err();
    assert!(matches!(err, OnvifError::TransportFailure { .. }), "{err:?}");
    assert_eq!(camera.operations(), ["GetSystemDateAndTime"]);

    let mut camera = FakeCamera::accepting(AuthKind::HttpBasic);
    camera.clock_status = Some(500);
    let camera = Arc::new(camera);

    let err = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap_err();
    match err {
        OnvifError::ProtocolFault { status, ref body } => {
            assert_eq!(status, 500);
            assert!(body.contains("clock unavailable"));
        }
        other => panic!("expected the clock fault, got {other:?}"),
    }
    assert_eq!(camera.requests().len(), 1);
}

#[test]
fn exhausted_negotiation_is_fatal() {
    let camera = Arc::new(FakeCamera::rejecting_everything());
    let err = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap_err();

    match err {
        OnvifError::NoWorkingAuth { attempts } => {
            let kinds: Vec<_> = attempts.iter().map(|a| a.kind).collect();
            assert_eq!(kinds, AuthKind::PRIORITY);
            assert!(
                attempts
                    .iter()
                    .all(|a| matches!(a.outcome, AuthOutcome::Rejected(_)))
            );
        }
        other => panic!("expected NoWorkingAuth, got {other:?}"),
    }
    // One clock probe and one request per kind; services never asked.
    assert_eq!(camera.requests().len(), 5);
    assert!(!camera.operations().iter().any(|op| op == "GetServices"));
}

#[test]
fn service_list_failure_aborts_the_bootstrap() {
    let mut camera = FakeCamera::accepting(AuthKind::HttpBasic);
    camera.services_status = Some(503);
    let camera = Arc::new(camera);

    let err = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap_err();
    assert!(matches!(err, OnvifError::ProtocolFault { status: 503, .. }));
}

#[test]
fn vendor_service_variants_first_match_wins() {
    let mut camera = FakeCamera::accepting(AuthKind::HttpBasic);
    camera.services = vec![
        (
            "http://www.onvif.org/ver10/events/wsdl/vendor".to_string(),
            "http://192.168.1.20:8080/vendor/events".to_string(),
        ),
        (EVENTS_NS.to_string(), "http://192.168.1.20/onvif/Events".to_string()),
    ];
    let camera = Arc::new(camera);

    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();
    assert_eq!(session.endpoint(FeatureTag::Event), Some("/vendor/events"));
    assert_eq!(session.endpoint(FeatureTag::MediaV10), None);
}

#[test]
fn discovered_device_uses_preferred_address_and_keeps_scopes() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let mut config = OnvifConfig::default();
    config.discovery = AddressPreference {
        prefer_ipv6: true,
        prefer_https: true,
    };
    let client = OnvifClient::with_http(Arc::clone(&camera), config);

    let record = DiscoveryRecord {
        xaddrs: vec![
            "http://[fe80::12]/onvif/device_service".to_string(),
            "https://[fe80::12]:8443/onvif/device_service".to_string(),
            "http://192.168.1.20/onvif/device_service".to_string(),
        ],
        scopes: vec![
            "onvif://www.onvif.org/type/video_encoder".to_string(),
            "onvif://www.onvif.org/name/DomeCam".to_string(),
        ],
    };

    let session = client.bootstrap_discovered(&record, credentials()).unwrap();
    assert_eq!(session.address.to_string(), "https://[fe80::12]:8443");
    assert_eq!(session.scopes, record.scopes);
    assert!(
        camera
            .requests()
            .iter()
            .all(|r| r.url == "https://[fe80::12]:8443/onvif/device_service")
    );
}

#[test]
fn empty_discovery_record_is_an_invalid_address() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let err = client(&camera)
        .bootstrap_discovered(&DiscoveryRecord::default(), credentials())
        .unwrap_err();
    assert!(matches!(err, OnvifError::InvalidAddress(_)));
    assert!(camera.requests().is_empty());
}

#[test]
fn steady_state_call_uses_negotiated_auth() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let client = client(&camera);
    let session = client.bootstrap("http://192.168.1.20", credentials()).unwrap();

    let url = session.endpoint_url(FeatureTag::MediaV10).unwrap();
    assert_eq!(url, "http://192.168.1.20:80/onvif/Media");

    let response = client
        .call(
            &session,
            &url,
            "http://www.onvif.org/ver10/media/wsdl/GetProfiles",
            &operation_element("GetProfiles", MEDIA_NS),
        )
        .unwrap();
    assert_eq!(response.name, "GetProfilesResponse");

    let last = camera.requests().pop().unwrap();
    assert_eq!(last.url, url);
    assert!(last.header("Authorization").unwrap().starts_with("Basic "));
}

#[test]
fn steady_state_faults_are_returned_uninterpreted() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let client = client(&camera);
    let session = client.bootstrap("http://192.168.1.20", credentials()).unwrap();
    let before = camera.requests().len();

    let err = client
        .call(
            &session,
            &session.device_service_url(),
            "http://www.onvif.org/ver10/device/wsdl/SystemReboot",
            &operation_element("SystemReboot", pmoonvif::soap::DEVICE_NS),
        )
        .unwrap_err();
    assert!(matches!(err, OnvifError::ProtocolFault { status: 400, .. }));
    assert_eq!(
        err.soap_fault().unwrap().reason,
        "Optional Action Not Implemented"
    );
    assert_eq!(camera.requests().len(), before + 1);
}

#[test]
fn session_debug_hides_credentials() {
    let camera = Arc::new(FakeCamera::accepting(AuthKind::HttpBasic));
    let session = client(&camera)
        .bootstrap("http://192.168.1.20", credentials())
        .unwrap();

    let debug = format!("{session:?}");
    assert!(!debug.contains("Sup3rSecret"));
    assert!(debug.contains("HttpBasic"));
}
