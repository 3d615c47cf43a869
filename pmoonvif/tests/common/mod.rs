#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Datelike, Duration, Timelike, Utc};
use pmoonvif::{AuthKind, HttpClient, HttpRequest, HttpResponse, OnvifError};

pub const MEDIA_NS: &str = "http://www.onvif.org/ver10/media/wsdl";
pub const PTZ_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";
pub const EVENTS_NS: &str = "http://www.onvif.org/ver10/events/wsdl";

/// Scripted camera. Answers by SOAPAction and records every request.
pub struct FakeCamera {
    /// The only mechanism the camera accepts; `None` rejects everything.
    pub accepts: Option<AuthKind>,
    /// Device clock relative to the test host.
    pub clock_offset_seconds: i64,
    /// `(namespace, xaddr)` in advertised order.
    pub services: Vec<(String, String)>,
    pub unreachable: bool,
    pub clock_status: Option<u16>,
    pub services_status: Option<u16>,
    requests: Mutex<Vec<HttpRequest>>,
    identities_served: AtomicUsize,
}

impl FakeCamera {
    pub fn accepting(kind: AuthKind) -> Self {
        Self {
            accepts: Some(kind),
            clock_offset_seconds: 0,
            services: vec![
                (
                    "http://www.onvif.org/ver10/device/wsdl".to_string(),
                    "http://192.168.1.20/onvif/device_service".to_string(),
                ),
                (MEDIA_NS.to_string(), "http://192.168.1.20/onvif/Media".to_string()),
                (PTZ_NS.to_string(), "http://192.168.1.20/onvif/PTZ".to_string()),
            ],
            unreachable: false,
            clock_status: None,
            services_status: None,
            requests: Mutex::new(Vec::new()),
            identities_served: AtomicUsize::new(0),
        }
    }

    pub fn rejecting_everything() -> Self {
        Self {
            accepts: None,
            ..Self::accepting(AuthKind::None)
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Operation names (last segment of the SOAPAction), in request order.
    pub fn operations(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| operation_name(r).to_string())
            .collect()
    }

    fn presented_auth(request: &HttpRequest) -> AuthKind {
        match request.header("Authorization") {
            Some(value) if value.starts_with("Basic ") => AuthKind::HttpBasic,
            Some(value) if value.starts_with("Digest ") => AuthKind::HttpDigest,
            _ if request.body.contains("wsse:UsernameToken") => AuthKind::WsSecurity,
            _ => AuthKind::None,
        }
    }

    fn answer(&self, request: &HttpRequest) -> HttpResponse {
        let operation = operation_name(request);

        if operation == "GetSystemDateAndTime" {
            return match self.clock_status {
                Some(status) => response(status, fault("s:Receiver", "clock unavailable")),
                None => response(200, clock_response(self.clock_offset_seconds)),
            };
        }

        let presented = Self::presented_auth(request);
        if Some(presented) != self.accepts {
            return match self.accepts {
                Some(AuthKind::HttpDigest) => challenge(),
                _ => response(401, fault("s:Sender", "Sender not authorized")),
            };
        }

        match operation {
            "GetDeviceInformation" => {
                let served = self.identities_served.fetch_add(1, Ordering::SeqCst) + 1;
                response(200, device_information_response(served))
            }
            "GetServices" => match self.services_status {
                Some(status) => response(status, fault("s:Receiver", "busy")),
                None => response(200, services_response(&self.services)),
            },
            "GetProfiles" => response(200, envelope("<trt:GetProfilesResponse xmlns:trt=\"http://www.onvif.org/ver10/media/wsdl\"><trt:Profiles token=\"main\"/></trt:GetProfilesResponse>")),
            _ => response(400, fault("s:Sender", "Optional Action Not Implemented")),
        }
    }
}

impl HttpClient for FakeCamera {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, OnvifError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.unreachable {
            return Err(OnvifError::transport("connection refused"));
        }
        Ok(self.answer(request))
    }
}

pub fn operation_name(request: &HttpRequest) -> &str {
    request
        .header("SOAPAction")
        .and_then(|action| action.rsplit('/').next())
        .unwrap_or_default()
}

fn response(status: u16, body: String) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![(
            "Content-Type".to_string(),
            "application/soap+xml; charset=utf-8".to_string(),
        )],
        body,
    }
}

fn challenge() -> HttpResponse {
    let mut answer = response(401, String::new());
    answer.headers.push((
        "WWW-Authenticate".to_string(),
        r#"Digest realm="camera", qop="auth", nonce="4e6f6e6365", algorithm=MD5"#.to_string(),
    ));
    answer
}

pub fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:tds="http://www.onvif.org/ver10/device/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema"><s:Body>{body}</s:Body></s:Envelope>"#
    )
}

pub fn fault(code: &str, reason: &str) -> String {
    envelope(&format!(
        r#"<s:Fault><s:Code><s:Value>{code}</s:Value></s:Code><s:Reason><s:Text xml:lang="en">{reason}</s:Text></s:Reason></s:Fault>"#
    ))
}

fn clock_response(offset_seconds: i64) -> String {
    let now = Utc::now() + Duration::seconds(offset_seconds);
    envelope(&format!(
        "<tds:GetSystemDateAndTimeResponse><tds:SystemDateAndTime>\
<tt:DateTimeType>NTP</tt:DateTimeType><tt:DaylightSavings>false</tt:DaylightSavings>\
<tt:UTCDateTime><tt:Time><tt:Hour>{}</tt:Hour><tt:Minute>{}</tt:Minute><tt:Second>{}</tt:Second></tt:Time>\
<tt:Date><tt:Year>{}</tt:Year><tt:Month>{}</tt:Month><tt:Day>{}</tt:Day></tt:Date></tt:UTCDateTime>\
</tds:SystemDateAndTime></tds:GetSystemDateAndTimeResponse>",
        now.hour(),
        now.minute(),
        now.second(),
        now.year(),
        now.month(),
        now.day()
    ))
}

/// `HardwareId` carries how many identities were served, this one included.
fn device_information_response(served: usize) -> String {
    envelope(&format!(
        "<tds:GetDeviceInformationResponse>\
<tds:Manufacturer>ACME</tds:Manufacturer><tds:Model>DomeCam 4</tds:Model>\
<tds:FirmwareVersion>5.4.1</tds:FirmwareVersion><tds:SerialNumber>AC-0042</tds:SerialNumber>\
<tds:HardwareId>1A2B-{served}</tds:HardwareId></tds:GetDeviceInformationResponse>"
    ))
}

fn services_response(services: &[(String, String)]) -> String {
    let entries: String = services
        .iter()
        .map(|(namespace, xaddr)| {
            format!(
                "<tds:Service><tds:Namespace>{namespace}</tds:Namespace><tds:XAddr>{xaddr}</tds:XAddr>\
<tds:Version><tt:Major>2</tt:Major><tt:Minor>60</tt:Minor></tds:Version></tds:Service>"
            )
        })
        .collect();
    envelope(&format!("<tds:GetServicesResponse>{entries}</tds:GetServicesResponse>"))
}
