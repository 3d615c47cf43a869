//! Device management operations needed to bootstrap a session:
//! clock, identity and service list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;
use xmltree::{Element, XMLNode};

use crate::capabilities::ServiceDescriptor;
use crate::errors::OnvifError;
use crate::soap::{
    DEVICE_NS, SoapEnvelope, child_text, expect_response, find_child,
    operation_element, text_element,
};
use crate::transport::{HttpClient, RequestAuth, Transport};

pub const GET_SYSTEM_DATE_AND_TIME: &str =
    "http://www.onvif.org/ver10/device/wsdl/GetSystemDateAndTime";
pub const GET_DEVICE_INFORMATION: &str =
    "http://www.onvif.org/ver10/device/wsdl/GetDeviceInformation";
pub const GET_SERVICES: &str = "http://www.onvif.org/ver10/device/wsdl/GetServices";

/// Informational identity fields reported by the device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub hardware_id: String,
}

pub struct DeviceManagementClient<'a, H> {
    transport: &'a Transport<H>,
    device_url: &'a str,
}

impl<'a, H: HttpClient> DeviceManagementClient<'a, H> {
    pub fn new(transport: &'a Transport<H>, device_url: &'a str) -> Self {
        Self {
            transport,
            device_url,
        }
    }

    fn invoke(
        &self,
        action: &str,
        operation: &Element,
        auth: RequestAuth<'_>,
    ) -> Result<SoapEnvelope, OnvifError> {
        self.transport.call(self.device_url, action, operation, auth)
    }

    /// Device clock, in UTC. ONVIF requires this call to work unauthenticated.
    pub fn get_system_date_and_time(
        &self,
        auth: RequestAuth<'_>,
    ) -> Result<DateTime<Utc>, OnvifError> {
        let envelope = self.invoke(
            GET_SYSTEM_DATE_AND_TIME,
            &operation_element("GetSystemDateAndTime", DEVICE_NS),
            auth,
        )?;
        parse_system_date_and_time(&envelope)
    }

    pub fn get_device_information(
        &self,
        auth: RequestAuth<'_>,
    ) -> Result<DeviceIdentity, OnvifError> {
        let envelope = self.invoke(
            GET_DEVICE_INFORMATION,
            &operation_element("GetDeviceInformation", DEVICE_NS),
            auth,
        )?;
        parse_device_information(&envelope)
    }

    pub fn get_services(
        &self,
        auth: RequestAuth<'_>,
    ) -> Result<Vec<ServiceDescriptor>, OnvifError> {
        let mut operation = operation_element("GetServices", DEVICE_NS);
        operation
            .children
            .push(XMLNode::Element(text_element("IncludeCapability", "false")));

        let envelope = self.invoke(GET_SERVICES, &operation, auth)?;
        parse_services(&envelope)
    }
}

fn parse_system_date_and_time(envelope: &SoapEnvelope) -> Result<DateTime<Utc>, OnvifError> {
    let response = expect_response(envelope, "GetSystemDateAndTimeResponse")?;
    let system = find_child(response, "SystemDateAndTime")
        .ok_or_else(|| OnvifError::malformed("Missing SystemDateAndTime element"))?;

    // Some devices only fill LocalDateTime; it is then taken as UTC.
    let date_time = find_child(system, "UTCDateTime")
        .or_else(|| {
            warn!("Device reports no UTCDateTime, using LocalDateTime");
            find_child(system, "LocalDateTime")
        })
        .ok_or_else(|| OnvifError::malformed("Missing UTCDateTime element"))?;

    let date = find_child(date_time, "Date")
        .ok_or_else(|| OnvifError::malformed("Missing Date element"))?;
    let time = find_child(date_time, "Time")
        .ok_or_else(|| OnvifError::malformed("Missing Time element"))?;

    let year = number(date, "Year")?;
    let month = number(date, "Month")?;
    let day = number(date, "Day")?;
    let hour = number(time, "Hour")?;
    let minute = number(time, "Minute")?;
    let second = number(time, "Second")?;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            OnvifError::malformed(format!(
                "Invalid device date {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ))
        })
}

fn number(parent: &Element, name: &str) -> Result<i32, OnvifError> {
    let text = child_text(parent, name)
        .ok_or_else(|| OnvifError::malformed(format!("Missing {name} element")))?;
    text.parse()
        .map_err(|_| OnvifError::malformed(format!("Invalid {name} value: {text}")))
}

fn parse_device_information(envelope: &SoapEnvelope) -> Result<DeviceIdentity, OnvifError> {
    let response = expect_response(envelope, "GetDeviceInformationResponse")?;
    let field = |name: &str| child_text(response, name).unwrap_or_default();

    Ok(DeviceIdentity {
        manufacturer: field("Manufacturer"),
        model: field("Model"),
        firmware_version: field("FirmwareVersion"),
        serial_number: field("SerialNumber"),
        hardware_id: field("HardwareId"),
    })
}

/// Services in device-reported order. Entries without namespace or address
/// are skipped.
fn parse_services(envelope: &SoapEnvelope) -> Result<Vec<ServiceDescriptor>, OnvifError> {
    let response = expect_response(envelope, "GetServicesResponse")?;

    let services = response
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .filter(|e| e.name == "Service")
        .filter_map(|service| {
            let namespace = child_text(service, "Namespace");
            let xaddr = child_text(service, "XAddr");
            let (Some(namespace), Some(xaddr)) = (namespace, xaddr) else {
                warn!("Skipping service entry without Namespace or XAddr");
                return None;
            };
            let version = find_child(service, "Version").and_then(|v| {
                Some(format!(
                    "{}.{}",
                    child_text(v, "Major")?,
                    child_text(v, "Minor")?
                ))
            });
            Some(ServiceDescriptor {
                namespace,
                xaddr,
                version,
            })
        })
        .collect();

    Ok(services)
}
