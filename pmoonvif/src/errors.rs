use thiserror::Error;

use crate::auth::AuthAttempt;
use crate::soap::{SoapFault, parse_soap_fault};

#[derive(Error, Debug)]
pub enum OnvifError {
    /// Network, TLS or timeout failure: no HTTP answer was obtained.
    #[error("Transport failure: {cause}")]
    TransportFailure { cause: String },

    /// The device answered, but with an error status or a SOAP Fault.
    /// Status and body are kept verbatim.
    #[error("Device returned HTTP status {status}")]
    ProtocolFault { status: u16, body: String },

    #[error("No authentication method accepted by the device ({} tried)", .attempts.len())]
    NoWorkingAuth { attempts: Vec<AuthAttempt> },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Failed to serialize SOAP envelope: {0}")]
    Serialization(String),

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OnvifError {
    pub fn transport(cause: impl ToString) -> Self {
        OnvifError::TransportFailure {
            cause: cause.to_string(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        OnvifError::MalformedResponse(message.into())
    }

    /// Decodes the SOAP fault carried by a `ProtocolFault`, if its body holds one.
    pub fn soap_fault(&self) -> Option<SoapFault> {
        match self {
            OnvifError::ProtocolFault { body, .. } => parse_soap_fault(body.as_bytes()),
            _ => None,
        }
    }

    /// True when the device refused the credentials rather than the request.
    pub fn is_auth_rejection(&self) -> bool {
        match self {
            OnvifError::ProtocolFault { status, .. } if *status == 401 || *status == 403 => true,
            OnvifError::ProtocolFault { .. } => self
                .soap_fault()
                .map(|fault| fault.is_not_authorized())
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl From<ureq::Error> for OnvifError {
    fn from(err: ureq::Error) -> Self {
        OnvifError::transport(err)
    }
}

impl From<xmltree::Error> for OnvifError {
    fn from(err: xmltree::Error) -> Self {
        OnvifError::Serialization(err.to_string())
    }
}
