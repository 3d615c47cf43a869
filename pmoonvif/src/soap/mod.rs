//! # Module SOAP - enveloppes SOAP 1.2 pour ONVIF
//!
//! Ce module construit les requêtes SOAP envoyées aux équipements ONVIF et
//! classe les réponses reçues (succès, fault, réponse illisible).
//!
//! ## Fonctionnalités
//!
//! - Construction d'enveloppes avec déclarations de namespaces ordonnées
//! - En-tête WS-Security optionnel
//! - Parsing d'enveloppes de réponse
//! - Décodage des SOAP Faults (1.2 et 1.1)
//!
//! ## Example
//!
//! ```ignore
//! use pmoonvif::soap::{SoapBody, SoapEnvelope, operation_element};
//!
//! let op = operation_element("GetDeviceInformation", pmoonvif::soap::DEVICE_NS);
//! let envelope = SoapEnvelope::new(SoapBody::wrap(op));
//! let xml = envelope.to_xml().unwrap();
//! assert!(xml.contains("GetDeviceInformation"));
//! ```

mod envelope;
mod fault;
mod parser;

pub use envelope::{SoapBody, SoapEnvelope, SoapHeader, operation_element, text_element};
pub use fault::{SoapFault, parse_soap_fault};
pub use parser::{
    SoapParseError, child_text, classify_response, expect_response, find_child,
    parse_soap_envelope,
};

/// SOAP 1.2 envelope namespace.
pub const SOAP_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// ONVIF device management service namespace.
pub const DEVICE_NS: &str = "http://www.onvif.org/ver10/device/wsdl";

/// Préfixe utilisé pour le namespace de l'enveloppe
pub const ENVELOPE_PREFIX: &str = "s";
