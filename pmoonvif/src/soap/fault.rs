//! SOAP Faults renvoyés par les équipements

use super::parser::{child_text, find_child, parse_soap_envelope};

/// Erreur SOAP (Fault), SOAP 1.2 ou 1.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Code du fault (ex: "env:Sender", "s:Client")
    pub code: String,

    /// Sous-code ONVIF (ex: "ter:NotAuthorized"), SOAP 1.2 uniquement
    pub subcode: Option<String>,

    /// Description lisible
    pub reason: String,
}

impl SoapFault {
    /// Le device a refusé les identifiants
    pub fn is_not_authorized(&self) -> bool {
        self.subcode
            .as_deref()
            .is_some_and(|s| local_part(s) == "NotAuthorized")
            || local_part(&self.code) == "NotAuthorized"
    }
}

fn local_part(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname).trim()
}

/// Décode le Fault contenu dans un corps de réponse, s'il y en a un
pub fn parse_soap_fault(xml: &[u8]) -> Option<SoapFault> {
    let envelope = parse_soap_envelope(xml).ok()?;
    let fault = find_child(&envelope.body.content, "Fault")?;

    // SOAP 1.2: Code/Value, Code/Subcode/Value, Reason/Text
    if let Some(code) = find_child(fault, "Code") {
        let subcode = find_child(code, "Subcode").and_then(|sc| child_text(sc, "Value"));
        return Some(SoapFault {
            code: child_text(code, "Value").unwrap_or_default(),
            subcode,
            reason: find_child(fault, "Reason")
                .and_then(|r| child_text(r, "Text"))
                .unwrap_or_default(),
        });
    }

    // SOAP 1.1: faultcode/faultstring
    Some(SoapFault {
        code: child_text(fault, "faultcode").unwrap_or_default(),
        subcode: None,
        reason: child_text(fault, "faultstring").unwrap_or_default(),
    })
}
