//! Parser SOAP pour les réponses des équipements

use std::io::BufReader;

use xmltree::Element;

use super::{SoapBody, SoapEnvelope, SoapHeader};
use crate::errors::OnvifError;

/// Erreur de parsing SOAP
#[derive(Debug, thiserror::Error)]
pub enum SoapParseError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

impl From<SoapParseError> for OnvifError {
    fn from(err: SoapParseError) -> Self {
        OnvifError::MalformedResponse(err.to_string())
    }
}

/// Parse une enveloppe SOAP complète
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapParseError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if root.name != "Envelope" {
        return Err(SoapParseError::MissingEnvelope);
    }

    let namespaces = root
        .namespaces
        .as_ref()
        .map(|ns| {
            ns.0.iter()
                .map(|(prefix, uri)| (prefix.clone(), uri.clone()))
                .collect()
        })
        .unwrap_or_default();

    let header = find_child(&root, "Header").map(|e| SoapHeader { content: e.clone() });

    let body = find_child(&root, "Body")
        .map(|e| SoapBody { content: e.clone() })
        .ok_or(SoapParseError::MissingBody)?;

    Ok(SoapEnvelope {
        namespaces,
        header,
        body,
    })
}

/// Classe une réponse HTTP brute.
///
/// - statut hors 2xx : `ProtocolFault` avec statut et corps verbatim
/// - 2xx dont le Body contient un `Fault` : `ProtocolFault` également
/// - 2xx illisible : `MalformedResponse`
pub fn classify_response(status: u16, body: &str) -> Result<SoapEnvelope, OnvifError> {
    if !(200..300).contains(&status) {
        return Err(OnvifError::ProtocolFault {
            status,
            body: body.to_string(),
        });
    }

    let envelope = parse_soap_envelope(body.as_bytes())?;

    if envelope
        .body
        .first_element()
        .is_some_and(|e| e.name == "Fault")
    {
        return Err(OnvifError::ProtocolFault {
            status,
            body: body.to_string(),
        });
    }

    Ok(envelope)
}

/// Récupère l'élément de réponse attendu dans le Body
pub fn expect_response<'a>(
    envelope: &'a SoapEnvelope,
    response_name: &str,
) -> Result<&'a Element, OnvifError> {
    find_child(&envelope.body.content, response_name).ok_or_else(|| {
        OnvifError::malformed(format!("Missing {} element in SOAP body", response_name))
    })
}

/// Premier enfant direct portant ce nom local
pub fn find_child<'a>(parent: &'a Element, local_name: &str) -> Option<&'a Element> {
    parent
        .children
        .iter()
        .find_map(|n| n.as_element().filter(|e| e.name == local_name))
}

/// Texte (nettoyé, non vide) d'un enfant direct
pub fn child_text(parent: &Element, local_name: &str) -> Option<String> {
    find_child(parent, local_name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
