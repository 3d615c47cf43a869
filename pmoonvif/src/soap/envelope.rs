//! Structures de l'enveloppe SOAP

use xmltree::{Element, EmitterConfig, XMLNode};

use super::{ENVELOPE_PREFIX, SOAP_ENV_NS};

/// Enveloppe SOAP complète
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// Déclarations `prefix -> URI`, émises dans cet ordre sur l'élément Envelope.
    ///
    /// Certains équipements utilisent des parseurs sensibles à l'ordre.
    pub namespaces: Vec<(String, String)>,

    /// En-tête SOAP optionnel
    pub header: Option<SoapHeader>,

    /// Corps SOAP contenant l'action ou la réponse
    pub body: SoapBody,
}

/// En-tête SOAP
#[derive(Debug, Clone)]
pub struct SoapHeader {
    /// L'élément Header lui-même
    pub content: Element,
}

/// Corps SOAP
#[derive(Debug, Clone)]
pub struct SoapBody {
    /// L'élément Body lui-même
    pub content: Element,
}

impl SoapHeader {
    /// Enveloppe des éléments dans un `s:Header`
    pub fn wrap(children: Vec<Element>) -> Self {
        let mut content = Element::new(&format!("{}:Header", ENVELOPE_PREFIX));
        content
            .children
            .extend(children.into_iter().map(XMLNode::Element));
        Self { content }
    }
}

impl SoapBody {
    /// Enveloppe l'élément d'opération dans un `s:Body`
    pub fn wrap(operation: Element) -> Self {
        let mut content = Element::new(&format!("{}:Body", ENVELOPE_PREFIX));
        content.children.push(XMLNode::Element(operation));
        Self { content }
    }

    /// Premier élément enfant du Body (l'opération, la réponse ou le Fault)
    pub fn first_element(&self) -> Option<&Element> {
        self.content.children.iter().find_map(|n| n.as_element())
    }
}

impl SoapEnvelope {
    /// Crée une enveloppe ne déclarant que le namespace SOAP standard
    pub fn new(body: SoapBody) -> Self {
        Self {
            namespaces: vec![(ENVELOPE_PREFIX.to_string(), SOAP_ENV_NS.to_string())],
            header: None,
            body,
        }
    }

    /// Crée une nouvelle enveloppe avec header
    pub fn with_header(header: SoapHeader, body: SoapBody) -> Self {
        Self {
            header: Some(header),
            ..Self::new(body)
        }
    }

    /// Ajoute une déclaration de namespace en fin de liste.
    ///
    /// Un préfixe déjà déclaré n'est pas redéclaré.
    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        if self.namespaces.iter().any(|(p, _)| p == prefix) {
            return;
        }
        self.namespaces.push((prefix.to_string(), uri.to_string()));
    }

    /// Sérialise l'enveloppe en XML
    pub fn to_xml(&self) -> Result<String, xmltree::Error> {
        let mut envelope = Element::new(&format!("{}:Envelope", ENVELOPE_PREFIX));
        for (prefix, uri) in &self.namespaces {
            envelope
                .attributes
                .insert(format!("xmlns:{}", prefix), uri.clone());
        }
        if let Some(header) = &self.header {
            envelope
                .children
                .push(XMLNode::Element(header.content.clone()));
        }
        envelope
            .children
            .push(XMLNode::Element(self.body.content.clone()));

        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .write_document_declaration(true)
            .perform_indent(false);
        envelope.write_with_config(&mut buf, config)?;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Construit l'élément d'une opération dans son namespace de service,
/// ex: `<GetDeviceInformation xmlns="http://www.onvif.org/ver10/device/wsdl"/>`
pub fn operation_element(name: &str, namespace: &str) -> Element {
    let mut elem = Element::new(name);
    elem.attributes
        .insert("xmlns".to_string(), namespace.to_string());
    elem
}

/// Élément simple contenant du texte
pub fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}
