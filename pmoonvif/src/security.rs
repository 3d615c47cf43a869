//! WS-Security UsernameToken (PasswordDigest) header construction.
//!
//! A token is built fresh for every request and never reused: the nonce and
//! timestamp are what give the digest its replay protection.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha1::{Digest, Sha1};
use xmltree::{Element, XMLNode};

use crate::auth::{AuthKind, Credentials};
use crate::soap::{ENVELOPE_PREFIX, SoapEnvelope, SoapHeader, text_element};

pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const PASSWORD_DIGEST_TYPE: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
pub const BASE64_BINARY_ENCODING: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

pub const NONCE_LEN: usize = 16;

const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone)]
pub struct SecurityToken {
    username: String,
    nonce: [u8; NONCE_LEN],
    created_at: String,
    digest: String,
}

impl SecurityToken {
    /// Builds a token for the current time shifted by the device clock skew.
    pub fn build(credentials: &Credentials, skew_seconds: i64) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        Self::build_at(credentials, Utc::now(), skew_seconds, nonce)
    }

    pub fn build_at(
        credentials: &Credentials,
        now: DateTime<Utc>,
        skew_seconds: i64,
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        let created_at = created_timestamp(now, skew_seconds);
        let digest = password_digest(&nonce, &created_at, credentials.password());
        Self {
            username: credentials.username().to_string(),
            nonce,
            created_at,
            digest,
        }
    }

    /// Only `ws_security` carries a token; every other kind gets `None`.
    pub fn for_auth(kind: AuthKind, credentials: &Credentials, skew_seconds: i64) -> Option<Self> {
        match kind {
            AuthKind::WsSecurity => Some(Self::build(credentials, skew_seconds)),
            AuthKind::HttpDigest | AuthKind::HttpBasic | AuthKind::None => None,
        }
    }

    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    pub fn nonce_base64(&self) -> String {
        BASE64.encode(self.nonce)
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// `<wsse:Security>` element; the `wsse`/`wsu` prefixes are declared on the envelope.
    pub fn to_header_element(&self) -> Element {
        let mut password = text_element("wsse:Password", &self.digest);
        password
            .attributes
            .insert("Type".to_string(), PASSWORD_DIGEST_TYPE.to_string());

        let mut nonce = text_element("wsse:Nonce", &self.nonce_base64());
        nonce
            .attributes
            .insert("EncodingType".to_string(), BASE64_BINARY_ENCODING.to_string());

        let mut token = Element::new("wsse:UsernameToken");
        for child in [
            text_element("wsse:Username", &self.username),
            password,
            nonce,
            text_element("wsu:Created", &self.created_at),
        ] {
            token.children.push(XMLNode::Element(child));
        }

        let mut security = Element::new("wsse:Security");
        security.attributes.insert(
            format!("{}:mustUnderstand", ENVELOPE_PREFIX),
            "1".to_string(),
        );
        security.children.push(XMLNode::Element(token));
        security
    }

    /// Declares `wsse` then `wsu` after the SOAP namespace and installs the header.
    pub fn apply(&self, envelope: &mut SoapEnvelope) {
        envelope.declare_namespace("wsse", WSSE_NS);
        envelope.declare_namespace("wsu", WSU_NS);
        envelope.header = Some(SoapHeader::wrap(vec![self.to_header_element()]));
    }
}

impl fmt::Debug for SecurityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityToken")
            .field("username", &self.username)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// `base64(SHA-1(nonce ++ created ++ password))`, hashing the raw nonce bytes.
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

pub fn created_timestamp(now: DateTime<Utc>, skew_seconds: i64) -> String {
    (now + Duration::seconds(skew_seconds))
        .format(CREATED_FORMAT)
        .to_string()
}
