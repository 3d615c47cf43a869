//! Device addresses and the selection among discovered candidates.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::errors::OnvifError;

/// Scheme, host and port of a device. Paths are kept separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceAddress {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl DeviceAddress {
    /// Parses an address or a full XAddr. Returns the address and the
    /// path it carried, if any (`/` is not a path).
    pub fn parse(candidate: &str) -> Result<(Self, Option<String>), OnvifError> {
        let url = Url::parse(candidate.trim())
            .map_err(|e| OnvifError::InvalidAddress(format!("{}: {}", candidate, e)))?;

        let scheme = url.scheme().to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(OnvifError::InvalidAddress(format!(
                "{}: unsupported scheme {}",
                candidate, scheme
            )));
        }

        let host = match url.host() {
            Some(url::Host::Ipv6(ip)) => format!("[{}]", ip),
            Some(host) => host.to_string(),
            None => {
                return Err(OnvifError::InvalidAddress(format!(
                    "{}: missing host",
                    candidate
                )));
            }
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| OnvifError::InvalidAddress(format!("{}: missing port", candidate)))?;

        let path = match url.path() {
            "" | "/" => None,
            path => Some(path.to_string()),
        };

        Ok((Self { scheme, host, port }, path))
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// `scheme://host:port` followed by `path`.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self, path)
        } else {
            format!("{}/{}", self, path)
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// What a discovery probe hands over: candidate XAddrs and advertised scopes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub xaddrs: Vec<String>,
    pub scopes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressPreference {
    pub prefer_ipv6: bool,
    pub prefer_https: bool,
}

/// Picks one candidate.
///
/// Candidates are split into IPv6-literal and IPv4-literal subsets (no DNS).
/// Each subset is narrowed to its HTTPS members when `prefer_https` is set and
/// at least one exists, otherwise left as is. Then: the first IPv6 member if
/// IPv6 is preferred and that subset is non-empty, else the first IPv4
/// member, else the first candidate of any kind.
pub fn select_address<'a>(candidates: &'a [String], preference: AddressPreference) -> Option<&'a str> {
    let mut ipv6: Vec<&str> = Vec::new();
    let mut ipv4: Vec<&str> = Vec::new();

    for candidate in candidates {
        match literal_host(candidate) {
            Some(IpAddr::V6(_)) => ipv6.push(candidate),
            Some(IpAddr::V4(_)) => ipv4.push(candidate),
            None => {}
        }
    }

    if preference.prefer_https {
        ipv6 = narrow_to_https(ipv6);
        ipv4 = narrow_to_https(ipv4);
    }

    let selected = if preference.prefer_ipv6 && !ipv6.is_empty() {
        ipv6.first().copied()
    } else if !ipv4.is_empty() {
        ipv4.first().copied()
    } else {
        candidates.first().map(String::as_str)
    };

    debug!(
        candidates = candidates.len(),
        selected = ?selected,
        prefer_ipv6 = preference.prefer_ipv6,
        prefer_https = preference.prefer_https,
        "Selected device address"
    );
    selected
}

fn narrow_to_https(subset: Vec<&str>) -> Vec<&str> {
    let https: Vec<&str> = subset.iter().copied().filter(|c| is_https(c)).collect();
    if https.is_empty() { subset } else { https }
}

fn is_https(candidate: &str) -> bool {
    candidate
        .trim()
        .get(..8)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https://"))
}

/// Host of a candidate when it is an IP literal. Strict: `1.2.3` or a
/// hostname is not a literal.
fn literal_host(candidate: &str) -> Option<IpAddr> {
    let rest = candidate.trim().split_once("://").map_or(candidate.trim(), |(_, r)| r);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);

    if let Some(bracketed) = host_port.strip_prefix('[') {
        // A zone id (fe80::1%eth0) is not a literal.
        let (inner, _) = bracketed.split_once(']')?;
        return inner.parse::<Ipv6Addr>().ok().map(IpAddr::V6);
    }

    let host = host_port.rsplit_once(':').map_or(host_port, |(h, _)| h);
    host.parse::<Ipv4Addr>().ok().map(IpAddr::V4)
}
