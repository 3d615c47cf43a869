//! Maps the service list a device advertises onto the fixed set of features
//! this client knows how to address.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

/// One entry of a device's `GetServices` answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub namespace: String,
    pub xaddr: String,
    /// `major.minor`, as advertised.
    pub version: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureTag {
    MediaV10,
    MediaV20,
    Recording,
    Replay,
    Search,
    Ptz,
    Analytics,
    Event,
}

impl FeatureTag {
    pub const ALL: [FeatureTag; 8] = [
        FeatureTag::MediaV10,
        FeatureTag::MediaV20,
        FeatureTag::Recording,
        FeatureTag::Replay,
        FeatureTag::Search,
        FeatureTag::Ptz,
        FeatureTag::Analytics,
        FeatureTag::Event,
    ];

    /// Substring looked for in a service namespace. Containment, not
    /// equality: vendors publish variants of the standard URIs.
    pub fn marker(&self) -> &'static str {
        match self {
            FeatureTag::MediaV10 => "ver10/media/wsdl",
            FeatureTag::MediaV20 => "ver20/media/wsdl",
            FeatureTag::Recording => "recording/wsdl",
            FeatureTag::Replay => "replay/wsdl",
            FeatureTag::Search => "search/wsdl",
            FeatureTag::Ptz => "ptz/wsdl",
            FeatureTag::Analytics => "analytics/wsdl",
            FeatureTag::Event => "events/wsdl",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureTag::MediaV10 => "media-v10",
            FeatureTag::MediaV20 => "media-v20",
            FeatureTag::Recording => "recording",
            FeatureTag::Replay => "replay",
            FeatureTag::Search => "search",
            FeatureTag::Ptz => "ptz",
            FeatureTag::Analytics => "analytics",
            FeatureTag::Event => "event",
        }
    }
}

impl fmt::Display for FeatureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Endpoint path per feature. A missing entry means the device did not
/// advertise the feature; that is not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CapabilityMap {
    paths: BTreeMap<FeatureTag, String>,
}

impl CapabilityMap {
    pub fn get(&self, tag: FeatureTag) -> Option<&str> {
        self.paths.get(&tag).map(String::as_str)
    }

    pub fn contains(&self, tag: FeatureTag) -> bool {
        self.paths.contains_key(&tag)
    }

    /// Explicit override; the caller owns the correctness of the path.
    pub fn set(&mut self, tag: FeatureTag, path: impl Into<String>) {
        self.paths.insert(tag, path.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureTag, &str)> {
        self.paths.iter().map(|(tag, path)| (*tag, path.as_str()))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

pub struct CapabilityResolver;

impl CapabilityResolver {
    /// For each feature, the first service (in device order) whose namespace
    /// contains the feature marker gives the path. Pure function of `services`.
    pub fn resolve(services: &[ServiceDescriptor]) -> CapabilityMap {
        let mut map = CapabilityMap::default();

        for tag in FeatureTag::ALL {
            let Some(service) = services
                .iter()
                .find(|s| s.namespace.contains(tag.marker()))
            else {
                debug!(feature = %tag, "Feature not advertised");
                continue;
            };

            match endpoint_path(&service.xaddr) {
                Some(path) => {
                    debug!(feature = %tag, path = %path, "Feature endpoint resolved");
                    map.paths.insert(tag, path);
                }
                None => {
                    warn!(feature = %tag, xaddr = %service.xaddr, "Unusable service address");
                }
            }
        }

        map
    }
}

/// Path component of a service address. A bare path is accepted as is.
pub fn endpoint_path(xaddr: &str) -> Option<String> {
    let xaddr = xaddr.trim();
    if xaddr.starts_with('/') {
        return Some(xaddr.to_string());
    }
    Url::parse(xaddr).ok().map(|url| url.path().to_string())
}
