//! # Configuration du client ONVIF
//!
//! La configuration est construite en couches :
//! - configuration par défaut intégrée (`pmoonvif.yaml`)
//! - fichier YAML externe optionnel, fusionné par-dessus
//! - variables d'environnement `PMOONVIF_CONFIG__SECTION__CLE=valeur`
//!
//! Le résultat est une valeur typée [`OnvifConfig`], passée explicitement au
//! client. Il n'y a pas de singleton global.
//!
//! ```no_run
//! use pmoonvif::OnvifConfig;
//!
//! let config = OnvifConfig::load(Some("onvif.yaml".as_ref()))?;
//! println!("timeout: {}s", config.http.timeout_secs);
//! # Ok::<(), pmoonvif::OnvifError>(())
//! ```

use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::address::AddressPreference;
use crate::errors::OnvifError;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmoonvif.yaml");

const ENV_PREFIX: &str = "PMOONVIF_CONFIG__";

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "pmoonvif/0.1";
const DEFAULT_DEVICE_SERVICE_PATH: &str = "/onvif/device_service";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OnvifConfig {
    pub http: HttpConfig,
    pub device: DeviceConfig,
    pub discovery: AddressPreference,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Many cameras ship self-signed certificates.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device management path used when an address carries none.
    pub service_path: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            service_path: DEFAULT_DEVICE_SERVICE_PATH.to_string(),
        }
    }
}

impl OnvifConfig {
    /// Charge la configuration : défaut intégré, fichier optionnel, puis
    /// variables d'environnement du processus.
    pub fn load(path: Option<&Path>) -> Result<Self, OnvifError> {
        let external = match path {
            Some(path) => match fs::read_to_string(path) {
                Ok(data) => {
                    info!(config_file = %path.display(), "Loaded ONVIF config file");
                    Some(data)
                }
                Err(e) => {
                    return Err(OnvifError::Config(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    )));
                }
            },
            None => None,
        };

        Self::from_layers(external.as_deref(), env::vars())
    }

    /// Configuration par défaut fusionnée avec un document YAML, sans
    /// variables d'environnement.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, OnvifError> {
        Self::from_layers(Some(yaml), std::iter::empty())
    }

    fn from_layers(
        external: Option<&str>,
        vars: impl Iterator<Item = (String, String)>,
    ) -> Result<Self, OnvifError> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)
            .map_err(|e| OnvifError::Config(format!("embedded default: {}", e)))?;

        if let Some(external) = external {
            let external: Value = serde_yaml::from_str(external)
                .map_err(|e| OnvifError::Config(e.to_string()))?;
            // Un fichier vide donne Null : rien à fusionner
            if !external.is_null() {
                merge_yaml(&mut value, &lower_keys_value(external));
            }
        }

        apply_env_overrides(&mut value, vars);

        serde_yaml::from_value(value).map_err(|e| OnvifError::Config(e.to_string()))
    }
}

fn apply_env_overrides(config: &mut Value, vars: impl Iterator<Item = (String, String)>) {
    for (key, value) in vars {
        if let Some(path) = key.strip_prefix(ENV_PREFIX) {
            let key_path = path
                .split("__")
                .map(|k| k.to_lowercase())
                .collect::<Vec<_>>();
            debug!(env_var = %key, "Applying config override");
            set_value(config, &key_path, convert_env_value(&value));
        }
    }
}

fn set_value(data: &mut Value, path: &[String], value: Value) {
    let Some((key, rest)) = path.split_first() else {
        *data = value;
        return;
    };
    if let Value::Mapping(map) = data {
        let key = Value::String(key.clone());
        if rest.is_empty() {
            map.insert(key, value);
        } else {
            let entry = map
                .entry(key)
                .or_insert(Value::Mapping(Mapping::new()));
            set_value(entry, rest, value);
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let k = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(k, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // scalaires ou séquences : on remplace
        (d, e) => *d = e.clone(),
    }
}
