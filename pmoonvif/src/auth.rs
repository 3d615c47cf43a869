//! Authentication kinds and the one-time negotiation that picks one.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::OnvifError;

/// The closed set of mechanisms a device may accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    WsSecurity,
    HttpDigest,
    HttpBasic,
    None,
}

impl AuthKind {
    /// Negotiation order, strongest first.
    pub const PRIORITY: [AuthKind; 4] = [
        AuthKind::WsSecurity,
        AuthKind::HttpDigest,
        AuthKind::HttpBasic,
        AuthKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthKind::WsSecurity => "ws_security",
            AuthKind::HttpDigest => "http_digest",
            AuthKind::HttpBasic => "http_basic",
            AuthKind::None => "none",
        }
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Accepted,
    /// The device refused the credentials (401/403 or a NotAuthorized fault).
    Rejected(String),
    /// Any other failure of the probe.
    Failed(String),
}

/// One probe of the negotiation loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthAttempt {
    pub kind: AuthKind,
    pub outcome: AuthOutcome,
}

/// Result of a successful negotiation.
#[derive(Debug)]
pub struct Negotiated<T> {
    pub kind: AuthKind,
    /// What the winning probe returned.
    pub probe_result: T,
    /// Every attempt, the accepted one last.
    pub attempts: Vec<AuthAttempt>,
}

pub struct AuthNegotiator;

impl AuthNegotiator {
    /// Runs `probe` once per kind in [`AuthKind::PRIORITY`] order and adopts the
    /// first kind whose probe succeeds. A failed probe is never retried.
    pub fn negotiate<T, F>(mut probe: F) -> Result<Negotiated<T>, OnvifError>
    where
        F: FnMut(AuthKind) -> Result<T, OnvifError>,
    {
        let mut attempts = Vec::with_capacity(AuthKind::PRIORITY.len());

        for kind in AuthKind::PRIORITY {
            debug!(auth = %kind, "Probing authentication method");
            match probe(kind) {
                Ok(probe_result) => {
                    info!(auth = %kind, failed = attempts.len(), "Authentication method accepted");
                    attempts.push(AuthAttempt {
                        kind,
                        outcome: AuthOutcome::Accepted,
                    });
                    return Ok(Negotiated {
                        kind,
                        probe_result,
                        attempts,
                    });
                }
                Err(err) => {
                    let outcome = if err.is_auth_rejection() {
                        AuthOutcome::Rejected(err.to_string())
                    } else {
                        AuthOutcome::Failed(err.to_string())
                    };
                    debug!(auth = %kind, outcome = ?outcome, "Authentication probe failed");
                    attempts.push(AuthAttempt { kind, outcome });
                }
            }
        }

        warn!("No authentication method accepted by the device");
        Err(OnvifError::NoWorkingAuth { attempts })
    }
}
