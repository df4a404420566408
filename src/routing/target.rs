//! Routing targets.
//!
//! A connection is routed either to a registered backend by identifier, or to
//! an inline `host:port` pair that bypasses the registry.

use std::fmt;
use std::str::FromStr;

use crate::backend::{BackendId, BackendOptions, BackendRegistry};
use crate::error::RouterError;

/// Destination selected for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingTarget {
    /// A backend registered under this identifier.
    Named(BackendId),
    /// A one-off backend.
    Inline { host: String, port: u16 },
}

impl RoutingTarget {
    pub fn named(id: impl Into<BackendId>) -> Self {
        RoutingTarget::Named(id.into())
    }

    pub fn inline(host: impl Into<String>, port: u16) -> Self {
        RoutingTarget::Inline {
            host: host.into(),
            port,
        }
    }

    /// Resolve to the backend name (if any) and the options to arm it with.
    pub fn resolve(
        &self,
        registry: &BackendRegistry,
    ) -> Result<(Option<BackendId>, BackendOptions), RouterError> {
        match self {
            RoutingTarget::Named(id) => {
                let spec = registry.lookup(id)?;
                Ok((Some(spec.id.clone()), spec.options.clone()))
            }
            RoutingTarget::Inline { host, port } => {
                if host.is_empty() || *port == 0 {
                    return Err(RouterError::MalformedTarget(self.to_string()));
                }
                Ok((None, BackendOptions::new(host.clone(), *port)))
            }
        }
    }
}

impl From<BackendId> for RoutingTarget {
    fn from(id: BackendId) -> Self {
        RoutingTarget::Named(id)
    }
}

impl From<(&str, u16)> for RoutingTarget {
    fn from((host, port): (&str, u16)) -> Self {
        RoutingTarget::inline(host, port)
    }
}

impl From<(String, u16)> for RoutingTarget {
    fn from((host, port): (String, u16)) -> Self {
        RoutingTarget::inline(host, port)
    }
}

impl fmt::Display for RoutingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingTarget::Named(id) => write!(f, "{}", id),
            RoutingTarget::Inline { host, port } if host.contains(':') => {
                write!(f, "[{}]:{}", host, port)
            }
            RoutingTarget::Inline { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Parses `name` as a backend identifier and `host:port` (or `[v6]:port`) as
/// an inline target.
impl FromStr for RoutingTarget {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RouterError::MalformedTarget(s.to_string());
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(malformed());
        }

        if let Some((host, port)) = trimmed.rsplit_once(':') {
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            let port: u16 = port.parse().map_err(|_| malformed())?;
            if host.is_empty() || port == 0 {
                return Err(malformed());
            }
            return Ok(RoutingTarget::inline(host, port));
        }

        if trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            Ok(RoutingTarget::named(trimmed))
        } else {
            Err(malformed())
        }
    }
}
