//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (targets reference existing backends)
//! - Check rules carry the fields their processing mode needs
//! - Validate value ranges (ports, limits, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{ModeKind, ProxyConfig, RuleConfig};
use crate::routing::RoutingTarget;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    ZeroMaxConnections,
    InvalidBackendName(String),
    DuplicateBackend(String),
    InvalidBackendAddress { name: String },
    MissingGatingHeader,
    IncompleteRule { index: usize, needs: &'static str },
    InvalidTarget { context: String, target: String },
    UnknownBackend { context: String, name: String },
    ZeroLimit(&'static str),
    ZeroTimeout(&'static str),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => write!(f, "invalid bind address {:?}", addr),
            ValidationError::ZeroMaxConnections => write!(f, "listener.max_connections must be > 0"),
            ValidationError::InvalidBackendName(name) => write!(f, "invalid backend name {:?}", name),
            ValidationError::DuplicateBackend(name) => write!(f, "backend {:?} defined more than once", name),
            ValidationError::InvalidBackendAddress { name } => {
                write!(f, "backend {:?} needs a host and a non-zero port", name)
            }
            ValidationError::MissingGatingHeader => {
                write!(f, "processing.header is required in header mode")
            }
            ValidationError::IncompleteRule { index, needs } => {
                write!(f, "processing.rules[{}] needs {}", index, needs)
            }
            ValidationError::InvalidTarget { context, target } => {
                write!(f, "{}: invalid target {:?}", context, target)
            }
            ValidationError::UnknownBackend { context, name } => {
                write!(f, "{}: unknown backend {:?}", context, name)
            }
            ValidationError::ZeroLimit(field) => write!(f, "limits.{} must be > 0", field),
            ValidationError::ZeroTimeout(field) => write!(f, "timeouts.{} must be > 0", field),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    let mut names = HashSet::new();
    for backend in &config.backends {
        if !matches!(backend.name.parse::<RoutingTarget>(), Ok(RoutingTarget::Named(_))) {
            errors.push(ValidationError::InvalidBackendName(backend.name.clone()));
        }
        if !names.insert(backend.name.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.name.clone()));
        }
        if backend.host.trim().is_empty() || backend.port == 0 {
            errors.push(ValidationError::InvalidBackendAddress {
                name: backend.name.clone(),
            });
        }
    }

    let processing = &config.processing;
    if processing.mode == ModeKind::Header
        && processing.header.as_deref().map_or(true, |h| h.trim().is_empty())
    {
        errors.push(ValidationError::MissingGatingHeader);
    }

    for (index, rule) in processing.rules.iter().enumerate() {
        if let Some(needs) = missing_rule_fields(processing.mode, rule) {
            errors.push(ValidationError::IncompleteRule { index, needs });
        }
        check_target(
            &format!("processing.rules[{}]", index),
            &rule.target,
            &names,
            &mut errors,
        );
    }

    if let Some(target) = &processing.default_target {
        check_target("processing.default_target", target, &names, &mut errors);
    }

    if config.limits.max_header_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_header_bytes"));
    }
    if config.limits.read_buffer_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("read_buffer_bytes"));
    }
    if config.timeouts.inspect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("inspect_secs"));
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn missing_rule_fields(mode: ModeKind, rule: &RuleConfig) -> Option<&'static str> {
    match mode {
        ModeKind::Raw if rule.prefix.is_none() => Some("a prefix in raw mode"),
        ModeKind::Headers if rule.header.is_none() || rule.value.is_none() => {
            Some("a header and a value in headers mode")
        }
        ModeKind::Header if rule.value.is_none() => Some("a value in header mode"),
        _ => None,
    }
}

fn check_target(
    context: &str,
    target: &str,
    backends: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    match target.parse::<RoutingTarget>() {
        Ok(RoutingTarget::Named(name)) if !backends.contains(name.as_str()) => {
            errors.push(ValidationError::UnknownBackend {
                context: context.to_string(),
                name: name.to_string(),
            });
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::InvalidTarget {
            context: context.to_string(),
            target: target.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RelayMode;
    use crate::config::schema::BackendConfig;

    fn backend(name: &str, port: u16) -> BackendConfig {
        BackendConfig {
            name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port,
            relay_mode: RelayMode::Standard,
        }
    }

    fn rule(target: &str) -> RuleConfig {
        RuleConfig {
            target: target.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn backend_problems() {
        let mut config = ProxyConfig::default();
        config.backends = vec![backend("api", 80), backend("api", 81), backend("bad name", 0)];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateBackend("api".into())));
        assert!(errors.contains(&ValidationError::InvalidBackendName("bad name".into())));
        assert!(errors.contains(&ValidationError::InvalidBackendAddress {
            name: "bad name".into()
        }));
    }

    #[test]
    fn rules_need_mode_fields() {
        let mut config = ProxyConfig::default();
        config.backends.push(backend("api", 80));
        config.processing.mode = ModeKind::Raw;
        config.processing.rules = vec![rule("api")];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::IncompleteRule {
                index: 0,
                needs: "a prefix in raw mode"
            }]
        );

        config.processing.rules[0].prefix = Some("GET ".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn targets_must_resolve() {
        let mut config = ProxyConfig::default();
        config.processing.mode = ModeKind::Header;
        config.processing.header = Some("host".into());
        config.processing.rules = vec![
            RuleConfig {
                value: Some("a".into()),
                ..rule("nowhere")
            },
            RuleConfig {
                value: Some("b".into()),
                ..rule("10.0.0.1:8080")
            },
            RuleConfig {
                value: Some("c".into()),
                ..rule("host:notaport")
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], ValidationError::UnknownBackend { name, .. } if name == "nowhere"));
        assert!(matches!(&errors[1], ValidationError::InvalidTarget { target, .. } if target == "host:notaport"));
    }

    #[test]
    fn zero_limits_and_timeouts() {
        let mut config = ProxyConfig::default();
        config.limits.max_header_bytes = 0;
        config.timeouts.connect_secs = 0;
        config.listener.bind_address = "localhost".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[1].to_string(), "limits.max_header_bytes must be > 0");
    }
}
