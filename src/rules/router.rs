//! Rule lookup and hook installation.
//!
//! # Responsibilities
//! - Compile the `[processing]` section into ordered rules
//! - Pick the target for an inspected connection
//! - Install the matching hook and a logging fallback on each connection
//!
//! # Design Decisions
//! - Immutable after construction (shared across connections without locks)
//! - O(n) scan over rules (acceptable for typical rule counts)
//! - No match and no default means no route, so the connection closes

use std::sync::Arc;

use crate::config::{ModeKind, ProcessingConfig, RuleConfig};
use crate::error::RouterError;
use crate::routing::{Connection, ProcessingMode, RoutingTarget};
use crate::rules::matcher::{HeaderMatcher, Inspection, Matcher, PrefixMatcher, ValueMatcher};

#[derive(Debug)]
struct Rule {
    matcher: Box<dyn Matcher>,
    target: RoutingTarget,
}

/// Compiled routing rules for one processing mode.
#[derive(Debug)]
pub struct RuleSet {
    mode: ModeKind,
    header: Option<String>,
    rules: Vec<Rule>,
    default_target: Option<RoutingTarget>,
}

impl RuleSet {
    /// Compile the processing config. Targets that fail to parse are errors;
    /// rules missing the fields their mode needs are skipped.
    pub fn from_config(config: &ProcessingConfig) -> Result<Self, RouterError> {
        let header = match config.mode {
            ModeKind::Header => Some(
                config
                    .header
                    .clone()
                    .filter(|h| !h.trim().is_empty())
                    .ok_or(RouterError::NotConfigured)?,
            ),
            _ => None,
        };

        let mut rules = Vec::with_capacity(config.rules.len());
        for (index, rule) in config.rules.iter().enumerate() {
            let target: RoutingTarget = rule.target.parse()?;
            match compile_matcher(config.mode, rule) {
                Some(matcher) => rules.push(Rule { matcher, target }),
                None => tracing::warn!(index, mode = ?config.mode, "Rule lacks fields for this mode; skipped"),
            }
        }

        let default_target: Option<RoutingTarget> = config
            .default_target
            .as_deref()
            .map(str::parse::<RoutingTarget>)
            .transpose()?;

        tracing::info!(
            mode = ?config.mode,
            rules = rules.len(),
            default_target = default_target.as_ref().map(tracing::field::display),
            "Routing rules compiled"
        );

        Ok(Self {
            mode: config.mode,
            header,
            rules,
            default_target,
        })
    }

    /// Target for the inspected input: first matching rule, then the default.
    pub fn select(&self, input: &Inspection<'_>) -> Option<&RoutingTarget> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(input))
            .map(|rule| &rule.target)
            .or(self.default_target.as_ref())
    }

    pub fn mode(&self) -> ModeKind {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Configure a connection with this rule set's hook and fallback.
    pub fn install(self: &Arc<Self>, conn: &mut Connection) {
        let id = conn.id();
        conn.on_fallback(move |err, target| {
            tracing::warn!(
                connection_id = %id,
                error = %err,
                target = target.map(tracing::field::display),
                "Routing failed; closing connection"
            );
            Ok(())
        });

        let rules = Arc::clone(self);
        let mode = match (&self.mode, &self.header) {
            (ModeKind::Raw, _) => ProcessingMode::raw(move |ctx, chunk| {
                if let Some(target) = rules.select(&Inspection::Raw(chunk)) {
                    ctx.route_to(target.clone());
                }
                Ok(())
            }),
            (ModeKind::Header, Some(key)) => ProcessingMode::header(key.clone(), move |ctx, value| {
                if let Some(target) = rules.select(&Inspection::Value(value)) {
                    ctx.route_to(target.clone());
                }
                Ok(())
            }),
            _ => ProcessingMode::headers(move |ctx, headers| {
                if let Some(target) = rules.select(&Inspection::Headers(headers)) {
                    ctx.route_to(target.clone());
                }
                Ok(())
            }),
        };
        conn.on_process(mode);
    }
}

fn compile_matcher(mode: ModeKind, rule: &RuleConfig) -> Option<Box<dyn Matcher>> {
    match mode {
        ModeKind::Raw => {
            let prefix = rule.prefix.as_ref()?;
            Some(Box::new(PrefixMatcher::new(prefix.as_bytes())))
        }
        ModeKind::Headers => {
            let (key, value) = (rule.header.as_ref()?, rule.value.as_ref()?);
            Some(Box::new(HeaderMatcher::new(key.clone(), value.clone())))
        }
        ModeKind::Header => {
            let value = rule.value.as_ref()?;
            Some(Box::new(ValueMatcher::new(value.clone())))
        }
    }
}
