//! Rule matching logic.
//!
//! # Responsibilities
//! - Match raw chunks by byte prefix (case-sensitive)
//! - Match a named header against an expected value (case-insensitive)
//! - Match the gating header's value (case-insensitive)
//!
//! # Design Decisions
//! - Header values compare case-insensitively, as host names do
//! - A matcher never matches input of a kind it does not inspect

use crate::inspect::HeaderMap;

/// What a hook has to look at when it runs.
#[derive(Debug, Clone, Copy)]
pub enum Inspection<'a> {
    /// A raw client chunk.
    Raw(&'a [u8]),
    /// The parsed header map.
    Headers(&'a HeaderMap),
    /// The gating header's value.
    Value(&'a str),
}

/// Trait for matching inspected traffic against a condition.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the input satisfies this condition.
    fn matches(&self, input: &Inspection<'_>) -> bool;
}

/// Matches raw chunks starting with a byte prefix.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefix: Vec<u8>,
}

impl PrefixMatcher {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PrefixMatcher {
    fn matches(&self, input: &Inspection<'_>) -> bool {
        match input {
            Inspection::Raw(chunk) => chunk.starts_with(&self.prefix),
            _ => false,
        }
    }
}

/// Matches a header map where `key` holds `expected`.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    key: String,
    expected: String,
}

impl HeaderMatcher {
    pub fn new(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
        }
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, input: &Inspection<'_>) -> bool {
        match input {
            Inspection::Headers(headers) => headers
                .get(&self.key)
                .is_some_and(|v| v.eq_ignore_ascii_case(&self.expected)),
            _ => false,
        }
    }
}

/// Matches the gating header's value.
#[derive(Debug, Clone)]
pub struct ValueMatcher {
    expected: String,
}

impl ValueMatcher {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }
}

impl Matcher for ValueMatcher {
    fn matches(&self, input: &Inspection<'_>) -> bool {
        match input {
            Inspection::Value(value) => value.eq_ignore_ascii_case(&self.expected),
            _ => false,
        }
    }
}
