// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event kind patterns and subscriptions

/// Pattern for matching event kinds
/// Supports:
///   - Exact: "job:finished"
///   - Single wildcard: "job:*" matches "job:finished", "job:failed"
///   - Category: "report:**" matches every kind under "report"
///   - Everything: "*" or "**"
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_string())
    }

    /// Pattern matching every kind
    pub fn any() -> Self {
        Self("**".to_string())
    }

    /// Check if this pattern matches an event kind
    pub fn matches(&self, kind: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }

        if self.0 == "*" || self.0 == "**" {
            return true;
        }

        let pattern_parts: Vec<&str> = self.0.split(':').collect();
        let kind_parts: Vec<&str> = kind.split(':').collect();

        Self::match_segments(&pattern_parts, &kind_parts)
    }

    fn match_segments(pattern: &[&str], kind: &[&str]) -> bool {
        match (pattern.first(), kind.first()) {
            (None, None) => true,
            (Some(&"**"), _) => true,
            (Some(&"*"), Some(_)) => Self::match_segments(&pattern[1..], &kind[1..]),
            (Some(p), Some(k)) if *p == *k => Self::match_segments(&pattern[1..], &kind[1..]),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EventPattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Unique listener name within one bus
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub String);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listener's declared name and interest set
#[derive(Clone, Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub patterns: Vec<EventPattern>,
    pub description: String,
}

impl Subscription {
    pub fn new(
        id: impl Into<String>,
        patterns: Vec<EventPattern>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: SubscriberId(id.into()),
            patterns,
            description: description.into(),
        }
    }

    /// Subscription to every event kind
    pub fn all(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, vec![EventPattern::any()], description)
    }

    /// Check if any pattern matches the event kind
    pub fn matches(&self, kind: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(kind))
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
