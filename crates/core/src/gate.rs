// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializability gate: decides which status objects get externalized
//!
//! Checkers are consulted in priority order (lower first, ties broken by
//! registration order). The first definite verdict wins; if every checker
//! abstains the gate's default policy applies.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Tri-state answer from a single checker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Serialize,
    Omit,
    Unknown,
}

impl Verdict {
    pub fn from_bool(serialize: bool) -> Self {
        if serialize {
            Verdict::Serialize
        } else {
            Verdict::Omit
        }
    }

    pub fn decision(self) -> Option<bool> {
        match self {
            Verdict::Serialize => Some(true),
            Verdict::Omit => Some(false),
            Verdict::Unknown => None,
        }
    }
}

/// The object or type being asked about
#[derive(Clone, Copy)]
pub struct Subject<'a> {
    type_id: TypeId,
    type_name: &'static str,
    object: Option<&'a dyn Any>,
}

impl Subject<'static> {
    /// Ask about a type without an instance
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            object: None,
        }
    }
}

impl<'a> Subject<'a> {
    /// Ask about a concrete object
    pub fn object<T: Any>(value: &'a T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            object: Some(value as &dyn Any),
        }
    }

    /// Build a subject from already-erased parts
    pub fn erased(type_id: TypeId, type_name: &'static str, object: Option<&'a dyn Any>) -> Self {
        Self {
            type_id,
            type_name,
            object,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.object.and_then(|o| o.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for Subject<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subject")
            .field("type_name", &self.type_name)
            .field("has_object", &self.object.is_some())
            .finish()
    }
}

/// One link of the checker chain
pub trait SerializabilityCheck: Send + Sync {
    fn name(&self) -> &str;
    fn check(&self, subject: &Subject<'_>) -> Verdict;
}

/// Explicit per-type opt-in/opt-out
#[derive(Debug, Default)]
pub struct TypeRule {
    name: String,
    rules: HashMap<TypeId, bool>,
}

impl TypeRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: HashMap::new(),
        }
    }

    pub fn allow<T: Any>(mut self) -> Self {
        self.rules.insert(TypeId::of::<T>(), true);
        self
    }

    pub fn deny<T: Any>(mut self) -> Self {
        self.rules.insert(TypeId::of::<T>(), false);
        self
    }
}

impl SerializabilityCheck for TypeRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, subject: &Subject<'_>) -> Verdict {
        self.rules
            .get(&subject.type_id())
            .map_or(Verdict::Unknown, |allowed| Verdict::from_bool(*allowed))
    }
}

/// Decides by type path prefix, e.g. every type under `my_app::cache::`
#[derive(Debug)]
pub struct TypeNamePrefix {
    name: String,
    prefix: String,
    serialize: bool,
}

impl TypeNamePrefix {
    pub fn allow(prefix: impl Into<String>) -> Self {
        Self::new(prefix, true)
    }

    pub fn deny(prefix: impl Into<String>) -> Self {
        Self::new(prefix, false)
    }

    fn new(prefix: impl Into<String>, serialize: bool) -> Self {
        let prefix = prefix.into();
        Self {
            name: format!("prefix:{prefix}"),
            prefix,
            serialize,
        }
    }
}

impl SerializabilityCheck for TypeNamePrefix {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, subject: &Subject<'_>) -> Verdict {
        if subject.type_name().starts_with(&self.prefix) {
            Verdict::from_bool(self.serialize)
        } else {
            Verdict::Unknown
        }
    }
}

/// Checker backed by a closure
pub struct FnCheck<F> {
    name: String,
    f: F,
}

impl<F> FnCheck<F>
where
    F: Fn(&Subject<'_>) -> Verdict + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> SerializabilityCheck for FnCheck<F>
where
    F: Fn(&Subject<'_>) -> Verdict + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, subject: &Subject<'_>) -> Verdict {
        (self.f)(subject)
    }
}

struct Entry {
    priority: i32,
    check: Arc<dyn SerializabilityCheck>,
}

/// Ordered checker chain with a default policy
///
/// Built once at startup and then shared read-only.
pub struct SerializabilityGate {
    checks: Vec<Entry>,
    serialize_by_default: bool,
}

impl SerializabilityGate {
    pub fn new(serialize_by_default: bool) -> Self {
        Self {
            checks: Vec::new(),
            serialize_by_default,
        }
    }

    /// Register a checker. Lower priorities are consulted first.
    pub fn register(&mut self, priority: i32, check: impl SerializabilityCheck + 'static) {
        let at = self.checks.partition_point(|e| e.priority <= priority);
        self.checks.insert(
            at,
            Entry {
                priority,
                check: Arc::new(check),
            },
        );
    }

    pub fn serialize_by_default(&self) -> bool {
        self.serialize_by_default
    }

    /// Checker names in consultation order
    pub fn checks(&self) -> Vec<&str> {
        self.checks.iter().map(|e| e.check.name()).collect()
    }

    /// First definite verdict in the chain, or `Unknown`
    pub fn verdict(&self, subject: &Subject<'_>) -> Verdict {
        for entry in &self.checks {
            let verdict = entry.check.check(subject);
            if verdict != Verdict::Unknown {
                tracing::trace!(
                    subject = subject.type_name(),
                    checker = entry.check.name(),
                    ?verdict,
                    "serializability decided"
                );
                return verdict;
            }
        }
        Verdict::Unknown
    }

    /// Verdict with the default policy applied
    pub fn is_serializable(&self, subject: &Subject<'_>) -> bool {
        self.verdict(subject)
            .decision()
            .unwrap_or(self.serialize_by_default)
    }
}

impl Default for SerializabilityGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for SerializabilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializabilityGate")
            .field("checks", &self.checks())
            .field("serialize_by_default", &self.serialize_by_default)
            .finish()
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
