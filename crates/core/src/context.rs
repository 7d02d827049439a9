// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context: a scoped property bag with inheritance and finality
//!
//! A parent scope declares properties (locale, user, transaction id, ...)
//! and marks the ones descendants should pick up as `inherited`. A child
//! context calls [`ExecutionContext::inherit_from`] when it is composed.
//!
//! Rules:
//! - A name is declared at most once per context.
//! - A `final` property can never be set or removed.
//! - A local property that is both `inherited` and `final` refuses to be
//!   shadowed by inheritance; any other local property silently wins.
//! - Inherited values share their slot with the parent unless the property
//!   was declared `clone_on_inherit`, in which case the child gets a deep copy.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;

/// Errors raised synchronously by context declaration and mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("property already declared in this context: {0}")]
    DuplicateProperty(String),
    #[error("cannot inherit property [{0}]: it is declared inherited and final in this context")]
    IllegalInheritance(String),
    #[error("property is final and cannot be modified: {0}")]
    ImmutableProperty(String),
    #[error("property does not accept null values: {0}")]
    NullValue(String),
}

impl ContextError {
    /// Name of the property the error is about
    pub fn property(&self) -> &str {
        match self {
            ContextError::DuplicateProperty(name)
            | ContextError::IllegalInheritance(name)
            | ContextError::ImmutableProperty(name)
            | ContextError::NullValue(name) => name,
        }
    }
}

/// A declared property and its flags
#[derive(Debug, Clone)]
pub struct Property {
    slot: Arc<RwLock<Value>>,
    inherited: bool,
    is_final: bool,
    clone_on_inherit: bool,
    non_null: bool,
}

impl Property {
    fn new(value: Value) -> Self {
        Self {
            slot: Arc::new(RwLock::new(value)),
            inherited: false,
            is_final: false,
            clone_on_inherit: false,
            non_null: false,
        }
    }

    pub fn value(&self) -> Value {
        self.slot.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn clones_on_inherit(&self) -> bool {
        self.clone_on_inherit
    }

    pub fn is_non_null(&self) -> bool {
        self.non_null
    }

    /// True when both properties read and write the same value slot
    pub fn shares_value_with(&self, other: &Property) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    fn write(&self, value: Value) {
        *self.slot.write().unwrap_or_else(|e| e.into_inner()) = value;
    }

    /// Copy of this property as seen by an inheriting child
    fn inherit(&self) -> Property {
        let slot = if self.clone_on_inherit {
            Arc::new(RwLock::new(self.value()))
        } else {
            Arc::clone(&self.slot)
        };
        Property {
            slot,
            ..self.clone()
        }
    }
}

/// Hierarchical property store for one execution scope
#[derive(Debug, Default)]
pub struct ExecutionContext {
    properties: BTreeMap<String, Property>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start declaring a new property
    pub fn declare(&mut self, name: impl Into<String>) -> Declaration<'_> {
        Declaration {
            context: self,
            name: name.into(),
            property: Property::new(Value::Null),
        }
    }

    /// Declare a property with all flags given positionally
    pub fn declare_property(
        &mut self,
        name: impl Into<String>,
        initial: impl Into<Value>,
        inherited: bool,
        is_final: bool,
        clone_on_inherit: bool,
    ) -> Result<(), ContextError> {
        let mut declaration = self.declare(name).initial(initial);
        declaration.property.inherited = inherited;
        declaration.property.is_final = is_final;
        declaration.property.clone_on_inherit = clone_on_inherit;
        declaration.commit()
    }

    /// Copy every inherited property of `parent` into this context.
    ///
    /// Either all eligible properties are copied or, on conflict, nothing
    /// changes in either context.
    pub fn inherit_from(&mut self, parent: &ExecutionContext) -> Result<(), ContextError> {
        let mut incoming = Vec::new();

        for (name, property) in parent.properties.iter().filter(|(_, p)| p.inherited) {
            match self.properties.get(name) {
                None => incoming.push((name.clone(), property.inherit())),
                Some(local) if local.inherited && local.is_final => {
                    tracing::debug!(property = %name, "inheritance blocked by final property");
                    return Err(ContextError::IllegalInheritance(name.clone()));
                }
                Some(_) => {}
            }
        }

        tracing::trace!(count = incoming.len(), "inherited context properties");
        self.properties.extend(incoming);
        Ok(())
    }

    pub fn get_property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).map(Property::value)
    }

    /// Set a property value, declaring a plain local property if needed
    pub fn set_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), ContextError> {
        let name = name.into();
        let value = value.into();

        match self.properties.get(&name) {
            Some(property) if property.is_final => Err(ContextError::ImmutableProperty(name)),
            Some(property) if property.non_null && value.is_null() => {
                Err(ContextError::NullValue(name))
            }
            Some(property) => {
                property.write(value);
                Ok(())
            }
            None => {
                self.properties.insert(name, Property::new(value));
                Ok(())
            }
        }
    }

    /// Remove a property; final properties stay put
    pub fn remove_property(&mut self, name: &str) -> Result<Option<Value>, ContextError> {
        match self.properties.get(name) {
            Some(property) if property.is_final => {
                Err(ContextError::ImmutableProperty(name.to_string()))
            }
            Some(_) => Ok(self.properties.remove(name).map(|p| p.value())),
            None => Ok(None),
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Property names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Builder returned by [`ExecutionContext::declare`]
#[must_use = "a declaration does nothing until committed"]
pub struct Declaration<'a> {
    context: &'a mut ExecutionContext,
    name: String,
    property: Property,
}

impl Declaration<'_> {
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.property.slot = Arc::new(RwLock::new(value.into()));
        self
    }

    pub fn inherited(mut self) -> Self {
        self.property.inherited = true;
        self
    }

    pub fn make_final(mut self) -> Self {
        self.property.is_final = true;
        self
    }

    pub fn clone_on_inherit(mut self) -> Self {
        self.property.clone_on_inherit = true;
        self
    }

    pub fn non_null(mut self) -> Self {
        self.property.non_null = true;
        self
    }

    pub fn commit(self) -> Result<(), ContextError> {
        if self.context.properties.contains_key(&self.name) {
            return Err(ContextError::DuplicateProperty(self.name));
        }
        if self.property.non_null && self.property.value().is_null() {
            return Err(ContextError::NullValue(self.name));
        }
        self.context.properties.insert(self.name, self.property);
        Ok(())
    }
}

/// Stack of nested execution scopes
///
/// The top of the stack is the active context. Pushing with `inherit`
/// composes the new scope from the current top before it becomes active.
#[derive(Debug, Default)]
pub struct Execution {
    stack: Mutex<Vec<ExecutionContext>>,
}

impl Execution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(context: ExecutionContext) -> Self {
        Self {
            stack: Mutex::new(vec![context]),
        }
    }

    pub fn push(&self, mut context: ExecutionContext, inherit: bool) -> Result<(), ContextError> {
        let mut stack = self.stack.lock().unwrap_or_else(|e| e.into_inner());
        if inherit {
            if let Some(current) = stack.last() {
                context.inherit_from(current)?;
            }
        }
        stack.push(context);
        Ok(())
    }

    pub fn pop(&self) -> Option<ExecutionContext> {
        self.stack.lock().unwrap_or_else(|e| e.into_inner()).pop()
    }

    pub fn depth(&self) -> usize {
        self.stack.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Run `f` against the active context, if any
    pub fn with_current<R>(&self, f: impl FnOnce(&mut ExecutionContext) -> R) -> Option<R> {
        let mut stack = self.stack.lock().unwrap_or_else(|e| e.into_inner());
        stack.last_mut().map(f)
    }

    pub fn get_property(&self, name: &str) -> Option<Value> {
        self.with_current(|ctx| ctx.get_property(name)).flatten()
    }

    /// Drop every scope
    pub fn clear(&self) {
        self.stack.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
