// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job request: the named parameters a job is started with

use crate::id::JobId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Parameters handed to a job; frozen once the job is initialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<JobId>,
    #[serde(default)]
    properties: BTreeMap<String, Value>,
    /// When false, debug and trace records are kept out of the log tail
    #[serde(default = "default_verbose")]
    verbose: bool,
}

fn default_verbose() -> bool {
    true
}

impl Request {
    pub fn new() -> Self {
        Self {
            id: None,
            properties: BTreeMap::new(),
            verbose: true,
        }
    }

    /// Use a fixed job id instead of a generated one
    pub fn with_id(mut self, id: impl Into<JobId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn id(&self) -> Option<&JobId> {
        self.id.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
