// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared collaborators every job is built with

use crate::capture::{LogCapture, NoCapture};
use crate::clock::{Clock, SystemClock};
use crate::events::EventBus;
use crate::id::{IdGen, UuidIdGen};
use std::sync::Arc;

/// Default retained records per job
pub const DEFAULT_LOG_CAPACITY: usize = 10_000;

/// Collaborators handed to each job: bus, logging manager, clock, ids
#[derive(Clone)]
pub struct JobEnv {
    pub bus: EventBus,
    pub capture: Arc<dyn LogCapture>,
    pub clock: Arc<dyn Clock>,
    pub id_gen: Arc<dyn IdGen>,
    /// `None` keeps every record
    pub log_capacity: Option<usize>,
}

impl JobEnv {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            capture: Arc::new(NoCapture),
            clock: Arc::new(SystemClock),
            id_gen: Arc::new(UuidIdGen),
            log_capacity: Some(DEFAULT_LOG_CAPACITY),
        }
    }

    pub fn with_capture(mut self, capture: Arc<dyn LogCapture>) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_gen(mut self, id_gen: Arc<dyn IdGen>) -> Self {
        self.id_gen = id_gen;
        self
    }

    pub fn with_log_capacity(mut self, capacity: Option<usize>) -> Self {
        self.log_capacity = capacity;
        self
    }
}

impl std::fmt::Debug for JobEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEnv")
            .field("bus", &self.bus)
            .field("log_capacity", &self.log_capacity)
            .finish_non_exhaustive()
    }
}
