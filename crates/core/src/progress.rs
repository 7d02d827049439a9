// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical progress tracking
//!
//! A job announces how many steps it has (`push_level`), advances through
//! them (`step`), and may split any step into a nested level. The overall
//! offset in `[0, 1]` never decreases.

#[derive(Debug, Clone)]
struct Level {
    steps: usize,
    done: usize,
    base: f64,
    span: f64,
}

impl Level {
    fn position(&self) -> f64 {
        self.base + self.span * (self.done as f64 / self.steps as f64)
    }

    fn step_span(&self) -> f64 {
        self.span / self.steps as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct Progress {
    levels: Vec<Level>,
    offset: f64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a level of `steps` steps inside the current step
    pub fn push_level(&mut self, steps: usize) {
        let (base, span) = match self.levels.last() {
            Some(parent) => (parent.position(), parent.step_span()),
            None => (self.offset, 1.0 - self.offset),
        };
        self.levels.push(Level {
            steps: steps.max(1),
            done: 0,
            base,
            span,
        });
    }

    /// Complete one step of the current level
    pub fn step(&mut self) {
        if let Some(level) = self.levels.last_mut() {
            level.done = (level.done + 1).min(level.steps);
        }
        self.refresh();
    }

    /// Close the current level; it counts as one completed step of its parent
    pub fn pop_level(&mut self) {
        let Some(level) = self.levels.pop() else {
            return;
        };
        match self.levels.last_mut() {
            Some(parent) => parent.done = (parent.done + 1).min(parent.steps),
            None => self.offset = self.offset.max(level.base + level.span),
        }
        self.refresh();
    }

    /// Jump to completion
    pub fn finish(&mut self) {
        self.levels.clear();
        self.offset = 1.0;
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    fn refresh(&mut self) {
        if let Some(level) = self.levels.last() {
            self.offset = self.offset.max(level.position()).min(1.0);
        }
    }
}
