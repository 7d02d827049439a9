// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Built-in event listeners

use crate::executor::JobTable;
use burrow_core::{kinds, Event, EventPattern, JobId, Listener, ListenerError, Subscription};

/// Cancels the job named by a `job:cancel` event's `job_id`
pub struct CancelOnRequest {
    subscription: Subscription,
    jobs: JobTable,
}

impl CancelOnRequest {
    pub const NAME: &'static str = "cancel-on-request";

    pub fn new(jobs: JobTable) -> Self {
        Self {
            subscription: Subscription::new(
                Self::NAME,
                vec![EventPattern::new(kinds::JOB_CANCEL)],
                "Cancel jobs on request events",
            ),
            jobs,
        }
    }
}

impl Listener for CancelOnRequest {
    fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    fn on_event(&self, event: &Event) -> Result<(), ListenerError> {
        let Some(job_id) = event.data_str("job_id") else {
            return Err(ListenerError::failed("cancel request without job_id"));
        };
        let job_id = JobId::from(job_id);

        match self.jobs.get(&job_id) {
            Some(handle) => {
                let canceled = handle.cancel();
                tracing::info!(
                    job_id = %job_id,
                    canceled,
                    source = %event.source,
                    "cancel requested by event"
                );
            }
            None => tracing::debug!(job_id = %job_id, "cancel request for unknown job"),
        }
        Ok(())
    }
}
