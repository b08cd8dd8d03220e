// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Readiness polling.
//!
//! Between provisioning and role configuration the orchestrator waits for
//! every instance to report `Ready`. The poller only observes the state
//! store; it never mutates records.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::store::{ServiceStatus, StateStore};

/// How a readiness wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// Every instance reached `Ready`.
    Ready,
    /// An instance failed before the cluster settled.
    InstanceFailed,
    /// The deadline expired with instances still building.
    DeadlineExpired,
    /// The poller was shut down mid-wait.
    Interrupted,
}

/// Polls instance service statuses until a cluster settles.
pub struct ReadinessPoller {
    store: Arc<dyn StateStore>,
    poll_interval: Duration,
    shutdown: Arc<Notify>,
}

impl ReadinessPoller {
    /// Create a poller over the given store.
    pub fn new(store: Arc<dyn StateStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle that stops any in-flight wait when notified.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Wait until every instance of the cluster is `Ready`.
    ///
    /// Ends without waiting out the deadline when any instance has
    /// already failed, when the deadline expires, or when the poller is
    /// shut down; the outcome says which. Never flips any status itself.
    pub async fn await_ready(
        &self,
        cluster_id: Uuid,
        deadline: Duration,
    ) -> Result<ReadinessOutcome> {
        let expires = Instant::now() + deadline;

        loop {
            let instances = self.store.instances_for_cluster(cluster_id).await?;

            if instances
                .iter()
                .any(|i| i.service_status == ServiceStatus::Failed)
            {
                warn!(%cluster_id, "instance failed while waiting for readiness");
                return Ok(ReadinessOutcome::InstanceFailed);
            }

            let ready = instances
                .iter()
                .filter(|i| i.service_status == ServiceStatus::Ready)
                .count();
            if !instances.is_empty() && ready == instances.len() {
                debug!(%cluster_id, instances = ready, "cluster is ready");
                return Ok(ReadinessOutcome::Ready);
            }

            let now = Instant::now();
            if now >= expires {
                warn!(%cluster_id, ready, total = instances.len(), "readiness deadline expired");
                return Ok(ReadinessOutcome::DeadlineExpired);
            }

            let sleep_for = self.poll_interval.min(expires - now);
            tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    debug!(%cluster_id, "readiness wait interrupted by shutdown");
                    return Ok(ReadinessOutcome::Interrupted);
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }
}
