//! # Aggregate Status Reporter
//!
//! Probes every registered service and composes the snapshot served by `GET /status`.
//! Probes run concurrently; the snapshot lists services in registry order regardless of
//! which probe finished first. Reporting never feeds back into routing decisions.

use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::core::types::AggregateStatus;
use crate::discovery::ServiceRegistry;
use crate::observability::health::HealthProbe;

/// Builds liveness snapshots over the whole registry
#[derive(Clone)]
pub struct StatusReporter {
    registry: Arc<ServiceRegistry>,
    probe: Arc<dyn HealthProbe>,
}

impl StatusReporter {
    pub fn new(registry: Arc<ServiceRegistry>, probe: Arc<dyn HealthProbe>) -> Self {
        Self { registry, probe }
    }

    /// Probe each registered service once and assemble the result
    pub async fn snapshot(&self) -> AggregateStatus {
        let probes = self
            .registry
            .entries()
            .iter()
            .map(|entry| self.probe.probe(entry));

        // join_all yields results in the order the futures were supplied
        let results = join_all(probes).await;
        let status = AggregateStatus::from_results(results);

        info!(
            probe = self.probe.probe_type(),
            running = status.running_names.len(),
            not_running = status.not_running_names.len(),
            "Service status snapshot taken"
        );

        status
    }
}
