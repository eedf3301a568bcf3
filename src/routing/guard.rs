//! # Routing Guard
//!
//! Admission control in front of the forwarding engine.
//!
//! For every inbound request the guard resolves the target service and probes it right
//! then. No liveness result is shared between requests: a request is never forwarded to a
//! backend whose probe for *that* request failed.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::error::{GatewayResult, SERVICE_UNAVAILABLE_MESSAGE};
use crate::core::types::Admission;
use crate::discovery::ServiceRegistry;
use crate::observability::health::HealthProbe;

#[derive(Clone)]
pub struct RoutingGuard {
    registry: Arc<ServiceRegistry>,
    probe: Arc<dyn HealthProbe>,
}

impl RoutingGuard {
    pub fn new(registry: Arc<ServiceRegistry>, probe: Arc<dyn HealthProbe>) -> Self {
        Self { registry, probe }
    }

    /// Decide whether a request for `service_name` may be forwarded.
    ///
    /// Returns `UnknownRoute` if the service is not registered; the front door only routes
    /// registered prefixes here, so that case means a programming error upstream.
    pub async fn admit(&self, service_name: &str) -> GatewayResult<Admission> {
        let entry = self.registry.resolve(service_name)?;
        let result = self.probe.probe(entry).await;

        if result.reachable {
            debug!(service = %service_name, probe = self.probe.probe_type(), "Request admitted");
            Ok(Admission::Allowed(entry.clone()))
        } else {
            warn!(
                service = %service_name,
                probe = self.probe.probe_type(),
                "Request rejected, service failed liveness probe"
            );
            Ok(Admission::Rejected {
                reason: SERVICE_UNAVAILABLE_MESSAGE.to_string(),
            })
        }
    }
}
