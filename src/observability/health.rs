//! # Health Prober
//!
//! Bounded-time liveness checks against backend services.
//!
//! A probe is a `GET {base}/health`. It reports a service as reachable only when the
//! response status is 2xx and arrives inside the configured timeout. Every other outcome
//! (non-2xx status, refused connection, DNS failure, timeout) collapses into
//! `reachable = false`; the cause is logged but never returned, so callers cannot tell
//! "down" from "slow" from "returned an error page".
//!
//! ## Rust Concepts Used
//! - `async_trait` so the routing guard and status reporter can take any `HealthProbe`
//! - `tokio::time::timeout` to bound the whole request, connection setup included

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{HealthProbeResult, ServiceEntry};

/// Health check probe trait
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Probe one backend. Never fails; unreachable backends yield `reachable = false`.
    async fn probe(&self, entry: &ServiceEntry) -> HealthProbeResult;

    /// Get the probe type name
    fn probe_type(&self) -> &'static str;
}

/// HTTP health check probe implementation
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: HttpClient,
    timeout: Duration,
}

impl HttpHealthProbe {
    /// Create a new HTTP health probe with the given per-probe timeout
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        // A redirect is a non-2xx answer, not something to chase
        let client = HttpClient::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create health check client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check whether `health_url` answers with a 2xx inside the timeout
    pub async fn is_reachable(&self, health_url: &str) -> bool {
        let start_time = Instant::now();
        let result = timeout(self.timeout, self.client.get(health_url).send()).await;
        let duration = start_time.elapsed();

        match result {
            Ok(Ok(response)) if response.status().is_success() => {
                debug!(url = %health_url, ?duration, "Health check passed");
                true
            }
            Ok(Ok(response)) => {
                warn!(
                    url = %health_url,
                    status = response.status().as_u16(),
                    "Health check returned unexpected status"
                );
                false
            }
            Ok(Err(e)) => {
                warn!(url = %health_url, error = %e, "Health check request failed");
                false
            }
            Err(_) => {
                warn!(url = %health_url, timeout = ?self.timeout, "Health check timed out");
                false
            }
        }
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, entry: &ServiceEntry) -> HealthProbeResult {
        let reachable = self.is_reachable(&entry.health_url()).await;
        HealthProbeResult::new(entry.name.clone(), reachable)
    }

    fn probe_type(&self) -> &'static str {
        "http"
    }
}
