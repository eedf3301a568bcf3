//! # Core Types Module
//!
//! Data structures shared by the registry, the prober, the routing guard and the
//! status endpoint.
//!
//! ## Ownership
//!
//! - `ServiceEntry` is owned by the `ServiceRegistry` for the life of the process and is
//!   cloned out to callers that need it beyond a borrow
//! - `HealthProbeResult` is produced fresh by every probe and dropped by the caller
//! - `AggregateStatus` is built per `/status` call and serialized straight into the response

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

/// One backend service known to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Logical name, also the path prefix the gateway serves it under (`/order/...`)
    pub name: String,

    /// Base address requests are forwarded to
    #[serde(rename = "url")]
    pub base_address: Url,
}

impl ServiceEntry {
    /// Create a new service entry
    pub fn new<S: Into<String>>(name: S, base_address: Url) -> Self {
        Self {
            name: name.into(),
            base_address,
        }
    }

    /// Base address rendered without a trailing slash, ready for path concatenation
    pub fn base_str(&self) -> &str {
        self.base_address.as_str().trim_end_matches('/')
    }

    /// Liveness endpoint every backend exposes
    pub fn health_url(&self) -> String {
        format!("{}/health", self.base_str())
    }
}

impl fmt::Display for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.base_str())
    }
}

/// Outcome of a single liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProbeResult {
    /// Service the probe targeted
    pub service_name: String,
    /// Whether `/health` answered with a 2xx inside the timeout
    pub reachable: bool,
    /// When the probe completed
    pub checked_at: DateTime<Utc>,
}

impl HealthProbeResult {
    pub fn new<S: Into<String>>(service_name: S, reachable: bool) -> Self {
        Self {
            service_name: service_name.into(),
            reachable,
            checked_at: Utc::now(),
        }
    }
}

/// Combined liveness snapshot served by `GET /status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStatus {
    /// State of the gateway itself; always `"running"` when it can answer at all
    #[serde(rename = "gateway")]
    pub gateway_state: String,

    /// Reachability per service name
    #[serde(rename = "services")]
    pub per_service: HashMap<String, bool>,

    /// Reachable services, in registry order
    #[serde(rename = "running")]
    pub running_names: Vec<String>,

    /// Unreachable services, in registry order
    #[serde(rename = "notRunning")]
    pub not_running_names: Vec<String>,
}

impl AggregateStatus {
    /// Assemble a snapshot from probe results given in registry order
    pub fn from_results(results: Vec<HealthProbeResult>) -> Self {
        let mut per_service = HashMap::with_capacity(results.len());
        let mut running_names = Vec::new();
        let mut not_running_names = Vec::new();

        for result in results {
            per_service.insert(result.service_name.clone(), result.reachable);
            if result.reachable {
                running_names.push(result.service_name);
            } else {
                not_running_names.push(result.service_name);
            }
        }

        Self {
            gateway_state: "running".to_string(),
            per_service,
            running_names,
            not_running_names,
        }
    }
}

/// Routing guard decision for one inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The backend answered its probe; forward to this entry
    Allowed(ServiceEntry),
    /// The backend failed its probe; do not forward
    Rejected { reason: String },
}
