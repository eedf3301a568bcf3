//! # Food Gateway Library - Core Library Crate
//!
//! The single public entry point for the food-delivery platform. Requests arrive as
//! `/{service}/...`, the target service is probed for liveness on the spot, and admitted
//! requests are relayed to the backend with the service prefix stripped.
//!
//! ## Module Layout
//!
//! - `core`: error taxonomy, configuration and the shared data types
//! - `discovery`: the static service registry
//! - `observability`: liveness probing, aggregate status and logging setup
//! - `routing`: per-request admission control
//! - `protocols`: the HTTP forwarding engine
//! - `gateway`: the Axum front door tying everything together

/// Error types, configuration and the data model shared by every component
pub mod core;

/// Static registry mapping service names to base addresses
pub mod discovery;

/// Front door: route table, side endpoints and server lifecycle
pub mod gateway;

/// Health probing, `/status` aggregation and structured logging
pub mod observability;

/// Request forwarding to backend services
pub mod protocols;

/// Admission control in front of the forwarding engine
pub mod routing;

pub use core::config::GatewayConfig;
pub use core::error::{GatewayError, GatewayResult};
pub use core::types::{Admission, AggregateStatus, HealthProbeResult, ServiceEntry};
pub use discovery::ServiceRegistry;
pub use gateway::server::{GatewayServer, GatewayState};
pub use observability::health::{HealthProbe, HttpHealthProbe};
