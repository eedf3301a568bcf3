//! # HTTP Server Module
//!
//! The gateway front door. It binds the registry, the routing guard, the forwarding engine
//! and the status reporter into one Axum application.
//!
//! ## Request lifecycle
//!
//! ```text
//! RECEIVED ── prefix matches a service ──> MATCHED ── probe ok ──> ADMITTED ── relay ok ──> FORWARDED
//!    │                                        │                      │
//!    └─ no match: router 404 (UNMATCHED)      └─ probe failed: 503   └─ transport error: 500
//!                                               (REJECTED)             (FORWARD_FAILED)
//! ```
//!
//! Side endpoints outside that flow: `GET /` (gateway liveness) and `GET /status`
//! (aggregate snapshot). A catch-panic layer turns any fault in a handler into a 500
//! with the generic error body.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router as AxumRouter,
};
use serde_json::json;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::core::config::GatewayConfig;
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::{Admission, AggregateStatus};
use crate::discovery::ServiceRegistry;
use crate::observability::health::{HealthProbe, HttpHealthProbe};
use crate::observability::status::StatusReporter;
use crate::protocols::http::ForwardingEngine;
use crate::routing::guard::RoutingGuard;

/// Header carrying the per-request correlation id to backends and back to the caller
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared server state
#[derive(Clone)]
pub struct GatewayState {
    /// Static service table
    pub registry: Arc<ServiceRegistry>,

    /// Per-request admission control
    pub guard: RoutingGuard,

    /// Relays admitted requests
    pub forwarder: Arc<ForwardingEngine>,

    /// Builds `/status` snapshots
    pub reporter: StatusReporter,
}

impl GatewayState {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        probe: Arc<dyn HealthProbe>,
        forwarder: ForwardingEngine,
    ) -> Self {
        Self {
            guard: RoutingGuard::new(registry.clone(), probe.clone()),
            reporter: StatusReporter::new(registry.clone(), probe),
            forwarder: Arc::new(forwarder),
            registry,
        }
    }
}

/// HTTP Server implementation
pub struct GatewayServer {
    config: GatewayConfig,
    state: GatewayState,
    app: AxumRouter,
}

impl GatewayServer {
    /// Create a server with the HTTP health prober described by `config`
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let registry = Arc::new(ServiceRegistry::from_config(&config)?);
        let probe: Arc<dyn HealthProbe> = Arc::new(HttpHealthProbe::new(config.health.timeout)?);
        Self::with_components(config, registry, probe)
    }

    /// Create a server from an explicit registry and prober
    pub fn with_components(
        config: GatewayConfig,
        registry: Arc<ServiceRegistry>,
        probe: Arc<dyn HealthProbe>,
    ) -> GatewayResult<Self> {
        let forwarder = ForwardingEngine::new(&config.forwarding)?;
        let state = GatewayState::new(registry, probe, forwarder);
        let app = build_router(state.clone(), config.server.cors_enabled);

        Ok(Self { config, state, app })
    }

    /// The Axum application, for embedding or driving in tests
    pub fn router(&self) -> AxumRouter {
        self.app.clone()
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Configured listen address
    pub fn bind_addr(&self) -> GatewayResult<SocketAddr> {
        self.config.bind_addr()
    }

    /// Bind the configured address and serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> GatewayResult<()> {
        let bind_addr = self.bind_addr()?;
        let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
            GatewayError::internal(format!("Failed to bind gateway server to {}: {}", bind_addr, e))
        })?;

        self.serve_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` is cancelled
    pub async fn serve_with_listener(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> GatewayResult<()> {
        let local_addr = listener.local_addr()?;
        info!(
            address = %local_addr,
            services = ?self.state.registry.names().collect::<Vec<_>>(),
            "Gateway HTTP server listening"
        );

        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| GatewayError::internal(format!("Gateway server error: {}", e)))?;

        info!("Gateway HTTP server stopped");
        Ok(())
    }
}

/// Build the gateway application: side endpoints plus one prefix per registered service.
///
/// CORS covers only the gateway's own endpoints. Proxied responses carry whatever CORS
/// headers the backend set.
pub fn build_router(state: GatewayState, cors_enabled: bool) -> AxumRouter {
    let mut side = AxumRouter::new()
        .route("/", get(gateway_root))
        .route("/status", get(service_status));
    if cors_enabled {
        side = side.layer(CorsLayer::permissive());
    }

    let mut proxied = AxumRouter::new();
    let names: Vec<String> = state.registry.names().map(String::from).collect();
    for name in names {
        let service: Arc<str> = Arc::from(name.as_str());
        let handler = move |State(state): State<GatewayState>, request: Request| {
            let service = service.clone();
            async move { proxy_request(state, service, request).await }
        };

        // `/x/*rest` matches neither `/x` nor `/x/`, so both get their own route
        proxied = proxied
            .route(&format!("/{}", name), any(handler.clone()))
            .route(&format!("/{}/", name), any(handler.clone()))
            .route(&format!("/{}/*rest", name), any(handler));
    }

    with_gateway_layers(side.merge(proxied).with_state(state))
}

/// Tracing and panic recovery around every route
pub fn with_gateway_layers(app: AxumRouter) -> AxumRouter {
    app.layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Gateway liveness; answers whenever the process can serve HTTP at all
pub async fn gateway_root() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "Gateway service is running" })),
    )
}

/// Probe every service and report which ones are up
pub async fn service_status(State(state): State<GatewayState>) -> Json<AggregateStatus> {
    Json(state.reporter.snapshot().await)
}

/// Admit, then forward, one request addressed to `service`
async fn proxy_request(state: GatewayState, service: Arc<str>, mut request: Request) -> Response {
    let request_id = ensure_request_id(&mut request);
    let span = info_span!(
        "proxy",
        request_id = %String::from_utf8_lossy(request_id.as_bytes()),
        service = %service,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = async move {
        let entry = match state.guard.admit(&service).await {
            Ok(Admission::Allowed(entry)) => entry,
            Ok(Admission::Rejected { reason }) => {
                return GatewayError::service_unavailable(&*service, reason).into_response();
            }
            Err(e) => {
                warn!(error = %e, "Routed to a service missing from the registry");
                return e.into_response();
            }
        };

        match state.forwarder.forward(request, &service, &entry).await {
            Ok(response) => {
                info!(status = response.status().as_u16(), "Request forwarded");
                response
            }
            Err(e) => {
                error!(error = %e, error_type = e.error_type(), "Forwarding failed");
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await;

    response
        .headers_mut()
        .entry(REQUEST_ID_HEADER)
        .or_insert(request_id);
    response
}

/// Reuse the caller's `x-request-id` byte for byte or mint one, so backends see the same id
fn ensure_request_id(request: &mut Request) -> HeaderValue {
    if let Some(existing) = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .filter(|value| !value.is_empty())
    {
        return existing.clone();
    }

    let request_id = HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
    request
        .headers_mut()
        .insert(REQUEST_ID_HEADER, request_id.clone());
    request_id
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    error!(panic = %detail, "Request handler panicked");
    GatewayError::internal(detail).into_response()
}
