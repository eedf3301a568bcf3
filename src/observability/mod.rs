// Liveness probes against backend services
pub mod health;

// Structured logging
pub mod logging;

// Aggregate status snapshot over the registry
pub mod status;

// Re-export commonly used types for convenience
pub use health::{HealthProbe, HttpHealthProbe};
pub use logging::init_logging;
pub use status::StatusReporter;
