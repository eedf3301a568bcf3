//! # Configuration Module
//!
//! This module holds the gateway configuration and the logic that loads it.
//!
//! ## Key Features
//! - Built-in defaults for the four platform services on sequential local ports
//! - Optional YAML configuration file (`GATEWAY_CONFIG_PATH`)
//! - Environment variable overrides, including one `<NAME>_SERVICE_URL` per service
//! - Validation that reports every problem at once

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::ServiceEntry;

/// Environment variable naming a YAML configuration file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";

/// Path segments the gateway serves itself; a service may not claim them
pub const RESERVED_SERVICE_NAMES: &[&str] = &["status"];

/// Main gateway configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings
    pub server: ServerConfig,

    /// Backend services in registry order
    pub services: Vec<ServiceEntry>,

    /// Liveness probe settings
    pub health: HealthConfig,

    /// Proxied call settings
    pub forwarding: ForwardingConfig,

    /// Log output settings
    pub logging: LogConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            services: default_services(),
            health: HealthConfig::default(),
            forwarding: ForwardingConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

fn default_services() -> Vec<ServiceEntry> {
    [
        ("delivery", "http://localhost:5004"),
        ("order", "http://localhost:5003"),
        ("restaurant", "http://localhost:5002"),
        ("user", "http://localhost:5001"),
    ]
    .into_iter()
    .filter_map(|(name, url)| Url::parse(url).ok().map(|url| ServiceEntry::new(name, url)))
    .collect()
}

impl GatewayConfig {
    /// Load configuration the way the binary does it.
    ///
    /// Starts from the YAML file named by `GATEWAY_CONFIG_PATH` when set, otherwise from
    /// the built-in defaults, then applies environment overrides and validates.
    pub async fn load() -> GatewayResult<Self> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from_file(path).await,
            Err(_) => {
                let mut config = Self::default();
                config.apply_env_overrides()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a YAML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> GatewayResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML text without applying overrides
    pub fn from_yaml(content: &str) -> GatewayResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| GatewayError::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> GatewayResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`.
    ///
    /// Recognised keys:
    /// - `PORT` or `GATEWAY_SERVER_HTTP_PORT` (the latter wins)
    /// - `GATEWAY_SERVER_BIND_ADDRESS`
    /// - `GATEWAY_CORS_ENABLED`
    /// - `<NAME>_SERVICE_URL` for every configured service, e.g. `ORDER_SERVICE_URL`
    /// - `GATEWAY_HEALTH_TIMEOUT`, `GATEWAY_FORWARD_TIMEOUT` as humantime durations
    ///   (`off` or `none` disables the forwarding timeout)
    /// - `GATEWAY_LOG_LEVEL`, `GATEWAY_LOG_FORMAT`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> GatewayResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ["PORT", "GATEWAY_SERVER_HTTP_PORT"] {
            if let Some(port) = lookup(key) {
                self.server.http_port = port
                    .trim()
                    .parse()
                    .map_err(|e| GatewayError::config(format!("Invalid {}: {}", key, e)))?;
            }
        }

        if let Some(addr) = lookup("GATEWAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Some(enabled) = lookup("GATEWAY_CORS_ENABLED") {
            self.server.cors_enabled = enabled
                .trim()
                .parse()
                .map_err(|e| GatewayError::config(format!("Invalid GATEWAY_CORS_ENABLED: {}", e)))?;
        }

        for service in &mut self.services {
            let key = service_url_env_var(&service.name);
            if let Some(url) = lookup(&key) {
                service.base_address = Url::parse(url.trim())
                    .map_err(|e| GatewayError::config(format!("Invalid {}: {}", key, e)))?;
            }
        }

        if let Some(timeout) = lookup("GATEWAY_HEALTH_TIMEOUT") {
            self.health.timeout = humantime::parse_duration(timeout.trim()).map_err(|e| {
                GatewayError::config(format!("Invalid GATEWAY_HEALTH_TIMEOUT: {}", e))
            })?;
        }

        if let Some(timeout) = lookup("GATEWAY_FORWARD_TIMEOUT") {
            self.forwarding.timeout = match timeout.trim() {
                "off" | "none" | "" => None,
                value => Some(humantime::parse_duration(value).map_err(|e| {
                    GatewayError::config(format!("Invalid GATEWAY_FORWARD_TIMEOUT: {}", e))
                })?),
            };
        }

        if let Some(level) = lookup("GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(format) = lookup("GATEWAY_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(GatewayError::config(format!(
                        "Invalid GATEWAY_LOG_FORMAT: {}",
                        other
                    )))
                }
            };
        }

        Ok(())
    }

    /// Configuration validation with detailed error messages
    pub fn validate(&self) -> GatewayResult<()> {
        let mut errors = Vec::new();

        if self.server.bind_address.is_empty() {
            errors.push("bind_address cannot be empty".to_string());
        }

        if self.services.is_empty() {
            errors.push("At least one service must be configured".to_string());
        }

        let mut seen = HashSet::new();
        for (index, service) in self.services.iter().enumerate() {
            if let Err(reason) = check_service_name(&service.name) {
                errors.push(format!("Service {}: {}", index, reason));
            }
            if !seen.insert(service.name.as_str()) {
                errors.push(format!("Service '{}' is configured more than once", service.name));
            }
            match service.base_address.scheme() {
                "http" | "https" => {}
                scheme => errors.push(format!(
                    "Service '{}' has unsupported URL scheme: {}",
                    service.name, scheme
                )),
            }
        }

        if self.health.timeout.is_zero() {
            errors.push("health timeout must be greater than 0".to_string());
        }

        if self.forwarding.timeout.is_some_and(|timeout| timeout.is_zero()) {
            errors.push("forwarding timeout must be greater than 0 when set".to_string());
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => errors.push(format!("Invalid log level: {}", self.logging.level)),
        }

        if !errors.is_empty() {
            return Err(GatewayError::config(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            )));
        }

        Ok(())
    }

    /// Socket address the gateway listens on
    pub fn bind_addr(&self) -> GatewayResult<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.http_port)
            .parse()
            .map_err(|e| GatewayError::config(format!("Invalid bind address: {}", e)))
    }
}

/// Environment variable overriding the base address of `service`
pub fn service_url_env_var(service: &str) -> String {
    format!("{}_SERVICE_URL", service.to_uppercase().replace('-', "_"))
}

/// Check that `name` can be served as a single path prefix
pub(crate) fn check_service_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("service name cannot be empty".to_string());
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!(
            "service name '{}' must be a single path segment of letters, digits, '-' or '_'",
            name
        ));
    }
    if RESERVED_SERVICE_NAMES.contains(&name) {
        return Err(format!("service name '{}' is reserved by the gateway", name));
    }
    Ok(())
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: String,

    /// HTTP port
    pub http_port: u16,

    /// Answer cross-origin requests from the web frontend
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: 5000,
            cors_enabled: true,
        }
    }
}

/// Liveness probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Upper bound on a single `/health` call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
        }
    }
}

/// Forwarding configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Upper bound on a proxied call, response body included. Unbounded when absent.
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter level; `RUST_LOG` takes precedence when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_validation() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.http_port, 5000);
        assert_eq!(config.health.timeout, Duration::from_millis(2000));
        assert!(config.forwarding.timeout.is_none());
    }

    #[test]
    fn test_default_services_order_and_ports() {
        let config = GatewayConfig::default();
        let names: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["delivery", "order", "restaurant", "user"]);

        let ports: Vec<u16> = config
            .services
            .iter()
            .filter_map(|s| s.base_address.port())
            .collect();
        assert_eq!(ports, vec![5004, 5003, 5002, 5001]);
    }

    #[test]
    fn test_environment_variable_overrides() {
        let mut config = GatewayConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("PORT", "7000"),
                ("GATEWAY_SERVER_BIND_ADDRESS", "127.0.0.1"),
                ("ORDER_SERVICE_URL", "http://orders.internal:9000"),
                ("GATEWAY_HEALTH_TIMEOUT", "500ms"),
                ("GATEWAY_FORWARD_TIMEOUT", "30s"),
                ("GATEWAY_LOG_LEVEL", "debug"),
                ("GATEWAY_LOG_FORMAT", "text"),
                ("GATEWAY_CORS_ENABLED", "false"),
            ]))
            .unwrap();

        assert_eq!(config.server.http_port, 7000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert!(!config.server.cors_enabled);
        let order = config.services.iter().find(|s| s.name == "order").unwrap();
        assert_eq!(order.base_address.as_str(), "http://orders.internal:9000/");
        assert_eq!(config.health.timeout, Duration::from_millis(500));
        assert_eq!(config.forwarding.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:7000");
    }

    #[test]
    fn test_gateway_port_wins_over_port() {
        let mut config = GatewayConfig::default();
        config
            .apply_overrides(lookup_from(&[("PORT", "7000"), ("GATEWAY_SERVER_HTTP_PORT", "7100")]))
            .unwrap();
        assert_eq!(config.server.http_port, 7100);
    }

    #[test]
    fn test_forward_timeout_can_be_disabled() {
        let mut config = GatewayConfig::default();
        config.forwarding.timeout = Some(Duration::from_secs(5));
        config
            .apply_overrides(lookup_from(&[("GATEWAY_FORWARD_TIMEOUT", "off")]))
            .unwrap();
        assert!(config.forwarding.timeout.is_none());
    }

    #[test]
    fn test_invalid_environment_variables() {
        let mut config = GatewayConfig::default();
        let result = config.apply_overrides(lookup_from(&[("PORT", "invalid_port")]));
        assert!(result.unwrap_err().to_string().contains("Invalid PORT"));

        let result = config.apply_overrides(lookup_from(&[("USER_SERVICE_URL", "not a url")]));
        assert!(result.unwrap_err().to_string().contains("Invalid USER_SERVICE_URL"));

        let result = config.apply_overrides(lookup_from(&[("GATEWAY_HEALTH_TIMEOUT", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = GatewayConfig::default();
        config.services.push(ServiceEntry::new(
            "order",
            Url::parse("http://localhost:6000").unwrap(),
        ));
        config.services.push(ServiceEntry::new(
            "status",
            Url::parse("http://localhost:6001").unwrap(),
        ));
        config.services.push(ServiceEntry::new(
            "a/b",
            Url::parse("http://localhost:6002").unwrap(),
        ));
        config.services.push(ServiceEntry::new(
            "files",
            Url::parse("ftp://localhost:21").unwrap(),
        ));
        config.health.timeout = Duration::ZERO;
        config.logging.level = "loud".to_string();

        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("'order' is configured more than once"));
        assert!(message.contains("reserved"));
        assert!(message.contains("single path segment"));
        assert!(message.contains("unsupported URL scheme"));
        assert!(message.contains("health timeout"));
        assert!(message.contains("Invalid log level"));
    }

    #[test]
    fn test_empty_services_rejected() {
        let mut config = GatewayConfig::default();
        config.services.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_url_env_var() {
        assert_eq!(service_url_env_var("order"), "ORDER_SERVICE_URL");
        assert_eq!(service_url_env_var("menu-items"), "MENU_ITEMS_SERVICE_URL");
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GatewayConfig::from_yaml(
            r#"
server:
  http_port: 8088
health:
  timeout: 750ms
forwarding:
  timeout: 10s
"#,
        )
        .unwrap();

        assert_eq!(config.server.http_port, 8088);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.services.len(), 4);
        assert_eq!(config.health.timeout, Duration::from_millis(750));
        assert_eq!(config.forwarding.timeout, Some(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
services:
  - name: user
    url: http://users.internal:8001
  - name: notification
    url: http://notify.internal:8005
logging:
  level: warn
  format: text
"#
        )
        .unwrap();

        let config = GatewayConfig::load_from_file(file.path()).await.unwrap();
        let names: Vec<&str> = config.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["user", "notification"]);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let result = GatewayConfig::load_from_file("/definitely/not/here.yaml").await;
        assert!(matches!(result, Err(GatewayError::Configuration { .. })));
    }
}
