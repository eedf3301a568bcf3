//! # Service Registry
//!
//! Static mapping from logical service name to base address.
//!
//! The registry is built once at startup from configuration and is read-only afterwards.
//! It is shared behind an `Arc` and needs no locking: there is no mutation API, and adding
//! or removing a service requires a restart. Enumeration always follows insertion order so
//! that status snapshots are deterministic.

use std::collections::HashMap;
use tracing::debug;

use crate::core::config::{check_service_name, GatewayConfig};
use crate::core::error::{GatewayError, GatewayResult};
use crate::core::types::ServiceEntry;

/// Immutable, ordered service name to address table
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    /// Entries in insertion order
    entries: Vec<ServiceEntry>,
    /// Position of each entry in `entries`, by name
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    /// Build a registry from entries given in the order they should be enumerated.
    ///
    /// Fails on duplicate names or names that cannot be served as a single path prefix.
    pub fn new(entries: Vec<ServiceEntry>) -> GatewayResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            check_service_name(&entry.name).map_err(GatewayError::config)?;
            if index.insert(entry.name.clone(), position).is_some() {
                return Err(GatewayError::config(format!(
                    "Service '{}' is registered more than once",
                    entry.name
                )));
            }
            debug!(service = %entry.name, address = %entry.base_str(), "Registered service");
        }

        Ok(Self { entries, index })
    }

    /// Build the registry described by the gateway configuration
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        Self::new(config.services.clone())
    }

    /// Look up the entry for `service_name`
    pub fn resolve(&self, service_name: &str) -> GatewayResult<&ServiceEntry> {
        self.index
            .get(service_name)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| GatewayError::unknown_route(format!("/{}", service_name)))
    }

    /// All entries in registry order
    pub fn entries(&self) -> &[ServiceEntry] {
        &self.entries
    }

    /// All service names in registry order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
