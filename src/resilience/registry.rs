//! Process-wide breaker registry.
//!
//! # Responsibilities
//! - Create one breaker per target name at startup
//! - Hand the same `Arc<CircuitBreaker>` to every pipeline using that name
//!
//! # Design Decisions
//! - Explicit table built by the caller and injected, not a global
//! - Breaker state never leaks across names
//! - Unknown names get a breaker with the configured defaults

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::CircuitBreakerConfig;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker};

/// Breakers keyed by name.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    defaults: CircuitBreakerConfig,
}

impl BreakerRegistry {
    pub fn new(defaults: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            defaults,
        }
    }

    /// Build a registry holding one breaker per config entry.
    pub fn from_configs(configs: &[CircuitBreakerConfig]) -> Self {
        let registry = Self::default();
        for config in configs {
            registry.register(config.clone());
        }
        tracing::info!(breakers = registry.breakers.len(), "Breaker registry initialized");
        registry
    }

    /// Insert a breaker, keeping an existing one with the same name.
    pub fn register(&self, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(config.name.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(&config)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|r| r.value().clone())
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.get(name) {
            return breaker;
        }
        tracing::debug!(breaker = %name, "Creating breaker with default settings");
        self.register(CircuitBreakerConfig {
            name: name.to_string(),
            ..self.defaults.clone()
        })
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<_> = self.breakers.iter().map(|r| r.value().snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }
}
