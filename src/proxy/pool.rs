//
// src/proxy/pool.rs
//

use super::backend::{Backend, HttpBackend};
use crate::config::{Config, ConfigError};
use std::sync::Arc;

/// Fixed, ordered set of backends. Order is rotation order.
#[derive(Clone)]
pub struct BackendPool {
    backends: Arc<[Arc<dyn Backend>]>,
}

impl BackendPool {
    pub fn new(backends: Vec<Arc<dyn Backend>>) -> Result<Self, ConfigError> {
        if backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        Ok(Self {
            backends: backends.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let backends = config
            .backends
            .iter()
            .map(|backend| {
                HttpBackend::new(backend, &config.probe)
                    .map(|b| Arc::new(b) as Arc<dyn Backend>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Configured {} backends", backends.len());
        Self::new(backends)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    // Never true: construction rejects an empty list.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn get(&self, index: usize) -> &Arc<dyn Backend> {
        &self.backends[index % self.backends.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Backend>> {
        self.backends.iter()
    }
}
