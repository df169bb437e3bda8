// src/load_balancer/selection.rs
use crate::proxy::Backend;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Outcome of one bounded sweep over the backend list.
#[derive(Clone)]
pub enum Selection {
    Selected(Arc<dyn Backend>),
    Unavailable,
}

impl Selection {
    pub fn backend(&self) -> Option<&Arc<dyn Backend>> {
        match self {
            Selection::Selected(backend) => Some(backend),
            Selection::Unavailable => None,
        }
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Selected(backend) => f.debug_tuple("Selected").field(&backend.address()).finish(),
            Selection::Unavailable => f.write_str("Unavailable"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendHealth {
    pub address: String,
    pub alive: bool,
    pub checked_at: DateTime<Utc>,
}

impl fmt::Display for BackendHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.alive { "alive" } else { "not alive" };
        write!(f, "Server {} is {}", self.address, status)
    }
}
