// src/health/mod.rs
mod reporter;

pub use reporter::HealthReporter;
