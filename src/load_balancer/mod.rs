// src/load_balancer/mod.rs
mod round_robin;
mod selection;

pub use round_robin::Dispatcher;
pub use selection::{BackendHealth, Selection};
