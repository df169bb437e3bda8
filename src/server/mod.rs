pub mod admin;
pub mod builder;
pub mod handler;
pub mod listener;

pub use admin::{start_admin_server, AdminState};
pub use builder::{serve_listener, ServerBuilder};
pub use handler::RequestHandler;
