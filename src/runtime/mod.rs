//! Runtime: the route table and the HTTP server that drives it.

mod config;
mod routing;
mod server;

pub use config::ServerConfig;
pub use routing::{App, ErrorHandler};
