//! Web UI: meter page and live reading stream

pub mod events;
pub mod page;
pub mod server;

pub use server::{router, AppState, WebServer};
