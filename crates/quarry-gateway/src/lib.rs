//! HTTP surface for the analyze pipeline.

mod error;
mod handlers;
mod router;
mod server;

pub use error::GatewayError;
pub use server::{AppState, GatewayServer};
