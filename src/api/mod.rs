//! HTTP surface for the timeline engine.
//!
//! The router is composable: `timeline_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::timeline_api_router;
pub use server::{start_server, ServerError, ServerSession, TimelineServer};
pub use types::ApiContext;
