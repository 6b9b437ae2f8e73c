//! HTTP API layer for rapshare.
//!
//! - **Endpoints**: like toggling, content creation, uploads and deletion
//! - **Extractors**: caller identity and `{kind}/{id}` paths
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
