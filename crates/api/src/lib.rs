//! HTTP API layer for keyward.
//!
//! - **Endpoints**: sign-in, credentials, sign-in addresses, audit history
//! - **Extractors**: bearer authentication, client address, user agent
//! - **Middleware**: session token resolution
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
