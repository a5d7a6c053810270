//! HTTP clients for the scholarhub backend.
//!
//! The backend authenticates requests with an HTTP-only session cookie, so
//! both clients here forward cookies on every request:
//! - [`ApiClient`]: the unsecured client, used for public endpoints and for
//!   issuing/clearing the session cookie itself
//! - [`SecuredClient`]: shares the unsecured client's cookie jar and base
//!   address, and routes 401/403 responses to a single registered
//!   [`UnauthorizedHandler`]

mod client;
mod error;
mod secured;

pub use client::ApiClient;
pub use error::ApiError;
pub use reqwest::StatusCode;
pub use secured::{InterceptorGuard, SecuredClient, UnauthorizedHandler};
