//! Shared foundations for the scholarhub client crates.
//!
//! Provides the `Result` alias used for layered transport errors and the
//! strongly-typed handle identifiers for scoped resources (observer
//! subscriptions, interceptor registrations).

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InterceptorId, ObserverId};
