//! Session management for the scholarhub client.
//!
//! This crate provides:
//! - The identity-provider seam ([`IdentityProvider`]) with an Identity
//!   Toolkit REST implementation and an in-memory one
//! - The [`SessionStore`], the single source of truth for who is signed in
//! - The [`TokenBridge`] that mirrors identity transitions into the
//!   server's session cookie
//! - [`ForcedSignOut`], the handler the secured client runs on 401/403
//! - Page-level [`AuthFlows`] and the [`SessionContext`] that wires it all
//!
//! # Session lifecycle
//!
//! A store starts `Uninitialized`, becomes `Loading` once attached to the
//! provider's observer, and settles on `Authenticated` or `Anonymous`.
//! Every operation that changes identity passes through `Loading` and only
//! returns once the observer has confirmed the new state.
//!
//! # Example
//!
//! ```no_run
//! use scholarhub_session::{
//!     ClientConfig, HistoryNavigator, MemoryIdentityProvider, SessionContext,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("http://localhost:5000".to_string());
//! let provider = Arc::new(MemoryIdentityProvider::new().with_account("ada@example.com", "pw1234"));
//! let context = SessionContext::start(&config, provider, Arc::new(HistoryNavigator::default()))
//!     .map_err(|e| e.to_string())?;
//!
//! context.flows().sign_in("ada@example.com", "pw1234", None).await?;
//! assert!(context.store().snapshot().is_authenticated());
//! # Ok(())
//! # }
//! ```

mod bridge;
mod config;
mod context;
mod error;
mod flow;
mod identity;
mod interceptor;
mod memory;
mod navigation;
mod provider;
mod session;
mod store;
mod toolkit;

pub use bridge::{CLEAR_SESSION_PATH, ISSUE_SESSION_PATH, TokenBridge};
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_TOOLKIT_ENDPOINT, IdentityConfig, ProviderKind,
};
pub use context::SessionContext;
pub use error::{AuthError, SessionSyncError};
pub use flow::{AuthFlows, Registration, SAVE_USER_PATH};
pub use identity::{Identity, Uid};
pub use interceptor::ForcedSignOut;
pub use memory::MemoryIdentityProvider;
pub use navigation::{HOME_PATH, HistoryNavigator, Location, Navigator, SIGN_IN_PATH};
pub use provider::{FederatedCredential, FederatedPopup, IdentityProvider};
pub use session::{SessionPhase, SessionSnapshot};
pub use store::SessionStore;
pub use toolkit::IdentityToolkitProvider;
