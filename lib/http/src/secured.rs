//! The secured API client and its unauthorized-response interceptor.

use crate::client::{ApiClient, decode, ensure_success};
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use scholarhub_core::{InterceptorId, Result};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, instrument, warn};

/// Reacts to a response showing the session cookie is no longer valid.
#[async_trait]
pub trait UnauthorizedHandler: Send + Sync {
    /// Returns the session generation a request sent now belongs to.
    ///
    /// The secured client reads this before sending and hands it back with
    /// any rejection, so a handler can ignore rejections of sessions that
    /// have since been replaced.
    fn generation(&self) -> u64;

    /// Called once per 401/403 response, before the request's error is
    /// returned. `generation` is the value [`generation`](Self::generation)
    /// returned when the request was sent.
    async fn on_unauthorized(&self, status: StatusCode, path: &str, generation: u64);
}

struct Registration {
    id: InterceptorId,
    handler: Arc<dyn UnauthorizedHandler>,
}

/// Holds at most one registered handler.
#[derive(Default)]
struct InterceptorSlot {
    current: Mutex<Option<Registration>>,
}

impl InterceptorSlot {
    fn install(&self, registration: Registration) -> Option<InterceptorId> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.replace(registration).map(|previous| previous.id)
    }

    fn release(&self, id: InterceptorId) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|r| r.id == id) {
            *current = None;
            true
        } else {
            false
        }
    }

    fn handler(&self) -> Option<Arc<dyn UnauthorizedHandler>> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().map(|r| Arc::clone(&r.handler))
    }

    fn id(&self) -> Option<InterceptorId> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.as_ref().map(|r| r.id)
    }
}

/// Releases a handler registration when dropped.
///
/// Dropping a guard whose registration has since been replaced is a no-op,
/// so an old owner tearing down late never removes its successor.
#[must_use = "dropping the guard removes the handler"]
pub struct InterceptorGuard {
    id: InterceptorId,
    slot: Weak<InterceptorSlot>,
}

impl InterceptorGuard {
    /// Returns the registration this guard owns.
    #[must_use]
    pub fn id(&self) -> InterceptorId {
        self.id
    }
}

impl Drop for InterceptorGuard {
    fn drop(&mut self) {
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        if slot.release(self.id) {
            debug!(interceptor = %self.id, "unauthorized handler removed");
        }
    }
}

impl fmt::Debug for InterceptorGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorGuard").field("id", &self.id).finish()
    }
}

/// API client for endpoints that require the session cookie.
///
/// Clones share both the cookie jar and the handler slot.
#[derive(Clone)]
pub struct SecuredClient {
    api: ApiClient,
    slot: Arc<InterceptorSlot>,
}

impl SecuredClient {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self {
            api,
            slot: Arc::new(InterceptorSlot::default()),
        }
    }

    /// Returns the unsecured client this one was derived from.
    #[must_use]
    pub fn unsecured(&self) -> &ApiClient {
        &self.api
    }

    /// Installs the unauthorized handler, replacing any previous one.
    pub fn register(&self, handler: Arc<dyn UnauthorizedHandler>) -> InterceptorGuard {
        let id = InterceptorId::new();
        match self.slot.install(Registration { id, handler }) {
            Some(previous) => {
                debug!(%previous, current = %id, "unauthorized handler replaced");
            }
            None => debug!(current = %id, "unauthorized handler registered"),
        }
        InterceptorGuard {
            id,
            slot: Arc::downgrade(&self.slot),
        }
    }

    /// Returns the id of the installed handler, if any.
    #[must_use]
    pub fn handler_id(&self) -> Option<InterceptorId> {
        self.slot.id()
    }

    /// Fetches and decodes a JSON document with GET.
    #[instrument(skip(self))]
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(self.api.request(Method::GET, path), path).await?;
        decode(response, path).await
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Response, ApiError> {
        let sent_under = self.slot.handler().map(|handler| handler.generation());
        let response = self.api.dispatch(request, path).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            match self.slot.handler() {
                Some(handler) => {
                    let generation = sent_under.unwrap_or_else(|| handler.generation());
                    handler.on_unauthorized(status, path, generation).await;
                }
                None => warn!(path, status = status.as_u16(), "session rejected with no handler"),
            }
            return Err(ApiError::SessionInvalid {
                path: path.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        ensure_success(response, path)
    }
}

impl fmt::Debug for SecuredClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecuredClient")
            .field("base_url", &self.api.base_url())
            .field("handler", &self.slot.id())
            .finish()
    }
}
