//! Wires the session pieces together for one client.

use crate::bridge::TokenBridge;
use crate::config::ClientConfig;
use crate::flow::AuthFlows;
use crate::interceptor::ForcedSignOut;
use crate::navigation::Navigator;
use crate::provider::IdentityProvider;
use crate::store::SessionStore;
use rootcause::prelude::Report;
use scholarhub_http::{ApiClient, ApiError, InterceptorGuard, SecuredClient};
use std::sync::Arc;
use tracing::info;

/// The session store, API clients and unauthorized handler of one client.
///
/// Creating the context attaches the identity observer and installs the
/// forced sign-out handler on the secured client. Dropping it releases
/// both.
pub struct SessionContext {
    store: SessionStore,
    api: ApiClient,
    secured: SecuredClient,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    interceptor: InterceptorGuard,
}

impl SessionContext {
    /// Starts a session context. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API base URL is invalid.
    pub fn start(
        config: &ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Report<ApiError>> {
        let api = ApiClient::new(config.api_base_url(), config.request_timeout())?;
        let secured = api.secured();
        let store = SessionStore::new(
            provider,
            TokenBridge::new(api.clone()),
            config.settle_timeout(),
        );
        store.attach();

        let interceptor = secured.register(Arc::new(ForcedSignOut::new(
            store.clone(),
            navigator.clone(),
            config.sign_in_path(),
        )));
        info!(api = %api.base_url(), "session context started");

        Ok(Self {
            store,
            api,
            secured,
            navigator,
            sign_in_path: config.sign_in_path().to_string(),
            interceptor,
        })
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The client for unauthenticated backend calls.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The client for calls that require the session cookie.
    #[must_use]
    pub fn secured(&self) -> &SecuredClient {
        &self.secured
    }

    #[must_use]
    pub fn navigator(&self) -> Arc<dyn Navigator> {
        self.navigator.clone()
    }

    #[must_use]
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    #[must_use]
    pub fn flows(&self) -> AuthFlows {
        AuthFlows::new(self.store.clone(), self.api.clone(), self.navigator.clone())
    }

    /// Replaces the navigator, reinstalling the unauthorized handler so
    /// exactly one stays registered.
    pub fn set_navigator(&mut self, navigator: Arc<dyn Navigator>) {
        self.interceptor = self.secured.register(Arc::new(ForcedSignOut::new(
            self.store.clone(),
            navigator.clone(),
            &self.sign_in_path,
        )));
        self.navigator = navigator;
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.store.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CLEAR_SESSION_PATH, ISSUE_SESSION_PATH};
    use crate::memory::MemoryIdentityProvider;
    use crate::navigation::HistoryNavigator;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend() -> MockServer {
        let server = MockServer::start().await;
        for endpoint in [ISSUE_SESSION_PATH, CLEAR_SESSION_PATH] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/applications"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn start_attaches_and_installs_handler() {
        let server = backend().await;
        let config = ClientConfig::new(server.uri());
        let context = SessionContext::start(
            &config,
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(HistoryNavigator::default()),
        )
        .expect("start");

        assert!(context.store().is_attached());
        assert!(context.secured().handler_id().is_some());
        assert!(context.store().wait_settled().await.is_anonymous());
    }

    #[tokio::test]
    async fn invalid_base_url_is_rejected() {
        let config = ClientConfig::new("not a url".to_string());
        let result = SessionContext::start(
            &config,
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(HistoryNavigator::default()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn drop_releases_handler_and_observer() {
        let server = backend().await;
        let config = ClientConfig::new(server.uri());
        let context = SessionContext::start(
            &config,
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(HistoryNavigator::default()),
        )
        .expect("start");
        let store = context.store().clone();
        let secured = context.secured().clone();

        drop(context);

        assert!(!store.is_attached());
        assert!(secured.handler_id().is_none());
    }

    #[tokio::test]
    async fn replaced_navigator_receives_forced_redirect() {
        let server = backend().await;
        let config = ClientConfig::new(server.uri());
        let provider =
            Arc::new(MemoryIdentityProvider::new().with_account("ada@example.com", "pw1234"));
        let first = Arc::new(HistoryNavigator::default());
        let second = Arc::new(HistoryNavigator::default());
        let mut context =
            SessionContext::start(&config, provider, first.clone()).expect("start");
        let before = context.secured().handler_id();

        context.set_navigator(second.clone());
        assert_ne!(context.secured().handler_id(), before);

        context
            .store()
            .sign_in("ada@example.com", "pw1234")
            .await
            .expect("sign in");
        let result = context
            .secured()
            .get_json::<serde_json::Value>("/applications")
            .await;

        assert!(result.is_err());
        assert_eq!(second.current().path(), "/signIn");
        assert_eq!(first.entries().len(), 1);
    }
}
