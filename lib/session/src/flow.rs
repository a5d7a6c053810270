//! Page-level authentication flows.
//!
//! Each flow drives the session store, records new users with the backend
//! where needed, and navigates once the session has settled.

use crate::error::AuthError;
use crate::identity::Identity;
use crate::navigation::{HOME_PATH, Location, Navigator};
use crate::store::SessionStore;
use scholarhub_http::ApiClient;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Endpoint that records a newly registered user.
pub const SAVE_USER_PATH: &str = "/users";

/// Details collected by the registration form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub photo_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord<'a> {
    email: Option<&'a str>,
    #[serde(rename = "photoURL")]
    photo_url: Option<&'a str>,
    display_name: Option<&'a str>,
}

/// Sign-in, registration, password reset and sign-out as the pages run them.
#[derive(Clone)]
pub struct AuthFlows {
    store: SessionStore,
    api: ApiClient,
    navigator: Arc<dyn Navigator>,
}

impl AuthFlows {
    #[must_use]
    pub fn new(store: SessionStore, api: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            api,
            navigator,
        }
    }

    /// Signs in, then sends the user to `return_to` or home.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
        return_to: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let identity = self.store.sign_in(email, password).await?;
        self.land(return_to);
        Ok(identity)
    }

    /// Creates the account, sets its profile and records it with the backend.
    ///
    /// A failure to record the user is logged; the account exists either way.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(
        &self,
        registration: &Registration,
        return_to: Option<&str>,
    ) -> Result<Identity, AuthError> {
        self.store
            .sign_up(&registration.email, &registration.password)
            .await?;
        let identity = self
            .store
            .update_identity(Some(&registration.name), registration.photo_url.as_deref())
            .await?;

        self.save_user(&identity).await;
        info!(uid = %identity.uid(), "registered");
        self.land(return_to);
        Ok(identity)
    }

    /// Signs in through the federated popup and records the user.
    #[instrument(skip(self))]
    pub async fn federated(&self, return_to: Option<&str>) -> Result<Identity, AuthError> {
        let identity = self.store.sign_in_with_federated_provider().await?;
        self.save_user(&identity).await;
        self.land(return_to);
        Ok(identity)
    }

    /// Sends a password-reset email. No navigation.
    pub async fn reset_password(&self, email: &str) -> Result<(), AuthError> {
        self.store.reset_password_email(email).await
    }

    /// Signs out and returns home.
    pub async fn sign_out(&self) {
        self.store.sign_out().await;
        self.navigator.navigate(Location::new(HOME_PATH));
    }

    async fn save_user(&self, identity: &Identity) {
        let record = UserRecord {
            email: identity.email(),
            photo_url: identity.photo_url(),
            display_name: identity.display_name(),
        };
        if let Err(report) = self.api.post_json(SAVE_USER_PATH, &record).await {
            warn!(error = %report, uid = %identity.uid(), "failed to record user with backend");
        }
    }

    fn land(&self, return_to: Option<&str>) {
        self.navigator
            .navigate(Location::new(return_to.unwrap_or(HOME_PATH)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{CLEAR_SESSION_PATH, ISSUE_SESSION_PATH, TokenBridge};
    use crate::identity::Uid;
    use crate::memory::MemoryIdentityProvider;
    use crate::navigation::HistoryNavigator;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(save_status: Option<u16>) -> MockServer {
        let server = MockServer::start().await;
        for endpoint in [ISSUE_SESSION_PATH, CLEAR_SESSION_PATH] {
            Mock::given(method("POST"))
                .and(path(endpoint))
                .respond_with(ResponseTemplate::new(200))
                .mount(&server)
                .await;
        }
        if let Some(status) = save_status {
            Mock::given(method("POST"))
                .and(path(SAVE_USER_PATH))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;
        }
        server
    }

    async fn flows_for(
        server: &MockServer,
        provider: Arc<MemoryIdentityProvider>,
    ) -> (AuthFlows, SessionStore, Arc<HistoryNavigator>) {
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client");
        let store = SessionStore::new(provider, TokenBridge::new(api.clone()), Duration::from_secs(5));
        store.attach();
        store.wait_settled().await;
        let history = Arc::new(HistoryNavigator::new("/signIn"));
        (
            AuthFlows::new(store.clone(), api, history.clone()),
            store,
            history,
        )
    }

    fn registration() -> Registration {
        Registration {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "analytical".to_string(),
            photo_url: Some("https://img.example.com/ada.png".to_string()),
        }
    }

    #[tokio::test]
    async fn sign_in_returns_to_requested_page() {
        let server = backend(Some(200)).await;
        let provider = Arc::new(MemoryIdentityProvider::new().with_account("ada@example.com", "pw1234"));
        let (flows, _, history) = flows_for(&server, provider).await;

        flows
            .sign_in("ada@example.com", "pw1234", Some("/dashboard/profile"))
            .await
            .expect("sign in");
        assert_eq!(history.current().path(), "/dashboard/profile");
    }

    #[tokio::test]
    async fn failed_sign_in_stays_put() {
        let server = backend(Some(200)).await;
        let provider = Arc::new(MemoryIdentityProvider::new());
        let (flows, store, history) = flows_for(&server, provider).await;

        let err = flows.sign_in("nobody@example.com", "pw1234", None).await.unwrap_err();
        assert_eq!(err, AuthError::NotFound);
        assert_eq!(history.current().path(), "/signIn");
        assert!(!store.snapshot().is_loading());
    }

    #[tokio::test]
    async fn register_records_user_with_profile() {
        let server = backend(None).await;
        Mock::given(method("POST"))
            .and(path(SAVE_USER_PATH))
            .and(body_json(json!({
                "email": "ada@example.com",
                "photoURL": "https://img.example.com/ada.png",
                "displayName": "Ada Lovelace",
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        let (flows, store, history) = flows_for(&server, Arc::new(MemoryIdentityProvider::new())).await;

        let identity = flows.register(&registration(), None).await.expect("register");

        assert_eq!(identity.display_name(), Some("Ada Lovelace"));
        assert_eq!(store.snapshot().identity(), Some(&identity));
        assert_eq!(history.current().path(), HOME_PATH);
    }

    #[tokio::test]
    async fn register_survives_backend_failure() {
        let server = backend(Some(500)).await;
        let (flows, store, _) = flows_for(&server, Arc::new(MemoryIdentityProvider::new())).await;

        flows.register(&registration(), None).await.expect("register");
        assert!(store.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let server = backend(Some(200)).await;
        let (flows, _, history) = flows_for(&server, Arc::new(MemoryIdentityProvider::new())).await;

        let weak = Registration {
            password: "abc".to_string(),
            ..registration()
        };
        assert_eq!(flows.register(&weak, None).await, Err(AuthError::WeakPassword));
        assert_eq!(history.entries().len(), 1);
    }

    #[tokio::test]
    async fn federated_records_user() {
        let server = backend(Some(201)).await;
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider.set_federated_account(Some(Identity::new(
            Uid::from("google-grace"),
            Some("grace@example.com".to_string()),
        )));
        let (flows, _, history) = flows_for(&server, provider).await;

        flows.federated(Some("/dashboard")).await.expect("federated");

        let saved = server
            .received_requests()
            .await
            .expect("request recording enabled")
            .iter()
            .filter(|r| r.url.path() == SAVE_USER_PATH)
            .count();
        assert_eq!(saved, 1);
        assert_eq!(history.current().path(), "/dashboard");
    }

    #[tokio::test]
    async fn sign_out_goes_home() {
        let server = backend(Some(200)).await;
        let provider = Arc::new(MemoryIdentityProvider::new().with_account("ada@example.com", "pw1234"));
        let (flows, store, history) = flows_for(&server, provider).await;
        flows.sign_in("ada@example.com", "pw1234", Some("/dashboard")).await.expect("sign in");

        flows.sign_out().await;

        assert!(store.snapshot().is_anonymous());
        assert_eq!(history.current().path(), HOME_PATH);
    }
}
