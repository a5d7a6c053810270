//! Fetches the current identity's role through the secured client.

use crate::cache::RoleCache;
use crate::error::RoleError;
use crate::role::{Role, RoleState};
use rootcause::prelude::Report;
use scholarhub_http::SecuredClient;
use scholarhub_session::Identity;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, Deserialize)]
struct RoleResponse {
    role: Option<String>,
}

/// Returns the backend path holding `email`'s role.
#[must_use]
pub fn role_path(email: &str) -> String {
    format!("/users/{email}/role")
}

/// Resolves roles, caching one result per identity and session epoch.
///
/// Any failure resolves to [`RoleState::Unknown`]. A 401/403 on the role
/// request also runs the secured client's unauthorized handler.
#[derive(Clone)]
pub struct RoleResolver {
    secured: SecuredClient,
    cache: Arc<RoleCache>,
}

impl RoleResolver {
    #[must_use]
    pub fn new(secured: SecuredClient) -> Self {
        Self {
            secured,
            cache: Arc::new(RoleCache::new()),
        }
    }

    /// Returns what is cached for the identity without fetching.
    #[must_use]
    pub fn cached(&self, identity: &Identity, epoch: u64) -> RoleState {
        if identity.email().is_none() {
            return RoleState::Unknown;
        }
        self.cache.peek(identity.uid(), epoch)
    }

    /// Returns the identity's role, fetching it once per session epoch.
    #[instrument(skip(self, identity), fields(uid = %identity.uid()))]
    pub async fn resolve(&self, identity: &Identity, epoch: u64) -> RoleState {
        self.cache
            .get_or_fetch(identity.uid(), epoch, move || async move {
                match self.fetch(identity).await {
                    Ok(role) => {
                        debug!(%role, "role resolved");
                        RoleState::Known(role)
                    }
                    Err(report) => {
                        warn!(error = %report, "role unavailable; treating as unknown");
                        RoleState::Unknown
                    }
                }
            })
            .await
    }

    async fn fetch(&self, identity: &Identity) -> Result<Role, Report<RoleError>> {
        let email = identity.email().ok_or_else(|| RoleError::MissingEmail {
            uid: identity.uid().to_string(),
        })?;

        let response: RoleResponse = self
            .secured
            .get_json(&role_path(email))
            .await
            .map_err(|e| RoleError::FetchFailed {
                email: email.to_string(),
                details: e.to_string(),
            })?;

        let raw = response.role.ok_or_else(|| RoleError::NoRole {
            email: email.to_string(),
        })?;
        Ok(raw.parse::<Role>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholarhub_http::ApiClient;
    use scholarhub_session::Uid;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ada() -> Identity {
        Identity::new(Uid::from("uid-ada"), Some("ada@example.com".to_string()))
    }

    fn resolver_for(server: &MockServer) -> RoleResolver {
        let api = ApiClient::new(&server.uri(), Duration::from_secs(5)).expect("client");
        RoleResolver::new(api.secured())
    }

    async fn role_endpoint(body: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ada@example.com/role"))
            .respond_with(body)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn known_role_is_resolved_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/ada@example.com/role"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "role": "admin" })))
            .expect(1)
            .mount(&server)
            .await;
        let resolver = resolver_for(&server);

        assert_eq!(resolver.cached(&ada(), 1), RoleState::Pending);
        assert_eq!(resolver.resolve(&ada(), 1).await, RoleState::Known(Role::Admin));
        assert_eq!(resolver.resolve(&ada(), 1).await, RoleState::Known(Role::Admin));
        assert_eq!(resolver.cached(&ada(), 1), RoleState::Known(Role::Admin));
    }

    #[tokio::test]
    async fn missing_role_is_unknown() {
        let server = role_endpoint(ResponseTemplate::new(200).set_body_json(json!({}))).await;
        assert_eq!(resolver_for(&server).resolve(&ada(), 1).await, RoleState::Unknown);
    }

    #[tokio::test]
    async fn unrecognized_role_is_unknown() {
        let server =
            role_endpoint(ResponseTemplate::new(200).set_body_json(json!({ "role": "owner" }))).await;
        assert_eq!(resolver_for(&server).resolve(&ada(), 1).await, RoleState::Unknown);
    }

    #[tokio::test]
    async fn server_error_is_unknown() {
        let server = role_endpoint(ResponseTemplate::new(500)).await;
        assert_eq!(resolver_for(&server).resolve(&ada(), 1).await, RoleState::Unknown);
    }

    #[tokio::test]
    async fn identity_without_email_is_unknown() {
        let server = MockServer::start().await;
        let phone_only = Identity::new(Uid::from("uid-phone"), None);
        let resolver = resolver_for(&server);

        assert_eq!(resolver.cached(&phone_only, 1), RoleState::Unknown);
        assert_eq!(resolver.resolve(&phone_only, 1).await, RoleState::Unknown);
    }

    #[test]
    fn role_path_embeds_email() {
        assert_eq!(role_path("ada@example.com"), "/users/ada@example.com/role");
    }
}
