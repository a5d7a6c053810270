//! Identity provider backed by the Identity Toolkit REST API.

use crate::error::AuthError;
use crate::identity::{Identity, Uid};
use crate::provider::{FederatedPopup, IdentityProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest {
    post_body: String,
    request_uri: String,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    #[serde(default)]
    email_verified: bool,
    /// Milliseconds since the epoch, as a decimal string.
    created_at: Option<String>,
    last_login_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct Ignored {}

/// Identity provider speaking the Identity Toolkit `accounts:*` endpoints.
///
/// The ID token from the latest sign-in is held in memory only.
pub struct IdentityToolkitProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    popup: Option<Arc<dyn FederatedPopup>>,
    id_token: Mutex<Option<String>>,
    current: watch::Sender<Option<Identity>>,
}

impl IdentityToolkitProvider {
    /// Creates a provider for the project owning `api_key`.
    ///
    /// # Errors
    ///
    /// Returns `Unrecognized` if the HTTP client cannot be built.
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Unrecognized {
                code: format!("http client: {e}"),
            })?;
        let (current, _) = watch::channel(None);
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            popup: None,
            id_token: Mutex::new(None),
            current,
        })
    }

    /// Enables federated sign-in through the given popup.
    #[must_use]
    pub fn with_popup(mut self, popup: Arc<dyn FederatedPopup>) -> Self {
        self.popup = Some(popup);
        self
    }

    fn id_token(&self) -> MutexGuard<'_, Option<String>> {
        self.id_token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, AuthError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/accounts:{method}", self.endpoint);
        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(method, error = %e, "identity provider unreachable");
                AuthError::NetworkUnreachable
            })?;

        let status = response.status();
        if !status.is_success() {
            let envelope: ErrorEnvelope =
                response.json().await.map_err(|_| AuthError::Unrecognized {
                    code: format!("HTTP_{}", status.as_u16()),
                })?;
            debug!(method, code = %envelope.error.message, "identity provider rejected request");
            return Err(AuthError::from_provider_code(&envelope.error.message));
        }

        response.json().await.map_err(|e| AuthError::Unrecognized {
            code: format!("malformed response: {e}"),
        })
    }

    /// Stores the new token, fetches the full profile and publishes it.
    async fn complete_sign_in(&self, account: AccountResponse) -> Identity {
        let Some(token) = account.id_token.clone() else {
            let identity = identity_from_account(account);
            self.current.send_replace(Some(identity.clone()));
            return identity;
        };
        *self.id_token() = Some(token.clone());

        let identity = match self.lookup(&token).await {
            Ok(Some(identity)) => identity,
            Ok(None) | Err(_) => identity_from_account(account),
        };
        self.current.send_replace(Some(identity.clone()));
        identity
    }

    async fn lookup(&self, id_token: &str) -> Result<Option<Identity>, AuthError> {
        let response: LookupResponse = self.call("lookup", &LookupRequest { id_token }).await?;
        Ok(response.users.into_iter().next().map(identity_from_lookup))
    }
}

fn identity_from_account(account: AccountResponse) -> Identity {
    Identity::new(Uid::new(account.local_id), account.email)
        .with_profile(account.display_name, account.photo_url)
        .with_email_verified(account.email_verified)
}

fn identity_from_lookup(user: LookupUser) -> Identity {
    Identity::new(Uid::new(user.local_id), user.email)
        .with_profile(user.display_name, user.photo_url)
        .with_email_verified(user.email_verified)
        .with_timestamps(
            parse_millis(user.created_at.as_deref()),
            parse_millis(user.last_login_at.as_deref()),
        )
}

fn parse_millis(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw?.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    fn observe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    #[instrument(skip(self, password))]
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let account: AccountResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.complete_sign_in(account).await)
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
            )
            .await?;
        Ok(self.complete_sign_in(account).await)
    }

    #[instrument(skip(self))]
    async fn sign_in_with_popup(&self) -> Result<Identity, AuthError> {
        let Some(popup) = &self.popup else {
            return Err(AuthError::PopupBlocked);
        };
        let credential = popup.open().await?;

        let request = IdpRequest {
            post_body: format!(
                "id_token={}&providerId={}",
                credential.id_token, credential.provider_id
            ),
            request_uri: credential.request_uri,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let account: AccountResponse = self.call("signInWithIdp", &request).await?;
        Ok(self.complete_sign_in(account).await)
    }

    #[instrument(skip(self))]
    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let current = self.current().ok_or(AuthError::NoCurrentIdentity)?;
        let token = self.id_token().clone().ok_or(AuthError::NoCurrentIdentity)?;

        let account: AccountResponse = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: &token,
                    display_name,
                    photo_url,
                    return_secure_token: true,
                },
            )
            .await?;
        if let Some(refreshed) = account.id_token {
            *self.id_token() = Some(refreshed);
        }

        let updated = current.clone().with_profile(
            account
                .display_name
                .or_else(|| current.display_name().map(str::to_string)),
            account
                .photo_url
                .or_else(|| current.photo_url().map(str::to_string)),
        );
        self.current.send_replace(Some(updated.clone()));
        Ok(updated)
    }

    #[instrument(skip(self))]
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let _: Ignored = self
            .call(
                "sendOobCode",
                &OobRequest {
                    request_type: "PASSWORD_RESET",
                    email,
                },
            )
            .await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.id_token().take();
        self.current.send_replace(None);
        Ok(())
    }
}
