//! Keeps the server's session cookie in step with the client identity.
//!
//! The backend authenticates API calls with an HTTP-only cookie rather than
//! a bearer token held by the client, so every identity transition has to
//! be mirrored with an issue or clear request.

use crate::error::SessionSyncError;
use crate::identity::Identity;
use rootcause::prelude::Report;
use scholarhub_http::ApiClient;
use serde::Serialize;
use tracing::{debug, instrument};

/// Endpoint that issues (or refreshes) the session cookie.
pub const ISSUE_SESSION_PATH: &str = "/getToken";

/// Endpoint that clears the session cookie.
pub const CLEAR_SESSION_PATH: &str = "/logout";

#[derive(Serialize)]
struct IssueRequest<'a> {
    email: &'a str,
}

/// Issues and clears the server session through the unsecured client.
#[derive(Debug, Clone)]
pub struct TokenBridge {
    api: ApiClient,
}

impl TokenBridge {
    /// Creates a bridge over the given client.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Requests a session cookie for the identity's email.
    ///
    /// Safe to repeat for an identity that already holds a valid cookie.
    #[instrument(skip(self, identity), fields(uid = %identity.uid()))]
    pub async fn issue(&self, identity: &Identity) -> Result<(), Report<SessionSyncError>> {
        let email = identity
            .email()
            .ok_or_else(|| SessionSyncError::MissingEmail {
                uid: identity.uid().to_string(),
            })?;

        self.api
            .post_json(ISSUE_SESSION_PATH, &IssueRequest { email })
            .await
            .map_err(|e| SessionSyncError::IssueFailed {
                email: email.to_string(),
                details: e.to_string(),
            })?;

        debug!("server session issued");
        Ok(())
    }

    /// Asks the server to drop the session cookie.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), Report<SessionSyncError>> {
        self.api
            .post_empty(CLEAR_SESSION_PATH)
            .await
            .map_err(|e| SessionSyncError::ClearFailed {
                details: e.to_string(),
            })?;

        debug!("server session cleared");
        Ok(())
    }
}
