//! The unsecured API client.

use crate::error::ApiError;
use crate::secured::SecuredClient;
use reqwest::{Method, RequestBuilder, Response};
use scholarhub_core::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Cookie-forwarding client for the scholarhub backend.
///
/// Cloning is cheap and every clone shares one cookie jar, so a session
/// cookie set in response to one request is sent with all later requests,
/// including those made through [`SecuredClient`]s derived from it.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Arc<str>,
}

impl ApiClient {
    /// Creates a client for the given base address.
    ///
    /// The base address is fixed for the lifetime of the client; request
    /// paths are appended to it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
            url: base_url.to_string(),
            details: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_string(),
                details: "not a hierarchical URL".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                path: String::new(),
                details: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').into(),
        })
    }

    /// Returns the base address without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL for a request path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Derives a secured client sharing this client's cookie jar and base address.
    ///
    /// Each call creates a client with its own, initially empty, handler
    /// slot; share one secured client (by cloning) to keep a single handler.
    #[must_use]
    pub fn secured(&self) -> SecuredClient {
        SecuredClient::new(self.clone())
    }

    /// Sends a JSON body with POST.
    #[instrument(skip(self, body))]
    pub async fn post_json<B>(&self, path: &str, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self
            .dispatch(self.request(Method::POST, path).json(body), path)
            .await?;
        ensure_success(response, path)?;
        Ok(())
    }

    /// Sends a POST without a body.
    #[instrument(skip(self))]
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        let response = self.dispatch(self.request(Method::POST, path), path).await?;
        ensure_success(response, path)?;
        Ok(())
    }

    /// Fetches and decodes a JSON document with GET.
    #[instrument(skip(self))]
    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.dispatch(self.request(Method::GET, path), path).await?;
        decode(ensure_success(response, path)?, path).await
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Sends a request, mapping only transport failures.
    pub(crate) async fn dispatch(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| ApiError::Transport {
            path: path.to_string(),
            details: e.to_string(),
        })?;
        debug!(path, status = response.status().as_u16(), "api response");
        Ok(response)
    }
}

pub(crate) fn ensure_success(response: Response, path: &str) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status {
            path: path.to_string(),
            status: status.as_u16(),
        }
        .into())
    }
}

pub(crate) async fn decode<T>(response: Response, path: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned,
{
    let decoded = response.json::<T>().await.map_err(|e| ApiError::Decode {
        path: path.to_string(),
        details: e.to_string(),
    })?;
    Ok(decoded)
}
