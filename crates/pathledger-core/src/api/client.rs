//! API client for communicating with the PathLedger REST API.
//!
//! `ApiClient` attaches the stored access token to every request. When a
//! first attempt comes back 401 it refreshes the token once and replays the
//! request once. If the refresh fails the session is over: both tokens are
//! cleared and navigation is forced to the login page.

use std::sync::Arc;

use reqwest::{header, Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{join_url, ApiError, ApiRequest, Attempt};
use crate::auth::{Refresher, TokenStore};
use crate::router::NavigationState;
use crate::routes::{AccessPolicy, Location};

/// Result of a single attempt. A 401 on a first attempt is held back so the
/// caller can decide whether to refresh.
enum Outcome {
    Done(Response),
    Unauthorized {
        sent_with: Option<String>,
        error: ApiError,
    },
}

/// HTTP client for the dashboard API.
/// Clone is cheap - reqwest::Client and the shared state are reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
    refresher: Refresher,
    nav: Arc<NavigationState>,
}

impl ApiClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        tokens: TokenStore,
        refresher: Refresher,
        nav: Arc<NavigationState>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            tokens,
            refresher,
            nav,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send one attempt of `request` with whatever access token is stored
    /// right now.
    async fn attempt(&self, request: &ApiRequest, attempt: Attempt) -> Result<Outcome, ApiError> {
        let token = self.tokens.access()?;
        let url = join_url(&self.base_url, request.path());

        debug!(
            method = %request.method(),
            url = %url,
            ?attempt,
            authenticated = token.is_some(),
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method().clone(), &url)
            .headers(Self::auth_headers(token.as_deref())?);
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        if response.status() == StatusCode::UNAUTHORIZED && attempt.may_refresh() {
            let body = response.text().await.unwrap_or_default();
            return Ok(Outcome::Unauthorized {
                sent_with: token,
                error: ApiError::from_status(StatusCode::UNAUTHORIZED, &body),
            });
        }

        Self::check_response(response).await.map(Outcome::Done)
    }

    /// Send a request, refreshing the access token and retrying once on 401.
    pub async fn send(&self, request: &ApiRequest) -> Result<Response, ApiError> {
        let (sent_with, original) = match self.attempt(request, Attempt::First).await? {
            Outcome::Done(response) => return Ok(response),
            Outcome::Unauthorized { sent_with, error } => (sent_with, error),
        };

        // QR-gated pages authenticate through the URL token, so a 401 there
        // says nothing about the session.
        if self.nav.current_policy() == AccessPolicy::RequiresSessionOrToken {
            debug!(path = request.path(), "Unauthorized on a QR-gated page, not refreshing");
            return Err(original);
        }

        if let Err(e) = self.refresher.refresh_after(sent_with.as_deref()).await {
            warn!(error = %e, path = request.path(), "Token refresh failed, ending session");
            self.end_session();
            return Err(original);
        }

        match self.attempt(request, Attempt::Retry).await? {
            Outcome::Done(response) => Ok(response),
            Outcome::Unauthorized { error, .. } => Err(error),
        }
    }

    /// Clear both tokens and send the user to the login page
    fn end_session(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
        self.nav.force(Location::login());
    }

    /// Send a request and decode the JSON response body
    pub async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse JSON response from {}: {}",
                request.path(),
                e
            ))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(&ApiRequest::get(path)).await
    }

    pub async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<T, ApiError> {
        self.fetch(&ApiRequest::get(path).with_query(query.iter().cloned()))
            .await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.fetch(&ApiRequest::post_json(path, body)?).await
    }

    /// POST without a body, e.g. action endpoints like `acknowledge/`
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch(&ApiRequest::post(path)).await
    }
}
