//! Token endpoints: the password login and the exchange of the refresh
//! token for a new access token.
//!
//! Both calls go around `ApiClient`: a 401 from either endpoint must not
//! trigger a refresh.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AuthError, CredentialPair, TokenStore};
use crate::api::{join_url, ApiError};

pub const TOKEN_PATH: &str = "/api/token/";
pub const REFRESH_PATH: &str = "/api/token/refresh/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Refresh flow. Clone is cheap; clones share the refresh lock, so
/// concurrent refreshes through any clone are serialized.
#[derive(Clone)]
pub struct Refresher {
    inner: Arc<RefresherInner>,
}

struct RefresherInner {
    client: Client,
    base_url: String,
    tokens: TokenStore,
    lock: Mutex<()>,
}

impl Refresher {
    pub fn new(client: Client, base_url: impl Into<String>, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                client,
                base_url: base_url.into(),
                tokens,
                lock: Mutex::new(()),
            }),
        }
    }

    /// Trade a username and password for a fresh credential pair and store
    /// it. Nothing is stored when the server rejects the credentials.
    pub async fn obtain_pair(&self, username: &str, password: &str) -> Result<CredentialPair, AuthError> {
        let _guard = self.inner.lock.lock().await;

        let url = join_url(&self.inner.base_url, TOKEN_PATH);
        let response = self
            .inner
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::LoginRejected(ApiError::from_status(status, &body)));
        }

        let parsed: TokenPairResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let pair = CredentialPair::new(parsed.access, parsed.refresh);
        self.inner.tokens.set(&pair)?;
        info!(username = username, "Logged in");
        Ok(pair)
    }

    /// Manually refresh the access token. Always calls the refresh endpoint.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let _guard = self.inner.lock.lock().await;
        self.exchange().await
    }

    /// Refresh on behalf of a request that was rejected while carrying
    /// `stale`. If another request already refreshed while this one waited
    /// for the lock, the newer token is returned without a network call.
    pub async fn refresh_after(&self, stale: Option<&str>) -> Result<String, AuthError> {
        let _guard = self.inner.lock.lock().await;

        match self.inner.tokens.access()? {
            Some(current) if stale != Some(current.as_str()) => {
                debug!("Access token already replaced by a concurrent refresh");
                return Ok(current);
            }
            None if stale.is_some() => return Err(AuthError::SessionEnded),
            _ => {}
        }

        self.exchange().await
    }

    async fn exchange(&self) -> Result<String, AuthError> {
        let refresh = self
            .inner
            .tokens
            .refresh_token()?
            .ok_or(AuthError::NoRefreshToken)?;

        let url = join_url(&self.inner.base_url, REFRESH_PATH);
        let response = self
            .inner
            .client
            .post(&url)
            .json(&RefreshRequest { refresh: &refresh })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected(ApiError::from_status(status, &body)));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        self.inner.tokens.set_access(&parsed.access)?;
        info!("Access token refreshed");
        Ok(parsed.access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn refresher(server: &MockServer, tokens: &TokenStore) -> Refresher {
        Refresher::new(Client::new(), server.uri(), tokens.clone())
    }

    #[tokio::test]
    async fn test_refresh_stores_new_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(body_json(json!({ "refresh": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a2" })))
            .expect(1)
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        tokens.set(&CredentialPair::new("a1", "r1")).unwrap();

        let token = refresher(&server, &tokens).refresh().await.unwrap();
        assert_eq!(token, "a2");
        assert_eq!(tokens.get().unwrap(), Some(CredentialPair::new("a2", "r1")));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a2" })))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        tokens.set_access("a1").unwrap();

        let result = refresher(&server, &tokens).refresh().await;
        assert!(matches!(result, Err(AuthError::NoRefreshToken)));
    }

    #[tokio::test]
    async fn test_rejected_refresh_leaves_tokens_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "detail": "Token is invalid or expired" })),
            )
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        tokens.set(&CredentialPair::new("a1", "r1")).unwrap();

        let result = refresher(&server, &tokens).refresh().await;
        assert!(matches!(result, Err(AuthError::Rejected(ApiError::Unauthorized))));
        assert_eq!(tokens.get().unwrap(), Some(CredentialPair::new("a1", "r1")));
    }

    #[tokio::test]
    async fn test_refresh_after_skips_call_when_token_already_replaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a3" })))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        tokens.set(&CredentialPair::new("a2", "r1")).unwrap();

        let token = refresher(&server, &tokens).refresh_after(Some("a1")).await.unwrap();
        assert_eq!(token, "a2");
    }

    #[tokio::test]
    async fn test_refresh_after_fails_when_session_was_cleared() {
        let server = MockServer::start().await;
        let tokens = TokenStore::in_memory();

        let result = refresher(&server, &tokens).refresh_after(Some("a1")).await;
        assert!(matches!(result, Err(AuthError::SessionEnded)));
    }

    #[tokio::test]
    async fn test_obtain_pair_stores_both_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_json(json!({ "username": "ops", "password": "hunter2" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access": "a1", "refresh": "r1" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        let pair = refresher(&server, &tokens)
            .obtain_pair("ops", "hunter2")
            .await
            .unwrap();

        assert_eq!(pair, CredentialPair::new("a1", "r1"));
        assert_eq!(tokens.get().unwrap(), Some(pair));
    }

    #[tokio::test]
    async fn test_rejected_login_stores_nothing_and_never_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "detail": "No active account found with the given credentials"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let tokens = TokenStore::in_memory();
        let err = refresher(&server, &tokens)
            .obtain_pair("ops", "wrong")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::LoginRejected(ApiError::Unauthorized)));
        assert!(tokens.get().unwrap().is_none());
    }
}
