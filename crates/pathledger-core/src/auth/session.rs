use std::sync::RwLock;

use tracing::debug;

use super::TokenStore;
use crate::api::{ApiClient, ApiError};
use crate::resources::User;

/// Endpoint returning the user the current access token belongs to
pub const USER_SELF_PATH: &str = "/api/user_self/";

/// In-memory projection of the logged-in user.
///
/// Authentication is derived from the token store, not from the cached
/// user: a session with a token but no user record yet is authenticated.
pub struct SessionContext {
    tokens: TokenStore,
    user: RwLock<Option<User>>,
}

impl SessionContext {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            user: RwLock::new(None),
        }
    }

    /// True iff an access token is stored
    pub fn is_authenticated(&self) -> bool {
        self.tokens.has_access()
    }

    /// Cached user record, if it has been loaded
    pub fn user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn has_user(&self) -> bool {
        self.user
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Username of the cached user, or empty if none is loaded
    pub fn username(&self) -> String {
        self.user().map(|u| u.username).unwrap_or_default()
    }

    /// Load the current user. On failure the cache is reset and the error is
    /// returned; callers that treat the profile as optional just log it.
    pub async fn fetch_user(&self, api: &ApiClient) -> Result<User, ApiError> {
        let result = api.get_json::<User>(USER_SELF_PATH).await;
        let mut cached = self
            .user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match result {
            Ok(user) => {
                debug!(user_id = user.id, "Current user loaded");
                *cached = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                *cached = None;
                Err(e)
            }
        }
    }

    /// Drop the cached user (logout teardown)
    pub fn clear(&self) {
        *self
            .user
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
