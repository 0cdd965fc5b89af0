use std::sync::Arc;

use reqwest::Client;
use wiremock::MockServer;

use crate::api::ApiClient;
use crate::auth::{CredentialPair, Refresher, TokenStore};
use crate::router::NavigationState;

/// Client against `server` with a logged-in in-memory token store
pub(crate) fn api_for(server: &MockServer) -> (ApiClient, TokenStore) {
    let client = Client::new();
    let tokens = TokenStore::in_memory();
    tokens
        .set(&CredentialPair::new("a1", "r1"))
        .expect("memory store accepts tokens");
    let nav = Arc::new(NavigationState::new());
    let refresher = Refresher::new(client.clone(), server.uri(), tokens.clone());
    let api = ApiClient::new(client, server.uri(), tokens.clone(), refresher, nav);
    (api, tokens)
}
