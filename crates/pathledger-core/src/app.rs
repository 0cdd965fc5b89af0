//! Application facade.
//!
//! `App` owns one of everything: config, token store, refresh flow, HTTP
//! client, session context, and router. Front ends talk to this type and
//! to the resource stores built from `App::api`.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{FileBackend, KeyringBackend, Refresher, SessionContext, TokenStore};
use crate::config::{Config, TokenBackendKind};
use crate::resources::User;
use crate::router::{NavigationState, Router, RouterError};
use crate::routes::{Location, RouteName, REDIRECT_PARAM};

pub struct App {
    config: Config,
    tokens: TokenStore,
    refresher: Refresher,
    api: ApiClient,
    session: Arc<SessionContext>,
    nav: Arc<NavigationState>,
    router: Router,
}

impl App {
    /// Create the app with the token backend named in `config`
    pub fn new(config: Config) -> Result<Self> {
        let tokens = match config.token_backend {
            TokenBackendKind::File => {
                let dir = config.data_dir()?;
                TokenStore::new(FileBackend::open(&dir).context("Failed to open token file")?)
            }
            TokenBackendKind::Keyring => TokenStore::new(KeyringBackend::new()),
        };
        Self::with_token_store(config, tokens)
    }

    pub fn with_token_store(config: Config, tokens: TokenStore) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = config.api_base_url().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, backend = ?config.token_backend, "Creating app");

        let refresher = Refresher::new(client.clone(), base_url.clone(), tokens.clone());
        let nav = Arc::new(NavigationState::new());
        let api = ApiClient::new(
            client,
            base_url,
            tokens.clone(),
            refresher.clone(),
            nav.clone(),
        );
        let session = Arc::new(SessionContext::new(tokens.clone()));
        let router = Router::new(nav.clone(), session.clone(), api.clone());

        Ok(Self {
            config,
            tokens,
            refresher,
            api,
            session,
            nav,
            router,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn current_location(&self) -> Location {
        self.router.current()
    }

    pub fn title(&self) -> String {
        self.router.title()
    }

    /// Navigate to `"/path?query"` through the session guard
    pub async fn navigate(&self, full_path: &str) -> Result<Location, RouterError> {
        self.router.navigate(Location::parse(full_path)).await
    }

    /// Log in and continue to the page the login was started from, or Home.
    pub async fn login(&self, username: &str, password: &str) -> Result<Location> {
        // A user cached for a previous account must not survive the switch.
        self.session.clear();

        self.refresher
            .obtain_pair(username, password)
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .context("Login failed")?;

        let target = self.resume_target();
        info!(username = username, target = %target, "Login successful");
        Ok(self.router.navigate(target).await?)
    }

    /// Where to go after login: the login page's `redirect` query when it
    /// names a local path, otherwise Home.
    fn resume_target(&self) -> Location {
        let current = self.router.current();
        let on_login = crate::routes::resolve(current.path()).route.name == RouteName::Login;

        current
            .query_value(REDIRECT_PARAM)
            .filter(|_| on_login)
            .filter(|r| r.starts_with('/') && !r.starts_with("//"))
            .map(Location::parse)
            .unwrap_or_else(Location::home)
    }

    /// Drop both tokens and the cached user and return to the login page
    pub fn logout(&self) -> Result<()> {
        let cleared = self.tokens.clear();
        self.session.clear();
        self.nav.force(Location::login());
        info!("Logged out");
        cleared.context("Failed to clear stored tokens")
    }

    /// Manually exchange the refresh token for a new access token
    pub async fn refresh(&self) -> Result<()> {
        self.refresher
            .refresh()
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))
            .context("Token refresh failed")?;
        Ok(())
    }

    /// Cached user, loading it if a session exists but no user is cached
    pub async fn current_user(&self) -> Option<User> {
        if let Some(user) = self.session.user() {
            return Some(user);
        }
        if !self.session.is_authenticated() {
            return None;
        }
        match self.session.fetch_user(&self.api).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Could not load current user");
                None
            }
        }
    }
}
