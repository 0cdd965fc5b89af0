//! Navigation and the per-navigation session guard.
//!
//! `SessionGuard::decide` is the pure decision; `Router::navigate` wraps it
//! with the side effects: the page title, the best-effort user fetch, and
//! committing the final location.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::SessionContext;
use crate::routes::{self, AccessPolicy, Location, RouteMatch, RouteName};

/// Upper bound on guard and route redirects followed for one navigation
const MAX_REDIRECTS: usize = 5;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Too many redirects navigating to {0}")]
    RedirectLoop(String),
}

/// Current location and page title, shared by the router and the HTTP
/// client (which needs to know whether the current page is QR-gated and
/// may force a return to the login page).
pub struct NavigationState {
    location: RwLock<Location>,
    title: RwLock<String>,
    /// Bumped on every committed or forced move. A navigation that sees it
    /// change while the guard runs has been superseded.
    generation: AtomicU64,
}

impl NavigationState {
    pub fn new() -> Self {
        Self {
            location: RwLock::new(Location::new("/")),
            title: RwLock::new(String::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Location {
        self.location
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Access policy of the route the user is currently on
    pub fn current_policy(&self) -> AccessPolicy {
        routes::resolve(self.current().path()).route.policy
    }

    pub fn title(&self) -> String {
        self.title
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set_title(&self, title: &str) {
        *self
            .title
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = title.to_string();
    }

    fn commit(&self, location: Location) {
        *self
            .location
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = location;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Move to `location` without consulting the guard
    pub fn force(&self, location: Location) {
        let matched = routes::resolve(location.path());
        self.set_title(matched.route.title);
        info!(location = %location, "Navigation forced");
        self.commit(location);
    }
}

impl Default for NavigationState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    /// Access token stored, user record not loaded
    Authenticated,
    /// Access token stored and user record loaded
    AuthenticatedWithSession,
}

impl GuardState {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, GuardState::Unauthenticated)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Location),
}

pub struct SessionGuard;

impl SessionGuard {
    /// Decide whether `target` may be entered in `state`
    pub fn decide(state: GuardState, target: &Location, matched: &RouteMatch) -> GuardDecision {
        if state.is_authenticated() {
            if matched.route.name == RouteName::Login {
                return GuardDecision::Redirect(Location::home());
            }
            return GuardDecision::Proceed;
        }

        match matched.route.policy {
            AccessPolicy::Public => GuardDecision::Proceed,
            AccessPolicy::RequiresSessionOrToken if target.one_time_token().is_some() => {
                GuardDecision::Proceed
            }
            _ => GuardDecision::Redirect(Location::login_redirect(target)),
        }
    }
}

pub struct Router {
    nav: Arc<NavigationState>,
    session: Arc<SessionContext>,
    api: ApiClient,
}

impl Router {
    pub fn new(nav: Arc<NavigationState>, session: Arc<SessionContext>, api: ApiClient) -> Self {
        Self { nav, session, api }
    }

    pub fn current(&self) -> Location {
        self.nav.current()
    }

    pub fn title(&self) -> String {
        self.nav.title()
    }

    /// Navigate to `target`, following guard and route redirects. Returns
    /// the location that was finally entered.
    pub async fn navigate(&self, target: Location) -> Result<Location, RouterError> {
        let requested = target.full_path();
        let mut target = target;

        for _ in 0..MAX_REDIRECTS {
            let mut matched = routes::resolve(target.path());
            if let Some(redirect) = matched.route.redirect {
                debug!(from = %target, to = redirect, "Route redirect");
                target = Location::new(redirect);
                matched = routes::resolve(target.path());
            }

            self.nav.set_title(matched.route.title);

            let generation = self.nav.generation();
            let state = self.guard_state().await;
            if self.nav.generation() != generation {
                let current = self.nav.current();
                info!(requested = %target, location = %current, "Navigation superseded");
                return Ok(current);
            }

            match SessionGuard::decide(state, &target, &matched) {
                GuardDecision::Proceed => {
                    debug!(location = %target, route = %matched.route.name, ?state, "Navigation allowed");
                    self.nav.commit(target.clone());
                    return Ok(target);
                }
                GuardDecision::Redirect(next) => {
                    info!(from = %target, to = %next, "Navigation redirected");
                    target = next;
                }
            }
        }

        Err(RouterError::RedirectLoop(requested))
    }

    /// Work out the session state, loading the user record first if a token
    /// exists but no user is cached. A failed load never blocks navigation.
    async fn guard_state(&self) -> GuardState {
        if self.session.is_authenticated() && !self.session.has_user() {
            if let Err(e) = self.session.fetch_user(&self.api).await {
                warn!(error = %e, "Could not load current user, continuing");
            }
        }

        if !self.session.is_authenticated() {
            GuardState::Unauthenticated
        } else if self.session.has_user() {
            GuardState::AuthenticatedWithSession
        } else {
            GuardState::Authenticated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(state: GuardState, path: &str) -> GuardDecision {
        let target = Location::parse(path);
        let matched = routes::resolve(target.path());
        SessionGuard::decide(state, &target, &matched)
    }

    #[test]
    fn test_public_routes_open_without_session() {
        assert_eq!(decide(GuardState::Unauthenticated, "/"), GuardDecision::Proceed);
        assert_eq!(decide(GuardState::Unauthenticated, "/login"), GuardDecision::Proceed);
    }

    #[test]
    fn test_session_routes_redirect_to_login_with_target() {
        let location = match decide(GuardState::Unauthenticated, "/dashboard/products") {
            GuardDecision::Redirect(location) => location,
            other => panic!("expected redirect, got {:?}", other),
        };
        assert_eq!(location.path(), "/login");
        assert_eq!(location.query_value("redirect"), Some("/dashboard/products"));
    }

    #[test]
    fn test_qr_routes_need_token_without_session() {
        assert_eq!(
            decide(GuardState::Unauthenticated, "/dashboard/tracker/3?token=qr"),
            GuardDecision::Proceed
        );
        assert!(matches!(
            decide(GuardState::Unauthenticated, "/dashboard/tracker/3"),
            GuardDecision::Redirect(_)
        ));
        assert!(matches!(
            decide(GuardState::Unauthenticated, "/dashboard/tracker/3?token="),
            GuardDecision::Redirect(_)
        ));
    }

    #[test]
    fn test_token_does_not_open_session_only_routes() {
        assert!(matches!(
            decide(GuardState::Unauthenticated, "/dashboard/products?token=qr"),
            GuardDecision::Redirect(_)
        ));
    }

    #[test]
    fn test_authenticated_user_skips_login_page() {
        for state in [GuardState::Authenticated, GuardState::AuthenticatedWithSession] {
            assert_eq!(decide(state, "/login"), GuardDecision::Redirect(Location::home()));
            assert_eq!(decide(state, "/dashboard/settings"), GuardDecision::Proceed);
            assert_eq!(decide(state, "/does/not/exist"), GuardDecision::Proceed);
        }
    }

    #[test]
    fn test_force_sets_title() {
        let nav = NavigationState::new();
        nav.force(Location::parse("/dashboard/product_types/4?token=x"));
        assert_eq!(nav.title(), "Type");
        assert_eq!(nav.current_policy(), AccessPolicy::RequiresSessionOrToken);
    }

    #[test]
    fn test_force_and_commit_advance_generation() {
        let nav = NavigationState::new();
        let start = nav.generation();
        nav.commit(Location::home());
        nav.force(Location::login());
        assert_eq!(nav.generation(), start + 2);
    }
}
