//! Core library for the PathLedger supply-chain dashboard client.
//!
//! The interesting part of this crate is the session lifecycle:
//! - `auth`: durable token storage, the refresh flow, and the session context
//! - `api`: the HTTP client that attaches bearer tokens and recovers from a
//!   single 401 by refreshing and retrying once
//! - `routes` / `router`: the static route table and the per-navigation guard
//!
//! `resources` holds the thin per-resource stores (products, orders, trackers,
//! notifications) that sit on top of the client, and `app` wires everything
//! together behind one facade.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod resources;
pub mod router;
pub mod routes;

#[cfg(test)]
mod test_support;

pub use api::{ApiClient, ApiError, ApiRequest, Attempt};
pub use app::App;
pub use auth::{AuthError, CredentialPair, Refresher, SessionContext, StoreError, TokenStore};
pub use config::{Config, TokenBackendKind};
pub use router::{GuardDecision, GuardState, NavigationState, Router, RouterError, SessionGuard};
pub use routes::{AccessPolicy, Location, Route, RouteMatch, RouteName};
