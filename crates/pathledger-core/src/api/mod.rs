//! REST API client module for the PathLedger backend.
//!
//! This module provides the `ApiClient` for talking to the dashboard API.
//! Every request carries the current access token as a bearer credential;
//! a 401 triggers one refresh of the token and one retry of the request.

pub mod client;
pub mod error;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use request::{join_url, ApiRequest, Attempt};
