//! Authentication module for the session lifecycle.
//!
//! This module provides:
//! - `TokenStore`: the single source of truth for the access/refresh pair,
//!   persisted through a pluggable `TokenBackend` (JSON file or OS keychain)
//! - `Refresher`: exchanges the refresh token for a new access token
//! - `SessionContext`: the lazily loaded current-user record
//!
//! Nothing in here navigates; forcing the user back to the login page is the
//! HTTP client's and the app facade's job.

pub mod credentials;
pub mod error;
pub mod refresh;
pub mod session;
pub mod tokens;

pub use credentials::KeyringBackend;
pub use error::{AuthError, StoreError};
pub use refresh::Refresher;
pub use session::SessionContext;
pub use tokens::{CredentialPair, FileBackend, MemoryBackend, TokenBackend, TokenStore};
