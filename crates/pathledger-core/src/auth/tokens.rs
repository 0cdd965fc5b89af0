use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::StoreError;

/// Storage key for the short-lived access token
pub const ACCESS_KEY: &str = "access";

/// Storage key for the long-lived refresh token
pub const REFRESH_KEY: &str = "refresh";

/// Token file name inside the data directory
pub const TOKEN_FILE: &str = "tokens.json";

/// Access and refresh credentials as issued by `/api/token/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Durable string storage keyed by fixed names, the equivalent of browser
/// local storage.
pub trait TokenBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Handle to the credential pair. Clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn TokenBackend>,
}

impl TokenStore {
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Store backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Both tokens, or `None` if either is missing
    pub fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
        match (self.access()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Ok(Some(CredentialPair { access, refresh })),
            _ => Ok(None),
        }
    }

    pub fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.backend.write(ACCESS_KEY, &pair.access)?;
        self.backend.write(REFRESH_KEY, &pair.refresh)?;
        debug!("Credential pair stored");
        Ok(())
    }

    /// Replace only the access token, leaving the refresh token untouched
    pub fn set_access(&self, access: &str) -> Result<(), StoreError> {
        self.backend.write(ACCESS_KEY, access)
    }

    pub fn access(&self) -> Result<Option<String>, StoreError> {
        Self::non_empty(self.backend.read(ACCESS_KEY)?)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        Self::non_empty(self.backend.read(REFRESH_KEY)?)
    }

    /// Remove both tokens
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove(ACCESS_KEY)?;
        self.backend.remove(REFRESH_KEY)?;
        debug!("Credential pair cleared");
        Ok(())
    }

    /// Whether an access token is present. An unreadable store counts as
    /// logged out.
    pub fn has_access(&self) -> bool {
        match self.access() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                false
            }
        }
    }

    fn non_empty(value: Option<String>) -> Result<Option<String>, StoreError> {
        Ok(value.filter(|v| !v.is_empty()))
    }
}

// ============================================================================
// Memory backend
// ============================================================================

#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl TokenBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Tokens kept as a flat JSON object on disk. Every mutation rewrites the
/// file so the session survives a restart.
pub struct FileBackend {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileBackend {
    /// Open the token file in `dir`, loading any values already there
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(TOKEN_FILE);
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if values.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl TokenBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        if values.remove(key).is_some() {
            self.persist(&values)?;
        }
        Ok(())
    }
}
