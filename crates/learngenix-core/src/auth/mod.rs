//! Authentication module for managing sessions and stored credentials.
//!
//! This module provides:
//! - `TokenStore`: persistence of the bearer token across restarts, backed by
//!   the OS keychain, a file in the cache directory, or memory
//! - `SessionManager`: bootstrap, login, register and logout; the single
//!   writer of `SessionState`
//!
//! Tokens have no client-side expiry. A stored token is trusted only after
//! the backend has accepted it during bootstrap.

pub mod session;
pub mod token_store;

use std::path::Path;
use std::sync::Arc;

pub use session::{SessionError, SessionManager, SessionState};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};

use crate::config::{ApiConfig, TokenBackend};

/// Open the token store for `backend`, keyed to the configured API origin.
pub fn open_token_store(
    backend: TokenBackend,
    config: &ApiConfig,
    cache_dir: &Path,
) -> Arc<dyn TokenStore> {
    match backend {
        TokenBackend::Keyring => Arc::new(KeyringTokenStore::new(config.storage_key())),
        TokenBackend::File => Arc::new(FileTokenStore::new(cache_dir, config.base_url.clone())),
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
    }
}
