//! LearnGenix client core.
//!
//! Everything a LearnGenix front-end needs below its UI: the typed REST
//! client, persistence of the session token, and the session state machine
//! that decides whether a user is logged in.
//!
//! ```no_run
//! use std::sync::Arc;
//! use learngenix_core::{ApiClient, ApiConfig, MemoryTokenStore, SessionManager};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let api = ApiClient::new(ApiConfig::from_env()?, Arc::new(MemoryTokenStore::new()))?;
//! let session = SessionManager::new(api);
//! session.bootstrap().await;
//! if session.current_user().is_none() {
//!     session.login("ana@x.com", "secret").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    open_token_store, FileTokenStore, KeyringTokenStore, MemoryTokenStore, SessionError,
    SessionManager, SessionState, TokenStore,
};
pub use config::{ApiConfig, Config, TokenBackend};
