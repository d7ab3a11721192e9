use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthResponse, Role, UserIdentity};

use super::TokenStore;

/// Where the session stands.
///
/// Starts in `Bootstrapping`. Nothing should be decided about the user (what
/// to show, where to route) until the state has left it.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Bootstrapping,
    Anonymous,
    Authenticated(UserIdentity),
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Bootstrapping)
    }

    pub fn current_user(&self) -> Option<&UserIdentity> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(anyhow::Error),
}

/// Owner of the session.
///
/// The only writer of `SessionState` and the only component that stores or
/// clears the credential. Every mutation takes the in-flight guard first, so
/// a logout issued while a login is pending runs after it rather than
/// interleaving with it.
pub struct SessionManager {
    api: ApiClient,
    tokens: Arc<dyn TokenStore>,
    state: watch::Sender<SessionState>,
    in_flight: Mutex<()>,
}

impl SessionManager {
    /// Credentials are written to the same store the client reads from.
    pub fn new(api: ApiClient) -> Self {
        let tokens = api.tokens();
        let (state, _) = watch::channel(SessionState::Bootstrapping);
        Self {
            api,
            tokens,
            state,
            in_flight: Mutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state.borrow().current_user().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve once bootstrapping is over.
    pub async fn wait_until_ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        // The watch borrow has to end before `rx` is dropped.
        let ready = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        ready
    }

    fn transition(&self, next: SessionState) {
        self.state.send_replace(next);
    }

    /// Remove the stored credential. Failure is logged, never returned.
    fn purge_token(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
    }

    /// Decide the initial state from whatever credential is stored.
    ///
    /// A stored token is checked against the backend. If that check fails for
    /// any reason, including an unreachable backend, the token is discarded
    /// and the session becomes anonymous.
    pub async fn bootstrap(&self) -> SessionState {
        let _guard = self.in_flight.lock().await;
        self.transition(SessionState::Bootstrapping);

        let stored = match self.tokens.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Stored token is unreadable, discarding it");
                self.purge_token();
                None
            }
        };

        let next = match stored {
            None => {
                info!("No stored token, starting anonymous");
                SessionState::Anonymous
            }
            Some(_) => match self.api.current_user().await {
                Ok(user) => {
                    info!(user_id = %user.id, role = %user.role, "Session restored");
                    SessionState::Authenticated(user)
                }
                Err(e) => {
                    if e.is_network_failure() {
                        warn!(error = %e, "Backend unreachable while validating stored token, discarding it");
                    } else {
                        warn!(error = %e, "Stored token rejected, discarding it");
                    }
                    self.purge_token();
                    SessionState::Anonymous
                }
            },
        };

        self.transition(next.clone());
        next
    }

    /// Log in. On failure neither the state nor the stored token change.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, SessionError> {
        let _guard = self.in_flight.lock().await;
        let auth = self.api.login(email, password).await?;
        self.establish(auth)
    }

    /// Create an account and log into it. Same failure contract as `login`.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<UserIdentity, SessionError> {
        let _guard = self.in_flight.lock().await;
        let auth = self.api.register(name, email, password, role).await?;
        self.establish(auth)
    }

    /// Drop the session. Always ends anonymous with no stored token.
    pub async fn logout(&self) {
        let _guard = self.in_flight.lock().await;
        self.purge_token();
        self.transition(SessionState::Anonymous);
        info!("Logged out");
    }

    fn establish(&self, auth: AuthResponse) -> Result<UserIdentity, SessionError> {
        if !auth.token_type.eq_ignore_ascii_case("bearer") {
            warn!(token_type = %auth.token_type, "Unexpected token type, using it as a bearer token");
        }

        self.tokens
            .set(&auth.access_token)
            .context("Failed to save session token")
            .map_err(SessionError::Storage)?;

        let user = auth.user;
        info!(user_id = %user.id, role = %user.role, "Session established");
        self.transition(SessionState::Authenticated(user.clone()));
        Ok(user)
    }
}
