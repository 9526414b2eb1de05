//! crates/webshell_core/src/session.rs
//!
//! The session store: the single writer of token, user and login flag.
//!
//! Every mutation goes through one async mutex and writes the whole session
//! to durable storage under [`SESSION_STORAGE_KEY`] before releasing it, so
//! persisted writes land in the same order as the mutations.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::domain::{NativeTokenRegistration, PersistedSession, Session, User, SESSION_STORAGE_KEY};
use crate::ports::{DurableStorage, PushRegistrar};
use crate::token;

/// Version written into the persisted envelope.
const PERSIST_VERSION: u32 = 0;

pub struct SessionStore {
    state: Mutex<Session>,
    storage: Arc<dyn DurableStorage>,
    registrar: Arc<dyn PushRegistrar>,
}

impl SessionStore {
    /// Builds a store around an already-known session without touching storage.
    pub fn new(
        session: Session,
        storage: Arc<dyn DurableStorage>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Self {
        Self {
            state: Mutex::new(session),
            storage,
            registrar,
        }
    }

    /// Restores the persisted session. An absent or corrupt entry, or a
    /// storage read failure, yields an empty one.
    pub async fn restore(
        storage: Arc<dyn DurableStorage>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Self {
        let session = match storage.get_item(SESSION_STORAGE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(persisted) => normalize(persisted.state),
                Err(e) => {
                    warn!(error = %e, "Persisted session is unreadable; starting empty");
                    Session::default()
                }
            },
            Ok(None) => Session::default(),
            Err(e) => {
                error!(error = %e, "Failed to read the persisted session; starting empty");
                Session::default()
            }
        };

        info!(
            has_token = session.token.is_some(),
            has_user = session.user.is_some(),
            "Session restored"
        );
        Self::new(session, storage, registrar)
    }

    pub async fn snapshot(&self) -> Session {
        self.state.lock().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.state.lock().await.is_logged_in
    }

    pub async fn token(&self) -> Option<String> {
        self.state.lock().await.token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.lock().await.user.clone()
    }

    /// Stores the token and marks the session logged in. No expiry check here;
    /// the next [`initialize_auth`](Self::initialize_auth) revalidates.
    pub async fn set_token(&self, token: String) {
        let mut state = self.state.lock().await;
        state.token = Some(token);
        state.is_logged_in = true;
        self.persist(&state).await;
    }

    /// Stores the user profile; the login flag is left alone.
    pub async fn set_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.user = Some(user);
        self.persist(&state).await;
    }

    pub async fn login(&self, token: String, user: User) {
        let mut state = self.state.lock().await;
        state.token = Some(token);
        state.user = Some(user);
        state.is_logged_in = true;
        self.persist(&state).await;
        info!("Session logged in");
    }

    /// Clears memory and the durable entry. Idempotent; storage failures are only logged.
    pub async fn logout(&self) {
        let mut state = self.state.lock().await;
        self.clear(&mut state).await;
    }

    /// Revalidates the restored session. Called at start and on every foreground
    /// transition. Returns the resulting login flag.
    pub async fn initialize_auth(&self) -> bool {
        let mut state = self.state.lock().await;

        let expired = match (&state.token, &state.user) {
            (Some(token), Some(_)) => Some(token::is_expired(token)),
            _ => None,
        };

        match expired {
            Some(true) => {
                info!("Token expired; logging out");
                self.clear(&mut state).await;
            }
            Some(false) => {
                if !state.is_logged_in {
                    state.is_logged_in = true;
                    self.persist(&state).await;
                }
            }
            None => {
                if state.is_logged_in {
                    state.is_logged_in = false;
                    self.persist(&state).await;
                }
            }
        }

        state.is_logged_in
    }

    /// Registers the device push token for the current user. Never fails:
    /// every problem is logged and reported as `false`.
    pub async fn update_native_token(&self, push_token: &str) -> bool {
        let (bearer, user) = {
            let state = self.state.lock().await;
            (state.token.clone(), state.user.clone())
        };

        let Some(user) = user else {
            error!("No user in session; cannot register native token");
            return false;
        };
        let Some(bearer) = bearer else {
            error!(user_id = %user.id, "No token in session; cannot register native token");
            return false;
        };

        let registration = NativeTokenRegistration {
            user_id: user.id.clone(),
            native_token: push_token.to_string(),
        };

        match self.registrar.register_native_token(&bearer, &registration).await {
            Ok(()) => {
                info!(user_id = %user.id, "Native token registered");
                true
            }
            Err(e) => {
                error!(user_id = %user.id, error = %e, "Native token registration failed");
                false
            }
        }
    }

    async fn clear(&self, state: &mut Session) {
        *state = Session::default();
        if let Err(e) = self.storage.remove_item(SESSION_STORAGE_KEY).await {
            error!(error = %e, "Failed to remove persisted session during logout");
        }
    }

    async fn persist(&self, state: &Session) {
        let envelope = PersistedSession {
            state: state.clone(),
            version: PERSIST_VERSION,
        };
        let raw = match serde_json::to_string(&envelope) {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to serialize session");
                return;
            }
        };
        if let Err(e) = self.storage.set_item(SESSION_STORAGE_KEY, &raw).await {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

/// A persisted flag without a token cannot be honored.
fn normalize(mut session: Session) -> Session {
    if session.token.is_none() {
        session.is_logged_in = false;
    }
    session
}
