//! Session context: tokens, the cached current user, and the flows that
//! change them (login, signup, hydrate, logout).
//!
//! A `Session` is created once in `main` and owned by the `App`; nothing here
//! is global.

use crate::api::{self, ApiClient};
use crate::db::{KvStore, AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{ApiError, StoreError};
use crate::models::{Role, User};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;

#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub id_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("id_number", &self.id_number)
            .finish_non_exhaustive()
    }
}

/// Persisted bearer token with an in-memory copy for the request path.
pub struct TokenStore {
    kv: KvStore,
    access: Mutex<Option<String>>,
}

impl TokenStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_kv(KvStore::open(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_kv(KvStore::open_in_memory()?)
    }

    /// Wraps `kv`, restoring a token saved by a previous run.
    pub fn from_kv(kv: KvStore) -> Result<Self, StoreError> {
        let access = kv.get(AUTH_TOKEN_KEY)?;
        Ok(Self {
            kv,
            access: Mutex::new(access),
        })
    }

    /// The current access token, if any.
    pub fn bearer(&self) -> Option<String> {
        self.access.lock().ok().and_then(|token| token.clone())
    }

    pub fn has_token(&self) -> bool {
        self.bearer().is_some()
    }

    pub fn save(&self, access: &str, refresh: Option<&str>) -> Result<(), StoreError> {
        self.kv.set(AUTH_TOKEN_KEY, access)?;
        match refresh {
            Some(refresh) => self.kv.set(REFRESH_TOKEN_KEY, refresh)?,
            None => self.kv.remove(REFRESH_TOKEN_KEY)?,
        }
        *self.access.lock().map_err(|_| StoreError::Poisoned)? = Some(access.to_string());
        Ok(())
    }

    /// Forgets both tokens, in memory first so no later request carries them.
    pub fn clear(&self) -> Result<(), StoreError> {
        *self.access.lock().map_err(|_| StoreError::Poisoned)? = None;
        self.kv.remove(AUTH_TOKEN_KEY)?;
        self.kv.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    /// Forgets both tokens only while `sent` is still the current access
    /// token. `false` when a newer token has replaced it.
    pub fn clear_if_current(&self, sent: Option<&str>) -> Result<bool, StoreError> {
        let mut access = self.access.lock().map_err(|_| StoreError::Poisoned)?;
        if access.as_deref() != sent {
            return Ok(false);
        }
        *access = None;
        self.kv.remove(AUTH_TOKEN_KEY)?;
        self.kv.remove(REFRESH_TOKEN_KEY)?;
        Ok(true)
    }

    #[cfg(test)]
    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.kv.get(REFRESH_TOKEN_KEY)
    }
}

/// The signed-in user and the client that acts on their behalf.
pub struct Session {
    client: ApiClient,
    user: Option<User>,
    hydrated: bool,
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: None,
            hydrated: false,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    /// `true` until the first `hydrate` has finished.
    pub fn is_loading(&self) -> bool {
        !self.hydrated
    }

    /// Restores the user behind a stored token via `GET /auth/me`.
    ///
    /// Without a stored token no request is made. A failed lookup leaves the
    /// session signed out; a 401 has already cleared the token.
    pub fn hydrate(&mut self) -> Result<Option<&User>, ApiError> {
        self.user = None;
        let result = if self.client.tokens().has_token() {
            api::auth::me(&self.client).map(Some)
        } else {
            Ok(None)
        };
        self.hydrated = true;
        // A 401 during startup is not an expiry the user needs to be routed for.
        self.client.take_session_expired();

        match result {
            Ok(user) => {
                if let Some(user) = &user {
                    tracing::info!(user_id = %user.id, role = %user.role, "session restored");
                }
                self.user = user;
                Ok(self.user.as_ref())
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not restore session");
                Err(err)
            }
        }
    }

    pub fn login(&mut self, credentials: &Credentials) -> Result<&User, ApiError> {
        let result = api::auth::login(&self.client, credentials);
        self.establish(result)
    }

    pub fn signup(&mut self, request: &SignupRequest) -> Result<&User, ApiError> {
        let result = api::auth::signup(&self.client, request);
        self.establish(result)
    }

    fn establish(
        &mut self,
        result: Result<api::auth::AuthPayload, ApiError>,
    ) -> Result<&User, ApiError> {
        // 401 here means bad credentials, not an expired session.
        self.client.take_session_expired();
        let payload = result.map_err(|err| match err {
            ApiError::Unauthorized => ApiError::Status {
                status: 401,
                message: "Invalid email or password.".to_string(),
            },
            other => other,
        })?;

        self.client
            .tokens()
            .save(&payload.tokens.access_token, payload.tokens.refresh_token.as_deref())?;
        tracing::info!(user_id = %payload.user.id, role = %payload.user.role, "signed in");
        self.hydrated = true;
        Ok(self.user.insert(payload.user))
    }

    /// Drops tokens and the cached user.
    pub fn logout(&mut self) -> Result<(), StoreError> {
        if let Some(user) = &self.user {
            tracing::info!(user_id = %user.id, "signed out");
        }
        self.user = None;
        self.client.tokens().clear()
    }

    /// Called after the client reported a 401; the token is already gone.
    pub fn expire(&mut self) {
        tracing::info!("session expired");
        self.user = None;
    }
}
