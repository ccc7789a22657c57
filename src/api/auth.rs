//! `/auth/*` endpoints.

use super::ApiClient;
use crate::auth::{Credentials, SignupRequest};
use crate::error::ApiError;
use crate::models::User;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Payload of login and signup.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub user: User,
    pub tokens: Tokens,
}

#[derive(Debug, Deserialize)]
struct MePayload {
    user: User,
}

pub fn login(client: &ApiClient, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
    client.post("/auth/login", credentials)
}

pub fn signup(client: &ApiClient, request: &SignupRequest) -> Result<AuthPayload, ApiError> {
    client.post("/auth/signup", request)
}

/// The user behind the current bearer token.
pub fn me(client: &ApiClient) -> Result<User, ApiError> {
    client.get::<MePayload>("/auth/me", &[]).map(|payload| payload.user)
}
