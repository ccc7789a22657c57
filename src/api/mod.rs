//! REST client for the Hospus backend.
//!
//! `ApiClient` owns the base URL, the session tokens and an injected
//! [`Transport`]. It attaches the bearer token to every request, unwraps the
//! response envelope and turns a 401 into a cleared session plus a one-shot
//! "session expired" flag that the app drains to route back to login.

use crate::auth::TokenStore;
use crate::error::ApiError;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub mod appointments;
pub mod auth;
pub mod enquiries;
pub mod envelope;
pub mod patients;
pub mod services;
pub mod users;

#[cfg(test)]
pub mod mock;

use envelope::{Envelope, ErrorBody, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// A fully resolved request, handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/users/42`.
    pub path: String,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests over the wire. Swapped for a recording mock in tests.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// Blocking `reqwest` transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self, ApiError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout_secs)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(ApiResponse { status, body })
    }
}

struct ClientInner {
    base_url: Option<String>,
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    session_expired: AtomicBool,
}

/// Cheap-to-clone handle; every screen gets its own copy.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn new(base_url: Option<String>, transport: Arc<dyn Transport>, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
                transport,
                tokens,
                session_expired: AtomicBool::new(false),
            }),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    pub fn base_url(&self) -> Option<&str> {
        self.inner.base_url.as_deref()
    }

    /// Returns `true` once after a 401 was seen, then resets.
    pub fn take_session_expired(&self) -> bool {
        self.inner.session_expired.swap(false, Ordering::AcqRel)
    }

    /// Sends a request and checks the status. The body is left undecoded.
    pub fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse, ApiError> {
        let base = self.inner.base_url.as_deref().ok_or(ApiError::MissingBaseUrl)?;
        let request = ApiRequest {
            method,
            path: path.to_string(),
            url: format!("{base}{path}"),
            query: query
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
            bearer: self.inner.tokens.bearer(),
            body,
        };

        let response = self.inner.transport.execute(&request).map_err(|err| {
            tracing::warn!(%method, path, error = %err, "request failed");
            err
        })?;
        tracing::debug!(%method, path, status = response.status, "request completed");

        if response.status == 401 {
            self.expire_session(request.bearer.as_deref());
            return Err(ApiError::Unauthorized);
        }
        if !response.is_success() {
            return Err(ApiError::Status {
                status: response.status,
                message: failure_message(response.status, &response.body),
            });
        }
        Ok(response)
    }

    /// Clears the session the rejected request was sent with. A 401 for a
    /// token that has since been replaced leaves the new session alone.
    fn expire_session(&self, sent: Option<&str>) {
        match self.inner.tokens.clear_if_current(sent) {
            Ok(true) => {
                tracing::info!("server rejected the session token, clearing it");
                self.inner.session_expired.store(true, Ordering::Release);
            }
            Ok(false) => tracing::debug!("401 for a replaced token, session kept"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to clear stored token after 401");
                self.inner.session_expired.store(true, Ordering::Release);
            }
        }
    }

    /// Sends a request and unwraps the envelope's `data`.
    pub fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, path, query, body)?;
        decode(path, &response.body)
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.request(Method::Get, path, query, None)
    }

    pub fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::Post, path, &[], Some(to_json(path, body)?))
    }

    pub fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        self.request(Method::Put, path, &[], Some(to_json(path, body)?))
    }

    /// Deletes `path`. An empty body (204) or any envelope is accepted.
    pub fn delete(&self, path: &str) -> Result<(), ApiError> {
        let response = self.send(Method::Delete, path, &[], None)?;
        if response.body.trim().is_empty() {
            return Ok(());
        }
        decode::<IgnoredAny>(path, &response.body).map(|_| ())
    }

    /// `GET /{resource}`
    pub fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<Page<T>, ApiError> {
        self.get(&format!("/{resource}"), query)
    }

    /// `POST /{resource}`
    pub fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post(&format!("/{resource}"), body)
    }

    /// `PUT /{resource}/{id}`
    pub fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.put(&format!("/{resource}/{id}"), body)
    }

    /// `DELETE /{resource}/{id}`
    pub fn remove(&self, resource: &str, id: &str) -> Result<(), ApiError> {
        self.delete(&format!("/{resource}/{id}"))
    }
}

fn to_json<B: Serialize>(path: &str, body: &B) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(body).map_err(|source| ApiError::Encode {
        path: path.to_string(),
        source,
    })
}

/// The server's message, or the status text when the body has none.
fn failure_message(status: u16, body: &str) -> String {
    let message = ErrorBody::message_from(body);
    if !message.is_empty() {
        return message;
    }
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown error")
        .to_string()
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|source| {
        tracing::warn!(path, error = %source, "response did not match the envelope");
        ApiError::Decode {
            path: path.to_string(),
            source,
        }
    })?;
    if !envelope.success {
        return Err(ApiError::Status {
            status: 200,
            message: envelope
                .message
                .unwrap_or_else(|| "The server reported a failure.".to_string()),
        });
    }
    Ok(envelope.data)
}
