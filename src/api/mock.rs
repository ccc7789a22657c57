//! Recording transport for tests.
//!
//! Replies are registered per `(method, path)`. Each route keeps a queue; the
//! last reply of a queue is sticky, so a single `on` call answers every
//! matching request. Unregistered routes answer 404.

use super::{ApiClient, ApiRequest, ApiResponse, Method, Transport};
use crate::auth::TokenStore;
use crate::error::ApiError;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const MOCK_BASE_URL: &str = "http://hospus.test/api";

#[derive(Debug, Clone)]
enum Reply {
    Response(ApiResponse),
    Network(String),
}

#[derive(Default)]
struct State {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    requests: Vec<ApiRequest>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        state
            .routes
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Queues a JSON reply.
    pub fn on(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.on_raw(method, path, status, &body.to_string());
    }

    /// Queues a reply with a raw body.
    pub fn on_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(
            method,
            path,
            Reply::Response(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    /// Queues a transport-level failure.
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Reply::Network(message.to_string()));
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());
        let key = (request.method, request.path.clone());
        let reply = match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Network(message)) => Err(ApiError::Network(message)),
            None => Ok(ApiResponse {
                status: 404,
                body: r#"{"success":false,"message":"Not found"}"#.to_string(),
            }),
        }
    }
}

/// A client pointed at [`MOCK_BASE_URL`] with an in-memory token store.
pub fn client_with(mock: &MockTransport) -> ApiClient {
    ApiClient::new(
        Some(MOCK_BASE_URL.to_string()),
        Arc::new(mock.clone()),
        TokenStore::in_memory().unwrap(),
    )
}
