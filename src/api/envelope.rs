//! Wire shapes shared by every endpoint.
//!
//! Each response body is `{ "success": bool, "data": <payload>, "message"?: string }`.
//! Lists carry `{ "items": [...], "meta"?: {...} }` as their payload. Anything
//! else is a decode error; call sites never guess at alternative shapes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of an error response. Every field is optional because proxies and
/// crashed handlers do not always answer with the envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Best human-readable message for a failed response body.
    pub fn message_from(body: &str) -> String {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => parsed
                .message
                .or(parsed.error)
                .unwrap_or_else(|| truncate(body)),
            Err(_) => truncate(body),
        }
    }
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() > LIMIT {
        let cut: String = trimmed.chars().take(LIMIT).collect();
        format!("{cut}…")
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub meta: Option<PageMeta>,
}

impl<T> Page<T> {
    /// Total number of records on the server; falls back to this page's size.
    pub fn total(&self) -> u64 {
        self.meta
            .as_ref()
            .and_then(|meta| meta.total)
            .unwrap_or(self.items.len() as u64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}
