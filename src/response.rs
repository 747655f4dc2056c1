use serde::Serialize;
use utoipa::ToSchema;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAILED: &str = "failed";

/// Flat `{status, message}` envelope used by mutation endpoints and errors.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            message: message.into(),
        }
    }
}

/// Cursor-paginated list envelope. `next`/`previous` are opaque cursor
/// tokens, absent at either end of the result set.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}
