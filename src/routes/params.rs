use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as CURSOR_B64};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductListQuery {
    /// `DD-MM-YYYY`, inclusive lower bound on creation day.
    pub created_at_gte: Option<String>,
    /// `DD-MM-YYYY`, inclusive upper bound on creation day.
    pub created_at_lte: Option<String>,
    /// Opaque cursor from a previous page's `next`/`previous`.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorDirection {
    Next,
    Previous,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed pagination cursor")]
pub struct CursorError;

/// Keyset anchor for cursor pagination: the `(created_at, id)` of a row at
/// a page edge plus the direction to move in. Encoded as URL-safe base64 so
/// the token is opaque to clients.
#[derive(Debug, Clone)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
    pub direction: CursorDirection,
}

impl PageCursor {
    pub fn new(
        created_at: DateTime<FixedOffset>,
        id: Uuid,
        direction: CursorDirection,
    ) -> Self {
        Self {
            created_at: created_at.with_timezone(&Utc),
            id,
            direction,
        }
    }

    pub fn encode(&self) -> String {
        let dir = match self.direction {
            CursorDirection::Next => "n",
            CursorDirection::Previous => "p",
        };
        let payload = format!("{}:{}:{}", self.created_at.timestamp_micros(), self.id, dir);
        CURSOR_B64.encode(payload)
    }

    pub fn decode(raw: &str) -> Result<Self, CursorError> {
        let bytes = CURSOR_B64.decode(raw).map_err(|_| CursorError)?;
        let text = String::from_utf8(bytes).map_err(|_| CursorError)?;

        let mut parts = text.split(':');
        let micros: i64 = parts
            .next()
            .ok_or(CursorError)?
            .parse()
            .map_err(|_| CursorError)?;
        let id = Uuid::parse_str(parts.next().ok_or(CursorError)?).map_err(|_| CursorError)?;
        let direction = match parts.next() {
            Some("n") => CursorDirection::Next,
            Some("p") => CursorDirection::Previous,
            _ => return Err(CursorError),
        };
        if parts.next().is_some() {
            return Err(CursorError);
        }

        let created_at = DateTime::from_timestamp_micros(micros).ok_or(CursorError)?;
        Ok(Self {
            created_at,
            id,
            direction,
        })
    }
}
