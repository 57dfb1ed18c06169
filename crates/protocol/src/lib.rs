//! Remote link wire protocol.
//!
//! Protocol version 1. Every frame is one line of JSON (newline-delimited)
//! over a stream socket.
//!
//! Frame types:
//! - `RequestFrame`: caller to remote process, carries the message to act on
//! - `ResponseFrame`: remote process to caller, carries the result or an error

use {
    serde::{Deserialize, Serialize},
    serde_json::{Map, Value},
};

// ── Constants ────────────────────────────────────────────────────────────────

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PAYLOAD_BYTES: usize = 524_288; // 512 KB
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000; // 30s
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 10_101;

// ── Error codes ──────────────────────────────────────────────────────────────

pub mod error_codes {
    pub const NO_MATCH: &str = "NO_MATCH";
    pub const HANDLER_ERROR: &str = "HANDLER_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const INIT_ERROR: &str = "INIT_ERROR";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
}

// ── Error shape ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorShape {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// Caller → remote request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: String,
    pub msg: Map<String, Value>,
}

/// Remote → caller response, correlated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFrame {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

impl ResponseFrame {
    pub fn ok(id: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: ErrorShape) -> Self {
        Self {
            id: id.into(),
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Collapse the frame into a result. An `ok` frame without a payload
    /// yields an empty object; a failed frame without an error body yields a
    /// generic handler error.
    pub fn into_result(self) -> Result<Map<String, Value>, ErrorShape> {
        if self.ok {
            return Ok(self.payload.unwrap_or_default());
        }
        Err(self.error.unwrap_or_else(|| {
            ErrorShape::new(error_codes::HANDLER_ERROR, "remote action failed")
        }))
    }
}

/// Discriminated union of all frame types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Frame {
    #[serde(rename = "req")]
    Request(RequestFrame),
    #[serde(rename = "res")]
    Response(ResponseFrame),
}

impl Frame {
    /// The correlation id carried by either frame kind.
    pub fn id(&self) -> &str {
        match self {
            Self::Request(req) => &req.id,
            Self::Response(res) => &res.id,
        }
    }

    /// Serialize as a single newline-terminated line.
    pub fn to_line(&self) -> Result<String, FrameError> {
        let mut line = serde_json::to_string(self)?;
        if line.len() > MAX_PAYLOAD_BYTES {
            return Err(FrameError::TooLarge { size: line.len() });
        }
        line.push('\n');
        Ok(line)
    }
}

impl From<RequestFrame> for Frame {
    fn from(req: RequestFrame) -> Self {
        Self::Request(req)
    }
}

impl From<ResponseFrame> for Frame {
    fn from(res: ResponseFrame) -> Self {
        Self::Response(res)
    }
}

// ── Decoding ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame of {size} bytes exceeds the {MAX_PAYLOAD_BYTES} byte limit")]
    TooLarge { size: usize },
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one line received from the socket. Surrounding whitespace
/// (including the trailing newline) is ignored.
pub fn decode_frame(line: &str) -> Result<Frame, FrameError> {
    let trimmed = line.trim();
    if trimmed.len() > MAX_PAYLOAD_BYTES {
        return Err(FrameError::TooLarge {
            size: trimmed.len(),
        });
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// The correlation id of a line that is JSON but not a valid frame, so the
/// sender can still be answered.
pub fn recover_id(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line.trim()).ok()?;
    value.get("id")?.as_str().map(str::to_owned)
}
