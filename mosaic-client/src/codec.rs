//! Tile worker protocol
//!
//! Requests and responses cross the worker boundary as JSON payloads:
//!
//! ```text
//! request:  { "columnNum": 3, "url": "http://host:8765/color/abcdef" }
//! response: { "StatusMsg": "OK", "columnNum": 3, "svg": "<svg .../>" }
//! ```
//!
//! The column index travels with every message because workers finish in
//! any order and each response must be attributed to its own cell.

use crate::error::{MosaicError, Result};
use crate::sampler::Rgb;
use mosaic_common::tiles::COLOR_ROUTE_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const STATUS_OK: &str = "OK";
const STATUS_EMPTY: &str = "Server Response value Invalid";
const STATUS_BAD: &str = "Server Response status Invalid";
const STATUS_TIMEOUT: &str = "Server Request timed out";
const STATUS_INVALID_REQUEST: &str = "Invalid input for the Server request";
const STATUS_TRANSPORT: &str = "Server Request failed";

/// Placeholder column used when a worker cannot tell which column it serves
const UNKNOWN_COLUMN: &str = "Unknown";

/// Outcome reported by a tile worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStatus {
    Ok,
    /// 200 with an empty body
    EmptyResponse,
    /// Non-200 HTTP status
    BadStatus,
    Timeout,
    TransportError,
    /// The worker could not decode its request payload
    InvalidRequest,
    /// Any status message this client does not know
    Unrecognized(String),
}

impl TileStatus {
    /// Wire form (`StatusMsg`)
    pub fn as_message(&self) -> &str {
        match self {
            TileStatus::Ok => STATUS_OK,
            TileStatus::EmptyResponse => STATUS_EMPTY,
            TileStatus::BadStatus => STATUS_BAD,
            TileStatus::Timeout => STATUS_TIMEOUT,
            TileStatus::TransportError => STATUS_TRANSPORT,
            TileStatus::InvalidRequest => STATUS_INVALID_REQUEST,
            TileStatus::Unrecognized(message) => message,
        }
    }

    pub fn from_message(message: &str) -> Self {
        match message {
            STATUS_OK => TileStatus::Ok,
            STATUS_EMPTY => TileStatus::EmptyResponse,
            STATUS_BAD => TileStatus::BadStatus,
            STATUS_TIMEOUT => TileStatus::Timeout,
            STATUS_TRANSPORT => TileStatus::TransportError,
            STATUS_INVALID_REQUEST => TileStatus::InvalidRequest,
            other => TileStatus::Unrecognized(other.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, TileStatus::Ok)
    }
}

/// One tile fetch, constructed per tile and discarded after send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRequest {
    #[serde(rename = "columnNum")]
    pub column_index: usize,
    pub url: String,
}

impl TileRequest {
    /// Request for `color` at `column_index`, against `base_url`
    ///
    /// The URL is `<base_url>/color/<hex>`; a trailing slash on the base is
    /// tolerated.
    pub fn new(base_url: &str, column_index: usize, color: Rgb) -> Self {
        Self {
            column_index,
            url: format!(
                "{}{}{}",
                base_url.trim_end_matches('/'),
                COLOR_ROUTE_PREFIX,
                color.to_hex()
            ),
        }
    }
}

/// Decoded worker response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileResponse {
    pub status: TileStatus,
    /// `None` only when the worker could not read its request
    pub column_index: Option<usize>,
    /// Present exactly when `status` is OK
    pub fragment: Option<String>,
}

impl TileResponse {
    pub fn ok(column_index: usize, fragment: impl Into<String>) -> Self {
        Self {
            status: TileStatus::Ok,
            column_index: Some(column_index),
            fragment: Some(fragment.into()),
        }
    }

    pub fn failed(column_index: Option<usize>, status: TileStatus) -> Self {
        Self {
            status,
            column_index,
            fragment: None,
        }
    }
}

/// Serialize a request for a worker
pub fn encode_request(request: &TileRequest) -> String {
    json!({ "columnNum": request.column_index, "url": request.url }).to_string()
}

/// Worker side: read a request payload, `None` if unusable
pub fn decode_request(payload: &str) -> Option<TileRequest> {
    serde_json::from_str(payload).ok()
}

/// Serialize a worker's terminal response
pub fn encode_response(response: &TileResponse) -> String {
    let column = match response.column_index {
        Some(column) => json!(column),
        None => json!(UNKNOWN_COLUMN),
    };

    let mut payload = json!({
        "StatusMsg": response.status.as_message(),
        "columnNum": column,
    });
    if let (TileStatus::Ok, Some(fragment)) = (&response.status, &response.fragment) {
        payload["svg"] = json!(fragment);
    }
    payload.to_string()
}

/// Decode a worker response payload
///
/// Fails with `MalformedResponse` when the payload is not a JSON object,
/// lacks `StatusMsg` or `columnNum`, or is an OK response without an
/// integer column and an `svg` fragment. A non-OK status decodes
/// successfully; the caller decides what it means.
pub fn decode_response(payload: &str) -> Result<TileResponse> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| MosaicError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let object = value
        .as_object()
        .ok_or_else(|| MosaicError::MalformedResponse("payload is not an object".to_string()))?;

    let status = object
        .get("StatusMsg")
        .and_then(Value::as_str)
        .map(TileStatus::from_message)
        .ok_or_else(|| MosaicError::MalformedResponse("missing StatusMsg".to_string()))?;

    let column_index = match object.get("columnNum") {
        None => {
            return Err(MosaicError::MalformedResponse(
                "missing columnNum".to_string(),
            ))
        }
        Some(Value::String(s)) if s == UNKNOWN_COLUMN => None,
        Some(v) => match v.as_u64() {
            Some(column) => Some(column as usize),
            None => {
                return Err(MosaicError::MalformedResponse(format!(
                    "columnNum is not a column index: {}",
                    v
                )))
            }
        },
    };

    if !status.is_ok() {
        return Ok(TileResponse::failed(column_index, status));
    }

    let column_index = column_index.ok_or_else(|| {
        MosaicError::MalformedResponse("OK response without a column index".to_string())
    })?;
    let fragment = object
        .get("svg")
        .and_then(Value::as_str)
        .ok_or_else(|| MosaicError::MalformedResponse("OK response without svg".to_string()))?;

    Ok(TileResponse::ok(column_index, fragment))
}
