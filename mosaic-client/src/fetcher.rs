//! Tile fetching against the external rendering service
//!
//! One worker task per tile per row. A worker decodes its request payload,
//! performs exactly one fetch, sends exactly one response payload back to
//! the orchestrator and exits. Workers never retry.

use crate::codec::{self, TileRequest, TileResponse, TileStatus};
use crate::error::{MosaicError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("svg-mosaic/", env!("CARGO_PKG_VERSION"));

/// Performs one tile fetch
///
/// Implementations report every outcome through the response status; they
/// never fail out of band.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    async fn fetch(&self, request: &TileRequest) -> TileResponse;
}

/// HTTP fetcher for the `/color/<hex>` endpoint
pub struct HttpTileFetcher {
    http_client: reqwest::Client,
}

impl HttpTileFetcher {
    /// Create a fetcher whose every request times out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                MosaicError::Common(mosaic_common::Error::Internal(format!(
                    "Failed to build HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self { http_client })
    }

    fn classify(column: usize, error: &reqwest::Error) -> TileResponse {
        if error.is_timeout() {
            warn!(column, url = ?error.url().map(|u| u.as_str()), "Tile request timed out");
            TileResponse::failed(Some(column), TileStatus::Timeout)
        } else {
            warn!(column, error = %error, "Tile request failed");
            TileResponse::failed(Some(column), TileStatus::TransportError)
        }
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, request: &TileRequest) -> TileResponse {
        let column = request.column_index;
        debug!(column, url = %request.url, "Fetching tile");

        let response = match self.http_client.get(&request.url).send().await {
            Ok(response) => response,
            Err(e) => return Self::classify(column, &e),
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                column,
                status = status.as_u16(),
                url = %request.url,
                "Tile service returned bad status"
            );
            return TileResponse::failed(Some(column), TileStatus::BadStatus);
        }

        match response.text().await {
            Ok(body) if body.is_empty() => {
                warn!(column, url = %request.url, "Tile service returned empty body");
                TileResponse::failed(Some(column), TileStatus::EmptyResponse)
            }
            Ok(body) => TileResponse::ok(column, body),
            Err(e) => Self::classify(column, &e),
        }
    }
}

/// Spawn a detached worker for one tile
///
/// The worker's single response payload goes to `tx`. If the receiver is
/// gone (the run already failed) the payload is dropped.
pub fn spawn_tile_worker(
    fetcher: Arc<dyn TileFetcher>,
    request_payload: String,
    tx: mpsc::UnboundedSender<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let response = match codec::decode_request(&request_payload) {
            Some(request) => fetcher.fetch(&request).await,
            None => {
                warn!(payload = %request_payload, "Tile worker received undecodable request");
                TileResponse::failed(None, TileStatus::InvalidRequest)
            }
        };

        if tx.send(codec::encode_response(&response)).is_err() {
            debug!(
                column = ?response.column_index,
                "Run no longer listening, discarding tile response"
            );
        }
    })
}
