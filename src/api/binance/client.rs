use std::time::Duration;

use reqwest::Client as HttpClient;
use reqwest::header::RETRY_AFTER;
use tracing::{debug, warn};

use super::models::{ApiError, ErrorResponse, Ticker24hResponse};
use crate::models::TickerSnapshot;

/// Upper bound for one ticker request, connect included
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Binance spot REST client, limited to the public market-data endpoints
pub struct BinanceClient {
    http_client: HttpClient,
    base_url: String,
}

impl BinanceClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.binance.com";

    /// Create a new client against the public Binance endpoint
    pub fn new() -> Self {
        Self::with_base_url(Self::DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with custom base URL (mirrors, testnet)
    pub fn with_base_url(base_url: String) -> Self {
        let http_client = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to a client without timeout: {}", e);
                HttpClient::new()
            });
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the 24h ticker URL for a symbol
    pub fn ticker_url(&self, symbol: &str) -> String {
        format!("{}/api/v3/ticker/24hr?symbol={}", self.base_url, symbol)
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body_text = response.text().await.unwrap_or_default();

        classify_error(status.as_u16(), retry_after, &body_text)
    }

    /// GET /api/v3/ticker/24hr
    ///
    /// Retrieves the rolling 24h statistics for one symbol and parses them into a
    /// `TickerSnapshot`.
    pub async fn ticker_24h(&self, symbol: &str) -> Result<TickerSnapshot, ApiError> {
        let url = self.ticker_url(symbol);
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let raw = response
            .json::<Ticker24hResponse>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))?;

        TickerSnapshot::try_from(raw)
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a failed status and its body onto an `ApiError`
pub(crate) fn classify_error(status: u16, retry_after: Option<u64>, body_text: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorResponse>(body_text)
        .ok()
        .and_then(|e| e.msg)
        .unwrap_or_else(|| body_text.to_string());

    match status {
        400 => ApiError::BadRequest(message),
        418 | 429 => {
            let retry_after = retry_after.unwrap_or(1);
            warn!("Rate limited by Binance, retry after {} s", retry_after);
            ApiError::RateLimited { retry_after }
        }
        500..=599 => {
            warn!("Server error {}: {}", status, message);
            ApiError::ServerError(status, message)
        }
        _ => ApiError::HttpError(status, message),
    }
}
