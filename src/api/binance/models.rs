use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw body of GET /api/v3/ticker/24hr for a single symbol.
///
/// Binance sends every decimal as a JSON string; parsing happens when the
/// response is turned into a `TickerSnapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hResponse {
    pub symbol: String,
    pub last_price: String,
    pub price_change_percent: String,
    pub volume: String,
    pub high_price: String,
    pub low_price: String,
    pub bid_price: String,
    pub ask_price: String,
    pub count: u64,
}

/// Error body returned by Binance on 4xx responses; only the message is kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub msg: Option<String>,
}

/// Comprehensive error type for ticker API operations
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// 400 Bad Request (unknown symbol and friends)
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// 418 / 429, the IP is being throttled or banned
    #[error("Rate Limited. Retry after {retry_after} s")]
    RateLimited { retry_after: u64 },
    /// 5xx Server Error
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    /// Other HTTP errors
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    /// Network/request error
    #[error("Request Error: {0}")]
    RequestError(String),
    /// Deserialization error
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
}
