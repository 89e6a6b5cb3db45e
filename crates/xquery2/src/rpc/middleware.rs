//! HTTP retry/backoff middleware.

use chrono::Utc;

use crate::error::RpcError;

/// Parse a `Retry-After` header value (an HTTP-date or a delta-seconds integer).
/// Negative values and unparsable input both collapse to `0`.
pub fn parse_retry_after(value: &str) -> u64 {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return seconds.max(0) as u64;
    }

    // HTTP-dates use RFC 7231's IMF-fixdate, which `chrono`'s RFC 2822 parser accepts
    // including the obsolete `GMT`/military zone names IMF-fixdate relies on.
    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let delta = Utc::now().signed_duration_since(date);
        return delta.num_seconds().max(0) as u64;
    }

    0
}

/// Exponential backoff generator: `factor * base^n`, capped at `max_value` once
/// exceeded.
pub struct Backoff {
    base: u64,
    factor: u64,
    max_value: Option<u64>,
    n: u32,
}

impl Backoff {
    pub fn new(base: u64, factor: u64, max_value: Option<u64>) -> Self {
        Self { base, factor, max_value, n: 0 }
    }
}

impl Iterator for Backoff {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let value = self.factor * self.base.pow(self.n);
        match self.max_value {
            Some(max) if value >= max => Some(max),
            _ => {
                self.n += 1;
                Some(value)
            }
        }
    }
}

/// JSON-RPC method names safe to retry: read-only calls only. Mutating methods never
/// retry.
pub fn is_retriable_method(method: &str) -> bool {
    matches!(
        method,
        "eth_call"
            | "eth_getLogs"
            | "eth_getBlockByNumber"
            | "eth_getBlockByHash"
            | "eth_getTransactionByHash"
            | "eth_blockNumber"
            | "eth_chainId"
    )
}

/// Decide how long to sleep before the next retry attempt, combining the backoff
/// sequence with any `Retry-After` hint from a 429 response (the larger of the two wins,
/// matching `http_backoff_retry_request_middleware`'s `delay = max(next(delay_gen), delay)`).
pub fn next_delay(backoff: &mut Backoff, retry_after: Option<u64>, max_delay: u64) -> u64 {
    let from_header = retry_after.unwrap_or(0).min(max_delay);
    let from_backoff = backoff.next().unwrap_or(max_delay);
    from_backoff.max(from_header)
}

/// Classify a transport-level failure the same way the middleware's `except` clause
/// does, to decide retriability and (for 429s) extract `Retry-After`.
pub fn classify(status: Option<u16>, retry_after_header: Option<&str>) -> (RpcError, Option<u64>) {
    match status {
        Some(429) => {
            let retry_after = retry_after_header.map(parse_retry_after);
            (RpcError::Http { status: 429, body: "rate limited".into(), retry_after }, retry_after)
        }
        Some(s) if s >= 500 => (RpcError::Http { status: s, body: "server error".into(), retry_after: None }, None),
        Some(s) => (RpcError::Http { status: s, body: "http error".into(), retry_after: None }, None),
        None => (RpcError::Connection("transport error".into()), None),
    }
}
