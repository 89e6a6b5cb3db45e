pub mod middleware;

use std::time::Duration;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::RpcError;
use middleware::{is_retriable_method, next_delay, parse_retry_after, Backoff};

#[derive(Debug, Clone, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: String,
    params: Value,
    id: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonRpcResponse {
    id: u64,
    result: Option<Value>,
    error: Option<JsonRpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonRpcErrorBody {
    #[allow(dead_code)]
    code: i64,
    message: String,
}

/// Single/batched JSON-RPC client with retry+backoff, honoring `Retry-After`.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    endpoint: url::Url,
    retries: u32,
    max_delay: u64,
}

impl RpcClient {
    pub fn new(endpoint: url::Url) -> Self {
        Self {
            http: reqwest::Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client"),
            endpoint,
            retries: 5,
            max_delay: 60,
        }
    }

    /// Issue a single JSON-RPC call, retrying transient failures of whitelisted
    /// methods with exponential backoff honoring `Retry-After`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let request = JsonRpcRequest { jsonrpc: "2.0", method: method.to_string(), params, id: 1 };
        let mut backoff = Backoff::new(2, 1, Some(self.max_delay));

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.send_one(&request).await {
                Ok(value) => return Ok(value),
                Err(err) if is_retriable_method(method) && err.is_transient() && attempt < self.retries => {
                    let retry_after = match &err {
                        RpcError::Http { retry_after, .. } => *retry_after,
                        _ => None,
                    };
                    crate::metrics::Metrics::get().rpc_retries.inc();
                    let delay = next_delay(&mut backoff, retry_after, self.max_delay);
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_one(&self, request: &JsonRpcRequest) -> Result<Value, RpcError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .map(parse_retry_after);

        if status.as_u16() == 429 {
            return Err(RpcError::Http { status: 429, body: "rate limited".into(), retry_after });
        }
        if status.is_server_error() {
            return Err(RpcError::Http { status: status.as_u16(), body: "server error".into(), retry_after: None });
        }
        if !status.is_success() {
            return Err(RpcError::Http { status: status.as_u16(), body: "http error".into(), retry_after: None });
        }

        let body: JsonRpcResponse = response.json().await.map_err(|e| RpcError::Other(e.into()))?;
        match body.error {
            Some(e) => Err(RpcError::Other(anyhow::anyhow!("rpc error: {}", e.message))),
            None => Ok(body.result.unwrap_or(Value::Null)),
        }
    }

    /// Issue a batched request: an ordered array of numbered requests, returning results
    /// aligned by `id` regardless of server response ordering.
    pub async fn call_batch(&self, calls: Vec<(&str, Value)>) -> Result<Vec<Value>, RpcError> {
        let requests: Vec<JsonRpcRequest> = calls
            .into_iter()
            .enumerate()
            .map(|(i, (method, params))| JsonRpcRequest { jsonrpc: "2.0", method: method.to_string(), params, id: i as u64 })
            .collect();

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&requests)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let mut bodies: Vec<JsonRpcResponse> = response.json().await.map_err(|e| RpcError::Other(e.into()))?;
        bodies.sort_by_key(|r| r.id);

        bodies
            .into_iter()
            .map(|r| match r.error {
                Some(e) => Err(RpcError::Other(anyhow::anyhow!("rpc error: {}", e.message))),
                None => Ok(r.result.unwrap_or(Value::Null)),
            })
            .collect()
    }

    pub async fn block_number(&self) -> Result<u64, RpcError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&result)
    }

    pub async fn get_block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, RpcError> {
        let result = self.call("eth_getBlockByNumber", json!([format!("0x{number:x}"), false])).await?;
        parse_block(result)
    }

    pub async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockInfo>, RpcError> {
        let result = self.call("eth_getBlockByHash", json!([hash.to_string(), false])).await?;
        parse_block(result)
    }

    pub async fn get_transaction_by_hash(&self, hash: B256) -> Result<Option<TransactionInfo>, RpcError> {
        let result = self.call("eth_getTransactionByHash", json!([hash.to_string()])).await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(TransactionInfo {
            hash,
            from: result["from"].as_str().unwrap_or_default().parse().unwrap_or_default(),
            block_hash: result["blockHash"].as_str().unwrap_or_default().parse().unwrap_or_default(),
            block_number: parse_hex_u64(&result["blockNumber"])?,
        }))
    }

    pub async fn get_logs(&self, from_block: u64, to_block: u64, address: Option<&[Address]>, topics: &[B256]) -> Result<Vec<Value>, RpcError> {
        let mut params = serde_json::Map::new();
        params.insert("fromBlock".into(), json!(format!("0x{from_block:x}")));
        params.insert("toBlock".into(), json!(format!("0x{to_block:x}")));
        if let Some(addrs) = address {
            params.insert("address".into(), json!(addrs.iter().map(|a| a.to_string()).collect::<Vec<_>>()));
        }
        if !topics.is_empty() {
            params.insert("topics".into(), json!(topics.iter().map(|t| t.to_string()).collect::<Vec<_>>()));
        }

        let result = self.call("eth_getLogs", json!([Value::Object(params)])).await?;
        Ok(result.as_array().cloned().unwrap_or_default())
    }

    /// `eth_call` against `address` with raw ABI-encoded `data`, returning the raw
    /// output bytes. Used for RC20 metadata fetches.
    pub async fn eth_call(&self, address: Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let call = json!({
            "to": address.to_string(),
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self.call("eth_call", json!([call, "latest"])).await?;
        let hex_str = result.as_str().unwrap_or("0x").trim_start_matches("0x");
        hex::decode(hex_str).map_err(|e| RpcError::Other(e.into()))
    }
}

fn classify_reqwest_error(err: &reqwest::Error) -> RpcError {
    if err.is_timeout() {
        RpcError::Timeout
    } else if err.is_redirect() {
        RpcError::TooManyRedirects
    } else if err.is_connect() {
        RpcError::Connection(err.to_string())
    } else {
        RpcError::Connection(err.to_string())
    }
}

fn parse_hex_u64(value: &Value) -> Result<u64, RpcError> {
    let s = value.as_str().ok_or_else(|| RpcError::Other(anyhow::anyhow!("expected hex string, got {value}")))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| RpcError::Other(e.into()))
}

#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub hash: B256,
    pub number: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    pub block_hash: B256,
    pub block_number: u64,
}

fn parse_block(value: Value) -> Result<Option<BlockInfo>, RpcError> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(BlockInfo {
        hash: value["hash"].as_str().unwrap_or_default().parse().unwrap_or_default(),
        number: parse_hex_u64(&value["number"])?,
        timestamp: parse_hex_u64(&value["timestamp"])?,
    }))
}
